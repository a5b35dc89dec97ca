//! Kinds command - show which processor handles which resources

use console::style;
use packify_processor::Dispatcher;

use crate::error::Result;

pub fn run() -> Result<()> {
    let dispatcher = Dispatcher::builtin();

    println!();
    println!("  {}", style("Processors").bold());
    println!("  {}", style("──────────").dim());
    for (position, name) in dispatcher.processors().iter().enumerate() {
        println!("  {} {}", style(format!("{:>2}.", position + 1)).dim(), name);
    }
    println!();
    println!(
        "  {}",
        style("The first processor matching a resource's kind handles it").dim()
    );
    println!();

    Ok(())
}
