//! Pack assembly and output
//!
//! Merges the values fragments of every template into one document and
//! lays out the pack:
//!
//! ```text
//! <output>/
//! ├── Pack.yaml
//! ├── values.yaml
//! └── templates/
//!     ├── _helpers.j2
//!     └── <kind>.yaml ...
//! ```

use indexmap::IndexMap;
use packify_core::expr::HELPERS_FILE;
use packify_core::{Pack, Values};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ProcessError, Result};
use crate::helpers::{self, HELPERS};
use crate::template::Template;

/// Options for writing a pack to disk
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Overwrite an existing output directory
    pub force: bool,

    /// Compute the file list without writing anything
    pub dry_run: bool,
}

/// A fully assembled pack
#[derive(Debug, Clone)]
pub struct PackOutput {
    pack: Pack,
    values: Values,
    /// File name under `templates/` → template source, in input order
    templates: IndexMap<String, String>,
}

impl PackOutput {
    /// Merge fragments and render every template body
    ///
    /// Templates sharing a file name become one multi-document file.
    pub fn assemble(pack: Pack, templates: Vec<Template>) -> Result<Self> {
        let mut values = Values::new();
        let mut documents: IndexMap<String, Vec<String>> = IndexMap::new();

        for template in templates {
            let (filename, fragment, body) = template.into_parts();
            values.merge(fragment)?;
            let document = body.render(&filename)?;
            documents.entry(filename).or_default().push(document);
        }

        let templates = documents
            .into_iter()
            .map(|(filename, docs)| {
                if docs.len() > 1 {
                    debug!(file = %filename, documents = docs.len(), "Concatenating templates");
                }
                let content = docs.join("---\n");
                let content = match helpers::import_header(&content, HELPERS_FILE) {
                    Some(header) => header + &content,
                    None => content,
                };
                (filename, content)
            })
            .collect();

        Ok(Self {
            pack,
            values,
            templates,
        })
    }

    pub fn pack(&self) -> &Pack {
        &self.pack
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn templates(&self) -> &IndexMap<String, String> {
        &self.templates
    }

    /// Source of one template by file name
    pub fn template(&self, filename: &str) -> Option<&str> {
        self.templates.get(filename).map(String::as_str)
    }

    /// Every file of the pack, relative to the pack root
    pub fn files(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut files = vec![
            (PathBuf::from("Pack.yaml"), self.pack.to_yaml()?),
            (PathBuf::from("values.yaml"), self.values.to_yaml()?),
            (
                Path::new("templates").join(HELPERS_FILE),
                HELPERS.to_string(),
            ),
        ];
        for (filename, content) in &self.templates {
            files.push((Path::new("templates").join(filename), content.clone()));
        }
        Ok(files)
    }

    /// Write the pack under `dir`, returning the written paths
    ///
    /// A stale `templates/` directory is replaced as a whole so files of
    /// kinds no longer present do not linger.
    pub fn write(&self, dir: &Path, options: &WriteOptions) -> Result<Vec<PathBuf>> {
        if dir.exists() && !options.force {
            return Err(ProcessError::OutputExists(dir.to_path_buf()));
        }

        let files = self.files()?;
        let paths: Vec<PathBuf> = files.iter().map(|(rel, _)| dir.join(rel)).collect();
        if options.dry_run {
            return Ok(paths);
        }

        let templates_dir = dir.join("templates");
        if templates_dir.exists() {
            fs::remove_dir_all(&templates_dir)?;
        }
        fs::create_dir_all(&templates_dir)?;

        for ((_, content), path) in files.iter().zip(&paths) {
            fs::write(path, content)?;
            info!(path = %path.display(), "Wrote file");
        }
        Ok(paths)
    }
}
