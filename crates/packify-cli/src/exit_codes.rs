//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

#![allow(dead_code)]

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - a manifest could not be decoded or has an unexpected shape
pub const INPUT_ERROR: i32 = 2;

/// Template error - the generated pack does not render
pub const TEMPLATE_ERROR: i32 = 3;

/// Pack error - conflicting values or an existing output directory
pub const PACK_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Interrupted by SIGINT (128 + 2)
pub const CANCELLED: i32 = 130;
