//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats.

mod formatter;

pub use formatter::Formatter;

use gp_core::config::Defaults;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Combine CLI flags with the configuration file defaults; a set flag wins
    pub fn with_defaults(json: bool, no_color: bool, quiet: bool, defaults: &Defaults) -> Self {
        Self {
            json: json || defaults.json_output(),
            no_color: no_color || defaults.color_disabled(),
            quiet,
        }
    }
}
