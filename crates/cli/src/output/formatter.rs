//! Output formatter for human-readable and JSON output
//!
//! JSON output goes to stdout untouched so orchestration tooling can parse it.
//! Human output is plain `key : value` lines, colored when the terminal allows.

use console::style;
use humansize::{BINARY, format_size};
use serde::Serialize;
use serde_json::Value;

use super::OutputConfig;

/// Fields rendered as byte sizes in human mode
const SIZE_FIELDS: &[&str] = &["bytes", "max_size"];

/// Formatter for CLI output
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    /// Create a new formatter with the given configuration
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Check if JSON output mode is enabled
    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    /// Check if colors are enabled
    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        if self.colors_enabled() {
            println!("{} {message}", style("✓").green());
        } else {
            println!("✓ {message}");
        }
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({ "error": message });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else if self.colors_enabled() {
            eprintln!("{} {message}", style("✗").red());
        } else {
            eprintln!("✗ {message}");
        }
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        if self.colors_enabled() {
            eprintln!("{} {message}", style("⚠").yellow());
        } else {
            eprintln!("⚠ {message}");
        }
    }

    /// Output JSON directly
    ///
    /// JSON is printed even in quiet mode; callers rely on it.
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }

    /// Print the fields of a serialized state, one per line
    pub fn fields(&self, value: &Value) {
        for line in self.render_fields(value) {
            self.println(&line);
        }
    }

    fn render_fields(&self, value: &Value) -> Vec<String> {
        let Value::Object(map) = value else {
            return vec![render_scalar("", value)];
        };

        let mut flat = Vec::new();
        flatten("", map, &mut flat);
        let width = flat.iter().map(|(key, _)| key.len()).max().unwrap_or(0);

        flat.into_iter()
            .map(|(key, value)| {
                let padded = format!("{key:<width$}");
                let label = if self.colors_enabled() {
                    style(padded).bold().to_string()
                } else {
                    padded
                };
                format!("{label} : {value}")
            })
            .collect()
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

fn flatten(prefix: &str, map: &serde_json::Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten(&key, inner, out),
            Value::Null => {}
            other => {
                let rendered = render_scalar(&key, other);
                out.push((key, rendered));
            }
        }
    }
}

fn render_scalar(key: &str, value: &Value) -> String {
    let field = key.rsplit('.').next().unwrap_or(key);
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if SIZE_FIELDS.contains(&field) => match n.as_u64() {
            Some(bytes) => format!("{} ({bytes} bytes)", format_size(bytes, BINARY)),
            None => n.to_string(),
        },
        Value::Array(items) if items.is_empty() => "-".to_string(),
        Value::Array(items) => items
            .iter()
            .map(|item| render_scalar("", item))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
