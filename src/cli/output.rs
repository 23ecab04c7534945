//! Output formatting for CLI commands.

use serde::Serialize;
use serde_json::Value;

use crate::cli::args::{HalberdArgs, OutputFormat};
use crate::error::Result;

/// Output a result in the format selected on the command line.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &HalberdArgs) -> Result<()> {
    let value = serde_json::to_value(result)?;
    let rendered = match args.output_format {
        OutputFormat::Json => render_json(&value, args.pretty)?,
        OutputFormat::Yaml => render_yaml(&value),
        OutputFormat::Human => {
            let body = render_human(&value);
            if args.verbosity() > 0 {
                format!("{message}\n\n{body}")
            } else {
                body
            }
        }
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

/// Render JSON, compact unless `pretty`.
pub fn render_json(value: &Value, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Render a simple YAML document.
pub fn render_yaml(value: &Value) -> String {
    let mut out = String::new();
    write_yaml_value(&mut out, value, 0);
    out
}

fn write_yaml_value(out: &mut String, value: &Value, indent: usize) {
    let spaces = "  ".repeat(indent);
    match value {
        Value::Object(obj) if obj.is_empty() => out.push_str(&format!("{spaces}{{}}\n")),
        Value::Object(obj) => {
            for (key, val) in obj {
                if is_nested(val) {
                    out.push_str(&format!("{spaces}{}:\n", format_yaml_string(key)));
                    write_yaml_value(out, val, indent + 1);
                } else {
                    out.push_str(&format!(
                        "{spaces}{}: {}\n",
                        format_yaml_string(key),
                        format_yaml_scalar(val)
                    ));
                }
            }
        }
        Value::Array(arr) if arr.is_empty() => out.push_str(&format!("{spaces}[]\n")),
        Value::Array(arr) => {
            for item in arr {
                if is_nested(item) {
                    out.push_str(&format!("{spaces}-\n"));
                    write_yaml_value(out, item, indent + 1);
                } else {
                    out.push_str(&format!("{spaces}- {}\n", format_yaml_scalar(item)));
                }
            }
        }
        _ => out.push_str(&format!("{spaces}{}\n", format_yaml_scalar(value))),
    }
}

fn is_nested(value: &Value) -> bool {
    match value {
        Value::Object(obj) => !obj.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        _ => false,
    }
}

/// Format a scalar for YAML output.
fn format_yaml_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => format_yaml_string(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Object(_) => "{}".to_string(),
        Value::Array(_) => "[]".to_string(),
    }
}

/// Quote a string whenever a YAML reader could take it for another type.
fn format_yaml_string(s: &str) -> String {
    if needs_yaml_quotes(s) {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\t', "\\t");
        format!("\"{escaped}\"")
    } else {
        s.to_string()
    }
}

fn needs_yaml_quotes(s: &str) -> bool {
    const RESERVED: [&str; 12] = [
        "true", "false", "null", "yes", "no", "on", "off", "y", "n", "~", ".inf", ".nan",
    ];

    s.is_empty()
        || s.trim() != s
        || s.contains(['\n', '\t', '"', '\\', ':', '#'])
        || s.starts_with([
            '$', '-', '*', '&', '!', '[', ']', '{', '}', ',', '?', '|', '>', '\'', '%', '@',
            '`',
        ])
        || RESERVED.contains(&s.to_ascii_lowercase().as_str())
        || s.parse::<f64>().is_ok()
        || s.starts_with("0x")
        || s.starts_with("0o")
}

/// Render one `path: value` line per leaf, paths joined with dots.
pub fn render_human(value: &Value) -> String {
    let mut lines = Vec::new();
    collect_leaves(value, String::new(), &mut lines);
    lines.join("\n")
}

fn collect_leaves(value: &Value, path: String, lines: &mut Vec<String>) {
    let join = |key: &str| {
        if path.is_empty() {
            key.to_string()
        } else {
            format!("{path}.{key}")
        }
    };
    match value {
        Value::Object(obj) if !obj.is_empty() => {
            for (key, val) in obj {
                collect_leaves(val, join(key), lines);
            }
        }
        Value::Array(arr) if arr.iter().any(is_nested) => {
            for (i, item) in arr.iter().enumerate() {
                collect_leaves(item, join(&i.to_string()), lines);
            }
        }
        _ if path.is_empty() => lines.push(format_value(value)),
        _ => lines.push(format!("{path}: {}", format_value(value))),
    }
}

/// Format a JSON value for display.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        Value::Object(_) => "{}".to_string(),
        Value::Null => "null".to_string(),
    }
}
