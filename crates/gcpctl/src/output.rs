//! Output formatting for command results

use anyhow::Result;
use comfy_table::Table;
use serde::Serialize;
use serde_json::Value;

use crate::cli;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl From<cli::OutputFormat> for OutputFormat {
    fn from(format: cli::OutputFormat) -> Self {
        match format {
            cli::OutputFormat::Json => OutputFormat::Json,
            cli::OutputFormat::Yaml => OutputFormat::Yaml,
            cli::OutputFormat::Table | cli::OutputFormat::Auto => OutputFormat::Table,
        }
    }
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat) -> Result<()> {
    let json_value = serde_json::to_value(data)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_value)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(&json_value)?);
        }
        OutputFormat::Table => {
            println!("{}", render_table(&json_value));
        }
    }

    Ok(())
}

/// Arrays of objects become one row per element; objects become key/value rows
fn render_table(value: &Value) -> String {
    match value {
        Value::Array(arr) if arr.is_empty() => "No results".to_string(),
        Value::Array(arr) => {
            let mut table = Table::new();

            if let Value::Object(first) = &arr[0] {
                let headers: Vec<String> = first.keys().map(|k| k.to_uppercase()).collect();
                let keys: Vec<&String> = first.keys().collect();
                table.set_header(headers);

                for item in arr {
                    if let Value::Object(obj) = item {
                        let row: Vec<String> = keys
                            .iter()
                            .map(|k| format_value(obj.get(*k).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["VALUE"]);
                for item in arr {
                    table.add_row(vec![format_value(item)]);
                }
            }

            table.to_string()
        }
        Value::Object(obj) => {
            let mut table = Table::new();
            table.set_header(vec!["FIELD", "VALUE"]);
            for (key, val) in obj {
                table.add_row(vec![key.clone(), format_value(val)]);
            }
            table.to_string()
        }
        other => format_value(other),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(obj) => obj
            .iter()
            .map(|(k, v)| format!("{}={}", k, format_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Null), "-");
        assert_eq!(format_value(&json!(["a", "b"])), "a, b");
        assert_eq!(format_value(&json!({ "ip": "10.0.0.2" })), "ip=10.0.0.2");
    }

    #[test]
    fn test_render_table_rows() {
        let rendered = render_table(&json!([
            { "name": "web-1", "remote_id": "123" },
            { "name": "db-1", "remote_id": null }
        ]));
        assert!(rendered.contains("NAME"));
        assert!(rendered.contains("web-1"));
        assert!(rendered.contains("123"));
    }

    #[test]
    fn test_render_empty_array() {
        assert_eq!(render_table(&json!([])), "No results");
    }

    #[test]
    fn test_auto_maps_to_table() {
        assert_eq!(
            OutputFormat::from(cli::OutputFormat::Auto),
            OutputFormat::Table
        );
    }
}
