//! Export formats shared by history and session export.

use std::fmt;
use std::str::FromStr;

use crate::error::DevtermError;

/// Serialization format for history and session export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Full fidelity.
    Json,
    /// Tabular summary.
    Csv,
    /// Human-readable transcript.
    Text,
}

impl FromStr for ExportFormat {
    type Err = DevtermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "txt" | "text" => Ok(Self::Text),
            other => Err(DevtermError::Usage(format!(
                "unknown export format '{other}' (expected json, csv or txt)"
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        })
    }
}

/// Quote a CSV field per RFC 4180 when it contains a separator, quote or
/// line break.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join fields into one CSV record.
pub fn csv_record<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_formats() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("txt".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn csv_plain_field_unquoted() {
        assert_eq!(csv_field("ls -la"), "ls -la");
    }

    #[test]
    fn csv_quotes_commas_and_quotes() {
        assert_eq!(csv_field("echo a,b"), "\"echo a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_record_joins() {
        assert_eq!(csv_record(["1", "a,b", ""]), "1,\"a,b\",");
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn quoted_field_unescapes_to_input(value in "[a-z ,\"\n]{0,30}") {
                let field = csv_field(&value);
                let inner = match field.strip_prefix('"').and_then(|f| f.strip_suffix('"')) {
                    Some(inner) if field.len() >= 2 && field != value => inner.replace("\"\"", "\""),
                    _ => field.clone(),
                };
                prop_assert_eq!(inner, value);
            }
        }
    }
}
