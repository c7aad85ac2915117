//! Parsers for the file-backed counter tree.
//!
//! Pure functions over file contents, testable with string inputs.
//!
//! Manifest (`.counters`): one raw counter label per line.
//! Instance file: one `Label: value` line per raw counter. The split happens
//! at the last `:` so labels may contain colons.
//! Both formats skip blank lines and `#` comments.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn content_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parses a `.counters` manifest into raw counter labels.
pub fn parse_manifest(content: &str) -> Vec<String> {
    content_lines(content)
        .map(|(_, line)| line.to_string())
        .collect()
}

/// Parses an instance file into samples keyed by raw counter label.
pub fn parse_instance(content: &str) -> Result<HashMap<String, f64>, ParseError> {
    let mut values = HashMap::new();

    for (lineno, line) in content_lines(content) {
        let sep = line
            .rfind(':')
            .ok_or_else(|| ParseError::new(format!("line {}: missing ':'", lineno)))?;

        let label = line[..sep].trim();
        if label.is_empty() {
            return Err(ParseError::new(format!("line {}: empty label", lineno)));
        }

        let raw = line[sep + 1..].trim();
        let value = raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                ParseError::new(format!(
                    "line {}: invalid value '{}' for {}",
                    lineno, raw, label
                ))
            })?;

        values.insert(label.to_string(), value);
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let content =
            "# VMware Blast Session Counters\nReceived Bytes\n\n  RTT  \nJitter (Uplink)\n";
        assert_eq!(
            parse_manifest(content),
            vec!["Received Bytes", "RTT", "Jitter (Uplink)"]
        );
    }

    #[test]
    fn test_parse_instance() {
        let content = "Received Bytes: 1024\nRTT: 12.5\n# comment\nOut Queueing time (us): 3\n";
        let values = parse_instance(content).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values["Received Bytes"], 1024.0);
        assert_eq!(values["RTT"], 12.5);
        assert_eq!(values["Out Queueing time (us)"], 3.0);
    }

    #[test]
    fn test_parse_instance_label_with_colon() {
        let values = parse_instance("Ratio: a:b: 0.5\n").unwrap();
        assert_eq!(values["Ratio: a:b"], 0.5);
    }

    #[test]
    fn test_parse_instance_errors() {
        let err = parse_instance("RTT 12\n").unwrap_err();
        assert_eq!(err.message, "line 1: missing ':'");

        let err = parse_instance("RTT: 1\nJitter (Uplink): fast\n").unwrap_err();
        assert!(err.message.starts_with("line 2: invalid value 'fast'"));

        let err = parse_instance(": 1\n").unwrap_err();
        assert_eq!(err.message, "line 1: empty label");
    }

    #[test]
    fn test_parse_instance_rejects_non_finite() {
        for raw in ["NaN", "inf", "-inf", "infinity"] {
            let err = parse_instance(&format!("Received Bytes: {}\n", raw)).unwrap_err();
            assert!(
                err.message.starts_with("line 1: invalid value"),
                "{}: {}",
                raw,
                err.message
            );
        }
    }
}
