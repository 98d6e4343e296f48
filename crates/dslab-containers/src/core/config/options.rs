//! Config utils.

use std::collections::HashMap;

/// Splits config value string into name and options string.
/// Example: `FirstFitThreshold[threshold=0.8]` has name `FirstFitThreshold` and options `threshold=0.8`.
pub fn parse_config_value(config_str: &str) -> (String, Option<String>) {
    match config_str.trim().split_once('[') {
        Some((name, rest)) => (name.trim().to_string(), Some(rest.trim_end_matches(']').to_string())),
        None => (config_str.trim().to_string(), None),
    }
}

/// Parses comma-separated `name=value` pairs, pairs without `=` are ignored.
pub fn parse_options(options_str: &str) -> HashMap<String, String> {
    options_str
        .split(',')
        .filter_map(|option| option.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_value() {
        assert_eq!(parse_config_value("FirstFit"), ("FirstFit".to_string(), None));
        assert_eq!(
            parse_config_value("FirstFitThreshold[threshold=0.8]"),
            ("FirstFitThreshold".to_string(), Some("threshold=0.8".to_string()))
        );
    }

    #[test]
    fn test_parse_options() {
        let options = parse_options("threshold=0.8, kind=cpu,broken");
        assert_eq!(options.get("threshold").map(String::as_str), Some("0.8"));
        assert_eq!(options.get("kind").map(String::as_str), Some("cpu"));
        assert_eq!(options.len(), 2);
    }
}
