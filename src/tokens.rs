//! Endpoint path token substitution.
//!
//! Endpoint templates such as `admin/api-user/{id}` carry placeholders which
//! are replaced literally (no pattern syntax) with values from a token map.
//! Placeholders without a value are left untouched.
//!
//! ```rust
//! use headless_admin::parse_tokens;
//! use std::collections::BTreeMap;
//!
//! let mut tokens = BTreeMap::new();
//! tokens.insert("{id}".to_string(), "42".to_string());
//!
//! assert_eq!(parse_tokens("admin/api-user/{id}", &tokens), "admin/api-user/42");
//! assert_eq!(parse_tokens("admin/{group}/{id}", &tokens), "admin/{group}/42");
//! ```

use std::collections::BTreeMap;

/// Reserved token resolving to the endpoint's declared default name.
pub const ENDPOINT_NAME_TOKEN: &str = "{endpointName}";

/// Replace every occurrence of every token key in `template` with its value.
///
/// The template is scanned once from left to right, so inserted values are
/// never substituted again. When several keys match at the same position the
/// longest one wins.
#[must_use]
pub fn parse_tokens(template: &str, tokens: &BTreeMap<String, String>) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        let matched = tokens
            .iter()
            .filter(|(key, _)| !key.is_empty() && rest.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len());

        match matched {
            Some((key, value)) => {
                result.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                result.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_single_token() {
        let t = tokens(&[("{id}", "42")]);
        assert_eq!(parse_tokens("admin/api-user/{id}", &t), "admin/api-user/42");
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let t = tokens(&[("{id}", "7"), ("{lang}", "de")]);
        assert_eq!(parse_tokens("{lang}/{id}/copy/{id}", &t), "de/7/copy/7");
    }

    #[test]
    fn test_unmatched_tokens_pass_through() {
        let t = tokens(&[("{id}", "1")]);
        assert_eq!(parse_tokens("{unmatched}/{id}", &t), "{unmatched}/1");
        assert_eq!(parse_tokens("plain/path", &BTreeMap::new()), "plain/path");
    }

    #[test]
    fn test_inserted_values_are_not_substituted_again() {
        let t = tokens(&[("{a}", "{b}"), ("{b}", "x")]);
        assert_eq!(parse_tokens("{a}/{b}", &t), "{b}/x");
    }

    #[test]
    fn test_longest_key_wins() {
        let t = tokens(&[("{id", "short"), ("{id}", "long")]);
        assert_eq!(parse_tokens("{id}", &t), "long");
    }

    #[test]
    fn test_multibyte_template() {
        let t = tokens(&[("{name}", "größe")]);
        assert_eq!(parse_tokens("dateien/{name}/ä", &t), "dateien/größe/ä");
    }
}
