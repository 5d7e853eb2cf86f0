//! Submitted form data.
//!
//! [`QueryDict`] holds the decoded GET and POST parameters of a request.
//! A parent form and its inline formsets all bind to the same instance, each
//! reading only the keys under its own prefix.

use std::collections::BTreeMap;

/// Decoded `application/x-www-form-urlencoded` data.
///
/// A key may be submitted several times; [`get`](QueryDict::get) returns
/// the last value, which is what form fields bind to.
///
/// # Examples
///
/// ```
/// use inline_edit_http::QueryDict;
///
/// let qd = QueryDict::parse("prog-name=Morning+Show&prog_IMAGES-TOTAL_FORMS=2");
/// assert_eq!(qd.get("prog-name"), Some("Morning Show"));
/// assert_eq!(qd.get("prog_IMAGES-TOTAL_FORMS"), Some("2"));
/// assert_eq!(qd.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDict {
    data: BTreeMap<String, Vec<String>>,
}

impl QueryDict {
    /// Creates an empty `QueryDict`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key1=val1&key2=val2`, decoding percent escapes and `+`.
    pub fn parse(query_string: &str) -> Self {
        let mut data: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for pair in query_string.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            data.entry(decode(key)).or_default().push(decode(value));
        }
        Self { data }
    }

    /// Returns the last value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(|values| values.last())
            .map(String::as_str)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty() {
        let qd = QueryDict::new();
        assert!(qd.is_empty());
        assert_eq!(qd.len(), 0);
    }

    #[test]
    fn test_repeated_key_keeps_last() {
        let qd = QueryDict::parse("prog_IMAGES-0-DELETE=&prog_IMAGES-0-DELETE=on");
        assert_eq!(qd.get("prog_IMAGES-0-DELETE"), Some("on"));
        assert_eq!(qd.len(), 1);
    }

    #[test]
    fn test_parse_no_value_and_empty_pairs() {
        let qd = QueryDict::parse("key&&other=");
        assert_eq!(qd.get("key"), Some(""));
        assert_eq!(qd.get("other"), Some(""));
        assert_eq!(qd.len(), 2);
    }

    #[test]
    fn test_parse_percent_and_plus() {
        let qd = QueryDict::parse("name=hello%20world&city=New+York&k%2Dey=1");
        assert_eq!(qd.get("name"), Some("hello world"));
        assert_eq!(qd.get("city"), Some("New York"));
        assert_eq!(qd.get("k-ey"), Some("1"));
    }

    #[test]
    fn test_missing_key() {
        assert_eq!(QueryDict::parse("a=1").get("b"), None);
    }
}
