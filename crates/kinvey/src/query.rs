//! Query descriptors and their URL encoding.
//!
//! A [`Query`] carries the filter, projection, paging and sort of a Kinvey
//! collection read. [`QueryEncoder`] turns it into the query string Kinvey
//! expects:
//!
//! ```text
//! https://baas.kinvey.com/appdata/kid_x/books?query=%7B%7D&fields=title,author&limit=10
//! ```

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Characters escaped in query parameter values.
///
/// Everything except unreserved characters and `,`, so projections such as
/// `fields=title,author` stay readable.
const QUERY_VALUE_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b',');

/// Filter, projection, paging and sort for a collection read.
///
/// ```
/// use kinvey::Query;
/// use serde_json::json;
///
/// let query = Query::new()
///     .equal_to("author", "Herbert")
///     .fields(["title", "year"])
///     .limit(10)
///     .descending("year");
///
/// assert_eq!(query.filter().get("author"), Some(&json!("Herbert")));
/// assert_eq!(query.limit_value(), Some(10));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    filter: Map<String, Value>,
    fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u64>,
    skip: u64,
    sort: Map<String, Value>,
}

impl Query {
    /// Matches every entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole filter.
    pub fn with_filter(mut self, filter: Map<String, Value>) -> Self {
        self.filter = filter;
        self
    }

    /// Requires `field` to equal `value`.
    pub fn equal_to(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(field.into(), value.into());
        self
    }

    /// Restricts the returned fields.
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Caps the number of entities returned.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `skip` entities.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Sorts by `field`, smallest first.
    pub fn ascending(mut self, field: impl Into<String>) -> Self {
        self.sort.insert(field.into(), Value::from(1));
        self
    }

    /// Sorts by `field`, largest first.
    pub fn descending(mut self, field: impl Into<String>) -> Self {
        self.sort.insert(field.into(), Value::from(-1));
        self
    }

    /// The filter object.
    pub const fn filter(&self) -> &Map<String, Value> {
        &self.filter
    }

    /// The projected fields.
    pub fn field_names(&self) -> &[String] {
        &self.fields
    }

    /// The limit, if one was set.
    pub const fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    /// The number of skipped entities.
    pub const fn skip_value(&self) -> u64 {
        self.skip
    }

    /// The sort object.
    pub const fn sort(&self) -> &Map<String, Value> {
        &self.sort
    }

    /// Query parameters in emission order, values not yet escaped.
    ///
    /// `query` is always present. The others appear only when they narrow
    /// the result.
    pub fn to_params(&self) -> Vec<(&'static str, Value)> {
        let mut params = vec![("query", Value::Object(self.filter.clone()))];

        if !self.fields.is_empty() {
            params.push(("fields", Value::String(self.fields.join(","))));
        }
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            params.push(("limit", Value::from(limit)));
        }
        if self.skip > 0 {
            params.push(("skip", Value::from(self.skip)));
        }
        if !self.sort.is_empty() {
            params.push(("sort", Value::Object(self.sort.clone())));
        }

        params
    }
}

/// Appends a [`Query`] to a base URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEncoder;

impl QueryEncoder {
    /// Encodes `query` onto `base_url`.
    ///
    /// Without a query the base URL is returned unchanged. An existing query
    /// string is extended with `&`, a trailing `?` or `&` is reused, and a
    /// fragment stays at the end.
    ///
    /// ```
    /// use kinvey::{Query, QueryEncoder};
    ///
    /// let url = QueryEncoder::encode(
    ///     "https://baas.kinvey.com/appdata/kid_x/books?tls=true",
    ///     Some(&Query::new().fields(["x", "y"]).limit(10)),
    /// );
    /// assert_eq!(
    ///     url,
    ///     "https://baas.kinvey.com/appdata/kid_x/books?tls=true&query=%7B%7D&fields=x,y&limit=10"
    /// );
    /// ```
    pub fn encode(base_url: &str, query: Option<&Query>) -> String {
        let Some(query) = query else {
            return base_url.to_string();
        };

        let (base, fragment) = match base_url.find('#') {
            Some(index) => base_url.split_at(index),
            None => (base_url, ""),
        };

        let separator = if base.ends_with('?') || base.ends_with('&') {
            ""
        } else if base.contains('?') {
            "&"
        } else {
            "?"
        };

        let encoded = query
            .to_params()
            .into_iter()
            .map(|(name, value)| format!("{name}={}", encode_value(&value)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{base}{separator}{encoded}{fragment}")
    }
}

fn encode_value(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    utf8_percent_encode(&raw, QUERY_VALUE_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://baas.kinvey.com/appdata/kid_x/books";

    #[test]
    fn test_no_query_leaves_url_unchanged() {
        assert_eq!(QueryEncoder::encode(BASE, None), BASE);
    }

    #[test]
    fn test_empty_query_emits_only_filter() {
        let url = QueryEncoder::encode(BASE, Some(&Query::new()));
        assert_eq!(url, format!("{BASE}?query=%7B%7D"));
    }

    #[test]
    fn test_fields_keep_commas() {
        let query = Query::new().fields(["x", "y"]).limit(10);
        let url = QueryEncoder::encode(BASE, Some(&query));

        assert!(url.contains("fields=x,y"));
        assert!(url.contains("limit=10"));
        assert!(!url.contains("skip="));
        assert!(!url.contains("sort="));
    }

    #[test]
    fn test_zero_limit_and_skip_are_omitted() {
        let query = Query::new().limit(0).skip(0);
        let url = QueryEncoder::encode(BASE, Some(&query));
        assert_eq!(url, format!("{BASE}?query=%7B%7D"));
    }

    #[test]
    fn test_skip_and_sort_are_encoded() {
        let query = Query::new().skip(20).descending("year");
        let url = QueryEncoder::encode(BASE, Some(&query));
        assert_eq!(
            url,
            format!("{BASE}?query=%7B%7D&skip=20&sort=%7B%22year%22%3A-1%7D")
        );
    }

    #[test]
    fn test_filter_values_are_escaped() {
        let query = Query::new().equal_to("title", "Dune & Sons");
        let url = QueryEncoder::encode(BASE, Some(&query));
        assert_eq!(
            url,
            format!("{BASE}?query=%7B%22title%22%3A%22Dune%20%26%20Sons%22%7D")
        );
    }

    #[test]
    fn test_existing_query_string_is_extended() {
        let url = QueryEncoder::encode(&format!("{BASE}?tls=true"), Some(&Query::new()));
        assert_eq!(url, format!("{BASE}?tls=true&query=%7B%7D"));
    }

    #[test]
    fn test_trailing_separator_is_reused() {
        let url = QueryEncoder::encode(&format!("{BASE}?"), Some(&Query::new()));
        assert_eq!(url, format!("{BASE}?query=%7B%7D"));

        let url = QueryEncoder::encode(&format!("{BASE}?tls=true&"), Some(&Query::new()));
        assert_eq!(url, format!("{BASE}?tls=true&query=%7B%7D"));
    }

    #[test]
    fn test_fragment_is_preserved() {
        let url = QueryEncoder::encode(&format!("{BASE}#top"), Some(&Query::new().limit(1)));
        assert_eq!(url, format!("{BASE}?query=%7B%7D&limit=1#top"));
    }

    #[test]
    fn test_query_serializes() {
        let query = Query::new().equal_to("a", 1).fields(["a"]);
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"filter": {"a": 1}, "fields": ["a"], "skip": 0, "sort": {}})
        );
    }
}
