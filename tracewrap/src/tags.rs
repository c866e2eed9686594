//! Human-readable tag values derived from heterogeneous call arguments.
//!
//! Trace UIs need display strings for whatever a wrapped call was given:
//! scalars, raw byte keys, key lists, field maps. The functions here are
//! pure and total; none of them can panic on absent or empty input.
//!
//! One convention applies throughout: a truly absent argument (`None`)
//! renders as the literal `"null"`, while an empty-but-present collection
//! renders as its natural empty form (`"[]"`, `"{}"`, or an empty join).
//! Byte sequences render as bracketed decimal element lists, since raw
//! binary keys must be readable without assuming a text encoding.

use indexmap::IndexMap;
use std::fmt::Display;

const NULL: &str = "null";

/// Renders a single optional value.
///
/// ```
/// use tracewrap::tags;
///
/// assert_eq!(tags::scalar(Some(&42)), "42");
/// assert_eq!(tags::scalar::<i32>(None), "null");
/// ```
pub fn scalar<T: Display>(value: Option<&T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => NULL.to_owned(),
    }
}

/// Renders a byte sequence as a bracketed decimal list.
///
/// ```
/// use tracewrap::tags;
///
/// assert_eq!(tags::bytes(Some(&[1u8, 2, 3][..])), "[1, 2, 3]");
/// assert_eq!(tags::bytes(Some(&[][..])), "[]");
/// assert_eq!(tags::bytes(None), "null");
/// ```
pub fn bytes(value: Option<&[u8]>) -> String {
    match value {
        Some(value) => render_bytes(value),
        None => NULL.to_owned(),
    }
}

/// Renders an ordered sequence of byte sequences, e.g. a multi-key argument.
///
/// ```
/// use tracewrap::tags;
///
/// let rows: &[&[u8]] = &[&[1, 2], &[3]];
/// assert_eq!(tags::byte_rows(Some(rows.iter().copied())), "[[1, 2], [3]]");
/// assert_eq!(tags::byte_rows::<std::iter::Empty<&[u8]>>(None), "null");
/// ```
pub fn byte_rows<'a, I>(rows: Option<I>) -> String
where
    I: IntoIterator<Item = &'a [u8]>,
{
    match rows {
        Some(rows) => {
            let rendered: Vec<String> = rows.into_iter().map(render_bytes).collect();
            format!("[{}]", rendered.join(", "))
        }
        None => NULL.to_owned(),
    }
}

/// Joins an ordered sequence of strings with `", "`, preserving order.
///
/// ```
/// use tracewrap::tags;
///
/// assert_eq!(tags::strings(Some(["a", "b"])), "a, b");
/// assert_eq!(tags::strings::<[&str; 0]>(None), "null");
/// ```
pub fn strings<'a, I>(values: Option<I>) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    match values {
        Some(values) => values.into_iter().collect::<Vec<_>>().join(", "),
        None => NULL.to_owned(),
    }
}

/// Renders a mapping as brace-delimited `key=value` pairs.
///
/// Iteration order is the map's insertion order, which reflects call-site
/// argument order.
///
/// ```
/// use indexmap::IndexMap;
/// use tracewrap::tags;
///
/// let mut fields = IndexMap::new();
/// fields.insert("b", 2);
/// fields.insert("a", 1);
/// assert_eq!(tags::map(Some(&fields)), "{b=2, a=1}");
/// assert_eq!(tags::map::<&str, i32>(None), "null");
/// ```
pub fn map<K: Display, V: Display>(entries: Option<&IndexMap<K, V>>) -> String {
    match entries {
        Some(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        None => NULL.to_owned(),
    }
}

/// Renders a mapping with raw byte keys and values.
pub fn byte_map(entries: Option<&IndexMap<Vec<u8>, Vec<u8>>>) -> String {
    match entries {
        Some(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(key, value)| format!("{}={}", render_bytes(key), render_bytes(value)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        None => NULL.to_owned(),
    }
}

fn render_bytes(value: &[u8]) -> String {
    let rendered: Vec<String> = value.iter().map(u8::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_renders_null_everywhere() {
        assert_eq!(scalar::<String>(None), "null");
        assert_eq!(bytes(None), "null");
        assert_eq!(byte_rows::<std::iter::Empty<&[u8]>>(None), "null");
        assert_eq!(strings::<[&str; 0]>(None), "null");
        assert_eq!(map::<String, String>(None), "null");
        assert_eq!(byte_map(None), "null");
    }

    #[test]
    fn empty_renders_empty_form() {
        assert_eq!(bytes(Some(&[])), "[]");
        assert_eq!(byte_rows(Some(std::iter::empty::<&[u8]>())), "[]");
        assert_eq!(strings(Some([])), "");
        assert_eq!(map(Some(&IndexMap::<String, String>::new())), "{}");
        assert_eq!(byte_map(Some(&IndexMap::new())), "{}");
    }

    #[test]
    fn scalar_display() {
        assert_eq!(scalar(Some(&"k1")), "k1");
        assert_eq!(scalar(Some(&7u64)), "7");
    }

    #[test]
    fn byte_renderings() {
        assert_eq!(bytes(Some(&[0, 255])), "[0, 255]");
        let rows: &[&[u8]] = &[&[1], &[], &[2, 3]];
        assert_eq!(byte_rows(Some(rows.iter().copied())), "[[1], [], [2, 3]]");
    }

    #[test]
    fn string_join_preserves_order() {
        assert_eq!(strings(Some(["b", "a", "c"])), "b, a, c");
    }

    #[test]
    fn map_preserves_insertion_order() {
        let mut entries = IndexMap::new();
        entries.insert("z", "1");
        entries.insert("a", "2");
        assert_eq!(map(Some(&entries)), "{z=1, a=2}");

        let mut raw = IndexMap::new();
        raw.insert(vec![1u8, 2], vec![3u8]);
        assert_eq!(byte_map(Some(&raw)), "{[1, 2]=[3]}");
    }

    #[test]
    fn idempotent_for_equal_input() {
        let mut entries = IndexMap::new();
        entries.insert("a", "1");
        assert_eq!(map(Some(&entries)), map(Some(&entries)));
        assert_eq!(bytes(Some(&[9, 9])), bytes(Some(&[9, 9])));
    }
}
