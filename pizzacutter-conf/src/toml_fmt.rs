// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! TOML literal fragments embedded into the generated `pyproject.toml`.
//!
//! Lists are rendered one item per line with a trailing comma after every
//! item. A delimiter that appears inside an item is replaced by the other
//! quote character rather than escaped, so `c"test"` becomes `"c'test'"`.

use indexmap::IndexMap;
use toml_edit::Key;

use crate::error::Error;

/// Returns the quote that replaces `quote` inside items, `None` for the
/// empty delimiter.
fn alternate_quote(quote: &str) -> Result<Option<&'static str>, Error> {
    match quote {
        "\"" => Ok(Some("'")),
        "'" => Ok(Some("\"")),
        "" => Ok(None),
        other => Err(Error::UnsupportedQuote {
            quote: other.to_owned()
        })
    }
}

/// Swaps occurrences of `quote` inside `value` for the alternate quote.
///
/// # Errors
///
/// Returns [`Error::UnsupportedQuote`] unless `quote` is `"`, `'` or empty.
pub fn clean_quotes(value: &str, quote: &str) -> Result<String, Error> {
    Ok(match alternate_quote(quote)? {
        Some(replacement) => value.replace(quote, replacement),
        None => value.to_owned()
    })
}

/// Renders a multi-line TOML array.
///
/// # Errors
///
/// Returns [`Error::UnsupportedQuote`] for an unsupported delimiter.
///
/// # Example
///
/// ```
/// use pizzacutter_conf::list_to_toml;
///
/// let rendered = list_to_toml(&["a", "b"], "\"")?;
/// assert_eq!(rendered, "[\n    \"a\",\n    \"b\",\n]");
/// # Ok::<(), pizzacutter_conf::Error>(())
/// ```
pub fn list_to_toml<S>(items: &[S], quote: &str) -> Result<String, Error>
where
    S: AsRef<str>
{
    let replacement = alternate_quote(quote)?;
    Ok(render_array(items.iter().map(|item| {
        let item = item.as_ref();
        let cleaned = match replacement {
            Some(replacement) => item.replace(quote, replacement),
            None => item.to_owned()
        };
        format!("{quote}{cleaned}{quote}")
    })))
}

fn render_array<I>(rendered_items: I) -> String
where
    I: Iterator<Item = String>
{
    let mut rendered = String::from("[\n");
    for item in rendered_items {
        rendered.push_str("    ");
        rendered.push_str(&item);
        rendered.push_str(",\n");
    }
    rendered.push(']');
    rendered
}

/// Renders a single-line inline table such as `{a = "1", b = "2"}`.
///
/// Keys appear in insertion order and are quoted when they are not bare
/// keys. Values are always TOML basic strings.
pub fn dict_to_toml(mapping: &IndexMap<String, String>) -> String {
    let pairs: Vec<String> = mapping
        .iter()
        .map(|(key, value)| format!("{} = {}", Key::new(key.as_str()), basic_string(value)))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Double-quoted TOML string with escapes.
///
/// JSON string escapes are valid TOML basic-string escapes; only DEL, which
/// JSON leaves raw, needs an extra escape.
fn basic_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned())
        .to_string()
        .replace('\u{7f}', "\\u007f")
}

/// Renders a TOML array of inline tables, one table per line.
pub fn list_of_dicts_to_toml(mappings: &[IndexMap<String, String>]) -> String {
    render_array(mappings.iter().map(dict_to_toml))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn mapping(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn list_has_trailing_comma_on_every_item() {
        let rendered = list_to_toml(&["a", "b", "c"], "\"").expect("valid quote");
        assert_eq!(rendered, "[\n    \"a\",\n    \"b\",\n    \"c\",\n]");
    }

    #[test]
    fn empty_list_renders_brackets_only() {
        let rendered = list_to_toml::<&str>(&[], "\"").expect("valid quote");
        assert_eq!(rendered, "[\n]");
    }

    #[test]
    fn colliding_quotes_are_replaced_not_escaped() {
        let rendered = list_to_toml(&["a", "b", "c\"test\""], "\"").expect("valid quote");
        assert_eq!(rendered, "[\n    \"a\",\n    \"b\",\n    \"c'test'\",\n]");
    }

    #[test]
    fn clean_quotes_covers_every_delimiter() {
        assert_eq!(clean_quotes("test", "\"").unwrap(), "test");
        assert_eq!(clean_quotes("test", "'").unwrap(), "test");
        assert_eq!(clean_quotes("test \"par\"", "\"").unwrap(), "test 'par'");
        assert_eq!(clean_quotes("test \"par\"", "'").unwrap(), "test \"par\"");
        assert_eq!(clean_quotes("test 'par'", "\"").unwrap(), "test 'par'");
        assert_eq!(clean_quotes("test 'par'", "'").unwrap(), "test \"par\"");
        assert_eq!(clean_quotes("test 'par'", "").unwrap(), "test 'par'");
    }

    #[test]
    fn unsupported_quote_is_rejected() {
        let error = list_to_toml(&["a"], "x").expect_err("x is not a delimiter");
        match error {
            Error::UnsupportedQuote {
                quote
            } => assert_eq!(quote, "x"),
            other => panic!("unexpected error variant: {other:?}")
        }
    }

    #[test]
    fn unsupported_quote_is_rejected_even_for_empty_lists() {
        assert!(list_to_toml::<&str>(&[], "`").is_err());
        assert!(clean_quotes("", "`").is_err());
    }

    #[test]
    fn dict_renders_inline_table() {
        assert_eq!(dict_to_toml(&mapping(&[("a", "1"), ("b", "2")])), "{a = \"1\", b = \"2\"}");
    }

    #[test]
    fn dict_keeps_insertion_order() {
        assert_eq!(dict_to_toml(&mapping(&[("b", "2"), ("a", "1")])), "{b = \"2\", a = \"1\"}");
    }

    #[test]
    fn dict_quotes_keys_that_are_not_bare() {
        let rendered = dict_to_toml(&mapping(&[("my key", "v"), ("text", "MIT")]));
        assert_eq!(rendered, "{\"my key\" = \"v\", text = \"MIT\"}");
        let parsed: toml::Table =
            toml::from_str(&format!("license = {rendered}")).expect("valid TOML");
        assert_eq!(parsed["license"]["my key"].as_str(), Some("v"));
    }

    #[test]
    fn dict_escapes_double_quotes_in_values() {
        let rendered = dict_to_toml(&mapping(&[("name", "Jane \"JJ\" Doe")]));
        assert_eq!(rendered, r#"{name = "Jane \"JJ\" Doe"}"#);
    }

    #[test]
    fn dict_escapes_control_characters() {
        let rendered = dict_to_toml(&mapping(&[("note", "a\tb\\c\u{7f}")]));
        assert_eq!(rendered, r#"{note = "a\tb\\c\u007f"}"#);
    }

    proptest! {
        #[test]
        fn dict_parses_back_to_same_pairs(
            pairs in proptest::collection::vec(("[ -~]{0,12}", "\\PC{0,16}"), 0..6)
        ) {
            let mapping: IndexMap<String, String> = pairs.into_iter().collect();
            let rendered = dict_to_toml(&mapping);
            let parsed: toml::Table = toml::from_str(&format!("t = {rendered}")).expect("valid TOML");
            let table = parsed["t"].as_table().expect("inline table");
            prop_assert_eq!(table.len(), mapping.len());
            for (key, value) in &mapping {
                prop_assert_eq!(table[key.as_str()].as_str(), Some(value.as_str()));
            }
        }
    }

    #[test]
    fn list_of_dicts_is_not_requoted() {
        let rendered = list_of_dicts_to_toml(&[
            mapping(&[("a", "1"), ("b", "2")]),
            mapping(&[("c", "3"), ("d", "3")])
        ]);
        assert_eq!(rendered, "[\n    {a = \"1\", b = \"2\"},\n    {c = \"3\", d = \"3\"},\n]");
    }
}
