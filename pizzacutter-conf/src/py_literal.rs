// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Python literal rendering for placeholders substituted into `setup.py`
//! and `conftest.py`.
//!
//! Output matches what `repr()` prints for `str`, `list[str]` and
//! `dict[str, list[str]]`, so generated sources stay byte-identical to the
//! ones produced by earlier template generations.

use std::fmt::Write as _;

use indexmap::IndexMap;

/// `True` / `False`.
pub fn py_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

/// Renders a string the way `repr(str)` does.
///
/// Single quotes are preferred; double quotes are used when the text contains
/// a single quote but no double quote.
pub fn py_str(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut rendered = String::with_capacity(value.len() + 2);
    rendered.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => rendered.push_str("\\\\"),
            '\n' => rendered.push_str("\\n"),
            '\r' => rendered.push_str("\\r"),
            '\t' => rendered.push_str("\\t"),
            c if c == quote => {
                rendered.push('\\');
                rendered.push(c);
            }
            c if c.is_control() => {
                let _ = write!(rendered, "\\x{:02x}", u32::from(c));
            }
            c => rendered.push(c)
        }
    }
    rendered.push(quote);
    rendered
}

/// Renders `['a', 'b']`.
pub fn py_list<S>(items: &[S]) -> String
where
    S: AsRef<str>
{
    let inner: Vec<String> = items.iter().map(|item| py_str(item.as_ref())).collect();
    format!("[{}]", inner.join(", "))
}

/// Renders `{'key': ['a', 'b']}` preserving insertion order.
pub fn py_dict_of_lists(mapping: &IndexMap<String, Vec<String>>) -> String {
    let inner: Vec<String> = mapping
        .iter()
        .map(|(key, values)| format!("{}: {}", py_str(key), py_list(values)))
        .collect();
    format!("{{{}}}", inner.join(", "))
}
