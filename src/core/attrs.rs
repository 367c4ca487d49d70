//! Purpose: Ordered HTML attribute sets and attribute-value escaping.
//! Exports: `Attrs`, `escape_attr_value`.
//! Role: Flatten construction-time attributes for every rendered input.
//! Invariants: `Attrs::new()` is always a fresh, empty set (never shared).
//! Invariants: Flattened output is `name="value"` tokens in insertion order.
//! Invariants: Every value written into a quoted attribute goes through `escape_attr_value`.

use std::borrow::Cow;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Attrs {
    entries: Vec<(String, String)>,
}

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, replacing an earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Parses a `name=value` assignment as given on the command line.
    pub fn parse_assignment(input: &str) -> Result<(String, String), Error> {
        let Some((name, value)) = input.split_once('=') else {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("attribute assignment {input:?} is missing '='"))
                .with_hint("Use NAME=VALUE, e.g. --key-attr class=key."));
        };
        let name = name.trim();
        if !is_valid_attr_name(name) {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("invalid attribute name {name:?}"))
                .with_hint("Attribute names must be non-empty and contain no spaces, quotes, '=', '<', '>' or '/'."));
        }
        Ok((name.to_string(), value.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for (idx, (name, value)) in self.entries.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
            }
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr_value(value));
            out.push('"');
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attrs::new();
        for (name, value) in iter {
            attrs.insert(name, value);
        }
        attrs
    }
}

fn is_valid_attr_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|ch| {
            ch.is_whitespace() || ch.is_control() || matches!(ch, '"' | '\'' | '=' | '<' | '>' | '/')
        })
}

pub fn escape_attr_value(value: &str) -> Cow<'_, str> {
    if !value
        .bytes()
        .any(|b| matches!(b, b'&' | b'<' | b'>' | b'"' | b'\''))
    {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    Cow::Owned(out)
}
