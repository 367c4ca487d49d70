//! Purpose: Represent submitted form parameters as an ordered multimap.
//! Exports: `SubmittedFields`, `key_param`, `value_param`.
//! Role: Parse boundary between raw request bodies and the widget.
//! Invariants: Repeated parameters keep submission order per name.
//! Invariants: Parameter names for a field are `json_key[NAME]` / `json_value[NAME]`.

use std::collections::HashMap;

pub fn key_param(field: &str) -> String {
    format!("json_key[{field}]")
}

pub fn value_param(field: &str) -> String {
    format!("json_value[{field}]")
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubmittedFields {
    params: HashMap<String, Vec<String>>,
}

impl SubmittedFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &[u8]) -> Self {
        url::form_urlencoded::parse(body)
            .into_owned()
            .collect()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// All values submitted under `name`, or `None` when it never appeared.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.params.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SubmittedFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = SubmittedFields::new();
        for (name, value) in iter {
            fields.append(name, value);
        }
        fields
    }
}
