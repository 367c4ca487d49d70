//! Purpose: Model the ordered key/value pair list and its JSON encoding.
//! Exports: `Pair`, `PairList`.
//! Role: Decode stored values for rendering and encode parsed submissions.
//! Invariants: Order is preserved; duplicate keys are allowed and kept.
//! Invariants: Encoding is compact JSON `[[k,v],...]`; decode(encode(p)) == p.
//! Invariants: Blank input and `{}` decode to the empty list; `null` is malformed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::json::parse;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, String)", into = "(String, String)")]
pub struct Pair {
    pub key: String,
    pub value: String,
}

impl Pair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<(String, String)> for Pair {
    fn from((key, value): (String, String)) -> Self {
        Self { key, value }
    }
}

impl From<Pair> for (String, String) {
    fn from(pair: Pair) -> Self {
        (pair.key, pair.value)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairList {
    pairs: Vec<Pair>,
}

impl PairList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a stored value.
    ///
    /// Blank text and an empty JSON object are the "no pairs" case.
    /// Anything else must be an array of two-element string arrays, or the
    /// call fails with [`ErrorKind::MalformedValue`].
    pub fn decode(encoded: &str) -> Result<Self, Error> {
        let trimmed = encoded.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }
        if trimmed.starts_with('{') {
            return decode_placeholder(trimmed);
        }
        parse::from_str::<PairList>(trimmed).map_err(|err| {
            Error::new(ErrorKind::MalformedValue)
                .with_message("stored value is not a JSON list of pairs")
                .with_hint(parse::hint_for_error(&err, "pair list"))
                .with_source(err)
        })
    }

    pub fn encode(&self) -> String {
        // Vec<(String, String)> cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn without_empty_keys(self) -> Self {
        self.pairs
            .into_iter()
            .filter(|pair| !pair.key.is_empty())
            .collect()
    }

    pub fn push(&mut self, pair: Pair) {
        self.pairs.push(pair);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pair> {
        self.pairs.iter()
    }

    pub fn as_slice(&self) -> &[Pair] {
        &self.pairs
    }
}

fn decode_placeholder(trimmed: &str) -> Result<PairList, Error> {
    let value: Value = parse::from_str(trimmed).map_err(|err| {
        Error::new(ErrorKind::MalformedValue)
            .with_message("stored value is not valid JSON")
            .with_hint(parse::hint_for_error(&err, "pair list"))
            .with_source(err)
    })?;
    match value {
        Value::Object(map) if map.is_empty() => Ok(PairList::new()),
        _ => Err(Error::new(ErrorKind::MalformedValue)
            .with_message("stored value is a non-empty JSON object")
            .with_hint("expected an array of two-element string arrays, e.g. [[\"key\",\"value\"]]")),
    }
}

impl FromIterator<Pair> for PairList {
    fn from_iter<I: IntoIterator<Item = Pair>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> From<Vec<(K, V)>> for PairList {
    fn from(pairs: Vec<(K, V)>) -> Self {
        pairs
            .into_iter()
            .map(|(key, value)| Pair::new(key, value))
            .collect()
    }
}

impl IntoIterator for PairList {
    type Item = Pair;
    type IntoIter = std::vec::IntoIter<Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<'a> IntoIterator for &'a PairList {
    type Item = &'a Pair;
    type IntoIter = std::slice::Iter<'a, Pair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}
