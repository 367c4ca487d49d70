//! Purpose: The pair-list form widget: render stored JSON, parse submitted fields.
//! Exports: `PairListWidget`, `LengthPolicy`, `SafeHtml`.
//! Role: Stateless codec between `[[k,v],...]` JSON and repeated text inputs.
//! Invariants: Render and parse read only construction-time configuration.
//! Invariants: All text written into markup is attribute-escaped.
//! Invariants: A field that was not submitted parses to `Ok(None)`.
//! Notes: Key/value length mismatches follow `LengthPolicy` (truncate by default).

use std::fmt;

use tracing::{debug, warn};

use crate::core::attrs::{Attrs, escape_attr_value};
use crate::core::error::{Error, ErrorKind};
use crate::core::form::{SubmittedFields, key_param, value_param};
use crate::core::pairs::{Pair, PairList};

/// How `parse` treats a submission with different key and value counts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LengthPolicy {
    /// Pair by position up to the shorter sequence; extras are dropped.
    #[default]
    Truncate,
    /// Fail with `ErrorKind::MalformedSubmission`.
    Reject,
}

/// Markup the widget has already escaped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SafeHtml(String);

impl SafeHtml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SafeHtml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<SafeHtml> for String {
    fn from(html: SafeHtml) -> Self {
        html.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct PairListWidget {
    key_attrs: Attrs,
    value_attrs: Attrs,
    length_policy: LengthPolicy,
    extra_rows: usize,
}

impl PairListWidget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_attrs(mut self, attrs: Attrs) -> Self {
        self.key_attrs = attrs;
        self
    }

    pub fn with_value_attrs(mut self, attrs: Attrs) -> Self {
        self.value_attrs = attrs;
        self
    }

    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    /// Appends `rows` blank input pairs after the stored ones.
    pub fn with_extra_rows(mut self, rows: usize) -> Self {
        self.extra_rows = rows;
        self
    }

    pub fn key_attrs(&self) -> &Attrs {
        &self.key_attrs
    }

    pub fn value_attrs(&self) -> &Attrs {
        &self.value_attrs
    }

    pub fn length_policy(&self) -> LengthPolicy {
        self.length_policy
    }

    pub fn extra_rows(&self) -> usize {
        self.extra_rows
    }

    /// Renders one `<input> <input><br/>` line per stored pair.
    ///
    /// `None`, blank text and `{}` render no stored pairs. A value that does
    /// not decode fails with `ErrorKind::MalformedValue` tagged with `name`.
    pub fn render(&self, name: &str, value: Option<&str>) -> Result<SafeHtml, Error> {
        let pairs = match value {
            Some(value) => PairList::decode(value).map_err(|err| err.with_field(name))?,
            None => PairList::new(),
        };
        Ok(self.render_pairs(name, &pairs))
    }

    pub fn render_pairs(&self, name: &str, pairs: &PairList) -> SafeHtml {
        let key_name = escape_attr_value(&key_param(name)).into_owned();
        let value_name = escape_attr_value(&value_param(name)).into_owned();
        let key_attrs = trailing_attrs(&self.key_attrs);
        let value_attrs = trailing_attrs(&self.value_attrs);

        let blank = Pair::default();
        let rows = pairs
            .iter()
            .chain(std::iter::repeat_n(&blank, self.extra_rows));

        let mut out = String::new();
        for pair in rows {
            out.push_str(&format!(
                "<input type=\"text\" name=\"{key_name}\" value=\"{}\"{key_attrs}> \
                 <input type=\"text\" name=\"{value_name}\" value=\"{}\"{value_attrs}><br/>",
                escape_attr_value(&pair.key),
                escape_attr_value(&pair.value),
            ));
        }
        debug!(
            field = name,
            pairs = pairs.len(),
            extra_rows = self.extra_rows,
            "rendered pair list"
        );
        SafeHtml(out)
    }

    /// Reassembles a submission into an encoded pair list.
    ///
    /// Returns `Ok(None)` when `json_key[name]` was not submitted at all.
    /// Pairs with an empty key are dropped; empty values are kept.
    pub fn parse(&self, fields: &SubmittedFields, name: &str) -> Result<Option<String>, Error> {
        Ok(self
            .parse_pairs(fields, name)?
            .map(|pairs| pairs.encode()))
    }

    pub fn parse_pairs(
        &self,
        fields: &SubmittedFields,
        name: &str,
    ) -> Result<Option<PairList>, Error> {
        let Some(keys) = fields.get_all(&key_param(name)) else {
            debug!(field = name, "pair list not submitted");
            return Ok(None);
        };
        let values = fields.get_all(&value_param(name)).unwrap_or(&[]);

        if keys.len() != values.len() {
            match self.length_policy {
                LengthPolicy::Reject => {
                    return Err(Error::new(ErrorKind::MalformedSubmission)
                        .with_message(format!(
                            "submitted {} keys but {} values",
                            keys.len(),
                            values.len()
                        ))
                        .with_hint("Each key input must be submitted with its value input.")
                        .with_field(name));
                }
                LengthPolicy::Truncate => {
                    warn!(
                        field = name,
                        keys = keys.len(),
                        values = values.len(),
                        "key/value count mismatch; pairing up to the shorter list"
                    );
                }
            }
        }

        let pairs: PairList = keys
            .iter()
            .zip(values)
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| Pair::new(key.as_str(), value.as_str()))
            .collect();
        debug!(field = name, pairs = pairs.len(), "parsed pair list");
        Ok(Some(pairs))
    }

    /// Decodes, drops empty keys, and re-encodes a stored value.
    pub fn normalize(&self, value: &str) -> Result<String, Error> {
        Ok(PairList::decode(value)?.without_empty_keys().encode())
    }
}

fn trailing_attrs(attrs: &Attrs) -> String {
    if attrs.is_empty() {
        String::new()
    } else {
        format!(" {}", attrs.flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::{LengthPolicy, PairListWidget};
    use crate::core::attrs::Attrs;
    use crate::core::error::ErrorKind;
    use crate::core::form::SubmittedFields;

    fn fields(entries: &[(&str, &str)]) -> SubmittedFields {
        entries.iter().copied().collect()
    }

    #[test]
    fn blank_and_empty_object_render_nothing() {
        let widget = PairListWidget::new()
            .with_key_attrs(Attrs::new().with("class", "k"))
            .with_value_attrs(Attrs::new().with("class", "v"));
        for value in [None, Some(""), Some("   "), Some("{}"), Some("[]")] {
            let html = widget.render("f", value).expect("render");
            assert!(html.is_empty(), "value {value:?}");
        }
    }

    #[test]
    fn render_emits_one_line_per_pair_in_order() {
        let widget = PairListWidget::new();
        let html = widget
            .render("f", Some(r#"[["a","1"],["b","2"]]"#))
            .expect("render");
        assert_eq!(
            html.as_str(),
            concat!(
                r#"<input type="text" name="json_key[f]" value="a"> "#,
                r#"<input type="text" name="json_value[f]" value="1"><br/>"#,
                r#"<input type="text" name="json_key[f]" value="b"> "#,
                r#"<input type="text" name="json_value[f]" value="2"><br/>"#,
            )
        );
    }

    #[test]
    fn render_applies_attrs_to_every_pair() {
        let widget = PairListWidget::new()
            .with_key_attrs(Attrs::new().with("class", "key").with("size", "8"))
            .with_value_attrs(Attrs::new().with("class", "val"));
        let html = widget
            .render("meta", Some(r#"[["x","1"],["y","2"]]"#))
            .expect("render");
        assert_eq!(html.as_str().matches(r#"class="key" size="8">"#).count(), 2);
        assert_eq!(html.as_str().matches(r#"class="val"><br/>"#).count(), 2);
    }

    #[test]
    fn render_escapes_quotes_in_keys_values_and_name() {
        let widget = PairListWidget::new();
        let html = widget
            .render(r#"a"b"#, Some(r#"[["k\"><script>","v'&"]]"#))
            .expect("render");
        let text = html.as_str();
        assert!(text.contains(r#"name="json_key[a&quot;b]""#));
        assert!(text.contains(r#"value="k&quot;&gt;&lt;script&gt;""#));
        assert!(text.contains(r#"value="v&#39;&amp;""#));
        assert!(!text.contains("<script>"));
        assert_eq!(text.matches('"').count() % 2, 0);
    }

    #[test]
    fn render_rejects_malformed_value() {
        let widget = PairListWidget::new();
        let err = widget
            .render("f", Some(r#"{"a":"1"}"#))
            .expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::MalformedValue);
        assert_eq!(err.field(), Some("f"));
    }

    #[test]
    fn stored_null_is_malformed() {
        let widget = PairListWidget::new();
        let err = widget.render("f", Some("null")).expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::MalformedValue);
        let err = widget.normalize(" null ").expect_err("malformed");
        assert_eq!(err.kind(), ErrorKind::MalformedValue);
    }

    #[test]
    fn extra_rows_append_blank_pairs() {
        let widget = PairListWidget::new().with_extra_rows(2);
        let html = widget.render("f", Some(r#"[["a","1"]]"#)).expect("render");
        assert_eq!(html.as_str().matches("<br/>").count(), 3);
        assert_eq!(html.as_str().matches(r#"value="""#).count(), 4);
    }

    #[test]
    fn parse_pairs_keys_with_values() {
        let widget = PairListWidget::new();
        let submitted = fields(&[
            ("json_key[f]", "a"),
            ("json_key[f]", "b"),
            ("json_value[f]", "1"),
            ("json_value[f]", "2"),
        ]);
        assert_eq!(
            widget.parse(&submitted, "f").expect("parse").as_deref(),
            Some(r#"[["a","1"],["b","2"]]"#)
        );
    }

    #[test]
    fn parse_drops_empty_keys_and_keeps_empty_values() {
        let widget = PairListWidget::new();
        let submitted = fields(&[
            ("json_key[f]", ""),
            ("json_key[f]", "b"),
            ("json_key[f]", "c"),
            ("json_value[f]", "1"),
            ("json_value[f]", "2"),
            ("json_value[f]", ""),
        ]);
        assert_eq!(
            widget.parse(&submitted, "f").expect("parse").as_deref(),
            Some(r#"[["b","2"],["c",""]]"#)
        );
    }

    #[test]
    fn parse_without_submission_is_none() {
        let widget = PairListWidget::new();
        assert_eq!(widget.parse(&SubmittedFields::new(), "f").expect("parse"), None);
        let other = fields(&[("json_key[g]", "a"), ("json_value[g]", "1")]);
        assert_eq!(widget.parse(&other, "f").expect("parse"), None);
    }

    #[test]
    fn parse_keys_only_yields_empty_list() {
        let widget = PairListWidget::new();
        let submitted = fields(&[("json_key[f]", "a")]);
        assert_eq!(
            widget.parse(&submitted, "f").expect("parse").as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn length_mismatch_follows_policy() {
        let submitted = fields(&[
            ("json_key[f]", "a"),
            ("json_key[f]", "b"),
            ("json_value[f]", "1"),
        ]);

        let truncating = PairListWidget::new();
        assert_eq!(
            truncating.parse(&submitted, "f").expect("parse").as_deref(),
            Some(r#"[["a","1"]]"#)
        );

        let strict = PairListWidget::new().with_length_policy(LengthPolicy::Reject);
        let err = strict.parse(&submitted, "f").expect_err("mismatch");
        assert_eq!(err.kind(), ErrorKind::MalformedSubmission);
        assert_eq!(err.field(), Some("f"));
    }

    #[test]
    fn duplicate_keys_are_preserved() {
        let widget = PairListWidget::new();
        let submitted = fields(&[
            ("json_key[f]", "a"),
            ("json_key[f]", "a"),
            ("json_value[f]", "1"),
            ("json_value[f]", "2"),
        ]);
        assert_eq!(
            widget.parse(&submitted, "f").expect("parse").as_deref(),
            Some(r#"[["a","1"],["a","2"]]"#)
        );
    }

    #[test]
    fn normalize_reaches_fixed_point() {
        let widget = PairListWidget::new();
        let once = widget
            .normalize(r#" [["","x"], ["a","1"]] "#)
            .expect("normalize");
        assert_eq!(once, r#"[["a","1"]]"#);
        assert_eq!(widget.normalize(&once).expect("normalize"), once);
        assert_eq!(widget.normalize("").expect("normalize"), "[]");
    }

    #[test]
    fn widget_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PairListWidget>();
    }
}
