//! Purpose: Host-side field wrapper that cleans values produced by the widget.
//! Exports: `PairListField`.
//! Role: What a form framework's field does around the widget: required checks and normalisation.
//! Invariants: Cleaning drops empty keys; the cleaned list re-encodes to a fixed point.

use crate::api::widget::{PairListWidget, SafeHtml};
use crate::core::error::{Error, ErrorKind};
use crate::core::form::SubmittedFields;
use crate::core::pairs::PairList;

#[derive(Clone, Debug, Default)]
pub struct PairListField {
    widget: PairListWidget,
    required: bool,
}

impl PairListField {
    pub fn new(widget: PairListWidget) -> Self {
        Self {
            widget,
            required: false,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn widget(&self) -> &PairListWidget {
        &self.widget
    }

    pub fn render(&self, name: &str, value: Option<&str>) -> Result<SafeHtml, Error> {
        self.widget.render(name, value)
    }

    pub fn value_from_submission(
        &self,
        fields: &SubmittedFields,
        name: &str,
    ) -> Result<Option<String>, Error> {
        self.widget.parse(fields, name)
    }

    /// Validates a raw value for storage.
    pub fn clean(&self, name: &str, value: Option<&str>) -> Result<PairList, Error> {
        let pairs = match value {
            Some(value) => PairList::decode(value).map_err(|err| err.with_field(name))?,
            None => PairList::new(),
        }
        .without_empty_keys();
        if self.required && pairs.is_empty() {
            return Err(Error::new(ErrorKind::Required)
                .with_message("at least one key/value pair is required")
                .with_field(name));
        }
        Ok(pairs)
    }
}
