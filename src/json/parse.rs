//! Purpose: Provide the internal JSON decode entrypoint and failure categories.
//! Exports: `from_str`, `ParseFailureCategory`, `categorize_error`, `hint_for_error`.
//! Role: Parser boundary that centralizes serde_json usage details.
//! Invariants: Category labels are stable; they surface in user-facing hints.
//! Notes: Error mapping is done by callsites so domain context stays explicit.

use serde::de::DeserializeOwned;
use serde_json::error::Category;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ParseFailureCategory {
    Syntax,
    Eof,
    Shape,
    Io,
}

impl ParseFailureCategory {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::Eof => "eof",
            ParseFailureCategory::Shape => "shape",
            ParseFailureCategory::Io => "io",
        }
    }
}

pub(crate) fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(input)
}

pub(crate) fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    match err.classify() {
        Category::Syntax => ParseFailureCategory::Syntax,
        Category::Eof => ParseFailureCategory::Eof,
        Category::Data => ParseFailureCategory::Shape,
        Category::Io => ParseFailureCategory::Io,
    }
}

pub(crate) fn hint_for_error(err: &serde_json::Error, context: &str) -> String {
    let category = categorize_error(err);
    let advice = match category {
        ParseFailureCategory::Syntax => "value is not valid JSON",
        ParseFailureCategory::Eof => "value ends before the JSON document is complete",
        ParseFailureCategory::Shape => {
            "expected an array of two-element string arrays, e.g. [[\"key\",\"value\"]]"
        }
        ParseFailureCategory::Io => "failed to read JSON input",
    };
    format!(
        "{advice} (parse category: {}; line {} column {}; context: {context})",
        category.label(),
        err.line(),
        err.column()
    )
}
