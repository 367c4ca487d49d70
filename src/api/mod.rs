//! Purpose: Define the stable public Rust API boundary for pairfield.
//! Exports: The widget, the host field wrapper, and the types they exchange.
//! Role: Public, additive-only surface used by the CLI, the demo host, and embedders.
//! Invariants: This module is the only public path to widget behaviour.

mod field;
mod widget;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::attrs::{Attrs, escape_attr_value};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::form::{SubmittedFields, key_param, value_param};
pub use crate::core::pairs::{Pair, PairList};
pub use field::PairListField;
pub use widget::{LengthPolicy, PairListWidget, SafeHtml};
