//! Purpose: Library crate backing the `pairfield` CLI, demo host, and tests.
//! Exports: `api` (widget, field, pair model, errors); `core` for internal building blocks.
//! Role: Key/value pair-list form widget; JSON `[[k,v],...]` <-> repeated text inputs.
//! Invariants: Widget operations are pure; no state survives between calls.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
mod json;
