//! Purpose: Internal JSON parsing boundary shared by the pair model and CLI.
//! Exports: `parse` module with decode helpers and failure categorisation.
//! Role: Single seam for parser details so callsites avoid ad hoc decode logic.
//! Invariants: Stored-value decoding goes through this module.
//! Invariants: Helper APIs stay small and deterministic (no hidden global state).

pub(crate) mod parse;
