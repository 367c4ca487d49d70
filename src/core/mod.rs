// Core modules implementing the pair model, attribute rendering, and error modeling.
pub mod attrs;
pub mod error;
pub mod form;
pub mod pairs;
