//! Transformation module.
//!
//! - Policy: existence column detection and value matching
//! - Table: the pure filter/projection/coercion step
//! - Pipeline: spreadsheet bytes to JSON document

pub mod pipeline;
pub mod policy;
pub mod table;

pub use pipeline::*;
pub use policy::*;
pub use table::*;
