//! Per-document storage keyed by internal id.
//!
//! - [`id::IdManager`] allocates internal ids and maps them back to the
//!   caller's external ids.
//! - [`value::ValueManager`] keeps one fixed-length value per document.
//! - [`data::DataManager`] keeps one variable-length payload per document.

pub mod data;
pub mod id;
pub mod value;

pub use data::DataManager;
pub use id::IdManager;
pub use value::{MAX_VALUE_FILE_SIZE, ValueManager};
