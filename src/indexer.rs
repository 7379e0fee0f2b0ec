//! Build pipelines that feed documents into a [`DatabaseWriter`].
//!
//! A [`DocSource`] yields opaque documents, an [`IndexStrategy`] turns each
//! one into a [`ParsedDoc`], and the indexer writes it to the database in the
//! fixed order id, index, value, data.
//!
//! - [`StaticIndexer`]: parallel parsing with a single writer, used for full
//!   builds. A failing document is logged and skipped.
//! - [`VarIndexer`]: single-threaded, used for small dynamic submissions. The
//!   first failure aborts the call.

pub mod source;
pub mod static_indexer;
pub mod strategy;
pub mod var_indexer;

pub use source::{DocSource, LineSource, OnceSource};
pub use static_indexer::StaticIndexer;
pub use strategy::{IndexStrategy, ParsedDoc};
pub use var_indexer::VarIndexer;

use serde::{Deserialize, Serialize};

use crate::data::InId;
use crate::database::DatabaseWriter;
use crate::error::Result;

/// Outcome of one `build_index` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Documents pulled from the source.
    pub submitted: u64,
    /// Documents fully written.
    pub indexed: u64,
    /// Documents skipped because parsing or a write step failed.
    pub failed: u64,
}

/// Write one parsed document, stopping at the first failing step.
pub(crate) fn write_parsed(db: &dyn DatabaseWriter, doc: &ParsedDoc) -> Result<InId> {
    let in_id = db.alloc_id(doc.out_id)?;
    db.write_index(in_id, &doc.terms)?;
    db.write_value(in_id, &doc.value)?;
    db.write_data(in_id, &doc.data)?;
    Ok(in_id)
}
