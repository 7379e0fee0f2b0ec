use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::context::Context;
use crate::database::DatabaseWriter;
use crate::error::Result;
use crate::indexer::{BuildStats, DocSource, IndexStrategy, write_parsed};

/// Single-threaded indexer for small submissions to a live database.
///
/// Unlike [`StaticIndexer`](crate::indexer::StaticIndexer), the first document
/// that fails to parse or write aborts the call with its error. Documents
/// written before it stay written.
pub struct VarIndexer<S> {
    db: Arc<dyn DatabaseWriter>,
    strategy: S,
    lock: Mutex<()>,
}

impl<S: IndexStrategy> VarIndexer<S> {
    pub fn new(db: Arc<dyn DatabaseWriter>, mut strategy: S, ctx: &Context) -> Result<Self> {
        strategy.init(ctx)?;
        Ok(Self {
            db,
            strategy,
            lock: Mutex::new(()),
        })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn build_index(&self, source: &mut dyn DocSource) -> Result<BuildStats> {
        let _build = self.lock.lock();
        let mut stats = BuildStats::default();
        while let Some(doc) = source.next_doc() {
            stats.submitted += 1;
            let parsed = self.strategy.parse_doc(&doc)?;
            let in_id = write_parsed(self.db.as_ref(), &parsed)?;
            debug!("indexed document {} as {}", parsed.out_id, in_id);
            stats.indexed += 1;
        }
        Ok(stats)
    }
}
