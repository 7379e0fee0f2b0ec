use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::BuildConfig;
use crate::context::Context;
use crate::database::DatabaseWriter;
use crate::error::{PlumeError, Result};
use crate::indexer::{BuildStats, DocSource, IndexStrategy, ParsedDoc, write_parsed};

/// Parallel build pipeline.
///
/// ```text
/// source --work queue--> N parse workers --write queue--> 1 writer
/// ```
///
/// Both queues are bounded, so a slow writer throttles parsing and parsing
/// throttles the source. Every submitted document ends up counted as indexed
/// or failed.
pub struct StaticIndexer<S> {
    db: Arc<dyn DatabaseWriter>,
    strategy: S,
    config: BuildConfig,
    lock: Mutex<()>,
}

impl<S: IndexStrategy> StaticIndexer<S> {
    /// Initialise `strategy` against `ctx` and wrap it.
    pub fn new(db: Arc<dyn DatabaseWriter>, mut strategy: S, ctx: &Context) -> Result<Self> {
        strategy.init(ctx)?;
        Ok(Self {
            db,
            strategy,
            config: ctx.build().clone(),
            lock: Mutex::new(()),
        })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Index every document of `source`, blocking until all are written or
    /// skipped. Concurrent calls run one after another.
    pub fn build_index(&self, source: &mut dyn DocSource) -> Result<BuildStats> {
        let _build = self.lock.lock();

        let workers = self.config.effective_parse_threads();
        let queue_len = self.config.effective_write_queue_len();
        let (work_tx, work_rx) = bounded::<Vec<u8>>(workers);
        let (write_tx, write_rx) = bounded::<Option<ParsedDoc>>(queue_len);

        info!("building index with {workers} parse workers, write queue {queue_len}");

        let stats = thread::scope(|s| {
            let writer = s.spawn(|| self.write_docs(write_rx));
            for _ in 0..workers {
                let work_rx = work_rx.clone();
                let write_tx = write_tx.clone();
                s.spawn(move || self.parse_docs(work_rx, write_tx));
            }
            drop(work_rx);
            drop(write_tx);

            let mut submitted = 0u64;
            while let Some(doc) = source.next_doc() {
                if work_tx.send(doc).is_err() {
                    warn!("parse workers are gone, stopping after {submitted} documents");
                    break;
                }
                submitted += 1;
            }
            // Closing the work queue lets the workers, then the writer, drain and exit.
            drop(work_tx);

            writer
                .join()
                .map(|(indexed, failed)| BuildStats {
                    submitted,
                    indexed,
                    failed,
                })
                .map_err(|_| PlumeError::internal("index writer thread panicked"))
        })?;

        info!(
            "build finished: {} submitted, {} indexed, {} failed",
            stats.submitted, stats.indexed, stats.failed
        );
        Ok(stats)
    }

    fn parse_docs(&self, work: Receiver<Vec<u8>>, write: Sender<Option<ParsedDoc>>) {
        for doc in work {
            let parsed = match self.strategy.parse_doc(&doc) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!("skipping document that failed to parse: {e}");
                    None
                }
            };
            if write.send(parsed).is_err() {
                break;
            }
        }
        debug!("parse worker exited");
    }

    /// Returns `(indexed, failed)`.
    fn write_docs(&self, write: Receiver<Option<ParsedDoc>>) -> (u64, u64) {
        let (mut indexed, mut failed) = (0u64, 0u64);
        for parsed in write {
            let Some(doc) = parsed else {
                failed += 1;
                continue;
            };
            match write_parsed(self.db.as_ref(), &doc) {
                Ok(_) => indexed += 1,
                Err(e) => {
                    warn!("failed to write document {}: {}", doc.out_id, e);
                    failed += 1;
                }
            }
        }
        debug!("index writer exited");
        (indexed, failed)
    }
}
