use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use parking_lot::Mutex;

use crate::config::DatabaseConfig;
use crate::context::Context;
use crate::data::{InId, OutId, TermInDoc};
use crate::database::DatabaseWriter;
use crate::error::{PlumeError, Result};
use crate::index::static_index::STATIC_INDEX_NAME;
use crate::index::{DiskIndex, IndexTransformManager};
use crate::store::{DataManager, IdManager, ValueManager};

/// Writes a new database generation.
///
/// Documents are inverted in memory (spilling as needed) and the static index
/// is written once, by [`sync`](DatabaseWriter::sync). After that the builder
/// accepts no more writes.
#[derive(Debug)]
pub struct DbBuilder {
    dir: PathBuf,
    config: DatabaseConfig,
    ids: IdManager,
    values: ValueManager,
    data: DataManager,
    transform: Mutex<Option<IndexTransformManager>>,
    finished: AtomicBool,
}

impl DbBuilder {
    pub fn create(ctx: &Context) -> Result<Self> {
        let config = ctx.database().clone();
        let dir = config.path.clone();
        std::fs::create_dir_all(&dir)?;

        let ids = IdManager::create(&dir, config.max_id)?;
        let values = ValueManager::create(&dir, config.max_id, config.value_size)?;
        let data = DataManager::create(&dir, config.max_id, config.max_data_file_size)?;
        let transform = IndexTransformManager::new(&dir, config.transform_max_term_count)?;

        info!("creating database in {}", dir.display());
        Ok(Self {
            dir,
            config,
            ids,
            values,
            data,
            transform: Mutex::new(Some(transform)),
            finished: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_finished() {
            return Err(PlumeError::invalid_state(format!(
                "database {} is already built",
                self.dir.display()
            )));
        }
        Ok(())
    }
}

impl DatabaseWriter for DbBuilder {
    fn alloc_id(&self, out_id: OutId) -> Result<InId> {
        self.check_open()?;
        self.ids.alloc_id(out_id)
    }

    fn write_index(&self, in_id: InId, terms: &[TermInDoc]) -> Result<()> {
        if in_id == 0 {
            return Err(PlumeError::invalid_argument("in id 0 is reserved"));
        }
        let mut transform = self.transform.lock();
        match transform.as_mut() {
            Some(transform) => transform.write_index(in_id, terms),
            None => Err(PlumeError::invalid_state(format!(
                "database {} is already built",
                self.dir.display()
            ))),
        }
    }

    fn write_value(&self, in_id: InId, value: &[u8]) -> Result<()> {
        self.check_open()?;
        self.values.write_value(in_id, value)
    }

    fn write_data(&self, in_id: InId, data: &[u8]) -> Result<()> {
        self.check_open()?;
        self.data.append(in_id, data)
    }

    /// Persist ids, values and payloads, then write the static index.
    fn sync(&self) -> Result<()> {
        let transform = self.transform.lock().take().ok_or_else(|| {
            PlumeError::invalid_state(format!(
                "database {} is already built",
                self.dir.display()
            ))
        })?;
        self.finished.store(true, Ordering::Release);

        self.data.close()?;
        self.values.sync()?;
        self.ids.sync()?;

        let mut index = DiskIndex::create(
            &self.dir,
            STATIC_INDEX_NAME,
            self.config.max_index_file_size,
            transform.term_count(),
        )?;
        transform.dump(&mut index)?;
        index.close()?;

        info!(
            "built database {}: {} documents, {} terms",
            self.dir.display(),
            self.ids.cur_id() - 1,
            index.term_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::index::StaticIndex;
    use tempfile::tempdir;

    fn context(dir: &Path) -> Context {
        Context::new(
            EngineConfig::builder()
                .path(dir.join("db"))
                .max_id(100)
                .value_size(4)
                .transform_max_term_count(5)
                .build()
                .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_then_reject_writes() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        let db = DbBuilder::create(&ctx).unwrap();

        assert!(matches!(
            db.write_index(0, &[TermInDoc::new(1, 1)]),
            Err(PlumeError::InvalidArgument(_))
        ));
        for out_id in [10u32, 20, 30] {
            let in_id = db.alloc_id(out_id).unwrap();
            db.write_index(
                in_id,
                &[TermInDoc::new(1, 1), TermInDoc::new(i64::from(out_id), 2)],
            )
            .unwrap();
            db.write_value(in_id, &out_id.to_be_bytes()).unwrap();
            db.write_data(in_id, format!("doc {out_id}").as_bytes()).unwrap();
        }
        db.sync().unwrap();
        assert!(db.is_finished());

        assert!(matches!(db.sync(), Err(PlumeError::InvalidState(_))));
        assert!(matches!(
            db.write_index(4, &[TermInDoc::new(1, 1)]),
            Err(PlumeError::InvalidState(_))
        ));
        assert!(db.alloc_id(40).is_err());
        assert!(db.write_value(1, b"x").is_err());
        assert!(db.write_data(1, b"x").is_err());

        let index = StaticIndex::open(ctx.db_path()).unwrap();
        assert_eq!(index.term_count(), 4);
        assert_eq!(index.read_index(1).unwrap().len(), 3);
        assert!(!ctx.db_path().join("_tf_tmp").exists());
    }
}
