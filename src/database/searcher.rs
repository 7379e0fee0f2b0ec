use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::context::Context;
use crate::data::{InId, OutId, Posting, TermInDoc, TermSign};
use crate::database::{DatabaseReader, DatabaseWriter};
use crate::error::{PlumeError, Result};
use crate::index::{StaticIndex, VarIndex};
use crate::posting::PostingList;
use crate::store::{DataManager, IdManager, ValueManager};

/// Serves reads over a built database and absorbs new documents.
///
/// Term lookups merge the static index with the dynamic one. New documents
/// take ids after the static build's and become searchable as soon as their
/// postings are written to the dynamic index.
#[derive(Debug)]
pub struct DbSearcher {
    dir: PathBuf,
    ids: IdManager,
    values: ValueManager,
    data: DataManager,
    static_index: StaticIndex,
    var_index: VarIndex,
}

impl DbSearcher {
    pub fn open(ctx: &Context) -> Result<Self> {
        let dir = ctx.db_path().to_path_buf();

        let data = DataManager::open(&dir)?;
        let values = ValueManager::open(&dir)?;
        let ids = IdManager::open(&dir)?;
        let static_index = StaticIndex::open(&dir)?;
        let var_index = VarIndex::open(&dir, ctx.var_index())?;

        info!(
            "opened database {}: {} static terms, next id {}",
            dir.display(),
            static_index.term_count(),
            ids.cur_id()
        );
        Ok(Self {
            dir,
            ids,
            values,
            data,
            static_index,
            var_index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn var_index(&self) -> &VarIndex {
        &self.var_index
    }

    /// Persist the stores, then compact the dynamic index if the sync
    /// interval has passed. Returns whether a compaction ran.
    pub fn refresh(&self) -> Result<bool> {
        self.sync_stores()?;
        self.var_index.sync()
    }

    /// Like [`refresh`](Self::refresh) but ignores the sync interval.
    pub fn sync_now(&self) -> Result<bool> {
        self.sync_stores()?;
        self.var_index.sync_now()
    }

    // The id counter must be on disk before any compacted posting refers to it.
    fn sync_stores(&self) -> Result<()> {
        self.ids.sync()?;
        self.values.sync()?;
        self.data.sync()
    }
}

impl DatabaseReader for DbSearcher {
    fn get_out_id(&self, in_id: InId) -> Result<OutId> {
        self.ids.get_out_id(in_id)
    }

    /// Static and dynamic postings of `term`; a failing side counts as empty.
    fn read_index(&self, term: TermSign) -> Result<PostingList> {
        let mut list = self.static_index.read_index(term).unwrap_or_else(|e| {
            if !e.is_not_found() {
                debug!("static index lookup of {term} failed: {e}");
            }
            PostingList::new()
        });
        let dynamic = self.var_index.read_index(term).unwrap_or_else(|e| {
            debug!("var index lookup of {term} failed: {e}");
            PostingList::new()
        });
        list.merge(&dynamic, usize::MAX);
        Ok(list)
    }

    fn read_value(&self, in_id: InId) -> Result<Vec<u8>> {
        self.values.read_value(in_id)
    }

    fn read_data(&self, in_id: InId) -> Result<Vec<u8>> {
        self.data.read_data(in_id)
    }
}

impl DatabaseWriter for DbSearcher {
    fn alloc_id(&self, out_id: OutId) -> Result<InId> {
        self.ids.alloc_id(out_id)
    }

    fn write_index(&self, in_id: InId, terms: &[TermInDoc]) -> Result<()> {
        if in_id == 0 {
            return Err(PlumeError::invalid_argument("in id 0 is reserved"));
        }
        for term in terms {
            let list: PostingList = vec![Posting::new(in_id, term.weight)].into();
            self.var_index.write_index(term.sign, &list)?;
        }
        Ok(())
    }

    fn write_value(&self, in_id: InId, value: &[u8]) -> Result<()> {
        self.values.write_value(in_id, value)
    }

    fn write_data(&self, in_id: InId, data: &[u8]) -> Result<()> {
        self.data.append(in_id, data)
    }

    fn sync(&self) -> Result<()> {
        self.refresh()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::database::DbBuilder;
    use tempfile::tempdir;

    fn context(dir: &Path) -> Context {
        let config = EngineConfig::builder()
            .path(dir.join("db"))
            .max_id(10)
            .value_size(2)
            .max_index_file_size(1 << 16)
            .max_data_file_size(1 << 16)
            .build()
            .unwrap();
        Context::new(config).unwrap()
    }

    #[test]
    fn test_new_ids_follow_the_static_build() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        {
            let builder = DbBuilder::create(&ctx).unwrap();
            assert_eq!(builder.alloc_id(70).unwrap(), 1);
            builder.write_index(1, &[TermInDoc::new(3, 1)]).unwrap();
            builder.sync().unwrap();
        }

        {
            let db = DbSearcher::open(&ctx).unwrap();
            let in_id = db.alloc_id(71).unwrap();
            assert_eq!(in_id, 2);
            db.write_index(in_id, &[TermInDoc::new(3, 5)]).unwrap();
            db.write_value(in_id, b"xy").unwrap();
            db.write_data(in_id, b"payload").unwrap();

            let ids: Vec<InId> = db.read_index(3).unwrap().iter().map(|p| p.in_id).collect();
            assert_eq!(ids, vec![1, 2]);
            assert!(db.sync_now().unwrap());
        }

        let db = DbSearcher::open(&ctx).unwrap();
        assert_eq!(db.alloc_id(72).unwrap(), 3);
        assert_eq!(db.read_value(2).unwrap(), b"xy".to_vec());
        assert_eq!(db.read_data(2).unwrap(), b"payload".to_vec());
        assert_eq!(db.read_index(3).unwrap().len(), 2);
        assert!(db.read_index(4).unwrap().is_empty());
        assert!(db.write_index(0, &[TermInDoc::new(3, 1)]).is_err());
    }

    #[test]
    fn test_interleaved_writers_keep_postings_ascending() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        {
            let builder = DbBuilder::create(&ctx).unwrap();
            builder.alloc_id(9).unwrap();
            builder.write_index(1, &[TermInDoc::new(3, 1)]).unwrap();
            builder.sync().unwrap();
        }

        let db = DbSearcher::open(&ctx).unwrap();
        let first = db.alloc_id(10).unwrap();
        let second = db.alloc_id(11).unwrap();
        db.write_index(second, &[TermInDoc::new(7, 1)]).unwrap();
        db.write_index(first, &[TermInDoc::new(7, 1)]).unwrap();

        let ids: Vec<InId> = db.read_index(7).unwrap().iter().map(|p| p.in_id).collect();
        assert_eq!(ids, vec![first, second]);

        assert!(db.sync_now().unwrap());
        let ids: Vec<InId> = db.read_index(7).unwrap().iter().map(|p| p.in_id).collect();
        assert_eq!(ids, vec![2, 3]);
    }
}
