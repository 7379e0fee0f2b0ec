use plume::data::{InId, OutId, SearchResult, TermInDoc, TermInQuery, TermWeight};
use plume::indexer::{IndexStrategy, OnceSource, ParsedDoc, VarIndexer};
use plume::util::sign::sign_bkdr;
use plume::{
    Context, DatabaseReader, DatabaseWriter, DbBuilder, DbSearcher, EngineConfig, PlumeError,
    Refresher, Result, SearchStrategy, Searcher,
};

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tempfile::tempdir;

/// `"<out_id> <word>..."`.
struct Words;

impl IndexStrategy for Words {
    fn parse_doc(&self, doc: &[u8]) -> Result<ParsedDoc> {
        let text = std::str::from_utf8(doc).map_err(|e| PlumeError::parse(e.to_string()))?;
        let mut words = text.split_whitespace();
        let out_id = words
            .next()
            .and_then(|w| w.parse().ok())
            .ok_or_else(|| PlumeError::parse("missing out id"))?;
        Ok(ParsedDoc {
            out_id,
            terms: words.map(|w| TermInDoc::new(sign_bkdr(w), 1)).collect(),
            value: vec![1],
            data: doc.to_vec(),
        })
    }
}

/// `+word` mandatory, `word` optional; responds with out ids in rank order.
struct Ids;

impl SearchStrategy for Ids {
    type Query = ();

    fn parse_query(&self, request: &[u8]) -> Result<(Vec<TermInQuery>, ())> {
        let text = std::str::from_utf8(request).map_err(|e| PlumeError::parse(e.to_string()))?;
        let terms = text
            .split_whitespace()
            .map(|w| match w.strip_prefix('+') {
                Some(w) => TermInQuery::mandatory(sign_bkdr(w), 1),
                None => TermInQuery::optional(sign_bkdr(w), 1),
            })
            .collect();
        Ok((terms, ()))
    }

    fn cal_weight(
        &self,
        _query: &(),
        _in_id: InId,
        _out_id: OutId,
        _terms: &[TermInQuery],
        hits: &[TermInDoc],
    ) -> Result<TermWeight> {
        Ok(hits.iter().map(|h| h.weight).sum())
    }

    fn response(
        &self,
        _query: &(),
        results: &[SearchResult],
        _db: &dyn DatabaseReader,
        response: &mut Vec<u8>,
    ) -> Result<usize> {
        let before = response.len();
        for result in results {
            response.extend_from_slice(&result.out_id.to_be_bytes());
        }
        Ok(response.len() - before)
    }
}

fn context(root: &Path, min_sync_interval: Duration) -> Context {
    let config = EngineConfig::builder()
        .path(root.join("db"))
        .max_id(500)
        .value_size(1)
        .max_index_file_size(1 << 16)
        .max_data_file_size(1 << 16)
        .min_sync_interval(min_sync_interval)
        .refresh_interval(Duration::from_millis(20))
        .build()
        .unwrap();
    Context::new(config).unwrap()
}

fn build_static(ctx: &Context) {
    let db = DbBuilder::create(ctx).unwrap();
    for (out_id, words) in [(100u32, "alpha beta"), (101, "alpha"), (102, "beta gamma")] {
        let in_id = db.alloc_id(out_id).unwrap();
        let terms: Vec<TermInDoc> = words
            .split_whitespace()
            .map(|w| TermInDoc::new(sign_bkdr(w), 1))
            .collect();
        db.write_index(in_id, &terms).unwrap();
        db.write_value(in_id, &[0]).unwrap();
        db.write_data(in_id, words.as_bytes()).unwrap();
    }
    db.sync().unwrap();
}

fn search(searcher: &Searcher<Ids>, query: &str) -> Vec<u32> {
    let mut response = Vec::new();
    searcher.search(query.as_bytes(), &mut response).unwrap();
    response
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn test_mandatory_terms_across_static_and_dynamic() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), Duration::ZERO);
    build_static(&ctx);

    let db = Arc::new(DbSearcher::open(&ctx).unwrap());
    let indexer = VarIndexer::new(db.clone(), Words, &ctx).unwrap();
    indexer.build_index(&mut OnceSource::new("200 alpha gamma")).unwrap();
    indexer.build_index(&mut OnceSource::new("201 beta delta")).unwrap();

    let searcher = Searcher::new(db.clone(), Ids, &ctx).unwrap();
    // A and B mandatory, C optional: a document with A and C but not B is out.
    assert_eq!(search(&searcher, "+alpha +beta gamma"), vec![100]);
    assert_eq!(search(&searcher, "+alpha gamma"), vec![200, 100, 101]);
    assert_eq!(search(&searcher, "+beta"), vec![100, 102, 201]);

    // Same answers after the dynamic postings move to disk.
    assert!(db.sync_now().unwrap());
    assert_eq!(search(&searcher, "+alpha gamma"), vec![200, 100, 101]);
    assert_eq!(db.var_index().memory_term_count(), 0);
}

#[test]
fn test_compaction_is_invisible_to_readers() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), Duration::ZERO);
    build_static(&ctx);

    let db = Arc::new(DbSearcher::open(&ctx).unwrap());
    let indexer = VarIndexer::new(db.clone(), Words, &ctx).unwrap();
    for out_id in 300..340u32 {
        indexer
            .build_index(&mut OnceSource::new(format!("{out_id} shared")))
            .unwrap();
    }

    let stop = AtomicBool::new(false);
    std::thread::scope(|s| {
        for _ in 0..3 {
            s.spawn(|| {
                while !stop.load(Ordering::Relaxed) {
                    assert_eq!(db.read_index(sign_bkdr("shared")).unwrap().len(), 40);
                }
            });
        }
        for round in 0..8u32 {
            indexer
                .build_index(&mut OnceSource::new(format!("{} round{}", 400 + round, round)))
                .unwrap();
            db.sync_now().unwrap();
        }
        stop.store(true, Ordering::Relaxed);
    });

    assert_eq!(db.read_index(sign_bkdr("round7")).unwrap().len(), 1);
}

#[test]
fn test_refresher_compacts_in_background() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), Duration::ZERO);
    build_static(&ctx);

    let db = Arc::new(DbSearcher::open(&ctx).unwrap());
    let indexer = VarIndexer::new(db.clone(), Words, &ctx).unwrap();
    indexer.build_index(&mut OnceSource::new("250 late")).unwrap();
    assert_eq!(db.var_index().current_slot(), None);

    let mut refresher = Refresher::start(db.clone(), &ctx).unwrap();
    let deadline = Instant::now() + Duration::from_secs(10);
    while db.var_index().current_slot().is_none() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
    refresher.stop();

    assert_eq!(db.var_index().current_slot(), Some(0));
    assert_eq!(db.var_index().memory_term_count(), 0);
    assert_eq!(db.read_index(sign_bkdr("late")).unwrap().len(), 1);
}

#[test]
fn test_compacted_documents_survive_reopen() {
    let dir = tempdir().unwrap();
    let ctx = context(dir.path(), Duration::from_secs(3600));
    build_static(&ctx);

    {
        let db = Arc::new(DbSearcher::open(&ctx).unwrap());
        let indexer = VarIndexer::new(db.clone(), Words, &ctx).unwrap();
        indexer.build_index(&mut OnceSource::new("260 kept")).unwrap();
        // Interval not reached yet.
        db.sync().unwrap();
        assert_eq!(db.var_index().current_slot(), None);
        assert!(db.sync_now().unwrap());
    }

    let db = DbSearcher::open(&ctx).unwrap();
    let list = db.read_index(sign_bkdr("kept")).unwrap();
    assert_eq!(list.len(), 1);
    let in_id = list.iter().next().unwrap().in_id;
    assert_eq!(db.get_out_id(in_id).unwrap(), 260);
    assert_eq!(db.read_data(in_id).unwrap(), b"260 kept".to_vec());
}
