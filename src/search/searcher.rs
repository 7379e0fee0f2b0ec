use std::sync::Arc;

use log::{debug, warn};

use crate::context::Context;
use crate::data::{DEFAULT_SEARCH_RESULT_CAPACITY, SearchResult, TermInDoc};
use crate::database::DatabaseReader;
use crate::error::Result;
use crate::search::{MergeEngine, SearchStrategy};

/// Runs queries against a database through a [`SearchStrategy`].
pub struct Searcher<S> {
    db: Arc<dyn DatabaseReader>,
    strategy: S,
}

impl<S: SearchStrategy> Searcher<S> {
    pub fn new(db: Arc<dyn DatabaseReader>, mut strategy: S, ctx: &Context) -> Result<Self> {
        strategy.init(ctx)?;
        Ok(Self { db, strategy })
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Answer `request`, appending the strategy's response to `response`.
    /// Returns the number of bytes written.
    ///
    /// Documents missing a mandatory term, without an external id, or that
    /// the strategy fails to score are left out.
    pub fn search(&self, request: &[u8], response: &mut Vec<u8>) -> Result<usize> {
        let (terms, query) = self.strategy.parse_query(request)?;
        let mut engine = MergeEngine::new(self.db.as_ref(), &terms)?;

        let mut results: Vec<SearchResult> = Vec::with_capacity(DEFAULT_SEARCH_RESULT_CAPACITY);
        let mut hits = vec![TermInDoc::default(); terms.len()];

        while let Some(hit) = engine.next(&mut hits)? {
            if !hit.valid {
                continue;
            }
            let out_id = match self.db.get_out_id(hit.in_id) {
                Ok(0) => {
                    warn!("merge produced in id {} without an out id", hit.in_id);
                    continue;
                }
                Ok(out_id) => out_id,
                Err(e) => {
                    warn!("no out id for in id {}: {}", hit.in_id, e);
                    continue;
                }
            };
            match self
                .strategy
                .cal_weight(&query, hit.in_id, out_id, &terms, &hits)
            {
                Ok(weight) => results.push(SearchResult {
                    in_id: hit.in_id,
                    out_id,
                    weight,
                }),
                Err(e) => debug!("dropping in id {}: {}", hit.in_id, e),
            }
        }

        self.strategy.filter(&query, &mut results)?;
        self.strategy.adjust(&query, &mut results, self.db.as_ref())?;
        self.strategy
            .response(&query, &results, self.db.as_ref(), response)
    }
}
