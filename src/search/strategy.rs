use crate::context::Context;
use crate::data::{InId, OutId, SearchResult, TermInDoc, TermInQuery, TermWeight, sort_results};
use crate::database::DatabaseReader;
use crate::error::Result;

/// Query parsing, scoring and response building for a [`Searcher`].
///
/// `Query` carries whatever the strategy extracted from the request through
/// the later stages of the same search.
///
/// [`Searcher`]: crate::search::Searcher
pub trait SearchStrategy: Send + Sync {
    type Query;

    fn init(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    fn parse_query(&self, request: &[u8]) -> Result<(Vec<TermInQuery>, Self::Query)>;

    /// Score one document. `hits[i]` holds the weight of `terms[i]` in the
    /// document, or zero when the term does not occur in it. An error drops
    /// the document.
    fn cal_weight(
        &self,
        query: &Self::Query,
        in_id: InId,
        out_id: OutId,
        terms: &[TermInQuery],
        hits: &[TermInDoc],
    ) -> Result<TermWeight>;

    /// Remove unwanted results.
    fn filter(&self, _query: &Self::Query, _results: &mut Vec<SearchResult>) -> Result<()> {
        Ok(())
    }

    /// Settle the final order. Ranks by weight by default.
    fn adjust(
        &self,
        _query: &Self::Query,
        results: &mut Vec<SearchResult>,
        _db: &dyn DatabaseReader,
    ) -> Result<()> {
        sort_results(results);
        Ok(())
    }

    /// Append the response for `results` to `response`, returning the number
    /// of bytes written.
    fn response(
        &self,
        query: &Self::Query,
        results: &[SearchResult],
        db: &dyn DatabaseReader,
        response: &mut Vec<u8>,
    ) -> Result<usize>;
}
