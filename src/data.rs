//! Core data model shared by every layer of the engine.
//!
//! Terms are never stored as strings: a strategy hashes each token into a
//! [`TermSign`] and the engine compares and orders terms only by that value.
//! Documents get a caller-supplied [`OutId`] and a dense, engine-assigned
//! [`InId`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 64-bit term signature.
pub type TermSign = i64;

/// Per-term score supplied by the index strategy.
pub type TermWeight = i32;

/// Dense internal document id. `0` is never allocated.
pub type InId = u32;

/// Caller-supplied external document id. `0` is invalid.
pub type OutId = u32;

/// Maximum number of terms a single query may carry.
pub const MAX_QUERY_TERMS: usize = 32;

/// Upper bound on the number of postings a reader keeps per term.
pub const MAX_POSTING_LIST_LEN: usize = 100_000;

/// Initial capacity of a search result list.
pub const DEFAULT_SEARCH_RESULT_CAPACITY: usize = 10_000;

/// Fixed-length per-document value.
pub type Value = Vec<u8>;

/// Variable-length per-document payload.
pub type Data = Vec<u8>;

/// One entry of a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Posting {
    pub in_id: InId,
    pub weight: TermWeight,
}

impl Posting {
    pub fn new(in_id: InId, weight: TermWeight) -> Self {
        Self { in_id, weight }
    }
}

/// A term as it occurs in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInDoc {
    pub sign: TermSign,
    pub weight: TermWeight,
}

impl TermInDoc {
    pub fn new(sign: TermSign, weight: TermWeight) -> Self {
        Self { sign, weight }
    }
}

/// A term as it occurs in a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInQuery {
    pub sign: TermSign,
    /// Weight of the term inside the query; strategy defined.
    pub weight: TermWeight,
    /// Free-form attribute bits for the search strategy.
    pub attr: u32,
    /// Optional terms may be absent from a matching document.
    pub can_omit: bool,
    /// Ignore positional information for this term.
    pub skip_offset: bool,
}

impl TermInQuery {
    /// A term every result must contain.
    pub fn mandatory(sign: TermSign, weight: TermWeight) -> Self {
        Self {
            sign,
            weight,
            ..Default::default()
        }
    }

    /// A term that only contributes to scoring.
    pub fn optional(sign: TermSign, weight: TermWeight) -> Self {
        Self {
            sign,
            weight,
            can_omit: true,
            ..Default::default()
        }
    }
}

/// A scored search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub in_id: InId,
    pub out_id: OutId,
    pub weight: TermWeight,
}

impl SearchResult {
    /// Ranking order: higher weight first, ties broken by ascending internal id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| self.in_id.cmp(&other.in_id))
    }
}

/// Sort results into ranking order.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(SearchResult::rank_cmp);
}
