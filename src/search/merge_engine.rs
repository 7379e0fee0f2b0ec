use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::debug;

use crate::data::{InId, MAX_QUERY_TERMS, TermInDoc, TermInQuery, TermSign};
use crate::database::DatabaseReader;
use crate::error::{PlumeError, Result};
use crate::posting::PostingList;

/// One document produced by [`MergeEngine::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeHit {
    pub in_id: InId,
    /// Every mandatory query term occurs in the document.
    pub valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cursor {
    in_id: InId,
    term: usize,
    pos: usize,
}

/// Multi-way merge of the posting lists of a query's terms.
///
/// Documents come out in ascending internal id order, each exactly once, with
/// the weight of every term that hits it.
#[derive(Debug)]
pub struct MergeEngine {
    signs: Vec<TermSign>,
    lists: Vec<PostingList>,
    heap: BinaryHeap<Reverse<Cursor>>,
    /// Bit `i` set when term `i` is mandatory.
    mandatory: u32,
    finished: bool,
}

impl MergeEngine {
    /// Read the posting list of every term of `terms`. A term whose lookup
    /// fails is treated as hitting nothing.
    pub fn new(db: &dyn DatabaseReader, terms: &[TermInQuery]) -> Result<Self> {
        if terms.len() >= MAX_QUERY_TERMS {
            return Err(PlumeError::TooManyTerms {
                count: terms.len(),
                limit: MAX_QUERY_TERMS,
            });
        }

        let mut mandatory = 0u32;
        let mut finished = false;
        let mut lists = Vec::with_capacity(terms.len());
        let mut heap = BinaryHeap::with_capacity(terms.len());

        for (term, query_term) in terms.iter().enumerate() {
            let list = db.read_index(query_term.sign).unwrap_or_else(|e| {
                debug!("term {} reads as empty: {}", query_term.sign, e);
                PostingList::new()
            });
            if !query_term.can_omit {
                mandatory |= 1 << term;
                // No document can carry every mandatory term.
                finished |= list.is_empty();
            }
            if let Some(first) = list.iter().next() {
                heap.push(Reverse(Cursor {
                    in_id: first.in_id,
                    term,
                    pos: 0,
                }));
            }
            lists.push(list);
        }

        Ok(Self {
            signs: terms.iter().map(|t| t.sign).collect(),
            lists,
            heap,
            mandatory,
            finished,
        })
    }

    pub fn term_count(&self) -> usize {
        self.signs.len()
    }

    /// Produce the next document.
    ///
    /// `out` must have one slot per query term; it is reset and then filled
    /// with the sign and weight of each term that hits the document (slots of
    /// missing terms stay zero). Returns `None` once no further document can
    /// match.
    pub fn next(&mut self, out: &mut [TermInDoc]) -> Result<Option<MergeHit>> {
        if out.len() != self.signs.len() {
            return Err(PlumeError::invalid_argument(format!(
                "output has {} slots for {} query terms",
                out.len(),
                self.signs.len()
            )));
        }
        if self.finished {
            return Ok(None);
        }
        let Some(Reverse(first)) = self.heap.pop() else {
            self.finished = true;
            return Ok(None);
        };

        out.fill(TermInDoc::default());
        let in_id = first.in_id;
        let mut seen = 0u32;
        let mut cursor = Some(first);

        while let Some(c) = cursor {
            let posting = self.lists[c.term].as_slice()[c.pos];
            out[c.term] = TermInDoc::new(self.signs[c.term], posting.weight);
            let bit = self.mandatory & (1 << c.term);
            seen ^= bit;

            match self.lists[c.term].as_slice().get(c.pos + 1) {
                Some(next) => self.heap.push(Reverse(Cursor {
                    in_id: next.in_id,
                    term: c.term,
                    pos: c.pos + 1,
                })),
                // An exhausted mandatory list ends the merge after this document.
                None if bit != 0 => self.finished = true,
                None => {}
            }

            cursor = match self.heap.peek() {
                Some(Reverse(top)) if top.in_id == in_id => self.heap.pop().map(|Reverse(c)| c),
                _ => None,
            };
        }

        Ok(Some(MergeHit {
            in_id,
            valid: seen == self.mandatory,
        }))
    }
}
