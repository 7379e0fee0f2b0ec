use std::cmp::Reverse;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::data::{InId, Posting};

/// Postings of one term, ascending by internal id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingList(Vec<Posting>);

impl PostingList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub fn push(&mut self, posting: Posting) {
        self.0.push(posting);
    }

    /// Append all of `other` after the existing postings.
    pub fn concat(&mut self, other: &PostingList) {
        self.0.extend_from_slice(&other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.0.capacity()
    }

    /// Grow the allocation so at least `capacity` postings fit.
    pub fn reserve_to(&mut self, capacity: usize) {
        if capacity > self.0.len() {
            self.0.reserve(capacity - self.0.len());
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Posting> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Posting] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Posting> {
        self.0
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Merge `other` into `self`, keeping at most `max_len` postings.
    ///
    /// # Panics
    ///
    /// Panics if both lists hold the same internal id: lists of one term built
    /// independently must never share a document.
    pub fn merge(&mut self, other: &PostingList, max_len: usize) {
        let left = std::mem::take(&mut self.0);
        let right = &other.0;
        let mut out = Vec::with_capacity((left.len() + right.len()).min(max_len));

        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() && out.len() < max_len {
            let (a, b) = (left[i], right[j]);
            if a.in_id < b.in_id {
                out.push(a);
                i += 1;
            } else if a.in_id > b.in_id {
                out.push(b);
                j += 1;
            } else {
                panic!(
                    "posting lists of one term both contain in id {}",
                    a.in_id
                );
            }
        }

        let room = max_len - out.len();
        if i < left.len() {
            let end = left.len().min(i + room);
            out.extend_from_slice(&left[i..end]);
        }
        let room = max_len - out.len();
        if j < right.len() {
            let end = right.len().min(j + room);
            out.extend_from_slice(&right[j..end]);
        }

        self.0 = out;
    }

    /// Insert the ascending postings of `other`, keeping `self` ascending. A
    /// posting whose id is already present replaces the old one.
    pub fn upsert(&mut self, other: &PostingList) {
        let tail = self.0.last().map(|p| p.in_id);
        match (tail, other.0.first()) {
            (Some(tail), Some(head)) if head.in_id <= tail => {}
            _ => return self.concat(other),
        }

        let left = std::mem::take(&mut self.0);
        let right = &other.0;
        let mut out = Vec::with_capacity(left.len() + right.len());
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            let (a, b) = (left[i], right[j]);
            if a.in_id < b.in_id {
                out.push(a);
                i += 1;
            } else {
                if a.in_id == b.in_id {
                    i += 1;
                }
                out.push(b);
                j += 1;
            }
        }
        out.extend_from_slice(&left[i..]);
        out.extend_from_slice(&right[j..]);
        self.0 = out;
    }

    /// Replace `self` with the k-way merge of `self` and `others`, keeping at
    /// most `max_len` postings.
    pub fn kmerge(&mut self, others: &[&PostingList], max_len: usize) {
        let first = std::mem::take(&mut self.0);

        let mut lists: Vec<&[Posting]> = Vec::with_capacity(others.len() + 1);
        lists.push(&first);
        lists.extend(others.iter().map(|l| l.as_slice()));

        let total: usize = lists.iter().map(|l| l.len()).sum();
        let mut out = Vec::with_capacity(total.min(max_len));

        let mut heap: BinaryHeap<Reverse<Cursor>> = BinaryHeap::with_capacity(lists.len());
        for (list, postings) in lists.iter().enumerate() {
            if let Some(p) = postings.first() {
                heap.push(Reverse(Cursor {
                    in_id: p.in_id,
                    list,
                    pos: 0,
                }));
            }
        }

        while out.len() < max_len {
            let Some(Reverse(cursor)) = heap.pop() else {
                break;
            };
            let postings = lists[cursor.list];
            out.push(postings[cursor.pos]);

            let next = cursor.pos + 1;
            if let Some(p) = postings.get(next) {
                heap.push(Reverse(Cursor {
                    in_id: p.in_id,
                    list: cursor.list,
                    pos: next,
                }));
            }
        }

        self.0 = out;
    }
}

/// Position inside one of the lists of a k-way merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Cursor {
    in_id: InId,
    list: usize,
    pos: usize,
}

/// Two-way merge of `a` and `b` into a new list.
pub fn merged(a: &PostingList, b: &PostingList, max_len: usize) -> PostingList {
    let mut out = a.clone();
    out.merge(b, max_len);
    out
}

/// K-way merge of `lists` into a new list.
pub fn kmerged(lists: &[&PostingList], max_len: usize) -> PostingList {
    let mut out = PostingList::new();
    out.kmerge(lists, max_len);
    out
}

impl From<Vec<Posting>> for PostingList {
    fn from(postings: Vec<Posting>) -> Self {
        Self(postings)
    }
}

impl FromIterator<Posting> for PostingList {
    fn from_iter<I: IntoIterator<Item = Posting>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PostingList {
    type Item = &'a Posting;
    type IntoIter = std::slice::Iter<'a, Posting>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
