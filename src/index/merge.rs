//! Two-way merge of whole indexes.

use std::iter::Peekable;

use crate::data::TermSign;
use crate::error::Result;
use crate::index::{ReadOnlyIndex, TermIter, WriteOnlyIndex};
use crate::posting::PostingList;

/// Write the union of `a` and `b` into `dst` in ascending term order.
///
/// Terms present in both have their postings merged; the two sources must not
/// share a document for the same term. The first read or write error stops the
/// merge and is returned; `dst` is then left partially written. Returns the
/// number of terms written.
pub fn index_merge(
    a: &dyn ReadOnlyIndex,
    b: &dyn ReadOnlyIndex,
    dst: &mut dyn WriteOnlyIndex,
) -> Result<u64> {
    let mut terms_a = a.terms()?.peekable();
    let mut terms_b = b.terms()?.peekable();
    let mut written = 0;

    loop {
        let (term, list) = match (terms_a.peek().copied(), terms_b.peek().copied()) {
            (None, None) => break,
            (Some(ta), Some(tb)) if ta == tb => {
                terms_a.next();
                terms_b.next();
                match (a.read_index(ta), b.read_index(tb)) {
                    (Ok(mut la), Ok(lb)) => {
                        la.merge(&lb, usize::MAX);
                        (ta, Ok(la))
                    }
                    (Err(e), _) | (_, Err(e)) => (ta, Err(e)),
                }
            }
            (Some(ta), Some(tb)) if ta < tb => take(&mut terms_a, a, ta),
            (Some(ta), None) => take(&mut terms_a, a, ta),
            (_, Some(tb)) => take(&mut terms_b, b, tb),
        };

        dst.write_index(term, &list?)?;
        written += 1;
    }

    Ok(written)
}

fn take(
    terms: &mut Peekable<TermIter<'_>>,
    index: &dyn ReadOnlyIndex,
    term: TermSign,
) -> (TermSign, Result<PostingList>) {
    terms.next();
    (term, index.read_index(term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Posting;
    use crate::error::PlumeError;
    use crate::index::{DiskIndex, EmptyIndex, MemoryIndex};
    use tempfile::tempdir;

    fn list(ids: &[u32]) -> PostingList {
        ids.iter().map(|&id| Posting::new(id, 1)).collect()
    }

    #[test]
    fn test_merge_memory_into_disk() {
        let dir = tempdir().unwrap();

        let a = MemoryIndex::new();
        a.write_index(1, &list(&[1, 5]));
        a.write_index(4, &list(&[2]));
        a.write_index(9, &list(&[7]));

        let b = MemoryIndex::new();
        b.write_index(4, &list(&[3, 6]));
        b.write_index(2, &list(&[8]));
        b.write_index(10, &list(&[1]));

        let mut dst = DiskIndex::create(dir.path(), "merged", 1024, 8).unwrap();
        assert_eq!(index_merge(&a, &b, &mut dst).unwrap(), 5);
        dst.close().unwrap();

        let merged = DiskIndex::open(dir.path(), "merged").unwrap();
        assert_eq!(merged.terms().collect::<Vec<_>>(), vec![1, 2, 4, 9, 10]);
        assert_eq!(merged.read_index(4).unwrap(), list(&[2, 3, 6]));
        assert_eq!(merged.read_index(10).unwrap(), list(&[1]));
    }

    #[test]
    fn test_merge_with_empty_side() {
        let a = MemoryIndex::new();
        a.write_index(3, &list(&[1]));
        a.write_index(-3, &list(&[2]));

        let mut dst = MemoryIndex::new();
        assert_eq!(index_merge(&EmptyIndex, &a, &mut dst).unwrap(), 2);
        assert_eq!(dst.sorted_terms(), vec![-3, 3]);
    }

    #[test]
    fn test_rejected_term_fails_the_merge() {
        let dir = tempdir().unwrap();
        let a = MemoryIndex::new();
        for t in 0..5 {
            a.write_index(t, &list(&[1]));
        }
        // Room for three terms only.
        let mut dst = DiskIndex::create(dir.path(), "small", 1024, 3).unwrap();
        assert!(matches!(
            index_merge(&a, &EmptyIndex, &mut dst),
            Err(PlumeError::OutOfBounds(_))
        ));
        assert_eq!(dst.term_count(), 3);
    }
}
