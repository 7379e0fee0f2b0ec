//! Posting lists, the currency passed between every index layer.
//!
//! A [`PostingList`] is ascending by internal id with no duplicates. Lists
//! built independently for the same term are combined with
//! [`PostingList::merge`] (two lists) or [`PostingList::kmerge`] (any number),
//! and serialized with [`codec`].

pub mod codec;
pub mod list;

pub use codec::{decode, encode};
pub use list::{PostingList, kmerged, merged};
