//! Shared utility modules used across plume components.

pub mod sign;
pub mod varint;
