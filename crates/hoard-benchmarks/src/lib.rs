//! hoard benchmarking suite
//!
//! Criterion benchmarks for content hashing, the counting bloom filter and
//! end-to-end uploads through the file service.

pub mod common;

pub use common::*;
