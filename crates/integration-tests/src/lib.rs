//! End-to-end integration tests for the sealed-bid clearing auction.
//!
//! These tests exercise the full auction lifecycle against the mock chain
//! runtime:
//! 1. Sealed bid submission and asynchronous reveal
//! 2. Escrow confirmation with surplus refund
//! 3. Batched, resumable resolution at a single clearing price
//! 4. Allocation finalization and the three claim paths

#[cfg(test)]
mod lifecycle;
