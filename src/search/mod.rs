//! Reciprocal Rank Fusion primitives.
//!
//! The fusion math lives here in its own module, same as in the teacher
//! crate; the retrieval pipeline that calls into it (scope-filtered hybrid
//! search over a single agent's chunks) lives in [`crate::retrieval`].

mod rrf;

pub use rrf::{RrfConfig, reciprocal_rank_fusion, weighted_rrf};
