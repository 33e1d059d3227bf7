//! Alignment Scorer: given two agent descriptors, produces per-strategy
//! and weighted-overall alignment verdicts across knowledge, goals,
//! terminology, assumptions, and context.

pub mod assumptions;
pub mod context;
pub mod domain;
pub mod goals;
pub mod scorer;
pub mod similarity;
pub mod terminology;
pub mod text;
pub mod types;

pub use scorer::{AlignmentScorer, DEFAULT_WEIGHTS};
pub use types::{AlignmentResult, AlignmentStatus, AlignmentSummary, FullAlignmentCheck};
