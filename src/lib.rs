// Dealflow Dedup - Contact deduplication / record-linkage engine
// Pure library: receives a parsed candidate batch and a directory
// snapshot, returns a classified summary. Parsing, review UI, and
// persistence are external collaborators.

pub mod contact;
pub mod normalizer;
pub mod similarity;
pub mod classifier;
pub mod merge;
pub mod summary;
pub mod review;
pub mod import;

// Re-export commonly used types
pub use contact::{CandidateContact, EntityKind, ExistingRecord};
pub use normalizer::{normalize, NormalizedRecord};
pub use similarity::{
    score, BlockingIndex, BlockingStrategy, SignalScores, StandardBlocking,
};
pub use classifier::{Classifier, MatchCategory, MatchResult};
pub use merge::{plan, FieldChange, MergeAction, MergePlan};
pub use summary::{DeduplicationEngine, DeduplicationSummary};
pub use review::{build_apply_ops, ApplyOp, ReviewAction, ReviewDecision, ReviewState};
pub use import::{load_candidates_csv, parse_candidates_csv};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
