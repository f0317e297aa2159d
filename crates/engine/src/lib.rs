// folio-engine: deduplication decisions, conflict-aware merging and the
// versioned document store.

pub mod config;
pub mod error;
pub mod facade;
pub mod gate;
pub mod index;
pub mod merge;
pub mod message;
pub mod similarity;
pub mod store;

pub use config::{DedupConfig, EngineConfig, MergeConfig};
pub use error::{
    ConfigurationError, FolioError, IndexError, MergeError, RevisionStoreError, ValidationError,
};
pub use facade::{DocumentStore, WriteOutcome};
pub use gate::{Action, DeduplicationDecision, DeduplicationGate, Thresholds};
pub use index::{DocumentIndex, MemoryIndex, MetaIndex};
pub use merge::{
    Conflict, ConflictKind, ConflictUnresolved, DocumentMerger, MergeReport, MergeStrategy,
    Resolution, ResolutionPolicy, Severity,
};
pub use message::CommitMessage;
pub use similarity::{SimilarityMatch, SimilarityScorer, TextSimilarity, WordOverlap};
pub use store::{RevisionStore, RevisionSummary, WorkingState};
