pub mod chunking;
pub mod codes;
pub mod decision;
pub mod error;
pub mod ingest;
pub mod models;
pub mod stores;
pub mod traits;

pub use chunking::{chunk_adjudication, chunk_article, chunk_id, chunk_rating_criteria};
pub use codes::{
    find_by_condition, lookup, schedule_for, sections_for_part, DiagnosticCode, DIAGNOSTIC_CODES,
};
pub use decision::parse_decision_text;
pub use error::{IngestError, SearchError};
pub use ingest::{
    IngestPipeline, IngestSelection, IngestionReport, SkippedSource, KNOWVA_SEARCH_TERMS,
    PART3_SECTIONS,
};
pub use models::{
    ArticleRef, ArticleText, Chunk, ChunkMetadata, ContentType, DecisionRecord, IndexStats,
    Outcome, QueryFilters, SearchCandidate, SearchQuery, SourceKind,
};
pub use stores::{BvaApiSource, ChromaStore};
pub use traits::{ChunkIndex, ContentSource};
