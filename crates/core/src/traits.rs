use crate::error::{IngestError, SearchError};
use crate::models::{ArticleRef, ArticleText, Chunk, IndexStats, SearchCandidate, SearchQuery};
use async_trait::async_trait;

/// Upstream content source: returns decoded, already-cleaned prose. HTML
/// conversion, retries, and rate limiting are this collaborator's problem,
/// not the pipeline's.
#[async_trait]
pub trait ContentSource {
    /// Rendered text of one CFR section, e.g. part "3" section "102".
    async fn cfr_section(&self, part: &str, section: &str) -> Result<String, IngestError>;

    /// Full text and title of one knowledge-base article.
    async fn article(&self, article_id: u64) -> Result<ArticleText, IngestError>;

    /// Knowledge-base search listing for one term.
    async fn search_articles(
        &self,
        term: &str,
        page_size: usize,
    ) -> Result<Vec<ArticleRef>, IngestError>;

    /// Most-viewed knowledge-base articles.
    async fn popular_articles(&self, page_size: usize) -> Result<Vec<ArticleRef>, IngestError>;

    /// Raw text of one decision document.
    async fn decision_text(&self, url: &str) -> Result<String, IngestError>;
}

/// Downstream retrieval index. Upserts are keyed by chunk id, so re-running
/// ingestion for unchanged locators overwrites in place.
#[async_trait]
pub trait ChunkIndex {
    /// Upsert chunks by id; returns the number written.
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize, SearchError>;

    /// Ranked similarity search with optional exact-match metadata filters.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchCandidate>, SearchError>;

    /// Delete everything; returns the previous count.
    async fn clear(&self) -> Result<usize, SearchError>;

    async fn stats(&self) -> Result<IndexStats, SearchError>;
}
