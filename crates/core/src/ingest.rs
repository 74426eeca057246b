use crate::chunking::{chunk_adjudication, chunk_article, chunk_rating_criteria};
use crate::codes;
use crate::decision::parse_decision_text;
use crate::error::{IngestError, SearchError};
use crate::models::{ArticleRef, Chunk, DecisionRecord};
use crate::traits::{ChunkIndex, ContentSource};
use std::collections::HashSet;
use tracing::{info, warn};

/// Part 3 adjudication sections worth indexing.
pub const PART3_SECTIONS: &[&str] = &[
    "102", "103", "156", "159", "303", "304", "307", "309", "310", "312", "317", "321", "340",
    "341", "400",
];

/// Search terms used to seed knowledge-base article discovery.
pub const KNOWVA_SEARCH_TERMS: &[&str] = &[
    "PTSD",
    "TDIU",
    "service connection",
    "rating",
    "effective date",
    "disability compensation",
    "presumptive",
    "secondary condition",
    "individual unemployability",
    "mental health rating",
    "hearing loss",
    "sleep apnea",
    "back pain",
    "knee",
    "appeal",
    "supplemental claim",
    "higher level review",
];

const ARTICLE_SEARCH_PAGE_SIZE: usize = 10;
const POPULAR_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestSelection {
    Cfr,
    Knowva,
    All,
}

impl IngestSelection {
    fn includes_cfr(self) -> bool {
        matches!(self, IngestSelection::Cfr | IngestSelection::All)
    }

    fn includes_knowva(self) -> bool {
        matches!(self, IngestSelection::Knowva | IngestSelection::All)
    }
}

impl std::str::FromStr for IngestSelection {
    type Err = IngestError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "cfr" => Ok(IngestSelection::Cfr),
            "knowva" => Ok(IngestSelection::Knowva),
            "all" => Ok(IngestSelection::All),
            other => Err(IngestError::InvalidArgument(format!(
                "unknown source '{other}', expected cfr, knowva, or all"
            ))),
        }
    }
}

/// A section or article that could not be fetched; ingestion continues
/// without it.
#[derive(Debug)]
pub struct SkippedSource {
    pub label: String,
    pub reason: String,
}

#[derive(Debug)]
pub struct IngestionReport {
    pub chunk_count: usize,
    pub indexed: usize,
    pub skipped: Vec<SkippedSource>,
}

/// Drives fetch-then-chunk cycles against the content source and hands the
/// aggregated chunk list to the index in one upsert. All chunking is pure;
/// the pipeline owns only the sequencing.
pub struct IngestPipeline<S, I> {
    source: S,
    index: I,
}

impl<S, I> IngestPipeline<S, I>
where
    S: ContentSource + Send + Sync,
    I: ChunkIndex + Send + Sync,
{
    pub fn new(source: S, index: I) -> Self {
        Self { source, index }
    }

    /// Fetch and chunk every Part 4 section the diagnostic-code table cites.
    pub async fn ingest_rating_criteria(&self) -> (Vec<Chunk>, Vec<SkippedSource>) {
        let mut chunks = Vec::new();
        let mut skipped = Vec::new();

        for section in codes::sections_for_part("4") {
            match self.source.cfr_section("4", section).await {
                Ok(markdown) => {
                    let section_chunks = chunk_rating_criteria(&markdown, "4", section);
                    info!(
                        section = %format!("4.{section}"),
                        count = section_chunks.len(),
                        "chunked rating criteria section"
                    );
                    chunks.extend(section_chunks);
                }
                Err(error) => {
                    warn!(section = %format!("4.{section}"), error = %error, "skipping section");
                    skipped.push(SkippedSource {
                        label: format!("38 CFR 4.{section}"),
                        reason: error.to_string(),
                    });
                }
            }
        }

        (chunks, skipped)
    }

    /// Fetch and chunk the fixed Part 3 adjudication section list.
    pub async fn ingest_adjudication(&self) -> (Vec<Chunk>, Vec<SkippedSource>) {
        let mut chunks = Vec::new();
        let mut skipped = Vec::new();

        for section in PART3_SECTIONS {
            match self.source.cfr_section("3", section).await {
                Ok(markdown) => {
                    let section_chunks = chunk_adjudication(&markdown, "3", section);
                    info!(
                        section = %format!("3.{section}"),
                        count = section_chunks.len(),
                        "chunked adjudication section"
                    );
                    chunks.extend(section_chunks);
                }
                Err(error) => {
                    warn!(section = %format!("3.{section}"), error = %error, "skipping section");
                    skipped.push(SkippedSource {
                        label: format!("38 CFR 3.{section}"),
                        reason: error.to_string(),
                    });
                }
            }
        }

        (chunks, skipped)
    }

    /// Discover knowledge-base articles (popular listing plus seeded search
    /// terms, id-deduped) and chunk each one.
    pub async fn ingest_articles(&self) -> (Vec<Chunk>, Vec<SkippedSource>) {
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();
        let mut targets: Vec<ArticleRef> = Vec::new();

        match self.source.popular_articles(POPULAR_PAGE_SIZE).await {
            Ok(listing) => {
                for article in listing {
                    if seen.insert(article.id) {
                        targets.push(article);
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "failed to list popular articles");
                skipped.push(SkippedSource {
                    label: "knowva popular listing".to_string(),
                    reason: error.to_string(),
                });
            }
        }

        for term in KNOWVA_SEARCH_TERMS {
            match self.source.search_articles(term, ARTICLE_SEARCH_PAGE_SIZE).await {
                Ok(listing) => {
                    for article in listing {
                        if seen.insert(article.id) {
                            targets.push(article);
                        }
                    }
                }
                Err(error) => {
                    warn!(term, error = %error, "article search failed");
                    skipped.push(SkippedSource {
                        label: format!("knowva search '{term}'"),
                        reason: error.to_string(),
                    });
                }
            }
        }

        info!(count = targets.len(), "unique articles to index");

        let mut chunks = Vec::new();
        for target in targets {
            match self.source.article(target.id).await {
                Ok(article) => {
                    if article.content.trim().is_empty() {
                        warn!(article_id = target.id, "empty article content");
                        continue;
                    }
                    let name = if article.name.is_empty() {
                        target.name.as_str()
                    } else {
                        article.name.as_str()
                    };
                    let article_chunks = chunk_article(&article.content, target.id, name);
                    info!(article_id = target.id, count = article_chunks.len(), "chunked article");
                    chunks.extend(article_chunks);
                }
                Err(error) => {
                    warn!(article_id = target.id, error = %error, "skipping article");
                    skipped.push(SkippedSource {
                        label: format!("knowva article {}", target.id),
                        reason: error.to_string(),
                    });
                }
            }
        }

        (chunks, skipped)
    }

    /// Full ingestion run: fetch, chunk, aggregate, and upsert once.
    pub async fn run(&self, selection: IngestSelection) -> Result<IngestionReport, SearchError> {
        let mut chunks = Vec::new();
        let mut skipped = Vec::new();

        if selection.includes_cfr() {
            info!("ingesting Part 4 rating criteria");
            let (batch, misses) = self.ingest_rating_criteria().await;
            chunks.extend(batch);
            skipped.extend(misses);

            info!("ingesting Part 3 adjudication sections");
            let (batch, misses) = self.ingest_adjudication().await;
            chunks.extend(batch);
            skipped.extend(misses);
        }

        if selection.includes_knowva() {
            info!("ingesting knowledge-base articles");
            let (batch, misses) = self.ingest_articles().await;
            chunks.extend(batch);
            skipped.extend(misses);
        }

        let indexed = if chunks.is_empty() {
            warn!("no chunks to index");
            0
        } else {
            self.index.upsert_chunks(&chunks).await?
        };

        info!(chunk_count = chunks.len(), indexed, skipped = skipped.len(), "ingestion run done");

        Ok(IngestionReport {
            chunk_count: chunks.len(),
            indexed,
            skipped,
        })
    }

    /// Fetch one decision document and extract its structured record.
    pub async fn parse_decision(&self, url: &str) -> Result<DecisionRecord, IngestError> {
        let text = self.source.decision_text(url).await?;
        Ok(parse_decision_text(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArticleText, IndexStats, SearchCandidate, SearchQuery, SourceKind};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeSource {
        fail_sections: Vec<(&'static str, &'static str)>,
    }

    impl FakeSource {
        fn reliable() -> Self {
            Self {
                fail_sections: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl ContentSource for FakeSource {
        async fn cfr_section(&self, part: &str, section: &str) -> Result<String, IngestError> {
            if self
                .fail_sections
                .iter()
                .any(|(p, s)| *p == part && *s == section)
            {
                return Err(IngestError::SourceStatus {
                    path: format!("cfr/section {part}.{section}"),
                    status: 503,
                });
            }
            if part == "4" {
                Ok(
                    "9411 Rating criteria for PTSD with detail sufficient to index.\n\
                     9434 Rating criteria for depression with detail sufficient to index."
                        .to_string(),
                )
            } else {
                Ok(format!(
                    "Section {part}.{section} header text.\n\
                     (a) First subsection with more than enough words to clear the minimum \
                     standalone length for adjudication chunks in this pipeline.\n\
                     (b) Second subsection with more than enough words to clear the minimum \
                     standalone length for adjudication chunks in this pipeline."
                ))
            }
        }

        async fn article(&self, article_id: u64) -> Result<ArticleText, IngestError> {
            Ok(ArticleText {
                id: article_id,
                name: format!("Article {article_id}"),
                content: "intro too short\n\
                          ## Guidance\n\
                          Body paragraph long enough to survive the article span filter easily.\n\
                          ## More\n\
                          Second body paragraph long enough to survive the span filter as well."
                    .to_string(),
            })
        }

        async fn search_articles(
            &self,
            _term: &str,
            _page_size: usize,
        ) -> Result<Vec<ArticleRef>, IngestError> {
            Ok(Vec::new())
        }

        async fn popular_articles(&self, _page_size: usize) -> Result<Vec<ArticleRef>, IngestError> {
            Ok(vec![
                ArticleRef {
                    id: 101,
                    name: "Article 101".to_string(),
                },
                ArticleRef {
                    id: 101,
                    name: "Duplicate listing".to_string(),
                },
            ])
        }

        async fn decision_text(&self, _url: &str) -> Result<String, IngestError> {
            Ok("Docket No. 12-34567 ... Decision Date: January 5, 2021 ... REMANDED".to_string())
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        upserts: Mutex<Vec<Chunk>>,
    }

    #[async_trait]
    impl ChunkIndex for RecordingIndex {
        async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize, SearchError> {
            let mut guard = self.upserts.lock().expect("lock");
            guard.extend(chunks.iter().cloned());
            Ok(chunks.len())
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchCandidate>, SearchError> {
            Ok(Vec::new())
        }

        async fn clear(&self) -> Result<usize, SearchError> {
            Ok(0)
        }

        async fn stats(&self) -> Result<IndexStats, SearchError> {
            Ok(IndexStats::default())
        }
    }

    #[test]
    fn selection_parses_known_names_only() {
        assert_eq!("cfr".parse::<IngestSelection>().expect("cfr"), IngestSelection::Cfr);
        assert_eq!(
            "knowva".parse::<IngestSelection>().expect("knowva"),
            IngestSelection::Knowva
        );
        assert_eq!("all".parse::<IngestSelection>().expect("all"), IngestSelection::All);

        let error = "pdfs".parse::<IngestSelection>().expect_err("rejected");
        assert!(matches!(error, IngestError::InvalidArgument(_)));
        assert!(error.to_string().contains("pdfs"));
    }

    #[tokio::test]
    async fn run_chunks_every_source_and_upserts_once() {
        let pipeline = IngestPipeline::new(FakeSource::reliable(), RecordingIndex::default());
        let report = pipeline.run(IngestSelection::All).await.expect("run");

        assert!(report.chunk_count > 0);
        assert_eq!(report.indexed, report.chunk_count);
        assert!(report.skipped.is_empty());

        let recorded = pipeline.index.upserts.lock().expect("lock");
        assert_eq!(recorded.len(), report.chunk_count);
        let ids: HashSet<&str> = recorded.iter().map(|chunk| chunk.id.as_str()).collect();
        assert_eq!(ids.len(), recorded.len());
        assert!(recorded.iter().any(|c| c.metadata.source == SourceKind::Cfr));
        assert!(recorded.iter().any(|c| c.metadata.source == SourceKind::Knowva));
    }

    #[tokio::test]
    async fn reruns_reproduce_the_same_id_set() {
        let pipeline = IngestPipeline::new(FakeSource::reliable(), RecordingIndex::default());
        pipeline.run(IngestSelection::All).await.expect("first run");
        let first: HashSet<String> = {
            let mut guard = pipeline.index.upserts.lock().expect("lock");
            guard.drain(..).map(|chunk| chunk.id).collect()
        };

        pipeline.run(IngestSelection::All).await.expect("second run");
        let second: HashSet<String> = pipeline
            .index
            .upserts
            .lock()
            .expect("lock")
            .iter()
            .map(|chunk| chunk.id.clone())
            .collect();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn fetch_failures_are_skipped_not_fatal() {
        let source = FakeSource {
            fail_sections: vec![("3", "102"), ("4", "130")],
        };
        let pipeline = IngestPipeline::new(source, RecordingIndex::default());
        let report = pipeline.run(IngestSelection::Cfr).await.expect("run");

        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .any(|skip| skip.label == "38 CFR 3.102"));
        assert!(report.chunk_count > 0);
    }

    #[tokio::test]
    async fn cfr_selection_excludes_articles() {
        let pipeline = IngestPipeline::new(FakeSource::reliable(), RecordingIndex::default());
        pipeline.run(IngestSelection::Cfr).await.expect("run");

        let recorded = pipeline.index.upserts.lock().expect("lock");
        assert!(recorded
            .iter()
            .all(|chunk| chunk.metadata.source == SourceKind::Cfr));
    }

    #[tokio::test]
    async fn chunk_order_follows_document_order_within_a_section() {
        let pipeline = IngestPipeline::new(FakeSource::reliable(), RecordingIndex::default());
        let (chunks, _) = pipeline.ingest_rating_criteria().await;

        let section_130: Vec<&Chunk> = chunks
            .iter()
            .filter(|chunk| chunk.metadata.section.as_deref() == Some("130"))
            .collect();
        assert_eq!(section_130.len(), 2);
        assert!(section_130[0].text.starts_with("9411"));
        assert!(section_130[1].text.starts_with("9434"));
    }

    #[tokio::test]
    async fn parse_decision_fetches_then_extracts() {
        let pipeline = IngestPipeline::new(FakeSource::reliable(), RecordingIndex::default());
        let record = pipeline.parse_decision("https://example.test/decision.txt").await.expect("parse");
        assert_eq!(record.docket_no.as_deref(), Some("12-34567"));
        assert_eq!(
            record.outcome,
            Some(crate::models::Outcome::Remanded)
        );
    }
}
