use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Cfr,
    Knowva,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Cfr => "cfr",
            SourceKind::Knowva => "knowva",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    RatingCriteria,
    Adjudication,
    Guidance,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::RatingCriteria => "rating_criteria",
            ContentType::Adjudication => "adjudication",
            ContentType::Guidance => "guidance",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Filterable metadata attached to every chunk. Absent fields are omitted
/// from the serialized payload so index-side filters stay exact-match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    pub source: SourceKind,
    pub content_type: ContentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_name: Option<String>,
}

impl ChunkMetadata {
    pub fn new(source: SourceKind, content_type: ContentType) -> Self {
        Self {
            source,
            content_type,
            part: None,
            section: None,
            dc: None,
            condition: None,
            schedule: None,
            article_id: None,
            article_name: None,
        }
    }
}

/// A retrieval-sized span of text. The id hashes the semantic locator, not
/// the content, so re-ingesting the same locator overwrites rather than
/// duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Outcome {
    Granted,
    Denied,
    Remanded,
    Mixed,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Granted => "Granted",
            Outcome::Denied => "Denied",
            Outcome::Remanded => "Remanded",
            Outcome::Mixed => "Mixed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Structured fields extracted from one decision document. Every field is
/// independently optional; unmatched patterns leave fields absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionRecord {
    pub decision_date: Option<NaiveDate>,
    pub docket_no: Option<String>,
    pub outcome: Option<Outcome>,
    pub issues: Vec<String>,
    pub citations: Vec<String>,
    pub regional_office: Option<String>,
    pub judge: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct QueryFilters {
    pub source: Option<SourceKind>,
    pub content_type: Option<ContentType>,
    pub part: Option<String>,
    pub schedule: Option<String>,
}

impl QueryFilters {
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.content_type.is_none()
            && self.part.is_none()
            && self.schedule.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    pub text: String,
    pub top_k: usize,
    pub filters: QueryFilters,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchCandidate {
    pub id: String,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
    pub distance: Option<f64>,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexStats {
    pub total_chunks: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_content_type: BTreeMap<String, usize>,
}

/// Article listing entry returned by knowledge-base search and popular
/// listings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleRef {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleText {
    pub id: u64,
    pub name: String,
    pub content: String,
}
