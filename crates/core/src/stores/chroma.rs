use crate::error::SearchError;
use crate::models::{Chunk, IndexStats, QueryFilters, SearchCandidate, SearchQuery};
use crate::traits::ChunkIndex;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use url::Url;

const UPSERT_BATCH: usize = 100;

pub struct ChromaStore {
    endpoint: String,
    collection: String,
    client: Client,
}

impl ChromaStore {
    pub fn new(endpoint: &str, collection: impl Into<String>) -> Result<Self, SearchError> {
        let parsed = Url::parse(endpoint)?;
        Ok(Self {
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
        })
    }

    /// Resolves the collection id, creating the collection on first use.
    async fn collection_id(&self) -> Result<String, SearchError> {
        let response = self
            .client
            .post(format!("{}/api/v1/collections", self.endpoint))
            .json(&json!({
                "name": self.collection,
                "get_or_create": true,
                "metadata": { "hnsw:space": "cosine" },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: "collection response missing id".to_string(),
            })
    }

    async fn count(&self, collection_id: &str) -> Result<usize, SearchError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v1/collections/{}/count",
                self.endpoint, collection_id
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(parsed.as_u64().unwrap_or(0) as usize)
    }
}

/// Translates the optional query filters into a Chroma `where` document.
/// A single constraint is passed bare; several are joined under `$and`.
pub fn where_filter(filters: &QueryFilters) -> Option<Value> {
    if filters.is_empty() {
        return None;
    }

    let mut clauses = Vec::new();
    if let Some(source) = filters.source {
        clauses.push(json!({ "source": source.as_str() }));
    }
    if let Some(content_type) = filters.content_type {
        clauses.push(json!({ "content_type": content_type.as_str() }));
    }
    if let Some(part) = &filters.part {
        clauses.push(json!({ "part": part }));
    }
    if let Some(schedule) = &filters.schedule {
        clauses.push(json!({ "schedule": schedule }));
    }

    match clauses.len() {
        0 => None,
        1 => clauses.pop(),
        _ => Some(json!({ "$and": clauses })),
    }
}

fn chunk_metadata_value(chunk: &Chunk) -> Result<Value, SearchError> {
    let mut value = serde_json::to_value(&chunk.metadata)?;
    if let (Some(map), Some(url)) = (value.as_object_mut(), &chunk.source_url) {
        map.insert("source_url".to_string(), Value::String(url.clone()));
    }
    Ok(value)
}

/// Flattens a Chroma query response (column-major parallel arrays) into
/// scored candidates. Cosine distance becomes `score = 1 - distance`.
pub fn candidates_from_response(parsed: &Value) -> Vec<SearchCandidate> {
    let ids = parsed
        .pointer("/ids/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let documents = parsed
        .pointer("/documents/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let metadatas = parsed
        .pointer("/metadatas/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let distances = parsed
        .pointer("/distances/0")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut candidates = Vec::new();
    for (position, id) in ids.iter().enumerate() {
        let id = id.as_str().unwrap_or_default().to_string();
        let text = documents
            .get(position)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut metadata = BTreeMap::new();
        if let Some(fields) = metadatas.get(position).and_then(Value::as_object) {
            for (key, field) in fields {
                let rendered = match field {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                metadata.insert(key.clone(), rendered);
            }
        }

        let distance = distances.get(position).and_then(Value::as_f64);
        let score = distance.map(|d| 1.0 - d).unwrap_or(0.0);

        candidates.push(SearchCandidate {
            id,
            text,
            metadata,
            distance,
            score,
        });
    }

    candidates
}

#[async_trait]
impl ChunkIndex for ChromaStore {
    async fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<usize, SearchError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let collection_id = self.collection_id().await?;

        for batch in chunks.chunks(UPSERT_BATCH) {
            let ids: Vec<&str> = batch.iter().map(|chunk| chunk.id.as_str()).collect();
            let documents: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let metadatas = batch
                .iter()
                .map(chunk_metadata_value)
                .collect::<Result<Vec<_>, SearchError>>()?;

            let response = self
                .client
                .post(format!(
                    "{}/api/v1/collections/{}/upsert",
                    self.endpoint, collection_id
                ))
                .json(&json!({
                    "ids": ids,
                    "documents": documents,
                    "metadatas": metadatas,
                }))
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(SearchError::BackendResponse {
                    backend: "chroma".to_string(),
                    details: response.status().to_string(),
                });
            }
        }

        Ok(chunks.len())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchCandidate>, SearchError> {
        let collection_id = self.collection_id().await?;

        let mut body = json!({
            "query_texts": [query.text],
            "n_results": query.top_k,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(filter) = where_filter(&query.filters) {
            body["where"] = filter;
        }

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/query",
                self.endpoint, collection_id
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        Ok(candidates_from_response(&parsed))
    }

    async fn clear(&self) -> Result<usize, SearchError> {
        let collection_id = self.collection_id().await?;
        let removed = self.count(&collection_id).await?;

        let response = self
            .client
            .delete(format!(
                "{}/api/v1/collections/{}",
                self.endpoint, self.collection
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(removed)
    }

    async fn stats(&self) -> Result<IndexStats, SearchError> {
        let collection_id = self.collection_id().await?;

        let response = self
            .client
            .post(format!(
                "{}/api/v1/collections/{}/get",
                self.endpoint, collection_id
            ))
            .json(&json!({ "include": ["metadatas"] }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let metadatas = parsed
            .pointer("/metadatas")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut stats = IndexStats {
            total_chunks: metadatas.len(),
            ..IndexStats::default()
        };
        for fields in &metadatas {
            if let Some(source) = fields.pointer("/source").and_then(Value::as_str) {
                *stats.by_source.entry(source.to_string()).or_insert(0) += 1;
            }
            if let Some(kind) = fields.pointer("/content_type").and_then(Value::as_str) {
                *stats.by_content_type.entry(kind.to_string()).or_insert(0) += 1;
            }
        }

        Ok(stats)
    }
}
