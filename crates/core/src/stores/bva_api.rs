use crate::error::IngestError;
use crate::models::{ArticleRef, ArticleText};
use crate::traits::ContentSource;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use url::Url;

/// HTTP client for the BVA scraper API: CFR sections as markdown, KnowVA
/// article listings and bodies, and raw decision text.
pub struct BvaApiSource {
    endpoint: String,
    client: Client,
}

impl BvaApiSource {
    pub fn new(endpoint: &str) -> Result<Self, IngestError> {
        let parsed = Url::parse(endpoint)?;
        Ok(Self {
            endpoint: parsed.as_str().trim_end_matches('/').to_string(),
            client: Client::new(),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, IngestError> {
        let response = self
            .client
            .get(format!("{}/{path}", self.endpoint))
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::SourceStatus {
                path: path.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<String, IngestError> {
        let parsed = self.get_json("health", &[]).await?;
        Ok(parsed
            .pointer("/status")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }
}

/// Reads a listing of `{id, name}` objects, tolerating numeric or string ids
/// and skipping entries without one.
fn article_refs(listing: &Value) -> Vec<ArticleRef> {
    let items = listing.as_array().cloned().unwrap_or_default();
    let mut refs = Vec::new();
    for item in items {
        let id = match item.pointer("/id") {
            Some(Value::Number(number)) => number.as_u64(),
            Some(Value::String(text)) => text.parse().ok(),
            _ => None,
        };
        let Some(id) = id else { continue };
        let name = item
            .pointer("/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        refs.push(ArticleRef { id, name });
    }
    refs
}

#[async_trait]
impl ContentSource for BvaApiSource {
    async fn cfr_section(&self, part: &str, section: &str) -> Result<String, IngestError> {
        let parsed = self
            .get_json(
                "cfr/section",
                &[("part", part.to_string()), ("section", section.to_string())],
            )
            .await?;

        parsed
            .pointer("/content_markdown")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                IngestError::SourcePayload(format!(
                    "cfr/section {part}.{section} missing content_markdown"
                ))
            })
    }

    async fn article(&self, article_id: u64) -> Result<ArticleText, IngestError> {
        let parsed = self
            .get_json(&format!("knowva/article/{article_id}"), &[])
            .await?;

        let content = parsed
            .pointer("/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                IngestError::SourcePayload(format!("article {article_id} missing content"))
            })?;
        let name = parsed
            .pointer("/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(ArticleText {
            id: article_id,
            name,
            content,
        })
    }

    async fn search_articles(
        &self,
        term: &str,
        page_size: usize,
    ) -> Result<Vec<ArticleRef>, IngestError> {
        let parsed = self
            .get_json(
                "knowva/search",
                &[("q", term.to_string()), ("pagesize", page_size.to_string())],
            )
            .await?;

        Ok(article_refs(parsed.pointer("/results").unwrap_or(&Value::Null)))
    }

    async fn popular_articles(&self, page_size: usize) -> Result<Vec<ArticleRef>, IngestError> {
        // The popular endpoint returns a bare list, unlike search.
        let parsed = self
            .get_json("knowva/popular", &[("pagesize", page_size.to_string())])
            .await?;

        Ok(article_refs(&parsed))
    }

    async fn decision_text(&self, url: &str) -> Result<String, IngestError> {
        let response = self
            .client
            .get(format!("{}/case/text", self.endpoint))
            .query(&[("url", url)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::SourceStatus {
                path: "case/text".to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
