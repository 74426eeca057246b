use crate::codes;
use crate::models::{Chunk, ChunkMetadata, ContentType, SourceKind};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

const CHUNK_CHAR_CAP: usize = 3000;
const FULL_SECTION_CHAR_CAP: usize = 4000;
const HEADER_CHAR_CAP: usize = 500;
const MIN_RATING_SPAN_CHARS: usize = 20;
const MIN_SUBSECTION_CHARS: usize = 100;
const MIN_ARTICLE_SPAN_CHARS: usize = 50;
const ARTICLE_RESPLIT_THRESHOLD: usize = 3200;

static DC_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\d{4})\s").expect("dc boundary pattern"));
static SUBSECTION_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\([a-z]\)\s").expect("subsection boundary pattern"));
static SUBSECTION_LETTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([a-z])\)").expect("subsection letter pattern"));
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+.+").expect("heading pattern"));

/// Deterministic chunk id for idempotent upsert: the first 16 hex chars of
/// the sha256 of the colon-joined locator. Locators are positional, never
/// content-derived, so re-ingesting updated text keeps the same ids.
pub fn chunk_id(parts: &[&str]) -> String {
    let raw = parts.join(":");
    let digest = Sha256::digest(raw.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

fn ecfr_section_url(part: &str, section: &str) -> String {
    format!("https://www.ecfr.gov/current/title-38/part-{part}/section-{part}.{section}")
}

fn cap_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Chunk a Part 4 rating-criteria section at diagnostic-code boundaries.
///
/// A boundary is a line starting with a 4-digit code. With two or more
/// boundaries each code gets its own chunk; otherwise the whole section is
/// kept as a single chunk with a wider cap.
pub fn chunk_rating_criteria(section_markdown: &str, part: &str, section: &str) -> Vec<Chunk> {
    if section_markdown.trim().is_empty() {
        return Vec::new();
    }

    let boundaries: Vec<(usize, &str)> = DC_BOUNDARY_RE
        .captures_iter(section_markdown)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let code = captures.get(1)?;
            Some((whole.start(), code.as_str()))
        })
        .collect();

    let mut chunks = Vec::new();
    if boundaries.len() >= 2 {
        for (index, (start, code)) in boundaries.iter().enumerate() {
            let end = boundaries
                .get(index + 1)
                .map(|(next_start, _)| *next_start)
                .unwrap_or(section_markdown.len());
            let text = section_markdown[*start..end].trim();
            if char_len(text) < MIN_RATING_SPAN_CHARS {
                continue;
            }

            let mut metadata = ChunkMetadata::new(SourceKind::Cfr, ContentType::RatingCriteria);
            metadata.part = Some(part.to_string());
            metadata.section = Some(section.to_string());
            if let Some(entry) = codes::lookup(code) {
                metadata.dc = Some(code.to_string());
                metadata.condition = Some(entry.condition.to_string());
                metadata.schedule = Some(entry.schedule.to_string());
            }

            chunks.push(Chunk {
                id: chunk_id(&["cfr", part, section, code]),
                text: cap_chars(text, CHUNK_CHAR_CAP).to_string(),
                metadata,
                source_url: Some(ecfr_section_url(part, section)),
            });
        }
    } else {
        let mut metadata = ChunkMetadata::new(SourceKind::Cfr, ContentType::RatingCriteria);
        metadata.part = Some(part.to_string());
        metadata.section = Some(section.to_string());
        metadata.schedule = codes::schedule_for(part, section).map(str::to_string);

        chunks.push(Chunk {
            id: chunk_id(&["cfr", part, section, "full"]),
            text: cap_chars(section_markdown, FULL_SECTION_CHAR_CAP)
                .trim()
                .to_string(),
            metadata,
            source_url: Some(ecfr_section_url(part, section)),
        });
    }

    chunks
}

/// Chunk a Part 3 adjudication section at lettered subsection boundaries,
/// prepending the section header (capped at 500 chars) plus a citation line
/// to every chunk for context.
///
/// Non-final spans shorter than 100 chars are dropped rather than merged
/// forward.
pub fn chunk_adjudication(section_markdown: &str, part: &str, section: &str) -> Vec<Chunk> {
    if section_markdown.trim().is_empty() {
        return Vec::new();
    }

    let boundaries: Vec<usize> = SUBSECTION_BOUNDARY_RE
        .find_iter(section_markdown)
        .map(|matched| matched.start())
        .collect();

    let header = boundaries
        .first()
        .map(|first| cap_chars(section_markdown[..*first].trim(), HEADER_CHAR_CAP))
        .unwrap_or("");

    let metadata = {
        let mut metadata = ChunkMetadata::new(SourceKind::Cfr, ContentType::Adjudication);
        metadata.part = Some(part.to_string());
        metadata.section = Some(section.to_string());
        metadata
    };

    let mut chunks = Vec::new();
    if boundaries.len() >= 2 {
        for (index, start) in boundaries.iter().enumerate() {
            let end = boundaries
                .get(index + 1)
                .copied()
                .unwrap_or(section_markdown.len());
            let text = section_markdown[*start..end].trim();
            let is_final = index + 1 == boundaries.len();
            if char_len(text) < MIN_SUBSECTION_CHARS && !is_final {
                continue;
            }

            let full_text = if header.is_empty() {
                text.to_string()
            } else {
                format!("38 CFR {part}.{section}\n{header}\n\n{text}")
            };
            let sub_id = SUBSECTION_LETTER_RE
                .captures(text)
                .and_then(|captures| captures.get(1))
                .map(|letter| letter.as_str().to_string())
                .unwrap_or_else(|| index.to_string());

            chunks.push(Chunk {
                id: chunk_id(&["cfr", part, section, &sub_id]),
                text: cap_chars(&full_text, CHUNK_CHAR_CAP).to_string(),
                metadata: metadata.clone(),
                source_url: Some(ecfr_section_url(part, section)),
            });
        }
    } else {
        chunks.push(Chunk {
            id: chunk_id(&["cfr", part, section, "full"]),
            text: cap_chars(section_markdown, FULL_SECTION_CHAR_CAP)
                .trim()
                .to_string(),
            metadata,
            source_url: Some(ecfr_section_url(part, section)),
        });
    }

    chunks
}

/// Chunk a knowledge-base article at markdown `##`/`###` heading boundaries.
/// Every chunk carries a `# <title>` prefix so retrieval hits keep their
/// article context; heading spans that would exceed the re-split threshold
/// are broken further at blank-line paragraph boundaries.
pub fn chunk_article(article_markdown: &str, article_id: u64, article_name: &str) -> Vec<Chunk> {
    if article_markdown.trim().is_empty() {
        return Vec::new();
    }

    let id_string = article_id.to_string();
    let title_prefix = format!("# {article_name}\n\n");
    let metadata = {
        let mut metadata = ChunkMetadata::new(SourceKind::Knowva, ContentType::Guidance);
        metadata.article_id = Some(id_string.clone());
        metadata.article_name = Some(article_name.to_string());
        metadata
    };

    let headings: Vec<usize> = HEADING_RE
        .find_iter(article_markdown)
        .map(|matched| matched.start())
        .collect();

    let mut chunks = Vec::new();
    if headings.len() >= 2 {
        let intro = article_markdown[..headings[0]].trim();
        if char_len(intro) > MIN_ARTICLE_SPAN_CHARS {
            let text = format!("{title_prefix}{intro}");
            chunks.push(Chunk {
                id: chunk_id(&["knowva", &id_string, "intro"]),
                text: cap_chars(&text, CHUNK_CHAR_CAP).to_string(),
                metadata: metadata.clone(),
                source_url: None,
            });
        }

        for (index, start) in headings.iter().enumerate() {
            let end = headings
                .get(index + 1)
                .copied()
                .unwrap_or(article_markdown.len());
            let text = article_markdown[*start..end].trim();
            if char_len(text) < MIN_ARTICLE_SPAN_CHARS {
                continue;
            }

            let full_text = format!("{title_prefix}{text}");
            if char_len(&full_text) > ARTICLE_RESPLIT_THRESHOLD {
                let span_index = index.to_string();
                for (sub_index, piece) in
                    greedy_paragraph_chunks(&full_text, &title_prefix).iter().enumerate()
                {
                    chunks.push(Chunk {
                        id: chunk_id(&[
                            "knowva",
                            &id_string,
                            &span_index,
                            &sub_index.to_string(),
                        ]),
                        text: cap_chars(piece, CHUNK_CHAR_CAP).to_string(),
                        metadata: metadata.clone(),
                        source_url: None,
                    });
                }
            } else {
                chunks.push(Chunk {
                    id: chunk_id(&["knowva", &id_string, &index.to_string()]),
                    text: cap_chars(&full_text, CHUNK_CHAR_CAP).to_string(),
                    metadata: metadata.clone(),
                    source_url: None,
                });
            }
        }
    } else {
        let full_text = format!("{title_prefix}{article_markdown}");
        if char_len(&full_text) <= ARTICLE_RESPLIT_THRESHOLD {
            chunks.push(Chunk {
                id: chunk_id(&["knowva", &id_string, "full"]),
                text: cap_chars(&full_text, CHUNK_CHAR_CAP).to_string(),
                metadata,
                source_url: None,
            });
        } else {
            for (index, piece) in
                greedy_paragraph_chunks(&full_text, &title_prefix).iter().enumerate()
            {
                chunks.push(Chunk {
                    id: chunk_id(&["knowva", &id_string, &index.to_string()]),
                    text: cap_chars(piece, CHUNK_CHAR_CAP).to_string(),
                    metadata: metadata.clone(),
                    source_url: None,
                });
            }
        }
    }

    chunks
}

/// Greedy paragraph accumulator: append paragraphs until the next one would
/// push past the chunk cap, flush, and re-seed the next accumulator with the
/// title prefix so context survives the split.
fn greedy_paragraph_chunks(full_text: &str, title_prefix: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for paragraph in full_text.split("\n\n") {
        if char_len(&current) + char_len(paragraph) > CHUNK_CHAR_CAP && !current.is_empty() {
            pieces.push(current.trim().to_string());
            current = format!("{title_prefix}{paragraph}\n\n");
        } else {
            current.push_str(paragraph);
            current.push_str("\n\n");
        }
    }

    let tail = current.trim();
    if !tail.is_empty() && char_len(tail) > char_len(title_prefix) {
        pieces.push(tail.to_string());
    }

    pieces
}
