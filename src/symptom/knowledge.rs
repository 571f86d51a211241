//! Local knowledge base over CSV files
//!
//! Every CSV row becomes one document of `header: value` lines. Documents are
//! split into overlapping chunks, embedded once, and persisted as a JSON
//! index so restarts skip the embedding pass.

use crate::llm::{EmbeddingService, EmbeddingTask, LlmError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;
pub const TOP_K: usize = 4;

const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("index error: {0}")]
    Index(#[from] serde_json::Error),
    #[error("embedding error: {0}")]
    Embedding(#[from] LlmError),
}

impl KnowledgeError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        KnowledgeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// One CSV row rendered as text
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub source: String,
    pub row: usize,
    pub content: String,
}

/// A piece of a document, with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub row: usize,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    model: String,
    chunks: Vec<Chunk>,
}

/// All CSV rows under `data_dir`, files in name order
pub fn load_documents(data_dir: &Path) -> Result<Vec<Document>, KnowledgeError> {
    if !data_dir.is_dir() {
        tracing::warn!(path = %data_dir.display(), "Knowledge data directory not found");
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(data_dir)
        .map_err(|e| KnowledgeError::io(data_dir, e))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    let mut documents = Vec::new();
    for path in files {
        tracing::info!(path = %path.display(), "Loading knowledge CSV");
        documents.extend(read_csv(&path)?);
    }
    Ok(documents)
}

fn read_csv(path: &Path) -> Result<Vec<Document>, KnowledgeError> {
    let csv_err = |source| KnowledgeError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let source = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let content = headers
            .iter()
            .enumerate()
            .map(|(i, header)| format!("{}: {}", header.trim(), record.get(i).unwrap_or("").trim()))
            .collect::<Vec<_>>()
            .join("\n");
        documents.push(Document {
            source: source.clone(),
            row,
            content,
        });
    }
    Ok(documents)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into chunks of at most `size` characters, `overlap`
/// characters shared between neighbours where boundaries allow
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    split_recursive(text, SEPARATORS, size, overlap)
}

fn split_recursive(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let position = separators
        .iter()
        .position(|s| s.is_empty() || text.contains(s))
        .unwrap_or(separators.len().saturating_sub(1));
    let separator = separators.get(position).copied().unwrap_or("");
    let rest = separators.get(position + 1..).unwrap_or(&[]);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .filter_map(|(i, c)| text.get(i..i + c.len_utf8()))
            .collect()
    } else {
        text.split(separator).filter(|p| !p.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();
    for piece in pieces {
        if char_len(piece) <= size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge_pieces(&fitting, separator, size, overlap));
            fitting.clear();
        }
        if rest.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, rest, size, overlap));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge_pieces(&fitting, separator, size, overlap));
    }
    chunks
}

/// Greedily join pieces up to `size`, carrying a tail of at most `overlap`
/// characters into the next chunk
fn merge_pieces(pieces: &[&str], separator: &str, size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    let emit = |window: &VecDeque<&str>, chunks: &mut Vec<String>| {
        let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
    };

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if window.is_empty() { 0 } else { sep_len };
        if total + joiner + len > size && !window.is_empty() {
            emit(&window, &mut chunks);
            while let Some(front) = window.front() {
                let fits = total + sep_len + len <= size;
                if total <= overlap && fits {
                    break;
                }
                total -= char_len(front) + if window.len() > 1 { sep_len } else { 0 };
                window.pop_front();
            }
        }
        total += len + if window.is_empty() { 0 } else { sep_len };
        window.push_back(piece);
    }
    if !window.is_empty() {
        emit(&window, &mut chunks);
    }
    chunks
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Embedded chunks plus the service that embeds queries against them
pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    embedder: Arc<dyn EmbeddingService>,
}

impl KnowledgeBase {
    /// Chunk and embed `documents`
    pub async fn from_documents(
        documents: &[Document],
        embedder: Arc<dyn EmbeddingService>,
    ) -> Result<Self, KnowledgeError> {
        let mut pending: Vec<(String, usize, String)> = Vec::new();
        for doc in documents {
            for text in split_text(&doc.content, CHUNK_SIZE, CHUNK_OVERLAP) {
                pending.push((doc.source.clone(), doc.row, text));
            }
        }

        let texts: Vec<String> = pending.iter().map(|(_, _, t)| t.clone()).collect();
        let embeddings = embedder.embed(&texts, EmbeddingTask::Document).await?;

        let chunks = pending
            .into_iter()
            .zip(embeddings)
            .map(|((source, row, text), embedding)| Chunk {
                source,
                row,
                text,
                embedding,
            })
            .collect();
        Ok(Self { chunks, embedder })
    }

    /// Load a persisted index; fails if it was built with another model
    pub fn load(path: &Path, embedder: Arc<dyn EmbeddingService>) -> Result<Self, KnowledgeError> {
        let raw = std::fs::read_to_string(path).map_err(|e| KnowledgeError::io(path, e))?;
        let index: IndexFile = serde_json::from_str(&raw)?;
        if index.model != embedder.model_id() {
            return Err(KnowledgeError::Embedding(LlmError::unknown(format!(
                "index built with {}, configured model is {}",
                index.model,
                embedder.model_id()
            ))));
        }
        Ok(Self {
            chunks: index.chunks,
            embedder,
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), KnowledgeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| KnowledgeError::io(parent, e))?;
        }
        let index = IndexFile {
            model: self.embedder.model_id().to_string(),
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_string(&index)?;
        std::fs::write(path, json).map_err(|e| KnowledgeError::io(path, e))
    }

    /// Load the index at `index_path`, or rebuild it from `data_dir` and save
    ///
    /// Returns `None` when there is nothing to index.
    pub async fn open_or_build(
        data_dir: &Path,
        index_path: &Path,
        embedder: Arc<dyn EmbeddingService>,
    ) -> Result<Option<Self>, KnowledgeError> {
        if index_path.is_file() {
            match Self::load(index_path, embedder.clone()) {
                Ok(kb) if !kb.is_empty() => {
                    tracing::info!(path = %index_path.display(), chunks = kb.len(), "Loaded knowledge index");
                    return Ok(Some(kb));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(path = %index_path.display(), error = %e, "Knowledge index unusable, rebuilding");
                }
            }
        }

        let documents = load_documents(data_dir)?;
        if documents.is_empty() {
            tracing::warn!(path = %data_dir.display(), "No CSV documents found, knowledge base disabled");
            return Ok(None);
        }

        let kb = Self::from_documents(&documents, embedder).await?;
        kb.save(index_path)?;
        tracing::info!(
            documents = documents.len(),
            chunks = kb.len(),
            path = %index_path.display(),
            "Knowledge index built"
        );
        Ok(Some(kb))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit<'_>>, KnowledgeError> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let vectors = self
            .embedder
            .embed(&[query.to_string()], EmbeddingTask::Query)
            .await?;
        let Some(query_vec) = vectors.first() else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<SearchHit<'_>> = self
            .chunks
            .iter()
            .map(|chunk| SearchHit {
                chunk,
                score: cosine_similarity(query_vec, &chunk.embedding),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
