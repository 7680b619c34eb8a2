//! Text chunking for canonical catalog records.
//!
//! Splits each record into bounded, ordered chunks before embedding. Chunk
//! lengths are counted in characters, never bytes, so multi-byte titles are
//! never cut mid-character.

use crate::config::IndexSettings;
use crate::error::{AnirecError, Result};
use crate::ingest::CanonicalRecord;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A chunk of a canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of the source record in the ingested catalog.
    pub record_index: usize,
    /// Order of this chunk within its record.
    pub order: usize,
    /// Text content of this chunk.
    pub content: String,
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub max_size: usize,
    /// Characters repeated at the start of each following chunk.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            overlap: 0,
        }
    }
}

impl ChunkingConfig {
    /// Create a validated configuration.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(AnirecError::Config("chunk size must be positive".to_string()));
        }
        if overlap >= max_size {
            return Err(AnirecError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, max_size
            )));
        }
        Ok(Self { max_size, overlap })
    }

    /// Build from index settings.
    pub fn from_settings(settings: &IndexSettings) -> Result<Self> {
        Self::new(settings.chunk_size, settings.chunk_overlap)
    }
}

/// Split text into chunks of at most `config.max_size` characters.
///
/// A boundary goes right after the last whitespace in the window, so words
/// stay whole where possible; a window with no whitespace is cut hard. With
/// zero overlap the chunks concatenate back to `text` exactly.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut chunks = Vec::new();
    if text.is_empty() || config.max_size == 0 {
        return chunks;
    }

    // Byte offset of every char, plus the end of the string.
    let offsets: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    let mut start = 0;
    while start < total {
        let window_end = (start + config.max_size).min(total);

        let end = if window_end == total {
            total
        } else {
            chars[start + 1..window_end]
                .iter()
                .rposition(|c| c.is_whitespace())
                .map(|p| start + 1 + p + 1)
                .unwrap_or(window_end)
        };

        chunks.push(text[offsets[start]..offsets[end]].to_string());

        if end == total {
            break;
        }
        start = if config.overlap > 0 {
            end.saturating_sub(config.overlap).max(start + 1)
        } else {
            end
        };
    }

    chunks
}

/// Chunk every record, keeping catalog order.
pub fn chunk_records(records: &[CanonicalRecord], config: &ChunkingConfig) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = records
        .iter()
        .flat_map(|record| {
            chunk_text(&record.text, config)
                .into_iter()
                .enumerate()
                .map(move |(order, content)| Chunk {
                    record_index: record.index,
                    order,
                    content,
                })
        })
        .collect();

    debug!(
        "Chunked {} records into {} chunks (max {} chars, overlap {})",
        records.len(),
        chunks.len(),
        config.max_size,
        config.overlap
    );

    chunks
}
