//! Deterministic splitting of note text into ordered, overlapping,
//! size-bounded chunks.
//!
//! Split preference order follows the contract: paragraph boundary, then
//! sentence boundary, then whitespace, then a hard cut at the target size.
//! Identical `(body, config)` always produces identical chunks.

use brain_core::Chunk;

/// Chunker configuration. Both fields are exposed so callers can tune them
/// to keep search-ranking behavior stable for a given embedding model's
/// context window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkConfig {
    /// Target chunk size in bytes (of the UTF-8 body).
    pub target_size: usize,
    /// Overlap fraction carried forward between adjacent chunks, in `[0, 1)`.
    pub overlap_fraction: f32,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            target_size: 2000,
            overlap_fraction: 0.15,
        }
    }
}

/// Splits `body` into an ordered sequence of chunks per `config`.
///
/// Empty body yields an empty sequence. A body no longer than
/// `config.target_size` yields exactly one chunk with `total_chunks == 1`.
pub fn chunk_text(body: &str, config: ChunkConfig) -> Vec<Chunk> {
    if body.is_empty() {
        return Vec::new();
    }
    if body.len() <= config.target_size {
        return vec![Chunk {
            chunk_index: 0,
            total_chunks: 1,
            start: 0,
            end: body.len(),
            text: body.to_string(),
        }];
    }

    let overlap = ((config.target_size as f32) * config.overlap_fraction) as usize;

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    while start < body.len() {
        let ideal_end = (start + config.target_size).min(body.len());
        let end = if ideal_end >= body.len() {
            body.len()
        } else {
            find_boundary(body, start, ideal_end)
        };
        let end = char_safe_end(body, end).max(start + 1);
        spans.push((start, end));
        if end >= body.len() {
            break;
        }
        let next_start = end.saturating_sub(overlap);
        start = char_safe_start(body, next_start.max(start + 1));
    }

    let total_chunks = spans.len();
    spans
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (start, end))| Chunk {
            chunk_index,
            total_chunks,
            start,
            end,
            text: body[start..end].to_string(),
        })
        .collect()
}

/// Finds the best split point at or before `ideal_end`: paragraph boundary,
/// then sentence boundary, then whitespace, then a hard cut.
fn find_boundary(body: &str, start: usize, ideal_end: usize) -> usize {
    let window = &body[start..ideal_end];

    if let Some(pos) = window.rfind("\n\n") {
        if pos > 0 {
            return start + pos + 2;
        }
    }

    if let Some(pos) = rfind_sentence_end(window) {
        if pos > 0 {
            return start + pos;
        }
    }

    if let Some(pos) = window.rfind(char::is_whitespace) {
        if pos > 0 {
            return start + pos + 1;
        }
    }

    ideal_end
}

fn rfind_sentence_end(window: &str) -> Option<usize> {
    window
        .rmatch_indices(['.', '!', '?'])
        .map(|(idx, m)| idx + m.len())
        .next()
}

fn char_safe_end(body: &str, mut pos: usize) -> usize {
    while pos < body.len() && !body.is_char_boundary(pos) {
        pos += 1;
    }
    pos.min(body.len())
}

fn char_safe_start(body: &str, mut pos: usize) -> usize {
    while pos < body.len() && !body.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_yields_no_chunks() {
        assert_eq!(chunk_text("", ChunkConfig::default()), vec![]);
    }

    #[test]
    fn body_at_exact_target_size_yields_one_chunk() {
        let config = ChunkConfig { target_size: 10, overlap_fraction: 0.15 };
        let body = "0123456789";
        let chunks = chunk_text(body, config);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert_eq!(chunks[0].text, body);
    }

    #[test]
    fn chunking_is_deterministic() {
        let body = "Lorem ipsum dolor sit amet. ".repeat(50);
        let a = chunk_text(&body, ChunkConfig::default());
        let b = chunk_text(&body, ChunkConfig::default());
        assert_eq!(a, b);
    }

    #[test]
    fn chunk_indices_have_no_gaps() {
        let body = "word ".repeat(2000);
        let chunks = chunk_text(&body, ChunkConfig::default());
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.total_chunks, chunks.len());
        }
    }

    #[test]
    fn chunks_cover_body_with_overlap() {
        let config = ChunkConfig { target_size: 50, overlap_fraction: 0.2 };
        let body = "a".repeat(500);
        let chunks = chunk_text(&body, config);
        assert!(chunks.len() > 1);
        assert_eq!(chunks.first().unwrap().start, 0);
        assert_eq!(chunks.last().unwrap().end, body.len());
        for pair in chunks.windows(2) {
            assert!(pair[1].start < pair[0].end, "adjacent chunks must overlap");
        }
    }

    #[test]
    fn prefers_paragraph_boundary() {
        let config = ChunkConfig { target_size: 20, overlap_fraction: 0.0 };
        let body = "first paragraph here\n\nsecond paragraph text";
        let chunks = chunk_text(body, config);
        assert!(chunks[0].text.ends_with("\n\n") || chunks[0].end <= body.find("\n\n").unwrap() + 2);
    }
}
