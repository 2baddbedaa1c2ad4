//! Character-window chunking with overlap for long documents.

/// Maximum characters per chunk sent to the model.
pub const CHUNK_SIZE: usize = 15_000;
/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 1_000;

/// Split `text` into overlapping chunks of at most `max_chunk_size` characters.
///
/// A chunk is cut at the last `.` or `\n` in its window when that break falls
/// inside the window's final `overlap` characters; otherwise it is cut hard.
/// Chunks are trimmed and empty ones dropped. Sizes count `char`s, not bytes.
pub fn chunk_text(text: &str, max_chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let max_chunk_size = max_chunk_size.max(1);
    let overlap = overlap.min(max_chunk_size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = (start + max_chunk_size).min(len);

        if end < len
            && let Some(break_point) = chars[start..end]
                .iter()
                .rposition(|&c| c == '.' || c == '\n')
                .map(|i| start + i)
            && break_point > start + max_chunk_size - overlap
        {
            end = break_point + 1;
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        start = if end < len {
            (end - overlap).max(start + 1)
        } else {
            len
        };
    }

    chunks
}
