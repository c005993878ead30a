//! Document chunking
//!
//! Splits book pages into overlapping fixed-size character windows before
//! embedding. Windows are measured in `char`s so multi-byte text (Urdu, CJK)
//! is never split inside a code point.

use crate::vector::DocumentChunk;

/// Split `content` into windows of `chunk_size` characters, each starting
/// `overlap` characters before the previous window ended.
///
/// Whitespace-only windows are skipped. The number of windows is bounded by
/// one per hundred characters of input, which also guarantees termination
/// for pathological size/overlap pairs. The bound is relaxed to at least one
/// window, so pages shorter than a hundred characters still produce a chunk
/// instead of none.
pub fn chunk(content: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    if chunk_size == 0 || content.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = content.chars().collect();
    let len = chars.len();
    let max_windows = (len / 100).max(1);

    let mut chunks = Vec::new();
    let mut windows = 0;
    let mut start = 0;

    while start < len && windows < max_windows {
        let end = (start + chunk_size).min(len);
        windows += 1;

        let window: String = chars[start..end].iter().collect();
        if !window.trim().is_empty() {
            chunks.push(window);
        }

        if end == len {
            break;
        }

        let next = end.saturating_sub(overlap);
        start = if next <= start { start + chunk_size } else { next };
    }

    chunks
}

/// Chunk a document and attach its provenance to every window
pub fn chunk_document(
    content: &str,
    doc_id: &str,
    section: &str,
    title: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<DocumentChunk> {
    chunk(content, chunk_size, overlap)
        .into_iter()
        .map(|text| DocumentChunk {
            text,
            source_doc_id: doc_id.to_string(),
            section: section.to_string(),
            title: title.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_windows() {
        let content = "A".repeat(2500);
        let chunks = chunk(&content, 1000, 100);

        let lengths: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
        assert_eq!(lengths, vec![1000, 1000, 700]);
    }

    #[test]
    fn test_short_document_is_single_chunk() {
        let chunks = chunk("Short page.", 1000, 100);
        assert_eq!(chunks, vec!["Short page.".to_string()]);
    }

    #[test]
    fn test_empty_and_zero_size() {
        assert!(chunk("", 1000, 100).is_empty());
        assert!(chunk("content", 0, 0).is_empty());
    }

    #[test]
    fn test_whitespace_windows_are_skipped() {
        let content = format!("{}{}", "x".repeat(150), " ".repeat(150));
        let chunks = chunk(&content, 150, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "x".repeat(150));

        assert!(chunk(&" ".repeat(500), 100, 10).is_empty());
    }

    #[test]
    fn test_overlap_not_smaller_than_size_still_advances() {
        let content = "b".repeat(1000);
        let chunks = chunk(&content, 100, 100);
        assert_eq!(chunks.len(), 10);
        assert!(chunks.iter().all(|c| c.len() == 100));
    }

    #[test]
    fn test_window_count_is_bounded() {
        let content = "c".repeat(300);
        // 300 chars allow at most 3 windows even with a tiny size
        assert_eq!(chunk(&content, 10, 0).len(), 3);
    }

    #[test]
    fn test_chunks_rebuild_a_prefix_in_order() {
        let alphabet: Vec<char> = ('a'..='z').chain('0'..='9').collect();
        let content: String = alphabet.iter().cycle().take(2737).collect();
        let len = content.chars().count();

        for (size, overlap) in [(1000, 100), (300, 0), (250, 249), (137, 13), (100, 99)] {
            let chunks = chunk(&content, size, overlap);
            assert!(!chunks.is_empty());
            assert!(chunks.len() <= len / 100, "size={} overlap={}", size, overlap);

            for pair in chunks.windows(2) {
                let tail: String = pair[0].chars().skip(pair[0].chars().count() - overlap).collect();
                let head: String = pair[1].chars().take(overlap).collect();
                assert_eq!(tail, head, "size={} overlap={}", size, overlap);
            }

            let mut rebuilt = chunks[0].clone();
            for next in &chunks[1..] {
                rebuilt.extend(next.chars().skip(overlap));
            }
            assert!(
                content.starts_with(&rebuilt),
                "size={} overlap={} rebuilt {} chars",
                size,
                overlap,
                rebuilt.len()
            );
        }

        let full = chunk(&content, 1000, 100);
        let rebuilt: String = full[0]
            .chars()
            .chain(full[1..].iter().flat_map(|c| c.chars().skip(100)))
            .collect();
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn test_multibyte_text_splits_on_chars() {
        let content = "روبوٹ".repeat(40);
        let chunks = chunk(&content, 150, 50);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 150);
        assert_eq!(chunks[1].chars().count(), 100);
    }

    #[test]
    fn test_chunk_document_carries_provenance() {
        let chunks = chunk_document("Kinematics text", "humanoid_kinematics", "humanoid", "Kinematics", 1000, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_doc_id, "humanoid_kinematics");
        assert_eq!(chunks[0].section, "humanoid");
        assert_eq!(chunks[0].title, "Kinematics");
    }
}
