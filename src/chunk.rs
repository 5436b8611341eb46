//! Heading-aware markdown chunker.
//!
//! Splits document text into [`Chunk`]s that respect a configurable
//! `chunk_size` limit. A new segment starts before every markdown heading
//! and whenever the next line would push the segment past the limit, so
//! boundaries always fall on line breaks. Each segment after the first is
//! seeded with the trailing `overlap` characters of its predecessor so a
//! concept split across a boundary stays retrievable from both sides.
//!
//! Every chunk is tagged with the heading breadcrumb active where it ends
//! (e.g. `"API > Authentication > JWT"`), tracked with a depth-indexed
//! stack threaded across segments.

use crate::models::Chunk;

/// Chunker tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    /// Target chunk length in characters. A chunk may exceed this by at
    /// most one line, since boundaries respect line breaks.
    pub chunk_size: usize,
    /// Characters of trailing context carried into the next chunk.
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Split markdown into ordered, heading-tagged chunks.
///
/// Empty or whitespace-only input yields an empty Vec, not an error.
pub fn chunk_markdown(
    content: &str,
    filename: &str,
    repo_name: Option<&str>,
    opts: ChunkOptions,
) -> Vec<Chunk> {
    assemble_chunks(split_segments(content, opts), filename, repo_name)
}

/// Tag raw segments with filename, repository, and heading path.
///
/// This is a pure fold over the segment sequence: a heading stack is
/// threaded through each segment in order, so the transformation can be
/// tested without invoking the splitter. Whitespace-only segments are
/// dropped; surviving content is trimmed.
pub fn assemble_chunks<I>(segments: I, filename: &str, repo_name: Option<&str>) -> Vec<Chunk>
where
    I: IntoIterator<Item = String>,
{
    let mut stack = HeadingStack::new();
    let mut chunks = Vec::new();

    for segment in segments {
        stack.observe(&segment);
        let trimmed = segment.trim();
        if trimmed.is_empty() {
            continue;
        }
        chunks.push(Chunk {
            content: trimmed.to_string(),
            filename: filename.to_string(),
            heading: stack.path(),
            repo_name: repo_name.map(str::to_string),
        });
    }

    chunks
}

/// Heading breadcrumb state, ordered by depth (1 = `#` … 6 = `######`).
///
/// A heading at depth `d` drops every entry at depth >= `d` before being
/// pushed, so a new `##` after a `###` clears the `###` and anything
/// beneath it. Skipped levels are simply absent, not padded.
#[derive(Debug, Clone, Default)]
pub struct HeadingStack {
    entries: Vec<(usize, String)>,
}

impl HeadingStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a heading, truncating deeper (and equal-depth) entries first.
    pub fn push(&mut self, depth: usize, text: &str) {
        self.entries.retain(|(d, _)| *d < depth);
        self.entries.push((depth, text.to_string()));
    }

    /// Apply every heading line in a segment, in order.
    ///
    /// Headings re-observed from an overlap seed are harmless: they arrive
    /// in document order, so re-applying them reproduces the same state.
    pub fn observe(&mut self, segment: &str) {
        for line in segment.lines() {
            if let Some((depth, text)) = parse_heading(line) {
                self.push(depth, text);
            }
        }
    }

    /// The breadcrumb path, outermost to innermost, joined with `" > "`.
    pub fn path(&self) -> String {
        self.entries
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" > ")
    }
}

/// Parse an ATX heading at the start of a line: 1–6 `#` followed by
/// whitespace. Returns the depth and the trimmed heading text.
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    Some((hashes, rest.trim()))
}

/// Split raw text into segments of at most `chunk_size` characters (plus
/// at most one over-long line), breaking before headings and carrying an
/// overlap seed between consecutive segments.
fn split_segments(content: &str, opts: ChunkOptions) -> Vec<String> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut buf_chars = 0usize;
    // Lines added beyond the overlap seed; a segment always consumes at
    // least one line so over-long lines still make progress.
    let mut fresh_lines = 0usize;

    for line in content.split_inclusive('\n') {
        let line_chars = line.chars().count();
        let boundary =
            parse_heading(line).is_some() || buf_chars + line_chars > opts.chunk_size;

        if fresh_lines > 0 && boundary {
            let seed = overlap_tail(&buf, opts.overlap);
            segments.push(std::mem::replace(&mut buf, seed));
            buf_chars = buf.chars().count();
            fresh_lines = 0;
        }

        buf.push_str(line);
        buf_chars += line_chars;
        fresh_lines += 1;
    }

    if fresh_lines > 0 {
        segments.push(buf);
    }

    segments
}

/// The trailing `overlap` characters of a segment, snapped forward to the
/// next line start when the cut lands mid-line (falling back to the raw
/// character cut when the tail holds no later line start).
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let total = text.chars().count();
    if total <= overlap {
        return text.to_string();
    }

    let mut start = text
        .char_indices()
        .nth(total - overlap)
        .map(|(i, _)| i)
        .unwrap_or(0);

    if start > 0 && text.as_bytes()[start - 1] != b'\n' {
        if let Some(pos) = text[start..].find('\n') {
            let snapped = start + pos + 1;
            if snapped < text.len() {
                start = snapped;
            }
        }
    }

    text[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(chunk_size: usize, overlap: usize) -> ChunkOptions {
        ChunkOptions {
            chunk_size,
            overlap,
        }
    }

    #[test]
    fn test_empty_input_yields_no_chunks() {
        assert!(chunk_markdown("", "f.md", None, ChunkOptions::default()).is_empty());
        assert!(chunk_markdown("  \n\n  ", "f.md", None, ChunkOptions::default()).is_empty());
    }

    #[test]
    fn test_small_document_single_chunk() {
        let chunks = chunk_markdown("Just a note.", "f.md", Some("docs"), ChunkOptions::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Just a note.");
        assert_eq!(chunks[0].heading, "");
        assert_eq!(chunks[0].filename, "f.md");
        assert_eq!(chunks[0].repo_name.as_deref(), Some("docs"));
    }

    #[test]
    fn test_leading_text_has_empty_heading() {
        let chunks = chunk_markdown(
            "intro before any heading\n# First\nbody",
            "f.md",
            None,
            opts(1000, 0),
        );
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].heading, "");
        assert_eq!(chunks[1].heading, "First");
    }

    #[test]
    fn test_heading_path_sequence() {
        let doc = "# A\ntext1\n## B\ntext2\n### C\ntext3\n## D\ntext4";
        let chunks = chunk_markdown(doc, "f.md", None, opts(1000, 0));
        let headings: Vec<&str> = chunks.iter().map(|c| c.heading.as_str()).collect();
        assert_eq!(headings, vec!["A", "A > B", "A > B > C", "A > D"]);
        assert!(chunks[0].content.contains("text1"));
        assert!(chunks[3].content.contains("text4"));
    }

    #[test]
    fn test_shallower_heading_clears_deeper_levels() {
        // A new ## after ### C and #### E must clear both, not just C.
        let doc = "# A\n## B\n### C\n#### E\ndeep\n## D\ntext";
        let chunks = chunk_markdown(doc, "f.md", None, opts(1000, 0));
        let last = chunks.last().unwrap();
        assert_eq!(last.heading, "A > D");
    }

    #[test]
    fn test_skipped_heading_levels_leave_no_gaps() {
        let chunks = chunk_markdown("# A\n### C\ntext", "f.md", None, opts(1000, 0));
        assert_eq!(chunks.last().unwrap().heading, "A > C");
    }

    #[test]
    fn test_multiple_headings_in_one_segment_last_wins() {
        // Feed segments directly: the fold is independent of the splitter.
        let segments = vec!["## X\nsome text\n### Y\nmore text".to_string()];
        let chunks = assemble_chunks(segments, "f.md", None);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].heading, "X > Y");
    }

    #[test]
    fn test_heading_state_carries_across_segments() {
        let segments = vec![
            "# Guide\nfirst".to_string(),
            "plain continuation".to_string(),
        ];
        let chunks = assemble_chunks(segments, "f.md", None);
        assert_eq!(chunks[1].heading, "Guide");
    }

    #[test]
    fn test_hash_without_space_is_not_a_heading() {
        assert!(parse_heading("#hashtag").is_none());
        assert!(parse_heading("####### seven").is_none());
        assert_eq!(parse_heading("## ok"), Some((2, "ok")));
        assert_eq!(parse_heading("#\ttabbed"), Some((1, "tabbed")));
    }

    #[test]
    fn test_size_bound_respects_line_breaks() {
        let lines: Vec<String> = (0..60).map(|i| format!("line number {:02}", i)).collect();
        let doc = lines.join("\n");
        let longest = lines.iter().map(|l| l.chars().count() + 1).max().unwrap();
        let chunk_size = 50;

        let chunks = chunk_markdown(&doc, "f.md", None, opts(chunk_size, 0));
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(
                c.content.chars().count() <= chunk_size + longest,
                "chunk of {} chars exceeds bound",
                c.content.chars().count()
            );
        }
    }

    #[test]
    fn test_overlong_line_becomes_own_chunk() {
        let long = "x".repeat(500);
        let doc = format!("short\n{}\ntail", long);
        let chunks = chunk_markdown(&doc, "f.md", None, opts(50, 0));
        assert!(chunks.iter().any(|c| c.content == long));
    }

    #[test]
    fn test_coverage_without_overlap() {
        let doc = "# One\nalpha\nbeta\n\n## Two\ngamma\ndelta\nepsilon\n# Three\nzeta";
        let chunks = chunk_markdown(doc, "f.md", None, opts(24, 0));

        let original: Vec<&str> = doc.lines().filter(|l| !l.trim().is_empty()).collect();
        let reassembled: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.content.lines())
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        assert_eq!(original, reassembled);
    }

    #[test]
    fn test_overlap_carries_trailing_lines() {
        let doc = (0..10)
            .map(|i| format!("line-{:02}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let chunks = chunk_markdown(&doc, "f.md", None, opts(40, 10));
        assert!(chunks.len() > 1);
        // Each chunk after the first starts with a line repeated from its
        // predecessor's tail.
        for pair in chunks.windows(2) {
            let first_line = pair[1].content.lines().next().unwrap();
            assert!(
                pair[0].content.ends_with(first_line),
                "expected {:?} to end with {:?}",
                pair[0].content,
                first_line
            );
        }
    }

    #[test]
    fn test_overlap_does_not_corrupt_heading_paths() {
        // Sections shorter than the overlap window: seeds re-carry earlier
        // headings, which must not disturb the breadcrumb sequence.
        let doc = "# A\ntext1\n## B\ntext2\n### C\ntext3\n## D\ntext4";
        let chunks = chunk_markdown(doc, "f.md", None, opts(1000, 200));
        let headings: Vec<&str> = chunks.iter().map(|c| c.heading.as_str()).collect();
        assert_eq!(headings, vec!["A", "A > B", "A > B > C", "A > D"]);
    }

    #[test]
    fn test_overlap_tail_snaps_to_line_start() {
        let text = "aaaa\nbbbb\ncccc\n";
        // A 6-char tail cuts into "bbbb\n"; snapping moves it to "cccc\n".
        assert_eq!(overlap_tail(text, 6), "cccc\n");
        // Tail covering everything returns the text unchanged.
        assert_eq!(overlap_tail(text, 100), text);
        assert_eq!(overlap_tail(text, 0), "");
    }

    #[test]
    fn test_deterministic() {
        let doc = "# A\nalpha\n## B\nbeta\ngamma";
        let a = chunk_markdown(doc, "f.md", None, ChunkOptions::default());
        let b = chunk_markdown(doc, "f.md", None, ChunkOptions::default());
        assert_eq!(a, b);
    }
}
