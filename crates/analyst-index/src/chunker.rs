//! Markdown chunking for the document index
//!
//! Policy and definition documents are small markdown files. Files with
//! `##` sections yield one chunk per section; files without them yield one
//! chunk per list item. Each chunk embeds its provenance (source file and
//! heading path) directly in the text so the retriever and the synthesis
//! prompt see the same thing.

use once_cell::sync::Lazy;
use regex::Regex;

/// A chunk ready for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier: `{file}::chunk{n}`, n counted per file
    pub id: String,
    /// Chunk text with Source/Context/Content header lines
    pub text: String,
    /// Source file name
    pub source: String,
}

static SECTION_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## ").expect("valid regex"));

/// Split one markdown file into chunks.
#[must_use]
pub fn chunk_file(filename: &str, content: &str) -> Vec<Chunk> {
    let parts: Vec<&str> = SECTION_SPLIT.split(content).collect();

    if parts.len() > 1 {
        chunk_by_sections(filename, &parts)
    } else {
        chunk_by_list_items(filename, content)
    }
}

/// One chunk per `##` section; the part before the first section supplies
/// the document title.
fn chunk_by_sections(filename: &str, parts: &[&str]) -> Vec<Chunk> {
    let main_title = title_line(parts[0]);
    let mut chunks = Vec::new();

    for section in &parts[1..] {
        if section.trim().is_empty() {
            continue;
        }
        let mut lines = section.lines();
        let section_title = lines.next().unwrap_or("").trim().to_string();
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        if body.is_empty() {
            continue;
        }

        let text = format!(
            "Source: {filename}\nContext: {main_title} > {section_title}\nContent:\n{body}"
        );
        chunks.push(Chunk {
            id: format!("{filename}::chunk{}", chunks.len()),
            text,
            source: filename.to_string(),
        });
    }

    chunks
}

/// Fallback for flat files: each `-` list item becomes a chunk.
fn chunk_by_list_items(filename: &str, content: &str) -> Vec<Chunk> {
    let mut lines = content.lines();
    let main_title = title_line(lines.next().unwrap_or(""));
    let mut chunks = Vec::new();

    for line in lines {
        let item = line.trim();
        if !item.starts_with('-') {
            continue;
        }
        let text = format!("Source: {filename}\nContext: {main_title}\nContent:\n{item}");
        chunks.push(Chunk {
            id: format!("{filename}::chunk{}", chunks.len()),
            text,
            source: filename.to_string(),
        });
    }

    chunks
}

/// Extract a title from a preamble or first line, dropping the `#` marker.
fn title_line(raw: &str) -> String {
    let trimmed = raw.trim();
    let first = trimmed.lines().next().unwrap_or("");
    first
        .strip_prefix("# ")
        .unwrap_or(first)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY_DOC: &str = "\
# Product Policy

## Returns
- Perishables: 3-7 days.
- Beverages unopened: 14 days.

## Shipping
Orders ship within 2 business days.
";

    const CALENDAR_DOC: &str = "\
# Marketing Calendar
- Summer Beverages: 1997-06-01 to 1997-06-30
- Winter Classics: 1997-12-01 to 1997-12-31
";

    #[test]
    fn test_sectioned_file_chunks_per_section() {
        let chunks = chunk_file("product_policy.md", POLICY_DOC);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "product_policy.md::chunk0");
        assert_eq!(chunks[1].id, "product_policy.md::chunk1");
        assert!(chunks[0].text.contains("Source: product_policy.md"));
        assert!(chunks[0].text.contains("Context: Product Policy > Returns"));
        assert!(chunks[0].text.contains("Beverages unopened: 14 days."));
        assert!(chunks[1].text.contains("Product Policy > Shipping"));
    }

    #[test]
    fn test_flat_file_chunks_per_list_item() {
        let chunks = chunk_file("marketing_calendar.md", CALENDAR_DOC);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("Context: Marketing Calendar"));
        assert!(
            chunks[0]
                .text
                .contains("- Summer Beverages: 1997-06-01 to 1997-06-30")
        );
        assert_eq!(chunks[1].id, "marketing_calendar.md::chunk1");
    }

    #[test]
    fn test_empty_sections_are_skipped() {
        let chunks = chunk_file("sparse.md", "# Doc\n\n## Empty\n\n## Full\nbody\n");
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.contains("Doc > Full"));
        // Ids stay dense even when sections are skipped
        assert_eq!(chunks[0].id, "sparse.md::chunk0");
    }

    #[test]
    fn test_file_with_no_chunkable_content() {
        let chunks = chunk_file("plain.md", "# Title\njust prose, no list items\n");
        assert!(chunks.is_empty());
    }
}
