//! Document index boundary for analyst
//!
//! Given a free-text query, return a ranked list of scored text passages
//! with stable identifiers. The shipped implementation chunks a directory
//! of markdown files and serves them from an in-RAM tantivy (BM25) index;
//! the `DocumentIndex` trait keeps the engine independent of that choice.

mod chunker;

pub use chunker::{Chunk, chunk_file};

use camino::Utf8Path;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, STORED, STRING, Schema, TEXT, Value};
use tantivy::{Index, IndexReader, TantivyDocument, doc};
use tracing::{debug, info};

pub use analyst_utils::error::IndexError;
use analyst_utils::types::Passage;

/// Document Index boundary: `search(query, top_k)` returns passages ordered
/// by descending relevance. An empty result is valid and distinct from an
/// error.
pub trait DocumentIndex: Send + Sync {
    /// Search the corpus.
    ///
    /// # Errors
    ///
    /// Returns `IndexError` only for adapter failures; a query matching
    /// nothing yields `Ok(vec![])`.
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, IndexError>;
}

/// In-RAM BM25 index over a directory of markdown documents.
pub struct MarkdownIndex {
    index: Index,
    reader: IndexReader,
    id_field: Field,
    source_field: Field,
    text_field: Field,
    chunk_count: usize,
}

impl MarkdownIndex {
    /// Build the index from every `.md` file in `docs_dir`.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DocsDirNotFound` if the directory is missing,
    /// `IndexError::Io` for unreadable files, or `IndexError::Build` for
    /// tantivy failures.
    pub fn open(docs_dir: &Utf8Path) -> Result<Self, IndexError> {
        if !docs_dir.is_dir() {
            return Err(IndexError::DocsDirNotFound {
                path: docs_dir.to_string(),
            });
        }

        let mut schema_builder = Schema::builder();
        let id_field = schema_builder.add_text_field("id", STRING | STORED);
        let source_field = schema_builder.add_text_field("source", STRING | STORED);
        let text_field = schema_builder.add_text_field("text", TEXT | STORED);
        let schema = schema_builder.build();

        let index = Index::create_in_ram(schema);
        let mut writer = index
            .writer(50_000_000)
            .map_err(|e| IndexError::Build(e.to_string()))?;

        let mut entries: Vec<_> = std::fs::read_dir(docs_dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|e| {
                e.path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
            })
            .collect();
        // Deterministic chunk enumeration regardless of directory order
        entries.sort_by_key(|e| e.file_name());

        let mut chunk_count = 0;
        for entry in entries {
            let file_name = entry.file_name().to_string_lossy().to_string();
            let content = std::fs::read_to_string(entry.path())?;
            for chunk in chunk_file(&file_name, &content) {
                writer
                    .add_document(doc!(
                        id_field => chunk.id,
                        source_field => chunk.source,
                        text_field => chunk.text,
                    ))
                    .map_err(|e| IndexError::Build(e.to_string()))?;
                chunk_count += 1;
            }
        }

        writer
            .commit()
            .map_err(|e| IndexError::Build(e.to_string()))?;

        let reader = index
            .reader()
            .map_err(|e| IndexError::Build(e.to_string()))?;

        info!(docs_dir = %docs_dir, chunks = chunk_count, "Document index built");

        Ok(Self {
            index,
            reader,
            id_field,
            source_field,
            text_field,
            chunk_count,
        })
    }

    /// Number of indexed chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    fn stored_str(doc: &TantivyDocument, field: Field) -> String {
        doc.get_first(field)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

impl DocumentIndex for MarkdownIndex {
    fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, IndexError> {
        if query.trim().is_empty() || self.chunk_count == 0 {
            return Ok(Vec::new());
        }

        let searcher = self.reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        // Lenient parsing: model-derived queries can contain characters that
        // the query grammar rejects, and those should narrow the query, not
        // fail the step.
        let (parsed, parse_errors) = parser.parse_query_lenient(query);
        if !parse_errors.is_empty() {
            debug!(query, errors = parse_errors.len(), "Lenient query parse");
        }

        let top = searcher
            .search(&parsed, &TopDocs::with_limit(top_k))
            .map_err(|e| IndexError::Search(e.to_string()))?;

        let mut passages = Vec::with_capacity(top.len());
        for (score, address) in top {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| IndexError::Search(e.to_string()))?;
            passages.push(Passage {
                id: Self::stored_str(&doc, self.id_field),
                text: Self::stored_str(&doc, self.text_field),
                source: Self::stored_str(&doc, self.source_field),
                score,
            });
        }

        Ok(passages)
    }
}
