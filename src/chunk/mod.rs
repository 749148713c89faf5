/// Code chunking: AST-driven semantic chunks with a lexical fallback
pub mod language;
pub mod lexical;
pub mod semantic;

pub use lexical::LexicalChunker;
pub use semantic::SemanticChunker;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Classification of a chunk's source construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    File,
    Function,
    Class,
    Block,
}

/// A contiguous, source-accurate slice of one file.
///
/// Immutable once produced; a re-index supersedes chunks rather than
/// mutating them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: String,
    pub file_path: String,
    pub relative_path: String,
    pub file_hash: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub kind: ChunkKind,
    pub language: String,
    pub symbols: Vec<String>,
}

/// A chunk paired with its embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    #[serde(flatten)]
    pub chunk: CodeChunk,
    pub vector: Vec<f32>,
}

/// Deterministic chunk id: stable for identical content, superseded
/// naturally when the file hash changes.
pub(crate) fn chunk_id(relative_path: &str, start: usize, end: usize, file_hash: &str) -> String {
    let short = &file_hash[..file_hash.len().min(8)];
    format!("{}:{}-{}:{}", relative_path, start, end, short)
}

pub(crate) fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// Layered chunker: semantic first, lexical fallback when the semantic
/// path yields nothing.
pub struct Chunker {
    semantic: std::sync::Arc<SemanticChunker>,
    lexical: LexicalChunker,
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Self {
        Self::with_semantic(std::sync::Arc::new(SemanticChunker::new()), chunk_size)
    }

    /// Build a chunker around a shared semantic chunker so that its
    /// grammar-failure cache survives across runs.
    pub fn with_semantic(semantic: std::sync::Arc<SemanticChunker>, chunk_size: usize) -> Self {
        Self {
            semantic,
            lexical: LexicalChunker::new(chunk_size),
        }
    }

    /// Chunk one file. Returns no chunks only for empty content.
    pub fn chunk_file(
        &self,
        file_path: &Path,
        content: &str,
        workspace_root: &Path,
        file_hash: &str,
    ) -> Vec<CodeChunk> {
        let chunks = self
            .semantic
            .chunk(file_path, content, workspace_root, file_hash);
        if !chunks.is_empty() {
            return chunks;
        }

        self.lexical
            .chunk(file_path, content, workspace_root, file_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_chunk_id_is_deterministic() {
        let a = chunk_id("src/lib.rs", 1, 20, "abcdef0123456789");
        let b = chunk_id("src/lib.rs", 1, 20, "abcdef0123456789");
        assert_eq!(a, b);
        assert_eq!(a, "src/lib.rs:1-20:abcdef01");

        let c = chunk_id("src/lib.rs", 1, 20, "ffffff0123456789");
        assert_ne!(a, c);
    }

    #[test]
    fn test_relative_to() {
        let root = PathBuf::from("/work/project");
        let file = PathBuf::from("/work/project/src/main.rs");
        assert_eq!(relative_to(&file, &root), "src/main.rs");

        let outside = PathBuf::from("/elsewhere/x.rs");
        assert_eq!(relative_to(&outside, &root), "/elsewhere/x.rs");
    }

    #[test]
    fn test_semantic_with_lexical_fallback() {
        let chunker = Chunker::new(50);
        let root = PathBuf::from("/ws");

        // A Rust file with a real function goes through the semantic path
        let rust = "fn alpha() {\n    let x = 1;\n    let y = 2;\n    x + y\n}\n";
        let chunks = chunker.chunk_file(&root.join("src/a.rs"), rust, &root, "hash");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::Function);

        // Markdown has no grammar: lexical fallback, one whole-file chunk
        let md = "# Title\n\nSome prose.\n";
        let chunks = chunker.chunk_file(&root.join("README.md"), md, &root, "hash");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::File);

        // Empty content yields nothing from either layer
        let chunks = chunker.chunk_file(&root.join("empty.rs"), "", &root, "hash");
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_data_file_with_grammar_falls_back() {
        // Valid Rust grammar target but zero captures (pure data): the
        // fallback must still produce a whole-file chunk.
        let chunker = Chunker::new(50);
        let root = PathBuf::from("/ws");
        let consts = "pub const A: u8 = 1;\npub const B: u8 = 2;\n";
        let chunks = chunker.chunk_file(&root.join("consts.rs"), consts, &root, "hash");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, ChunkKind::File);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 2);
    }
}
