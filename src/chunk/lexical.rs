/// Lexical fallback chunker
///
/// Used whenever the semantic path yields nothing: no grammar for the
/// extension, a grammar that failed to load, or zero query captures.
/// Guarantees at least one chunk for any content with a non-whitespace
/// character.
use super::language::detect_language;
use super::{chunk_id, relative_to, ChunkKind, CodeChunk};
use std::path::Path;

pub struct LexicalChunker {
    /// Lines per chunk window
    chunk_size: usize,
}

impl LexicalChunker {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    /// Chunk a file into fixed line windows. A file that fits in one
    /// window becomes a single whole-file chunk.
    pub fn chunk(
        &self,
        file_path: &Path,
        content: &str,
        workspace_root: &Path,
        file_hash: &str,
    ) -> Vec<CodeChunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        let language = file_path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(detect_language)
            .unwrap_or("Text")
            .to_string();

        let relative_path = relative_to(file_path, workspace_root);
        let file_path_str = file_path.to_string_lossy().to_string();

        let lines: Vec<&str> = content.lines().collect();
        let mut chunks = Vec::new();

        for (window_idx, window) in lines.chunks(self.chunk_size).enumerate() {
            let window_content = window.join("\n");
            if window_content.trim().is_empty() {
                continue;
            }

            let start_line = window_idx * self.chunk_size + 1;
            let end_line = start_line + window.len() - 1;

            chunks.push(CodeChunk {
                id: chunk_id(&relative_path, start_line, end_line, file_hash),
                file_path: file_path_str.clone(),
                relative_path: relative_path.clone(),
                file_hash: file_hash.to_string(),
                content: window_content,
                start_line,
                end_line,
                kind: ChunkKind::File,
                language: language.clone(),
                symbols: Vec::new(),
            });
        }

        chunks
    }
}
