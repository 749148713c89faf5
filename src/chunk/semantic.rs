/// AST-based semantic chunker
///
/// Parses a file with the grammar registered for its extension, runs the
/// language's structural query and emits one chunk per capture. Fails soft
/// to an empty result on any parser or query error; the caller is expected
/// to fall back to lexical chunking.
use super::language::{grammar_for_extension, kind_for_capture};
use super::{chunk_id, relative_to, ChunkKind, CodeChunk};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator};

/// Captures spanning fewer than this many lines are discarded
const MIN_CHUNK_LINES: usize = 3;

/// Node kinds the symbol extractor is allowed to descend into, one level
const WRAPPER_KINDS: &[&str] = &["declaration", "init_declarator", "variable_declarator"];

/// One capture lifted out of the tree before the tree is dropped
struct Captured {
    start_byte: usize,
    end_byte: usize,
    start_line: usize,
    end_line: usize,
    kind: ChunkKind,
    symbol: Option<String>,
}

pub struct SemanticChunker {
    /// Compiled structural queries, one per language
    queries: Mutex<HashMap<&'static str, Arc<Query>>>,
    /// Languages whose grammar or query failed to load; recorded once,
    /// subsequent files route silently to the fallback
    failed: Mutex<HashSet<&'static str>>,
}

impl SemanticChunker {
    pub fn new() -> Self {
        Self {
            queries: Mutex::new(HashMap::new()),
            failed: Mutex::new(HashSet::new()),
        }
    }

    /// Chunk one file into semantic units. Never errors: any failure
    /// yields an empty result so the caller falls back.
    pub fn chunk(
        &self,
        file_path: &Path,
        content: &str,
        workspace_root: &Path,
        file_hash: &str,
    ) -> Vec<CodeChunk> {
        let Some(extension) = file_path.extension().and_then(|e| e.to_str()) else {
            return Vec::new();
        };

        let Some((language_name, language, query_src)) = grammar_for_extension(extension) else {
            return Vec::new();
        };

        if self.failed.lock().unwrap().contains(language_name) {
            return Vec::new();
        }

        let Some(query) = self.query_for(language_name, &language, query_src) else {
            return Vec::new();
        };

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&language) {
            self.record_failure(language_name, &format!("set_language failed: {}", e));
            return Vec::new();
        }

        let Some(tree) = parser.parse(content, None) else {
            tracing::debug!("Parser returned no tree for {:?}", file_path);
            return Vec::new();
        };

        let mut captured = Vec::new();
        let capture_names = query.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), content.as_bytes());

        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                let start_line = node.start_position().row + 1;
                let end_line = node.end_position().row + 1;

                if end_line + 1 < start_line + MIN_CHUNK_LINES {
                    continue;
                }

                let capture_name = capture_names[capture.index as usize];
                captured.push(Captured {
                    start_byte: node.start_byte(),
                    end_byte: node.end_byte(),
                    start_line,
                    end_line,
                    kind: kind_for_capture(capture_name),
                    symbol: extract_symbol(node, content),
                });
            }
        }

        // Deterministic file-order output
        captured.sort_by_key(|c| c.start_byte);

        let relative_path = relative_to(file_path, workspace_root);
        let file_path_str = file_path.to_string_lossy().to_string();

        captured
            .into_iter()
            .filter_map(|c| {
                let content = content.get(c.start_byte..c.end_byte)?;
                Some(CodeChunk {
                    id: chunk_id(&relative_path, c.start_line, c.end_line, file_hash),
                    file_path: file_path_str.clone(),
                    relative_path: relative_path.clone(),
                    file_hash: file_hash.to_string(),
                    content: content.to_string(),
                    start_line: c.start_line,
                    end_line: c.end_line,
                    kind: c.kind,
                    language: language_name.to_string(),
                    symbols: c.symbol.into_iter().collect(),
                })
            })
            .collect()
    }

    /// Fetch or compile the structural query for a language
    fn query_for(
        &self,
        language_name: &'static str,
        language: &Language,
        query_src: &'static str,
    ) -> Option<Arc<Query>> {
        if let Some(query) = self.queries.lock().unwrap().get(language_name) {
            return Some(query.clone());
        }

        match Query::new(language, query_src) {
            Ok(query) => {
                let query = Arc::new(query);
                self.queries
                    .lock()
                    .unwrap()
                    .insert(language_name, query.clone());
                Some(query)
            }
            Err(e) => {
                self.record_failure(language_name, &format!("query compile failed: {}", e));
                None
            }
        }
    }

    fn record_failure(&self, language_name: &'static str, reason: &str) {
        let mut failed = self.failed.lock().unwrap();
        if failed.insert(language_name) {
            tracing::warn!(
                "Grammar unavailable for {} ({}); routing files to lexical fallback",
                language_name,
                reason
            );
        }
    }
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-effort symbol name: the first identifier-typed descendant, with
/// one level of recursion through known wrapper node kinds.
fn extract_symbol(node: Node, source: &str) -> Option<String> {
    find_identifier(node, source, 0)
}

fn find_identifier(node: Node, source: &str, depth: usize) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name")
        && let Ok(text) = name.utf8_text(source.as_bytes())
    {
        return Some(text.to_string());
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if is_identifier_kind(child.kind())
            && let Ok(text) = child.utf8_text(source.as_bytes())
        {
            return Some(text.to_string());
        }
    }

    if depth == 0 {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if is_wrapper_kind(child.kind())
                && let Some(symbol) = find_identifier(child, source, 1)
            {
                return Some(symbol);
            }
        }
    }

    None
}

fn is_identifier_kind(kind: &str) -> bool {
    kind == "identifier" || kind.ends_with("identifier")
}

fn is_wrapper_kind(kind: &str) -> bool {
    WRAPPER_KINDS.contains(&kind) || kind.ends_with("declarator")
}
