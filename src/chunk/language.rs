/// Per-language grammar bindings, structural queries and capture tables
use crate::chunk::ChunkKind;
use tree_sitter::Language;

/// Structural query sources, one per grammar.
///
/// Capture names feed the fixed classification table in
/// [`kind_for_capture`]; node kinds must exist in the bound grammar or the
/// query fails to compile and the language is routed to the fallback.
const RUST_QUERY: &str = r#"
(function_item) @function
(struct_item) @struct
(enum_item) @enum
(trait_item) @trait
(impl_item) @impl
(mod_item) @module
"#;

const PYTHON_QUERY: &str = r#"
(function_definition) @function
(class_definition) @class
(decorated_definition) @block
"#;

const JAVASCRIPT_QUERY: &str = r#"
(function_declaration) @function
(function_expression) @function
(arrow_function) @arrow_function
(method_definition) @method
(class_declaration) @class
"#;

const TYPESCRIPT_QUERY: &str = r#"
(function_declaration) @function
(function_expression) @function
(arrow_function) @arrow_function
(method_definition) @method
(class_declaration) @class
(abstract_class_declaration) @class
(interface_declaration) @interface
(enum_declaration) @enum
"#;

const GO_QUERY: &str = r#"
(function_declaration) @function
(method_declaration) @method
(type_declaration) @struct
"#;

const JAVA_QUERY: &str = r#"
(method_declaration) @method
(constructor_declaration) @constructor
(class_declaration) @class
(interface_declaration) @interface
(enum_declaration) @enum
"#;

const SWIFT_QUERY: &str = r#"
(function_declaration) @function
(class_declaration) @class
(protocol_declaration) @interface
"#;

const C_QUERY: &str = r#"
(function_definition) @function
(struct_specifier) @struct
(enum_specifier) @enum
(union_specifier) @struct
(type_definition) @block
"#;

const CPP_QUERY: &str = r#"
(function_definition) @function
(class_specifier) @class
(struct_specifier) @struct
(enum_specifier) @enum
(namespace_definition) @module
(template_declaration) @block
"#;

const CSHARP_QUERY: &str = r#"
(method_declaration) @method
(constructor_declaration) @constructor
(class_declaration) @class
(struct_declaration) @struct
(interface_declaration) @interface
(enum_declaration) @enum
(namespace_declaration) @module
"#;

const RUBY_QUERY: &str = r#"
(method) @method
(singleton_method) @method
(class) @class
(module) @module
"#;

const PHP_QUERY: &str = r#"
(function_definition) @function
(method_declaration) @method
(class_declaration) @class
(interface_declaration) @interface
(trait_declaration) @trait
(namespace_definition) @module
"#;

/// Resolve the grammar and structural query for a file extension.
///
/// Returns `(language name, grammar, query source)`; `None` means no
/// grammar is registered and the caller must fall back to lexical chunking.
pub(crate) fn grammar_for_extension(
    extension: &str,
) -> Option<(&'static str, Language, &'static str)> {
    let (name, language, query): (&'static str, Language, &'static str) =
        match extension.to_lowercase().as_str() {
            "rs" => ("Rust", tree_sitter_rust::LANGUAGE.into(), RUST_QUERY),
            "py" => ("Python", tree_sitter_python::LANGUAGE.into(), PYTHON_QUERY),
            "js" | "mjs" | "cjs" | "jsx" => (
                "JavaScript",
                tree_sitter_javascript::LANGUAGE.into(),
                JAVASCRIPT_QUERY,
            ),
            "ts" | "tsx" => (
                "TypeScript",
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                TYPESCRIPT_QUERY,
            ),
            "go" => ("Go", tree_sitter_go::LANGUAGE.into(), GO_QUERY),
            "java" => ("Java", tree_sitter_java::LANGUAGE.into(), JAVA_QUERY),
            "swift" => ("Swift", tree_sitter_swift::LANGUAGE.into(), SWIFT_QUERY),
            "c" | "h" => ("C", tree_sitter_c::LANGUAGE.into(), C_QUERY),
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => {
                ("C++", tree_sitter_cpp::LANGUAGE.into(), CPP_QUERY)
            }
            "cs" => ("C#", tree_sitter_c_sharp::LANGUAGE.into(), CSHARP_QUERY),
            "rb" => ("Ruby", tree_sitter_ruby::LANGUAGE.into(), RUBY_QUERY),
            "php" => ("PHP", tree_sitter_php::LANGUAGE_PHP.into(), PHP_QUERY),
            _ => return None,
        };

    Some((name, language, query))
}

/// Fixed capture-name classification table.
///
/// Preserved exactly: it determines chunk counts relied upon by callers.
pub(crate) fn kind_for_capture(capture: &str) -> ChunkKind {
    match capture {
        "function" | "method" | "constructor" | "arrow_function" => ChunkKind::Function,
        "class" | "interface" | "struct" | "enum" | "trait" | "impl" | "module" => ChunkKind::Class,
        _ => ChunkKind::Block,
    }
}

/// Detect a display language name from a file extension
pub fn detect_language(extension: &str) -> Option<&'static str> {
    let lang = match extension.to_lowercase().as_str() {
        // Programming languages
        "rs" => "Rust",
        "py" => "Python",
        "js" | "mjs" | "cjs" => "JavaScript",
        "ts" => "TypeScript",
        "jsx" => "JavaScript (JSX)",
        "tsx" => "TypeScript (TSX)",
        "java" => "Java",
        "cpp" | "cc" | "cxx" => "C++",
        "c" => "C",
        "h" | "hpp" | "hxx" | "hh" => "C/C++ Header",
        "go" => "Go",
        "rb" => "Ruby",
        "php" => "PHP",
        "swift" => "Swift",
        "cs" => "C#",
        "sh" | "bash" => "Shell",

        // Data formats and config files
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",

        // Documentation formats
        "md" | "markdown" => "Markdown",
        "txt" => "Text",

        _ => return None,
    };

    Some(lang)
}
