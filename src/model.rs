//! Core data model: the entities of §3 of the specification.
//!
//! These are plain value types. They carry no behavior beyond small
//! invariant-preserving constructors; storage, extraction and querying live
//! in their own modules.

use serde::{Deserialize, Serialize};

/// Kind of a symbol, as libclang's cursor kind maps onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Struct,
    Function,
    Method,
    ClassTemplate,
    FunctionTemplate,
    PartialSpecialization,
    FullSpecialization,
    Field,
    Typedef,
    Variable,
    Enum,
    Enumerator,
    NamespaceAlias,
    Other,
}

impl SymbolKind {
    /// Whether this kind belongs to the "class family" used by
    /// `search_classes` and hierarchy/derived-class queries.
    pub fn is_class_family(self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Struct
                | Self::ClassTemplate
                | Self::PartialSpecialization
                | Self::FullSpecialization
        )
    }

    /// Whether this kind belongs to the "function family" used by
    /// `search_functions` and call-graph queries.
    pub fn is_function_family(self) -> bool {
        matches!(
            self,
            Self::Function | Self::Method | Self::FunctionTemplate
        )
    }
}

/// Kind of template a symbol represents, when `is_template` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    ClassTemplate,
    FunctionTemplate,
    PartialSpecialization,
    FullSpecialization,
}

/// Access specifier of a class member. Non-members are always `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// Kind of a template parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateParamKind {
    Type,
    NonType,
    Template,
}

/// A single template parameter in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub name: String,
    pub kind: TemplateParamKind,
    pub type_spelling: Option<String>,
}

/// A uniquely identified C++ entity, per §3.1.
///
/// `usr` is the identity; every other field describes it. Constructed by the
/// extractor, owned by the store, destroyed only by re-indexing the
/// defining file or recreating the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub usr: String,
    pub name: String,
    pub qualified_name: String,
    pub namespace: String,
    pub kind: SymbolKind,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub signature: String,
    pub is_project: bool,
    pub access: Access,
    pub parent_class: Option<String>,
    pub base_classes: Vec<String>,
    pub brief: Option<String>,
    pub doc_comment: Option<String>,
    pub is_template: bool,
    pub template_kind: Option<TemplateKind>,
    pub template_parameters: Vec<TemplateParameter>,
    pub primary_template_usr: Option<String>,
}

/// Maximum length of `doc_comment` before truncation, per §4.3.
pub const DOC_COMMENT_MAX_CHARS: usize = 4000;
/// Maximum length of `brief` before truncation, per §4.3.
pub const BRIEF_MAX_CHARS: usize = 200;

/// Truncate `s` to at most `max_chars` characters, appending `...` if
/// truncation happened. Operates on char boundaries, never byte offsets, so
/// it never panics on multi-byte UTF-8 input.
pub fn truncate_with_marker(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

impl Symbol {
    /// Validate the invariants from §3.1: `qualified_name` ends with `name`,
    /// and (when `namespace` is non-empty) `qualified_name` equals
    /// `namespace + "::" + name`.
    pub fn check_qualified_name_invariant(&self) -> bool {
        if !self.qualified_name.ends_with(self.name.as_str()) {
            return false;
        }
        if self.namespace.is_empty() {
            self.qualified_name == self.name
        } else {
            self.qualified_name == format!("{}::{}", self.namespace, self.name)
        }
    }
}

/// A directed call occurrence, per §3.1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSite {
    pub caller_usr: String,
    pub callee_usr: Option<String>,
    pub callee_name: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub in_method_of: Option<String>,
}

/// One row per indexed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    pub content_hash: String,
    pub compile_args_hash: String,
    pub indexed_at: i64,
    pub symbol_count: u32,
}

/// Claimed-header record, per §3.1/§4.9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderOwnership {
    pub header_path: String,
    pub content_hash: String,
    pub build_database_version_hash: String,
    pub processed_at: i64,
}

/// A directed edge `source_file -> header_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderDependency {
    pub source_file: String,
    pub header_path: String,
}

/// Kind of parse failure, matching the parse-error taxonomy in §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseErrorKind {
    ParserDiagnosticFatal,
    ParserCrash,
    ParserMissingHeader,
}

/// One row per failed parse attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseError {
    pub file: String,
    pub error_kind: ParseErrorKind,
    pub message: String,
    pub stack_trace: Option<String>,
    pub content_hash: String,
    pub compile_args_hash: String,
    pub retry_count: u32,
    pub timestamp: i64,
}

/// The number of consecutive retries after which a file is considered
/// fallback-eligible (§4.4, §8 S6).
pub const FALLBACK_ELIGIBLE_RETRY_COUNT: u32 = 3;

impl ParseError {
    pub fn is_fallback_eligible(&self) -> bool {
        self.retry_count >= FALLBACK_ELIGIBLE_RETRY_COUNT
    }
}

/// Process-wide key/value metadata, per §3.1.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineMeta {
    pub schema_version: i64,
    pub index_version: i64,
    pub project_root: String,
    pub build_database_version_hash: String,
    pub indexing_includes_dependencies: bool,
    pub last_maintenance_timestamp: Option<i64>,
}

/// The triple whose mismatch forces cache recreation, per §3.2/§6.2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheIdentity {
    pub project_root: String,
    pub build_database_version_hash: String,
    pub schema_version: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_symbol(namespace: &str, name: &str) -> Symbol {
        let qualified_name = if namespace.is_empty() {
            name.to_string()
        } else {
            format!("{namespace}::{name}")
        };
        Symbol {
            usr: "c:@S@Foo".into(),
            name: name.into(),
            qualified_name,
            namespace: namespace.into(),
            kind: SymbolKind::Class,
            file: "/proj/foo.h".into(),
            line: 1,
            column: 1,
            signature: String::new(),
            is_project: true,
            access: Access::Public,
            parent_class: None,
            base_classes: Vec::new(),
            brief: None,
            doc_comment: None,
            is_template: false,
            template_kind: None,
            template_parameters: Vec::new(),
            primary_template_usr: None,
        }
    }

    #[test]
    fn qualified_name_invariant_holds_for_namespaced_symbol() {
        let sym = sample_symbol("app::ui", "View");
        assert!(sym.check_qualified_name_invariant());
    }

    #[test]
    fn qualified_name_invariant_holds_for_global_symbol() {
        let sym = sample_symbol("", "main");
        assert!(sym.check_qualified_name_invariant());
    }

    #[test]
    fn qualified_name_invariant_detects_mismatch() {
        let mut sym = sample_symbol("app::ui", "View");
        sym.qualified_name = "app::ui::Other".into();
        assert!(!sym.check_qualified_name_invariant());
    }

    #[test]
    fn truncate_with_marker_respects_char_boundaries() {
        let s = "é".repeat(10);
        let out = truncate_with_marker(&s, 5);
        assert_eq!(out.chars().count(), 8); // 5 chars + "..."
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_with_marker_passes_through_short_strings() {
        assert_eq!(truncate_with_marker("short", 200), "short");
    }

    #[test]
    fn fallback_eligibility_threshold() {
        let mut err = ParseError {
            file: "a.cpp".into(),
            error_kind: ParseErrorKind::ParserCrash,
            message: "boom".into(),
            stack_trace: None,
            content_hash: "h".into(),
            compile_args_hash: "a".into(),
            retry_count: 2,
            timestamp: 0,
        };
        assert!(!err.is_fallback_eligible());
        err.retry_count = 3;
        assert!(err.is_fallback_eligible());
    }
}
