//! Symbol Extractor (§4.3): turns one source file into symbols, call sites,
//! and observed headers using libclang cursor traversal.

use std::path::{Path, PathBuf};

use clang::{Clang, Entity, EntityKind, Index};

use crate::error::{EngineError, Result};
use crate::header_tracker::{ClaimOutcome, HeaderClaims};
use crate::model::{
    Access, CallSite, HeaderOwnership, ParseError, ParseErrorKind, Symbol, SymbolKind,
    TemplateKind, TemplateParamKind, TemplateParameter, BRIEF_MAX_CHARS, DOC_COMMENT_MAX_CHARS,
};

/// Owns the libclang index for one worker process's lifetime. Constructing
/// this is expensive; workers build exactly one and reuse it for every file
/// they extract (§4.4).
pub struct Extractor {
    clang: Clang,
}

/// Everything one call to `extract` produced.
pub struct ExtractionResult {
    pub symbols: Vec<Symbol>,
    pub call_sites: Vec<CallSite>,
    pub headers_observed: Vec<PathBuf>,
    pub header_ownership: Vec<HeaderOwnership>,
}

impl Extractor {
    pub fn new() -> Result<Self> {
        let clang = Clang::new().map_err(|e| EngineError::ConstraintViolation {
            message: format!("failed to initialize libclang: {e}"),
        })?;
        Ok(Self { clang })
    }

    /// Parse `source` with `arguments` and extract symbols, call sites and
    /// the set of headers visited, per §4.3's algorithm. Cursors whose
    /// defining file falls outside `project_root` (and isn't `source`
    /// itself) are external dependencies or system headers and are skipped
    /// entirely, per §4.3 step 3.
    pub fn extract(
        &self,
        source: &Path,
        project_root: &Path,
        arguments: &[String],
        content_hash: &str,
        build_database_version_hash: &str,
        tracker: &dyn HeaderClaims,
    ) -> std::result::Result<ExtractionResult, ParseError> {
        let index = Index::new(&self.clang, false, false);
        let tu = index
            .parser(source)
            .arguments(arguments)
            .parse()
            .map_err(|e| ParseError {
                file: source.display().to_string(),
                error_kind: ParseErrorKind::ParserCrash,
                message: e.to_string(),
                stack_trace: None,
                content_hash: content_hash.to_string(),
                compile_args_hash: args_hash(arguments),
                retry_count: 0,
                timestamp: now(),
            })?;

        for diagnostic in tu.get_diagnostics() {
            if diagnostic.get_severity() == clang::diagnostic::Severity::Fatal {
                return Err(ParseError {
                    file: source.display().to_string(),
                    error_kind: ParseErrorKind::ParserDiagnosticFatal,
                    message: diagnostic.get_text(),
                    stack_trace: None,
                    content_hash: content_hash.to_string(),
                    compile_args_hash: args_hash(arguments),
                    retry_count: 0,
                    timestamp: now(),
                });
            }
        }

        let mut symbols = Vec::new();
        let mut call_sites = Vec::new();
        let mut will_complete: Vec<PathBuf> = Vec::new();
        let mut header_hashes: Vec<(PathBuf, String)> = Vec::new();
        let mut headers_observed: Vec<PathBuf> = Vec::new();

        let root = tu.get_entity();
        visit_recursive(
            &root,
            source,
            project_root,
            content_hash,
            build_database_version_hash,
            tracker,
            &mut symbols,
            &mut call_sites,
            &mut will_complete,
            &mut header_hashes,
            &mut headers_observed,
        );

        let completed_at = now();
        for header in &will_complete {
            tracker.mark_completed(
                header,
                content_hash,
                build_database_version_hash,
                completed_at,
            );
        }

        let header_ownership = header_hashes
            .into_iter()
            .map(|(path, hash)| HeaderOwnership {
                header_path: path.display().to_string(),
                content_hash: hash,
                build_database_version_hash: build_database_version_hash.to_string(),
                processed_at: completed_at,
            })
            .collect();

        link_template_specializations(&mut symbols);

        Ok(ExtractionResult {
            symbols,
            call_sites,
            headers_observed,
            header_ownership,
        })
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn args_hash(arguments: &[String]) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(arguments.join("\u{1}").as_bytes()))
}

/// Content hash of a header's own bytes, stored in `HeaderOwnership` so a
/// later refresh can tell whether the header has changed on disk (§4.6
/// step 2), independent of the source-file `content_hash` threaded through
/// `HeaderClaims` for first-win dedup.
fn hash_header_content(path: &Path) -> Option<String> {
    use xxhash_rust::xxh3::xxh3_64;
    std::fs::read(path)
        .ok()
        .map(|bytes| format!("{:016x}", xxh3_64(&bytes)))
}

#[allow(clippy::too_many_arguments)]
fn visit_recursive(
    entity: &Entity,
    source: &Path,
    project_root: &Path,
    content_hash: &str,
    build_database_version_hash: &str,
    tracker: &dyn HeaderClaims,
    symbols: &mut Vec<Symbol>,
    call_sites: &mut Vec<CallSite>,
    will_complete: &mut Vec<PathBuf>,
    header_hashes: &mut Vec<(PathBuf, String)>,
    headers_observed: &mut Vec<PathBuf>,
)  {
    if let Some(location) = entity.get_location() {
        if let Some(file) = location.get_file_location().file {
            let file_path = file.get_path();

            let is_source_file = file_path == source;
            let is_project_file = is_source_file || file_path.starts_with(project_root);

            // External dependency or system header: skip this cursor and
            // don't descend into it, per §4.3 step 3.
            if !is_project_file {
                return;
            }

            if !is_source_file {
                if !headers_observed.contains(&file_path) {
                    headers_observed.push(file_path.clone());
                }
                match tracker.try_claim(&file_path, content_hash, build_database_version_hash) {
                    ClaimOutcome::AlreadyDone | ClaimOutcome::InProgress => {
                        // Someone else owns (or already finished) this
                        // header; don't re-extract its cursors, but still
                        // recurse so children in the *source* file are
                        // visited.
                        for child in entity.get_children() {
                            visit_recursive(
                                &child,
                                source,
                                project_root,
                                content_hash,
                                build_database_version_hash,
                                tracker,
                                symbols,
                                call_sites,
                                will_complete,
                                header_hashes,
                                headers_observed,
                            );
                        }
                        return;
                    }
                    ClaimOutcome::Claimed => {
                        if !will_complete.contains(&file_path) {
                            will_complete.push(file_path.clone());
                            if let Some(hash) = hash_header_content(&file_path) {
                                header_hashes.push((file_path.clone(), hash));
                            }
                        }
                    }
                }
            }

            try_extract_cursor(entity, is_project_file, symbols, call_sites);
        }
    }

    for child in entity.get_children() {
        visit_recursive(
            &child,
            source,
            project_root,
            content_hash,
            build_database_version_hash,
            tracker,
            symbols,
            call_sites,
            will_complete,
            header_hashes,
            headers_observed,
        );
    }
}

fn try_extract_cursor(
    entity: &Entity,
    is_project: bool,
    symbols: &mut Vec<Symbol>,
    call_sites: &mut Vec<CallSite>,
) {
    if is_call_expression(entity) {
        if let Some(call) = build_call_site(entity) {
            call_sites.push(call);
        }
        return;
    }

    let Some(kind) = map_symbol_kind(entity) else {
        return;
    };

    // Forward declarations without a definition are not emitted (§4.3
    // invariants); definitions always take precedence for a given USR.
    if !entity.is_definition()
        && matches!(
            kind,
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::FullSpecialization
        )
    {
        return;
    }

    let Some(usr) = entity.get_usr().map(|u| u.0) else {
        return;
    };
    let name = entity.get_name().unwrap_or_default();
    let qualified_name = build_qualified_name(entity);
    let namespace = namespace_of(&qualified_name, &name);

    let (is_template, template_kind) = template_info(kind);
    let template_parameters = if is_template {
        collect_template_parameters(entity)
    } else {
        Vec::new()
    };

    let base_classes = if kind.is_class_family() {
        collect_base_classes(entity)
    } else {
        Vec::new()
    };

    let signature = canonicalize_signature(entity, kind);
    let (brief, doc_comment) = extract_comments(entity);

    let symbol = Symbol {
        usr,
        name,
        qualified_name,
        namespace,
        kind,
        file: entity
            .get_location()
            .and_then(|l| l.get_file_location().file)
            .map(|f| f.get_path().display().to_string())
            .unwrap_or_default(),
        line: entity
            .get_location()
            .map(|l| l.get_file_location().line)
            .unwrap_or(0),
        column: entity
            .get_location()
            .map(|l| l.get_file_location().column)
            .unwrap_or(0),
        signature,
        is_project,
        access: map_access(entity),
        parent_class: entity
            .get_semantic_parent()
            .filter(|p| {
                matches!(
                    p.get_kind(),
                    EntityKind::ClassDecl | EntityKind::StructDecl | EntityKind::ClassTemplate
                )
            })
            .and_then(|p| p.get_name()),
        base_classes,
        brief,
        doc_comment,
        is_template,
        template_kind,
        template_parameters,
        // Resolved in a second pass over the whole file's symbols, once
        // every template declared in this translation unit has been
        // collected — see `link_template_specializations`.
        primary_template_usr: None,
    };

    symbols.push(symbol);
}

/// A class or function template's explicit full specialization is not a
/// distinct libclang `EntityKind` — it surfaces as an ordinary
/// `ClassDecl`/`StructDecl`/`FunctionDecl`, distinguishable only by its USR
/// embedding the primary template's name (§4.3's `S@Name>#...` /
/// `F@Name<#...` patterns).
fn is_full_specialization_usr(usr: &str) -> bool {
    usr.contains(">#") || usr.contains("<#")
}

fn map_symbol_kind(entity: &Entity) -> Option<SymbolKind> {
    let is_full_spec = entity
        .get_usr()
        .map(|u| is_full_specialization_usr(&u.0))
        .unwrap_or(false);

    match entity.get_kind() {
        EntityKind::ClassDecl | EntityKind::StructDecl if is_full_spec => {
            Some(SymbolKind::FullSpecialization)
        }
        EntityKind::ClassDecl => Some(SymbolKind::Class),
        EntityKind::StructDecl => Some(SymbolKind::Struct),
        EntityKind::FunctionDecl if is_full_spec => Some(SymbolKind::FullSpecialization),
        EntityKind::FunctionDecl => Some(SymbolKind::Function),
        EntityKind::Method => Some(SymbolKind::Method),
        EntityKind::ClassTemplate => Some(SymbolKind::ClassTemplate),
        EntityKind::FunctionTemplate => Some(SymbolKind::FunctionTemplate),
        EntityKind::ClassTemplatePartialSpecialization => {
            Some(SymbolKind::PartialSpecialization)
        }
        EntityKind::FieldDecl => Some(SymbolKind::Field),
        EntityKind::TypedefDecl => Some(SymbolKind::Typedef),
        EntityKind::VarDecl => Some(SymbolKind::Variable),
        EntityKind::EnumDecl => Some(SymbolKind::Enum),
        EntityKind::EnumConstantDecl => Some(SymbolKind::Enumerator),
        EntityKind::NamespaceAlias => Some(SymbolKind::NamespaceAlias),
        _ => None,
    }
}

fn template_info(kind: SymbolKind) -> (bool, Option<TemplateKind>) {
    match kind {
        SymbolKind::ClassTemplate => (true, Some(TemplateKind::ClassTemplate)),
        SymbolKind::FunctionTemplate => (true, Some(TemplateKind::FunctionTemplate)),
        SymbolKind::PartialSpecialization => (true, Some(TemplateKind::PartialSpecialization)),
        SymbolKind::FullSpecialization => (true, Some(TemplateKind::FullSpecialization)),
        _ => (false, None),
    }
}

/// Walk `semantic_parent` to the translation-unit root, joining spellings
/// with `::`. Anonymous namespaces keep the parser's textual label verbatim.
fn build_qualified_name(entity: &Entity) -> String {
    let mut components = Vec::new();
    let own_name = entity.get_name().unwrap_or_else(|| "(anonymous)".to_string());
    components.push(own_name);

    let mut current = entity.get_semantic_parent();
    while let Some(parent) = current {
        match parent.get_kind() {
            EntityKind::TranslationUnit => break,
            EntityKind::Namespace => {
                let label = parent
                    .get_name()
                    .unwrap_or_else(|| "(anonymous namespace)".to_string());
                components.push(label);
            }
            EntityKind::ClassDecl
            | EntityKind::StructDecl
            | EntityKind::ClassTemplate
            | EntityKind::ClassTemplatePartialSpecialization => {
                if let Some(name) = parent.get_name() {
                    components.push(name);
                }
            }
            _ => {}
        }
        current = parent.get_semantic_parent();
    }

    components.reverse();
    components.join("::")
}

fn namespace_of(qualified_name: &str, name: &str) -> String {
    qualified_name
        .strip_suffix(name)
        .and_then(|prefix| prefix.strip_suffix("::"))
        .unwrap_or("")
        .to_string()
}

fn map_access(entity: &Entity) -> Access {
    match entity.get_accessibility() {
        Some(clang::Accessibility::Protected) => Access::Protected,
        Some(clang::Accessibility::Private) => Access::Private,
        _ => Access::Public,
    }
}

fn collect_template_parameters(entity: &Entity) -> Vec<TemplateParameter> {
    entity
        .get_children()
        .into_iter()
        .filter_map(|child| {
            let kind = match child.get_kind() {
                EntityKind::TemplateTypeParameter => TemplateParamKind::Type,
                EntityKind::NonTypeTemplateParameter => TemplateParamKind::NonType,
                EntityKind::TemplateTemplateParameter => TemplateParamKind::Template,
                _ => return None,
            };
            Some(TemplateParameter {
                name: child.get_name().unwrap_or_default(),
                kind,
                type_spelling: child.get_type().map(|t| t.get_display_name()),
            })
        })
        .collect()
}

/// Enumerate `CXX_BASE_SPECIFIER` children and capture each base's
/// canonical type spelling (type-alias-expanded, fully qualified).
fn collect_base_classes(entity: &Entity) -> Vec<String> {
    entity
        .get_children()
        .into_iter()
        .filter(|child| child.get_kind() == EntityKind::BaseSpecifier)
        .filter_map(|child| {
            child
                .get_type()
                .map(|t| t.get_canonical_type().get_display_name())
        })
        .collect()
}

fn canonicalize_signature(entity: &Entity, kind: SymbolKind) -> String {
    if !kind.is_function_family() {
        return String::new();
    }
    let return_type = entity
        .get_result_type()
        .map(|t| t.get_canonical_type().get_display_name())
        .unwrap_or_default();
    let params: Vec<String> = entity
        .get_arguments()
        .unwrap_or_default()
        .into_iter()
        .map(|arg| {
            arg.get_type()
                .map(|t| t.get_canonical_type().get_display_name())
                .unwrap_or_default()
        })
        .collect();
    format!("{return_type} ({})", params.join(", "))
}

fn extract_comments(entity: &Entity) -> (Option<String>, Option<String>) {
    let brief = entity.get_comment_brief().map(|raw| {
        let first_line = raw.lines().next().unwrap_or(&raw).trim();
        crate::model::truncate_with_marker(first_line, BRIEF_MAX_CHARS)
    });
    let doc_comment = entity
        .get_comment()
        .map(|raw| crate::model::truncate_with_marker(&raw, DOC_COMMENT_MAX_CHARS));
    (brief, doc_comment)
}

/// Link each specialization in this file to its primary template's USR
/// (§4.3, §3 invariant on `primary_template_usr`), now that every template
/// declared in the translation unit has been collected. A specialization
/// shares its primary's `qualified_name` (libclang strips the argument list
/// from `get_name()` for both), so the match is exact, not heuristic. If the
/// primary isn't declared in this file, `primary_template_usr` stays null,
/// per the invariant's explicit allowance.
fn link_template_specializations(symbols: &mut [Symbol]) {
    let primary_usrs: std::collections::HashMap<String, String> = symbols
        .iter()
        .filter(|s| {
            matches!(
                s.template_kind,
                Some(TemplateKind::ClassTemplate) | Some(TemplateKind::FunctionTemplate)
            )
        })
        .map(|s| (s.qualified_name.clone(), s.usr.clone()))
        .collect();

    for symbol in symbols.iter_mut() {
        if matches!(
            symbol.template_kind,
            Some(TemplateKind::FullSpecialization) | Some(TemplateKind::PartialSpecialization)
        ) {
            symbol.primary_template_usr = primary_usrs.get(&symbol.qualified_name).cloned();
        }
    }
}

/// A cursor represents either an actual call or a bare reference to a
/// callable (e.g. taking a function's address, naming it as a callback).
/// §4.3 step 3 requires a CallSite for both.
fn is_call_expression(entity: &Entity) -> bool {
    match entity.get_kind() {
        EntityKind::CallExpr => true,
        EntityKind::DeclRefExpr | EntityKind::MemberRefExpr => entity
            .get_reference()
            .map(|r| {
                matches!(
                    r.get_kind(),
                    EntityKind::FunctionDecl | EntityKind::Method | EntityKind::FunctionTemplate
                )
            })
            .unwrap_or(false),
        _ => false,
    }
}

fn build_call_site(entity: &Entity) -> Option<CallSite> {
    let location = entity.get_location()?;
    let file_location = location.get_file_location();
    let file = file_location.file?.get_path();

    let caller = find_enclosing_callable(entity)?;
    let caller_usr = caller.get_usr()?.0;
    let in_method_of = if caller.get_kind() == EntityKind::Method {
        caller.get_semantic_parent().and_then(|p| p.get_name())
    } else {
        None
    };

    let referenced = entity.get_reference();
    let callee_usr = referenced.as_ref().and_then(|r| r.get_usr()).map(|u| u.0);
    let callee_name = referenced
        .as_ref()
        .and_then(|r| r.get_name())
        .or_else(|| entity.get_name())
        .unwrap_or_default();

    Some(CallSite {
        caller_usr,
        callee_usr,
        callee_name,
        file: file.display().to_string(),
        line: file_location.line,
        column: file_location.column,
        in_method_of,
    })
}

fn find_enclosing_callable(entity: &Entity) -> Option<Entity> {
    let mut current = entity.get_semantic_parent();
    while let Some(candidate) = current {
        if matches!(
            candidate.get_kind(),
            EntityKind::FunctionDecl | EntityKind::Method | EntityKind::FunctionTemplate
        ) {
            return Some(candidate);
        }
        current = candidate.get_semantic_parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// libclang may not be installed in every environment this crate is
    /// built in; extractor tests that need a real translation unit skip
    /// rather than fail when initialization is unavailable.
    fn try_extractor() -> Option<Extractor> {
        Extractor::new().ok()
    }

    #[test]
    fn namespace_of_splits_qualified_name_correctly() {
        assert_eq!(namespace_of("app::ui::View", "View"), "app::ui");
        assert_eq!(namespace_of("main", "main"), "");
    }

    #[test]
    fn extractor_initializes_when_libclang_available() {
        if try_extractor().is_none() {
            eprintln!("skipping: libclang not available in this environment");
        }
    }

    fn stub_template(usr: &str, qualified_name: &str, kind: TemplateKind) -> Symbol {
        Symbol {
            usr: usr.into(),
            name: qualified_name.rsplit("::").next().unwrap().into(),
            qualified_name: qualified_name.into(),
            namespace: String::new(),
            kind: SymbolKind::Class,
            file: "/proj/a.h".into(),
            line: 1,
            column: 1,
            signature: String::new(),
            is_project: true,
            access: Access::Public,
            parent_class: None,
            base_classes: Vec::new(),
            brief: None,
            doc_comment: None,
            is_template: true,
            template_kind: Some(kind),
            template_parameters: Vec::new(),
            primary_template_usr: None,
        }
    }

    #[test]
    fn link_template_specializations_matches_by_qualified_name() {
        let mut symbols = vec![
            stub_template("u-primary", "Container", TemplateKind::ClassTemplate),
            stub_template("u-full", "Container", TemplateKind::FullSpecialization),
            stub_template("u-partial", "Container", TemplateKind::PartialSpecialization),
            stub_template("u-unrelated", "Other", TemplateKind::ClassTemplate),
        ];
        link_template_specializations(&mut symbols);

        assert_eq!(symbols[1].primary_template_usr.as_deref(), Some("u-primary"));
        assert_eq!(symbols[2].primary_template_usr.as_deref(), Some("u-primary"));
        assert_eq!(symbols[0].primary_template_usr, None);
    }

    #[test]
    fn link_template_specializations_leaves_null_when_primary_not_in_file() {
        let mut symbols = vec![stub_template(
            "u-full",
            "Orphan",
            TemplateKind::FullSpecialization,
        )];
        link_template_specializations(&mut symbols);
        assert_eq!(symbols[0].primary_template_usr, None);
    }

    #[test]
    fn is_full_specialization_usr_detects_both_patterns() {
        assert!(is_full_specialization_usr("c:@S@Container>#I"));
        assert!(is_full_specialization_usr("c:@F@fn<#I"));
        assert!(!is_full_specialization_usr("c:@S@Container"));
    }
}
