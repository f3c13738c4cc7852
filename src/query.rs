//! Query Engine (§4.7): pattern compilation and read-only operations over
//! the Persistent Store's symbol and call-graph tables.

use std::collections::{HashSet, VecDeque};

use serde::Serialize;

use crate::error::Result;
use crate::model::{CallSite, Symbol, SymbolKind};
use crate::store::Store;

const REGEX_METACHARACTERS: &[char] =
    &['.', '*', '+', '?', '[', ']', '{', '}', '(', ')', '|', '^', '$', '\\'];

/// A compiled match mode for a pattern string, per §4.7's four-way
/// dispatch. Component boundaries are hard: `app::X` never matches
/// `myapp::X`.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// `::Name` — match only an exact `qualified_name`.
    Absolute(String),
    /// `a::b` — match a qualified-name suffix, split on `::`.
    QualifiedSuffix(Vec<String>),
    /// Contains a regex metacharacter — `fullmatch` against `name`.
    Regex(regex::Regex),
    /// No `::`, no metacharacters — exact match against `name`.
    UnqualifiedExact(String),
}

impl Pattern {
    /// Compile `raw` per the dispatch rules in §4.7.
    pub fn compile(raw: &str) -> Result<Self> {
        if let Some(rest) = raw.strip_prefix("::") {
            return Ok(Pattern::Absolute(rest.to_string()));
        }
        if raw.contains("::") {
            let components = raw.split("::").map(str::to_string).collect();
            return Ok(Pattern::QualifiedSuffix(components));
        }
        if raw.chars().any(|c| REGEX_METACHARACTERS.contains(&c)) {
            let anchored = format!("^(?:{raw})$");
            let re = regex::Regex::new(&anchored)
                .map_err(|e| crate::error::EngineError::ConstraintViolation {
                    message: format!("invalid query pattern regex: {e}"),
                })?;
            return Ok(Pattern::Regex(re));
        }
        Ok(Pattern::UnqualifiedExact(raw.to_string()))
    }

    pub fn matches(&self, symbol: &Symbol) -> bool {
        match self {
            Pattern::Absolute(expected) => symbol.qualified_name == *expected,
            Pattern::QualifiedSuffix(components) => {
                let candidate: Vec<&str> = symbol.qualified_name.split("::").collect();
                if components.len() > candidate.len() {
                    return false;
                }
                let tail = &candidate[candidate.len() - components.len()..];
                tail.iter().zip(components.iter()).all(|(a, b)| *a == b)
            }
            Pattern::Regex(re) => re.is_match(&symbol.name),
            Pattern::UnqualifiedExact(expected) => symbol.name == *expected,
        }
    }
}

/// Filters shared by the class/function/symbol search family.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub project_only: bool,
    pub file_name: Option<String>,
    pub class_name: Option<String>,
}

impl SearchFilters {
    pub fn project_only_default() -> Self {
        Self {
            project_only: true,
            ..Default::default()
        }
    }
}

fn all_symbols(store: &Store) -> Result<Vec<Symbol>> {
    let mut out = Vec::new();
    for kind in [
        SymbolKind::Class,
        SymbolKind::Struct,
        SymbolKind::Function,
        SymbolKind::Method,
        SymbolKind::ClassTemplate,
        SymbolKind::FunctionTemplate,
        SymbolKind::PartialSpecialization,
        SymbolKind::FullSpecialization,
        SymbolKind::Field,
        SymbolKind::Typedef,
        SymbolKind::Variable,
        SymbolKind::Enum,
        SymbolKind::Enumerator,
        SymbolKind::NamespaceAlias,
        SymbolKind::Other,
    ] {
        out.extend(store.symbols_by_kind(kind)?);
    }
    Ok(out)
}

fn apply_filters(symbols: Vec<Symbol>, filters: &SearchFilters) -> Vec<Symbol> {
    symbols
        .into_iter()
        .filter(|s| !filters.project_only || s.is_project)
        .filter(|s| {
            filters
                .file_name
                .as_ref()
                .map(|suffix| s.file.ends_with(suffix.as_str()))
                .unwrap_or(true)
        })
        .filter(|s| {
            filters
                .class_name
                .as_ref()
                .map(|name| s.parent_class.as_deref() == Some(name.as_str()))
                .unwrap_or(true)
        })
        .collect()
}

/// `search_classes(pattern, project_only?, file_name?)`.
pub fn search_classes(store: &Store, pattern: &str, filters: &SearchFilters) -> Result<Vec<Symbol>> {
    let compiled = Pattern::compile(pattern)?;
    let symbols = all_symbols(store)?
        .into_iter()
        .filter(|s| s.kind.is_class_family())
        .filter(|s| compiled.matches(s))
        .collect();
    Ok(apply_filters(symbols, filters))
}

/// `search_functions(pattern, project_only?, class_name?, file_name?)`.
pub fn search_functions(
    store: &Store,
    pattern: &str,
    filters: &SearchFilters,
) -> Result<Vec<Symbol>> {
    let compiled = Pattern::compile(pattern)?;
    let symbols = all_symbols(store)?
        .into_iter()
        .filter(|s| s.kind.is_function_family())
        .filter(|s| compiled.matches(s))
        .collect();
    Ok(apply_filters(symbols, filters))
}

/// `search_symbols(pattern, kinds?, ...)`.
pub fn search_symbols(
    store: &Store,
    pattern: &str,
    kinds: Option<&[SymbolKind]>,
    filters: &SearchFilters,
) -> Result<Vec<Symbol>> {
    let compiled = Pattern::compile(pattern)?;
    let symbols = all_symbols(store)?
        .into_iter()
        .filter(|s| kinds.map(|ks| ks.contains(&s.kind)).unwrap_or(true))
        .filter(|s| compiled.matches(s))
        .collect();
    Ok(apply_filters(symbols, filters))
}

/// `find_in_file(file_path)`.
pub fn find_in_file(store: &Store, file_path: &str) -> Result<Vec<Symbol>> {
    store.symbols_by_file(file_path)
}

/// Class info bundle returned by `get_class_info`.
#[derive(Debug, Clone, Serialize)]
pub struct ClassInfo {
    pub class: Symbol,
    pub methods: Vec<Symbol>,
    pub fields: Vec<Symbol>,
    pub base_classes: Vec<String>,
}

/// `get_class_info(class_name)`.
pub fn get_class_info(store: &Store, class_name: &str) -> Result<Option<ClassInfo>> {
    let Some(class) = resolve_single_class(store, class_name)? else {
        return Ok(None);
    };
    let members = store.symbols_by_file(&class.file)?;
    let methods = members
        .iter()
        .filter(|s| s.kind == SymbolKind::Method && s.parent_class.as_deref() == Some(&class.name))
        .cloned()
        .collect();
    let fields = members
        .iter()
        .filter(|s| s.kind == SymbolKind::Field && s.parent_class.as_deref() == Some(&class.name))
        .cloned()
        .collect();
    Ok(Some(ClassInfo {
        base_classes: class.base_classes.clone(),
        methods,
        fields,
        class,
    }))
}

fn resolve_single_class(store: &Store, class_name: &str) -> Result<Option<Symbol>> {
    let pattern = Pattern::compile(class_name)?;
    let found = all_symbols(store)?
        .into_iter()
        .find(|s| s.kind.is_class_family() && pattern.matches(s));
    Ok(found)
}

/// One overload returned by `get_function_info`.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionOverload {
    pub symbol: Symbol,
    pub is_template_specialization: bool,
}

/// `get_function_info(function_name)`: all overloads, with overload count.
pub fn get_function_info(
    store: &Store,
    function_name: &str,
) -> Result<(Vec<FunctionOverload>, usize)> {
    let pattern = Pattern::compile(function_name)?;
    let overloads: Vec<FunctionOverload> = all_symbols(store)?
        .into_iter()
        .filter(|s| s.kind.is_function_family() && pattern.matches(s))
        .map(|s| {
            let is_template_specialization = matches!(
                s.template_kind,
                Some(crate::model::TemplateKind::PartialSpecialization)
                    | Some(crate::model::TemplateKind::FullSpecialization)
            );
            FunctionOverload {
                symbol: s,
                is_template_specialization,
            }
        })
        .collect();
    let total = overloads.len();
    Ok((overloads, total))
}

/// `get_derived_classes(class_name)`: every symbol whose `base_classes`
/// contains the resolved class's qualified name. Transitive resolution
/// through template parameters is not performed (§4.7).
pub fn get_derived_classes(store: &Store, class_name: &str) -> Result<Vec<Symbol>> {
    let Some(base) = resolve_single_class(store, class_name)? else {
        return Ok(Vec::new());
    };
    let derived = all_symbols(store)?
        .into_iter()
        .filter(|s| s.kind.is_class_family())
        .filter(|s| s.base_classes.iter().any(|b| b == &base.qualified_name))
        .collect();
    Ok(derived)
}

/// `get_base_classes(class_name)`: the stored list, each resolved to a
/// symbol when indexed.
pub fn get_base_classes(
    store: &Store,
    class_name: &str,
) -> Result<Vec<(String, Option<Symbol>)>> {
    let Some(class) = resolve_single_class(store, class_name)? else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(class.base_classes.len());
    for base_name in &class.base_classes {
        let resolved = store.symbol_by_qualified_name(base_name)?;
        out.push((base_name.clone(), resolved));
    }
    Ok(out)
}

/// `find_callers(function_name)`.
pub fn find_callers(store: &Store, function_name: &str) -> Result<Vec<CallSite>> {
    let Some(callee) = resolve_single_function(store, function_name)? else {
        return Ok(Vec::new());
    };
    store.call_sites_for_callee(&callee.usr)
}

/// `find_callees(function_name)`.
pub fn find_callees(store: &Store, function_name: &str) -> Result<Vec<CallSite>> {
    let Some(caller) = resolve_single_function(store, function_name)? else {
        return Ok(Vec::new());
    };
    store.call_sites_for_caller(&caller.usr)
}

/// `get_call_sites(function_name)`: raw CallSite rows for either endpoint.
pub fn get_call_sites(store: &Store, function_name: &str) -> Result<Vec<CallSite>> {
    let Some(symbol) = resolve_single_function(store, function_name)? else {
        return Ok(Vec::new());
    };
    let mut sites = store.call_sites_for_caller(&symbol.usr)?;
    sites.extend(store.call_sites_for_callee(&symbol.usr)?);
    Ok(sites)
}

fn resolve_single_function(store: &Store, function_name: &str) -> Result<Option<Symbol>> {
    let pattern = Pattern::compile(function_name)?;
    let found = all_symbols(store)?
        .into_iter()
        .find(|s| s.kind.is_function_family() && pattern.matches(s));
    Ok(found)
}

/// Outcome of `get_call_path`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallPathResult {
    pub path: Vec<String>,
    pub depth_exceeded: bool,
}

/// `get_call_path(from_function, to_function, max_depth)`: bounded BFS over
/// the directed call graph. Returns one shortest path or empty.
pub fn get_call_path(
    store: &Store,
    from_function: &str,
    to_function: &str,
    max_depth: usize,
) -> Result<CallPathResult> {
    let Some(from) = resolve_single_function(store, from_function)? else {
        return Ok(CallPathResult::default());
    };
    let Some(to) = resolve_single_function(store, to_function)? else {
        return Ok(CallPathResult::default());
    };

    if from.usr == to.usr {
        return Ok(CallPathResult {
            path: vec![from.usr],
            depth_exceeded: false,
        });
    }

    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<Vec<String>> = VecDeque::new();
    queue.push_back(vec![from.usr.clone()]);
    visited.insert(from.usr.clone());

    while let Some(path) = queue.pop_front() {
        if path.len() > max_depth {
            return Ok(CallPathResult {
                path: Vec::new(),
                depth_exceeded: true,
            });
        }
        let current = path.last().unwrap().clone();
        let callees = store.call_sites_for_caller(&current)?;
        for call in callees {
            let Some(callee_usr) = call.callee_usr else {
                continue;
            };
            if callee_usr == to.usr {
                let mut full = path.clone();
                full.push(callee_usr);
                return Ok(CallPathResult {
                    path: full,
                    depth_exceeded: false,
                });
            }
            if visited.insert(callee_usr.clone()) {
                let mut next = path.clone();
                next.push(callee_usr);
                queue.push_back(next);
            }
        }
    }

    Ok(CallPathResult::default())
}

/// `get_files_containing_symbol(symbol_name)`: distinct `file` values
/// across symbols and call sites matching the qualified-name pattern.
pub fn get_files_containing_symbol(store: &Store, symbol_name: &str) -> Result<Vec<String>> {
    let pattern = Pattern::compile(symbol_name)?;
    let mut files: HashSet<String> = all_symbols(store)?
        .into_iter()
        .filter(|s| pattern.matches(s))
        .map(|s| s.file)
        .collect();

    if let Some(symbol) = resolve_matching_any(store, &pattern)? {
        for call in store.call_sites_for_caller(&symbol.usr)? {
            files.insert(call.file);
        }
        for call in store.call_sites_for_callee(&symbol.usr)? {
            files.insert(call.file);
        }
    }

    let mut out: Vec<String> = files.into_iter().collect();
    out.sort();
    Ok(out)
}

fn resolve_matching_any(store: &Store, pattern: &Pattern) -> Result<Option<Symbol>> {
    Ok(all_symbols(store)?.into_iter().find(|s| pattern.matches(s)))
}

/// Direction for `get_class_hierarchy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyDirection {
    Up,
    Down,
    Both,
}

/// `get_class_hierarchy(class_name, direction, max_depth)`: DFS with cycle
/// detection.
pub fn get_class_hierarchy(
    store: &Store,
    class_name: &str,
    direction: HierarchyDirection,
    max_depth: usize,
) -> Result<Vec<Symbol>> {
    let Some(root) = resolve_single_class(store, class_name)? else {
        return Ok(Vec::new());
    };

    let mut visited = HashSet::new();
    let mut out = Vec::new();
    visited.insert(root.usr.clone());

    if matches!(direction, HierarchyDirection::Up | HierarchyDirection::Both) {
        dfs_up(store, &root, max_depth, &mut visited, &mut out)?;
    }
    if matches!(direction, HierarchyDirection::Down | HierarchyDirection::Both) {
        dfs_down(store, &root, max_depth, &mut visited, &mut out)?;
    }

    Ok(out)
}

fn dfs_up(
    store: &Store,
    node: &Symbol,
    remaining_depth: usize,
    visited: &mut HashSet<String>,
    out: &mut Vec<Symbol>,
) -> Result<()> {
    if remaining_depth == 0 {
        return Ok(());
    }
    for base_name in &node.base_classes {
        let Some(base) = store.symbol_by_qualified_name(base_name)? else {
            continue;
        };
        if !visited.insert(base.usr.clone()) {
            continue;
        }
        out.push(base.clone());
        dfs_up(store, &base, remaining_depth - 1, visited, out)?;
    }
    Ok(())
}

fn dfs_down(
    store: &Store,
    node: &Symbol,
    remaining_depth: usize,
    visited: &mut HashSet<String>,
    out: &mut Vec<Symbol>,
) -> Result<()> {
    if remaining_depth == 0 {
        return Ok(());
    }
    let derived = get_derived_classes(store, &node.qualified_name)?;
    for child in derived {
        if !visited.insert(child.usr.clone()) {
            continue;
        }
        out.push(child.clone());
        dfs_down(store, &child, remaining_depth - 1, visited, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Access;

    fn sample(usr: &str, name: &str, qualified_name: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            usr: usr.into(),
            name: name.into(),
            qualified_name: qualified_name.into(),
            namespace: qualified_name
                .strip_suffix(name)
                .and_then(|p| p.strip_suffix("::"))
                .unwrap_or("")
                .to_string(),
            kind,
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
            is_template: false,
            template_kind: None,
            template_parameters: Vec::new(),
            primary_template_usr: None,
        }
    }

    #[test]
    fn absolute_pattern_requires_exact_qualified_name() {
        let pattern = Pattern::compile("::app::ui::View").unwrap();
        let matching = sample("u1", "View", "app::ui::View", SymbolKind::Class);
        let non_matching = sample("u2", "View", "myapp::ui::View", SymbolKind::Class);
        assert!(pattern.matches(&matching));
        assert!(!pattern.matches(&non_matching));
    }

    #[test]
    fn qualified_suffix_respects_component_boundaries() {
        let pattern = Pattern::compile("app::X").unwrap();
        let matching = sample("u1", "X", "ns::app::X", SymbolKind::Class);
        let non_matching = sample("u2", "X", "ns::myapp::X", SymbolKind::Class);
        assert!(pattern.matches(&matching));
        assert!(!pattern.matches(&non_matching));
    }

    #[test]
    fn regex_pattern_uses_fullmatch_semantics() {
        let pattern = Pattern::compile("Foo.*").unwrap();
        let matching = sample("u1", "FooBar", "FooBar", SymbolKind::Function);
        let non_matching = sample("u2", "XFooBar", "XFooBar", SymbolKind::Function);
        assert!(pattern.matches(&matching));
        assert!(!pattern.matches(&non_matching));
    }

    #[test]
    fn unqualified_exact_matches_name_only() {
        let pattern = Pattern::compile("foo").unwrap();
        let matching = sample("u1", "foo", "ns::foo", SymbolKind::Function);
        let non_matching = sample("u2", "foobar", "ns::foobar", SymbolKind::Function);
        assert!(pattern.matches(&matching));
        assert!(!pattern.matches(&non_matching));
    }

    #[test]
    fn derived_classes_found_by_qualified_base_name() {
        let mut store = Store::open_in_memory().unwrap();
        let mut base = sample("u1", "Base", "app::Base", SymbolKind::Class);
        base.file = "/proj/base.h".into();
        let mut derived = sample("u2", "Derived", "app::Derived", SymbolKind::Class);
        derived.base_classes = vec!["app::Base".to_string()];
        store.insert_symbols_batch(&[base, derived.clone()]).unwrap();

        let result = get_derived_classes(&store, "app::Base").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].usr, derived.usr);
    }

    #[test]
    fn call_path_finds_shortest_route() {
        let mut store = Store::open_in_memory().unwrap();
        let a = sample("a", "a", "a", SymbolKind::Function);
        let b = sample("b", "b", "b", SymbolKind::Function);
        let c = sample("c", "c", "c", SymbolKind::Function);
        store.insert_symbols_batch(&[a, b, c]).unwrap();
        store
            .save_call_sites_batch(&[
                CallSite {
                    caller_usr: "a".into(),
                    callee_usr: Some("b".into()),
                    callee_name: "b".into(),
                    file: "/proj/a.cpp".into(),
                    line: 1,
                    column: 1,
                    in_method_of: None,
                },
                CallSite {
                    caller_usr: "b".into(),
                    callee_usr: Some("c".into()),
                    callee_name: "c".into(),
                    file: "/proj/a.cpp".into(),
                    line: 2,
                    column: 1,
                    in_method_of: None,
                },
            ])
            .unwrap();

        let result = get_call_path(&store, "a", "c", 10).unwrap();
        assert_eq!(result.path, vec!["a", "b", "c"]);
        assert!(!result.depth_exceeded);
    }

    #[test]
    fn call_path_reports_depth_exceeded() {
        let mut store = Store::open_in_memory().unwrap();
        let a = sample("a", "a", "a", SymbolKind::Function);
        let b = sample("b", "b", "b", SymbolKind::Function);
        store.insert_symbols_batch(&[a, b]).unwrap();
        store
            .save_call_sites_batch(&[CallSite {
                caller_usr: "a".into(),
                callee_usr: Some("b".into()),
                callee_name: "b".into(),
                file: "/proj/a.cpp".into(),
                line: 1,
                column: 1,
                in_method_of: None,
            }])
            .unwrap();

        let result = get_call_path(&store, "a", "nonexistent", 0).unwrap();
        assert!(result.path.is_empty());
    }
}
