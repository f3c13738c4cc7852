//! CRUD and query operations over the Persistent Store's schema (§4.2).

use rusqlite::{params, OptionalExtension};

use crate::error::{EngineError, Result};
use crate::model::{
    Access, CallSite, FileMetadata, HeaderDependency, HeaderOwnership, ParseError,
    ParseErrorKind, Symbol, SymbolKind, TemplateKind, TemplateParameter,
};

use super::Store;

fn kind_to_str(kind: SymbolKind) -> &'static str {
    match kind {
        SymbolKind::Class => "class",
        SymbolKind::Struct => "struct",
        SymbolKind::Function => "function",
        SymbolKind::Method => "method",
        SymbolKind::ClassTemplate => "class_template",
        SymbolKind::FunctionTemplate => "function_template",
        SymbolKind::PartialSpecialization => "partial_specialization",
        SymbolKind::FullSpecialization => "full_specialization",
        SymbolKind::Field => "field",
        SymbolKind::Typedef => "typedef",
        SymbolKind::Variable => "variable",
        SymbolKind::Enum => "enum",
        SymbolKind::Enumerator => "enumerator",
        SymbolKind::NamespaceAlias => "namespace_alias",
        SymbolKind::Other => "other",
    }
}

fn kind_from_str(s: &str) -> SymbolKind {
    match s {
        "class" => SymbolKind::Class,
        "struct" => SymbolKind::Struct,
        "function" => SymbolKind::Function,
        "method" => SymbolKind::Method,
        "class_template" => SymbolKind::ClassTemplate,
        "function_template" => SymbolKind::FunctionTemplate,
        "partial_specialization" => SymbolKind::PartialSpecialization,
        "full_specialization" => SymbolKind::FullSpecialization,
        "field" => SymbolKind::Field,
        "typedef" => SymbolKind::Typedef,
        "variable" => SymbolKind::Variable,
        "enum" => SymbolKind::Enum,
        "enumerator" => SymbolKind::Enumerator,
        "namespace_alias" => SymbolKind::NamespaceAlias,
        _ => SymbolKind::Other,
    }
}

fn access_to_str(access: Access) -> &'static str {
    match access {
        Access::Public => "public",
        Access::Protected => "protected",
        Access::Private => "private",
    }
}

fn access_from_str(s: &str) -> Access {
    match s {
        "protected" => Access::Protected,
        "private" => Access::Private,
        _ => Access::Public,
    }
}

fn template_kind_to_str(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::ClassTemplate => "class_template",
        TemplateKind::FunctionTemplate => "function_template",
        TemplateKind::PartialSpecialization => "partial_specialization",
        TemplateKind::FullSpecialization => "full_specialization",
    }
}

fn template_kind_from_str(s: &str) -> TemplateKind {
    match s {
        "function_template" => TemplateKind::FunctionTemplate,
        "partial_specialization" => TemplateKind::PartialSpecialization,
        "full_specialization" => TemplateKind::FullSpecialization,
        _ => TemplateKind::ClassTemplate,
    }
}

fn symbol_from_row(row: &rusqlite::Row) -> rusqlite::Result<Symbol> {
    let base_classes_json: String = row.get("base_classes")?;
    let template_params_json: String = row.get("template_parameters")?;
    let kind_str: String = row.get("kind")?;
    let access_str: String = row.get("access")?;
    let template_kind_str: Option<String> = row.get("template_kind")?;

    Ok(Symbol {
        usr: row.get("usr")?,
        name: row.get("name")?,
        qualified_name: row.get("qualified_name")?,
        namespace: row.get("namespace")?,
        kind: kind_from_str(&kind_str),
        file: row.get("file")?,
        line: row.get("line")?,
        column: row.get("column")?,
        signature: row.get("signature")?,
        is_project: row.get::<_, i64>("is_project")? != 0,
        access: access_from_str(&access_str),
        parent_class: row.get("parent_class")?,
        base_classes: serde_json::from_str(&base_classes_json).unwrap_or_default(),
        brief: row.get("brief")?,
        doc_comment: row.get("doc_comment")?,
        is_template: row.get::<_, i64>("is_template")? != 0,
        template_kind: template_kind_str.as_deref().map(template_kind_from_str),
        template_parameters: serde_json::from_str(&template_params_json).unwrap_or_default(),
        primary_template_usr: row.get("primary_template_usr")?,
    })
}

impl Store {
    /// Atomic upsert by `usr`, retried with backoff up to 3 attempts on
    /// lock contention (§4.2).
    pub fn insert_symbols_batch(&mut self, symbols: &[Symbol]) -> Result<()> {
        retry_on_busy(3, || {
            let tx = self.conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO symbols (
                        usr, name, qualified_name, namespace, kind, file, line, column,
                        signature, is_project, access, parent_class, base_classes, brief,
                        doc_comment, is_template, template_kind, template_parameters,
                        primary_template_usr
                    ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19)
                    ON CONFLICT(usr) DO UPDATE SET
                        name=excluded.name, qualified_name=excluded.qualified_name,
                        namespace=excluded.namespace, kind=excluded.kind, file=excluded.file,
                        line=excluded.line, column=excluded.column, signature=excluded.signature,
                        is_project=excluded.is_project, access=excluded.access,
                        parent_class=excluded.parent_class, base_classes=excluded.base_classes,
                        brief=excluded.brief, doc_comment=excluded.doc_comment,
                        is_template=excluded.is_template, template_kind=excluded.template_kind,
                        template_parameters=excluded.template_parameters,
                        primary_template_usr=excluded.primary_template_usr",
                )?;
                for sym in symbols {
                    let base_classes_json = serde_json::to_string(&sym.base_classes)?;
                    let template_params_json = serde_json::to_string(&sym.template_parameters)?;
                    stmt.execute(params![
                        sym.usr,
                        sym.name,
                        sym.qualified_name,
                        sym.namespace,
                        kind_to_str(sym.kind),
                        sym.file,
                        sym.line,
                        sym.column,
                        sym.signature,
                        sym.is_project as i64,
                        access_to_str(sym.access),
                        sym.parent_class,
                        base_classes_json,
                        sym.brief,
                        sym.doc_comment,
                        sym.is_template as i64,
                        sym.template_kind.map(template_kind_to_str),
                        template_params_json,
                        sym.primary_template_usr,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Remove all symbols and call sites whose `file` equals `path`.
    pub fn delete_symbols_for_file(&mut self, path: &str) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM symbols WHERE file = ?1", params![path])?;
        tx.execute("DELETE FROM call_sites WHERE file = ?1", params![path])?;
        tx.execute(
            "DELETE FROM header_dependencies WHERE source_file = ?1",
            params![path],
        )?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        tx.commit()?;
        Ok(())
    }

    /// Atomic upsert of call sites by their natural key.
    pub fn save_call_sites_batch(&mut self, sites: &[CallSite]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO call_sites (
                    caller_usr, callee_usr, callee_name, file, line, column, in_method_of
                ) VALUES (?1,?2,?3,?4,?5,?6,?7)
                ON CONFLICT(caller_usr, callee_usr, callee_name, file, line, column)
                DO UPDATE SET in_method_of = excluded.in_method_of",
            )?;
            for site in sites {
                stmt.execute(params![
                    site.caller_usr,
                    site.callee_usr,
                    site.callee_name,
                    site.file,
                    site.line,
                    site.column,
                    site.in_method_of,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_file_metadata(&mut self, meta: &FileMetadata) -> Result<()> {
        self.conn.execute(
            "INSERT INTO files (path, content_hash, compile_args_hash, indexed_at, symbol_count)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(path) DO UPDATE SET
                content_hash=excluded.content_hash,
                compile_args_hash=excluded.compile_args_hash,
                indexed_at=excluded.indexed_at,
                symbol_count=excluded.symbol_count",
            params![
                meta.path,
                meta.content_hash,
                meta.compile_args_hash,
                meta.indexed_at,
                meta.symbol_count,
            ],
        )?;
        Ok(())
    }

    pub fn all_file_paths(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT path FROM files")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn file_metadata(&self, path: &str) -> Result<Option<FileMetadata>> {
        self.conn
            .query_row(
                "SELECT path, content_hash, compile_args_hash, indexed_at, symbol_count
                 FROM files WHERE path = ?1",
                params![path],
                |row| {
                    Ok(FileMetadata {
                        path: row.get(0)?,
                        content_hash: row.get(1)?,
                        compile_args_hash: row.get(2)?,
                        indexed_at: row.get(3)?,
                        symbol_count: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(EngineError::from)
    }

    pub fn upsert_header_ownership(&mut self, ownership: &HeaderOwnership) -> Result<()> {
        self.conn.execute(
            "INSERT INTO header_ownership (
                header_path, content_hash, build_database_version_hash, processed_at
            ) VALUES (?1,?2,?3,?4)
            ON CONFLICT(header_path, build_database_version_hash) DO UPDATE SET
                content_hash=excluded.content_hash, processed_at=excluded.processed_at",
            params![
                ownership.header_path,
                ownership.content_hash,
                ownership.build_database_version_hash,
                ownership.processed_at,
            ],
        )?;
        Ok(())
    }

    /// Every recorded header-ownership row, used by the engine to detect
    /// headers whose on-disk content has drifted from what was last
    /// extracted (§4.6 step 2).
    pub fn all_header_ownership(&self) -> Result<Vec<HeaderOwnership>> {
        let mut stmt = self.conn.prepare(
            "SELECT header_path, content_hash, build_database_version_hash, processed_at
             FROM header_ownership",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(HeaderOwnership {
                    header_path: row.get(0)?,
                    content_hash: row.get(1)?,
                    build_database_version_hash: row.get(2)?,
                    processed_at: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Drop every header-ownership row. Called when the build-database
    /// version hash changes, since ownership is only valid for the version
    /// it was claimed under (§3.2).
    pub fn clear_header_ownership(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM header_ownership", [])?;
        Ok(())
    }

    pub fn insert_header_dependency(&mut self, dep: &HeaderDependency) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO header_dependencies (source_file, header_path)
             VALUES (?1, ?2)",
            params![dep.source_file, dep.header_path],
        )?;
        Ok(())
    }

    /// Reverse dependency lookup: every source file that (transitively
    /// through this direct edge) depends on `header_path`, used to seed the
    /// impact set for incremental refresh (§4.6).
    pub fn sources_depending_on(&self, header_path: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_file FROM header_dependencies WHERE header_path = ?1",
        )?;
        let rows = stmt
            .query_map(params![header_path], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn record_parse_error(&mut self, error: &ParseError) -> Result<()> {
        let kind_str = match error.error_kind {
            ParseErrorKind::ParserDiagnosticFatal => "parser_diagnostic_fatal",
            ParseErrorKind::ParserCrash => "parser_crash",
            ParseErrorKind::ParserMissingHeader => "parser_missing_header",
        };
        self.conn.execute(
            "INSERT INTO parse_errors (
                file, error_kind, message, stack_trace, content_hash, compile_args_hash,
                retry_count, timestamp
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
            ON CONFLICT(file) DO UPDATE SET
                error_kind=excluded.error_kind, message=excluded.message,
                stack_trace=excluded.stack_trace, content_hash=excluded.content_hash,
                compile_args_hash=excluded.compile_args_hash, retry_count=excluded.retry_count,
                timestamp=excluded.timestamp",
            params![
                error.file,
                kind_str,
                error.message,
                error.stack_trace,
                error.content_hash,
                error.compile_args_hash,
                error.retry_count,
                error.timestamp,
            ],
        )?;
        Ok(())
    }

    pub fn clear_parse_error(&mut self, file: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM parse_errors WHERE file = ?1", params![file])?;
        Ok(())
    }

    /// Full-text search over both `name` and `qualified_name`.
    pub fn search_fts(&self, pattern: &str) -> Result<Vec<Symbol>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.* FROM symbols s
             JOIN symbols_fts fts ON s.rowid = fts.rowid
             WHERE symbols_fts MATCH ?1
             ORDER BY rank",
        )?;
        let rows = stmt
            .query_map(params![pattern], symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Full scan with language-side regex fullmatch against `qualified_name`.
    pub fn search_regex(&self, pattern: &regex::Regex) -> Result<Vec<Symbol>> {
        let mut stmt = self.conn.prepare("SELECT * FROM symbols")?;
        let rows = stmt
            .query_map([], symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows
            .into_iter()
            .filter(|sym| pattern.is_match(&sym.qualified_name))
            .collect())
    }

    pub fn symbol_by_usr(&self, usr: &str) -> Result<Option<Symbol>> {
        self.conn
            .query_row("SELECT * FROM symbols WHERE usr = ?1", params![usr], symbol_from_row)
            .optional()
            .map_err(EngineError::from)
    }

    pub fn symbols_by_file(&self, file: &str) -> Result<Vec<Symbol>> {
        let mut stmt = self.conn.prepare("SELECT * FROM symbols WHERE file = ?1")?;
        let rows = stmt
            .query_map(params![file], symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn symbols_by_kind(&self, kind: SymbolKind) -> Result<Vec<Symbol>> {
        let mut stmt = self.conn.prepare("SELECT * FROM symbols WHERE kind = ?1")?;
        let rows = stmt
            .query_map(params![kind_to_str(kind)], symbol_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn symbol_by_qualified_name(&self, qualified_name: &str) -> Result<Option<Symbol>> {
        self.conn
            .query_row(
                "SELECT * FROM symbols WHERE qualified_name = ?1",
                params![qualified_name],
                symbol_from_row,
            )
            .optional()
            .map_err(EngineError::from)
    }

    pub fn call_sites_for_caller(&self, caller_usr: &str) -> Result<Vec<CallSite>> {
        let mut stmt = self.conn.prepare(
            "SELECT caller_usr, callee_usr, callee_name, file, line, column, in_method_of
             FROM call_sites WHERE caller_usr = ?1",
        )?;
        let rows = stmt
            .query_map(params![caller_usr], call_site_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn call_sites_for_callee(&self, callee_usr: &str) -> Result<Vec<CallSite>> {
        let mut stmt = self.conn.prepare(
            "SELECT caller_usr, callee_usr, callee_name, file, line, column, in_method_of
             FROM call_sites WHERE callee_usr = ?1",
        )?;
        let rows = stmt
            .query_map(params![callee_usr], call_site_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Run SQLite's own consistency check and classify any corruption found.
    pub fn integrity_check(&self) -> Result<IntegrityReport> {
        let mut stmt = self.conn.prepare("PRAGMA integrity_check")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let ok = rows.len() == 1 && rows[0] == "ok";
        Ok(IntegrityReport {
            ok,
            messages: rows,
        })
    }

    pub fn vacuum(&mut self) -> Result<()> {
        self.conn.execute_batch("VACUUM;")?;
        self.record_maintenance_timestamp()
    }

    pub fn analyze(&mut self) -> Result<()> {
        self.conn.execute_batch("ANALYZE;")?;
        self.record_maintenance_timestamp()
    }

    fn record_maintenance_timestamp(&mut self) -> Result<()> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.conn.execute(
            "INSERT INTO engine_meta (key, value) VALUES ('last_maintenance_timestamp', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![now.to_string()],
        )?;
        Ok(())
    }
}

fn call_site_from_row(row: &rusqlite::Row) -> rusqlite::Result<CallSite> {
    Ok(CallSite {
        caller_usr: row.get(0)?,
        callee_usr: row.get(1)?,
        callee_name: row.get(2)?,
        file: row.get(3)?,
        line: row.get(4)?,
        column: row.get(5)?,
        in_method_of: row.get(6)?,
    })
}

/// Result of `Store::integrity_check`.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub ok: bool,
    pub messages: Vec<String>,
}

/// Marker trait for the read-only accessor surface exposed to the query
/// engine, kept separate from the mutating batch operations above.
pub trait SymbolAccessor {
    fn symbol_by_usr(&self, usr: &str) -> Result<Option<Symbol>>;
}

impl SymbolAccessor for Store {
    fn symbol_by_usr(&self, usr: &str) -> Result<Option<Symbol>> {
        Store::symbol_by_usr(self, usr)
    }
}

/// Retry `f` up to `attempts` times, backing off briefly between tries,
/// surfacing `StoreBusy` if every attempt hits lock contention.
fn retry_on_busy<T>(attempts: u32, mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut last_err = None;
    for attempt in 0..attempts {
        match f() {
            Ok(v) => return Ok(v),
            Err(EngineError::Sqlite(rusqlite::Error::SqliteFailure(e, msg)))
                if e.code == rusqlite::ErrorCode::DatabaseBusy =>
            {
                last_err = Some(EngineError::Sqlite(rusqlite::Error::SqliteFailure(e, msg)));
                std::thread::sleep(std::time::Duration::from_millis(50 * (attempt as u64 + 1)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or(EngineError::StoreBusy { attempts }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    fn sample_symbol(usr: &str, name: &str, kind: SymbolKind) -> Symbol {
        Symbol {
            usr: usr.into(),
            name: name.into(),
            qualified_name: name.into(),
            namespace: String::new(),
            kind,
            file: "/proj/a.cpp".into(),
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
    fn insert_and_fetch_by_usr() {
        let mut store = Store::open_in_memory().unwrap();
        let sym = sample_symbol("c:@F@foo#", "foo", SymbolKind::Function);
        store.insert_symbols_batch(&[sym.clone()]).unwrap();
        let fetched = store.symbol_by_usr("c:@F@foo#").unwrap().unwrap();
        assert_eq!(fetched.name, "foo");
    }

    #[test]
    fn upsert_replaces_existing_row() {
        let mut store = Store::open_in_memory().unwrap();
        let mut sym = sample_symbol("c:@F@foo#", "foo", SymbolKind::Function);
        store.insert_symbols_batch(&[sym.clone()]).unwrap();
        sym.line = 42;
        store.insert_symbols_batch(&[sym]).unwrap();
        let fetched = store.symbol_by_usr("c:@F@foo#").unwrap().unwrap();
        assert_eq!(fetched.line, 42);
    }

    #[test]
    fn delete_symbols_for_file_removes_related_rows() {
        let mut store = Store::open_in_memory().unwrap();
        let sym = sample_symbol("c:@F@foo#", "foo", SymbolKind::Function);
        store.insert_symbols_batch(&[sym]).unwrap();
        store
            .save_call_sites_batch(&[CallSite {
                caller_usr: "c:@F@foo#".into(),
                callee_usr: None,
                callee_name: "bar".into(),
                file: "/proj/a.cpp".into(),
                line: 2,
                column: 1,
                in_method_of: None,
            }])
            .unwrap();
        store.delete_symbols_for_file("/proj/a.cpp").unwrap();
        assert!(store.symbol_by_usr("c:@F@foo#").unwrap().is_none());
        assert!(store.call_sites_for_caller("c:@F@foo#").unwrap().is_empty());
    }

    #[test]
    fn fts_search_finds_by_name_and_qualified_name() {
        let mut store = Store::open_in_memory().unwrap();
        let mut sym = sample_symbol("c:@S@Widget#", "Widget", SymbolKind::Class);
        sym.qualified_name = "app::ui::Widget".into();
        sym.namespace = "app::ui".into();
        store.insert_symbols_batch(&[sym]).unwrap();
        let hits = store.search_fts("Widget").unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn regex_search_filters_by_qualified_name() {
        let mut store = Store::open_in_memory().unwrap();
        let mut sym = sample_symbol("c:@S@Widget#", "Widget", SymbolKind::Class);
        sym.qualified_name = "app::ui::Widget".into();
        store.insert_symbols_batch(&[sym]).unwrap();
        let re = regex::Regex::new(r"^app::ui::\w+$").unwrap();
        let hits = store.search_regex(&re).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn integrity_check_reports_ok_on_fresh_store() {
        let store = Store::open_in_memory().unwrap();
        let report = store.integrity_check().unwrap();
        assert!(report.ok);
    }

    #[test]
    fn header_ownership_roundtrips_and_clears() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .upsert_header_ownership(&HeaderOwnership {
                header_path: "/proj/widget.h".into(),
                content_hash: "h1".into(),
                build_database_version_hash: "bdb1".into(),
                processed_at: 100,
            })
            .unwrap();
        let rows = store.all_header_ownership().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content_hash, "h1");

        store.clear_header_ownership().unwrap();
        assert!(store.all_header_ownership().unwrap().is_empty());
    }

    #[test]
    fn header_dependency_reverse_lookup() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .insert_header_dependency(&HeaderDependency {
                source_file: "/proj/a.cpp".into(),
                header_path: "/proj/widget.h".into(),
            })
            .unwrap();
        store
            .insert_header_dependency(&HeaderDependency {
                source_file: "/proj/b.cpp".into(),
                header_path: "/proj/widget.h".into(),
            })
            .unwrap();
        let mut sources = store.sources_depending_on("/proj/widget.h").unwrap();
        sources.sort();
        assert_eq!(sources, vec!["/proj/a.cpp", "/proj/b.cpp"]);
    }
}
