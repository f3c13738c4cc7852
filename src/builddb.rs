//! Build-database reader (§4.2 / §6.1): loads `compile_commands.json` and
//! computes the version hash used to key the cache identity triple.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{EngineError, Result};

/// One entry of a JSON compilation database, prior to argument sanitization.
#[derive(Debug, Clone, Deserialize)]
struct RawCompileCommand {
    directory: String,
    file: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    output: Option<String>,
}

/// A normalized compile command: one source file plus the argv used to
/// compile it. `arguments` is tokenized (never a raw shell string) and
/// includes the compiler executable at index 0.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileCommand {
    pub directory: PathBuf,
    pub file: PathBuf,
    pub arguments: Vec<String>,
    pub output: Option<String>,
}

/// The full set of compile commands for a project, plus the version hash
/// used to detect build-database changes (§3.2).
#[derive(Debug, Clone)]
pub struct BuildDatabase {
    pub commands: Vec<CompileCommand>,
    pub version_hash: String,
}

impl BuildDatabase {
    /// Load and parse `compile_commands.json` at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EngineError::BuildDatabaseMissing {
                path: path.display().to_string(),
            });
        }
        let raw_text = std::fs::read_to_string(path)?;
        let entries: Vec<RawCompileCommand> = serde_json::from_str(&raw_text)?;

        let mut commands = Vec::with_capacity(entries.len());
        for entry in entries {
            let arguments = match (entry.arguments, entry.command) {
                (Some(args), _) => args,
                (None, Some(command)) => shell_words::split(&command).map_err(|e| {
                    EngineError::ConstraintViolation {
                        message: format!(
                            "could not tokenize compile command for {}: {e}",
                            entry.file
                        ),
                    }
                })?,
                (None, None) => {
                    return Err(EngineError::ConstraintViolation {
                        message: format!(
                            "compile database entry for {} has neither `command` nor `arguments`",
                            entry.file
                        ),
                    });
                }
            };

            commands.push(CompileCommand {
                directory: PathBuf::from(entry.directory),
                file: PathBuf::from(entry.file),
                arguments,
                output: entry.output,
            });
        }

        let version_hash = compute_version_hash(&raw_text);
        Ok(Self {
            commands,
            version_hash,
        })
    }

    /// Look up the compile command whose `file` matches `file` exactly.
    pub fn command_for(&self, file: &Path) -> Option<&CompileCommand> {
        self.commands.iter().find(|c| c.file == file)
    }
}

/// Hash of the raw build-database contents, used as the build-database
/// component of the cache identity triple (§3.2). Any byte-level change to
/// `compile_commands.json` — not just semantic changes — produces a new
/// hash, since even whitespace-only reformatting can indicate a generator
/// change worth re-keying against.
fn compute_version_hash(raw_text: &str) -> String {
    use xxhash_rust::xxh3::xxh3_64;
    format!("{:016x}", xxh3_64(raw_text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_compile_commands(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("compile_commands.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compile_commands.json");
        let err = BuildDatabase::load(&path).unwrap_err();
        assert_eq!(err.kind(), "BuildDatabaseMissing");
    }

    #[test]
    fn parses_command_string_via_shell_words() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[
            {
                "directory": "/proj/build",
                "command": "clang++ -DFOO=\"bar baz\" -c /proj/src/a.cpp -o a.o",
                "file": "/proj/src/a.cpp"
            }
        ]"#;
        let path = write_compile_commands(dir.path(), json);
        let db = BuildDatabase::load(&path).unwrap();
        assert_eq!(db.commands.len(), 1);
        let cmd = &db.commands[0];
        assert_eq!(cmd.arguments[0], "clang++");
        assert!(cmd.arguments.contains(&"bar baz".to_string()));
    }

    #[test]
    fn parses_arguments_array_directly() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[
            {
                "directory": "/proj/build",
                "arguments": ["clang++", "-Wall", "-c", "/proj/src/a.cpp"],
                "file": "/proj/src/a.cpp"
            }
        ]"#;
        let path = write_compile_commands(dir.path(), json);
        let db = BuildDatabase::load(&path).unwrap();
        assert_eq!(
            db.commands[0].arguments,
            vec!["clang++", "-Wall", "-c", "/proj/src/a.cpp"]
        );
    }

    #[test]
    fn version_hash_changes_with_content() {
        let dir = tempfile::tempdir().unwrap();
        let json_a = r#"[{"directory":"/proj","arguments":["clang++"],"file":"/proj/a.cpp"}]"#;
        let json_b = r#"[{"directory":"/proj","arguments":["clang++","-Wall"],"file":"/proj/a.cpp"}]"#;
        let path_a = write_compile_commands(dir.path(), json_a);
        let db_a = BuildDatabase::load(&path_a).unwrap();
        let path_b = write_compile_commands(dir.path(), json_b);
        let db_b = BuildDatabase::load(&path_b).unwrap();
        assert_ne!(db_a.version_hash, db_b.version_hash);
    }

    #[test]
    fn entry_missing_both_command_forms_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[{"directory":"/proj","file":"/proj/a.cpp"}]"#;
        let path = write_compile_commands(dir.path(), json);
        let err = BuildDatabase::load(&path).unwrap_err();
        assert_eq!(err.kind(), "ConstraintViolation");
    }

    #[test]
    fn command_for_finds_matching_file() {
        let dir = tempfile::tempdir().unwrap();
        let json = r#"[
            {"directory":"/proj","arguments":["clang++"],"file":"/proj/a.cpp"},
            {"directory":"/proj","arguments":["clang++"],"file":"/proj/b.cpp"}
        ]"#;
        let path = write_compile_commands(dir.path(), json);
        let db = BuildDatabase::load(&path).unwrap();
        assert!(db.command_for(Path::new("/proj/b.cpp")).is_some());
        assert!(db.command_for(Path::new("/proj/missing.cpp")).is_none());
    }
}
