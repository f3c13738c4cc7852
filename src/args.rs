//! Argument Sanitizer (§4.1): a pure transform from raw compile-database
//! arguments to arguments safe to hand to libclang.

use crate::error::{EngineError, Result};

/// A single sanitizer rule. Rules apply in declared order; the output
/// preserves the remaining tokens' relative order.
///
/// Serializes to the rule-kind names from the specification's rule table
/// (`remove_flag`, `remove_pair`, ...), so a project's `sanitizer_rules.json`
/// reads the same way the table does.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    /// Drop any token equal to (or, if `is_regex`, matching) `pattern`. If
    /// `takes_value` is set, also drop the token immediately following a
    /// match.
    RemoveFlag {
        pattern: String,
        is_regex: bool,
        takes_value: bool,
    },
    /// Drop a token with the given prefix and its immediate successor.
    RemovePair { prefix: String },
    /// Exact substitution of one token for another.
    Replace { from: String, to: String },
    /// Canonicalize the path argument following any of the listed flags
    /// (e.g. `-I`, `--sysroot`), whether passed as `-Ifoo` or `-I foo`.
    NormalizePath { flags: Vec<String> },
    /// Remove the compiler executable (position 0), `-o <file>`, `-c`, and
    /// any bare input-file arguments (heuristically: tokens not starting
    /// with `-` that end in a known source extension).
    DropSourceAndOutput,
}

const SOURCE_EXTENSIONS: &[&str] = &[
    ".c", ".cc", ".cpp", ".cxx", ".c++", ".h", ".hh", ".hpp", ".hxx", ".h++",
];

fn looks_like_source_file(token: &str) -> bool {
    SOURCE_EXTENSIONS
        .iter()
        .any(|ext| token.to_ascii_lowercase().ends_with(ext))
}

/// Validate a rule set before use. Rules are malformed if they would be
/// vacuous or self-contradictory (e.g. an empty pattern/prefix, or a regex
/// rule whose pattern doesn't compile).
pub fn validate_rules(rules: &[Rule]) -> Result<()> {
    for rule in rules {
        match rule {
            Rule::RemoveFlag {
                pattern, is_regex, ..
            } => {
                if pattern.is_empty() {
                    return Err(EngineError::InvalidRuleSet {
                        message: "remove_flag pattern must not be empty".into(),
                    });
                }
                if *is_regex {
                    regex::Regex::new(pattern).map_err(|e| EngineError::InvalidRuleSet {
                        message: format!("invalid regex in remove_flag: {e}"),
                    })?;
                }
            }
            Rule::RemovePair { prefix } => {
                if prefix.is_empty() {
                    return Err(EngineError::InvalidRuleSet {
                        message: "remove_pair prefix must not be empty".into(),
                    });
                }
            }
            Rule::Replace { from, .. } => {
                if from.is_empty() {
                    return Err(EngineError::InvalidRuleSet {
                        message: "replace rule's `from` must not be empty".into(),
                    });
                }
            }
            Rule::NormalizePath { flags } => {
                if flags.is_empty() {
                    return Err(EngineError::InvalidRuleSet {
                        message: "normalize_path requires at least one flag name".into(),
                    });
                }
            }
            Rule::DropSourceAndOutput => {}
        }
    }
    Ok(())
}

/// Apply `rules` in order to `args`, producing a sanitized argument vector.
///
/// Never fails on input tokens it doesn't recognize; only fails when the
/// rule set itself is malformed.
pub fn sanitize(args: &[String], rules: &[Rule]) -> Result<Vec<String>> {
    validate_rules(rules)?;
    let mut tokens = args.to_vec();
    for rule in rules {
        tokens = apply_rule(&tokens, rule);
    }
    Ok(tokens)
}

fn apply_rule(tokens: &[String], rule: &Rule) -> Vec<String> {
    match rule {
        Rule::RemoveFlag {
            pattern,
            is_regex,
            takes_value,
        } => {
            let matches = |t: &str| -> bool {
                if *is_regex {
                    regex::Regex::new(pattern)
                        .map(|re| re.is_match(t))
                        .unwrap_or(false)
                } else {
                    t == pattern
                }
            };
            let mut out = Vec::with_capacity(tokens.len());
            let mut skip_next = false;
            for t in tokens {
                if skip_next {
                    skip_next = false;
                    continue;
                }
                if matches(t) {
                    if *takes_value {
                        skip_next = true;
                    }
                    continue;
                }
                out.push(t.clone());
            }
            out
        }
        Rule::RemovePair { prefix } => {
            let mut out = Vec::with_capacity(tokens.len());
            let mut skip_next = false;
            for t in tokens {
                if skip_next {
                    skip_next = false;
                    continue;
                }
                if t.starts_with(prefix.as_str()) {
                    skip_next = true;
                    continue;
                }
                out.push(t.clone());
            }
            out
        }
        Rule::Replace { from, to } => tokens
            .iter()
            .map(|t| if t == from { to.clone() } else { t.clone() })
            .collect(),
        Rule::NormalizePath { flags } => {
            let mut out = Vec::with_capacity(tokens.len());
            let mut i = 0;
            while i < tokens.len() {
                let t = &tokens[i];
                let mut handled = false;
                for flag in flags {
                    if t == flag && i + 1 < tokens.len() {
                        out.push(t.clone());
                        out.push(normalize_path_str(&tokens[i + 1]));
                        i += 2;
                        handled = true;
                        break;
                    }
                    if let Some(rest) = t.strip_prefix(flag.as_str()) {
                        if !rest.is_empty() {
                            out.push(format!("{flag}{}", normalize_path_str(rest)));
                            i += 1;
                            handled = true;
                            break;
                        }
                    }
                }
                if !handled {
                    out.push(t.clone());
                    i += 1;
                }
            }
            out
        }
        Rule::DropSourceAndOutput => {
            let mut out = Vec::with_capacity(tokens.len());
            let mut skip_next = false;
            for (i, t) in tokens.iter().enumerate() {
                if skip_next {
                    skip_next = false;
                    continue;
                }
                if i == 0 {
                    // Compiler executable.
                    continue;
                }
                if t == "-o" {
                    skip_next = true;
                    continue;
                }
                if t == "-c" {
                    continue;
                }
                if !t.starts_with('-') && looks_like_source_file(t) {
                    continue;
                }
                out.push(t.clone());
            }
            out
        }
    }
}

/// Parse and validate a project's `sanitizer_rules.json` contents. An empty
/// or absent rule set is represented by the caller passing `"[]"` (or simply
/// not calling this at all and using `Vec::new()`).
pub fn load_rules(json: &str) -> Result<Vec<Rule>> {
    let rules: Vec<Rule> = serde_json::from_str(json).map_err(|e| EngineError::InvalidRuleSet {
        message: format!("malformed sanitizer_rules.json: {e}"),
    })?;
    validate_rules(&rules)?;
    Ok(rules)
}

fn normalize_path_str(p: &str) -> String {
    let path = std::path::Path::new(p);
    path.canonicalize()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &[&str]) -> Vec<String> {
        s.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn remove_flag_exact_value_taking() {
        let args = toks(&["clang++", "-Wall", "-isystem", "/usr/include", "a.cpp"]);
        let rules = vec![Rule::RemoveFlag {
            pattern: "-isystem".into(),
            is_regex: false,
            takes_value: true,
        }];
        let out = sanitize(&args, &rules).unwrap();
        assert_eq!(out, toks(&["clang++", "-Wall", "a.cpp"]));
    }

    #[test]
    fn remove_pair_by_prefix() {
        let args = toks(&["clang++", "--target=x86_64", "-Dfoo=1", "a.cpp"]);
        let rules = vec![Rule::RemovePair {
            prefix: "--target".into(),
        }];
        let out = sanitize(&args, &rules).unwrap();
        assert_eq!(out, toks(&["clang++", "-Dfoo=1", "a.cpp"]));
    }

    #[test]
    fn replace_exact_token() {
        let args = toks(&["clang++", "-std=c++14", "a.cpp"]);
        let rules = vec![Rule::Replace {
            from: "-std=c++14".into(),
            to: "-std=c++17".into(),
        }];
        let out = sanitize(&args, &rules).unwrap();
        assert_eq!(out, toks(&["clang++", "-std=c++17", "a.cpp"]));
    }

    #[test]
    fn drop_source_and_output_removes_exe_o_c_and_inputs() {
        let args = toks(&["clang++", "-c", "a.cpp", "-o", "a.o", "-Wall"]);
        let rules = vec![Rule::DropSourceAndOutput];
        let out = sanitize(&args, &rules).unwrap();
        assert_eq!(out, toks(&["-Wall"]));
    }

    #[test]
    fn rules_apply_in_declared_order() {
        let args = toks(&["clang++", "-DX=1", "-DX=1"]);
        // Replace first, then remove_flag should drop both resulting tokens.
        let rules = vec![
            Rule::Replace {
                from: "-DX=1".into(),
                to: "-DY=2".into(),
            },
            Rule::RemoveFlag {
                pattern: "-DY=2".into(),
                is_regex: false,
                takes_value: false,
            },
        ];
        let out = sanitize(&args, &rules).unwrap();
        assert_eq!(out, toks(&["clang++"]));
    }

    #[test]
    fn invalid_rule_set_is_rejected() {
        let rules = vec![Rule::RemoveFlag {
            pattern: String::new(),
            is_regex: false,
            takes_value: false,
        }];
        let err = sanitize(&[], &rules).unwrap_err();
        assert_eq!(err.kind(), "InvalidRuleSet");
    }

    #[test]
    fn unrecognized_tokens_never_cause_failure() {
        let args = toks(&["clang++", "--some-unknown-flag=weird"]);
        let out = sanitize(&args, &[]).unwrap();
        assert_eq!(out, args);
    }

    #[test]
    fn load_rules_parses_kind_tagged_json() {
        let json = r#"[
            {"kind": "remove_flag", "pattern": "-Werror", "is_regex": false, "takes_value": false},
            {"kind": "drop_source_and_output"}
        ]"#;
        let rules = load_rules(json).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[1], Rule::DropSourceAndOutput);
    }

    #[test]
    fn load_rules_rejects_malformed_json() {
        let err = load_rules("not json").unwrap_err();
        assert_eq!(err.kind(), "InvalidRuleSet");
    }
}
