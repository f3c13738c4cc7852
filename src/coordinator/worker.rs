//! Extractor worker main loop (§4.4, §5): runs inside a child process
//! spawned by the coordinator, re-invoking this same binary with the hidden
//! `extractor-worker` subcommand. Reads `CoordinatorMessage`s as
//! newline-delimited JSON from stdin, writes `WorkerMessage`s the same way
//! to stdout.
//!
//! Holds one persistent `Extractor` for the worker's entire lifetime —
//! per-file construction is prohibited by §4.4.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Mutex;

use crate::coordinator::protocol::{ClaimResult, CoordinatorMessage, WorkerMessage};
use crate::extractor::Extractor;
use crate::header_tracker::{ClaimOutcome, HeaderClaims};
use crate::model::{FileMetadata, HeaderDependency, ParseError, ParseErrorKind};

/// Proxies `HeaderClaims` calls over stdout/stdin to the coordinator's
/// real, process-wide `HeaderTracker`. Each call blocks on a synchronous
/// round trip, since the worker cannot proceed past a header's cursors
/// until ownership is resolved.
struct IpcHeaderClaims<'a> {
    stdin: Mutex<&'a mut dyn BufRead>,
    stdout: Mutex<&'a mut dyn Write>,
}

impl<'a> HeaderClaims for IpcHeaderClaims<'a> {
    fn try_claim(&self, header: &Path, content_hash: &str, bdb_hash: &str) -> ClaimOutcome {
        let request = WorkerMessage::ClaimHeader {
            header_path: header.display().to_string(),
            content_hash: content_hash.to_string(),
            build_database_version_hash: bdb_hash.to_string(),
        };
        if send(&self.stdout, &request).is_err() {
            return ClaimOutcome::InProgress;
        }
        match recv_coordinator(&self.stdin) {
            Some(CoordinatorMessage::ClaimHeaderResult { outcome }) => match outcome {
                ClaimResult::Claimed => ClaimOutcome::Claimed,
                ClaimResult::InProgress => ClaimOutcome::InProgress,
                ClaimResult::AlreadyDone => ClaimOutcome::AlreadyDone,
            },
            _ => ClaimOutcome::InProgress,
        }
    }

    fn mark_completed(&self, header: &Path, content_hash: &str, bdb_hash: &str, _at: i64) {
        let notice = WorkerMessage::HeaderCompleted {
            header_path: header.display().to_string(),
            content_hash: content_hash.to_string(),
            build_database_version_hash: bdb_hash.to_string(),
        };
        let _ = send(&self.stdout, &notice);
    }
}

fn send(stdout: &Mutex<&mut dyn Write>, message: &WorkerMessage) -> std::io::Result<()> {
    let mut out = stdout.lock().unwrap();
    let json = serde_json::to_string(message)?;
    writeln!(out, "{json}")?;
    out.flush()
}

fn recv_coordinator(stdin: &Mutex<&mut dyn BufRead>) -> Option<CoordinatorMessage> {
    let mut line = String::new();
    let mut input = stdin.lock().unwrap();
    let read = input.read_line(&mut line).ok()?;
    if read == 0 {
        return None;
    }
    serde_json::from_str(line.trim_end()).ok()
}

/// Entry point invoked from `main` when launched as the hidden
/// `extractor-worker` subcommand.
pub fn run() -> crate::error::Result<()> {
    let extractor = Extractor::new()?;
    let stdin = std::io::stdin();
    let mut locked_stdin = stdin.lock();
    let stdout = std::io::stdout();
    let mut locked_stdout = stdout.lock();

    loop {
        let mut line = String::new();
        let bytes_read = locked_stdin.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }
        let Ok(message) = serde_json::from_str::<CoordinatorMessage>(line.trim_end()) else {
            continue;
        };

        match message {
            CoordinatorMessage::ExtractFile {
                path,
                project_root,
                arguments,
                build_database_version_hash,
            } => {
                handle_extract_file(
                    &extractor,
                    &path,
                    &project_root,
                    &arguments,
                    &build_database_version_hash,
                    &mut locked_stdin,
                    &mut locked_stdout,
                )?;
            }
            CoordinatorMessage::Shutdown => {
                let ack = WorkerMessage::ShutdownAck;
                let json = serde_json::to_string(&ack)?;
                writeln!(locked_stdout, "{json}")?;
                locked_stdout.flush()?;
                break;
            }
            CoordinatorMessage::ClaimHeaderResult { .. } => {
                // Only meaningful as a reply to our own ClaimHeader request,
                // consumed synchronously inside IpcHeaderClaims::try_claim.
            }
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn handle_extract_file(
    extractor: &Extractor,
    path: &str,
    project_root: &str,
    arguments: &[String],
    build_database_version_hash: &str,
    stdin: &mut impl BufRead,
    stdout: &mut (impl Write + 'static),
) -> crate::error::Result<()> {
    let source = Path::new(path);
    let project_root = Path::new(project_root);
    let content_hash = match std::fs::read(source) {
        Ok(bytes) => {
            use xxhash_rust::xxh3::xxh3_64;
            format!("{:016x}", xxh3_64(&bytes))
        }
        Err(e) => {
            let error = ParseError {
                file: path.to_string(),
                error_kind: ParseErrorKind::ParserCrash,
                message: format!("could not read source file: {e}"),
                stack_trace: None,
                content_hash: String::new(),
                compile_args_hash: String::new(),
                retry_count: 0,
                timestamp: now(),
            };
            let msg = WorkerMessage::TaskFailed {
                path: path.to_string(),
                error,
            };
            writeln!(stdout, "{}", serde_json::to_string(&msg)?)?;
            stdout.flush()?;
            return Ok(());
        }
    };

    let tracker = IpcHeaderClaims {
        stdin: Mutex::new(stdin as &mut dyn BufRead),
        stdout: Mutex::new(stdout as &mut dyn Write),
    };

    let outcome = extractor.extract(
        source,
        project_root,
        arguments,
        &content_hash,
        build_database_version_hash,
        &tracker,
    );

    let message = match outcome {
        Ok(result) => {
            let header_dependencies = result
                .headers_observed
                .iter()
                .map(|h| HeaderDependency {
                    source_file: path.to_string(),
                    header_path: h.display().to_string(),
                })
                .collect();
            WorkerMessage::TaskResult {
                path: path.to_string(),
                symbols: result.symbols.clone(),
                call_sites: result.call_sites,
                headers_observed: result
                    .headers_observed
                    .iter()
                    .map(|h| h.display().to_string())
                    .collect(),
                file_metadata: FileMetadata {
                    path: path.to_string(),
                    content_hash,
                    compile_args_hash: args_hash(arguments),
                    indexed_at: now(),
                    symbol_count: result.symbols.len() as u32,
                },
                header_dependencies,
                header_ownership: result.header_ownership,
            }
        }
        Err(error) => WorkerMessage::TaskFailed {
            path: path.to_string(),
            error,
        },
    };

    writeln!(stdout, "{}", serde_json::to_string(&message)?)?;
    stdout.flush()?;
    Ok(())
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
