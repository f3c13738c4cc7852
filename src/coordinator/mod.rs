//! Parallel Indexing Coordinator (§4.4): owns a pool of OS-process workers,
//! dispatches source files to them, and streams results into the Persistent
//! Store.
//!
//! Workers are full processes (re-invocations of this binary with the
//! hidden `extractor-worker` subcommand), not threads — parser and
//! database-connection
//! lifetimes are too expensive to pay per file, and per-file worker
//! construction is explicitly prohibited by the specification this engine
//! implements. One OS thread per worker process is used here purely to
//! multiplex blocking pipe I/O; it does not perform any parsing itself.

pub mod protocol;
pub mod worker;

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::builddb::CompileCommand;
use crate::error::Result;
use crate::header_tracker::HeaderTracker;
use crate::model::{
    CallSite, FileMetadata, HeaderDependency, HeaderOwnership, ParseError, ParseErrorKind, Symbol,
};
use crate::progress::ProgressRecord;
use crate::store::Store;

use protocol::{ClaimResult, CoordinatorMessage, WorkerMessage};

/// One file's extraction outcome, handed back to the caller so it can
/// apply the store-write sequence from §4.6 step 5.
pub enum TaskOutcome {
    Success {
        path: PathBuf,
        symbols: Vec<Symbol>,
        call_sites: Vec<CallSite>,
        file_metadata: FileMetadata,
        header_dependencies: Vec<HeaderDependency>,
        header_ownership: Vec<HeaderOwnership>,
    },
    Failure {
        path: PathBuf,
        error: ParseError,
    },
}

/// Cooperative cancellation flag shared between the engine and the
/// coordinator's worker threads (§4.4 "Cancellation").
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs `commands` through a pool of worker processes, invoking `on_result`
/// for each completed file as results arrive (so the caller can batch
/// writes to the store and update the progress record).
#[allow(clippy::too_many_arguments)]
pub fn run_pool(
    worker_binary: &std::path::Path,
    project_root: &Path,
    commands: Vec<CompileCommand>,
    pool_size: usize,
    build_database_version_hash: &str,
    header_tracker: Arc<HeaderTracker>,
    progress: Arc<ProgressRecord>,
    cancel: CancelToken,
    mut on_result: impl FnMut(TaskOutcome),
) -> Result<()> {
    let pool_size = pool_size.max(1);
    let queue = Arc::new(Mutex::new(VecDeque::from(commands)));
    let (results_tx, results_rx) = std::sync::mpsc::channel::<TaskOutcome>();

    let mut worker_threads = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        let queue = Arc::clone(&queue);
        let header_tracker = Arc::clone(&header_tracker);
        let cancel = cancel.clone();
        let results_tx = results_tx.clone();
        let worker_binary = worker_binary.to_path_buf();
        let project_root = project_root.to_path_buf();
        let bdb_hash = build_database_version_hash.to_string();

        worker_threads.push(std::thread::spawn(move || {
            run_worker_thread(
                &worker_binary,
                &project_root,
                &queue,
                &header_tracker,
                &bdb_hash,
                &cancel,
                &results_tx,
            )
        }));
    }
    drop(results_tx);

    for outcome in results_rx {
        progress.record_completed_file();
        on_result(outcome);
    }

    for handle in worker_threads {
        let _ = handle.join();
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_worker_thread(
    worker_binary: &std::path::Path,
    project_root: &Path,
    queue: &Mutex<VecDeque<CompileCommand>>,
    header_tracker: &HeaderTracker,
    build_database_version_hash: &str,
    cancel: &CancelToken,
    results_tx: &std::sync::mpsc::Sender<TaskOutcome>,
) {
    let Ok(mut child) = spawn_worker(worker_binary) else {
        return;
    };
    let mut stdin = child.stdin.take().expect("piped stdin");
    let stdout = child.stdout.take().expect("piped stdout");
    let mut reader = BufReader::new(stdout);

    loop {
        if cancel.is_cancelled() {
            break;
        }
        let command = {
            let mut q = queue.lock().unwrap();
            q.pop_front()
        };
        let Some(command) = command else { break };

        let message =
            protocol::extract_file_message(&command, project_root, build_database_version_hash);
        if send_to_worker(&mut stdin, &message).is_err() {
            let _ = results_tx.send(TaskOutcome::Failure {
                path: command.file.clone(),
                error: crash_error(&command.file),
            });
            let _ = child.kill();
            let Ok(mut new_child) = spawn_worker(worker_binary) else {
                break;
            };
            stdin = new_child.stdin.take().expect("piped stdin");
            reader = BufReader::new(new_child.stdout.take().expect("piped stdout"));
            child = new_child;
            continue;
        }

        match pump_until_task_done(&mut reader, &mut stdin, header_tracker) {
            Some(outcome) => {
                let _ = results_tx.send(outcome);
            }
            None => {
                let _ = results_tx.send(TaskOutcome::Failure {
                    path: command.file.clone(),
                    error: crash_error(&command.file),
                });
                let _ = child.kill();
                let Ok(mut new_child) = spawn_worker(worker_binary) else {
                    break;
                };
                stdin = new_child.stdin.take().expect("piped stdin");
                reader = BufReader::new(new_child.stdout.take().expect("piped stdout"));
                child = new_child;
            }
        }
    }

    let _ = send_to_worker(&mut stdin, &CoordinatorMessage::Shutdown);
    let _ = child.wait();
}

fn spawn_worker(worker_binary: &std::path::Path) -> std::io::Result<Child> {
    Command::new(worker_binary)
        .arg("extractor-worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
}

fn send_to_worker(stdin: &mut impl Write, message: &CoordinatorMessage) -> Result<()> {
    let json = serde_json::to_string(message)?;
    writeln!(stdin, "{json}")?;
    stdin.flush()?;
    Ok(())
}

/// Read worker-emitted lines until a terminal `TaskResult`/`TaskFailed`
/// arrives, answering any `ClaimHeader`/`HeaderCompleted` requests against
/// the coordinator's real `HeaderTracker` along the way.
fn pump_until_task_done(
    reader: &mut impl BufRead,
    stdin: &mut impl Write,
    header_tracker: &HeaderTracker,
) -> Option<TaskOutcome> {
    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).ok()?;
        if bytes_read == 0 {
            return None;
        }
        let message: WorkerMessage = serde_json::from_str(line.trim_end()).ok()?;

        match message {
            WorkerMessage::ClaimHeader {
                header_path,
                content_hash,
                build_database_version_hash,
            } => {
                let outcome = header_tracker.try_claim(
                    std::path::Path::new(&header_path),
                    &content_hash,
                    &build_database_version_hash,
                );
                let reply = CoordinatorMessage::ClaimHeaderResult {
                    outcome: ClaimResult::from(outcome),
                };
                send_to_worker(stdin, &reply).ok()?;
            }
            WorkerMessage::HeaderCompleted {
                header_path,
                content_hash,
                build_database_version_hash,
            } => {
                header_tracker.mark_completed(
                    std::path::Path::new(&header_path),
                    &content_hash,
                    &build_database_version_hash,
                    now(),
                );
            }
            WorkerMessage::TaskResult {
                path,
                symbols,
                call_sites,
                headers_observed: _,
                file_metadata,
                header_dependencies,
                header_ownership,
            } => {
                return Some(TaskOutcome::Success {
                    path: PathBuf::from(path),
                    symbols,
                    call_sites,
                    file_metadata,
                    header_dependencies,
                    header_ownership,
                });
            }
            WorkerMessage::TaskFailed { path, error } => {
                return Some(TaskOutcome::Failure {
                    path: PathBuf::from(path),
                    error,
                });
            }
            WorkerMessage::ShutdownAck => return None,
        }
    }
}

fn crash_error(path: &std::path::Path) -> ParseError {
    ParseError {
        file: path.display().to_string(),
        error_kind: ParseErrorKind::ParserCrash,
        message: "worker process exited unexpectedly".to_string(),
        stack_trace: None,
        content_hash: String::new(),
        compile_args_hash: String::new(),
        retry_count: 0,
        timestamp: now(),
    }
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Apply one successfully-extracted file's results to the store, following
/// the ordering contract in §4.6 step 5 / "Ordering guarantees": delete old
/// symbols, insert new symbols, save call sites, upsert metadata, replace
/// header-dependency edges — atomically per file.
pub fn apply_task_outcome(store: &mut Store, outcome: &TaskOutcome) -> Result<()> {
    match outcome {
        TaskOutcome::Success {
            path,
            symbols,
            call_sites,
            file_metadata,
            header_dependencies,
            header_ownership,
        } => {
            let path_str = path.display().to_string();
            store.delete_symbols_for_file(&path_str)?;
            store.insert_symbols_batch(symbols)?;
            store.save_call_sites_batch(call_sites)?;
            store.upsert_file_metadata(file_metadata)?;
            for dep in header_dependencies {
                store.insert_header_dependency(dep)?;
            }
            for ownership in header_ownership {
                store.upsert_header_ownership(ownership)?;
            }
            store.clear_parse_error(&path_str)?;
            Ok(())
        }
        TaskOutcome::Failure { path, error } => {
            store.record_parse_error(error)?;
            let _ = path;
            Ok(())
        }
    }
}

/// Default worker pool size: the machine's CPU count (§4.4).
pub fn default_pool_size() -> usize {
    num_cpus::get()
}
