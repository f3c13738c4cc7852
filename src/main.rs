//! `cxx-index-engine` CLI entry point.
//!
//! Doubles as the coordinator's worker binary: when invoked with the hidden
//! `extractor-worker` subcommand, it runs the extractor worker loop instead
//! of the normal CLI and never returns until its stdin is closed or it
//! receives `Shutdown`.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use cxx_index_engine::engine::{Engine, RefreshMode};
use cxx_index_engine::error::Result;
use cxx_index_engine::query;
use cxx_index_engine::{cli, coordinator};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    }
}

fn run() -> Result<String> {
    let args = cli::Cli::parse();

    if matches!(args.command, cli::Command::ExtractorWorker) {
        coordinator::worker::run()?;
        return Ok(String::new());
    }

    let worker_binary = std::env::current_exe()?;
    let engine = Engine::new(worker_binary);

    match args.command {
        cli::Command::ExtractorWorker => unreachable!("handled above"),

        cli::Command::Index {
            project_root,
            timeout_secs,
        } => {
            engine.set_project_directory(&project_root)?;
            engine.wait_for_indexing(timeout_secs.map(Duration::from_secs))?;
            render_status(&engine)
        }

        cli::Command::Refresh {
            project_root,
            force_full,
            timeout_secs,
        } => {
            engine.set_project_directory(&project_root)?;
            engine.wait_for_indexing(timeout_secs.map(Duration::from_secs))?;

            let mode = if force_full {
                RefreshMode::ForceFull
            } else {
                RefreshMode::Incremental
            };
            engine.refresh_project(mode)?;
            engine.wait_for_indexing(timeout_secs.map(Duration::from_secs))?;
            render_status(&engine)
        }

        cli::Command::Status { project_root } => {
            engine.set_project_directory(&project_root)?;
            render_status(&engine)
        }

        cli::Command::Query {
            project_root,
            query,
        } => {
            engine.set_project_directory(&project_root)?;
            engine.wait_for_indexing(None)?;
            run_query(&engine, query)
        }
    }
}

fn render_status(engine: &Engine) -> Result<String> {
    let state = engine.get_server_status();
    let progress = engine.get_indexing_status();
    let body = serde_json::json!({
        "state": format!("{state:?}"),
        "progress": {
            "indexed_files": progress.indexed_files,
            "total_files": progress.total_files,
            "completion_percentage": progress.completion_percentage,
            "elapsed_secs": progress.elapsed.as_secs_f64(),
            "eta_secs": progress.eta.map(|d| d.as_secs_f64()),
        },
    });
    Ok(format!("{}\n", serde_json::to_string_pretty(&body)?))
}

fn run_query(engine: &Engine, query: cli::QueryCommand) -> Result<String> {
    use cli::QueryCommand::*;

    let json = engine.with_store(|store| -> Result<serde_json::Value> {
        Ok(match query {
            Classes {
                pattern,
                project_only,
            } => {
                let filters = filters_for(project_only);
                serde_json::to_value(query::search_classes(store, &pattern, &filters)?)?
            }
            Functions {
                pattern,
                project_only,
            } => {
                let filters = filters_for(project_only);
                serde_json::to_value(query::search_functions(store, &pattern, &filters)?)?
            }
            ClassInfo { class_name } => {
                serde_json::to_value(query::get_class_info(store, &class_name)?)?
            }
            FunctionInfo { function_name } => {
                let (overloads, total) = query::get_function_info(store, &function_name)?;
                serde_json::json!({ "overloads": overloads, "overload_count": total })
            }
            DerivedClasses { class_name } => {
                serde_json::to_value(query::get_derived_classes(store, &class_name)?)?
            }
            Callers { function_name } => {
                serde_json::to_value(query::find_callers(store, &function_name)?)?
            }
            Callees { function_name } => {
                serde_json::to_value(query::find_callees(store, &function_name)?)?
            }
            CallPath {
                from_function,
                to_function,
                max_depth,
            } => serde_json::to_value(query::get_call_path(
                store,
                &from_function,
                &to_function,
                max_depth,
            )?)?,
            InFile { file_path } => serde_json::to_value(query::find_in_file(store, &file_path)?)?,
        })
    })?;

    Ok(format!("{}\n", serde_json::to_string_pretty(&json)?))
}

fn filters_for(project_only: bool) -> query::SearchFilters {
    query::SearchFilters {
        project_only,
        ..Default::default()
    }
}
