// /////////////////////////////////////////////////////////////////////////////
// Markdown-to-Video Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `mdvid` binary entry point: wires the bootstrap CLI surface to the
//! engine's application-layer use cases and prints their results.

use mdvid_bootstrap::{bootstrap_cli, result_to_exit_code, signals, ValidatedCommand};
use mdvid_domain::services::StageRegistry;
use mdvid_engine::application::Application;
use mdvid_engine::infrastructure::adapters::local::{
    LocalAnimationRenderer, LocalAvMuxer, LocalHttpFetcher, LocalImageSearchService, LocalLlmService,
    LocalMediaProbe, LocalSpeechSynthesizer,
};
use mdvid_engine::infrastructure::logging::init_logging;
use mdvid_engine::infrastructure::repositories::{FsCheckpointStore, SqliteJobStore};
use mdvid_engine::infrastructure::stages::build_standard_adapters;
use mdvid_engine::{EngineConfig, PipelineEngine};
use std::sync::Arc;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    init_logging();

    let cli = match bootstrap_cli() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("argument error: {e}");
            return std::process::ExitCode::from(64); // EX_USAGE
        }
    };

    let result = run(cli).await;
    result_to_exit_code(result)
}

async fn run(cli: mdvid_bootstrap::ValidatedCli) -> Result<(), mdvid_domain::PipelineError> {
    let config = EngineConfig::load(cli.config.as_deref())
        .map_err(|e| mdvid_domain::PipelineError::Unknown(format!("configuration error: {e}")))?;

    let job_store: Arc<dyn mdvid_domain::repositories::JobStore> =
        Arc::new(SqliteJobStore::connect(&config.job_store_uri).await?);
    let checkpoint_store: Arc<dyn mdvid_domain::repositories::CheckpointStore> =
        Arc::new(FsCheckpointStore::new(config.checkpoint_dir.clone()));

    let probe = Arc::new(LocalMediaProbe);
    let stage_adapters = build_standard_adapters(
        Arc::new(LocalLlmService),
        Arc::new(LocalImageSearchService),
        Arc::new(LocalHttpFetcher),
        Arc::new(LocalAnimationRenderer::new(config.workspace_root.join("renders"))),
        Arc::new(LocalSpeechSynthesizer::new(config.workspace_root.join("audio"))),
        Arc::new(LocalAvMuxer::new(config.workspace_root.join("final"))),
        probe.clone(),
        config.workspace_root.clone(),
        config.default_voice_id.clone(),
        config.markdown_input_truncation_chars,
        config.render_quality_fallback.clone(),
    );

    let engine = Arc::new(PipelineEngine::new(
        StageRegistry::standard(),
        stage_adapters,
        job_store.clone(),
        checkpoint_store.clone(),
        config.backoff_base(),
        config.backoff_cap(),
        config.total_retry_ceiling,
        probe,
        config.workspace_root.clone(),
    ));

    let worker_id = format!("mdvid-{}", std::process::id());
    let app = Application::new(job_store, checkpoint_store, engine, worker_id);

    let shutdown_app = app.clone();
    tokio::spawn(async move {
        let handler = signals::create_signal_handler();
        handler
            .wait_for_signal(Box::new(move || {
                shutdown_app.cancel_all();
            }))
            .await;
    });

    dispatch(&app, cli.command).await
}

async fn dispatch(app: &Application, command: ValidatedCommand) -> Result<(), mdvid_domain::PipelineError> {
    match command {
        ValidatedCommand::Create { input, style } => {
            let job = app
                .create_job(&input.display().to_string(), &style)
                .await?;
            println!("{}", job.id);
            Ok(())
        }
        ValidatedCommand::Run { job_id } => {
            app.run_job(&job_id).await?;
            println!("job {job_id} completed");
            Ok(())
        }
        ValidatedCommand::Resume { job_id } => {
            app.resume_job(&job_id).await?;
            println!("job {job_id} resumed and completed");
            Ok(())
        }
        ValidatedCommand::Status { job_id } => {
            let report = app.status_job(&job_id).await?;
            println!(
                "job {} status={:?} stage={} degraded_stages={} tokens={}",
                report.job.id,
                report.job.status,
                report.job.current_stage,
                report.job.degraded_stage_count,
                report.job.token_usage.total(),
            );
            for error in &report.errors {
                println!(
                    "  [{}] stage {} attempt {}: {} (fallback={} restored={})",
                    error.at, error.stage, error.retry_attempt, error.detail, error.used_fallback, error.restored_from_checkpoint
                );
            }
            Ok(())
        }
        ValidatedCommand::List { status } => {
            let jobs = app.list_jobs(status.as_deref()).await?;
            for job in jobs {
                println!("{} {:?} stage={}", job.id, job.status, job.current_stage);
            }
            Ok(())
        }
        ValidatedCommand::Cancel { job_id } => {
            let cancelled = app.cancel_job(&job_id)?;
            if cancelled {
                println!("job {job_id} cancellation requested");
            } else {
                println!("job {job_id} is not running in this process");
            }
            Ok(())
        }
        ValidatedCommand::Delete { job_id, force } => {
            app.delete_job(&job_id, force).await?;
            println!("job {job_id} deleted");
            Ok(())
        }
    }
}
