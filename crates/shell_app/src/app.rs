use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use serde::Serialize;
use shell_core::{AttemptRecord, AttemptResult, LoadOutcome};
use shell_engine::{DocumentStore, EngineEvent, EngineHandle, FetchViewer, RenderedDocument};
use shell_logging::{shell_debug, shell_error, shell_info, shell_warn, LevelFilter};

use crate::cli::Args;
use crate::config::ShellConfig;

#[derive(Debug, Serialize)]
struct SessionSummary {
    finished_utc: String,
    served_origin: Option<String>,
    content_type: Option<String>,
    attempts: Vec<AttemptSummary>,
}

#[derive(Debug, Serialize)]
struct AttemptSummary {
    origin: String,
    result: String,
    duration_ms: Option<u64>,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let loaded = ShellConfig::load(&args.config)?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();
    let level = if config.debug_logging {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    shell_logging::initialize(args.log.clone(), level);
    if from_file {
        shell_info!("Using config {:?}", args.config);
    } else {
        shell_info!("No config at {:?}, using defaults", args.config);
    }

    let loader = config.loader_config()?;
    shell_info!(
        "Loading content from {} origins (worst case {:?})",
        loader.origins.len(),
        loader.worst_case()
    );

    let viewer = Arc::new(FetchViewer::new(config.fetch_settings())?);
    let mut engine = EngineHandle::spawn(loader, viewer.clone());
    engine.start();

    let mut retries_left = args.retries;
    let (outcome, attempts) = loop {
        match engine.next_event().await {
            Some(EngineEvent::StateChanged(view)) => {
                shell_debug!(
                    "{:?} origin={:?} progress={}%",
                    view.phase,
                    view.current_origin,
                    view.progress
                );
            }
            Some(EngineEvent::Finished {
                outcome: LoadOutcome::Failed(err),
                ..
            }) if retries_left > 0 => {
                retries_left -= 1;
                shell_warn!("{}; retrying ({} left)", err, retries_left);
                engine.retry();
            }
            Some(EngineEvent::Finished {
                outcome, attempts, ..
            }) => break (outcome, attempts),
            None => bail!("loader stopped before finishing"),
        }
    };

    let output_dir = args.output.unwrap_or(config.output_dir);
    if let Some(document) = viewer.current_document() {
        write_outputs(&output_dir, &document, &attempts)?;
    }

    match outcome {
        LoadOutcome::Loaded { index, origin } => {
            shell_info!("Serving origin #{} {}", index, origin);
            Ok(())
        }
        LoadOutcome::Failed(err) => {
            shell_error!("{}", err);
            Err(err.into())
        }
    }
}

fn write_outputs(
    dir: &Path,
    document: &RenderedDocument,
    attempts: &[AttemptRecord],
) -> anyhow::Result<()> {
    let store = DocumentStore::open(dir)?;
    let path = store.save_document(document)?;
    shell_info!("Wrote {} bytes to {:?}", document.body.len(), path);

    let summary = SessionSummary {
        finished_utc: Utc::now().to_rfc3339(),
        served_origin: document.origin.as_ref().map(ToString::to_string),
        content_type: document.content_type.clone(),
        attempts: attempts.iter().map(summarize).collect(),
    };
    let content = ron::ser::to_string_pretty(&summary, ron::ser::PrettyConfig::new())
        .context("failed to serialize session summary")?;
    store.save_summary(&content)?;
    Ok(())
}

fn summarize(record: &AttemptRecord) -> AttemptSummary {
    AttemptSummary {
        origin: record.origin.to_string(),
        result: match &record.result {
            Some(AttemptResult::Ready) => "ready".to_string(),
            Some(AttemptResult::Failed(failure)) => failure.to_string(),
            None => "pending".to_string(),
        },
        duration_ms: record
            .duration()
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
    }
}
