//! honeyrisk entrypoint: reads NDJSON events from a file argument or stdin, scores each one and
//! writes one JSON evaluation per line to stdout. Diagnostics go to stderr.

use honeyrisk::{
    config::PipelineConfig,
    events::RawEvent,
    logging::StructuredLogger,
    orchestrator::ScoringOrchestrator,
    risk::Verdict,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tracing::{info, warn};

async fn run<R: AsyncBufRead + Unpin>(
    orchestrator: &ScoringOrchestrator,
    input: R,
    stop: &Notify,
) -> Result<(u64, u64), Box<dyn std::error::Error + Send + Sync>> {
    let mut lines = input.lines();
    let mut stdout = std::io::stdout();
    let (mut scored, mut rejected) = (0u64, 0u64);

    loop {
        let line = tokio::select! {
            _ = stop.notified() => {
                info!("interrupt received; stopping ingestion");
                break;
            }
            next = lines.next_line() => match next? {
                Some(line) => line,
                None => break,
            },
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let raw: RawEvent = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                rejected += 1;
                warn!(error = %e, "skipping malformed event line");
                continue;
            }
        };
        match orchestrator.ingest_raw(raw).await {
            Ok(evaluation) => {
                scored += 1;
                if evaluation.risk.verdict != Verdict::Safe {
                    info!(
                        event_id = %evaluation.event_id,
                        source = %evaluation.source_addr,
                        verdict = ?evaluation.risk.verdict,
                        total = evaluation.risk.total_risk_score,
                        action = ?evaluation.action,
                        "risk result"
                    );
                }
                StructuredLogger::emit_json(&evaluation, &mut stdout)?;
            }
            Err(e) => {
                rejected += 1;
                warn!(error = %e, "event rejected");
            }
        }
    }
    Ok((scored, rejected))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("HONEYRISK_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = PipelineConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    let orchestrator = ScoringOrchestrator::from_config(&config);
    info!(scorer = orchestrator.scorer_name(), "honeyrisk starting");

    let stop = Arc::new(Notify::new());
    let signal = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || signal.notify_one()) {
        warn!(error = %e, "could not install interrupt handler");
    }
    let sweep = orchestrator.spawn_eviction_sweep();

    let (scored, rejected) = match std::env::args().nth(1) {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            run(&orchestrator, BufReader::new(file), &stop).await?
        }
        None => run(&orchestrator, BufReader::new(tokio::io::stdin()), &stop).await?,
    };

    sweep.abort();
    info!(scored, rejected, tracked = orchestrator.extractor().tracked_sources(), "honeyrisk stopping");
    Ok(())
}
