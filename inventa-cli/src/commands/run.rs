//! `inventa run` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use inventa_discovery::{DiscoveryEngine, EngineConfig, EngineConfigBuilder, RunSummary};

use crate::cli::RunArgs;
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let engine_config = engine_config(&args, &config.discovery)?;

    inventa_core::metrics::describe_all();
    info!(
        library_dir = %engine_config.library_dir.display(),
        scan_dir = %engine_config.scan_dir.display(),
        "starting discovery run"
    );

    let engine = DiscoveryEngine::load(engine_config).await?;
    let summary = engine.run().await?;

    writer.render(&RunReport { summary })?;
    Ok(())
}

/// Build the engine configuration from the `[discovery]` section and CLI overrides.
fn engine_config(
    args: &RunArgs,
    discovery: &inventa_core::config::DiscoveryConfig,
) -> Result<EngineConfig, CliError> {
    let mut builder = EngineConfigBuilder::from_core(discovery);
    if let Some(dir) = &args.scan_dir {
        builder = builder.scan_dir(dir);
    }
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(dir) = &args.library_dir {
        builder = builder.library_dir(dir);
    }
    if let Some(workers) = args.workers {
        builder = builder.workers(workers);
    }
    if args.seed_sources {
        builder = builder.seed_sources(true);
    }
    Ok(builder.build()?)
}

/// Discovery run report.
#[derive(Serialize)]
pub struct RunReport {
    #[serde(flatten)]
    pub summary: RunSummary,
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let s = &self.summary;
        writeln!(w, "Discovery run {}", s.run_id.bold())?;
        writeln!(w, "  Output:     {}", s.output_dir)?;
        writeln!(w, "  Workers:    {}", s.workers)?;
        writeln!(w, "  Elapsed:    {} ms", s.elapsed_ms)?;
        writeln!(w)?;

        let scans = format!(
            "{} dispatched, {} completed, {} failed",
            s.scans_dispatched, s.scans_completed, s.scans_failed
        );
        if s.scans_failed > 0 {
            writeln!(w, "  Scans:      {}", scans.yellow())?;
        } else {
            writeln!(w, "  Scans:      {}", scans.green())?;
        }
        writeln!(
            w,
            "  Sources:    {} read, {} unique, {} unused, {} seeded",
            s.sources_read, s.unique_sources, s.unused_sources, s.sources_seeded
        )?;
        if s.malformed_lines > 0 {
            writeln!(
                w,
                "  Malformed:  {}",
                format!("{} lines skipped", s.malformed_lines).yellow()
            )?;
        }
        writeln!(
            w,
            "  Detections: {} confirmed, {} excluded, {} aggregate rows",
            s.confirmed_detections.to_string().bold(),
            s.excluded_detections,
            s.aggregate_rows
        )?;
        if s.exclusion_cycles > 0 {
            writeln!(
                w,
                "  Cycles:     {}",
                format!("{} exclusion cycles (detections kept)", s.exclusion_cycles).red()
            )?;
        }
        if s.missing_signatures > 0 {
            writeln!(
                w,
                "  Signatures: {}",
                format!("{} detections without signature", s.missing_signatures).yellow()
            )?;
        }

        Ok(())
    }
}
