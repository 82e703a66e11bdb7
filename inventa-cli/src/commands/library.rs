//! `inventa library` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use inventa_discovery::{DiscoveryError, EngineConfigBuilder, Library, LibraryStats};

use crate::cli::{LibraryAction, LibraryArgs};
use crate::commands::load_config;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `library` command.
pub async fn execute(
    args: LibraryArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        LibraryAction::Validate { library_dir } => {
            execute_validate(config_path, library_dir, writer).await
        }
    }
}

/// Load every library file and check the exclusion graph.
///
/// # Errors
///
/// Returns `CliError::Library` if any file fails to load or the exclusion graph has a cycle.
async fn execute_validate(
    config_path: &Path,
    library_dir: Option<PathBuf>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = load_config(config_path).await?;
    let mut builder = EngineConfigBuilder::from_core(&config.discovery);
    if let Some(dir) = library_dir {
        builder = builder.library_dir(dir);
    }
    let engine_config = builder.build()?;

    let library_dir = engine_config.library_dir.display().to_string();
    info!(library_dir = %library_dir, "validating discovery library");

    let loaded = tokio::task::spawn_blocking(move || {
        let library = Library::load(&engine_config)?;
        library.check_exclusion_cycles()?;
        Ok::<_, DiscoveryError>(library.stats())
    })
    .await
    .map_err(|e| CliError::Command(format!("library validation task failed: {e}")))?;

    let report = match loaded {
        Ok(stats) => LibraryValidationReport {
            library_dir,
            valid: true,
            stats: Some(stats),
            errors: Vec::new(),
        },
        Err(e) => LibraryValidationReport {
            library_dir,
            valid: false,
            stats: None,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Library("library is invalid".to_owned()));
    }

    Ok(())
}

/// Library validation report.
#[derive(Serialize)]
pub struct LibraryValidationReport {
    pub library_dir: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<LibraryStats>,
    pub errors: Vec<String>,
}

impl Render for LibraryValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Library Validation: {}", self.library_dir.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        if let Some(stats) = &self.stats {
            writeln!(w, "  Rules:           {}", stats.rules)?;
            writeln!(w, "  Builds:          {}", stats.builds)?;
            writeln!(w, "  Exclusion edges: {}", stats.exclusion_edges)?;
            writeln!(w, "  Signatures:      {}", stats.signatures)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_report_render_valid() {
        let report = LibraryValidationReport {
            library_dir: "/var/lib/inventa/library".to_owned(),
            valid: true,
            stats: Some(LibraryStats {
                rules: 120,
                builds: 45,
                exclusion_edges: 8,
                signatures: 44,
            }),
            errors: Vec::new(),
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("VALID"));
        assert!(output.contains("120"));
        assert!(output.contains("Exclusion edges: 8"));
    }

    #[test]
    fn test_library_report_render_invalid() {
        let report = LibraryValidationReport {
            library_dir: "lib".to_owned(),
            valid: false,
            stats: None,
            errors: vec!["lib/DiscoveryRules.txt:3: expected 9 fields".to_owned()],
        };

        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render should succeed");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("INVALID"));
        assert!(output.contains("DiscoveryRules.txt:3"));
        assert!(!output.contains("Rules:"));
    }

    #[test]
    fn test_library_report_json_skips_missing_stats() {
        let report = LibraryValidationReport {
            library_dir: "lib".to_owned(),
            valid: false,
            stats: None,
            errors: vec!["missing".to_owned()],
        };
        let json = serde_json::to_string(&report).expect("serialize");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed["valid"].as_bool(), Some(false));
        assert!(parsed.get("stats").is_none());
    }

    #[tokio::test]
    async fn test_validate_reports_cycle_as_library_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let library = dir.path().join("library");
        std::fs::create_dir(&library).expect("mkdir");
        std::fs::write(library.join("DiscoveryRules.txt"), "1\t10\t1\tTool\t\t\t\t\t\n")
            .expect("write rules");
        std::fs::write(library.join("DiscoveryVERs.txt"), "1\t2\n2\t1\n").expect("write vers");
        std::fs::write(library.join("DiscoverySignatures.txt"), "").expect("write sigs");

        let writer = OutputWriter::new(crate::cli::OutputFormat::Json);
        let err = execute_validate(&dir.path().join("missing.toml"), Some(library), &writer)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
