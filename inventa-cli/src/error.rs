//! CLI-specific error types and exit code mapping

use inventa_core::error::InventaError;
use inventa_discovery::DiscoveryError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The discovery library could not be loaded or is inconsistent.
    #[error("library error: {0}")]
    Library(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from inventa-core.
    #[error("{0}")]
    Core(#[from] InventaError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                     |
    /// |------|-----------------------------|
    /// | 0    | Success                     |
    /// | 1    | General / command error     |
    /// | 2    | Configuration error         |
    /// | 3    | Library error               |
    /// | 10   | IO error                    |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Library(_) => 3,
            Self::Io(_) => 10,
            Self::Core(core) => match core {
                InventaError::Config(_) => 2,
                InventaError::Library(_) => 3,
                InventaError::Io(_) => 10,
                InventaError::Scan(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}

impl From<DiscoveryError> for CliError {
    fn from(e: DiscoveryError) -> Self {
        match e {
            DiscoveryError::Config { .. } => Self::Config(e.to_string()),
            DiscoveryError::LibraryLoad { .. }
            | DiscoveryError::InvalidRecord { .. }
            | DiscoveryError::Pattern { .. }
            | DiscoveryError::ExclusionCycle { .. } => Self::Library(e.to_string()),
            DiscoveryError::ScanRead { .. }
            | DiscoveryError::FileTooBig { .. }
            | DiscoveryError::Worker(_)
            | DiscoveryError::Output { .. }
            | DiscoveryError::Channel(_) => Self::Command(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventa_core::error::{ConfigError, LibraryError};
    use inventa_discovery::VersionId;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_library_error() {
        let err = CliError::Library("bad rule".to_owned());
        assert_eq!(err.exit_code(), 3, "library error should return exit code 3");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_core_follows_domain() {
        let config: CliError = InventaError::Config(ConfigError::FileNotFound {
            path: "inventa.toml".to_owned(),
        })
        .into();
        assert_eq!(config.exit_code(), 2);

        let library: CliError = InventaError::Library(LibraryError::Cycle("1 -> 2 -> 1".to_owned()))
            .into();
        assert_eq!(library.exit_code(), 3);
    }

    #[test]
    fn test_from_discovery_library_errors() {
        let err: CliError = DiscoveryError::ExclusionCycle {
            version: VersionId(7),
        }
        .into();
        assert!(matches!(err, CliError::Library(_)));
        assert_eq!(err.exit_code(), 3);

        let err: CliError = DiscoveryError::InvalidRecord {
            path: "DiscoveryRules.txt".to_owned(),
            line: 3,
            reason: "expected 9 fields".to_owned(),
        }
        .into();
        assert!(err.to_string().contains("DiscoveryRules.txt"));
    }

    #[test]
    fn test_from_discovery_config_error() {
        let err: CliError = DiscoveryError::Config {
            field: "workers".to_owned(),
            reason: "too many".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_from_discovery_run_error() {
        let err: CliError = DiscoveryError::Worker("semaphore closed".to_owned()).into();
        assert!(matches!(err, CliError::Command(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = format!("{}", err);
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }
}
