use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkillsError {
    #[error("Source directory not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("Source path is not a directory: {}", .path.display())]
    SourceNotDirectory { path: PathBuf },

    #[error("Unknown skill: {name}")]
    UnknownPackage { name: String },

    #[error("Unknown target: {name}")]
    UnknownTarget { name: String },

    #[error("No targets are enabled")]
    NoTargetsEnabled,

    #[error("Installation cancelled")]
    Declined,

    #[error("Sync failed for targets: {}", .failed.join(", "))]
    SyncFailed {
        failed: Vec<String>,
        succeeded: Vec<String>,
    },

    #[error("Config Error: {message}")]
    Config { message: String },

    #[error("Refresh Error: {message}")]
    Refresh { message: String },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Glob Pattern Error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl SkillsError {
    pub fn display_localized(&self) -> String {
        match self {
            SkillsError::SourceNotFound { path } => {
                t!("errors.source_not_found", path = path.display()).to_string()
            }
            SkillsError::SourceNotDirectory { path } => {
                t!("errors.source_not_directory", path = path.display()).to_string()
            }
            SkillsError::UnknownPackage { name } => {
                t!("errors.unknown_package", name = name).to_string()
            }
            SkillsError::UnknownTarget { name } => {
                t!("errors.unknown_target", name = name).to_string()
            }
            SkillsError::NoTargetsEnabled => t!("errors.no_targets_enabled").to_string(),
            SkillsError::Declined => t!("errors.declined").to_string(),
            SkillsError::SyncFailed { failed, succeeded } => {
                let succeeded = if succeeded.is_empty() {
                    t!("errors.none").to_string()
                } else {
                    succeeded.join(", ")
                };
                t!(
                    "errors.sync_failed",
                    failed = failed.join(", "),
                    succeeded = succeeded
                )
                .to_string()
            }
            SkillsError::Config { message } => {
                t!("errors.config_error", message = message).to_string()
            }
            SkillsError::Refresh { message } => {
                t!("errors.refresh_error", message = message).to_string()
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SkillsError>;
