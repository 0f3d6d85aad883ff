use crate::path_utils::validate_path_str;
use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use std::env;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_DIR: &str = "SKILLSYNC_CONFIG_DIR";
pub const ENV_SOURCE_DIR: &str = "SKILLSYNC_SOURCE_DIR";
pub const APP_NAME: &str = "skillsync";
pub const CONFIG_FILE: &str = "config.toml";

pub fn resolve_config_dir(cli_override: Option<&Path>) -> Result<PathBuf> {
    let env_override = env::var(ENV_CONFIG_DIR).ok();
    resolve_config_dir_with(cli_override, env_override.as_deref())
}

pub fn resolve_config_dir_with(
    cli_override: Option<&Path>,
    env_override: Option<&str>,
) -> Result<PathBuf> {
    if let Some(path) = cli_override {
        validate_path_str(&path.to_string_lossy())
            .map_err(|e| anyhow!(t!("errors.invalid_config_dir", error = e)))?;
        return Ok(path.to_path_buf());
    }

    if let Some(env_config_dir) = env_override {
        validate_path_str(env_config_dir)
            .map_err(|e| anyhow!(t!("errors.invalid_config_dir_env", error = e)))?;
        return Ok(PathBuf::from(env_config_dir));
    }

    let project_dirs = ProjectDirs::from("", "", APP_NAME)
        .ok_or_else(|| anyhow!(t!("errors.not_find_config_dir")))?;
    Ok(project_dirs.config_dir().to_path_buf())
}

pub fn try_home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::Sandbox;

    #[test]
    fn test_resolve_config_dir_cli_overrides_env() {
        let env_dir = env::temp_dir().join("skillsync_env_dir_resolve");
        let cli_dir = env::temp_dir().join("skillsync_cli_dir_resolve");

        let resolved =
            resolve_config_dir_with(Some(cli_dir.as_path()), env_dir.to_str()).unwrap();
        assert_eq!(resolved, cli_dir);
    }

    #[test]
    fn test_resolve_config_dir_env_overrides_default() {
        let mut sandbox = Sandbox::new();
        let env_dir = sandbox.root().join("config");
        sandbox.set_var(ENV_CONFIG_DIR, &env_dir);

        let resolved = resolve_config_dir(None).unwrap();
        assert_eq!(resolved, env_dir);
    }

    #[test]
    fn test_resolve_config_dir_default_path() {
        let _sandbox = Sandbox::new();

        let resolved = resolve_config_dir(None).unwrap();
        let expected = ProjectDirs::from("", "", APP_NAME)
            .unwrap()
            .config_dir()
            .to_path_buf();

        assert_eq!(resolved, expected);
    }

    #[test]
    fn test_resolve_config_dir_rejects_blank_env() {
        let err = resolve_config_dir_with(None, Some("   ")).expect_err("blank env");
        assert!(err.to_string().contains("SKILLSYNC_CONFIG_DIR"));
    }
}
