use crate::config::{CONFIG_FILE, ENV_SOURCE_DIR};
use crate::error::{Result, SkillsError};
use crate::path_utils::validate_path_str;
use crate::skills::targets::{ExcludeRules, Target, TargetRegistry};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const CONFIG_VERSION: u32 = 1;
const DEFAULT_SOURCE_DIR: &str = "skills";

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z0-9_]+)|\$\{([^}]+)\}").expect("valid env var pattern")
});

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    version: Option<u32>,
    source_dir: Option<String>,
    #[serde(default)]
    target: Vec<TomlTarget>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlTarget {
    id: String,
    path: String,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default = "default_true")]
    enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Settings loaded from `config.toml`, with the default target table filled
/// in when the file names no targets.
#[derive(Debug)]
pub struct SkillsConfig {
    pub path: PathBuf,
    pub source_dir: Option<PathBuf>,
    pub registry: TargetRegistry,
}

pub fn load_config(config_dir: &Path) -> Result<SkillsConfig> {
    let home_dir = crate::config::try_home_dir();
    load_config_with(config_dir, home_dir.as_deref(), |key| env::var(key).ok())
}

pub fn load_config_with<F>(
    config_dir: &Path,
    home_dir: Option<&Path>,
    env_lookup: F,
) -> Result<SkillsConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let path = config_dir.join(CONFIG_FILE);
    let parsed = if path.exists() {
        tracing::debug!("loading config from {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| {
            config_error(t!("skills.config.read_failed", path = path.display(), error = e))
        })?;
        let parsed: TomlConfig = toml::from_str(&content).map_err(|e| {
            config_error(t!("skills.config.parse_failed", path = path.display(), error = e))
        })?;
        let version = parsed.version.unwrap_or(CONFIG_VERSION);
        if version != CONFIG_VERSION {
            return Err(config_error(t!(
                "skills.config.unsupported_version",
                version = version
            )));
        }
        Some(parsed)
    } else {
        tracing::debug!("no config at {}, using defaults", path.display());
        None
    };

    let (source_dir, entries) = match parsed {
        Some(parsed) => (parsed.source_dir, parsed.target),
        None => (None, Vec::new()),
    };

    let source_dir = match source_dir {
        Some(raw) => {
            validate_path_str(&raw).map_err(|e| {
                config_error(t!("skills.config.source_dir_invalid", error = e))
            })?;
            Some(expand_path_with(&raw, home_dir, &env_lookup)?)
        }
        None => None,
    };

    let targets = if entries.is_empty() {
        let claude_home = env_lookup("CLAUDE_HOME").map(PathBuf::from);
        let codex_home = env_lookup("CODEX_HOME").map(PathBuf::from);
        default_targets_with(home_dir, claude_home.as_deref(), codex_home.as_deref())?
    } else {
        resolve_target_entries(entries, home_dir, &env_lookup)?
    };

    Ok(SkillsConfig {
        path,
        source_dir,
        registry: TargetRegistry::new(targets)?,
    })
}

fn resolve_target_entries<F>(
    entries: Vec<TomlTarget>,
    home_dir: Option<&Path>,
    env_lookup: &F,
) -> Result<Vec<Target>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = Vec::new();
    for entry in entries {
        let id = entry.id.trim().to_string();
        if id.is_empty() {
            return Err(config_error(t!("skills.config.target_id_missing")));
        }
        validate_path_str(&entry.path).map_err(|e| {
            config_error(t!("skills.config.target_path_invalid", id = id, error = e))
        })?;
        resolved.push(Target {
            root: expand_path_with(&entry.path, home_dir, env_lookup)?,
            exclude: ExcludeRules::new(&entry.exclude)?,
            enabled: entry.enabled,
            id,
        });
    }
    Ok(resolved)
}

/// The built-in target table, in report order.
pub fn default_targets_with(
    home_dir: Option<&Path>,
    claude_home: Option<&Path>,
    codex_home: Option<&Path>,
) -> Result<Vec<Target>> {
    let no_env = |_key: &str| -> Option<String> { None };
    let claude_root = match claude_home {
        Some(home) => home.join("skills"),
        None => expand_path_with("~/.claude/skills", home_dir, &no_env)?,
    };
    let codex_root = match codex_home {
        Some(home) => home.join("skills"),
        None => expand_path_with("~/.codex/skills", home_dir, &no_env)?,
    };

    Ok(vec![
        Target {
            id: "claude".to_string(),
            root: claude_root,
            exclude: ExcludeRules::default(),
            enabled: true,
        },
        Target {
            id: "codex".to_string(),
            root: codex_root,
            exclude: ExcludeRules::new(&[".system"])?,
            enabled: true,
        },
        Target {
            id: "opencode".to_string(),
            root: expand_path_with("~/.config/opencode/skill", home_dir, &no_env)?,
            exclude: ExcludeRules::default(),
            enabled: true,
        },
        Target {
            id: "antigravity".to_string(),
            root: expand_path_with("~/.gemini/antigravity/skills", home_dir, &no_env)?,
            exclude: ExcludeRules::default(),
            enabled: true,
        },
    ])
}

pub fn resolve_source_root(cli_override: Option<&Path>, config: &SkillsConfig) -> Result<PathBuf> {
    let env_source = env::var(ENV_SOURCE_DIR).ok();
    let cwd = env::current_dir()?;
    resolve_source_root_with(
        cli_override,
        env_source.as_deref(),
        config.source_dir.as_deref(),
        &cwd,
    )
}

/// Precedence: command line, then environment, then `source_dir` from the
/// config file, then `./skills`.
pub fn resolve_source_root_with(
    cli_override: Option<&Path>,
    env_source: Option<&str>,
    config_source: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf> {
    let chosen = if let Some(path) = cli_override {
        validate_path_str(&path.to_string_lossy()).map_err(|e| {
            config_error(t!("skills.config.source_dir_invalid_cli", error = e))
        })?;
        expand_path(&path.to_string_lossy())?
    } else if let Some(raw) = env_source {
        validate_path_str(raw).map_err(|e| {
            config_error(t!("skills.config.source_dir_invalid_env", error = e))
        })?;
        expand_path(raw)?
    } else if let Some(path) = config_source {
        path.to_path_buf()
    } else {
        PathBuf::from(DEFAULT_SOURCE_DIR)
    };

    if chosen.is_absolute() {
        Ok(chosen)
    } else {
        Ok(cwd.join(chosen))
    }
}

fn config_error(message: impl ToString) -> SkillsError {
    SkillsError::Config {
        message: message.to_string(),
    }
}

pub fn expand_path(raw: &str) -> Result<PathBuf> {
    expand_path_with(raw, None, &|key: &str| env::var(key).ok())
}

pub fn expand_path_with<F>(raw: &str, home_dir: Option<&Path>, env_lookup: &F) -> Result<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_env_vars_with(raw, env_lookup);
    let path = expand_tilde_with(&expanded, home_dir)?;
    Ok(PathBuf::from(path))
}

fn expand_tilde_with(path: &str, home_dir: Option<&Path>) -> Result<String> {
    if path == "~" || path.starts_with("~/") {
        let home = home_dir
            .map(Path::to_path_buf)
            .or_else(crate::config::try_home_dir)
            .ok_or_else(|| config_error(t!("skills.config.home_missing")))?;
        if path == "~" {
            return Ok(home.to_string_lossy().to_string());
        }
        let trimmed = path.trim_start_matches("~/");
        return Ok(home.join(trimmed).to_string_lossy().to_string());
    }
    Ok(path.to_string())
}

/// Unset variables are left in place verbatim.
fn expand_env_vars_with<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    ENV_VAR_RE
        .replace_all(input, |caps: &regex::Captures| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|key| lookup(key.as_str()))
                .unwrap_or_else(|| whole.to_string())
        })
        .to_string()
}
