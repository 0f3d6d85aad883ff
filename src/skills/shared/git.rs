use anyhow::{Result, anyhow};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

/// Fetches a single revision of a repository into `dest`, which must not exist.
pub trait RepoCloner: Sync {
    fn shallow_clone(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<()>;
}

/// Clones through the `git` executable on `PATH`.
#[derive(Clone, Copy, Debug, Default)]
pub struct GitCli;

impl RepoCloner for GitCli {
    fn shallow_clone(&self, url: &str, branch: Option<&str>, dest: &Path) -> Result<()> {
        let mut command = Command::new("git");
        command.args(["clone", "--quiet", "--depth", "1"]);
        if let Some(branch) = branch {
            command.args(["-b", branch]);
        }
        let output = command
            .arg(url)
            .arg(dest)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| anyhow!(t!("skills.refresh.git_unavailable", error = e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(t!(
                "skills.refresh.clone_failed",
                url = url,
                error = stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Tries the requested branch first, then the remote's default branch.
pub fn clone_with_fallback(
    cloner: &dyn RepoCloner,
    url: &str,
    branch: &str,
    dest: &Path,
) -> Result<()> {
    match cloner.shallow_clone(url, Some(branch), dest) {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::debug!("clone of {url} at {branch} failed, retrying default branch: {err}");
            if fs::symlink_metadata(dest).is_ok() {
                fs::remove_dir_all(dest)?;
            }
            cloner.shallow_clone(url, None, dest)
        }
    }
}
