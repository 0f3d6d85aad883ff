use std::collections::HashMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

use crate::config::{ENV_CONFIG_DIR, ENV_SOURCE_DIR};

pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Variables that move skillsync's default locations away from `$HOME`.
const REDIRECT_VARS: [&str; 4] = ["CLAUDE_HOME", "CODEX_HOME", ENV_SOURCE_DIR, ENV_CONFIG_DIR];

pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
}

/// A process-wide sandbox for tests that read `$HOME`, the working directory
/// or skillsync's environment overrides.
///
/// Holds the env lock for its lifetime. On creation `HOME` points at a fresh
/// `home/` directory, the working directory is a fresh `work/` directory and
/// every redirect variable is cleared. Everything is put back on drop, before
/// the temporary tree is removed.
#[must_use]
pub struct Sandbox {
    _lock: MutexGuard<'static, ()>,
    root: TempDir,
    restore_cwd: PathBuf,
    restore_vars: HashMap<OsString, Option<OsString>>,
}

impl Sandbox {
    pub fn new() -> Self {
        let lock = lock_env();
        let restore_cwd = env::current_dir().expect("current dir");
        let root = TempDir::new().expect("sandbox dir");
        let mut sandbox = Self {
            _lock: lock,
            root,
            restore_cwd,
            restore_vars: HashMap::new(),
        };

        let home = sandbox.home();
        let work = sandbox.work_dir();
        fs::create_dir_all(&home).expect("sandbox home");
        fs::create_dir_all(&work).expect("sandbox work dir");
        sandbox.set_var("HOME", &home);
        for key in REDIRECT_VARS {
            sandbox.remove_var(key);
        }
        env::set_current_dir(&work).expect("enter sandbox work dir");
        sandbox
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    /// The working directory for the sandbox's lifetime.
    pub fn work_dir(&self) -> PathBuf {
        self.root().join("work")
    }

    pub fn set_var(&mut self, key: impl Into<OsString>, value: impl AsRef<OsStr>) {
        let key = key.into();
        self.track(&key);
        unsafe {
            env::set_var(&key, value);
        }
    }

    pub fn remove_var(&mut self, key: impl Into<OsString>) {
        let key = key.into();
        self.track(&key);
        unsafe {
            env::remove_var(&key);
        }
    }

    fn track(&mut self, key: &OsStr) {
        self.restore_vars
            .entry(key.to_os_string())
            .or_insert_with(|| env::var_os(key));
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        for (key, previous) in self.restore_vars.drain() {
            match previous {
                Some(value) => unsafe { env::set_var(&key, value) },
                None => unsafe { env::remove_var(&key) },
            }
        }
        let _ = env::set_current_dir(&self.restore_cwd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_restores_environment_on_drop() {
        let before_cwd;
        let before_home;
        let sandbox_root;
        {
            let _guard = lock_env();
            before_cwd = env::current_dir().expect("cwd");
            before_home = env::var_os("HOME");
        }
        {
            let mut sandbox = Sandbox::new();
            sandbox_root = sandbox.root().to_path_buf();
            assert_eq!(env::var_os("HOME"), Some(sandbox.home().into_os_string()));
            assert!(env::var_os(ENV_CONFIG_DIR).is_none());
            assert_eq!(
                env::current_dir().expect("cwd").canonicalize().expect("canon"),
                sandbox.work_dir().canonicalize().expect("canon")
            );
            sandbox.set_var(ENV_SOURCE_DIR, "/elsewhere");
        }
        let _guard = lock_env();
        assert_eq!(env::current_dir().expect("cwd"), before_cwd);
        assert_eq!(env::var_os("HOME"), before_home);
        assert!(!sandbox_root.exists());
    }
}
