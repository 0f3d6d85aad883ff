use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn create_test_file_with_content(dir: &Path, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

/// A throwaway home, config directory and skills source for one test.
///
/// Targets named through `write_targets` live under `<temp>/targets/<id>`.
pub struct TestEnvironment {
    // TempDir is kept to ensure cleanup happens when TestEnvironment is dropped
    #[allow(dead_code)]
    pub(crate) temp_dir: TempDir,
    pub home: PathBuf,
    pub config_dir: PathBuf,
    pub source: PathBuf,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();
        let home = root.join("home");
        let config_dir = root.join("config");
        let source = root.join("skills");
        for dir in [&home, &config_dir, &source] {
            fs::create_dir_all(dir).expect("Failed to create test directory");
        }
        Self {
            temp_dir,
            home,
            config_dir,
            source,
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Adds a package with a `SKILL.md` holding `body`.
    pub fn add_skill(&self, id: &str, body: &str) -> PathBuf {
        create_test_file_with_content(&self.source, &format!("{id}/SKILL.md"), body)
    }

    pub fn add_skill_file(&self, id: &str, rel: &str, content: &str) -> PathBuf {
        create_test_file_with_content(&self.source.join(id), rel, content)
    }

    pub fn target_root(&self, id: &str) -> PathBuf {
        self.path().join("targets").join(id)
    }

    /// Writes `config.toml` with one `[[target]]` per id, rooted in `target_root`.
    pub fn write_targets(&self, ids: &[&str]) -> PathBuf {
        self.write_config(&self.targets_toml(ids, ""))
    }

    /// Same as `write_targets`, with `extra` appended to every entry.
    pub fn targets_toml(&self, ids: &[&str], extra: &str) -> String {
        let mut config = String::from("version = 1\n");
        for id in ids {
            config.push_str(&format!(
                "\n[[target]]\nid = \"{id}\"\npath = {:?}\n{extra}",
                self.target_root(id).to_string_lossy()
            ));
        }
        config
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        create_test_file_with_content(&self.config_dir, "config.toml", content)
    }

    pub fn read_target(&self, id: &str, rel: &str) -> String {
        fs::read_to_string(self.target_root(id).join(rel)).expect("Failed to read target file")
    }

    /// Every file under a target root, relative and sorted.
    pub fn target_files(&self, id: &str) -> Vec<String> {
        let root = self.target_root(id);
        let mut files: Vec<String> = walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| {
                entry
                    .path()
                    .strip_prefix(&root)
                    .expect("entry under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        files.sort();
        files
    }
}
