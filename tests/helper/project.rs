//! Temporary npm project fixtures

use std::path::PathBuf;

use tempfile::TempDir;

pub struct TestProject {
    // Held so the directory outlives the test
    pub dir: TempDir,
}

impl TestProject {
    pub fn new(package_json: &str) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("package.json"), package_json).unwrap();
        Self { dir }
    }

    pub fn with_lock(self, package_lock: &str) -> Self {
        std::fs::write(self.dir.path().join("package-lock.json"), package_lock).unwrap();
        self
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn manifest(&self) -> PathBuf {
        self.dir.path().join("package.json")
    }

    pub fn read_manifest(&self) -> String {
        std::fs::read_to_string(self.manifest()).unwrap()
    }
}
