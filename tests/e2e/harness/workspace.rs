use anyhow::{Context, Result};
use conductor_core::{Config, DeclarativeLoader, TestIdentity};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated conductor project in a temp directory
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty project
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Create a project with initial files
    pub fn with_files(files: HashMap<String, Vec<u8>>) -> Result<Self> {
        let workspace = Self::empty()?;
        for (path, content) in files {
            workspace.write_file(&path, &content)?;
        }
        Ok(workspace)
    }

    /// Copy a project from the fixtures directory
    pub fn copy_fixture(&self, name: &str) -> Result<()> {
        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name);

        if !fixture_path.exists() {
            anyhow::bail!("Fixture not found: {}", fixture_path.display());
        }

        copy_dir_recursive(&fixture_path, self.path())
    }

    /// Project root
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Loader reading this project's definitions
    pub fn loader(&self) -> DeclarativeLoader {
        DeclarativeLoader::new(self.path())
    }

    /// Current `conductor.toml`, or defaults
    pub fn config(&self) -> Result<Config> {
        Config::load(self.path()).context("Failed to load project configuration")
    }

    /// Write file to the project
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.path().join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }

        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file: {}", path))?;

        Ok(())
    }

    /// Write a test definition for a qualified test name
    pub fn write_definition(&self, test: &str, content: &str) -> Result<()> {
        let path = self.loader().definition_path(&TestIdentity::parse(test));
        let relative = path
            .strip_prefix(self.path())
            .context("Definition path outside workspace")?
            .to_string_lossy()
            .into_owned();
        self.write_file(&relative, content.as_bytes())
    }

    /// Check if file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }
}

/// Recursively copy directory contents
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
