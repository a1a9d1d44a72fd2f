use crate::{DatabaseError, DatabaseResult};
use std::path::{Path, PathBuf};

/// On-disk layout of one project. Everything the database persists lives
/// under these paths.
#[derive(Debug, Clone)]
pub struct ProjectConfiguration {
    /// Root of the project; source files live under `<root>/Assets`
    pub project_root: PathBuf,
    /// Directory of serialized files holding imported results
    pub serialized_cache_path: PathBuf,
    /// The asset database's own serialized file
    pub database_path: PathBuf,
    /// Failed-import crash ledger
    pub failed_ledger_path: PathBuf,
    /// Removed assets are moved here instead of deleted when the caller
    /// asks for trash semantics
    pub trash_path: PathBuf,
}

impl ProjectConfiguration {
    pub fn for_root(project_root: &Path) -> ProjectConfiguration {
        ProjectConfiguration {
            project_root: project_root.to_path_buf(),
            serialized_cache_path: project_root.join("Library/Serialized"),
            database_path: project_root.join("Library/assetdatabase.sf"),
            failed_ledger_path: project_root.join("Library/failed-imports.txt"),
            trash_path: project_root.join("Trash"),
        }
    }

    pub fn assets_path(&self) -> PathBuf {
        self.project_root.join("Assets")
    }

    pub fn ensure_directories(&self) -> DatabaseResult<()> {
        std::fs::create_dir_all(self.assets_path())?;
        std::fs::create_dir_all(&self.serialized_cache_path)?;
        std::fs::create_dir_all(&self.trash_path)?;
        if let Some(parent) = self.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Path of the serialized file holding one asset's imported objects.
    pub fn serialized_file_for(
        &self,
        guid: quarry_base::Guid,
    ) -> PathBuf {
        self.serialized_cache_path.join(format!("{}.sf", guid))
    }

    /// Project-relative form of an absolute path, with forward slashes so
    /// keys match across platforms.
    pub fn make_relative(
        &self,
        path: &Path,
    ) -> DatabaseResult<String> {
        let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let root = dunce::canonicalize(&self.project_root)
            .unwrap_or_else(|_| self.project_root.clone());
        let relative = canonical.strip_prefix(&root).map_err(|_| {
            DatabaseError::Validation(format!(
                "{:?} is not under the project root {:?}",
                path, self.project_root
            ))
        })?;
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }

    /// Walks the source tree and returns every importable file and folder,
    /// project-relative. Meta sidecars and hidden files are not assets.
    pub fn scan_source_files(&self) -> DatabaseResult<Vec<String>> {
        profiling::scope!("scan_source_files");
        let walker = globwalk::GlobWalkerBuilder::from_patterns(
            self.assets_path(),
            &["**", "!**/.*", "!**/*.meta", "!**/*.tmp"],
        )
        .file_type(globwalk::FileType::FILE | globwalk::FileType::DIR)
        .min_depth(1)
        .build()
        .map_err(|e| DatabaseError::StringError(e.to_string()))?;

        let mut paths = Vec::default();
        for entry in walker {
            let entry = entry.map_err(|e| DatabaseError::StringError(e.to_string()))?;
            paths.push(self.make_relative(entry.path())?);
        }
        paths.sort();
        Ok(paths)
    }
}

/// Modification time of a file as seconds since the epoch, zero when the
/// filesystem cannot say.
pub fn modification_time_of(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn test_project(name: &str) -> ProjectConfiguration {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let root = std::env::temp_dir().join(format!(
            "quarry-project-test-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let project = ProjectConfiguration::for_root(&root);
        project.ensure_directories().unwrap();
        project
    }

    #[test]
    fn scan_skips_meta_and_hidden_files() {
        let project = test_project("scan");
        let assets = project.assets_path();
        std::fs::write(assets.join("Foo.png"), b"png").unwrap();
        std::fs::write(assets.join("Foo.png.meta"), b"meta").unwrap();
        std::fs::write(assets.join(".hidden"), b"x").unwrap();
        std::fs::create_dir(assets.join("Textures")).unwrap();
        std::fs::write(assets.join("Textures/Bar.png"), b"png").unwrap();

        let scanned = project.scan_source_files().unwrap();
        assert_eq!(
            scanned,
            vec![
                "Assets/Foo.png".to_string(),
                "Assets/Textures".to_string(),
                "Assets/Textures/Bar.png".to_string(),
            ]
        );

        std::fs::remove_dir_all(&project.project_root).unwrap();
    }

    #[test]
    fn relative_paths_use_forward_slashes() {
        let project = test_project("relative");
        let file = project.assets_path().join("Foo.png");
        std::fs::write(&file, b"png").unwrap();
        assert_eq!(project.make_relative(&file).unwrap(), "Assets/Foo.png");
        std::fs::remove_dir_all(&project.project_root).unwrap();
    }
}
