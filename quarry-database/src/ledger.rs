use crate::DatabaseResult;
use quarry_base::hashing::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extensions exempt from ledger-driven skipping. Code files are compiled,
/// not imported, and a compiler crash must not blacklist the whole script.
const EXEMPT_EXTENSIONS: &[&str] = &["cs", "js", "boo"];

/// Crash-safe record of imports in flight. A path is written to the ledger
/// before its importer runs and cleared after the import commits; a path
/// still present at startup means a previous session crashed inside that
/// importer, and the file is skipped instead of crashing the editor in a
/// loop.
pub struct FailedImportLedger {
    ledger_path: PathBuf,
    paths: HashSet<String>,
}

impl FailedImportLedger {
    /// Loads whatever the previous session left behind. Entries found here
    /// are survivors of a crash and stay until the user forces a reimport.
    pub fn load(ledger_path: &Path) -> DatabaseResult<FailedImportLedger> {
        let mut paths = HashSet::default();
        match std::fs::read_to_string(ledger_path) {
            Ok(text) => {
                for line in text.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        log::warn!(
                            "previous session crashed while importing {:?}; skipping it",
                            line
                        );
                        paths.insert(line.to_string());
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(FailedImportLedger {
            ledger_path: ledger_path.to_path_buf(),
            paths,
        })
    }

    pub fn contains(
        &self,
        path: &str,
    ) -> bool {
        self.paths.contains(path)
    }

    pub fn is_exempt(path: &str) -> bool {
        Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                EXEMPT_EXTENSIONS
                    .iter()
                    .any(|exempt| e.eq_ignore_ascii_case(exempt))
            })
            .unwrap_or(false)
    }

    /// Marks a path as in flight. Durable before this returns, so a crash
    /// anywhere after the call is attributed to this path.
    pub fn mark_failed(
        &mut self,
        path: &str,
    ) -> DatabaseResult<()> {
        if Self::is_exempt(path) {
            return Ok(());
        }
        if self.paths.insert(path.to_string()) {
            self.rewrite()?;
        }
        Ok(())
    }

    /// Clears a path after its import committed (or was cancelled).
    pub fn clear(
        &mut self,
        path: &str,
    ) -> DatabaseResult<()> {
        if self.paths.remove(path) {
            self.rewrite()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The ledger is tiny, so every mutation rewrites the whole file and
    /// syncs it. Sorted so the on-disk bytes are deterministic.
    fn rewrite(&self) -> DatabaseResult<()> {
        let mut sorted: Vec<&String> = self.paths.iter().collect();
        sorted.sort();
        let mut file = std::fs::File::create(&self.ledger_path)?;
        for path in sorted {
            writeln!(file, "{}", path)?;
        }
        file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn test_ledger_path(name: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let dir = std::env::temp_dir().join(format!(
            "quarry-ledger-test-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("failures.txt")
    }

    #[test]
    fn mark_then_clear_leaves_an_empty_ledger() {
        let path = test_ledger_path("mark-clear");
        let mut ledger = FailedImportLedger::load(&path).unwrap();
        ledger.mark_failed("Assets/Foo.png").unwrap();
        assert!(ledger.contains("Assets/Foo.png"));
        ledger.clear("Assets/Foo.png").unwrap();
        assert!(ledger.is_empty());

        let reloaded = FailedImportLedger::load(&path).unwrap();
        assert!(reloaded.is_empty());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn unclear_entries_survive_a_restart() {
        let path = test_ledger_path("crash");
        let mut ledger = FailedImportLedger::load(&path).unwrap();
        ledger.mark_failed("Assets/Crashy.fbx").unwrap();
        // Simulated crash: drop without clearing
        drop(ledger);

        let reloaded = FailedImportLedger::load(&path).unwrap();
        assert!(reloaded.contains("Assets/Crashy.fbx"));
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }

    #[test]
    fn code_files_are_exempt() {
        assert!(FailedImportLedger::is_exempt("Assets/Player.cs"));
        assert!(FailedImportLedger::is_exempt("Assets/Util.JS"));
        assert!(!FailedImportLedger::is_exempt("Assets/Foo.png"));

        let path = test_ledger_path("exempt");
        let mut ledger = FailedImportLedger::load(&path).unwrap();
        ledger.mark_failed("Assets/Player.cs").unwrap();
        assert!(ledger.is_empty());
        std::fs::remove_dir_all(path.parent().unwrap()).unwrap();
    }
}
