use quarry_base::hashing::{HashMap, HashSet};

/// The source file was seen by the last refresh scan
pub const ASSET_FILE_FOUND: u32 = 1 << 0;
/// A meta file sits next to the source file
pub const META_FILE_FOUND: u32 = 1 << 1;
/// The meta file exists but is hidden (dot-prefixed)
pub const HIDDEN_META_FILE_FOUND: u32 = 1 << 2;

/// Last-seen modification times for one source file and its meta sidecar,
/// keyed by project-relative path. The refresh scan compares these against
/// the filesystem to decide what needs reimporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetTimeStamp {
    pub modification_date: u64,
    pub meta_modification_date: u64,
    pub refresh_flags: u32,
}

impl AssetTimeStamp {
    pub fn asset_file_found(&self) -> bool {
        self.refresh_flags & ASSET_FILE_FOUND != 0
    }

    pub fn meta_file_found(&self) -> bool {
        self.refresh_flags & (META_FILE_FOUND | HIDDEN_META_FILE_FOUND) != 0
    }
}

#[derive(Default)]
pub struct AssetTimeStamps {
    timestamps: HashMap<String, AssetTimeStamp>,
}

impl AssetTimeStamps {
    pub fn get(
        &self,
        path: &str,
    ) -> Option<AssetTimeStamp> {
        self.timestamps.get(path).copied()
    }

    pub fn set(
        &mut self,
        path: &str,
        timestamp: AssetTimeStamp,
    ) {
        self.timestamps.insert(path.to_string(), timestamp);
    }

    pub fn remove(
        &mut self,
        path: &str,
    ) -> Option<AssetTimeStamp> {
        self.timestamps.remove(path)
    }

    pub fn rename(
        &mut self,
        old_path: &str,
        new_path: &str,
    ) {
        if let Some(timestamp) = self.timestamps.remove(old_path) {
            self.timestamps.insert(new_path.to_string(), timestamp);
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AssetTimeStamp)> {
        self.timestamps.iter()
    }

    /// Drops timestamp entries whose path is no longer known to the
    /// database. Drift here means a previous session died between updating
    /// one map and the other; it is repairable, so warn and move on.
    pub fn remove_orphans(
        &mut self,
        known_paths: &HashSet<String>,
    ) -> usize {
        let orphans: Vec<String> = self
            .timestamps
            .keys()
            .filter(|path| !known_paths.contains(*path))
            .cloned()
            .collect();
        for path in &orphans {
            log::warn!("dropping orphaned timestamp entry for {:?}", path);
            self.timestamps.remove(path);
        }
        orphans.len()
    }
}
