use crate::asset::{
    display_name_of, Asset, AssetType, Representation, RepresentationKind, CLASS_ID_GENERIC,
};
use crate::asset_database::{AssetDatabase, RemovalMode};
use crate::import::registry::{
    AssetImporter, GeneratedObject, ImportContext, ImportOutput, ImporterRegistry,
};
use crate::ledger::FailedImportLedger;
use crate::meta_file::{meta_path_for, MetaFile};
use crate::persistent_manager::PersistentManager;
use crate::project::{modification_time_of, ProjectConfiguration};
use crate::timestamps::{
    AssetTimeStamp, ASSET_FILE_FOUND, HIDDEN_META_FILE_FOUND, META_FILE_FOUND,
};
use crate::{DatabaseError, DatabaseResult};
use quarry_base::hashing::{hash_bytes_128, hash_bytes_64, HashMap, HashSet};
use quarry_base::{Guid, InstanceId, InstanceIdAllocator};
use quarry_serialized::{PendingObject, SerializedFile, WriteOptions};
use std::ops::BitOr;
use std::path::Path;

/// Bumping this reimports every asset in every project, importer versions
/// aside. Last bumped when the representation payload layout changed.
const FORCE_REIMPORT_EPOCH: u32 = 3;

//
// Import options
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions(pub u32);

impl ImportOptions {
    pub const NONE: ImportOptions = ImportOptions(0);
    /// Rewrite the meta sidecar and stop; do not run the importer
    pub const REFRESH_TEXT_META_FILE_ONLY: ImportOptions = ImportOptions(1 << 0);
    /// The refresh scan saw a newer modification time on the source file
    pub const ASSET_WAS_MODIFIED_ON_DISK: ImportOptions = ImportOptions(1 << 1);
    /// This import was scheduled by a refresh pass rather than a direct call
    pub const IMPORT_ASSET_THROUGH_REFRESH: ImportOptions = ImportOptions(1 << 2);
    /// The importer may bail out at a safe point
    pub const MAY_CANCEL_IMPORT: ImportOptions = ImportOptions(1 << 3);
    /// Rewrite the meta sidecar even if nothing about it changed
    pub const FORCE_REWRITE_TEXT_META_FILE: ImportOptions = ImportOptions(1 << 4);

    pub fn contains(
        self,
        other: ImportOptions,
    ) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ImportOptions {
    type Output = ImportOptions;

    fn bitor(
        self,
        rhs: ImportOptions,
    ) -> ImportOptions {
        ImportOptions(self.0 | rhs.0)
    }
}

/// Picks which representation becomes the asset's main one. `None` falls
/// through to the first generated representation.
pub type MainRepresentationPolicy = Box<dyn Fn(&[Representation]) -> Option<usize> + Send>;

#[derive(Debug, Default)]
pub struct RefreshOutcome {
    pub imported: usize,
    pub removed: usize,
    pub failed: usize,
}

//
// The orchestrator
//

/// Drives imports end to end: meta file resolution, crash-ledger
/// discipline, running the importer, committing generated objects to the
/// serialized cache, and updating the asset graph.
pub struct ImportOrchestrator {
    project: ProjectConfiguration,
    registry: ImporterRegistry,
    ledger: FailedImportLedger,
    allocator: InstanceIdAllocator,
    main_representation_policy: Option<MainRepresentationPolicy>,
    /// local file id -> instance id for each committed serialized file
    local_to_instance: HashMap<Guid, HashMap<i64, InstanceId>>,
}

impl ImportOrchestrator {
    pub fn new(
        project: ProjectConfiguration,
        registry: ImporterRegistry,
    ) -> DatabaseResult<ImportOrchestrator> {
        project.ensure_directories()?;
        let ledger = FailedImportLedger::load(&project.failed_ledger_path)?;
        Ok(ImportOrchestrator {
            project,
            registry,
            ledger,
            allocator: InstanceIdAllocator::default(),
            main_representation_policy: None,
            local_to_instance: HashMap::default(),
        })
    }

    pub fn set_main_representation_policy(
        &mut self,
        policy: MainRepresentationPolicy,
    ) {
        self.main_representation_policy = Some(policy);
    }

    pub fn project(&self) -> &ProjectConfiguration {
        &self.project
    }

    pub fn ledger(&self) -> &FailedImportLedger {
        &self.ledger
    }

    pub fn instance_id_for(
        &self,
        guid: Guid,
        local_id: i64,
    ) -> Option<InstanceId> {
        self.local_to_instance.get(&guid)?.get(&local_id).copied()
    }

    /// Brings one source file (or folder) up to date in the database.
    /// Returns the asset's guid, minting one through the meta file if the
    /// file was never seen before.
    pub fn update_asset(
        &mut self,
        database: &mut AssetDatabase,
        persistent_manager: &dyn PersistentManager,
        relative_path: &str,
        parent: Guid,
        options: ImportOptions,
    ) -> DatabaseResult<Guid> {
        profiling::scope!("ImportOrchestrator::update_asset");
        let source_path = self.project.project_root.join(relative_path);
        if !source_path.exists() {
            return Err(DatabaseError::Validation(format!(
                "{:?} does not exist on disk",
                relative_path
            )));
        }
        let is_folder = source_path.is_dir();
        let name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DatabaseError::Validation(format!("{:?} has no usable file name", relative_path))
            })?
            .to_string();
        // Folder names pass through whole; a dot in a folder name is not an
        // extension
        let display = if is_folder {
            name.clone()
        } else {
            display_name_of(&name).to_string()
        };

        // Step 1: resolve the identity through the meta sidecar
        let meta_path = meta_path_for(&source_path);
        let meta_existed = meta_path.exists();
        let mut meta = if meta_existed {
            match MetaFile::read(&meta_path) {
                Ok(meta) => meta,
                Err(e) => {
                    log::warn!(
                        "meta file for {:?} is unreadable ({}); minting a new guid",
                        relative_path,
                        e
                    );
                    MetaFile::new(Guid::new_unique())
                }
            }
        } else {
            MetaFile::new(Guid::new_unique())
        };
        let guid = meta.guid;

        let mut meta_rewritten = false;
        if !meta_existed
            || meta.folder_asset != is_folder
            || options.contains(ImportOptions::FORCE_REWRITE_TEXT_META_FILE)
        {
            meta.folder_asset = is_folder;
            meta.write(&meta_path)?;
            meta_rewritten = true;
        }
        persistent_manager.register_path(relative_path, guid)?;

        if options.contains(ImportOptions::REFRESH_TEXT_META_FILE_ONLY) {
            self.ensure_placeholder(database, guid, parent, &name)?;
            self.record_timestamp(database, relative_path, &source_path, &meta_path);
            return Ok(guid);
        }

        // Step 2: the previous import still stands when nothing changed on
        // disk and the importer that produced it is still the same version
        if !meta_rewritten
            && !options.contains(ImportOptions::ASSET_WAS_MODIFIED_ON_DISK)
            && timestamps_match(database, relative_path, &source_path, &meta_path)
        {
            if let Some(asset) = database.asset(guid) {
                let importer_current = asset.asset_type != AssetType::SerializedAsset
                    || asset.importer_version_hash
                        == self.current_importer_version_hash(&source_path);
                if asset.parent == parent && importer_current {
                    log::debug!("{:?} is up to date; skipping import", relative_path);
                    return Ok(guid);
                }
            }
        }

        // Step 3: a path still in the crash ledger is skipped. Refresh never
        // clears the entry; a crash mid-import leaves a stale timestamp, so
        // retrying on "modified" would loop the crash across sessions. Only
        // force_reimport clears it.
        if self.ledger.contains(relative_path) {
            log::warn!(
                "skipping {:?}: a previous session crashed importing it",
                relative_path
            );
            self.ensure_placeholder(database, guid, parent, &name)?;
            self.record_timestamp(database, relative_path, &source_path, &meta_path);
            return Ok(guid);
        }

        // Step 4: run the right flavor of import
        let previous_hash = database.asset(guid).map(|a| a.hash);
        let (asset_type, importer_class_id, importer_version_hash, representations) = if is_folder {
            (AssetType::FolderAsset, -1, 0, Vec::default())
        } else {
            match self.registry.importer_for_path(&source_path).cloned() {
                None => (AssetType::CopyAsset, -1, 0, Vec::default()),
                Some(importer) => {
                    // Mark before running so a crash inside the importer is
                    // attributed to this path on the next startup
                    self.ledger.mark_failed(relative_path)?;

                    // First imports and imports that also move the asset must
                    // run to completion; a cancel there would leave the graph
                    // half-linked
                    let may_cancel = options.contains(ImportOptions::MAY_CANCEL_IMPORT)
                        && database.asset(guid).map(|a| a.parent) == Some(parent);

                    let empty_settings = serde_json::Map::default();
                    let settings = meta
                        .importer_settings
                        .get(importer.name())
                        .and_then(|v| v.as_object())
                        .unwrap_or(&empty_settings);
                    let context = ImportContext {
                        source_path: &source_path,
                        project_relative_path: relative_path,
                        guid,
                        settings,
                        may_cancel,
                    };

                    match importer.import(&context) {
                        Err(e) => {
                            // Entry stays in the ledger; the failure is
                            // durable until the file changes or the user
                            // forces a reimport
                            log::error!("import of {:?} failed: {}", relative_path, e);
                            self.ensure_placeholder(database, guid, parent, &name)?;
                            self.record_timestamp(
                                database,
                                relative_path,
                                &source_path,
                                &meta_path,
                            );
                            return Err(DatabaseError::ImportFailed {
                                path: relative_path.to_string(),
                                message: e.to_string(),
                            });
                        }
                        Ok(ImportOutput::Cancelled) => {
                            log::debug!("import of {:?} was cancelled", relative_path);
                            self.ledger.clear(relative_path)?;
                            self.ensure_placeholder(database, guid, parent, &name)?;
                            return Ok(guid);
                        }
                        Ok(ImportOutput::Ok(objects)) => {
                            let representations = self.commit_generated_objects(
                                guid,
                                &objects,
                                persistent_manager,
                            )?;
                            self.ledger.clear(relative_path)?;
                            (
                                AssetType::SerializedAsset,
                                importer.importer_class_id(),
                                importer_version_hash_of(importer.as_ref()),
                                representations,
                            )
                        }
                    }
                }
            }
        };

        // Step 5: content hash. Recomputed only when the meta file was
        // rewritten or the source actually changed; otherwise the previous
        // hash stands.
        let hash = if meta_rewritten
            || options.contains(ImportOptions::ASSET_WAS_MODIFIED_ON_DISK)
            || previous_hash.is_none()
        {
            if is_folder {
                hash_bytes_128(relative_path.as_bytes())
            } else {
                hash_bytes_128(&std::fs::read(&source_path)?)
            }
        } else {
            previous_hash.unwrap()
        };

        // Step 6: main representation, via policy, else the first generated
        // one, else a synthesized placeholder
        let main_representation = self
            .main_representation_policy
            .as_ref()
            .and_then(|policy| policy(&representations))
            .and_then(|index| representations.get(index).cloned())
            .or_else(|| representations.first().cloned())
            .unwrap_or_else(|| Representation {
                name: display.clone(),
                object: InstanceId::NULL,
                class_id: CLASS_ID_GENERIC,
                script_class_name: String::default(),
                kind: RepresentationKind::Generic,
                thumbnail: Vec::default(),
                flags: 0,
            });

        // Step 7: commit to the graph
        if database.contains(guid) {
            if database.asset(guid).map(|a| a.parent) != Some(parent) {
                database.move_asset(guid, parent, &name, persistent_manager)?;
            }
            let asset = database.asset_mut(guid).ok_or_else(|| {
                DatabaseError::Inconsistent(format!("asset {} vanished during import", guid))
            })?;
            asset.file_name = name.clone();
            asset.main_representation = Representation {
                name: display.clone(),
                ..main_representation
            };
            asset.representations = representations;
            asset.asset_type = asset_type;
            asset.importer_class_id = importer_class_id;
            asset.importer_version_hash = importer_version_hash;
            asset.hash = hash;
            asset.labels = meta.labels.clone();
        } else {
            database.insert_asset(
                guid,
                Asset {
                    parent,
                    children: Vec::default(),
                    file_name: name.clone(),
                    main_representation: Representation {
                        name: display.clone(),
                        ..main_representation
                    },
                    representations,
                    asset_type,
                    importer_class_id,
                    importer_version_hash,
                    hash,
                    labels: meta.labels.clone(),
                },
            )?;
        }

        // Step 8: timestamps, so the next refresh can tell nothing changed
        self.record_timestamp(database, relative_path, &source_path, &meta_path);

        // Step 9: notify
        database.notifications_mut().queue_refreshed(guid);
        Ok(guid)
    }

    /// Writes one import's generated objects into the asset's serialized
    /// file. A fresh file every time; objects land in the order the
    /// importer produced them, so their local file ids repeat across
    /// reimports of unchanged content.
    fn commit_generated_objects(
        &mut self,
        guid: Guid,
        objects: &[GeneratedObject],
        persistent_manager: &dyn PersistentManager,
    ) -> DatabaseResult<Vec<Representation>> {
        profiling::scope!("commit_generated_objects");
        let path = self.project.serialized_file_for(guid);
        let path_display = path.to_string_lossy().replace('\\', "/");
        let mut file = SerializedFile::initialize_for_write(&path, &WriteOptions::default())?;

        let mut representations = Vec::with_capacity(objects.len());
        let mut local_map = HashMap::default();
        for object in objects {
            // Generated payloads carry references in local file id space
            // already, so writes need no remapping
            let mut identity = |id: i64| Some(id);
            let local_id = file.write_object(
                &PendingObject {
                    class_id: object.class_id,
                    tree: &object.tree,
                    data_driven_shape: false,
                    payload: &object.payload,
                },
                &mut identity,
            )?;

            let instance = self.allocator.allocate_persisted(false);
            local_map.insert(local_id.0, instance);
            persistent_manager.register_persistent_location(instance, local_id, &path_display);
            let mut kind = RepresentationKind::from_class_id(object.class_id);
            if let RepresentationKind::Unknown { class_name, .. } = &mut kind {
                *class_name = object.script_class_name.clone();
            }
            representations.push(Representation {
                name: object.name.clone(),
                object: instance,
                class_id: object.class_id,
                script_class_name: object.script_class_name.clone(),
                kind,
                thumbnail: object.thumbnail.clone(),
                flags: object.flags,
            });
        }
        file.finalize_write()?;
        self.local_to_instance.insert(guid, local_map);
        Ok(representations)
    }

    fn ensure_placeholder(
        &self,
        database: &mut AssetDatabase,
        guid: Guid,
        parent: Guid,
        name: &str,
    ) -> DatabaseResult<()> {
        if !database.contains(guid) {
            database.insert_asset(guid, Asset::new_not_imported(parent, name))?;
        }
        Ok(())
    }

    fn record_timestamp(
        &self,
        database: &mut AssetDatabase,
        relative_path: &str,
        source_path: &Path,
        meta_path: &Path,
    ) {
        let mut refresh_flags = ASSET_FILE_FOUND;
        let meta_modification_date = if meta_path.exists() {
            let hidden = meta_path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false);
            refresh_flags |= if hidden {
                HIDDEN_META_FILE_FOUND
            } else {
                META_FILE_FOUND
            };
            modification_time_of(meta_path)
        } else {
            0
        };
        database.timestamps.set(
            relative_path,
            AssetTimeStamp {
                modification_date: modification_time_of(source_path),
                meta_modification_date,
                refresh_flags,
            },
        );
    }

    /// Version hash the registered importer would stamp on this path
    /// today, or 0 when no importer claims it.
    fn current_importer_version_hash(
        &self,
        source_path: &Path,
    ) -> u32 {
        self.registry
            .importer_for_path(source_path)
            .map(|importer| importer_version_hash_of(importer.as_ref()))
            .unwrap_or(0)
    }

    /// Full refresh pass: scans the source tree, imports anything new or
    /// modified, and drops assets whose files are gone. Import failures are
    /// counted, not fatal; one bad file must not stall the project.
    pub fn refresh(
        &mut self,
        database: &mut AssetDatabase,
        persistent_manager: &dyn PersistentManager,
    ) -> DatabaseResult<RefreshOutcome> {
        profiling::scope!("ImportOrchestrator::refresh");
        let scanned = self.project.scan_source_files()?;
        let scanned_set: HashSet<&String> = scanned.iter().collect();
        let mut outcome = RefreshOutcome::default();

        // Sorted scan order means a folder is processed before anything
        // inside it, so parent guids resolve in one pass
        for relative_path in &scanned {
            let parent = parent_guid_of(relative_path, persistent_manager);
            let source_path = self.project.project_root.join(relative_path);
            let meta_path = meta_path_for(&source_path);

            let unchanged = timestamps_match(database, relative_path, &source_path, &meta_path);
            // An importer version bump invalidates results even when the
            // source file itself has not moved
            let importer_outdated = persistent_manager
                .path_to_guid(relative_path)
                .and_then(|guid| database.asset(guid))
                .map_or(false, |asset| {
                    asset.asset_type == AssetType::SerializedAsset
                        && asset.importer_version_hash
                            != self.current_importer_version_hash(&source_path)
                });
            if unchanged && !importer_outdated {
                continue;
            }

            let mut options = ImportOptions::IMPORT_ASSET_THROUGH_REFRESH;
            if database.timestamps.get(relative_path).is_some() {
                options = options | ImportOptions::ASSET_WAS_MODIFIED_ON_DISK;
            }
            match self.update_asset(database, persistent_manager, relative_path, parent, options)
            {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    log::error!("refresh: {}", e);
                    outcome.failed += 1;
                }
            }
        }

        // Anything tracked but no longer on disk is gone
        let vanished: Vec<String> = database
            .timestamps
            .iter()
            .map(|(path, _)| path.clone())
            .filter(|path| !scanned_set.contains(path))
            .collect();
        for path in vanished {
            if let Some(guid) = persistent_manager.path_to_guid(&path) {
                // Subtree removal may have taken this one out already
                if database.contains(guid) {
                    database.remove_asset(guid, persistent_manager)?;
                    outcome.removed += 1;
                }
            } else {
                database.timestamps.remove(&path);
            }
        }

        database.flush_notifications();
        log::info!(
            "refresh: {} imported, {} removed, {} failed",
            outcome.imported,
            outcome.removed,
            outcome.failed
        );
        Ok(outcome)
    }

    /// Clears any crash-ledger entry and reimports regardless of
    /// timestamps.
    pub fn force_reimport(
        &mut self,
        database: &mut AssetDatabase,
        persistent_manager: &dyn PersistentManager,
        relative_path: &str,
        parent: Guid,
    ) -> DatabaseResult<Guid> {
        self.ledger.clear(relative_path)?;
        self.update_asset(
            database,
            persistent_manager,
            relative_path,
            parent,
            ImportOptions::ASSET_WAS_MODIFIED_ON_DISK
                | ImportOptions::FORCE_REWRITE_TEXT_META_FILE,
        )
    }

    /// Removes an asset: source file, meta sidecar, serialized cache file,
    /// and the database subtree. `MoveToTrash` relocates the source files
    /// instead of deleting them.
    pub fn remove_asset(
        &mut self,
        database: &mut AssetDatabase,
        persistent_manager: &dyn PersistentManager,
        guid: Guid,
        mode: RemovalMode,
    ) -> DatabaseResult<()> {
        profiling::scope!("ImportOrchestrator::remove_asset");
        let relative_path = database.path_of(guid).ok_or_else(|| {
            DatabaseError::Validation(format!("cannot remove unknown asset {}", guid))
        })?;
        let source_path = self.project.project_root.join(&relative_path);
        let meta_path = meta_path_for(&source_path);

        let mut doomed = vec![guid];
        database.collect_all_children(guid, &mut doomed);
        database.remove_asset(guid, persistent_manager)?;

        for doomed_guid in doomed {
            let cache_path = self.project.serialized_file_for(doomed_guid);
            if cache_path.exists() {
                std::fs::remove_file(&cache_path)?;
            }
            self.local_to_instance.remove(&doomed_guid);
        }

        match mode {
            RemovalMode::MoveToTrash => {
                if source_path.exists() {
                    let trashed = self.project.trash_path.join(format!(
                        "{}-{}",
                        guid,
                        source_path
                            .file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("asset")
                    ));
                    std::fs::rename(&source_path, &trashed)?;
                }
                if meta_path.exists() {
                    let trashed_meta = self
                        .project
                        .trash_path
                        .join(format!("{}-meta", guid));
                    std::fs::rename(&meta_path, &trashed_meta)?;
                }
            }
            RemovalMode::DeleteAssets => {
                if source_path.is_dir() {
                    std::fs::remove_dir_all(&source_path)?;
                } else if source_path.exists() {
                    std::fs::remove_file(&source_path)?;
                }
                if meta_path.exists() {
                    std::fs::remove_file(&meta_path)?;
                }
            }
        }
        database.flush_notifications();
        Ok(())
    }
}

/// True when the stored timestamp for this path matches the on-disk state
/// of both the source file and its meta sidecar.
fn timestamps_match(
    database: &AssetDatabase,
    relative_path: &str,
    source_path: &Path,
    meta_path: &Path,
) -> bool {
    database.timestamps.get(relative_path).map_or(false, |t| {
        t.asset_file_found()
            && t.modification_date == modification_time_of(source_path)
            && t.meta_modification_date
                == if meta_path.exists() {
                    modification_time_of(meta_path)
                } else {
                    0
                }
    })
}

/// Parent guid of a project-relative path: the guid bound to its directory,
/// or null for assets directly under the source root.
fn parent_guid_of(
    relative_path: &str,
    persistent_manager: &dyn PersistentManager,
) -> Guid {
    match relative_path.rsplit_once('/') {
        Some((parent_path, _)) if parent_path != "Assets" => persistent_manager
            .path_to_guid(parent_path)
            .unwrap_or(Guid::NULL),
        _ => Guid::NULL,
    }
}

/// Folds the reimport epoch, the importer's own version, and its
/// subprocessor versions into one hash. Name-sorted so registration order
/// cannot change the result.
pub fn importer_version_hash_of(importer: &dyn AssetImporter) -> u32 {
    let mut bytes = Vec::default();
    bytes.extend_from_slice(&FORCE_REIMPORT_EPOCH.to_le_bytes());
    bytes.extend_from_slice(&importer.version().to_le_bytes());
    let mut subprocessors = importer.subprocessor_versions();
    subprocessors.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, version) in subprocessors {
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
        bytes.extend_from_slice(&version.to_le_bytes());
    }
    hash_bytes_64(&bytes) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VersionedImporter {
        version: u32,
        subprocessors: Vec<(String, u32)>,
    }

    impl AssetImporter for VersionedImporter {
        fn name(&self) -> &str {
            "VersionedImporter"
        }

        fn importer_class_id(&self) -> i32 {
            50
        }

        fn version(&self) -> u32 {
            self.version
        }

        fn subprocessor_versions(&self) -> Vec<(String, u32)> {
            self.subprocessors.clone()
        }

        fn supports_extension(
            &self,
            _extension: &str,
        ) -> bool {
            true
        }

        fn import(
            &self,
            _context: &ImportContext,
        ) -> DatabaseResult<ImportOutput> {
            Ok(ImportOutput::Ok(Vec::default()))
        }
    }

    #[test]
    fn version_hash_ignores_subprocessor_order() {
        let a = VersionedImporter {
            version: 2,
            subprocessors: vec![("mips".to_string(), 1), ("compress".to_string(), 4)],
        };
        let b = VersionedImporter {
            version: 2,
            subprocessors: vec![("compress".to_string(), 4), ("mips".to_string(), 1)],
        };
        assert_eq!(
            importer_version_hash_of(&a),
            importer_version_hash_of(&b)
        );
    }

    #[test]
    fn version_hash_changes_with_versions() {
        let a = VersionedImporter {
            version: 2,
            subprocessors: Vec::default(),
        };
        let b = VersionedImporter {
            version: 3,
            subprocessors: Vec::default(),
        };
        assert_ne!(
            importer_version_hash_of(&a),
            importer_version_hash_of(&b)
        );
    }

    #[test]
    fn import_options_compose() {
        let options =
            ImportOptions::ASSET_WAS_MODIFIED_ON_DISK | ImportOptions::MAY_CANCEL_IMPORT;
        assert!(options.contains(ImportOptions::MAY_CANCEL_IMPORT));
        assert!(!options.contains(ImportOptions::REFRESH_TEXT_META_FILE_ONLY));
        assert!(options.contains(ImportOptions::NONE));
    }
}
