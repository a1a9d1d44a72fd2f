use crate::asset::{
    display_name_of, Asset, AssetType, Representation, RepresentationKind, NO_IMPORTER_CLASS_ID,
};
use crate::notifications::{NotificationQueue, PostprocessListener};
use crate::persistent_manager::PersistentManager;
use crate::timestamps::AssetTimeStamps;
use crate::{DatabaseError, DatabaseResult};
use quarry_base::hashing::{HashMap, HashSet};
use quarry_base::{natural_lt, ContentHash, Guid, InstanceId};
use quarry_serialized::{
    EndianReader, EndianWriter, PendingObject, SerializedFile, SerializedResult, TypeTree,
    WriteOptions,
};
use std::path::Path;

/// Class ids of the database's own persisted records.
pub const ASSET_CLASS_ID: i16 = 1000;
pub const TIMESTAMP_CLASS_ID: i16 = 1001;

/// What happens to the source files when an asset is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalMode {
    /// Move source and meta file into the project trash directory
    MoveToTrash,
    /// Delete source and meta file outright
    DeleteAssets,
}

//
// The asset graph
//

/// Guid-addressed graph of every asset the editor knows about, plus the
/// timestamp map the refresh scan runs against. Parent/child edges mirror
/// the folder structure on disk; children stay natural-sorted by name.
#[derive(Default)]
pub struct AssetDatabase {
    assets: HashMap<Guid, Asset>,
    pub timestamps: AssetTimeStamps,
    notifications: NotificationQueue,
}

impl AssetDatabase {
    pub fn asset(
        &self,
        guid: Guid,
    ) -> Option<&Asset> {
        self.assets.get(&guid)
    }

    pub fn asset_mut(
        &mut self,
        guid: Guid,
    ) -> Option<&mut Asset> {
        self.assets.get_mut(&guid)
    }

    pub fn contains(
        &self,
        guid: Guid,
    ) -> bool {
        self.assets.contains_key(&guid)
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn all_guids(&self) -> impl Iterator<Item = Guid> + '_ {
        self.assets.keys().copied()
    }

    /// Guids whose asset has no parent (top level of the source tree).
    pub fn all_root_guids(&self) -> Vec<Guid> {
        let mut roots: Vec<Guid> = self
            .assets
            .iter()
            .filter(|(_, asset)| asset.parent.is_null())
            .map(|(&guid, _)| guid)
            .collect();
        roots.sort_by(|a, b| {
            natural_cmp_names(
                self.assets[a].name(),
                self.assets[b].name(),
            )
        });
        roots
    }

    /// Inserts a new asset and links it under its parent. The guid must be
    /// unused and the parent (when non-null) must already exist.
    pub fn insert_asset(
        &mut self,
        guid: Guid,
        asset: Asset,
    ) -> DatabaseResult<()> {
        if guid.is_null() {
            return Err(DatabaseError::Validation(
                "cannot insert an asset under the null guid".to_string(),
            ));
        }
        if self.assets.contains_key(&guid) {
            return Err(DatabaseError::Validation(format!(
                "guid {} is already in the database",
                guid
            )));
        }
        let parent = asset.parent;
        if !parent.is_null() && !self.assets.contains_key(&parent) {
            return Err(DatabaseError::Validation(format!(
                "parent {} of new asset {:?} is not in the database",
                parent,
                asset.name()
            )));
        }

        self.assets.insert(guid, asset);
        if !parent.is_null() {
            self.link_child(parent, guid);
        }
        self.notifications.queue_added(guid);
        Ok(())
    }

    fn link_child(
        &mut self,
        parent: Guid,
        child: Guid,
    ) {
        let parent_asset = self.assets.get_mut(&parent).unwrap_or_else(|| {
            panic!("link_child: parent {} vanished mid-operation", parent)
        });
        if !parent_asset.children.contains(&child) {
            parent_asset.children.push(child);
        }
        self.sort_children(parent);
    }

    fn unlink_child(
        &mut self,
        parent: Guid,
        child: Guid,
    ) {
        if let Some(parent_asset) = self.assets.get_mut(&parent) {
            parent_asset.children.retain(|&c| c != child);
        }
    }

    /// Re-sorts one folder's children by name, natural order, so `tex2`
    /// comes before `tex10`.
    fn sort_children(
        &mut self,
        parent: Guid,
    ) {
        let parent_asset = match self.assets.get(&parent) {
            Some(asset) => asset,
            None => return,
        };
        let mut children = parent_asset.children.clone();
        children.sort_by(|a, b| {
            let name_a = self.assets.get(a).map(|c| c.name()).unwrap_or("");
            let name_b = self.assets.get(b).map(|c| c.name()).unwrap_or("");
            natural_cmp_names(name_a, name_b)
        });
        self.assets.get_mut(&parent).unwrap().children = children;
    }

    /// Project-relative path of an asset, derived from the parent chain.
    pub fn path_of(
        &self,
        guid: Guid,
    ) -> Option<String> {
        let mut segments = Vec::default();
        let mut current = guid;
        let mut hops = 0;
        while !current.is_null() {
            let asset = self.assets.get(&current)?;
            segments.push(asset.name().to_string());
            current = asset.parent;
            hops += 1;
            if hops > 256 {
                log::error!("parent chain of {} does not terminate", guid);
                return None;
            }
        }
        segments.push("Assets".to_string());
        segments.reverse();
        Some(segments.join("/"))
    }

    /// Depth-first collection of a subtree, tolerating dangling child refs.
    pub fn collect_all_children(
        &self,
        guid: Guid,
        out: &mut Vec<Guid>,
    ) {
        let asset = match self.assets.get(&guid) {
            Some(asset) => asset,
            None => {
                log::warn!("collect_all_children: {} is not in the database", guid);
                return;
            }
        };
        for &child in &asset.children {
            if self.assets.contains_key(&child) {
                out.push(child);
                self.collect_all_children(child, out);
            } else {
                log::warn!("dangling child {} under {}", child, guid);
            }
        }
    }

    /// Moves (or renames) an asset. Validates everything first, then
    /// commits, so a refused move leaves the graph untouched.
    pub fn move_asset(
        &mut self,
        guid: Guid,
        new_parent: Guid,
        new_name: &str,
        persistent_manager: &dyn PersistentManager,
    ) -> DatabaseResult<()> {
        profiling::scope!("AssetDatabase::move_asset");
        if new_name.is_empty() || new_name.contains('/') || new_name.contains('\\') {
            return Err(DatabaseError::Validation(format!(
                "{:?} is not a valid asset name",
                new_name
            )));
        }
        let asset = self.assets.get(&guid).ok_or_else(|| {
            DatabaseError::Validation(format!("cannot move unknown asset {}", guid))
        })?;
        let old_parent = asset.parent;
        let is_folder = asset.is_folder();

        if !new_parent.is_null() {
            let parent_asset = self.assets.get(&new_parent).ok_or_else(|| {
                DatabaseError::Validation(format!("move target folder {} does not exist", new_parent))
            })?;
            if !parent_asset.is_folder() {
                return Err(DatabaseError::Validation(format!(
                    "move target {:?} is not a folder",
                    parent_asset.name()
                )));
            }
        }

        // A folder cannot move into its own subtree
        if is_folder {
            let mut subtree = vec![guid];
            self.collect_all_children(guid, &mut subtree);
            if subtree.contains(&new_parent) {
                return Err(DatabaseError::Validation(format!(
                    "cannot move {} into its own subtree",
                    guid
                )));
            }
        }

        // No sibling collision at the destination
        let sibling_names: Vec<&str> = match self.assets.get(&new_parent) {
            Some(parent_asset) => parent_asset
                .children
                .iter()
                .filter(|&&c| c != guid)
                .filter_map(|c| self.assets.get(c).map(|a| a.name()))
                .collect(),
            None => self
                .assets
                .iter()
                .filter(|(&g, asset)| g != guid && asset.parent.is_null())
                .map(|(_, asset)| asset.name())
                .collect(),
        };
        if sibling_names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(new_name))
        {
            return Err(DatabaseError::Validation(format!(
                "an asset named {:?} already exists at the destination",
                new_name
            )));
        }

        // Validation passed; commit
        let old_path = self.path_of(guid);
        self.unlink_child(old_parent, guid);
        {
            let asset = self.assets.get_mut(&guid).unwrap();
            asset.parent = new_parent;
            asset.file_name = new_name.to_string();
            asset.main_representation.name = if is_folder {
                new_name.to_string()
            } else {
                display_name_of(new_name).to_string()
            };
        }
        if !new_parent.is_null() {
            self.link_child(new_parent, guid);
        }

        if let Some(old_path) = old_path {
            if let Some(new_path) = self.path_of(guid) {
                self.timestamps.rename(&old_path, &new_path);
                persistent_manager.register_path(&new_path, guid)?;
                // Subtree paths all changed too
                let mut subtree = Vec::default();
                self.collect_all_children(guid, &mut subtree);
                for child in subtree {
                    if let Some(child_path) = self.path_of(child) {
                        let old_child_path =
                            format!("{}{}", old_path, &child_path[new_path.len()..]);
                        self.timestamps.rename(&old_child_path, &child_path);
                        persistent_manager.register_path(&child_path, child)?;
                    }
                }
            }
            self.notifications.queue_moved(guid, &old_path);
        }
        Ok(())
    }

    /// Removes an asset and its whole subtree from the graph. Filesystem
    /// side effects (trash or delete) are the caller's job; the mode is
    /// recorded in the notification flow via removed guids either way.
    pub fn remove_asset(
        &mut self,
        guid: Guid,
        persistent_manager: &dyn PersistentManager,
    ) -> DatabaseResult<()> {
        profiling::scope!("AssetDatabase::remove_asset");
        let asset = self.assets.get(&guid).ok_or_else(|| {
            DatabaseError::Validation(format!("cannot remove unknown asset {}", guid))
        })?;
        let parent = asset.parent;
        if !parent.is_null() && !self.assets.contains_key(&parent) {
            return Err(DatabaseError::Inconsistent(format!(
                "asset {} claims parent {} which is not in the database",
                guid, parent
            )));
        }

        let mut doomed = vec![guid];
        self.collect_all_children(guid, &mut doomed);

        self.unlink_child(parent, guid);
        // Children first so a crash mid-removal cannot orphan a subtree
        for &doomed_guid in doomed.iter().rev() {
            if let Some(removed) = self.assets.remove(&doomed_guid) {
                if let Some(path) = self.path_of_removed(&removed) {
                    self.timestamps.remove(&path);
                }
                persistent_manager.unregister_guid(doomed_guid);
                self.notifications.queue_removed(doomed_guid);
            }
        }
        Ok(())
    }

    /// Path of an asset already detached from the graph. Children go first
    /// during removal, so the ancestors are still present to walk.
    fn path_of_removed(
        &self,
        removed: &Asset,
    ) -> Option<String> {
        if removed.parent.is_null() {
            return Some(format!("Assets/{}", removed.name()));
        }
        let parent_path = self.path_of(removed.parent)?;
        Some(format!("{}/{}", parent_path, removed.name()))
    }

    /// Diagnostic pass over the graph. Returns false and logs when edges
    /// disagree; never mutates.
    pub fn verify_consistency(&self) -> bool {
        let mut consistent = true;
        for (&guid, asset) in &self.assets {
            if !asset.parent.is_null() {
                match self.assets.get(&asset.parent) {
                    None => {
                        log::error!("asset {} has missing parent {}", guid, asset.parent);
                        consistent = false;
                    }
                    Some(parent_asset) => {
                        if !parent_asset.children.contains(&guid) {
                            log::error!(
                                "asset {} is not in the child list of its parent {}",
                                guid,
                                asset.parent
                            );
                            consistent = false;
                        }
                    }
                }
            }
            for &child in &asset.children {
                match self.assets.get(&child) {
                    None => {
                        log::error!("asset {} has dangling child {}", guid, child);
                        consistent = false;
                    }
                    Some(child_asset) => {
                        if child_asset.parent != guid {
                            log::error!(
                                "child {} of {} points at a different parent {}",
                                child,
                                guid,
                                child_asset.parent
                            );
                            consistent = false;
                        }
                    }
                }
            }
            if !asset.is_folder() && !asset.children.is_empty() {
                log::error!("non-folder asset {} has children", guid);
                consistent = false;
            }
            if asset.asset_type == AssetType::SerializedAsset
                && asset.importer_class_id == NO_IMPORTER_CLASS_ID
            {
                log::error!(
                    "imported asset {} has no importer class id recorded",
                    guid
                );
                consistent = false;
            }
            // Constant guids address built-in resources outside the graph;
            // one showing up as a node means an identity collision
            if guid.is_constant() {
                log::error!("constant guid {} is registered as a graph node", guid);
                consistent = false;
            }
        }
        consistent
    }

    pub fn add_postprocess_listener(
        &mut self,
        listener: PostprocessListener,
    ) {
        self.notifications.add_listener(listener);
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationQueue {
        &mut self.notifications
    }

    pub fn flush_notifications(&mut self) {
        self.notifications.flush();
    }

    /// Re-registers every asset path with the persistent manager, used
    /// after a load.
    pub fn register_all_paths(
        &self,
        persistent_manager: &dyn PersistentManager,
    ) -> DatabaseResult<()> {
        for &guid in self.assets.keys() {
            if let Some(path) = self.path_of(guid) {
                persistent_manager.register_path(&path, guid)?;
            }
        }
        Ok(())
    }

    //
    // Persistence
    //

    /// Saves the whole graph and timestamp map into one serialized file.
    /// Assets are written guid-sorted so the bytes are deterministic.
    pub fn save(
        &self,
        path: &Path,
    ) -> DatabaseResult<()> {
        profiling::scope!("AssetDatabase::save");
        let mut file = SerializedFile::initialize_for_write(path, &WriteOptions::default())?;
        self.save_into(&mut file)?;
        file.finalize_write()?;
        log::debug!(
            "saved asset database: {} assets, {} timestamps",
            self.assets.len(),
            self.timestamps.len()
        );
        Ok(())
    }

    fn save_into(
        &self,
        file: &mut SerializedFile,
    ) -> DatabaseResult<()> {
        let asset_tree = asset_type_tree();
        let timestamp_tree = timestamp_type_tree();
        let mut identity = |id: i64| Some(id);

        let mut guids: Vec<Guid> = self.assets.keys().copied().collect();
        guids.sort_by_key(|g| g.as_u128());
        for guid in guids {
            let payload = encode_asset(guid, &self.assets[&guid]);
            file.write_object(
                &PendingObject {
                    class_id: ASSET_CLASS_ID,
                    tree: &asset_tree,
                    data_driven_shape: false,
                    payload: &payload,
                },
                &mut identity,
            )?;
        }

        let mut entries: Vec<(&String, _)> = self.timestamps.iter().collect();
        entries.sort_by_key(|(path, _)| path.to_string());
        for (path, timestamp) in entries {
            let payload = encode_timestamp(path, timestamp);
            file.write_object(
                &PendingObject {
                    class_id: TIMESTAMP_CLASS_ID,
                    tree: &timestamp_tree,
                    data_driven_shape: false,
                    payload: &payload,
                },
                &mut identity,
            )?;
        }
        Ok(())
    }

    /// Loads a database saved by [`AssetDatabase::save`]. Unknown record
    /// classes are skipped with a warning; orphaned timestamps are dropped.
    pub fn load(path: &Path) -> DatabaseResult<AssetDatabase> {
        profiling::scope!("AssetDatabase::load");
        let file = SerializedFile::initialize_for_read(path)?;
        let asset_tree = asset_type_tree();
        let timestamp_tree = timestamp_type_tree();

        let mut database = AssetDatabase::default();
        let object_ids: Vec<_> = file.object_ids().collect();
        for local_id in object_ids {
            if !file.is_object_available(local_id) {
                continue;
            }
            let class_id = file
                .metadata()
                .objects
                .get(&local_id)
                .map(|info| info.class_id)
                .unwrap_or(0);
            let mut identity = |id: i64| Some(id);
            match class_id {
                ASSET_CLASS_ID => {
                    let payload = file.read_object(local_id, &asset_tree, &mut identity)?;
                    let (guid, asset) = decode_asset(&payload)?;
                    database.assets.insert(guid, asset);
                }
                TIMESTAMP_CLASS_ID => {
                    let payload = file.read_object(local_id, &timestamp_tree, &mut identity)?;
                    let (path, timestamp) = decode_timestamp(&payload)?;
                    database.timestamps.set(&path, timestamp);
                }
                other => {
                    log::warn!("skipping database record of unknown class {}", other);
                }
            }
        }

        let mut known_paths = HashSet::default();
        for &guid in database.assets.keys() {
            if let Some(path) = database.path_of(guid) {
                known_paths.insert(path);
            }
        }
        database.timestamps.remove_orphans(&known_paths);

        if !database.verify_consistency() {
            return Err(DatabaseError::Inconsistent(
                "loaded asset database fails consistency checks".to_string(),
            ));
        }
        Ok(database)
    }
}

fn natural_cmp_names(
    a: &str,
    b: &str,
) -> std::cmp::Ordering {
    if natural_lt(a, b) {
        std::cmp::Ordering::Less
    } else if natural_lt(b, a) {
        std::cmp::Ordering::Greater
    } else {
        std::cmp::Ordering::Equal
    }
}


//
// Record type trees
//

fn guid_tree(field_name: &str) -> TypeTree {
    TypeTree::record(
        "Guid",
        field_name,
        vec![
            TypeTree::leaf("UInt32", "w0", 4),
            TypeTree::leaf("UInt32", "w1", 4),
            TypeTree::leaf("UInt32", "w2", 4),
            TypeTree::leaf("UInt32", "w3", 4),
        ],
    )
}

fn representation_tree(field_name: &str) -> TypeTree {
    TypeTree::record(
        "Representation",
        field_name,
        vec![
            TypeTree::string("m_Name"),
            TypeTree::leaf("SInt64", "m_Object", 8),
            TypeTree::leaf("SInt16", "m_ClassId", 2),
            TypeTree::string("m_ScriptClassName"),
            TypeTree::string("m_ClassName"),
            TypeTree::array("m_Thumbnail", TypeTree::leaf("UInt8", "data", 1)),
            TypeTree::leaf("UInt32", "m_Flags", 4),
        ],
    )
}

pub fn asset_type_tree() -> TypeTree {
    TypeTree::record(
        "AssetEntry",
        "Base",
        vec![
            guid_tree("m_Guid"),
            guid_tree("m_Parent"),
            TypeTree::array("m_Children", guid_tree("data")),
            TypeTree::string("m_FileName"),
            representation_tree("m_MainRepresentation"),
            TypeTree::array("m_Representations", representation_tree("data")),
            TypeTree::leaf("SInt32", "m_AssetType", 4),
            TypeTree::leaf("SInt32", "m_ImporterClassId", 4),
            TypeTree::leaf("UInt32", "m_ImporterVersionHash", 4),
            TypeTree::leaf("UInt64", "m_HashHi", 8),
            TypeTree::leaf("UInt64", "m_HashLo", 8),
            TypeTree::array("m_Labels", TypeTree::string("data")),
        ],
    )
}

pub fn timestamp_type_tree() -> TypeTree {
    TypeTree::record(
        "TimeStampEntry",
        "Base",
        vec![
            TypeTree::string("m_Path"),
            TypeTree::leaf("UInt64", "m_ModificationDate", 8),
            TypeTree::leaf("UInt64", "m_MetaModificationDate", 8),
            TypeTree::leaf("UInt32", "m_RefreshFlags", 4),
        ],
    )
}

//
// Record payload codecs (native-endian; the serialized layer handles swaps)
//

fn write_string(
    writer: &mut EndianWriter,
    value: &str,
) {
    writer.write_i32(value.len() as i32);
    writer.write_bytes(value.as_bytes());
    writer.align(4);
}

fn read_string(reader: &mut EndianReader) -> SerializedResult<String> {
    let len = reader.read_i32()? as usize;
    let bytes = reader.read_bytes(len)?.to_vec();
    reader.align(4)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_guid(
    writer: &mut EndianWriter,
    guid: Guid,
) {
    for word in guid.0 {
        writer.write_u32(word);
    }
}

fn read_guid(reader: &mut EndianReader) -> SerializedResult<Guid> {
    Ok(Guid([
        reader.read_u32()?,
        reader.read_u32()?,
        reader.read_u32()?,
        reader.read_u32()?,
    ]))
}

fn write_representation(
    writer: &mut EndianWriter,
    representation: &Representation,
) {
    write_string(writer, &representation.name);
    writer.write_i64(representation.object.0);
    writer.write_i16(representation.class_id);
    write_string(writer, &representation.script_class_name);
    let class_name = match &representation.kind {
        RepresentationKind::Unknown { class_name, .. } => class_name.as_str(),
        _ => "",
    };
    write_string(writer, class_name);
    writer.write_i32(representation.thumbnail.len() as i32);
    writer.write_bytes(&representation.thumbnail);
    writer.align(4);
    writer.write_u32(representation.flags);
}

fn read_representation(reader: &mut EndianReader) -> SerializedResult<Representation> {
    let name = read_string(reader)?;
    let object = InstanceId(reader.read_i64()?);
    let class_id = reader.read_i16()?;
    let script_class_name = read_string(reader)?;
    let class_name = read_string(reader)?;
    let thumbnail_len = reader.read_i32()? as usize;
    let thumbnail = reader.read_bytes(thumbnail_len)?.to_vec();
    reader.align(4)?;
    let flags = reader.read_u32()?;
    let mut kind = RepresentationKind::from_class_id(class_id);
    if let RepresentationKind::Unknown {
        class_name: stored, ..
    } = &mut kind
    {
        *stored = class_name;
    }
    Ok(Representation {
        name,
        object,
        class_id,
        script_class_name,
        kind,
        thumbnail,
        flags,
    })
}

fn encode_asset(
    guid: Guid,
    asset: &Asset,
) -> Vec<u8> {
    let mut writer = EndianWriter::new(false);
    write_guid(&mut writer, guid);
    write_guid(&mut writer, asset.parent);
    writer.write_i32(asset.children.len() as i32);
    for &child in &asset.children {
        write_guid(&mut writer, child);
    }
    write_string(&mut writer, &asset.file_name);
    write_representation(&mut writer, &asset.main_representation);
    writer.write_i32(asset.representations.len() as i32);
    for representation in &asset.representations {
        write_representation(&mut writer, representation);
    }
    writer.write_i32(asset.asset_type.to_stored());
    writer.write_i32(asset.importer_class_id);
    writer.write_u32(asset.importer_version_hash);
    let hash_words = asset.hash.as_words();
    writer.write_u64(hash_words[0]);
    writer.write_u64(hash_words[1]);
    writer.write_i32(asset.labels.len() as i32);
    for label in &asset.labels {
        write_string(&mut writer, label);
    }
    writer.into_vec()
}

fn decode_asset(payload: &[u8]) -> DatabaseResult<(Guid, Asset)> {
    let mut reader = EndianReader::new(payload, false);
    let guid = read_guid(&mut reader)?;
    let parent = read_guid(&mut reader)?;
    let child_count = reader.read_i32()?;
    let mut children = Vec::with_capacity(child_count.max(0) as usize);
    for _ in 0..child_count {
        children.push(read_guid(&mut reader)?);
    }
    let file_name = read_string(&mut reader)?;
    let main_representation = read_representation(&mut reader)?;
    let representation_count = reader.read_i32()?;
    let mut representations = Vec::with_capacity(representation_count.max(0) as usize);
    for _ in 0..representation_count {
        representations.push(read_representation(&mut reader)?);
    }
    let stored_type = reader.read_i32()?;
    let asset_type = AssetType::from_stored(stored_type).ok_or_else(|| {
        DatabaseError::Inconsistent(format!("asset {} has unknown type {}", guid, stored_type))
    })?;
    let importer_class_id = reader.read_i32()?;
    let importer_version_hash = reader.read_u32()?;
    let hash = ContentHash::from_words([reader.read_u64()?, reader.read_u64()?]);
    let label_count = reader.read_i32()?;
    let mut labels = Vec::with_capacity(label_count.max(0) as usize);
    for _ in 0..label_count {
        labels.push(read_string(&mut reader)?);
    }

    Ok((
        guid,
        Asset {
            parent,
            children,
            file_name,
            main_representation,
            representations,
            asset_type,
            importer_class_id,
            importer_version_hash,
            hash,
            labels,
        },
    ))
}

fn encode_timestamp(
    path: &str,
    timestamp: &crate::timestamps::AssetTimeStamp,
) -> Vec<u8> {
    let mut writer = EndianWriter::new(false);
    write_string(&mut writer, path);
    writer.write_u64(timestamp.modification_date);
    writer.write_u64(timestamp.meta_modification_date);
    writer.write_u32(timestamp.refresh_flags);
    writer.into_vec()
}

fn decode_timestamp(
    payload: &[u8],
) -> DatabaseResult<(String, crate::timestamps::AssetTimeStamp)> {
    let mut reader = EndianReader::new(payload, false);
    let path = read_string(&mut reader)?;
    Ok((
        path,
        crate::timestamps::AssetTimeStamp {
            modification_date: reader.read_u64()?,
            meta_modification_date: reader.read_u64()?,
            refresh_flags: reader.read_u32()?,
        },
    ))
}
