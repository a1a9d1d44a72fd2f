use quarry_base::{ContentHash, Guid, InstanceId};
use std::path::Path;

/// How an asset came to exist in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetType {
    /// Placeholder entry; an import has been scheduled but has not finished
    NotImported,
    /// Produced by an importer and stored in the serialized cache
    SerializedAsset,
    /// The source file itself is the asset; nothing is generated
    CopyAsset,
    /// A directory on disk
    FolderAsset,
}

impl AssetType {
    pub fn to_stored(self) -> i32 {
        match self {
            AssetType::NotImported => 0,
            AssetType::SerializedAsset => 1,
            AssetType::CopyAsset => 2,
            AssetType::FolderAsset => 4,
        }
    }

    pub fn from_stored(value: i32) -> Option<AssetType> {
        Some(match value {
            0 => AssetType::NotImported,
            1 => AssetType::SerializedAsset,
            2 => AssetType::CopyAsset,
            // 3 was a deprecated variant folded into CopyAsset long ago;
            // old databases may still carry it
            3 => AssetType::CopyAsset,
            4 => AssetType::FolderAsset,
            _ => return None,
        })
    }
}

/// Broad kind of a generated representation, derived from its class id.
/// `Unknown` keeps the raw identity so nothing is lost across a save/load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepresentationKind {
    Script,
    Shader,
    Behavior,
    Generic,
    Unknown { class_id: i16, class_name: String },
}

pub const CLASS_ID_GENERIC: i16 = 1;
pub const CLASS_ID_BEHAVIOR: i16 = 114;
pub const CLASS_ID_SCRIPT: i16 = 115;
pub const CLASS_ID_SHADER: i16 = 48;

impl RepresentationKind {
    pub fn from_class_id(class_id: i16) -> RepresentationKind {
        match class_id {
            CLASS_ID_GENERIC => RepresentationKind::Generic,
            CLASS_ID_BEHAVIOR => RepresentationKind::Behavior,
            CLASS_ID_SCRIPT => RepresentationKind::Script,
            CLASS_ID_SHADER => RepresentationKind::Shader,
            other => RepresentationKind::Unknown {
                class_id: other,
                class_name: String::default(),
            },
        }
    }

    pub fn class_id(&self) -> i16 {
        match self {
            RepresentationKind::Generic => CLASS_ID_GENERIC,
            RepresentationKind::Behavior => CLASS_ID_BEHAVIOR,
            RepresentationKind::Script => CLASS_ID_SCRIPT,
            RepresentationKind::Shader => CLASS_ID_SHADER,
            RepresentationKind::Unknown { class_id, .. } => *class_id,
        }
    }
}

/// One importer-generated object surfaced in the UI (thumbnail grid,
/// object picker). An asset has one main representation and any number of
/// secondary ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub name: String,
    pub object: InstanceId,
    pub class_id: i16,
    /// For script-backed objects, the user-facing class name
    pub script_class_name: String,
    pub kind: RepresentationKind,
    /// Encoded preview image, empty until a thumbnail pass fills it in
    pub thumbnail: Vec<u8>,
    pub flags: u32,
}

/// Sentinel for "no importer recorded" in [`Asset::importer_class_id`].
pub const NO_IMPORTER_CLASS_ID: i32 = -1;

/// One node of the asset graph. Parent/children edges mirror the folder
/// structure on disk; children stay natural-sorted by name.
#[derive(Debug, Clone)]
pub struct Asset {
    pub parent: Guid,
    pub children: Vec<Guid>,
    /// On-disk file (or folder) name, extension included. Paths are derived
    /// from this; representation names drop the extension.
    pub file_name: String,
    pub main_representation: Representation,
    pub representations: Vec<Representation>,
    pub asset_type: AssetType,
    pub importer_class_id: i32,
    pub importer_version_hash: u32,
    pub hash: ContentHash,
    pub labels: Vec<String>,
}

impl Asset {
    pub fn new_folder(
        parent: Guid,
        name: &str,
    ) -> Asset {
        Asset {
            parent,
            children: Vec::default(),
            file_name: name.to_string(),
            main_representation: Representation {
                name: name.to_string(),
                object: InstanceId::NULL,
                class_id: CLASS_ID_GENERIC,
                script_class_name: String::default(),
                kind: RepresentationKind::Generic,
                thumbnail: Vec::default(),
                flags: 0,
            },
            representations: Vec::default(),
            asset_type: AssetType::FolderAsset,
            importer_class_id: NO_IMPORTER_CLASS_ID,
            importer_version_hash: 0,
            hash: ContentHash(0),
            labels: Vec::default(),
        }
    }

    pub fn new_not_imported(
        parent: Guid,
        name: &str,
    ) -> Asset {
        let mut asset = Asset::new_folder(parent, name);
        asset.asset_type = AssetType::NotImported;
        asset.main_representation.name = display_name_of(name).to_string();
        asset
    }

    pub fn name(&self) -> &str {
        &self.file_name
    }

    pub fn is_folder(&self) -> bool {
        self.asset_type == AssetType::FolderAsset
    }
}

/// User-facing name for a file: the stem, extension dropped. "hero.png"
/// displays as "hero"; names with no extension pass through unchanged.
pub fn display_name_of(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deprecated_stored_asset_type_maps_to_copy() {
        assert_eq!(AssetType::from_stored(3), Some(AssetType::CopyAsset));
        assert_eq!(AssetType::from_stored(4), Some(AssetType::FolderAsset));
        assert_eq!(AssetType::from_stored(99), None);
    }

    #[test]
    fn stored_asset_type_round_trips() {
        for asset_type in [
            AssetType::NotImported,
            AssetType::SerializedAsset,
            AssetType::CopyAsset,
            AssetType::FolderAsset,
        ] {
            assert_eq!(
                AssetType::from_stored(asset_type.to_stored()),
                Some(asset_type)
            );
        }
    }

    #[test]
    fn display_names_drop_the_extension() {
        assert_eq!(display_name_of("hero.png"), "hero");
        assert_eq!(display_name_of("archive.tar.gz"), "archive.tar");
        assert_eq!(display_name_of("Textures"), "Textures");
        let placeholder = Asset::new_not_imported(Guid::NULL, "icon.png");
        assert_eq!(placeholder.name(), "icon.png");
        assert_eq!(placeholder.main_representation.name, "icon");
    }

    #[test]
    fn representation_kind_keeps_unknown_class_ids() {
        let kind = RepresentationKind::from_class_id(9001);
        assert_eq!(kind.class_id(), 9001);
        assert_eq!(
            RepresentationKind::from_class_id(CLASS_ID_SHADER),
            RepresentationKind::Shader
        );
    }
}
