use crate::{EndianReader, EndianWriter, SerializedError, SerializedResult, TypeTree};
use quarry_base::{Guid, LocalFileId};
use std::collections::BTreeMap;

/// Legacy layout: 32-bit local file identifiers.
pub const FORMAT_VERSION_SMALL_ID: u32 = 13;
/// Current layout: 64-bit ("big id") local file identifiers, persisted
/// id high-water mark, type table present unless stripped.
pub const FORMAT_VERSION_BIG_ID: u32 = 14;
pub const CURRENT_FORMAT_VERSION: u32 = FORMAT_VERSION_BIG_ID;

/// Recorded in every file; checked on decode when the type table has been
/// stripped and safe reads are therefore impossible.
pub const EXPECTED_VERSION_STRING: &str = "quarry-1.0";

pub const PLATFORM_ANY: u32 = 0;
pub const PLATFORM_EDITOR: u32 = 1;

pub const HEADER_SIZE: usize = 20;
const HEADER_MAGIC_RESERVED: [u8; 3] = [0; 3];

fn platform_supported(tag: u32) -> bool {
    tag == PLATFORM_ANY || tag == PLATFORM_EDITOR
}

/// Fixed-size file header. Every multi-byte field is big-endian on disk,
/// independent of the endian flag (which only governs the rest of the file).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    pub metadata_size: u32,
    pub file_size: u32,
    pub version: u32,
    pub data_offset: u32,
    pub big_endian: bool,
}

impl FileHeader {
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut writer = EndianWriter::for_big_endian_disk();
        writer.write_u32(self.metadata_size);
        writer.write_u32(self.file_size);
        writer.write_u32(self.version);
        writer.write_u32(self.data_offset);
        writer.write_u8(self.big_endian as u8);
        writer.write_bytes(&HEADER_MAGIC_RESERVED);
        let bytes = writer.into_vec();
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&bytes);
        out
    }

    pub fn decode(bytes: &[u8]) -> SerializedResult<FileHeader> {
        if bytes.len() < HEADER_SIZE {
            return Err(SerializedError::Corrupt(format!(
                "file header truncated: {} bytes",
                bytes.len()
            )));
        }
        let mut reader =
            EndianReader::new(&bytes[0..HEADER_SIZE], crate::host_needs_swap_for_big_endian());
        let metadata_size = reader.read_u32()?;
        let file_size = reader.read_u32()?;
        let version = reader.read_u32()?;
        let data_offset = reader.read_u32()?;
        let big_endian = reader.read_bool()?;
        Ok(FileHeader {
            metadata_size,
            file_size,
            version,
            data_offset,
            big_endian,
        })
    }
}

/// One entry in the object index: where the object's payload lives and what
/// it is. A destroyed entry is a tombstone; the bytes stay in place so local
/// file ids stay stable for other referrers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectInfo {
    pub byte_start: u32,
    pub byte_size: u32,
    pub type_id: i32,
    pub class_id: i16,
    pub destroyed: bool,
}

/// The object index is the single source of truth for which objects exist in
/// a file. BTreeMap so encode order (ascending local file id) is canonical.
pub type ObjectIndex = BTreeMap<LocalFileId, ObjectInfo>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalRefKind {
    Deprecated,
    Serialized,
    Meta,
}

impl ExternalRefKind {
    pub fn to_u32(self) -> u32 {
        match self {
            ExternalRefKind::Deprecated => 0,
            ExternalRefKind::Serialized => 1,
            ExternalRefKind::Meta => 2,
        }
    }

    pub fn from_u32(value: u32) -> SerializedResult<ExternalRefKind> {
        match value {
            0 => Ok(ExternalRefKind::Deprecated),
            1 => Ok(ExternalRefKind::Serialized),
            2 => Ok(ExternalRefKind::Meta),
            other => Err(SerializedError::Corrupt(format!(
                "unknown external reference kind {}",
                other
            ))),
        }
    }
}

/// Another serialized file this file points into.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalRef {
    pub guid: Guid,
    pub kind: ExternalRefKind,
    pub path_hint: String,
}

/// Decoded metadata block: everything about a serialized file except the
/// object payload bytes themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetadata {
    pub version: u32,
    pub target_platform: u32,
    pub type_trees_enabled: bool,
    /// Ascending by type id; empty when type trees were stripped.
    pub type_table: BTreeMap<i32, TypeTree>,
    pub objects: ObjectIndex,
    pub externals: Vec<ExternalRef>,
    pub version_string: String,
    /// High-water mark for local file ids. Persisted so tombstoned ids are
    /// never reused, even across a close-and-reopen-for-append.
    pub next_local_id: i64,
}

impl Default for FileMetadata {
    fn default() -> Self {
        FileMetadata {
            version: CURRENT_FORMAT_VERSION,
            target_platform: PLATFORM_ANY,
            type_trees_enabled: true,
            type_table: BTreeMap::new(),
            objects: BTreeMap::new(),
            externals: Vec::default(),
            version_string: EXPECTED_VERSION_STRING.to_string(),
            next_local_id: 1,
        }
    }
}

// Minimum encoded sizes, used to reject adversarial counts before allocating
const MIN_TYPE_ENTRY_SIZE: usize = 4 + 14;
const MIN_STRIPPED_TYPE_ENTRY_SIZE: usize = 4;
const MIN_OBJECT_ENTRY_SIZE_V14: usize = 8 + 4 + 4 + 4 + 2 + 1;
const MIN_OBJECT_ENTRY_SIZE_V13: usize = 4 + 4 + 4 + 4 + 2 + 1;
const MIN_EXTERNAL_ENTRY_SIZE: usize = 16 + 4 + 1;

fn check_count(
    what: &str,
    count: usize,
    min_entry_size: usize,
    remaining: usize,
) -> SerializedResult<()> {
    if count > remaining / min_entry_size {
        return Err(SerializedError::Corrupt(format!(
            "declared {} count {} would read past the end of the buffer ({} bytes left)",
            what, count, remaining
        )));
    }
    Ok(())
}

/// Decodes the metadata block that follows the file header. Supports the two
/// most recent on-disk layouts; anything newer (or older) is refused.
pub fn decode_metadata(
    bytes: &[u8],
    version: u32,
    swap_endian: bool,
) -> SerializedResult<FileMetadata> {
    if version > CURRENT_FORMAT_VERSION || version < FORMAT_VERSION_SMALL_ID {
        return Err(SerializedError::UnsupportedVersion(version));
    }

    let mut reader = EndianReader::new(bytes, swap_endian);

    let version_string = reader.read_cstr()?;
    let target_platform = reader.read_u32()?;
    if !platform_supported(target_platform) {
        return Err(SerializedError::UnsupportedPlatform(target_platform));
    }
    let type_trees_enabled = reader.read_bool()?;
    if !type_trees_enabled && version_string != EXPECTED_VERSION_STRING {
        // Without type trees there is no safe-path fallback, so a build
        // mismatch makes the file unreadable.
        return Err(SerializedError::VersionStringMismatch {
            expected: EXPECTED_VERSION_STRING.to_string(),
            found: version_string,
        });
    }

    //
    // Type table
    //
    let type_count = reader.read_u32()? as usize;
    let min_entry = if type_trees_enabled {
        MIN_TYPE_ENTRY_SIZE
    } else {
        MIN_STRIPPED_TYPE_ENTRY_SIZE
    };
    check_count("type", type_count, min_entry, reader.remaining())?;
    let mut type_table = BTreeMap::new();
    for _ in 0..type_count {
        let type_id = reader.read_i32()?;
        if type_trees_enabled {
            let tree = TypeTree::decode(&mut reader)?;
            type_table.insert(type_id, tree);
        }
    }

    //
    // Object index
    //
    let object_count = reader.read_u32()? as usize;
    let min_entry = if version >= FORMAT_VERSION_BIG_ID {
        MIN_OBJECT_ENTRY_SIZE_V14
    } else {
        MIN_OBJECT_ENTRY_SIZE_V13
    };
    check_count("object", object_count, min_entry, reader.remaining())?;
    let mut objects = BTreeMap::new();
    let mut max_local_id = 0i64;
    for _ in 0..object_count {
        let local_id = if version >= FORMAT_VERSION_BIG_ID {
            reader.read_i64()?
        } else {
            reader.read_i32()? as i64
        };
        let byte_start = reader.read_u32()?;
        let byte_size = reader.read_u32()?;
        let type_id = reader.read_i32()?;
        let class_id = reader.read_i16()?;
        let destroyed = reader.read_bool()?;
        max_local_id = max_local_id.max(local_id);
        objects.insert(
            LocalFileId(local_id),
            ObjectInfo {
                byte_start,
                byte_size,
                type_id,
                class_id,
                destroyed,
            },
        );
    }

    let next_local_id = if version >= FORMAT_VERSION_BIG_ID {
        reader.read_i64()?
    } else {
        // Legacy files did not persist the high-water mark
        max_local_id + 1
    };

    //
    // External references
    //
    let external_count = reader.read_u32()? as usize;
    check_count(
        "external reference",
        external_count,
        MIN_EXTERNAL_ENTRY_SIZE,
        reader.remaining(),
    )?;
    let mut externals = Vec::with_capacity(external_count);
    for _ in 0..external_count {
        let guid = Guid([
            reader.read_u32()?,
            reader.read_u32()?,
            reader.read_u32()?,
            reader.read_u32()?,
        ]);
        let kind = ExternalRefKind::from_u32(reader.read_u32()?)?;
        let path_hint = reader.read_cstr()?;
        externals.push(ExternalRef {
            guid,
            kind,
            path_hint,
        });
    }

    Ok(FileMetadata {
        version,
        target_platform,
        type_trees_enabled,
        type_table,
        objects,
        externals,
        version_string,
        next_local_id,
    })
}

/// Encodes the metadata block. Always emits the current format version.
///
/// Deterministic: identical inputs produce byte-identical output (type table
/// ascending by type id, object index ascending by local file id). Content
/// hashing elsewhere relies on this.
pub fn encode_metadata(
    metadata: &FileMetadata,
    swap_endian: bool,
) -> Vec<u8> {
    let mut writer = EndianWriter::new(swap_endian);

    writer.write_cstr(&metadata.version_string);
    writer.write_u32(metadata.target_platform);
    writer.write_bool(metadata.type_trees_enabled);

    writer.write_u32(metadata.type_table.len() as u32);
    for (type_id, tree) in &metadata.type_table {
        writer.write_i32(*type_id);
        if metadata.type_trees_enabled {
            tree.encode(&mut writer);
        }
    }

    writer.write_u32(metadata.objects.len() as u32);
    for (local_id, info) in &metadata.objects {
        writer.write_i64(local_id.0);
        writer.write_u32(info.byte_start);
        writer.write_u32(info.byte_size);
        writer.write_i32(info.type_id);
        writer.write_i16(info.class_id);
        writer.write_bool(info.destroyed);
    }
    writer.write_i64(metadata.next_local_id);

    writer.write_u32(metadata.externals.len() as u32);
    for external in &metadata.externals {
        for word in external.guid.0 {
            writer.write_u32(word);
        }
        writer.write_u32(external.kind.to_u32());
        writer.write_cstr(&external.path_hint);
    }

    writer.into_vec()
}
