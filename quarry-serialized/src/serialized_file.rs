use crate::metadata::{self, FileHeader, FileMetadata, ObjectInfo};
use crate::object_stream::{self, RemapFn, RemapPolicy, RemapStats, TypeTreeRegistry};
use crate::type_tree::TypeTree;
use crate::{SerializedError, SerializedResult, HEADER_SIZE, OBJECT_ALIGNMENT};
use quarry_base::LocalFileId;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Space reserved at the start of a fresh file for the header plus metadata,
/// sized for the common case. When finalized metadata outgrows it the writer
/// falls back to a full copy-rewrite.
pub const RESERVED_METADATA_SIZE: u32 = 4096;

#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub target_platform: u32,
    /// Endianness of the data sections on disk. The header itself is always
    /// big-endian.
    pub big_endian: bool,
    pub remap_policy: RemapPolicy,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            target_platform: metadata::PLATFORM_EDITOR,
            big_endian: false,
            remap_policy: RemapPolicy::default(),
        }
    }
}

fn swap_for(big_endian: bool) -> bool {
    if cfg!(target_endian = "little") {
        big_endian
    } else {
        !big_endian
    }
}

/// One object queued for [`SerializedFile::write_object`]. The payload is in
/// current in-memory layout; references inside it are in instance-id space.
pub struct PendingObject<'a> {
    pub class_id: i16,
    pub tree: &'a TypeTree,
    /// Object kinds whose shape is data-driven (user-authored behaviors) get
    /// a per-instance type tree instead of the per-class shared one.
    pub data_driven_shape: bool,
    pub payload: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileState {
    Reading,
    Writing,
    Closed,
}

/// One physical serialized file across its read-or-write lifetime. Composes
/// the metadata codec and the object stream reader/writer.
pub struct SerializedFile {
    path: Option<PathBuf>,
    state: FileState,
    big_endian: bool,
    swap: bool,
    remap_policy: RemapPolicy,
    metadata: FileMetadata,
    registry: TypeTreeRegistry,
    stats: RemapStats,
    /// Read-side remap counters; atomics so read_object can stay `&self`.
    read_remapped: AtomicU64,
    read_suppressed: AtomicU64,
    /// Pre-existing data section (whole file reads land here too).
    data: Vec<u8>,
    /// Bytes appended by write_object since the file was opened for writing.
    pending: Vec<u8>,
    /// Length of `data` at open time; append offsets start here.
    base_data_len: u32,
    /// data_offset of the on-disk file when opened for append.
    disk_data_offset: u32,
}

impl SerializedFile {
    pub fn initialize_for_read(path: &Path) -> SerializedResult<SerializedFile> {
        profiling::scope!("SerializedFile::initialize_for_read");
        let bytes = std::fs::read(path).map_err(|e| {
            log::error!("failed to read serialized file {:?}: {}", path, e);
            SerializedError::from(e)
        })?;
        let mut file = Self::initialize_for_read_memory(&bytes)?;
        file.path = Some(path.to_path_buf());
        Ok(file)
    }

    /// Read from an in-memory block (tests, network buffers).
    pub fn initialize_for_read_memory(bytes: &[u8]) -> SerializedResult<SerializedFile> {
        let header = FileHeader::decode(bytes)?;

        let metadata_end = HEADER_SIZE + header.metadata_size as usize;
        if metadata_end > bytes.len() || (header.file_size as usize) > bytes.len() {
            return Err(SerializedError::Corrupt(format!(
                "header declares {} metadata bytes / {} file bytes but only {} are present",
                header.metadata_size,
                header.file_size,
                bytes.len()
            )));
        }
        if (header.data_offset as usize) > header.file_size as usize {
            return Err(SerializedError::Corrupt(format!(
                "data offset {} past declared file size {}",
                header.data_offset, header.file_size
            )));
        }

        let swap = swap_for(header.big_endian);
        let metadata =
            metadata::decode_metadata(&bytes[HEADER_SIZE..metadata_end], header.version, swap)?;

        let data = bytes[header.data_offset as usize..header.file_size as usize].to_vec();
        validate_object_ranges(&metadata, data.len())?;

        let registry = TypeTreeRegistry::from_type_table(&metadata.type_table);
        Ok(SerializedFile {
            path: None,
            state: FileState::Reading,
            big_endian: header.big_endian,
            swap,
            remap_policy: RemapPolicy::default(),
            metadata,
            registry,
            stats: RemapStats::default(),
            read_remapped: AtomicU64::new(0),
            read_suppressed: AtomicU64::new(0),
            base_data_len: data.len() as u32,
            disk_data_offset: header.data_offset,
            data,
            pending: Vec::default(),
        })
    }

    pub fn initialize_for_write(
        path: &Path,
        options: &WriteOptions,
    ) -> SerializedResult<SerializedFile> {
        let metadata = FileMetadata {
            target_platform: options.target_platform,
            ..Default::default()
        };
        Ok(SerializedFile {
            path: Some(path.to_path_buf()),
            state: FileState::Writing,
            big_endian: options.big_endian,
            swap: swap_for(options.big_endian),
            remap_policy: options.remap_policy,
            metadata,
            registry: TypeTreeRegistry::default(),
            stats: RemapStats::default(),
            read_remapped: AtomicU64::new(0),
            read_suppressed: AtomicU64::new(0),
            data: Vec::default(),
            pending: Vec::default(),
            base_data_len: 0,
            disk_data_offset: 0,
        })
    }

    /// In-memory writer with no backing path; finalize with
    /// [`SerializedFile::finalize_to_bytes`].
    pub fn initialize_for_write_memory(options: &WriteOptions) -> SerializedFile {
        let mut file = Self::initialize_for_write(Path::new(""), options)
            .expect("memory writer cannot fail to initialize");
        file.path = None;
        file
    }

    /// Re-opens an existing file so new objects can be appended. Local file
    /// ids continue from the persisted high-water mark.
    pub fn initialize_for_append(
        path: &Path,
        options: &WriteOptions,
    ) -> SerializedResult<SerializedFile> {
        let mut file = Self::initialize_for_read(path)?;
        file.state = FileState::Writing;
        file.remap_policy = options.remap_policy;
        Ok(file)
    }

    pub fn metadata(&self) -> &FileMetadata {
        &self.metadata
    }

    /// Combined write-side and read-side remap counters for this file.
    pub fn remap_stats(&self) -> RemapStats {
        RemapStats {
            remapped_references: self.stats.remapped_references
                + self.read_remapped.load(Ordering::Relaxed),
            suppressed_references: self.stats.suppressed_references
                + self.read_suppressed.load(Ordering::Relaxed),
        }
    }

    pub fn object_ids(&self) -> impl Iterator<Item = LocalFileId> + '_ {
        self.metadata.objects.keys().copied()
    }

    pub fn is_object_available(
        &self,
        local_id: LocalFileId,
    ) -> bool {
        self.metadata
            .objects
            .get(&local_id)
            .map(|info| !info.destroyed)
            .unwrap_or(false)
    }

    pub fn add_external(
        &mut self,
        external: metadata::ExternalRef,
    ) -> SerializedResult<()> {
        if self.state != FileState::Writing {
            return Err(SerializedError::InvalidState(
                "externals can only be added while writing",
            ));
        }
        self.metadata.externals.push(external);
        Ok(())
    }

    /// Reads one object payload into the current in-memory layout. `remap`
    /// converts local file ids to instance ids. Safe to call from multiple
    /// threads once the file is open: the index and data are immutable.
    pub fn read_object(
        &self,
        local_id: LocalFileId,
        current_tree: &TypeTree,
        remap: RemapFn,
    ) -> SerializedResult<Vec<u8>> {
        if self.state == FileState::Closed {
            return Err(SerializedError::InvalidState(
                "file is closed; re-open for read",
            ));
        }
        let info = self
            .metadata
            .objects
            .get(&local_id)
            .ok_or(SerializedError::ObjectNotAvailable(local_id))?;
        if info.destroyed {
            return Err(SerializedError::ObjectNotAvailable(local_id));
        }

        let bytes = self.object_bytes(info)?;
        let stored_tree = self.metadata.type_table.get(&info.type_id);
        let mut stats = RemapStats::default();
        let payload = object_stream::read_object_payload(
            bytes,
            stored_tree,
            current_tree,
            self.swap,
            remap,
            self.remap_policy,
            &mut stats,
        )?;
        self.read_remapped
            .fetch_add(stats.remapped_references, Ordering::Relaxed);
        self.read_suppressed
            .fetch_add(stats.suppressed_references, Ordering::Relaxed);
        Ok(payload)
    }

    fn object_bytes(
        &self,
        info: &ObjectInfo,
    ) -> SerializedResult<&[u8]> {
        let start = info.byte_start as usize;
        let end = start + info.byte_size as usize;
        if start < self.data.len() {
            // range validity was checked at open
            Ok(&self.data[start..end])
        } else {
            let start = start - self.data.len();
            let end = end - self.data.len();
            if end > self.pending.len() {
                return Err(SerializedError::Corrupt(format!(
                    "object range {}..{} outside the data section",
                    info.byte_start,
                    info.byte_start + info.byte_size
                )));
            }
            Ok(&self.pending[start..end])
        }
    }

    /// Appends one object, allocating the next local file id.
    pub fn write_object(
        &mut self,
        object: &PendingObject,
        remap: RemapFn,
    ) -> SerializedResult<LocalFileId> {
        let local_id = LocalFileId(self.metadata.next_local_id);
        self.write_object_with_id(local_id, object, remap)?;
        Ok(local_id)
    }

    /// Appends one object under an explicit id. Ids below the high-water
    /// mark are refused: a tombstoned id must never be reused within the
    /// lifetime of the file.
    pub fn write_object_with_id(
        &mut self,
        local_id: LocalFileId,
        object: &PendingObject,
        remap: RemapFn,
    ) -> SerializedResult<()> {
        if self.state != FileState::Writing {
            return Err(SerializedError::InvalidState(
                "write_object requires a file opened for write",
            ));
        }
        if local_id.is_null() || local_id.0 < self.metadata.next_local_id {
            return Err(SerializedError::InvalidState(
                "local file id reuse is not permitted",
            ));
        }

        let encoded = object_stream::write_object_payload(
            object.payload,
            object.tree,
            self.swap,
            remap,
            self.remap_policy,
            &mut self.stats,
        )?;

        // Objects start at aligned offsets within the data section
        while (self.base_data_len as usize + self.pending.len()) % OBJECT_ALIGNMENT != 0 {
            self.pending.push(0);
        }
        let byte_start = self.base_data_len + self.pending.len() as u32;
        self.pending.extend_from_slice(&encoded);

        let type_id =
            self.registry
                .type_id_for(object.class_id, object.tree, object.data_driven_shape);
        self.metadata.objects.insert(
            local_id,
            ObjectInfo {
                byte_start,
                byte_size: encoded.len() as u32,
                type_id,
                class_id: object.class_id,
                destroyed: false,
            },
        );
        self.metadata.next_local_id = local_id.0 + 1;
        Ok(())
    }

    /// Tombstones an object. The bytes stay and the id is never reused, so
    /// other files referring to this id stay consistent.
    pub fn destroy_object(
        &mut self,
        local_id: LocalFileId,
    ) -> SerializedResult<()> {
        if self.state != FileState::Writing {
            return Err(SerializedError::InvalidState(
                "destroy_object requires a file opened for write",
            ));
        }
        let info = self
            .metadata
            .objects
            .get_mut(&local_id)
            .ok_or(SerializedError::ObjectNotAvailable(local_id))?;
        info.destroyed = true;
        Ok(())
    }

    fn prepare_final_metadata(&mut self) -> Vec<u8> {
        self.metadata.type_table = self.registry.type_table().clone();
        self.metadata.type_trees_enabled = true;
        self.metadata.version = metadata::CURRENT_FORMAT_VERSION;
        metadata::encode_metadata(&self.metadata, self.swap)
    }

    fn header_for(
        &self,
        encoded_metadata_len: usize,
        data_offset: u32,
    ) -> FileHeader {
        FileHeader {
            metadata_size: encoded_metadata_len as u32,
            file_size: data_offset + self.base_data_len + self.pending.len() as u32,
            version: metadata::CURRENT_FORMAT_VERSION,
            data_offset,
            big_endian: self.big_endian,
        }
    }

    /// Finalizes an in-memory write and returns the complete file image.
    pub fn finalize_to_bytes(&mut self) -> SerializedResult<Vec<u8>> {
        if self.state != FileState::Writing {
            return Err(SerializedError::InvalidState(
                "finalize requires a file opened for write",
            ));
        }
        let encoded = self.prepare_final_metadata();
        let metadata_end = HEADER_SIZE + encoded.len();
        let data_offset = if metadata_end <= RESERVED_METADATA_SIZE as usize {
            RESERVED_METADATA_SIZE
        } else {
            align_up(metadata_end as u32, OBJECT_ALIGNMENT as u32)
        };
        let header = self.header_for(encoded.len(), data_offset);

        let mut out = Vec::with_capacity(header.file_size as usize);
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(&encoded);
        out.resize(data_offset as usize, 0);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(&self.pending);

        self.close();
        Ok(out)
    }

    /// Finalizes the write: encodes the metadata and patches it into the
    /// reserved slot at the start of the file. When it no longer fits, the
    /// whole file is rewritten through a temporary and atomically replaces
    /// the original. All failure paths before the final rename leave the
    /// original file untouched.
    pub fn finalize_write(&mut self) -> SerializedResult<()> {
        profiling::scope!("SerializedFile::finalize_write");
        if self.state != FileState::Writing {
            return Err(SerializedError::InvalidState(
                "finalize requires a file opened for write",
            ));
        }
        let path = match &self.path {
            Some(path) => path.clone(),
            None => {
                return Err(SerializedError::InvalidState(
                    "no backing path; use finalize_to_bytes",
                ))
            }
        };

        let encoded = self.prepare_final_metadata();
        let metadata_end = HEADER_SIZE + encoded.len();

        let appending = self.disk_data_offset != 0 && path.exists();
        if appending && metadata_end <= self.disk_data_offset as usize {
            self.patch_in_place(&path, &encoded)?;
        } else {
            self.copy_rewrite(&path, &encoded, appending)?;
        }

        self.close();
        Ok(())
    }

    /// The metadata still fits into its preallocated slot: append the new
    /// object bytes at the end and overwrite the header+metadata region.
    fn patch_in_place(
        &mut self,
        path: &Path,
        encoded: &[u8],
    ) -> SerializedResult<()> {
        let data_offset = self.disk_data_offset;
        let header = self.header_for(encoded.len(), data_offset);

        let mut file = std::fs::OpenOptions::new().read(true).write(true).open(path)?;
        file.seek(SeekFrom::Start(data_offset as u64 + self.base_data_len as u64))?;
        file.write_all(&self.pending)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.write_all(encoded)?;
        // Zero the remainder of the reserved slot so stale metadata bytes
        // cannot be misread later
        let reserved_tail = data_offset as usize - HEADER_SIZE - encoded.len();
        file.write_all(&vec![0u8; reserved_tail])?;
        file.sync_all()?;
        Ok(())
    }

    /// Metadata outgrew its slot (or this is a fresh file): write a new
    /// image to a temporary file, stream-copy the bulk object bytes across,
    /// then atomically replace the original path.
    fn copy_rewrite(
        &mut self,
        path: &Path,
        encoded: &[u8],
        copy_existing_from_disk: bool,
    ) -> SerializedResult<()> {
        let metadata_end = HEADER_SIZE + encoded.len();
        let data_offset = if metadata_end <= RESERVED_METADATA_SIZE as usize {
            RESERVED_METADATA_SIZE
        } else {
            align_up(metadata_end as u32, OBJECT_ALIGNMENT as u32)
        };
        let header = self.header_for(encoded.len(), data_offset);

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SerializedError::StringError(format!("invalid path {:?}", path)))?;
        let tmp_path = path.with_file_name(format!("{}.tmp", file_name));

        let result = (|| -> SerializedResult<()> {
            let mut tmp = std::fs::File::create(&tmp_path)?;
            tmp.write_all(&header.encode())?;
            tmp.write_all(encoded)?;
            let pad = data_offset as usize - metadata_end;
            tmp.write_all(&vec![0u8; pad])?;

            if copy_existing_from_disk && self.base_data_len > 0 {
                // Stream the existing data region rather than buffering it
                let mut original = std::fs::File::open(path)?;
                original.seek(SeekFrom::Start(self.disk_data_offset as u64))?;
                let mut taker = original.take(self.base_data_len as u64);
                std::io::copy(&mut taker, &mut tmp)?;
            } else {
                tmp.write_all(&self.data)?;
            }

            tmp.write_all(&self.pending)?;
            tmp.sync_all()?;
            Ok(())
        })();

        if let Err(e) = result {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }

        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn close(&mut self) {
        // Drop the read cache promptly to bound memory
        self.data = Vec::default();
        self.pending = Vec::default();
        self.state = FileState::Closed;
    }
}

fn align_up(
    value: u32,
    alignment: u32,
) -> u32 {
    (value + alignment - 1) / alignment * alignment
}

fn validate_object_ranges(
    metadata: &FileMetadata,
    data_len: usize,
) -> SerializedResult<()> {
    let mut ranges: Vec<(u32, u32)> = Vec::with_capacity(metadata.objects.len());
    for (local_id, info) in &metadata.objects {
        let end = info.byte_start as u64 + info.byte_size as u64;
        if end > data_len as u64 {
            return Err(SerializedError::Corrupt(format!(
                "object {:?} range {}..{} outside the {}-byte data section",
                local_id, info.byte_start, end, data_len
            )));
        }
        ranges.push((info.byte_start, info.byte_start + info.byte_size));
    }
    ranges.sort_unstable();
    for pair in ranges.windows(2) {
        if pair[1].0 < pair[0].1 {
            return Err(SerializedError::Corrupt(format!(
                "object ranges {}..{} and {}..{} overlap",
                pair[0].0, pair[0].1, pair[1].0, pair[1].1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ExternalRef, ExternalRefKind};
    use crate::EndianWriter;
    use quarry_base::Guid;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn test_dir(name: &str) -> PathBuf {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let dir = std::env::temp_dir().join(format!(
            "quarry-serialized-test-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn simple_tree() -> TypeTree {
        TypeTree::record(
            "Thing",
            "Base",
            vec![
                TypeTree::leaf("SInt32", "m_Value", 4),
                TypeTree::leaf("float", "m_Weight", 4),
            ],
        )
    }

    fn simple_payload(
        value: i32,
        weight: f32,
    ) -> Vec<u8> {
        let mut writer = EndianWriter::new(false);
        writer.write_i32(value);
        writer.write_f32(weight);
        writer.into_vec()
    }

    fn identity() -> impl FnMut(i64) -> Option<i64> {
        |id| Some(id)
    }

    #[test]
    fn write_finalize_reopen_read_round_trip() {
        let tree = simple_tree();
        let mut file = SerializedFile::initialize_for_write_memory(&WriteOptions::default());
        let mut remap = identity();
        let id_a = file
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(7, 1.5),
                },
                &mut remap,
            )
            .unwrap();
        let id_b = file
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(-2, 0.25),
                },
                &mut remap,
            )
            .unwrap();
        file.add_external(ExternalRef {
            guid: Guid([9, 9, 9, 9]),
            kind: ExternalRefKind::Serialized,
            path_hint: "library/builtin".to_string(),
        })
        .unwrap();
        let bytes = file.finalize_to_bytes().unwrap();

        let reopened = SerializedFile::initialize_for_read_memory(&bytes).unwrap();
        assert_eq!(reopened.metadata().externals.len(), 1);
        let mut remap = identity();
        assert_eq!(
            reopened.read_object(id_a, &tree, &mut remap).unwrap(),
            simple_payload(7, 1.5)
        );
        let mut remap = identity();
        assert_eq!(
            reopened.read_object(id_b, &tree, &mut remap).unwrap(),
            simple_payload(-2, 0.25)
        );
    }

    #[test]
    fn read_side_suppressions_show_up_in_remap_stats() {
        let tree = TypeTree::record(
            "Renderer",
            "Base",
            vec![
                TypeTree::leaf("SInt32", "m_Enabled", 4),
                TypeTree::reference("PPtr<Material>", "m_Material"),
            ],
        );
        let mut payload = EndianWriter::new(false);
        payload.write_i32(1);
        payload.write_i32(0);
        payload.write_i64(42);

        let mut file = SerializedFile::initialize_for_write_memory(&WriteOptions::default());
        let mut remap = identity();
        let id = file
            .write_object(
                &PendingObject {
                    class_id: 23,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &payload.into_vec(),
                },
                &mut remap,
            )
            .unwrap();
        let bytes = file.finalize_to_bytes().unwrap();

        let reopened = SerializedFile::initialize_for_read_memory(&bytes).unwrap();
        let mut unresolved = |_: i64| None;
        let out = reopened.read_object(id, &tree, &mut unresolved).unwrap();

        let mut reader = crate::EndianReader::new(&out, false);
        reader.read_i32().unwrap();
        assert_eq!(reader.read_i32().unwrap(), 0);
        assert_eq!(reader.read_i64().unwrap(), 0);
        assert_eq!(reopened.remap_stats().suppressed_references, 1);
    }

    #[test]
    fn object_payloads_are_aligned() {
        let tree = simple_tree();
        let mut file = SerializedFile::initialize_for_write_memory(&WriteOptions::default());
        let mut remap = identity();
        for _ in 0..3 {
            file.write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(1, 1.0),
                },
                &mut remap,
            )
            .unwrap();
        }
        for info in file.metadata.objects.values() {
            assert_eq!(info.byte_start as usize % OBJECT_ALIGNMENT, 0);
        }
    }

    #[test]
    fn tombstoned_object_is_not_available_and_id_is_not_reused() {
        let tree = simple_tree();
        let dir = test_dir("tombstone");
        let path = dir.join("objects.sf");

        let mut file =
            SerializedFile::initialize_for_write(&path, &WriteOptions::default()).unwrap();
        let mut remap = identity();
        let id_a = file
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(7, 1.5),
                },
                &mut remap,
            )
            .unwrap();
        file.destroy_object(id_a).unwrap();
        file.finalize_write().unwrap();

        let reopened = SerializedFile::initialize_for_read(&path).unwrap();
        let mut remap = identity();
        assert!(matches!(
            reopened.read_object(id_a, &tree, &mut remap),
            Err(SerializedError::ObjectNotAvailable(_))
        ));

        // Re-open for append: the tombstoned id must not come back
        let mut appended =
            SerializedFile::initialize_for_append(&path, &WriteOptions::default()).unwrap();
        assert!(matches!(
            appended.write_object_with_id(
                id_a,
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(1, 1.0),
                },
                &mut identity(),
            ),
            Err(SerializedError::InvalidState(_))
        ));
        let mut remap = identity();
        let id_b = appended
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(2, 2.0),
                },
                &mut remap,
            )
            .unwrap();
        assert!(id_b > id_a);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn append_patches_metadata_in_place() {
        let tree = simple_tree();
        let dir = test_dir("append");
        let path = dir.join("objects.sf");

        let mut file =
            SerializedFile::initialize_for_write(&path, &WriteOptions::default()).unwrap();
        let mut remap = identity();
        let id_a = file
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(7, 1.5),
                },
                &mut remap,
            )
            .unwrap();
        file.finalize_write().unwrap();

        let mut appended =
            SerializedFile::initialize_for_append(&path, &WriteOptions::default()).unwrap();
        let mut remap = identity();
        let id_b = appended
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(100, 3.0),
                },
                &mut remap,
            )
            .unwrap();
        appended.finalize_write().unwrap();

        let reopened = SerializedFile::initialize_for_read(&path).unwrap();
        let mut remap = identity();
        assert_eq!(
            reopened.read_object(id_a, &tree, &mut remap).unwrap(),
            simple_payload(7, 1.5)
        );
        let mut remap = identity();
        assert_eq!(
            reopened.read_object(id_b, &tree, &mut remap).unwrap(),
            simple_payload(100, 3.0)
        );

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn metadata_overflow_falls_back_to_copy_rewrite() {
        let tree = simple_tree();
        let dir = test_dir("overflow");
        let path = dir.join("objects.sf");

        let mut file =
            SerializedFile::initialize_for_write(&path, &WriteOptions::default()).unwrap();
        let mut remap = identity();
        let first_id = file
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(7, 1.5),
                },
                &mut remap,
            )
            .unwrap();
        file.finalize_write().unwrap();

        // Blow the reserved metadata slot with many distinct per-instance
        // type trees
        let mut appended =
            SerializedFile::initialize_for_append(&path, &WriteOptions::default()).unwrap();
        let mut written = Vec::default();
        for i in 0..200 {
            let per_instance = TypeTree::record(
                "UserScript",
                "Base",
                vec![TypeTree::leaf(
                    "SInt32",
                    &format!("m_GeneratedFieldWithALongName{:04}", i),
                    4,
                )],
            );
            let payload = {
                let mut writer = EndianWriter::new(false);
                writer.write_i32(i);
                writer.into_vec()
            };
            let mut remap = identity();
            let id = appended
                .write_object(
                    &PendingObject {
                        class_id: 114,
                        tree: &per_instance,
                        data_driven_shape: true,
                        payload: &payload,
                    },
                    &mut remap,
                )
                .unwrap();
            written.push((id, per_instance, i));
        }
        appended.finalize_write().unwrap();

        let reopened = SerializedFile::initialize_for_read(&path).unwrap();
        assert!(reopened.metadata().objects.len() == 201);
        let mut remap = identity();
        assert_eq!(
            reopened.read_object(first_id, &tree, &mut remap).unwrap(),
            simple_payload(7, 1.5)
        );
        for (id, per_instance, value) in &written {
            let mut remap = identity();
            let payload = reopened.read_object(*id, per_instance, &mut remap).unwrap();
            let mut reader = crate::EndianReader::new(&payload, false);
            assert_eq!(reader.read_i32().unwrap(), *value);
        }
        // No temporary file left behind
        assert!(!path.with_file_name("objects.sf.tmp").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reads_are_refused_after_close() {
        let tree = simple_tree();
        let mut file = SerializedFile::initialize_for_write_memory(&WriteOptions::default());
        let mut remap = identity();
        let id = file
            .write_object(
                &PendingObject {
                    class_id: 4,
                    tree: &tree,
                    data_driven_shape: false,
                    payload: &simple_payload(7, 1.5),
                },
                &mut remap,
            )
            .unwrap();
        let _bytes = file.finalize_to_bytes().unwrap();

        let mut remap = identity();
        assert!(matches!(
            file.read_object(id, &tree, &mut remap),
            Err(SerializedError::InvalidState(_))
        ));
    }

    #[test]
    fn overlapping_object_ranges_are_corrupt() {
        let tree = simple_tree();
        let mut file = SerializedFile::initialize_for_write_memory(&WriteOptions::default());
        let mut remap = identity();
        file.write_object(
            &PendingObject {
                class_id: 4,
                tree: &tree,
                data_driven_shape: false,
                payload: &simple_payload(7, 1.5),
            },
            &mut remap,
        )
        .unwrap();
        // Corrupt the index before finalizing: second entry overlaps the first
        file.metadata.objects.insert(
            LocalFileId(90),
            ObjectInfo {
                byte_start: 4,
                byte_size: 8,
                type_id: 1,
                class_id: 4,
                destroyed: false,
            },
        );
        file.metadata.next_local_id = 91;
        let bytes = file.finalize_to_bytes().unwrap();

        assert!(matches!(
            SerializedFile::initialize_for_read_memory(&bytes),
            Err(SerializedError::Corrupt(_))
        ));
    }
}
