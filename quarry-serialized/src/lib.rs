mod error;
mod endian;
mod type_tree;
mod metadata;
mod object_stream;
mod serialized_file;
mod text_format;

pub use error::{SerializedError, SerializedResult};

pub use endian::{host_needs_swap_for_big_endian, EndianReader, EndianWriter};

pub use type_tree::{
    TypeTree, FLAG_ALIGN_BYTES, FLAG_ANY_CHILD_USES_ALIGN_BYTES, FLAG_IS_ARRAY, FLAG_IS_REFERENCE,
    MAX_TREE_DEPTH,
};

pub use metadata::{
    decode_metadata, encode_metadata, ExternalRef, ExternalRefKind, FileHeader, FileMetadata,
    ObjectIndex, ObjectInfo, CURRENT_FORMAT_VERSION, EXPECTED_VERSION_STRING,
    FORMAT_VERSION_BIG_ID, FORMAT_VERSION_SMALL_ID, HEADER_SIZE, PLATFORM_ANY, PLATFORM_EDITOR,
};

pub use object_stream::{
    read_object_payload, write_object_payload, RemapFn, RemapPolicy, RemapStats, TypeTreeRegistry,
    OBJECT_ALIGNMENT,
};

pub use serialized_file::{PendingObject, SerializedFile, WriteOptions, RESERVED_METADATA_SIZE};

pub use text_format::{
    encode_text_file, scan_text_file, TextObjectEntry, TextObjectSource, TextScanOutcome,
    TEXT_FORMAT_TAG,
};
