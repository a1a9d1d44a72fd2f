mod error;

mod asset;
mod asset_database;
mod ledger;
mod meta_file;
mod notifications;
mod persistent_manager;
mod project;
mod timestamps;

pub mod import;

pub use error::{DatabaseError, DatabaseResult};

pub use asset::{
    display_name_of, Asset, AssetType, Representation, RepresentationKind, CLASS_ID_BEHAVIOR,
    CLASS_ID_GENERIC, CLASS_ID_SCRIPT, CLASS_ID_SHADER, NO_IMPORTER_CLASS_ID,
};

pub use asset_database::{
    asset_type_tree, timestamp_type_tree, AssetDatabase, RemovalMode, ASSET_CLASS_ID,
    TIMESTAMP_CLASS_ID,
};

pub use ledger::FailedImportLedger;

pub use meta_file::{meta_path_for, MetaFile, META_FILE_EXTENSION, META_FILE_FORMAT_VERSION};

pub use notifications::{NotificationQueue, PostprocessListener, PostprocessNotification};

pub use persistent_manager::{MemoryPersistentManager, PersistentManager};

pub use project::{modification_time_of, ProjectConfiguration};

pub use timestamps::{
    AssetTimeStamp, AssetTimeStamps, ASSET_FILE_FOUND, HIDDEN_META_FILE_FOUND, META_FILE_FOUND,
};
