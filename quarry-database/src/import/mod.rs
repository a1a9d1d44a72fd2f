mod orchestrator;
mod registry;
mod thread_pool;

pub use orchestrator::{
    importer_version_hash_of, ImportOptions, ImportOrchestrator, MainRepresentationPolicy,
    RefreshOutcome,
};
pub use registry::{
    AssetImporter, GeneratedObject, ImportContext, ImportOutput, ImporterRegistry,
    ImporterRegistryBuilder,
};
pub use thread_pool::{
    ImportThreadImportComplete, ImportThreadOutcome, ImportThreadPool, ImportThreadRequest,
    ImportThreadRequestImport,
};
