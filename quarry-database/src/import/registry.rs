use crate::DatabaseResult;
use quarry_base::Guid;
use quarry_serialized::TypeTree;
use std::path::Path;
use std::sync::Arc;

/// Everything an importer gets to look at while running. Importers never
/// touch the database directly; they read the source file and hand back
/// generated objects.
pub struct ImportContext<'a> {
    /// Absolute path of the source file
    pub source_path: &'a Path,
    pub project_relative_path: &'a str,
    pub guid: Guid,
    /// This importer's section of the meta file
    pub settings: &'a serde_json::Map<String, serde_json::Value>,
    /// When set, the importer may return [`ImportOutput::Cancelled`] at a
    /// safe point instead of finishing
    pub may_cancel: bool,
}

/// One object produced by an import, in current in-memory layout. The
/// orchestrator writes these to the asset's serialized file in order, so
/// emitting them in a deterministic order keeps local file ids stable
/// across reimports.
pub struct GeneratedObject {
    pub name: String,
    pub class_id: i16,
    pub script_class_name: String,
    pub tree: TypeTree,
    pub payload: Vec<u8>,
    /// Optional encoded preview image, empty when the importer produces none
    pub thumbnail: Vec<u8>,
    pub flags: u32,
}

pub enum ImportOutput {
    Ok(Vec<GeneratedObject>),
    Cancelled,
}

pub trait AssetImporter: Send + Sync {
    fn name(&self) -> &str;

    /// Stable id recorded on the asset so a later session can tell which
    /// importer produced it
    fn importer_class_id(&self) -> i32;

    /// Bumping this forces a reimport of everything the importer handles
    fn version(&self) -> u32;

    /// Versions of postprocessors or helper stages this importer runs.
    /// Folded into the importer version hash so bumping any of them also
    /// forces reimports.
    fn subprocessor_versions(&self) -> Vec<(String, u32)> {
        Vec::default()
    }

    /// Case-insensitive extension check, without the leading dot
    fn supports_extension(
        &self,
        extension: &str,
    ) -> bool;

    fn import(
        &self,
        context: &ImportContext,
    ) -> DatabaseResult<ImportOutput>;
}

#[derive(Clone, Default)]
pub struct ImporterRegistry {
    importers: Vec<Arc<dyn AssetImporter>>,
}

impl ImporterRegistry {
    /// First registered importer that accepts the file's extension wins.
    pub fn importer_for_path(
        &self,
        path: &Path,
    ) -> Option<&Arc<dyn AssetImporter>> {
        let extension = path.extension().and_then(|e| e.to_str())?;
        self.importers
            .iter()
            .find(|importer| importer.supports_extension(&extension.to_ascii_lowercase()))
    }

    pub fn importer_by_class_id(
        &self,
        importer_class_id: i32,
    ) -> Option<&Arc<dyn AssetImporter>> {
        self.importers
            .iter()
            .find(|importer| importer.importer_class_id() == importer_class_id)
    }

    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }
}

#[derive(Default)]
pub struct ImporterRegistryBuilder {
    importers: Vec<Arc<dyn AssetImporter>>,
}

impl ImporterRegistryBuilder {
    pub fn register<T: AssetImporter + 'static>(
        &mut self,
        importer: T,
    ) -> &mut Self {
        log::debug!("registering importer {:?}", importer.name());
        self.importers.push(Arc::new(importer));
        self
    }

    pub fn build(self) -> ImporterRegistry {
        ImporterRegistry {
            importers: self.importers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubImporter {
        extension: &'static str,
        class_id: i32,
    }

    impl AssetImporter for StubImporter {
        fn name(&self) -> &str {
            "StubImporter"
        }

        fn importer_class_id(&self) -> i32 {
            self.class_id
        }

        fn version(&self) -> u32 {
            1
        }

        fn supports_extension(
            &self,
            extension: &str,
        ) -> bool {
            extension == self.extension
        }

        fn import(
            &self,
            _context: &ImportContext,
        ) -> DatabaseResult<ImportOutput> {
            Ok(ImportOutput::Ok(Vec::default()))
        }
    }

    #[test]
    fn lookup_by_extension_is_case_insensitive() {
        let mut builder = ImporterRegistryBuilder::default();
        builder.register(StubImporter {
            extension: "png",
            class_id: 10,
        });
        builder.register(StubImporter {
            extension: "fbx",
            class_id: 11,
        });
        let registry = builder.build();

        let importer = registry
            .importer_for_path(Path::new("Assets/Foo.PNG"))
            .unwrap();
        assert_eq!(importer.importer_class_id(), 10);
        assert!(registry.importer_for_path(Path::new("Assets/Foo.txt")).is_none());
        assert!(registry.importer_by_class_id(11).is_some());
    }
}
