use crate::import::registry::{ImportContext, ImportOutput, ImporterRegistry};
use crate::project::ProjectConfiguration;
use crate::{DatabaseError, DatabaseResult};
use crossbeam_channel::{Receiver, Sender};
use quarry_base::Guid;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// One import handed to the worker pool. The caller marks the path in the
/// crash ledger before submitting and clears it when committing the
/// outcome, so the ledger discipline is identical to the single-threaded
/// path.
pub struct ImportThreadRequestImport {
    pub relative_path: String,
    pub guid: Guid,
    pub settings: serde_json::Map<String, serde_json::Value>,
    pub may_cancel: bool,
}

pub enum ImportThreadRequest {
    RequestImport(ImportThreadRequestImport),
    Finish,
}

pub struct ImportThreadImportComplete {
    pub relative_path: String,
    pub guid: Guid,
    pub result: DatabaseResult<ImportOutput>,
}

pub enum ImportThreadOutcome {
    Complete(ImportThreadImportComplete),
}

// Worker thread that pulls import jobs off the request channel. The
// channel is FIFO, so Finish markers queued behind requests let a worker
// drain everything before it exits.
struct ImportWorkerThread {
    join_handle: JoinHandle<()>,
}

impl ImportWorkerThread {
    fn new(
        registry: ImporterRegistry,
        project: ProjectConfiguration,
        request_rx: Receiver<ImportThreadRequest>,
        outcome_tx: Sender<ImportThreadOutcome>,
        active_request_count: Arc<AtomicUsize>,
        thread_index: usize,
    ) -> Self {
        let join_handle = std::thread::Builder::new()
            .name(format!("import-worker-{}", thread_index))
            .spawn(move || {
                while let Ok(ImportThreadRequest::RequestImport(request)) = request_rx.recv() {
                    profiling::scope!("import worker job");
                    let result = run_import(&registry, &project, &request);
                    outcome_tx
                        .send(ImportThreadOutcome::Complete(ImportThreadImportComplete {
                            relative_path: request.relative_path,
                            guid: request.guid,
                            result,
                        }))
                        .unwrap();
                    active_request_count.fetch_sub(1, Ordering::Release);
                }
            })
            .unwrap();

        ImportWorkerThread { join_handle }
    }
}

fn run_import(
    registry: &ImporterRegistry,
    project: &ProjectConfiguration,
    request: &ImportThreadRequestImport,
) -> DatabaseResult<ImportOutput> {
    let source_path = project.project_root.join(&request.relative_path);
    let importer = registry
        .importer_for_path(&source_path)
        .ok_or_else(|| DatabaseError::UnknownImporter(request.relative_path.clone()))?;
    let context = ImportContext {
        source_path: &source_path,
        project_relative_path: &request.relative_path,
        guid: request.guid,
        settings: &request.settings,
        may_cancel: request.may_cancel,
    };
    importer.import(&context)
}

/// Pool of worker threads running importers in parallel. Only the import
/// itself runs off-thread; committing outcomes to the database stays with
/// the owning thread.
pub struct ImportThreadPool {
    worker_threads: Vec<ImportWorkerThread>,
    request_tx: Sender<ImportThreadRequest>,
    outcome_rx: Receiver<ImportThreadOutcome>,
    active_request_count: Arc<AtomicUsize>,
}

impl ImportThreadPool {
    pub fn new(
        registry: &ImporterRegistry,
        project: &ProjectConfiguration,
        max_threads: Option<usize>,
    ) -> Self {
        let thread_count = max_threads.unwrap_or_else(num_cpus::get).max(1);
        log::debug!("starting import thread pool with {} threads", thread_count);

        let (request_tx, request_rx) = crossbeam_channel::unbounded::<ImportThreadRequest>();
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded::<ImportThreadOutcome>();
        let active_request_count = Arc::new(AtomicUsize::new(0));

        let worker_threads = (0..thread_count)
            .map(|thread_index| {
                ImportWorkerThread::new(
                    registry.clone(),
                    project.clone(),
                    request_rx.clone(),
                    outcome_tx.clone(),
                    active_request_count.clone(),
                    thread_index,
                )
            })
            .collect();

        ImportThreadPool {
            worker_threads,
            request_tx,
            outcome_rx,
            active_request_count,
        }
    }

    pub fn submit(
        &self,
        request: ImportThreadRequestImport,
    ) {
        self.active_request_count.fetch_add(1, Ordering::Release);
        self.request_tx
            .send(ImportThreadRequest::RequestImport(request))
            .unwrap();
    }

    pub fn active_request_count(&self) -> usize {
        self.active_request_count.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.active_request_count() == 0
    }

    pub fn try_recv_outcome(&self) -> Option<ImportThreadOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Blocks until every submitted import has an outcome, then returns
    /// them all and shuts the workers down. Finish markers queue behind
    /// pending requests, so nothing submitted is dropped.
    pub fn finish(self) -> Vec<ImportThreadOutcome> {
        for _ in &self.worker_threads {
            self.request_tx.send(ImportThreadRequest::Finish).unwrap();
        }
        for worker in self.worker_threads {
            let _ = worker.join_handle.join();
        }
        let mut outcomes = Vec::default();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::registry::{
        AssetImporter, GeneratedObject, ImporterRegistryBuilder,
    };
    use crate::asset::CLASS_ID_GENERIC;
    use quarry_serialized::TypeTree;
    use std::sync::atomic::AtomicU64;

    struct ByteCountImporter;

    impl AssetImporter for ByteCountImporter {
        fn name(&self) -> &str {
            "ByteCountImporter"
        }

        fn importer_class_id(&self) -> i32 {
            77
        }

        fn version(&self) -> u32 {
            1
        }

        fn supports_extension(
            &self,
            extension: &str,
        ) -> bool {
            extension == "bin"
        }

        fn import(
            &self,
            context: &ImportContext,
        ) -> DatabaseResult<ImportOutput> {
            let bytes = std::fs::read(context.source_path)?;
            let mut payload = Vec::default();
            payload.extend_from_slice(&(bytes.len() as i32).to_ne_bytes());
            Ok(ImportOutput::Ok(vec![GeneratedObject {
                name: context.project_relative_path.to_string(),
                class_id: CLASS_ID_GENERIC,
                script_class_name: String::default(),
                tree: TypeTree::record(
                    "ByteCount",
                    "Base",
                    vec![TypeTree::leaf("SInt32", "m_Length", 4)],
                ),
                payload,
                thumbnail: Vec::default(),
                flags: 0,
            }]))
        }
    }

    fn test_project(name: &str) -> ProjectConfiguration {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let root = std::env::temp_dir().join(format!(
            "quarry-pool-test-{}-{}-{}",
            name,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let project = ProjectConfiguration::for_root(&root);
        project.ensure_directories().unwrap();
        project
    }

    #[test]
    fn pool_runs_every_submitted_import() {
        let project = test_project("pool");
        let mut builder = ImporterRegistryBuilder::default();
        builder.register(ByteCountImporter);
        let registry = builder.build();

        let mut expected = Vec::default();
        for i in 0..8 {
            let name = format!("blob{}.bin", i);
            std::fs::write(project.assets_path().join(&name), vec![0u8; i * 10]).unwrap();
            expected.push(format!("Assets/{}", name));
        }

        let pool = ImportThreadPool::new(&registry, &project, Some(4));
        for path in &expected {
            pool.submit(ImportThreadRequestImport {
                relative_path: path.clone(),
                guid: Guid::new_unique(),
                settings: serde_json::Map::default(),
                may_cancel: false,
            });
        }

        let outcomes = pool.finish();
        assert_eq!(outcomes.len(), 8);
        let mut seen: Vec<String> = outcomes
            .iter()
            .map(|outcome| match outcome {
                ImportThreadOutcome::Complete(complete) => {
                    assert!(complete.result.is_ok());
                    complete.relative_path.clone()
                }
            })
            .collect();
        seen.sort();
        assert_eq!(seen, expected);

        std::fs::remove_dir_all(&project.project_root).unwrap();
    }

    #[test]
    fn unknown_extension_reports_an_error_outcome() {
        let project = test_project("unknown");
        std::fs::write(project.assets_path().join("mystery.xyz"), b"??").unwrap();
        let registry = ImporterRegistryBuilder::default().build();

        let pool = ImportThreadPool::new(&registry, &project, Some(1));
        pool.submit(ImportThreadRequestImport {
            relative_path: "Assets/mystery.xyz".to_string(),
            guid: Guid::new_unique(),
            settings: serde_json::Map::default(),
            may_cancel: false,
        });
        let outcomes = pool.finish();
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            ImportThreadOutcome::Complete(complete) => {
                assert!(matches!(
                    complete.result,
                    Err(DatabaseError::UnknownImporter(_))
                ));
            }
        }

        std::fs::remove_dir_all(&project.project_root).unwrap();
    }
}
