use crate::{DatabaseError, DatabaseResult};
use quarry_base::hashing::HashMap;
use quarry_base::{Guid, InstanceId, LocalFileId};
use std::sync::Mutex;

/// Authority for the mapping between project-relative asset paths and guids.
/// Implementations take `&self` so lookups can happen from worker threads
/// while an import is in flight.
pub trait PersistentManager: Send + Sync {
    fn path_to_guid(
        &self,
        path: &str,
    ) -> Option<Guid>;

    fn guid_to_path(
        &self,
        guid: Guid,
    ) -> Option<String>;

    /// Binds a path to a guid, replacing any previous binding for either
    /// side. Constant guids (built-in resources) cannot be rebound.
    fn register_path(
        &self,
        path: &str,
        guid: Guid,
    ) -> DatabaseResult<()>;

    fn unregister_guid(
        &self,
        guid: Guid,
    );

    /// Records where a freshly committed object now lives on disk, so a
    /// later load by instance id can find its file and local id. Called
    /// once per generated object during an import commit.
    fn register_persistent_location(
        &self,
        object: InstanceId,
        local_id: LocalFileId,
        path: &str,
    );

    /// Guids whose upper half is zero address built-in resources and never
    /// correspond to a file on disk.
    fn is_constant_guid(
        &self,
        guid: Guid,
    ) -> bool {
        guid.is_constant()
    }
}

/// In-memory [`PersistentManager`]. The asset database persists the mapping
/// itself as part of its own serialized file, so nothing here touches disk.
#[derive(Default)]
pub struct MemoryPersistentManager {
    inner: Mutex<MemoryPersistentManagerInner>,
}

#[derive(Default)]
struct MemoryPersistentManagerInner {
    path_to_guid: HashMap<String, Guid>,
    guid_to_path: HashMap<Guid, String>,
    locations: HashMap<InstanceId, (String, LocalFileId)>,
}

impl MemoryPersistentManager {
    /// The file and local id an object was last committed to, if any.
    pub fn persistent_location(
        &self,
        object: InstanceId,
    ) -> Option<(String, LocalFileId)> {
        self.inner.lock().unwrap().locations.get(&object).cloned()
    }
}

impl PersistentManager for MemoryPersistentManager {
    fn path_to_guid(
        &self,
        path: &str,
    ) -> Option<Guid> {
        self.inner.lock().unwrap().path_to_guid.get(path).copied()
    }

    fn guid_to_path(
        &self,
        guid: Guid,
    ) -> Option<String> {
        self.inner.lock().unwrap().guid_to_path.get(&guid).cloned()
    }

    fn register_path(
        &self,
        path: &str,
        guid: Guid,
    ) -> DatabaseResult<()> {
        if guid.is_null() {
            return Err(DatabaseError::Validation(format!(
                "cannot bind {:?} to the null guid",
                path
            )));
        }
        if guid.is_constant() {
            return Err(DatabaseError::Validation(format!(
                "cannot bind {:?} to constant guid {}",
                path, guid
            )));
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(old_path) = inner.guid_to_path.insert(guid, path.to_string()) {
            if old_path != path {
                inner.path_to_guid.remove(&old_path);
            }
        }
        if let Some(old_guid) = inner.path_to_guid.insert(path.to_string(), guid) {
            if old_guid != guid {
                inner.guid_to_path.remove(&old_guid);
            }
        }
        Ok(())
    }

    fn unregister_guid(
        &self,
        guid: Guid,
    ) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(path) = inner.guid_to_path.remove(&guid) {
            inner.path_to_guid.remove(&path);
        }
    }

    fn register_persistent_location(
        &self,
        object: InstanceId,
        local_id: LocalFileId,
        path: &str,
    ) {
        self.inner
            .lock()
            .unwrap()
            .locations
            .insert(object, (path.to_string(), local_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_look_up_both_directions() {
        let manager = MemoryPersistentManager::default();
        let guid = Guid::new_unique();
        manager.register_path("Assets/Foo.png", guid).unwrap();
        assert_eq!(manager.path_to_guid("Assets/Foo.png"), Some(guid));
        assert_eq!(
            manager.guid_to_path(guid).as_deref(),
            Some("Assets/Foo.png")
        );
    }

    #[test]
    fn rebinding_a_path_clears_the_old_guid() {
        let manager = MemoryPersistentManager::default();
        let old_guid = Guid::new_unique();
        let new_guid = Guid::new_unique();
        manager.register_path("Assets/Foo.png", old_guid).unwrap();
        manager.register_path("Assets/Foo.png", new_guid).unwrap();
        assert_eq!(manager.path_to_guid("Assets/Foo.png"), Some(new_guid));
        assert_eq!(manager.guid_to_path(old_guid), None);
    }

    #[test]
    fn moving_a_guid_clears_the_old_path() {
        let manager = MemoryPersistentManager::default();
        let guid = Guid::new_unique();
        manager.register_path("Assets/Foo.png", guid).unwrap();
        manager.register_path("Assets/Bar.png", guid).unwrap();
        assert_eq!(manager.path_to_guid("Assets/Foo.png"), None);
        assert_eq!(
            manager.guid_to_path(guid).as_deref(),
            Some("Assets/Bar.png")
        );
    }

    #[test]
    fn persistent_locations_are_recorded_per_object() {
        let manager = MemoryPersistentManager::default();
        let object = InstanceId(2);
        manager.register_persistent_location(object, LocalFileId(1), "Library/Serialized/a.sf");
        assert_eq!(
            manager.persistent_location(object),
            Some(("Library/Serialized/a.sf".to_string(), LocalFileId(1)))
        );
        assert_eq!(manager.persistent_location(InstanceId(4)), None);
    }

    #[test]
    fn constant_guids_are_refused() {
        let manager = MemoryPersistentManager::default();
        let constant = Guid([1, 2, 0, 0]);
        assert!(manager.is_constant_guid(constant));
        assert!(manager.register_path("Assets/Foo.png", constant).is_err());
    }
}
