use quarry_base::hashing::HashMap;
use quarry_base::Guid;

/// Batch of asset changes delivered to listeners after a refresh or import
/// pass settles. Batched so listeners see one coherent notification instead
/// of a storm of per-file callbacks.
#[derive(Default, Clone)]
pub struct PostprocessNotification {
    pub refreshed: Vec<Guid>,
    pub added: Vec<Guid>,
    pub removed: Vec<Guid>,
    /// Moved assets, keyed by guid, value is the path before the move
    pub moved: HashMap<Guid, String>,
}

impl PostprocessNotification {
    pub fn is_empty(&self) -> bool {
        self.refreshed.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.moved.is_empty()
    }
}

pub type PostprocessListener = Box<dyn FnMut(&PostprocessNotification) + Send>;

/// Accumulates changes during a pass and flushes them to listeners at the
/// end of it.
#[derive(Default)]
pub struct NotificationQueue {
    pending: PostprocessNotification,
    listeners: Vec<PostprocessListener>,
}

impl NotificationQueue {
    pub fn add_listener(
        &mut self,
        listener: PostprocessListener,
    ) {
        self.listeners.push(listener);
    }

    pub fn queue_refreshed(
        &mut self,
        guid: Guid,
    ) {
        self.pending.refreshed.push(guid);
    }

    pub fn queue_added(
        &mut self,
        guid: Guid,
    ) {
        self.pending.added.push(guid);
    }

    pub fn queue_removed(
        &mut self,
        guid: Guid,
    ) {
        self.pending.removed.push(guid);
    }

    pub fn queue_moved(
        &mut self,
        guid: Guid,
        old_path: &str,
    ) {
        self.pending.moved.insert(guid, old_path.to_string());
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Delivers the pending batch and starts a fresh one. No-op when
    /// nothing is pending.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let notification = std::mem::take(&mut self.pending);
        log::debug!(
            "postprocess notification: {} refreshed, {} added, {} removed, {} moved",
            notification.refreshed.len(),
            notification.added.len(),
            notification.removed.len(),
            notification.moved.len()
        );
        for listener in &mut self.listeners {
            listener(&notification);
        }
    }
}
