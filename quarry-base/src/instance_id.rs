use std::fmt;

/// Process-wide, run-specific identifier for one in-memory object.
///
/// Negative ids are memory-only objects that have never been persisted.
/// Positive ids were assigned when the object was loaded from (or committed
/// to) a serialized file. Ids advance in steps of two so the low bit is free
/// to record whether the id was handed out as part of a paired allocation.
#[derive(PartialEq, Eq, Clone, Copy, Default, Hash, Ord, PartialOrd)]
pub struct InstanceId(pub i64);

impl InstanceId {
    pub const NULL: InstanceId = InstanceId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn is_memory_only(&self) -> bool {
        self.0 < 0
    }

    pub fn is_persisted(&self) -> bool {
        self.0 > 0
    }

    pub fn is_paired(&self) -> bool {
        (self.0 & 1) != 0
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

/// Identifier for one object local to a single serialized file.
///
/// Stable across process runs (unlike [`InstanceId`]) and monotonic within
/// one file, so files remain self-consistent even when instance ids get
/// reassigned between runs. Zero is the null reference.
#[derive(
    PartialEq,
    Eq,
    Clone,
    Copy,
    Default,
    Hash,
    Ord,
    PartialOrd,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct LocalFileId(pub i64);

impl LocalFileId {
    pub const NULL: LocalFileId = LocalFileId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn next(self) -> LocalFileId {
        LocalFileId(self.0 + 1)
    }
}

impl fmt::Debug for LocalFileId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "LocalFileId({})", self.0)
    }
}

/// Hands out instance ids for one process run. Persisted ids count up from
/// two, memory-only ids count down from minus two, both in steps of two so
/// the parity bit stays available for the paired flag.
pub struct InstanceIdAllocator {
    next_persisted: i64,
    next_memory: i64,
}

impl Default for InstanceIdAllocator {
    fn default() -> Self {
        InstanceIdAllocator {
            next_persisted: 2,
            next_memory: -2,
        }
    }
}

impl InstanceIdAllocator {
    pub fn allocate_persisted(
        &mut self,
        paired: bool,
    ) -> InstanceId {
        let id = self.next_persisted;
        self.next_persisted += 2;
        InstanceId(if paired { id | 1 } else { id })
    }

    pub fn allocate_memory_only(
        &mut self,
        paired: bool,
    ) -> InstanceId {
        let id = self.next_memory;
        self.next_memory -= 2;
        InstanceId(if paired { id | 1 } else { id })
    }
}
