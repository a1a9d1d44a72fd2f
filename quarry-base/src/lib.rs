pub mod hashing;

mod guid;
mod instance_id;
mod natural_sort;

pub use guid::Guid;
pub use hashing::ContentHash;
pub use instance_id::InstanceId;
pub use instance_id::InstanceIdAllocator;
pub use instance_id::LocalFileId;
pub use natural_sort::natural_cmp;
pub use natural_sort::natural_lt;
