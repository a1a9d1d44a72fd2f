use siphasher::sip128::Hasher128;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Default hashmap for quarry. Opts-out of more expensive secure hash.
pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
/// Default hashset for quarry. Opts-out of more expensive secure hash.
pub type HashSet<T> = std::collections::HashSet<T, ahash::RandomState>;

/// 128-bit hash of generated import output. Used to detect content changes
/// across builds and caches without diffing the data itself.
#[derive(
    PartialEq, Eq, Clone, Copy, Default, Hash, Ord, PartialOrd, serde::Serialize, serde::Deserialize,
)]
pub struct ContentHash(pub u128);

impl ContentHash {
    pub const ZERO: ContentHash = ContentHash(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn as_words(&self) -> [u64; 2] {
        [(self.0 >> 64) as u64, self.0 as u64]
    }

    pub fn from_words(words: [u64; 2]) -> Self {
        ContentHash(((words[0] as u128) << 64) | words[1] as u128)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ContentHash({:032x})", self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Hashes the cheap-to-read parts of file metadata (modified time, length).
/// Good enough to detect "did this file change since we last looked" without
/// reading the contents.
pub fn hash_file_metadata(metadata: &std::fs::Metadata) -> u64 {
    let mut hasher = siphasher::sip::SipHasher::default();
    metadata.modified().ok().hash(&mut hasher);
    metadata.len().hash(&mut hasher);
    hasher.finish()
}

pub fn hash_bytes_128(bytes: &[u8]) -> ContentHash {
    let mut hasher = siphasher::sip128::SipHasher::default();
    hasher.write(bytes);
    ContentHash(hasher.finish128().as_u128())
}

pub fn hash_bytes_64(bytes: &[u8]) -> u64 {
    let mut hasher = siphasher::sip::SipHasher::default();
    hasher.write(bytes);
    hasher.finish()
}
