pub mod format;
pub mod header;

pub mod collect;
pub mod mesh;
pub mod scene;

pub mod pack;
pub mod read;
pub mod write;

pub mod diag;
pub mod io;

/// Tag of the chunk holding the concatenated mesh names.
pub const STRINGS_TAG: [u8; 4] = *b"str0";
/// Tag of the chunk holding the index records.
pub const INDEX_TAG: [u8; 4] = *b"idx0";

pub type HashMap<K, V> = rapidhash::RapidHashMap<K, V>;
pub type HashSet<T> = rapidhash::RapidHashSet<T>;
