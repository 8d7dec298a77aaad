pub mod engine;
pub mod hash;
pub mod memo;
pub mod scanner;
pub mod service;
pub mod snapshot;

pub use engine::{PassReport, PassStatus, SyncEngine};
pub use hash::{digest_bytes, Blake3Hasher, ContentHasher};
pub use memo::CreatedDirs;
pub use scanner::FileScanner;
pub use service::{Interrupt, SyncService};
pub use snapshot::{FileRecord, TreeSnapshot};
