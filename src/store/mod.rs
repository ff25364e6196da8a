pub mod files;
pub mod lock;
pub mod repo;
pub mod sinks;
pub mod wal;
