pub mod bus;
pub mod keys;
pub mod seed;
pub mod store;

pub use bus::{ChangeBus, ChangeEvent, Topic};
pub use seed::{initialize, InitReport, SeedData};
pub use store::{Database, FileBackend, MemoryBackend, StorageBackend, StoreError, Transaction};
