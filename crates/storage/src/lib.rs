#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    ActivityRepository, InMemoryRepository, SectionProgressStore, Storage, StorageError,
};
