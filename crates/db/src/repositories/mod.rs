//! Repository structs providing data access for each table.

pub mod clip_repo;

pub use clip_repo::ClipRepo;
