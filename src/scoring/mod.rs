pub mod matcher;
pub mod persistence;
pub mod scorer;
pub mod sync;
pub mod types;
