//! Adapters implementing the domain ports.

pub mod photo;
pub mod sqlite;

pub use photo::LocalPhotoStorage;
