//! Image references and the names used on a registry


mod digest;
mod name;
mod repository;
mod tag;

pub use digest::Digest;
pub use name::{ImageReference, LIBRARY_PREFIX};
pub use repository::{Repository, RepositoryIter};
pub use tag::Tag;
