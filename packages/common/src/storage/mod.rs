mod error;
mod hash;

pub mod filesystem;

pub use error::StorageError;
pub use filesystem::FilesystemMediaStore;
pub use hash::MediaKey;
