//! Persistence of embedded assets as JSON documents on disk.

pub mod document;
pub mod error;
pub mod naming;
pub mod store;

pub use document::{from_document, to_document};
pub use error::StoreError;
pub use naming::{asset_file_name, asset_title};
pub use store::{read_document, AssetStore, SavedAsset, StoredAsset};
