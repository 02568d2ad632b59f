//! Direct-to-storage upload client for Dataverse-compatible repositories.
//!
//! Negotiates pre-signed upload URLs for a dataset, streams the file to the
//! storage backend (single-part or sequential multipart with an abort on
//! partial failure), and registers the stored object's metadata with the
//! dataset record.

pub mod config;
pub mod direct;

pub use config::Config;
pub use direct::{
    Checksum, DirectUploadClient, FileMetadata, Result, UploadDestination, UploadError,
    UploadReport, UploadRequest, UploadStatus,
};
