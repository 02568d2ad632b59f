mod client;
pub mod constants;
mod errors;
mod mime;
pub mod types;

pub use client::DirectUploadClient;
pub use errors::{Result, UploadError};
pub use mime::infer_mime;
pub use types::{
    Checksum, FileMetadata, UploadDestination, UploadReport, UploadRequest, UploadStatus,
    multipart_expected,
};
