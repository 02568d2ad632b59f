/// File sizes at or above this are expected to be negotiated as multipart.
///
/// The server remains authoritative: the shape of the `uploadurls` response
/// decides which transfer path actually runs. This constant only predicts it.
pub const MULTIPART_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// Header that marks a stored object as provisional until the upload is
/// linked into a dataset, so the backend can garbage-collect strays.
pub const STORAGE_TAG_HEADER: &str = "x-amz-tagging";
pub const STORAGE_TAG_TEMP: &str = "dv-state=temp";

/// Dataverse API-token header.
pub const API_KEY_HEADER: &str = "X-Dataverse-key";

/// Checksum algorithm reported in the file metadata record.
pub const CHECKSUM_ALGORITHM: &str = "MD5";

/// Category every uploaded file is registered under.
pub const DEFAULT_CATEGORY: &str = "Data";
