use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::constants::{CHECKSUM_ALGORITHM, DEFAULT_CATEGORY, MULTIPART_THRESHOLD};
use super::errors::UploadError;

/// One upload job: which dataset, which file, optional description.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Persistent dataset identifier, a DOI without the `doi:` prefix.
    pub persistent_id: String,
    pub file_path: PathBuf,
    pub description: Option<String>,
}

impl UploadRequest {
    pub fn new(persistent_id: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            persistent_id: persistent_id.into(),
            file_path: file_path.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Predicts whether negotiation will hand out a multipart destination for a
/// file of the given size. The response shape is still authoritative.
pub fn multipart_expected(file_size: u64) -> bool {
    file_size >= MULTIPART_THRESHOLD
}

/// `GET .../uploadurls` response envelope.
#[derive(Debug, Deserialize)]
pub struct UploadUrlsResponse {
    pub data: UploadUrlsData,
}

/// Raw negotiation payload as the server sends it. Parsed exactly once into
/// an [`UploadDestination`]; nothing downstream touches this again.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlsData {
    pub storage_identifier: String,
    pub url: Option<String>,
    pub urls: Option<BTreeMap<u32, String>>,
    pub part_size: Option<u64>,
    pub complete: Option<String>,
    pub abort: Option<String>,
}

/// Negotiated pre-signed destination.
#[derive(Debug, Clone)]
pub enum UploadDestination {
    Single {
        storage_identifier: String,
        url: String,
    },
    Multipart {
        storage_identifier: String,
        /// Part index (1-based, contiguous) to pre-signed URL.
        part_urls: BTreeMap<u32, String>,
        /// Chunk size for every part except possibly the last.
        part_size: u64,
        /// Relative paths, resolved against the repository base URL.
        complete_path: String,
        abort_path: String,
    },
}

impl UploadDestination {
    pub fn storage_identifier(&self) -> &str {
        match self {
            Self::Single {
                storage_identifier, ..
            }
            | Self::Multipart {
                storage_identifier, ..
            } => storage_identifier,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart { .. })
    }
}

impl TryFrom<UploadUrlsData> for UploadDestination {
    type Error = UploadError;

    fn try_from(data: UploadUrlsData) -> Result<Self, Self::Error> {
        // `urls` present means the server chose multipart.
        let Some(part_urls) = data.urls else {
            let url = data
                .url
                .ok_or_else(|| UploadError::protocol_mismatch("negotiation returned neither 'url' nor 'urls'"))?;
            return Ok(Self::Single {
                storage_identifier: data.storage_identifier,
                url,
            });
        };

        let part_size = data
            .part_size
            .ok_or_else(|| UploadError::protocol_mismatch("multipart negotiation missing 'partSize'"))?;
        if part_size == 0 {
            return Err(UploadError::protocol_mismatch("'partSize' must be positive"));
        }

        let complete_path = data
            .complete
            .ok_or_else(|| UploadError::protocol_mismatch("multipart negotiation missing 'complete'"))?;
        let abort_path = data
            .abort
            .ok_or_else(|| UploadError::protocol_mismatch("multipart negotiation missing 'abort'"))?;

        // Indices must run 1..=n with no gaps; a BTreeMap already rules out
        // duplicates, so checking the bounds against the length is enough.
        let count = part_urls.len() as u32;
        match (part_urls.keys().next(), part_urls.keys().next_back()) {
            (Some(&1), Some(&last)) if last == count => {}
            _ => {
                return Err(UploadError::protocol_mismatch(
                    "multipart part indices are not contiguous from 1",
                ));
            }
        }

        Ok(Self::Multipart {
            storage_identifier: data.storage_identifier,
            part_urls,
            part_size,
            complete_path,
            abort_path,
        })
    }
}

/// Content checksum in the Dataverse JSON-LD shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    #[serde(rename = "@type")]
    pub algorithm: String,
    #[serde(rename = "@value")]
    pub value: String,
}

impl Checksum {
    pub fn md5(value: impl Into<String>) -> Self {
        Self {
            algorithm: CHECKSUM_ALGORITHM.to_string(),
            value: value.into(),
        }
    }
}

/// Metadata record submitted to the `add` endpoint once bytes are durable.
///
/// Built empty, filled stage by stage, submitted exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub categories: Vec<String>,
    pub file_name: String,
    pub mime_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_identifier: Option<String>,
}

impl Default for FileMetadata {
    fn default() -> Self {
        Self {
            categories: vec![DEFAULT_CATEGORY.to_string()],
            file_name: String::new(),
            mime_type: String::new(),
            description: String::new(),
            checksum: None,
            storage_identifier: None,
        }
    }
}

/// Overall outcome of one `upload` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    #[serde(rename = "OK")]
    Ok,
    /// The transfer or the metadata link was rejected; server-side state may
    /// exist (a stored object, or an aborted reservation).
    #[serde(rename = "FAILED")]
    Failed,
    /// Nothing reached storage: negotiation, transport, or local IO failed.
    #[serde(rename = "ERROR")]
    Error,
}

/// Structured result returned to the caller. Failures are carried here
/// instead of propagating, so batch callers can keep going.
#[derive(Debug)]
pub struct UploadReport {
    pub status: UploadStatus,
    /// Metadata as far as it got filled; complete on success.
    pub data: FileMetadata,
    pub error: Option<UploadError>,
}

impl UploadReport {
    pub fn is_ok(&self) -> bool {
        self.status == UploadStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn multipart_data(keys: &[u32]) -> UploadUrlsData {
        UploadUrlsData {
            storage_identifier: "s3://bucket:id".to_string(),
            url: None,
            urls: Some(
                keys.iter()
                    .map(|k| (*k, format!("https://storage.example/part{k}")))
                    .collect(),
            ),
            part_size: Some(5 * 1024 * 1024),
            complete: Some("/api/datasets/mpupload/complete".to_string()),
            abort: Some("/api/datasets/mpupload/abort".to_string()),
        }
    }

    #[test]
    fn threshold_boundary() {
        assert!(!multipart_expected(MULTIPART_THRESHOLD - 1));
        assert!(multipart_expected(MULTIPART_THRESHOLD));
        assert!(multipart_expected(MULTIPART_THRESHOLD + 1));
    }

    #[test]
    fn single_destination_from_url_field() {
        let data: UploadUrlsResponse = serde_json::from_str(
            r#"{"data":{"storageIdentifier":"s3://bucket:abc","url":"https://storage.example/one"}}"#,
        )
        .unwrap();
        let dest = UploadDestination::try_from(data.data).unwrap();

        assert!(!dest.is_multipart());
        assert_eq!(dest.storage_identifier(), "s3://bucket:abc");
    }

    #[test]
    fn multipart_destination_orders_parts() {
        let data: UploadUrlsResponse = serde_json::from_str(
            r#"{"data":{
                "storageIdentifier":"s3://bucket:abc",
                "urls":{"2":"https://s/2","1":"https://s/1","3":"https://s/3"},
                "partSize":5242880,
                "complete":"/api/datasets/mpupload/complete",
                "abort":"/api/datasets/mpupload/abort"
            }}"#,
        )
        .unwrap();

        let dest = UploadDestination::try_from(data.data).unwrap();
        let UploadDestination::Multipart {
            part_urls,
            part_size,
            ..
        } = dest
        else {
            panic!("expected multipart destination");
        };

        assert_eq!(part_size, 5242880);
        let keys: Vec<u32> = part_urls.keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
    }

    #[test]
    fn multipart_rejects_gap_in_indices() {
        let err = UploadDestination::try_from(multipart_data(&[1, 3])).unwrap_err();
        assert!(matches!(err, UploadError::ProtocolMismatch(_)));
    }

    #[test]
    fn multipart_rejects_indices_not_starting_at_one() {
        let err = UploadDestination::try_from(multipart_data(&[2, 3])).unwrap_err();
        assert!(matches!(err, UploadError::ProtocolMismatch(_)));
    }

    #[test]
    fn multipart_rejects_zero_part_size() {
        let mut data = multipart_data(&[1, 2]);
        data.part_size = Some(0);
        let err = UploadDestination::try_from(data).unwrap_err();
        assert!(matches!(err, UploadError::ProtocolMismatch(_)));
    }

    #[test]
    fn negotiation_without_any_url_is_a_mismatch() {
        let data = UploadUrlsData {
            storage_identifier: "s3://bucket:abc".to_string(),
            url: None,
            urls: None,
            part_size: None,
            complete: None,
            abort: None,
        };
        let err = UploadDestination::try_from(data).unwrap_err();
        assert!(matches!(err, UploadError::ProtocolMismatch(_)));
    }

    #[test]
    fn metadata_serializes_dataverse_field_names() {
        let meta = FileMetadata {
            file_name: "data.csv".to_string(),
            mime_type: "text/csv".to_string(),
            description: "first run".to_string(),
            checksum: Some(Checksum::md5("d41d8cd98f00b204e9800998ecf8427e")),
            storage_identifier: Some("s3://bucket:abc".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["categories"][0], "Data");
        assert_eq!(json["fileName"], "data.csv");
        assert_eq!(json["mimeType"], "text/csv");
        assert_eq!(json["checksum"]["@type"], "MD5");
        assert_eq!(json["checksum"]["@value"], "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(json["storageIdentifier"], "s3://bucket:abc");
    }

    #[test]
    fn empty_metadata_omits_unset_fields() {
        let json = serde_json::to_value(FileMetadata::default()).unwrap();
        assert!(json.get("checksum").is_none());
        assert!(json.get("storageIdentifier").is_none());
        assert_eq!(json["description"], "");
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&UploadStatus::Ok).unwrap(), r#""OK""#);
        assert_eq!(serde_json::to_string(&UploadStatus::Failed).unwrap(), r#""FAILED""#);
        assert_eq!(serde_json::to_string(&UploadStatus::Error).unwrap(), r#""ERROR""#);
    }
}
