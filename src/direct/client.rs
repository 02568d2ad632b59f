use std::collections::BTreeMap;
use std::path::Path;

use md5::{Digest, Md5};
use reqwest::Client;
use reqwest::header::ETAG;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;
use super::constants::{API_KEY_HEADER, STORAGE_TAG_HEADER, STORAGE_TAG_TEMP};
use super::errors::{Result, UploadError};
use super::mime::infer_mime;
use super::types::{
    Checksum, FileMetadata, UploadDestination, UploadReport, UploadRequest, UploadStatus,
    UploadUrlsResponse, multipart_expected,
};

/// Client for the Dataverse direct-to-storage upload workflow.
///
/// One `upload` call runs three stages strictly in sequence: negotiate a
/// pre-signed destination, stream the file bytes to storage, then link the
/// stored object into the dataset record. Calls for different files are
/// independent; the client holds no per-upload state.
#[derive(Debug, Clone)]
pub struct DirectUploadClient {
    http: Client,
    base_url: Url,
    api_token: String,
}

impl DirectUploadClient {
    pub fn new(server_url: &str, api_token: &str) -> Result<Self> {
        let base_url = Url::parse(server_url)
            .map_err(|_| UploadError::Param(format!("invalid server URL: {server_url:?}")))?;

        Ok(Self {
            http: Client::new(),
            base_url,
            api_token: api_token.to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.server_url, &config.api_token)
    }

    fn api_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|_| UploadError::Param(format!("invalid API path: {path:?}")))
    }

    /// Uploads one file and attaches it to the dataset.
    ///
    /// Never propagates an error: every failure comes back inside the
    /// report, with `data` filled as far as the workflow got.
    pub async fn upload(&self, request: &UploadRequest) -> UploadReport {
        let mut data = FileMetadata {
            file_name: request
                .file_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            mime_type: infer_mime(&request.file_path),
            description: request.description.clone().unwrap_or_default(),
            ..Default::default()
        };

        match self.run_upload(request, &mut data).await {
            Ok(()) => {
                debug!(file = %data.file_name, "file uploaded and linked");
                UploadReport {
                    status: UploadStatus::Ok,
                    data,
                    error: None,
                }
            }
            Err(err) => {
                error!(file = %data.file_name, %err, "upload failed");
                UploadReport {
                    status: failure_status(&err),
                    data,
                    error: Some(err),
                }
            }
        }
    }

    async fn run_upload(&self, request: &UploadRequest, data: &mut FileMetadata) -> Result<()> {
        // Stat exactly once; negotiation is sized to this value.
        let file_size = tokio::fs::metadata(&request.file_path).await?.len();
        if multipart_expected(file_size) {
            debug!(file_size, "expecting a multipart destination");
        }

        let destination = self.negotiate(&request.persistent_id, file_size).await?;
        data.storage_identifier = Some(destination.storage_identifier().to_string());

        let checksum = match &destination {
            UploadDestination::Single { url, .. } => {
                self.upload_single(&request.file_path, url).await?
            }
            UploadDestination::Multipart {
                part_urls,
                part_size,
                complete_path,
                abort_path,
                ..
            } => {
                self.upload_multipart(&request.file_path, part_urls, *part_size, complete_path, abort_path)
                    .await?
            }
        };
        data.checksum = Some(checksum);

        self.link_file(&request.persistent_id, data).await
    }

    /// Asks the repository for a pre-signed destination sized to the file.
    async fn negotiate(&self, persistent_id: &str, file_size: u64) -> Result<UploadDestination> {
        let url = self.api_url("/api/datasets/:persistentId/uploadurls")?;
        let response = self
            .http
            .get(url)
            .query(&[
                ("persistentId", format!("doi:{persistent_id}")),
                ("size", file_size.to_string()),
            ])
            .header(API_KEY_HEADER, &self.api_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::negotiation_failed(status.as_u16(), body));
        }

        let parsed: UploadUrlsResponse = serde_json::from_str(&response.text().await?)?;
        UploadDestination::try_from(parsed.data)
    }

    /// Single-part path: the whole file fits in one write.
    async fn upload_single(&self, path: &Path, url: &str) -> Result<Checksum> {
        debug!("running single-part upload");

        let bytes = tokio::fs::read(path).await?;
        let digest = Md5::digest(&bytes);

        let response = self
            .http
            .put(url)
            .header(STORAGE_TAG_HEADER, STORAGE_TAG_TEMP)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::transfer_failed(
                status.as_u16(),
                "storage rejected single-part write",
            ));
        }

        Ok(Checksum::md5(format!("{digest:x}")))
    }

    /// Multi-part path: one sequential pass, a single chunk resident at a
    /// time. Any failure past negotiation releases the server-side
    /// reservation through the abort URL before surfacing.
    async fn upload_multipart(
        &self,
        path: &Path,
        part_urls: &BTreeMap<u32, String>,
        part_size: u64,
        complete_path: &str,
        abort_path: &str,
    ) -> Result<Checksum> {
        debug!(parts = part_urls.len(), part_size, "starting multipart upload");

        match self.run_multipart(path, part_urls, part_size, complete_path).await {
            Ok(checksum) => Ok(checksum),
            Err(err) => {
                self.abort_multipart(abort_path).await;
                Err(err)
            }
        }
    }

    async fn run_multipart(
        &self,
        path: &Path,
        part_urls: &BTreeMap<u32, String>,
        part_size: u64,
        complete_path: &str,
    ) -> Result<Checksum> {
        let mut file = File::open(path).await?;
        let mut hasher = Md5::new();
        let mut completion_tokens: BTreeMap<u32, String> = BTreeMap::new();
        let total = part_urls.len();

        for (&part_number, part_url) in part_urls {
            let chunk = read_chunk(&mut file, part_size).await?;
            if chunk.is_empty() {
                return Err(UploadError::protocol_mismatch(format!(
                    "file exhausted before part {part_number}/{total}"
                )));
            }

            // The digest covers the logical file content in read order, so
            // feed it exactly once per chunk, before the buffer is dropped.
            hasher.update(&chunk);

            debug!(part = part_number, total, size = chunk.len(), "uploading part");
            let response = self
                .http
                .put(part_url)
                .header(STORAGE_TAG_HEADER, STORAGE_TAG_TEMP)
                .body(chunk)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(UploadError::transfer_failed(
                    status.as_u16(),
                    format!("storage rejected part {part_number}/{total}"),
                ));
            }

            let token = response
                .headers()
                .get(ETAG)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    UploadError::protocol_mismatch(format!(
                        "no completion token returned for part {part_number}"
                    ))
                })?;
            completion_tokens.insert(part_number, strip_token_quotes(token).to_string());
        }

        // The file handle is done before any further repository call.
        drop(file);

        self.complete_multipart(complete_path, &completion_tokens).await?;
        Ok(Checksum::md5(format!("{:x}", hasher.finalize())))
    }

    /// Tells the repository to assemble the stored parts.
    async fn complete_multipart(
        &self,
        complete_path: &str,
        completion_tokens: &BTreeMap<u32, String>,
    ) -> Result<()> {
        let url = self.api_url(complete_path)?;
        let response = self
            .http
            .put(url)
            .header(API_KEY_HEADER, &self.api_token)
            .json(completion_tokens)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::transfer_failed(
                status.as_u16(),
                format!("could not complete multipart upload: {body}"),
            ));
        }

        Ok(())
    }

    /// Best-effort release of the server-side multipart reservation. Its own
    /// failure is logged and swallowed; the original error wins.
    async fn abort_multipart(&self, abort_path: &str) {
        debug!("aborting multipart upload");

        let url = match self.api_url(abort_path) {
            Ok(url) => url,
            Err(err) => {
                warn!(%err, "could not resolve abort URL");
                return;
            }
        };

        match self.http.delete(url).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!(status = response.status().as_u16(), "abort call rejected");
            }
            Ok(_) => {}
            Err(err) => warn!(%err, "abort call failed"),
        }
    }

    /// Attaches the stored object to the dataset record. Bytes are already
    /// durable here; a failure leaves a retryable inconsistency.
    async fn link_file(&self, persistent_id: &str, metadata: &FileMetadata) -> Result<()> {
        let url = self.api_url("/api/datasets/:persistentId/add")?;
        let form = reqwest::multipart::Form::new()
            .text("jsonData", serde_json::to_string(metadata)?);

        let response = self
            .http
            .post(url)
            .query(&[("persistentId", format!("doi:{persistent_id}"))])
            .header(API_KEY_HEADER, &self.api_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::link_failed(status.as_u16(), body));
        }

        Ok(())
    }
}

/// S3 hands ETags back wrapped in quote characters.
fn strip_token_quotes(raw: &str) -> &str {
    raw.trim_matches('"')
}

/// `ERROR` when nothing reached storage, `FAILED` once server-side state may
/// exist. Recovery differs: re-run the whole call vs. retry from the stage
/// that broke.
fn failure_status(err: &UploadError) -> UploadStatus {
    match err {
        UploadError::NegotiationFailed { .. }
        | UploadError::Transport(_)
        | UploadError::Io(_)
        | UploadError::Json(_)
        | UploadError::Param(_) => UploadStatus::Error,
        UploadError::TransferFailed { .. }
        | UploadError::ProtocolMismatch(_)
        | UploadError::LinkFailed { .. } => UploadStatus::Failed,
    }
}

async fn read_chunk(file: &mut File, part_size: u64) -> std::io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(part_size as usize);
    (&mut *file).take(part_size).read_to_end(&mut chunk).await?;
    Ok(chunk)
}
