//! Azure Storage provider implementation.
//!
//! This module provides production-ready Azure Queue Storage and Blob
//! Storage integration over the REST API with:
//! - Shared Key authorization (canonicalized headers and resource,
//!   HMAC-SHA256 over the account key)
//! - Connection-string configuration with endpoint overrides for local
//!   emulators such as Azurite
//! - Storage error-code mapping onto the [`StorageError`] taxonomy so the
//!   not-found and settling-window policies of higher layers work unchanged
//!
//! ## Message encoding
//!
//! The queue REST API carries message bodies as base64 text inside an XML
//! envelope. The 64 KiB wire limit therefore leaves roughly 48 KiB of raw
//! payload, which is what [`QueueService::max_message_size`] reports here.
//!
//! ## Example
//!
//! ```no_run
//! use storage_runtime::providers::azure::{
//!     AzureBlobService, AzureQueueService, AzureStorageConfig,
//! };
//!
//! # fn example() -> Result<(), storage_runtime::StorageError> {
//! let config = AzureStorageConfig::from_connection_string(
//!     "DefaultEndpointsProtocol=https;AccountName=worker;AccountKey=dGVzdC1rZXk=",
//! )?;
//!
//! let queues = AzureQueueService::new(&config)?;
//! let blobs = AzureBlobService::new(&config)?;
//! # let _ = (queues, blobs);
//! # Ok(())
//! # }
//! ```

use crate::error::StorageError;
use crate::message::{PopReceipt, QueueName, RawMessage};
use crate::service::{BlobService, QueueService};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{header, Client as HttpClient, Method, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
#[path = "azure_tests.rs"]
mod tests;

type HmacSha256 = Hmac<Sha256>;

/// REST API version sent as `x-ms-version` and assumed by the signer
const STORAGE_API_VERSION: &str = "2021-08-06";

/// Raw payload limit for queue messages; the wire limit is 64 KiB of
/// base64 text
const QUEUE_MAX_MESSAGE_SIZE: usize = 48 * 1024;

/// Default per-request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Configuration
// ============================================================================

/// Azure Storage account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureStorageConfig {
    /// Storage account name
    pub account: String,

    /// Base64-encoded account access key
    pub access_key: String,

    /// DNS suffix for the public cloud endpoints
    pub endpoint_suffix: String,

    /// Explicit queue endpoint (overrides account/suffix; used for Azurite)
    pub queue_endpoint: Option<String>,

    /// Explicit blob endpoint (overrides account/suffix; used for Azurite)
    pub blob_endpoint: Option<String>,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl AzureStorageConfig {
    /// Create configuration for a public-cloud storage account
    pub fn new(account: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            access_key: access_key.into(),
            endpoint_suffix: "core.windows.net".to_string(),
            queue_endpoint: None,
            blob_endpoint: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Parse a storage connection string
    ///
    /// Recognized keys: `AccountName`, `AccountKey`, `EndpointSuffix`,
    /// `QueueEndpoint`, `BlobEndpoint`. Explicit endpoints take precedence
    /// over the account/suffix form.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] when `AccountName` or
    /// `AccountKey` is missing.
    pub fn from_connection_string(raw: &str) -> Result<Self, StorageError> {
        let mut account = None;
        let mut access_key = None;
        let mut endpoint_suffix = None;
        let mut queue_endpoint = None;
        let mut blob_endpoint = None;

        for part in raw.split(';') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "AccountName" => account = Some(value.to_string()),
                "AccountKey" => access_key = Some(value.to_string()),
                "EndpointSuffix" => endpoint_suffix = Some(value.to_string()),
                "QueueEndpoint" => queue_endpoint = Some(value.trim_end_matches('/').to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                _ => {}
            }
        }

        let account = account.ok_or_else(|| StorageError::Configuration {
            message: "connection string is missing AccountName".to_string(),
        })?;
        let access_key = access_key.ok_or_else(|| StorageError::Configuration {
            message: "connection string is missing AccountKey".to_string(),
        })?;

        Ok(Self {
            account,
            access_key,
            endpoint_suffix: endpoint_suffix.unwrap_or_else(|| "core.windows.net".to_string()),
            queue_endpoint,
            blob_endpoint,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Base URL of the queue service
    pub fn queue_base_url(&self) -> String {
        self.queue_endpoint.clone().unwrap_or_else(|| {
            format!("https://{}.queue.{}", self.account, self.endpoint_suffix)
        })
    }

    /// Base URL of the blob service
    pub fn blob_base_url(&self) -> String {
        self.blob_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.blob.{}", self.account, self.endpoint_suffix))
    }
}

// ============================================================================
// Shared Key Signing
// ============================================================================

/// Shared Key request signer for one storage account
struct SharedKeySigner {
    account: String,
    key: Vec<u8>,
}

impl SharedKeySigner {
    fn new(account: &str, access_key: &str) -> Result<Self, StorageError> {
        let key = BASE64
            .decode(access_key)
            .map_err(|e| StorageError::AuthenticationFailed {
                message: format!("invalid account key: {}", e),
            })?;
        Ok(Self {
            account: account.to_string(),
            key,
        })
    }

    /// Build the `Authorization: SharedKey` header value for one request
    fn authorization(
        &self,
        method: &Method,
        content_length: usize,
        content_type: Option<&str>,
        canonical_headers: &str,
        canonical_resource: &str,
    ) -> Result<String, StorageError> {
        // Since API version 2015-02-21 an empty body signs as an empty
        // Content-Length field, not "0".
        let content_length_field = if content_length == 0 {
            String::new()
        } else {
            content_length.to_string()
        };

        let string_to_sign = format!(
            "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}{}",
            method.as_str(),
            content_length_field,
            content_type.unwrap_or(""),
            canonical_headers,
            canonical_resource
        );

        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|e| {
            StorageError::AuthenticationFailed {
                message: format!("failed to create HMAC: {}", e),
            }
        })?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account, signature))
    }
}

/// Current time formatted for the `x-ms-date` header (RFC 1123)
fn rfc1123_now() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

// ============================================================================
// Request Plumbing
// ============================================================================

/// Raw response before per-operation interpretation
struct RawResponse {
    status: StatusCode,
    headers: header::HeaderMap,
    body: Bytes,
}

impl RawResponse {
    fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Error code from the XML body, falling back to the
    /// `x-ms-error-code` header (bodyless responses such as HEAD)
    fn error_fields(&self) -> (String, String) {
        let (code, message) = parse_error_fields(&self.body_text());
        let code = code
            .or_else(|| {
                self.headers
                    .get("x-ms-error-code")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            })
            .unwrap_or_default();
        (code, message.unwrap_or_default())
    }
}

/// Signed HTTP client shared by the queue and blob services
struct StorageClient {
    http: HttpClient,
    signer: SharedKeySigner,
    base_url: String,
    request_timeout: Duration,
}

impl StorageClient {
    fn new(config: &AzureStorageConfig, base_url: String) -> Result<Self, StorageError> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StorageError::ConnectionFailed {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            signer: SharedKeySigner::new(&config.account, &config.access_key)?,
            base_url,
            request_timeout: config.request_timeout,
        })
    }

    /// Sign and execute one request
    ///
    /// `path` segments and query values are taken raw; the names produced by
    /// this crate are URL-safe by construction and query values are
    /// percent-encoded on the wire while staying raw in the canonicalized
    /// resource, as Shared Key requires.
    async fn execute(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&'static str, String)],
        extra_headers: &[(&'static str, &'static str)],
        content_type: Option<&'static str>,
        body: Option<Bytes>,
    ) -> Result<RawResponse, StorageError> {
        let date = rfc1123_now();

        // Canonicalized x-ms-* headers, sorted by name
        let mut xms_headers: BTreeMap<&str, &str> = BTreeMap::new();
        xms_headers.insert("x-ms-date", &date);
        xms_headers.insert("x-ms-version", STORAGE_API_VERSION);
        for (name, value) in extra_headers {
            xms_headers.insert(name, value);
        }
        let canonical_headers: String = xms_headers
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value))
            .collect();

        // Canonicalized resource: /{account}/{path} plus sorted query params
        let raw_path = path.join("/");
        let mut sorted_query: Vec<&(&'static str, String)> = query.iter().collect();
        sorted_query.sort_by_key(|(name, _)| *name);
        let mut canonical_resource = format!("/{}/{}", self.signer.account, raw_path);
        for (name, value) in &sorted_query {
            canonical_resource.push_str(&format!("\n{}:{}", name, value));
        }

        let content_length = body.as_ref().map(|b| b.len()).unwrap_or(0);
        let authorization = self.signer.authorization(
            &method,
            content_length,
            content_type,
            &canonical_headers,
            &canonical_resource,
        )?;

        // Build URL with percent-encoded query values
        let mut url = format!("{}/{}", self.base_url.trim_end_matches('/'), raw_path);
        if !query.is_empty() {
            let query_string = sorted_query
                .iter()
                .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query_string);
        }

        let mut request = self
            .http
            .request(method, url.as_str())
            .header(header::AUTHORIZATION, authorization)
            .header("x-ms-date", date.as_str())
            .header("x-ms-version", STORAGE_API_VERSION);
        for (name, value) in extra_headers {
            request = request.header(*name, *value);
        }
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                StorageError::Timeout {
                    timeout_ms: self.request_timeout.as_millis() as u64,
                }
            } else {
                StorageError::ConnectionFailed {
                    message: format!("HTTP request failed: {}", e),
                }
            }
        })?;

        let status = response.status();
        if status.is_server_error() {
            debug!(%url, status = status.as_u16(), "storage request failed server-side");
        }
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| StorageError::ConnectionFailed {
                message: format!("failed to read response body: {}", e),
            })?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

// ============================================================================
// Error Mapping
// ============================================================================

/// Map a queue-service error response onto the storage taxonomy
fn queue_error(queue: &QueueName, response: &RawResponse) -> StorageError {
    let (code, message) = response.error_fields();

    match code.as_str() {
        "QueueNotFound" => StorageError::QueueNotFound {
            queue: queue.to_string(),
        },
        "QueueBeingDeleted" | "QueueDisabled" => StorageError::ResourceBusy {
            resource: queue.to_string(),
            message,
        },
        "AuthenticationFailed" => StorageError::AuthenticationFailed { message },
        _ if response.status == StatusCode::UNAUTHORIZED
            || response.status == StatusCode::FORBIDDEN =>
        {
            StorageError::AuthenticationFailed { message }
        }
        _ if response.status == StatusCode::NOT_FOUND => StorageError::QueueNotFound {
            queue: queue.to_string(),
        },
        _ => StorageError::ServiceError {
            code: if code.is_empty() {
                response.status.as_str().to_string()
            } else {
                code
            },
            message,
        },
    }
}

/// Map a blob-service error response onto the storage taxonomy
fn blob_error(container: &str, blob: Option<&str>, response: &RawResponse) -> StorageError {
    let (code, message) = response.error_fields();

    match code.as_str() {
        "ContainerNotFound" => StorageError::ContainerNotFound {
            container: container.to_string(),
        },
        "BlobNotFound" => StorageError::BlobNotFound {
            container: container.to_string(),
            blob: blob.unwrap_or_default().to_string(),
        },
        "ContainerBeingDeleted" => StorageError::ResourceBusy {
            resource: container.to_string(),
            message,
        },
        "AuthenticationFailed" => StorageError::AuthenticationFailed { message },
        _ if response.status == StatusCode::UNAUTHORIZED
            || response.status == StatusCode::FORBIDDEN =>
        {
            StorageError::AuthenticationFailed { message }
        }
        _ if response.status == StatusCode::NOT_FOUND => match blob {
            Some(blob) => StorageError::BlobNotFound {
                container: container.to_string(),
                blob: blob.to_string(),
            },
            None => StorageError::ContainerNotFound {
                container: container.to_string(),
            },
        },
        _ => StorageError::ServiceError {
            code: if code.is_empty() {
                response.status.as_str().to_string()
            } else {
                code
            },
            message,
        },
    }
}

// ============================================================================
// XML Parsing
// ============================================================================

/// Parse `<Error><Code>..</Code><Message>..</Message></Error>`
fn parse_error_fields(xml: &str) -> (Option<String>, Option<String>) {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut code = None;
    let mut message = None;
    let mut in_code = false;
    let mut in_message = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"Code" => in_code = true,
                b"Message" => in_message = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_code {
                    code = e.unescape().ok().map(|s| s.into_owned());
                    in_code = false;
                } else if in_message {
                    message = e.unescape().ok().map(|s| s.into_owned());
                    in_message = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (code, message)
}

/// Parse a `<QueueMessagesList>` response into raw messages
fn parse_message_list(xml: &str) -> Result<Vec<RawMessage>, StorageError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut messages = Vec::new();
    let mut in_message = false;
    let mut current_message_id: Option<String> = None;
    let mut current_receipt: Option<String> = None;
    let mut current_text: Option<String> = None;
    let mut current_dequeue_count: u32 = 1;

    let mut in_message_id = false;
    let mut in_receipt = false;
    let mut in_text = false;
    let mut in_dequeue_count = false;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"QueueMessage" => {
                    in_message = true;
                    current_message_id = None;
                    current_receipt = None;
                    current_text = None;
                    current_dequeue_count = 1;
                }
                b"MessageId" if in_message => in_message_id = true,
                b"PopReceipt" if in_message => in_receipt = true,
                b"MessageText" if in_message => in_text = true,
                b"DequeueCount" if in_message => in_dequeue_count = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                let text = e.unescape().ok().map(|s| s.into_owned());
                if in_message_id {
                    current_message_id = text;
                    in_message_id = false;
                } else if in_receipt {
                    current_receipt = text;
                    in_receipt = false;
                } else if in_text {
                    current_text = text;
                    in_text = false;
                } else if in_dequeue_count {
                    if let Some(count) = text {
                        current_dequeue_count = count.parse().unwrap_or(1);
                    }
                    in_dequeue_count = false;
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"QueueMessage" => {
                in_message = false;

                if let (Some(message_id), Some(receipt)) =
                    (current_message_id.take(), current_receipt.take())
                {
                    let body_base64 = current_text.take().unwrap_or_default();
                    let body = BASE64.decode(&body_base64).map_err(|e| {
                        StorageError::InvalidResponse {
                            message: format!("message body is not valid base64: {}", e),
                        }
                    })?;

                    messages.push(RawMessage {
                        receipt: PopReceipt::new(message_id, receipt),
                        body: Bytes::from(body),
                        dequeue_count: current_dequeue_count,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(StorageError::InvalidResponse {
                    message: format!("XML parsing error: {}", e),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(messages)
}

/// Parse an enumeration response (`<Queue><Name>` / `<Blob><Name>` items),
/// returning the names and the continuation marker if one is present
fn parse_name_list(
    xml: &str,
    item_tag: &[u8],
) -> Result<(Vec<String>, Option<String>), StorageError> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut names = Vec::new();
    let mut marker = None;
    let mut in_item = false;
    let mut in_name = false;
    let mut in_marker = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                if e.name().as_ref() == item_tag {
                    in_item = true;
                } else if e.name().as_ref() == b"Name" && in_item {
                    in_name = true;
                } else if e.name().as_ref() == b"NextMarker" {
                    in_marker = true;
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().ok().map(|s| s.into_owned());
                if in_name {
                    if let Some(name) = text {
                        names.push(name);
                    }
                    in_name = false;
                } else if in_marker {
                    marker = text.filter(|m| !m.is_empty());
                    in_marker = false;
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == item_tag {
                    in_item = false;
                } else if e.name().as_ref() == b"NextMarker" {
                    in_marker = false;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(StorageError::InvalidResponse {
                    message: format!("XML parsing error: {}", e),
                })
            }
            _ => {}
        }
        buf.clear();
    }

    Ok((names, marker))
}

// ============================================================================
// AzureQueueService
// ============================================================================

/// Azure Queue Storage implementation of [`QueueService`]
pub struct AzureQueueService {
    client: StorageClient,
}

impl AzureQueueService {
    /// Create new queue service for a storage account
    pub fn new(config: &AzureStorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            client: StorageClient::new(config, config.queue_base_url())?,
        })
    }
}

#[async_trait]
impl QueueService for AzureQueueService {
    async fn create_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let response = self
            .client
            .execute(Method::PUT, &[queue.as_str()], &[], &[], None, None)
            .await?;

        match response.status {
            StatusCode::CREATED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::CONFLICT => {
                let (code, _) = response.error_fields();
                if code == "QueueAlreadyExists" {
                    Ok(())
                } else {
                    Err(queue_error(queue, &response))
                }
            }
            _ => Err(queue_error(queue, &response)),
        }
    }

    async fn delete_queue(&self, queue: &QueueName) -> Result<(), StorageError> {
        let response = self
            .client
            .execute(Method::DELETE, &[queue.as_str()], &[], &[], None, None)
            .await?;

        match response.status {
            StatusCode::NO_CONTENT => Ok(()),
            _ => Err(queue_error(queue, &response)),
        }
    }

    async fn list_queues(&self, prefix: &str) -> Result<Vec<QueueName>, StorageError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("comp", "list".to_string()),
                ("prefix", prefix.to_string()),
            ];
            if let Some(ref marker) = marker {
                query.push(("marker", marker.clone()));
            }

            let response = self
                .client
                .execute(Method::GET, &[], &query, &[], None, None)
                .await?;
            if response.status != StatusCode::OK {
                let (code, message) = response.error_fields();
                return Err(StorageError::ServiceError { code, message });
            }

            let (page, next_marker) = parse_name_list(&response.body_text(), b"Queue")?;
            for name in page {
                let queue = QueueName::new(name).map_err(|e| StorageError::InvalidResponse {
                    message: format!("service returned invalid queue name: {}", e),
                })?;
                names.push(queue);
            }

            match next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }

    async fn put_message(&self, queue: &QueueName, body: Bytes) -> Result<(), StorageError> {
        if body.len() > self.max_message_size() {
            return Err(StorageError::MessageTooLarge {
                size: body.len(),
                max_size: self.max_message_size(),
            });
        }

        let envelope = format!(
            "<QueueMessage><MessageText>{}</MessageText></QueueMessage>",
            BASE64.encode(&body)
        );

        let response = self
            .client
            .execute(
                Method::POST,
                &[queue.as_str(), "messages"],
                &[],
                &[],
                Some("application/xml"),
                Some(Bytes::from(envelope)),
            )
            .await?;

        match response.status {
            StatusCode::CREATED => Ok(()),
            _ => Err(queue_error(queue, &response)),
        }
    }

    async fn get_messages(
        &self,
        queue: &QueueName,
        max_messages: u32,
        visibility_timeout: Duration,
    ) -> Result<Vec<RawMessage>, StorageError> {
        let query = vec![
            ("numofmessages", max_messages.to_string()),
            (
                "visibilitytimeout",
                visibility_timeout.as_secs().max(1).to_string(),
            ),
        ];

        let response = self
            .client
            .execute(
                Method::GET,
                &[queue.as_str(), "messages"],
                &query,
                &[],
                None,
                None,
            )
            .await?;

        match response.status {
            StatusCode::OK => parse_message_list(&response.body_text()),
            _ => Err(queue_error(queue, &response)),
        }
    }

    async fn delete_message(
        &self,
        queue: &QueueName,
        receipt: &PopReceipt,
    ) -> Result<(), StorageError> {
        let query = vec![("popreceipt", receipt.receipt().to_string())];

        let response = self
            .client
            .execute(
                Method::DELETE,
                &[queue.as_str(), "messages", receipt.message_id()],
                &query,
                &[],
                None,
                None,
            )
            .await?;

        match response.status {
            StatusCode::NO_CONTENT => Ok(()),
            _ => {
                let (code, message) = response.error_fields();
                match code.as_str() {
                    "MessageNotFound" | "PopReceiptMismatch" => {
                        Err(StorageError::ReceiptRejected {
                            message_id: receipt.message_id().to_string(),
                            reason: message,
                        })
                    }
                    _ => Err(queue_error(queue, &response)),
                }
            }
        }
    }

    async fn clear_messages(&self, queue: &QueueName) -> Result<(), StorageError> {
        let response = self
            .client
            .execute(
                Method::DELETE,
                &[queue.as_str(), "messages"],
                &[],
                &[],
                None,
                None,
            )
            .await?;

        match response.status {
            StatusCode::NO_CONTENT => Ok(()),
            _ => Err(queue_error(queue, &response)),
        }
    }

    async fn approximate_message_count(&self, queue: &QueueName) -> Result<u64, StorageError> {
        let query = vec![("comp", "metadata".to_string())];

        let response = self
            .client
            .execute(Method::GET, &[queue.as_str()], &query, &[], None, None)
            .await?;

        match response.status {
            StatusCode::OK => Ok(response
                .headers
                .get("x-ms-approximate-messages-count")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)),
            _ => Err(queue_error(queue, &response)),
        }
    }

    fn max_message_size(&self) -> usize {
        QUEUE_MAX_MESSAGE_SIZE
    }
}

// ============================================================================
// AzureBlobService
// ============================================================================

/// Azure Blob Storage implementation of [`BlobService`]
pub struct AzureBlobService {
    client: StorageClient,
}

impl AzureBlobService {
    /// Create new blob service for a storage account
    pub fn new(config: &AzureStorageConfig) -> Result<Self, StorageError> {
        Ok(Self {
            client: StorageClient::new(config, config.blob_base_url())?,
        })
    }
}

#[async_trait]
impl BlobService for AzureBlobService {
    async fn create_container(&self, container: &str) -> Result<(), StorageError> {
        let query = vec![("restype", "container".to_string())];

        let response = self
            .client
            .execute(Method::PUT, &[container], &query, &[], None, None)
            .await?;

        match response.status {
            StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT => {
                let (code, _) = response.error_fields();
                if code == "ContainerAlreadyExists" {
                    Ok(())
                } else {
                    Err(blob_error(container, None, &response))
                }
            }
            _ => Err(blob_error(container, None, &response)),
        }
    }

    async fn upload_blob(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
    ) -> Result<(), StorageError> {
        let response = self
            .client
            .execute(
                Method::PUT,
                &[container, blob],
                &[],
                &[("x-ms-blob-type", "BlockBlob")],
                Some("application/octet-stream"),
                Some(body),
            )
            .await?;

        match response.status {
            StatusCode::CREATED => Ok(()),
            _ => Err(blob_error(container, Some(blob), &response)),
        }
    }

    async fn download_blob(
        &self,
        container: &str,
        blob: &str,
    ) -> Result<Option<Bytes>, StorageError> {
        let response = self
            .client
            .execute(Method::GET, &[container, blob], &[], &[], None, None)
            .await?;

        match response.status {
            StatusCode::OK => Ok(Some(response.body)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(blob_error(container, Some(blob), &response)),
        }
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> Result<bool, StorageError> {
        let response = self
            .client
            .execute(Method::HEAD, &[container, blob], &[], &[], None, None)
            .await?;

        match response.status {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(blob_error(container, Some(blob), &response)),
        }
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool, StorageError> {
        let response = self
            .client
            .execute(Method::DELETE, &[container, blob], &[], &[], None, None)
            .await?;

        match response.status {
            StatusCode::ACCEPTED => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(blob_error(container, Some(blob), &response)),
        }
    }

    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
    ) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("restype", "container".to_string()),
                ("comp", "list".to_string()),
                ("prefix", prefix.to_string()),
            ];
            if let Some(ref marker) = marker {
                query.push(("marker", marker.clone()));
            }

            let response = self
                .client
                .execute(Method::GET, &[container], &query, &[], None, None)
                .await?;

            match response.status {
                StatusCode::OK => {}
                StatusCode::NOT_FOUND => return Ok(Vec::new()),
                _ => return Err(blob_error(container, None, &response)),
            }

            let (page, next_marker) = parse_name_list(&response.body_text(), b"Blob")?;
            names.extend(page);

            match next_marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(names)
    }
}
