//! S3-compatible object store.
//!
//! The AWS SDK is async; this backend owns a current-thread Tokio runtime and
//! blocks on each request so the rest of the crate stays synchronous.

use std::path::Path;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use image::ImageFormat;
use tokio::runtime::{Builder, Runtime};

use crate::error::{Error, Result};

use super::ObjectStore;

/// Connection settings for [`S3ObjectStore::connect`].
///
/// Credentials always come from the SDK's default provider chain.
#[derive(Debug, Clone, Default)]
pub struct S3Options {
    /// Custom endpoint, e.g. `https://storage.googleapis.com` or a MinIO /
    /// LocalStack URL. Enables path-style addressing.
    pub endpoint_url: Option<String>,
    /// Region override; falls back to the SDK's region chain.
    pub region: Option<String>,
}

/// Object store backed by an S3 client.
pub struct S3ObjectStore {
    client: S3Client,
    runtime: Runtime,
}

impl std::fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ObjectStore").finish_non_exhaustive()
    }
}

impl S3ObjectStore {
    /// Wrap an existing client.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the Tokio runtime cannot be created.
    pub fn new(client: S3Client) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { client, runtime })
    }

    /// Load SDK configuration from the environment and build a client.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the Tokio runtime cannot be created.
    pub fn connect(options: &S3Options) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;

        let shared = runtime.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = &options.region {
                loader = loader.region(aws_config::Region::new(region.clone()));
            }
            if let Some(endpoint) = &options.endpoint_url {
                loader = loader.endpoint_url(endpoint);
            }
            loader.load().await
        });

        let config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(options.endpoint_url.is_some())
            .build();

        Ok(Self {
            client: S3Client::from_conf(config),
            runtime,
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn download(&self, container: &str, key: &str, dest: &Path) -> Result<()> {
        let read_err = |reason: String| Error::StorageRead {
            container: container.to_string(),
            key: key.to_string(),
            reason,
        };

        let data = self.runtime.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(container)
                .key(key)
                .send()
                .await
                .map_err(|e| match e.as_service_error() {
                    Some(service) if service.is_no_such_key() => Error::ObjectNotFound {
                        container: container.to_string(),
                        key: key.to_string(),
                    },
                    _ => read_err(DisplayErrorContext(&e).to_string()),
                })?;

            let bytes = response
                .body
                .collect()
                .await
                .map_err(|e| read_err(e.to_string()))?;
            Ok::<_, Error>(bytes.into_bytes())
        })?;

        std::fs::write(dest, &data)?;
        Ok(())
    }

    fn upload(&self, src: &Path, container: &str, key: &str) -> Result<()> {
        let data = std::fs::read(src)?;
        let content_type = ImageFormat::from_path(key)
            .ok()
            .map(|format| format.to_mime_type().to_string());

        self.runtime
            .block_on(
                self.client
                    .put_object()
                    .bucket(container)
                    .key(key)
                    .set_content_type(content_type)
                    .body(ByteStream::from(data))
                    .send(),
            )
            .map_err(|e| Error::StorageWrite {
                container: container.to_string(),
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }
}
