//! S3 adapter built on `aws-sdk-s3`.
//!
//! The SDK is async-only.  The rest of the program is a straight-line CLI, so
//! the adapter owns a current-thread Tokio runtime and blocks on each call;
//! nothing async leaks past this file.

use std::{fs::File, io::Write, path::Path};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{
    Client,
    config::Credentials,
    error::DisplayErrorContext,
    primitives::ByteStream,
};
use chrono::DateTime;
use tokio::runtime::Runtime;
use tracing::debug;

use super::{BlobStore, ObjectSummary, ensure_key_safe};
use crate::{
    config::S3Config,
    error::{Error, Result},
};

pub struct S3Store {
    runtime: Runtime,
    client: Client,
}

impl S3Store {
    /// Build a client from the configured credentials and region.
    ///
    /// Empty access/secret keys fall back to the SDK's default credential
    /// chain (environment, shared profile, instance metadata).
    pub fn connect(cfg: &S3Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::remote(format!("starting async runtime: {e}")))?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region_name.clone()));
        if !cfg.access_key.is_empty() && !cfg.secret_key.is_empty() {
            loader = loader.credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "hotbackup-config",
            ));
        }
        if let Some(ref endpoint) = cfg.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        debug!("initialising S3 client for region {}", cfg.region_name);
        let sdk_config = runtime.block_on(loader.load());
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(cfg.force_path_style)
            .build();

        Ok(Self {
            runtime,
            client: Client::from_conf(s3_config),
        })
    }
}

fn sdk_error(action: &str, err: impl std::error::Error) -> Error {
    Error::remote(format!("{action}: {}", DisplayErrorContext(err)))
}

impl BlobStore for S3Store {
    fn put(&self, bucket: &str, key: &str, src: &Path) -> Result<()> {
        ensure_key_safe(key)?;
        self.runtime.block_on(async {
            let body = ByteStream::from_path(src)
                .await
                .map_err(|e| sdk_error(&format!("reading {}", src.display()), e))?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .send()
                .await
                .map_err(|e| sdk_error(&format!("uploading s3://{bucket}/{key}"), e))?;
            Ok::<(), Error>(())
        })
    }

    fn get(&self, bucket: &str, key: &str, dest: &Path) -> Result<()> {
        ensure_key_safe(key)?;
        self.runtime.block_on(async {
            let mut resp = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| sdk_error(&format!("downloading s3://{bucket}/{key}"), e))?;

            let mut file = File::create(dest).map_err(Error::io(dest))?;
            while let Some(chunk) = resp
                .body
                .try_next()
                .await
                .map_err(|e| sdk_error(&format!("downloading s3://{bucket}/{key}"), e))?
            {
                file.write_all(&chunk).map_err(Error::io(dest))?;
            }
            file.sync_all().map_err(Error::io(dest))?;
            Ok::<(), Error>(())
        })
    }

    fn list(&self, bucket: &str) -> Result<Vec<ObjectSummary>> {
        self.runtime.block_on(async {
            let mut out = Vec::new();
            let mut token: Option<String> = None;
            loop {
                let resp = self
                    .client
                    .list_objects_v2()
                    .bucket(bucket)
                    .set_continuation_token(token.take())
                    .send()
                    .await
                    .map_err(|e| sdk_error(&format!("listing s3://{bucket}"), e))?;

                for obj in resp.contents() {
                    let Some(key) = obj.key() else { continue };
                    let last_modified = obj
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()))
                        .unwrap_or_default();
                    out.push(ObjectSummary {
                        key: key.to_string(),
                        last_modified,
                        size_bytes: obj.size().unwrap_or(0).max(0) as u64,
                    });
                }

                match resp.next_continuation_token() {
                    Some(next) if resp.is_truncated().unwrap_or(false) => {
                        token = Some(next.to_string());
                    },
                    _ => break,
                }
            }
            debug!("listed {} objects in {bucket}", out.len());
            Ok::<_, Error>(out)
        })
    }
}
