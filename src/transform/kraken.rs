// src/transform/kraken.rs

//! Image compression through the Kraken.io upload API.
//!
//! Each image is posted as a multipart request: a `data` field carrying the
//! JSON options (credentials, `wait: true`, `lossy`) and the file itself as
//! `upload`. With `wait` the response already holds `kraked_url`, which is
//! downloaded and written next to the other images.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use super::{Transform, TransformEnv, TransformError, TransformFuture, TransformInvocation};
use crate::config::model::KrakenSection;
use crate::fs::FileSystem;
use crate::fs::walk::{literal_base, normalize_pattern};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct UploadResponse {
    success: bool,
    #[serde(default)]
    kraked_url: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug)]
struct Credentials {
    endpoint: String,
    key: String,
    secret: String,
}

/// `compress-images` transform.
#[derive(Debug, Clone)]
pub struct CompressImages {
    client: reqwest::Client,
    credentials: Arc<Credentials>,
}

impl CompressImages {
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Result<Self, TransformError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            credentials: Arc::new(Credentials {
                endpoint: endpoint.into(),
                key: key.into(),
                secret: secret.into(),
            }),
        })
    }

    pub fn from_config(section: &KrakenSection) -> Result<Self, TransformError> {
        Self::new(&section.endpoint, &section.key, &section.secret)
    }
}

impl Transform for CompressImages {
    fn invoke<'a>(
        &'a self,
        env: &'a TransformEnv,
        invocation: &'a TransformInvocation,
    ) -> TransformFuture<'a> {
        Box::pin(async move {
            let images = env.expand(&invocation.inputs)?;
            if images.is_empty() {
                debug!(patterns = ?invocation.inputs, "no images to compress");
                return Ok(Vec::new());
            }

            if self.credentials.key.is_empty() || self.credentials.secret.is_empty() {
                return Err(TransformError::Remote {
                    path: images[0].clone(),
                    message: "kraken key and secret are not configured".to_string(),
                });
            }

            let bases: Vec<PathBuf> = invocation
                .inputs
                .iter()
                .map(|p| env.root().join(literal_base(normalize_pattern(p))))
                .collect();

            let total = images.len();
            let permits = Arc::new(Semaphore::new(invocation.options.concurrency.max(1)));
            let mut join_set = JoinSet::new();

            for source in images {
                let target = invocation.output_dir.join(relative_to_base(&bases, &source));
                let client = self.client.clone();
                let credentials = Arc::clone(&self.credentials);
                let fs = Arc::clone(&env.fs);
                let permits = Arc::clone(&permits);
                let lossy = invocation.options.lossy;

                join_set.spawn(async move {
                    let result = match permits.acquire_owned().await {
                        Ok(_permit) => {
                            compress_one(&client, &credentials, fs.as_ref(), &source, &target, lossy)
                                .await
                        }
                        Err(_) => Err(TransformError::Remote {
                            path: source.clone(),
                            message: "upload slots closed".to_string(),
                        }),
                    };
                    (source, target, result)
                });
            }

            let mut produced = Vec::with_capacity(total);
            let mut failed = 0;
            while let Some(joined) = join_set.join_next().await {
                match joined {
                    Ok((source, target, Ok(()))) => {
                        info!(path = ?source, output = ?target, "compressed image");
                        produced.push(target);
                    }
                    Ok((source, _, Err(err))) => {
                        failed += 1;
                        error!(path = ?source, error = %err, "image compression failed");
                    }
                    Err(join_err) => {
                        failed += 1;
                        error!(error = %join_err, "image compression task panicked");
                    }
                }
            }

            if failed > 0 {
                return Err(TransformError::Partial { failed, total });
            }
            produced.sort();
            Ok(produced)
        })
    }
}

/// Path of `source` relative to the first pattern base containing it.
pub(crate) fn relative_to_base(bases: &[PathBuf], source: &Path) -> PathBuf {
    bases
        .iter()
        .find_map(|base| source.strip_prefix(base).ok())
        .map(Path::to_path_buf)
        .or_else(|| source.file_name().map(PathBuf::from))
        .unwrap_or_else(|| source.to_path_buf())
}

async fn compress_one(
    client: &reqwest::Client,
    credentials: &Credentials,
    fs: &dyn FileSystem,
    source: &Path,
    target: &Path,
    lossy: bool,
) -> Result<(), TransformError> {
    let bytes = fs.read(source)?;
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let data = json!({
        "auth": {
            "api_key": credentials.key,
            "api_secret": credentials.secret,
        },
        "wait": true,
        "lossy": lossy,
    });
    let form = Form::new()
        .text("data", data.to_string())
        .part("upload", Part::bytes(bytes).file_name(file_name));

    debug!(path = ?source, endpoint = %credentials.endpoint, "uploading image");
    let response = client
        .post(&credentials.endpoint)
        .multipart(form)
        .send()
        .await?;

    let status = response.status();
    let body: UploadResponse = match response.json().await {
        Ok(body) => body,
        Err(err) if status.is_success() => return Err(err.into()),
        Err(_) => {
            return Err(TransformError::Remote {
                path: source.to_path_buf(),
                message: format!("upload rejected with HTTP {status}"),
            });
        }
    };

    let url = match (body.success, body.kraked_url) {
        (true, Some(url)) => url,
        (_, _) => {
            return Err(TransformError::Remote {
                path: source.to_path_buf(),
                message: body
                    .message
                    .unwrap_or_else(|| format!("upload failed with HTTP {status}")),
            });
        }
    };

    let compressed = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    fs.write(target, &compressed)?;
    Ok(())
}
