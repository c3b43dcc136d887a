//! Optional upload of exported files to S3.

use anyhow::{Context, Result};
use aws_sdk_s3::primitives::ByteStream;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Object key for `path` under `prefix`, with `.gz` appended when compressed.
pub fn object_key(prefix: &str, path: &Path, gzip: bool) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = prefix.trim_end_matches('/');
    let key = if prefix.is_empty() {
        name
    } else {
        format!("{prefix}/{name}")
    };
    if gzip { format!("{key}.gz") } else { key }
}

/// Gzip-compresses `bytes`.
pub fn gzip_bytes(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Uploads each file in `paths` to `bucket` under `prefix`, optionally
/// gzip-compressed. Uses the ambient AWS configuration.
#[tracing::instrument(skip(paths), fields(files = paths.len()))]
pub async fn upload_files(bucket: &str, prefix: &str, paths: &[&Path], gzip: bool) -> Result<()> {
    let config = aws_config::load_from_env().await;
    let client = aws_sdk_s3::Client::new(&config);

    for path in paths {
        let contents =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let body = if gzip { gzip_bytes(&contents)? } else { contents };
        let key = object_key(prefix, path, gzip);

        client
            .put_object()
            .bucket(bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("uploading s3://{bucket}/{key}"))?;

        info!(bucket, key = %key, "Uploaded");
    }

    Ok(())
}
