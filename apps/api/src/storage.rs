//! Object-storage access for raw résumé documents.
//!
//! The pipeline only ever fetches bytes by a stored public URL or path; it
//! does not manage bucket lifecycle. Fetching is behind a trait so the
//! pipeline can be exercised without a live S3 endpoint.

use async_trait::async_trait;
use bytes::Bytes;

use crate::errors::AppError;

/// Storage seam for the analysis pipeline.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Downloads the raw document bytes referenced by a résumé URL or
    /// storage path.
    async fn fetch(&self, resume_url: &str) -> Result<Bytes, AppError>;
}

/// Bucket + object key resolved from a stored résumé URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRef {
    pub bucket: String,
    pub key: String,
}

/// Resolves the bucket and key from a public URL or bare path.
///
/// Uploads land in either the `resumes` or `raw_resumes` bucket and the
/// stored URL embeds the bucket segment; anything else is treated as a key
/// in the default bucket. Query strings are dropped.
pub fn parse_storage_ref(resume_url: &str, default_bucket: &str) -> StorageRef {
    let url = resume_url.split('?').next().unwrap_or(resume_url);

    for bucket in ["resumes", "raw_resumes"] {
        let marker = format!("/{bucket}/");
        if let Some(idx) = url.find(&marker) {
            return StorageRef {
                bucket: bucket.to_string(),
                key: url[idx + marker.len()..].to_string(),
            };
        }
    }

    StorageRef {
        bucket: default_bucket.to_string(),
        key: url.rsplit('/').next().unwrap_or(url).to_string(),
    }
}

/// S3-backed store (MinIO locally, AWS in production).
pub struct S3DocumentStore {
    client: aws_sdk_s3::Client,
    default_bucket: String,
}

impl S3DocumentStore {
    pub fn new(client: aws_sdk_s3::Client, default_bucket: String) -> Self {
        Self {
            client,
            default_bucket,
        }
    }
}

#[async_trait]
impl DocumentStore for S3DocumentStore {
    async fn fetch(&self, resume_url: &str) -> Result<Bytes, AppError> {
        let storage_ref = parse_storage_ref(resume_url, &self.default_bucket);

        let object = self
            .client
            .get_object()
            .bucket(&storage_ref.bucket)
            .key(&storage_ref.key)
            .send()
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "Download failed for {}/{}: {e}",
                    storage_ref.bucket, storage_ref.key
                ))
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to read object body: {e}")))?;

        Ok(data.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_public_resumes_url() {
        let r = parse_storage_ref(
            "https://storage.example.com/v1/resumes/bulk/ana-souza.pdf",
            "resumes",
        );
        assert_eq!(r.bucket, "resumes");
        assert_eq!(r.key, "bulk/ana-souza.pdf");
    }

    #[test]
    fn test_parse_raw_resumes_url() {
        let r = parse_storage_ref(
            "https://storage.example.com/v1/raw_resumes/inbox/cv.docx",
            "resumes",
        );
        assert_eq!(r.bucket, "raw_resumes");
        assert_eq!(r.key, "inbox/cv.docx");
    }

    #[test]
    fn test_parse_strips_query_string() {
        let r = parse_storage_ref(
            "https://storage.example.com/v1/resumes/cv.pdf?token=abc123",
            "resumes",
        );
        assert_eq!(r.key, "cv.pdf");
    }

    #[test]
    fn test_parse_bare_path_falls_back_to_default_bucket() {
        let r = parse_storage_ref("uploads/cv.pdf", "resumes");
        assert_eq!(r.bucket, "resumes");
        assert_eq!(r.key, "cv.pdf");
    }
}
