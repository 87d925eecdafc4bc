//! # S3互換ストレージ実装
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する実装。
//! 署名はローカルで計算されるため、署名付きURL発行時にネットワーク通信は発生しない。

use percent_encoding::utf8_percent_encode;

use super::{ObjectStorage, SignedUpload, PUBLIC_URL_ENCODE_SET};
use crate::config::S3Settings;
use crate::error::GatewayError;

/// エンドポイント未設定時の接続先（ローカルMinIO）
const DEFAULT_ENDPOINT: &str = "http://localhost:9000";
/// アクセスキー未設定時の認証情報（ローカルMinIOの初期値）
const DEFAULT_ACCESS_KEY: &str = "minioadmin";
const DEFAULT_SECRET_KEY: &str = "minioadmin";
/// AWS以外のエンドポイントで使うリージョン
const FALLBACK_REGION: &str = "us-east-1";

/// S3互換ストレージによる署名付きURL発行。
pub struct S3Storage {
    /// クライアント向けバケット（署名付きURL生成用）
    bucket: s3::Bucket,
    bucket_name: String,
    /// 公開URLのベース（CDN等）。Noneの場合は公開URLを返さない。
    public_base_url: Option<String>,
}

impl S3Storage {
    pub fn new(bucket: s3::Bucket, public_base_url: Option<String>) -> Self {
        Self {
            bucket_name: bucket.name(),
            bucket,
            public_base_url: public_base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
        }
    }

    /// パススタイルのバケットハンドルを作る。
    fn open_bucket(
        endpoint: &str,
        region: Option<&str>,
        access_key: &str,
        secret_key: &str,
        bucket_name: &str,
    ) -> anyhow::Result<s3::Bucket> {
        let region = s3::Region::Custom {
            region: region
                .map(str::to_string)
                .unwrap_or_else(|| detect_region(endpoint)),
            endpoint: endpoint.to_string(),
        };
        let credentials =
            s3::creds::Credentials::new(Some(access_key), Some(secret_key), None, None, None)?;

        Ok(*s3::Bucket::new(bucket_name, region, credentials)?.with_path_style())
    }

    /// 設定から構築する。
    ///
    /// 署名は `S3_PUBLIC_ENDPOINT` があればそのホスト名で、無ければ `S3_ENDPOINT` で行う
    /// （コンテナ内部のホスト名とクライアントから見えるホスト名が異なる場合）。
    /// 認証情報の欠落は起動時に `GatewayConfig::missing_credentials` が報告する。
    pub fn from_settings(settings: &S3Settings, default_bucket: &str) -> anyhow::Result<Self> {
        let endpoint = settings.signing_endpoint().unwrap_or(DEFAULT_ENDPOINT);
        let bucket_name = settings.bucket.as_deref().unwrap_or(default_bucket);

        tracing::info!(
            s3_endpoint = %endpoint,
            bucket = %bucket_name,
            "S3互換ストレージを設定"
        );

        let bucket = Self::open_bucket(
            endpoint,
            settings.region.as_deref(),
            settings.access_key.as_deref().unwrap_or(DEFAULT_ACCESS_KEY),
            settings.secret_key.as_deref().unwrap_or(DEFAULT_SECRET_KEY),
            bucket_name,
        )?;

        Ok(Self::new(bucket, settings.public_base_url.clone()))
    }
}

/// `s3.<region>.amazonaws.com` からリージョン名を取り出す。該当しなければus-east-1。
fn detect_region(endpoint: &str) -> String {
    endpoint
        .find("s3.")
        .and_then(|start| {
            let rest = &endpoint[start + 3..];
            rest.find(".amazonaws.com").map(|end| rest[..end].to_string())
        })
        .unwrap_or_else(|| FALLBACK_REGION.to_string())
}

#[async_trait::async_trait]
impl ObjectStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket_name
    }

    async fn create_signed_upload_url(
        &self,
        object_key: &str,
        expiry_secs: u32,
    ) -> Result<SignedUpload, GatewayError> {
        let signed_url = self
            .bucket
            .presign_put(object_key, expiry_secs, None, None)
            .await
            .map_err(|e| GatewayError::Storage(e.to_string()))?;

        Ok(SignedUpload { signed_url })
    }

    async fn public_url(&self, object_key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.public_base_url.as_ref().map(|base| {
            let raw = format!("{base}/{}", object_key.trim_start_matches('/'));
            utf8_percent_encode(&raw, PUBLIC_URL_ENCODE_SET).to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_storage(public_base_url: Option<&str>) -> S3Storage {
        let settings = S3Settings {
            endpoint: Some(DEFAULT_ENDPOINT.to_string()),
            public_base_url: public_base_url.map(str::to_string),
            ..S3Settings::default()
        };
        S3Storage::from_settings(&settings, "user-media").unwrap()
    }

    #[test]
    fn test_detect_region() {
        assert_eq!(
            detect_region("https://s3.ap-northeast-1.amazonaws.com"),
            "ap-northeast-1"
        );
        assert_eq!(detect_region("http://minio:9000"), "us-east-1");
    }

    /// 署名はローカル計算なので、MinIOが起動していなくてもURLが得られる
    #[tokio::test]
    async fn test_presign_put_contains_key() {
        let storage = test_storage(None);
        let signed = storage
            .create_signed_upload_url("captures/foo.jpg", 3600)
            .await
            .unwrap();
        assert!(signed.signed_url.contains("localhost:9000/user-media/captures/foo.jpg?"));
        assert!(signed.signed_url.contains("X-Amz-Expires=3600"));
        assert_eq!(storage.bucket(), "user-media");
    }

    /// クライアント向けエンドポイントとバケット名の上書きが署名に反映される
    #[tokio::test]
    async fn test_public_endpoint_and_bucket_override() {
        let settings = S3Settings {
            endpoint: Some("http://minio:9000".to_string()),
            public_endpoint: Some("http://files.example.com:9000".to_string()),
            bucket: Some("captures-bucket".to_string()),
            ..S3Settings::default()
        };
        let storage = S3Storage::from_settings(&settings, "user-media").unwrap();
        assert_eq!(storage.bucket(), "captures-bucket");

        let signed = storage
            .create_signed_upload_url("captures/foo.jpg", 600)
            .await
            .unwrap();
        assert!(signed
            .signed_url
            .contains("files.example.com:9000/captures-bucket/captures/foo.jpg?"));
        assert!(!signed.signed_url.contains("minio:9000"));
    }

    #[tokio::test]
    async fn test_public_url() {
        assert_eq!(test_storage(None).public_url("captures/a.jpg").await.unwrap(), None);
        assert_eq!(
            test_storage(Some("")).public_url("captures/a.jpg").await.unwrap(),
            None
        );

        let storage = test_storage(Some("https://cdn.example.com/"));
        assert_eq!(
            storage.public_url("captures/a.jpg").await.unwrap().as_deref(),
            Some("https://cdn.example.com/captures/a.jpg")
        );
        assert_eq!(
            storage.public_url("captures/my photo.jpg").await.unwrap().as_deref(),
            Some("https://cdn.example.com/captures/my%20photo.jpg")
        );
    }
}
