//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 共有状態は起動時に一度だけ構築され、以降は読み取り専用。

use crate::storage::{ObjectStorage, SupabaseStorage};

/// デフォルトのバケット名
pub const DEFAULT_BUCKET: &str = "user-media";
/// デフォルトのキープレフィックス
pub const DEFAULT_UPLOAD_PREFIX: &str = "captures";
/// 署名付きURLのデフォルト有効期限（秒）
pub const DEFAULT_EXPIRY_SECS: u32 = 60 * 60;
/// デフォルトの待ち受けアドレス
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

/// ストレージバックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Supabase Storage（REST API）
    Supabase,
    /// S3互換ストレージ（`vendor-aws` feature）
    S3,
}

impl StorageBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Some(Self::Supabase),
            "s3" => Some(Self::S3),
            _ => None,
        }
    }
}

/// S3互換バックエンドの設定（`STORAGE_BACKEND=s3` の場合のみ使用）。
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    /// S3_ENDPOINT
    pub endpoint: Option<String>,
    /// S3_PUBLIC_ENDPOINT（クライアント向けホスト名）
    pub public_endpoint: Option<String>,
    /// S3_ACCESS_KEY
    pub access_key: Option<String>,
    /// S3_SECRET_KEY
    pub secret_key: Option<String>,
    /// S3_BUCKET（STORAGE_BUCKETより優先）
    pub bucket: Option<String>,
    /// S3_REGION
    pub region: Option<String>,
    /// S3_PUBLIC_BASE_URL
    pub public_base_url: Option<String>,
}

impl S3Settings {
    /// 署名に使うエンドポイント。クライアント向けホスト名を優先する。
    pub fn signing_endpoint(&self) -> Option<&str> {
        self.public_endpoint
            .as_deref()
            .or(self.endpoint.as_deref())
    }
}

/// 環境変数から読み込んだGateway設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 待ち受けアドレス（GATEWAY_ADDR）
    pub listen_addr: String,
    /// ストレージバックエンド（STORAGE_BACKEND）
    pub backend: StorageBackend,
    /// SupabaseプロジェクトURL（SUPABASE_URL）
    pub supabase_url: Option<String>,
    /// Supabaseサービスロールキー（SUPABASE_SERVICE_ROLE_KEY）
    pub supabase_service_role_key: Option<String>,
    /// バケット名（STORAGE_BUCKET）
    pub bucket: String,
    /// オブジェクトキーのプレフィックス（UPLOAD_PREFIX）
    pub upload_prefix: String,
    /// 署名付きURLの有効期限（SIGNED_URL_EXPIRY_SECS）
    pub expiry_secs: u32,
    /// S3互換バックエンドの設定
    pub s3: S3Settings,
}

impl GatewayConfig {
    /// プロセスの環境変数から読み込む。
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から読み込む。空文字列は未設定として扱う。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match get("STORAGE_BACKEND") {
            None => StorageBackend::Supabase,
            Some(value) => StorageBackend::parse(&value).unwrap_or_else(|| {
                tracing::warn!(
                    storage_backend = %value,
                    "未知のSTORAGE_BACKENDです。supabaseを使用します"
                );
                StorageBackend::Supabase
            }),
        };

        let expiry_secs = match get("SIGNED_URL_EXPIRY_SECS") {
            None => DEFAULT_EXPIRY_SECS,
            Some(value) => match value.trim().parse::<u32>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(
                        signed_url_expiry_secs = %value,
                        default = DEFAULT_EXPIRY_SECS,
                        "SIGNED_URL_EXPIRY_SECSが不正です。デフォルト値を使用します"
                    );
                    DEFAULT_EXPIRY_SECS
                }
            },
        };

        Self {
            listen_addr: get("GATEWAY_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            backend,
            supabase_url: get("SUPABASE_URL"),
            supabase_service_role_key: get("SUPABASE_SERVICE_ROLE_KEY"),
            bucket: get("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            upload_prefix: get("UPLOAD_PREFIX")
                .unwrap_or_else(|| DEFAULT_UPLOAD_PREFIX.to_string()),
            expiry_secs,
            s3: S3Settings {
                endpoint: get("S3_ENDPOINT"),
                public_endpoint: get("S3_PUBLIC_ENDPOINT"),
                access_key: get("S3_ACCESS_KEY"),
                secret_key: get("S3_SECRET_KEY"),
                bucket: get("S3_BUCKET"),
                region: get("S3_REGION"),
                public_base_url: get("S3_PUBLIC_BASE_URL"),
            },
        }
    }

    /// 選択中のバックエンドで認証情報が欠けているか。
    pub fn missing_credentials(&self) -> bool {
        match self.backend {
            StorageBackend::Supabase => {
                self.supabase_url.is_none() || self.supabase_service_role_key.is_none()
            }
            StorageBackend::S3 => self.s3.access_key.is_none() || self.s3.secret_key.is_none(),
        }
    }

    /// 認証情報欠落時に起動ログへ出す環境変数名。
    pub fn credential_env_names(&self) -> &'static str {
        match self.backend {
            StorageBackend::Supabase => "SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY",
            StorageBackend::S3 => "S3_ACCESS_KEY / S3_SECRET_KEY",
        }
    }

    /// 設定に従ってストレージバックエンドを構築する。
    pub fn build_storage(
        &self,
        http_client: reqwest::Client,
    ) -> anyhow::Result<Box<dyn ObjectStorage>> {
        match self.backend {
            StorageBackend::Supabase => Ok(Box::new(SupabaseStorage::new(
                http_client,
                self.supabase_url.clone(),
                self.supabase_service_role_key.clone(),
                self.bucket.clone(),
            ))),
            #[cfg(feature = "vendor-aws")]
            StorageBackend::S3 => Ok(Box::new(crate::storage::S3Storage::from_settings(
                &self.s3,
                &self.bucket,
            )?)),
            #[cfg(not(feature = "vendor-aws"))]
            StorageBackend::S3 => {
                anyhow::bail!("STORAGE_BACKEND=s3 にはvendor-aws featureが必要です")
            }
        }
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// オブジェクトストレージ（トレイトで抽象化）
    pub storage: Box<dyn ObjectStorage>,
    /// オブジェクトキーのプレフィックス
    pub upload_prefix: String,
    /// 署名付きURLの有効期限（秒）
    pub expiry_secs: u32,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig, storage: Box<dyn ObjectStorage>) -> Self {
        Self {
            storage,
            upload_prefix: config.upload_prefix.clone(),
            expiry_secs: config.expiry_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> GatewayConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GatewayConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(config.backend, StorageBackend::Supabase);
        assert_eq!(config.bucket, "user-media");
        assert_eq!(config.upload_prefix, "captures");
        assert_eq!(config.expiry_secs, 3600);
        assert!(config.missing_credentials());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("SUPABASE_URL", "https://proj.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
            ("STORAGE_BUCKET", "media"),
            ("UPLOAD_PREFIX", "uploads"),
            ("SIGNED_URL_EXPIRY_SECS", "600"),
            ("GATEWAY_ADDR", "127.0.0.1:8080"),
        ]);
        assert!(!config.missing_credentials());
        assert_eq!(config.bucket, "media");
        assert_eq!(config.upload_prefix, "uploads");
        assert_eq!(config.expiry_secs, 600);
        assert_eq!(config.listen_addr, "127.0.0.1:8080");
    }

    /// 不正値・空文字列はデフォルトにフォールバックする
    #[test]
    fn test_fallbacks() {
        let config = config_from(&[
            ("SUPABASE_URL", "https://proj.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "  "),
            ("SIGNED_URL_EXPIRY_SECS", "an hour"),
            ("STORAGE_BACKEND", "gcs"),
        ]);
        assert!(config.missing_credentials());
        assert_eq!(config.expiry_secs, DEFAULT_EXPIRY_SECS);
        assert_eq!(config.backend, StorageBackend::Supabase);

        let config = config_from(&[("SIGNED_URL_EXPIRY_SECS", "0"), ("STORAGE_BACKEND", "S3")]);
        assert_eq!(config.expiry_secs, DEFAULT_EXPIRY_SECS);
        assert_eq!(config.backend, StorageBackend::S3);
    }

    /// S3バックエンドはS3のアクセスキーで欠落を判定する（Supabaseの変数は無関係）
    #[test]
    fn test_s3_missing_credentials() {
        let config = config_from(&[("STORAGE_BACKEND", "s3")]);
        assert!(config.missing_credentials());
        assert_eq!(config.credential_env_names(), "S3_ACCESS_KEY / S3_SECRET_KEY");

        let config = config_from(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_ACCESS_KEY", "AKIA"),
            ("S3_SECRET_KEY", ""),
        ]);
        assert!(config.missing_credentials());

        let config = config_from(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_ACCESS_KEY", "AKIA"),
            ("S3_SECRET_KEY", "secret"),
        ]);
        assert!(!config.missing_credentials());
    }

    /// 空文字列のS3変数は未設定として扱われ、S3_ENDPOINTを上書きしない
    #[test]
    fn test_s3_empty_values_are_unset() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_PUBLIC_ENDPOINT", ""),
            ("S3_PUBLIC_BASE_URL", ""),
            ("S3_BUCKET", " "),
            ("S3_REGION", ""),
        ]);
        assert_eq!(config.s3.public_endpoint, None);
        assert_eq!(config.s3.public_base_url, None);
        assert_eq!(config.s3.bucket, None);
        assert_eq!(config.s3.region, None);
        assert_eq!(config.s3.signing_endpoint(), Some("http://localhost:9000"));
    }

    #[cfg(feature = "vendor-aws")]
    #[tokio::test]
    async fn test_build_s3_storage_with_empty_values() {
        let config = config_from(&[
            ("STORAGE_BACKEND", "s3"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("S3_PUBLIC_ENDPOINT", ""),
            ("S3_PUBLIC_BASE_URL", ""),
        ]);
        let storage = config.build_storage(reqwest::Client::new()).unwrap();
        assert_eq!(storage.bucket(), "user-media");
        assert_eq!(storage.public_url("captures/a.jpg").await.unwrap(), None);

        let signed = storage
            .create_signed_upload_url("captures/a.jpg", 3600)
            .await
            .unwrap();
        assert!(
            signed
                .signed_url
                .contains("localhost:9000/user-media/captures/a.jpg?"),
            "{}",
            signed.signed_url
        );
    }

    #[tokio::test]
    async fn test_build_supabase_storage_without_credentials() {
        let config = config_from(&[("STORAGE_BUCKET", "media")]);
        let storage = config.build_storage(reqwest::Client::new()).unwrap();
        assert_eq!(storage.bucket(), "media");
        assert!(storage
            .create_signed_upload_url("captures/foo.jpg", 3600)
            .await
            .is_err());
    }
}
