//! # Supabase Storage 実装
//!
//! Supabase StorageのREST APIを直接呼び出す実装。
//!
//! - 署名: `POST {SUPABASE_URL}/storage/v1/object/upload/sign/{bucket}/{key}`
//! - 公開URL: `{SUPABASE_URL}/storage/v1/object/public/{bucket}/{key}`（ローカルで組み立て）

use percent_encoding::{utf8_percent_encode, AsciiSet};
use serde::Deserialize;

use super::{ObjectStorage, SignedUpload, PUBLIC_URL_ENCODE_SET};
use crate::error::GatewayError;

/// APIリクエストのパス部分。`?` と `#` はクエリ・フラグメントと誤認されるため必ずエスケープする。
const REQUEST_PATH_ENCODE_SET: &AsciiSet = &PUBLIC_URL_ENCODE_SET.add(b'?').add(b'#');

/// 認証情報未設定時のメッセージ
const MISSING_CREDENTIALS_MESSAGE: &str = "Missing SUPABASE_URL or SUPABASE_SERVICE_ROLE_KEY";

/// `/object/upload/sign` のレスポンス
#[derive(Debug, Deserialize)]
struct SignUploadResponse {
    /// `/object/upload/sign/{bucket}/{key}?token=...`
    url: String,
}

/// Supabase Storageによる署名付きURL発行。
pub struct SupabaseStorage {
    http_client: reqwest::Client,
    /// `{SUPABASE_URL}/storage/v1`。SUPABASE_URL未設定時はNone。
    storage_url: Option<String>,
    service_role_key: Option<String>,
    bucket: String,
}

impl SupabaseStorage {
    /// 認証情報が欠けていても構築は成功する。
    /// 欠落は署名リクエスト時に `GatewayError::Storage` として表面化する。
    pub fn new(
        http_client: reqwest::Client,
        endpoint: Option<String>,
        service_role_key: Option<String>,
        bucket: impl Into<String>,
    ) -> Self {
        let storage_url = endpoint
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .map(|e| format!("{e}/storage/v1"));
        Self {
            http_client,
            storage_url,
            service_role_key: service_role_key.filter(|k| !k.is_empty()),
            bucket: bucket.into(),
        }
    }

    /// `{bucket}/{key}`。キーの先頭・末尾の `/` を除去し、連続する `/` を1つにまとめる。
    fn final_path(&self, object_key: &str) -> String {
        let key = object_key
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.bucket, key)
    }

    fn credentials(&self) -> Result<(&str, &str), GatewayError> {
        match (self.storage_url.as_deref(), self.service_role_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(GatewayError::Storage(MISSING_CREDENTIALS_MESSAGE.to_string())),
        }
    }
}

/// エラーレスポンスからメッセージを取り出す。
/// `message` → `error` → 生のボディ → HTTPステータスの順に採用する。
fn provider_error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["message", "error"] {
            if let Some(msg) = value.get(field).and_then(|v| v.as_str()) {
                if !msg.is_empty() {
                    return msg.to_string();
                }
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        body.to_string()
    }
}

#[async_trait::async_trait]
impl ObjectStorage for SupabaseStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn create_signed_upload_url(
        &self,
        object_key: &str,
        expiry_secs: u32,
    ) -> Result<SignedUpload, GatewayError> {
        let (storage_url, service_role_key) = self.credentials()?;

        let path = utf8_percent_encode(&self.final_path(object_key), REQUEST_PATH_ENCODE_SET)
            .to_string();
        let url = format!("{storage_url}/object/upload/sign/{path}");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(service_role_key)
            .header("apikey", service_role_key)
            .json(&serde_json::json!({ "expiresIn": expiry_secs }))
            .send()
            .await
            .map_err(|e| GatewayError::Storage(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Storage(e.to_string()))?;

        if !status.is_success() {
            return Err(GatewayError::Storage(provider_error_message(status, &body)));
        }

        let signed: SignUploadResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::Storage(format!("unexpected signed upload response: {e}"))
        })?;

        Ok(SignedUpload {
            signed_url: format!("{storage_url}{}", signed.url),
        })
    }

    async fn public_url(&self, object_key: &str) -> Result<Option<String>, GatewayError> {
        Ok(self.storage_url.as_ref().map(|storage_url| {
            let raw = format!("{storage_url}/object/public/{}", self.final_path(object_key));
            utf8_percent_encode(&raw, PUBLIC_URL_ENCODE_SET).to_string()
        }))
    }
}
