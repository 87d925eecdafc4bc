//! # POST /
//!
//! オブジェクトストレージへの署名付きアップロードURL発行。
//! `/api/signed-upload` にも同じハンドラをマウントする。

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use capture_types::{SignedUploadRequest, SignedUploadResponse};

use crate::config::GatewayState;
use crate::error::{GatewayError, MISSING_FIELDS_MESSAGE};
use crate::object_key::derive_object_key;

/// POST /: 署名付きアップロードURL発行。
///
/// 1. `filename` と `contentType` の必須チェック（欠落・空文字列は400）
/// 2. `<prefix>/<filename>` のオブジェクトキーを導出
/// 3. ストレージに署名付きURLを要求（失敗はプロバイダのメッセージで500）
/// 4. 公開URLをベストエフォートで解決（失敗はnull）
///
/// JSONとして解釈できないボディは空オブジェクトとして扱う。
pub async fn handle_signed_upload(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<SignedUploadRequest>, JsonRejection>,
) -> Result<Json<SignedUploadResponse>, GatewayError> {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(rejection = %rejection.body_text(), "リクエストボディを解釈できません");
            SignedUploadRequest::default()
        }
    };

    let (filename, content_type) = match (
        request.filename.as_deref().filter(|f| !f.is_empty()),
        request.content_type.as_deref().filter(|c| !c.is_empty()),
    ) {
        (Some(filename), Some(content_type)) => (filename, content_type),
        _ => return Err(GatewayError::BadRequest(MISSING_FIELDS_MESSAGE.to_string())),
    };

    let object_key = derive_object_key(&state.upload_prefix, filename)?;

    let signed = state
        .storage
        .create_signed_upload_url(&object_key, state.expiry_secs)
        .await?;

    let public_url = match state.storage.public_url(&object_key).await {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(path = %object_key, error = %e, "公開URLの解決に失敗しました");
            None
        }
    };

    tracing::info!(
        bucket = state.storage.bucket(),
        path = %object_key,
        content_type,
        expiry_secs = state.expiry_secs,
        "署名付きアップロードURLを発行"
    );

    Ok(Json(SignedUploadResponse {
        put_url: signed.signed_url,
        public_url,
        path: object_key,
    }))
}

/// POST以外のメソッド: 405。
pub async fn handle_method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}
