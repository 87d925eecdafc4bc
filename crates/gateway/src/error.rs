//! # Gateway エラー型
//!
//! 全エンドポイント共通。レスポンスボディは常に `{"error": "..."}`。

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use capture_types::ErrorResponse;

/// 必須フィールド欠落時のメッセージ
pub const MISSING_FIELDS_MESSAGE: &str = "Missing filename or contentType";

/// Gatewayエラー型。
///
/// `Storage` と `Internal` はメッセージをそのままクライアントに返す。
/// ストレージプロバイダのエラーメッセージは加工しない。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// POST以外のメソッド
    #[error("Method not allowed")]
    MethodNotAllowed,
    /// 不正なリクエスト（必須フィールド欠落、不正なファイル名）
    #[error("{0}")]
    BadRequest(String),
    /// ストレージプロバイダの呼び出しに失敗
    #[error("{0}")]
    Storage(String),
    /// 内部エラー
    #[error("{0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Storage(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        match &self {
            GatewayError::Storage(msg) => {
                tracing::error!(error = %msg, "ストレージプロバイダがエラーを返しました");
            }
            GatewayError::Internal(msg) => {
                tracing::error!(error = %msg, "リクエスト処理中に内部エラーが発生しました");
            }
            GatewayError::MethodNotAllowed | GatewayError::BadRequest(_) => {}
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

/// ハンドラ内のpanicを500レスポンスに変換する（`CatchPanicLayer` 用）。
pub fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> axum::response::Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    };
    GatewayError::Internal(detail).into_response()
}
