//! # Capture Upload 共有型定義
//!
//! Gatewayとクライアントの間でやり取りされるJSON構造体を提供する。
//!
//! ## フィールド命名規則
//! - ワイヤ上はcamelCase（`contentType`, `putUrl`, `publicUrl`）
//! - Rust側はsnake_case

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 署名付きアップロードURL発行
// ---------------------------------------------------------------------------

/// 署名付きアップロードURL発行リクエスト。
///
/// 両フィールドとも必須だが、欠落時に400を返すためにOptionで受ける。
/// 必須チェックはGateway側で行う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadRequest {
    /// アップロードするファイル名（オブジェクトキーの末尾になる）
    #[serde(default)]
    pub filename: Option<String>,
    /// コンテンツのMIMEタイプ
    #[serde(default)]
    pub content_type: Option<String>,
}

impl SignedUploadRequest {
    /// 両フィールドが揃ったリクエストを構築する。
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
        }
    }
}

/// 署名付きアップロードURL発行レスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUploadResponse {
    /// クライアントがPUTに使用する署名付きURL
    pub put_url: String,
    /// 公開URL（バケットが非公開、または解決できない場合はnull）
    pub public_url: Option<String>,
    /// バケット内のオブジェクトキー
    pub path: String,
}

// ---------------------------------------------------------------------------
// エラー
// ---------------------------------------------------------------------------

/// 全エンドポイント共通のエラーレスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
