//! # Capture Upload Gateway
//!
//! オブジェクトストレージへの短命な署名付きアップロードURLを発行するGateway。
//! ストレージ自体の処理はすべて外部プロバイダ（Supabase Storage / S3互換）に委ねる。
//!
//! ## API エンドポイント
//! - `POST /`: 署名付きアップロードURL発行（`POST /api/signed-upload` も同じ）
//! - `GET /health`: 死活監視
//!
//! ## モジュール構成
//! - `config`: 環境変数からの設定読み込みと共有状態
//! - `error`: エラー型とHTTPレスポンスへの変換
//! - `object_key`: オブジェクトキーの導出とファイル名検査
//! - `storage`: ストレージプロバイダの抽象とバックエンド実装
//! - `endpoints`: エンドポイントハンドラ

mod config;
mod endpoints;
mod error;
mod object_key;
mod storage;

use std::sync::Arc;

use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use config::{GatewayConfig, GatewayState};
use endpoints::*;

/// ルーターを構築する。
///
/// POST以外のメソッドは `{"error":"Method not allowed"}` で405を返す。
/// ハンドラ内のpanicは500のJSONレスポンスに変換され、プロセスは継続する。
fn build_router(state: Arc<GatewayState>) -> axum::Router {
    axum::Router::new()
        .route("/", issuer_route())
        .route("/api/signed-upload", issuer_route())
        .route("/health", axum::routing::get(handle_health))
        .with_state(state)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
}

/// 署名付きURL発行ルート。POST以外はフォールバックで405。
fn issuer_route() -> axum::routing::MethodRouter<Arc<GatewayState>> {
    axum::routing::post(handle_signed_upload).fallback(handle_method_not_allowed)
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = GatewayConfig::from_env();

    // 認証情報の欠落は致命的にしない（Supabaseはリクエスト時に500、S3はMinIO初期値で署名する）。
    if config.missing_credentials() {
        tracing::error!(
            backend = ?config.backend,
            "{} が未設定です",
            config.credential_env_names()
        );
    }

    let storage = config.build_storage(reqwest::Client::new())?;
    tracing::info!(
        backend = ?config.backend,
        bucket = storage.bucket(),
        upload_prefix = %config.upload_prefix,
        expiry_secs = config.expiry_secs,
        "ストレージを設定"
    );

    let state = Arc::new(GatewayState::new(&config, storage));
    let app = build_router(state);

    tracing::info!("Gatewayを {} で起動します", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
