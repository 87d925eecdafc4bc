//! # GET /health

/// GET /health: 死活監視。ストレージには問い合わせない。
pub async fn handle_health() -> &'static str {
    "ok"
}
