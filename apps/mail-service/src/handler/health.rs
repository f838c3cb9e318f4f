//! # ヘルスチェックハンドラ
//!
//! Mail Service の稼働状態を確認するためのエンドポイント。
//! SMTP サーバーへの到達性は確認しない（`GET /internal/mail/connection` を使う）。
//!
//! ## エンドポイント
//!
//! ```text
//! GET /health
//! ```
//!
//! ## レスポンス例
//!
//! ```json
//! {
//!   "status": "healthy",
//!   "version": "0.1.0",
//!   "notification_backend": "smtp"
//! }
//! ```

use std::sync::Arc;

use axum::{Json, extract::State};
use postmailer_shared::HealthResponse;

use super::MailState;

/// ヘルスチェックエンドポイント
pub async fn health_check(State(state): State<Arc<MailState>>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        env!("CARGO_PKG_VERSION"),
        state.service.backend_name(),
    ))
}
