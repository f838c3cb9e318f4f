//! # Mail Service ライブラリ
//!
//! Mail Service の設定・ユースケース・ハンドラを公開する。
//! 統合テストから同じルーターを組み立てられるよう、ルーター構築もここに置く。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use handler::{
    MailState,
    check_connection,
    health_check,
    send_batch,
    send_multiple,
    send_post,
    send_posts,
    send_with_attachment,
    validate_recipients,
};

/// Mail Service のルーターを構築する
pub fn router(state: Arc<MailState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/mail/connection", get(check_connection))
        .route("/internal/mail/validate", post(validate_recipients))
        .route("/internal/mail/send", post(send_post))
        .route("/internal/mail/send-multiple", post(send_multiple))
        .route("/internal/mail/send-posts", post(send_posts))
        .route(
            "/internal/mail/send-with-attachment",
            post(send_with_attachment),
        )
        .route("/internal/mail/send-batch", post(send_batch))
        .with_state(state)
}
