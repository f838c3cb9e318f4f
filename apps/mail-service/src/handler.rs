//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、配信ロジックはユースケース層に委譲

pub mod health;
pub mod mail;

pub use health::health_check;
pub use mail::{
    MailState,
    check_connection,
    send_batch,
    send_multiple,
    send_post,
    send_posts,
    send_with_attachment,
    validate_recipients,
};
