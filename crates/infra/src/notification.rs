//! # 通知送信
//!
//! メール送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **2 つの実装**: SMTP（本番・開発）、Noop（送信無効化時）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` でランタイム選択
//! - **1 通 1 セッション**: 送信ごとに接続を張り、終われば閉じる。接続の再利用はしない

mod noop;
mod smtp;

use async_trait::async_trait;
pub use noop::NoopNotificationSender;
use postmailer_domain::notification::{EmailMessage, NotificationError};
pub use smtp::{SmtpNotificationSender, SmtpSettings, build_message};

/// メール送信トレイト
///
/// 配信処理の中核。メール送信の具体的な方法を抽象化する。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 送信バックエンド名（ヘルスチェックとログに出力）
    fn backend_name(&self) -> &'static str;

    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;

    /// メールを送らずに、接続と認証が通るかだけを確認する
    async fn check_connection(&self) -> Result<(), NotificationError>;
}
