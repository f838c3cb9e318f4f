//! Noop 通知送信実装
//!
//! メールを実際に送信せず、ログ出力のみ行う。
//! ローカル開発や通知無効化時に使用する。

use async_trait::async_trait;
use postmailer_domain::notification::{EmailMessage, NotificationError};

use super::NotificationSender;

/// Noop 通知送信（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NoopNotificationSender;

#[async_trait]
impl NotificationSender for NoopNotificationSender {
    fn backend_name(&self) -> &'static str {
        "noop"
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            has_attachment = email.has_attachment(),
            "Noop: メール送信をスキップ"
        );
        Ok(())
    }

    async fn check_connection(&self) -> Result<(), NotificationError> {
        tracing::info!("Noop: 接続確認をスキップ");
        Ok(())
    }
}
