//! # テスト用モック送信
//!
//! ユースケーステストで使用するインメモリのメール送信モック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! postmailer-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use postmailer_domain::notification::{EmailMessage, FailureKind, NotificationError};

use crate::notification::NotificationSender;

// ===== MockNotificationSender =====

/// 送信失敗を起こす条件
#[derive(Debug, Clone)]
enum FailureRule {
    Recipient(String),
    SubjectContains(String),
}

impl FailureRule {
    fn matches(&self, email: &EmailMessage) -> bool {
        match self {
            Self::Recipient(recipient) => &email.to == recipient,
            Self::SubjectContains(text) => email.subject.contains(text.as_str()),
        }
    }
}

/// 送信されたメールを記録するモック
///
/// 失敗ルールに一致したメールは記録せず、指定した分類のエラーを返す。
/// 試行回数は成功・失敗にかかわらず数える。
#[derive(Clone, Default)]
pub struct MockNotificationSender {
    sent:               Arc<Mutex<Vec<EmailMessage>>>,
    attempts:           Arc<Mutex<usize>>,
    failures:           Arc<Mutex<Vec<(FailureRule, FailureKind)>>>,
    connection_failure: Arc<Mutex<Option<FailureKind>>>,
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定した宛先への送信を失敗させる
    pub fn fail_for_recipient(&self, recipient: impl Into<String>, kind: FailureKind) {
        self.failures
            .lock()
            .unwrap()
            .push((FailureRule::Recipient(recipient.into()), kind));
    }

    /// 件名に指定文字列を含むメールの送信を失敗させる
    pub fn fail_when_subject_contains(&self, text: impl Into<String>, kind: FailureKind) {
        self.failures
            .lock()
            .unwrap()
            .push((FailureRule::SubjectContains(text.into()), kind));
    }

    /// 接続確認を失敗させる
    pub fn fail_connection(&self, kind: FailureKind) {
        *self.connection_failure.lock().unwrap() = Some(kind);
    }

    /// 送信に成功したメール（送信順）
    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// 送信試行の回数
    pub fn attempt_count(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

/// 分類に対応するエラーを作る
fn error_of(kind: FailureKind, detail: &str) -> NotificationError {
    let detail = detail.to_string();
    match kind {
        FailureKind::NoRecipient => NotificationError::NoRecipient,
        FailureKind::InvalidAddress => NotificationError::InvalidAddress(detail),
        FailureKind::Authentication => NotificationError::Authentication(detail),
        FailureKind::Protocol => NotificationError::Protocol(detail),
        FailureKind::Timeout => NotificationError::Timeout(detail),
        FailureKind::MessageBuild => NotificationError::MessageBuild(detail),
        FailureKind::Template => NotificationError::TemplateFailed(detail),
        FailureKind::Other => NotificationError::SendFailed(detail),
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        *self.attempts.lock().unwrap() += 1;

        let failure = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(rule, _)| rule.matches(email))
            .map(|(_, kind)| *kind);
        if let Some(kind) = failure {
            return Err(error_of(kind, &format!("mock failure for {}", email.to)));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }

    async fn check_connection(&self) -> Result<(), NotificationError> {
        match *self.connection_failure.lock().unwrap() {
            Some(kind) => Err(error_of(kind, "mock connection failure")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn email(to: &str, subject: &str) -> EmailMessage {
        EmailMessage {
            to:         to.to_string(),
            subject:    subject.to_string(),
            text_body:  "body".to_string(),
            html_body:  None,
            attachment: None,
        }
    }

    #[tokio::test]
    async fn 送信したメールを記録する() {
        let sender = MockNotificationSender::new();

        sender.send_email(&email("a@example.com", "one")).await.unwrap();
        sender.send_email(&email("b@example.com", "two")).await.unwrap();

        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].to, "b@example.com");
        assert_eq!(sender.attempt_count(), 2);
    }

    #[tokio::test]
    async fn 失敗ルールに一致したメールは指定の分類で失敗する() {
        let sender = MockNotificationSender::new();
        sender.fail_for_recipient("bad@example.com", FailureKind::Protocol);
        sender.fail_when_subject_contains("Broken", FailureKind::Timeout);

        let by_recipient = sender.send_email(&email("bad@example.com", "ok")).await;
        let by_subject = sender
            .send_email(&email("a@example.com", "Post: Broken"))
            .await;

        assert_eq!(by_recipient.unwrap_err().kind(), FailureKind::Protocol);
        assert_eq!(by_subject.unwrap_err().kind(), FailureKind::Timeout);
        assert!(sender.sent_emails().is_empty());
        assert_eq!(sender.attempt_count(), 2);
    }

    #[tokio::test]
    async fn 接続確認の失敗を設定できる() {
        let sender = MockNotificationSender::new();
        assert!(sender.check_connection().await.is_ok());

        sender.fail_connection(FailureKind::Authentication);

        let result = sender.check_connection().await;
        assert_eq!(result.unwrap_err().kind(), FailureKind::Authentication);
    }
}
