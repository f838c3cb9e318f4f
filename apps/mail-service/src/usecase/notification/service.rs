//! # メール配信サービス
//!
//! テンプレートレンダリング → メール送信 → 結果の記録を統合するサービス。
//!
//! ## 設計方針
//!
//! - **失敗は値で返す**: 送信失敗は [`SendResult::Failed`] として返し、呼び出し側にエラーを伝播しない
//! - **逐次送信**: 宛先・投稿は入力順に 1 件ずつ送信し、前の送信の完了を待ってから次へ進む
//! - **独立した結果**: ある宛先の失敗は他の宛先の送信に影響しない
//! - **自動リトライなし**
//! - **依存性注入**: `NotificationSender` は trait で抽象化

use std::{collections::HashMap, path::Path, sync::Arc};

use postmailer_domain::{
    email_address::validate_recipients,
    notification::{
        BatchResult,
        COMBINED_POSTS_KEY,
        EmailMessage,
        FailureKind,
        InvalidRecipients,
        KeyedSendResult,
        MultiPostMode,
        MultiPostReport,
        NotificationError,
        RecipientResult,
        SendResult,
    },
    post::Post,
};
use postmailer_infra::{attachment::load_attachment, notification::NotificationSender};
use postmailer_shared::{
    event_log::{error, event},
    log_business_event,
};

use super::{
    TemplateRenderer,
    template_renderer::{
        DEFAULT_SUBJECT_PREFIX,
        attachment_subject,
        digest_subject,
        numbered_prefix,
        post_subject,
    },
};

/// 配信サービスの設定
#[derive(Debug, Clone, Default)]
pub struct DispatchSettings {
    /// 宛先が指定されなかった場合に使う既定の宛先
    pub default_recipient: Option<String>,
}

/// メール配信サービス
///
/// 読み取り専用の状態のみを保持するため、複数リクエストから共有してよい。
pub struct MailDispatchService {
    sender:            Arc<dyn NotificationSender>,
    template_renderer: TemplateRenderer,
    settings:          DispatchSettings,
}

impl MailDispatchService {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        template_renderer: TemplateRenderer,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            sender,
            template_renderer,
            settings,
        }
    }

    /// 投稿を 1 通のメールとして送信する
    ///
    /// 宛先が未指定なら既定の宛先を使う。どちらも無ければ SMTP に接続せず
    /// `no_recipient` の失敗を返す。
    pub async fn send_post(
        &self,
        post: &Post,
        recipient: Option<&str>,
        subject_prefix: Option<&str>,
    ) -> SendResult {
        let Some(recipient) = self.resolve_recipient(recipient) else {
            return self.reject_without_recipient();
        };
        let subject = post_subject(subject_prefix.unwrap_or(DEFAULT_SUBJECT_PREFIX), post);

        self.compose_and_deliver(post, recipient, subject).await
    }

    /// 同じ投稿を複数の宛先に 1 通ずつ送信する
    ///
    /// `personalized_subjects` に宛先が含まれていれば、その件名で送る。
    /// 結果は入力順で、重複した宛先にもそれぞれ送信する。
    pub async fn send_to_multiple_recipients(
        &self,
        post: &Post,
        recipients: &[String],
        subject_prefix: Option<&str>,
        personalized_subjects: Option<&HashMap<String, String>>,
    ) -> Vec<RecipientResult> {
        let default_subject = post_subject(subject_prefix.unwrap_or(DEFAULT_SUBJECT_PREFIX), post);
        let mut results = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            let subject = personalized_subjects
                .and_then(|subjects| subjects.get(recipient))
                .cloned()
                .unwrap_or_else(|| default_subject.clone());

            let result = self
                .compose_and_deliver(post, recipient.clone(), subject)
                .await;
            results.push(RecipientResult {
                recipient: recipient.clone(),
                result,
            });
        }

        results
    }

    /// 複数の投稿を送信する
    ///
    /// - `Separately`: 投稿ごとに `Post {i+1}` を件名プレフィックスにして 1 通ずつ送る。
    ///   結果キーはタイトル（無ければ `Post {i+1}`）
    /// - `Combined`: 全投稿を 1 通のダイジェストにまとめ、`Combined Posts` をキーにする
    pub async fn send_multiple_posts(
        &self,
        posts: &[Post],
        recipient: Option<&str>,
        mode: MultiPostMode,
    ) -> MultiPostReport {
        let mut report = MultiPostReport::default();
        if posts.is_empty() {
            return report;
        }

        match mode {
            MultiPostMode::Separately => {
                for (index, post) in posts.iter().enumerate() {
                    let prefix = numbered_prefix(index);
                    let result = self.send_post(post, recipient, Some(&prefix)).await;
                    report.results.push(KeyedSendResult {
                        key: post.result_key(index),
                        result,
                    });
                }
            }
            MultiPostMode::Combined => {
                let result = self.send_digest(posts, recipient).await;
                report.results.push(KeyedSendResult {
                    key: COMBINED_POSTS_KEY.to_string(),
                    result,
                });
            }
        }

        report
    }

    /// 投稿にファイルを添付して送信する
    ///
    /// ファイルが存在しなければ添付なしで送信する（警告ログのみ）。
    /// 存在するが読み込めない場合は送信せずに失敗を返す。
    pub async fn send_with_attachment(
        &self,
        post: &Post,
        attachment_path: &Path,
        recipient: Option<&str>,
    ) -> SendResult {
        let Some(recipient) = self.resolve_recipient(recipient) else {
            return self.reject_without_recipient();
        };

        let attachment = match load_attachment(attachment_path).await {
            Ok(Some(attachment)) => Some(attachment),
            Ok(None) => {
                tracing::warn!(
                    path = %attachment_path.display(),
                    "添付ファイルが見つからないため、添付なしで送信します"
                );
                None
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::MAIL_FAILED,
                    event.entity_type = event::entity_type::MAIL,
                    event.result = event::result::FAILURE,
                    error.category = error::category::INTERNAL,
                    error.kind = error::kind::ATTACHMENT,
                    mail.recipient = %recipient,
                    path = %attachment_path.display(),
                    error = %e,
                    "添付ファイルの読み込みに失敗"
                );
                return SendResult::Failed {
                    kind:    FailureKind::Other,
                    message: format!("添付ファイルの読み込みに失敗: {e}"),
                };
            }
        };

        let bodies = match self.template_renderer.render_post(post) {
            Ok(bodies) => bodies,
            Err(e) => return self.record_failure(&recipient, &e),
        };

        self.deliver(EmailMessage {
            to: recipient,
            subject: attachment_subject(post),
            text_body: bodies.text_body,
            html_body: Some(bodies.html_body),
            attachment,
        })
        .await
    }

    /// 宛先を検証してから一括送信する
    ///
    /// `skip_invalid` が `false` で不正な宛先が 1 件でもあれば、1 通も送らずに
    /// `aborted` を設定して返す。`true` なら検証を通過した宛先にのみ送る。
    pub async fn send_batch_with_validation(
        &self,
        post: &Post,
        recipients: &[String],
        subject_prefix: Option<&str>,
        skip_invalid: bool,
    ) -> BatchResult {
        let validation = validate_recipients(recipients);
        let invalid: Vec<String> = validation
            .iter()
            .filter(|verdict| !verdict.is_valid)
            .map(|verdict| verdict.address.clone())
            .collect();

        if !skip_invalid && !invalid.is_empty() {
            let aborted = InvalidRecipients { addresses: invalid };
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::BATCH_ABORTED,
                event.entity_type = event::entity_type::MAIL_BATCH,
                event.result = event::result::FAILURE,
                batch.total_recipients = recipients.len(),
                batch.invalid_emails = aborted.addresses.len(),
                error = %aborted,
                "不正な宛先が含まれているため一括送信を中止"
            );
            return BatchResult::new(validation, Vec::new(), Some(aborted));
        }

        let valid: Vec<String> = validation
            .iter()
            .filter(|verdict| verdict.is_valid)
            .map(|verdict| verdict.address.clone())
            .collect();
        let sending = self
            .send_to_multiple_recipients(post, &valid, subject_prefix, None)
            .await;

        let result = BatchResult::new(validation, sending, None);
        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::BATCH_COMPLETED,
            event.entity_type = event::entity_type::MAIL_BATCH,
            event.result = if result.summary.emails_failed == 0 {
                event::result::SUCCESS
            } else {
                event::result::FAILURE
            },
            batch.total_recipients = result.summary.total_recipients,
            batch.invalid_emails = result.summary.invalid_emails,
            batch.emails_sent = result.summary.emails_sent,
            batch.emails_failed = result.summary.emails_failed,
            "一括送信完了"
        );

        result
    }

    /// 使用中の送信バックエンド名
    pub fn backend_name(&self) -> &'static str {
        self.sender.backend_name()
    }

    /// メールを送らずに SMTP サーバーへの接続と認証を確認する
    pub async fn check_connection(&self) -> Result<(), NotificationError> {
        let result = self.sender.check_connection().await;
        match &result {
            Ok(()) => tracing::info!("SMTP サーバーへの接続と認証に成功"),
            Err(e) => tracing::warn!(
                error = %e,
                failure_kind = %e.kind(),
                "SMTP サーバーへの接続確認に失敗"
            ),
        }
        result
    }

    // ===== 内部処理 =====

    fn resolve_recipient(&self, recipient: Option<&str>) -> Option<String> {
        recipient
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .or_else(|| self.settings.default_recipient.clone())
    }

    fn reject_without_recipient(&self) -> SendResult {
        tracing::warn!("宛先が指定されておらず、既定の宛先も設定されていません");
        SendResult::failed(&NotificationError::NoRecipient)
    }

    /// 本文を生成して送信する
    async fn compose_and_deliver(&self, post: &Post, to: String, subject: String) -> SendResult {
        let bodies = match self.template_renderer.render_post(post) {
            Ok(bodies) => bodies,
            Err(e) => return self.record_failure(&to, &e),
        };

        self.deliver(EmailMessage {
            to,
            subject,
            text_body: bodies.text_body,
            html_body: Some(bodies.html_body),
            attachment: None,
        })
        .await
    }

    /// 全投稿をまとめたダイジェストを送信する
    async fn send_digest(&self, posts: &[Post], recipient: Option<&str>) -> SendResult {
        let Some(recipient) = self.resolve_recipient(recipient) else {
            return self.reject_without_recipient();
        };

        let text_body = match self.template_renderer.render_digest(posts) {
            Ok(body) => body,
            Err(e) => return self.record_failure(&recipient, &e),
        };

        self.deliver(EmailMessage {
            to: recipient,
            subject: digest_subject(posts.len()),
            text_body,
            html_body: None,
            attachment: None,
        })
        .await
    }

    /// 送信して結果をビジネスイベントとして記録する
    async fn deliver(&self, email: EmailMessage) -> SendResult {
        match self.sender.send_email(&email).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::MAIL_SENT,
                    event.entity_type = event::entity_type::MAIL,
                    event.result = event::result::SUCCESS,
                    mail.recipient = %email.to,
                    mail.subject = %email.subject,
                    mail.has_attachment = email.has_attachment(),
                    "メール送信成功"
                );
                SendResult::sent(&email.to)
            }
            Err(e) => self.record_failure(&email.to, &e),
        }
    }

    fn record_failure(&self, recipient: &str, e: &NotificationError) -> SendResult {
        let (error_category, error_kind) = match e {
            NotificationError::TemplateFailed(_) => {
                (error::category::INTERNAL, error::kind::TEMPLATE)
            }
            _ => (error::category::EXTERNAL_SERVICE, error::kind::SMTP),
        };

        log_business_event!(
            event.category = event::category::NOTIFICATION,
            event.action = event::action::MAIL_FAILED,
            event.entity_type = event::entity_type::MAIL,
            event.result = event::result::FAILURE,
            error.category = error_category,
            error.kind = error_kind,
            mail.recipient = %recipient,
            mail.failure_kind = %e.kind(),
            error = %e,
            "メール送信失敗"
        );
        SendResult::failed(e)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use chrono::DateTime;
    use postmailer_domain::clock::FixedClock;
    use postmailer_infra::mock::MockNotificationSender;
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_service(
        sender: MockNotificationSender,
        default_recipient: Option<&str>,
    ) -> MailDispatchService {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let template_renderer = TemplateRenderer::new(Arc::new(FixedClock::new(now))).unwrap();
        MailDispatchService::new(
            Arc::new(sender),
            template_renderer,
            DispatchSettings {
                default_recipient: default_recipient.map(str::to_string),
            },
        )
    }

    fn make_post(title: &str) -> Post {
        Post {
            title: Some(title.to_string()),
            content: Some("Body text".to_string()),
            topic: Some("Testing".to_string()),
            tone: Some("casual".to_string()),
            ..Default::default()
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    // ===== send_post =====

    #[tokio::test]
    async fn 単発送信は件名と両形式の本文を組み立てる() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let result = service
            .send_post(&make_post("Hello"), Some("reader@example.com"), None)
            .await;

        assert!(result.is_success());
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "reader@example.com");
        assert_eq!(sent[0].subject, "Generated Post: Hello");
        assert!(sent[0].text_body.contains("TITLE: Hello"));
        assert!(sent[0].html_body.as_deref().unwrap().contains("Hello"));
        assert!(sent[0].attachment.is_none());
    }

    #[tokio::test]
    async fn 宛先が無ければ既定の宛先に送る() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), Some("default@example.com"));

        let result = service
            .send_post(&make_post("Hello"), None, Some("Daily"))
            .await;

        assert!(result.is_success());
        assert_eq!(sender.sent_emails()[0].to, "default@example.com");
        assert_eq!(sender.sent_emails()[0].subject, "Daily: Hello");
    }

    #[tokio::test]
    async fn 宛先も既定の宛先も無ければ送信を試みない() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let result = service.send_post(&make_post("Hello"), None, None).await;

        assert_eq!(result.failure_kind(), Some(FailureKind::NoRecipient));
        assert_eq!(sender.attempt_count(), 0);
    }

    #[tokio::test]
    async fn 送信失敗は分類付きの結果として返る() {
        let sender = MockNotificationSender::new();
        sender.fail_for_recipient("reader@example.com", FailureKind::Authentication);
        let service = make_service(sender.clone(), None);

        let result = service
            .send_post(&make_post("Hello"), Some("reader@example.com"), None)
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Authentication));
        assert!(result.message().contains("SMTP 認証に失敗"));
    }

    // ===== send_to_multiple_recipients =====

    #[tokio::test]
    async fn 複数宛先は入力順に独立して送信される() {
        let sender = MockNotificationSender::new();
        sender.fail_for_recipient("b@example.com", FailureKind::Protocol);
        let service = make_service(sender.clone(), None);
        let recipients = strings(&["a@example.com", "b@example.com", "a@example.com"]);

        let results = service
            .send_to_multiple_recipients(&make_post("Hello"), &recipients, None, None)
            .await;

        let order: Vec<&str> = results.iter().map(|r| r.recipient.as_str()).collect();
        assert_eq!(order, vec!["a@example.com", "b@example.com", "a@example.com"]);
        assert!(results[0].result.is_success());
        assert_eq!(results[1].result.failure_kind(), Some(FailureKind::Protocol));
        assert!(results[2].result.is_success());
        assert_eq!(sender.attempt_count(), 3);
    }

    #[tokio::test]
    async fn 個別件名が指定された宛先はその件名で送る() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let recipients = strings(&["a@example.com", "b@example.com"]);
        let subjects = HashMap::from([("b@example.com".to_string(), "Just for you".to_string())]);

        service
            .send_to_multiple_recipients(
                &make_post("Hello"),
                &recipients,
                Some("News"),
                Some(&subjects),
            )
            .await;

        let sent = sender.sent_emails();
        assert_eq!(sent[0].subject, "News: Hello");
        assert_eq!(sent[1].subject, "Just for you");
    }

    // ===== send_multiple_posts =====

    #[tokio::test]
    async fn 個別送信で1件失敗しても全投稿の結果が返る() {
        let sender = MockNotificationSender::new();
        sender.fail_when_subject_contains("Second", FailureKind::Timeout);
        let service = make_service(sender.clone(), None);
        let posts = vec![make_post("First"), make_post("Second"), make_post("Third")];

        let report = service
            .send_multiple_posts(&posts, Some("reader@example.com"), MultiPostMode::Separately)
            .await;

        assert_eq!(report.len(), 3);
        assert_eq!(report.failure_count(), 1);
        assert!(report.get("First").unwrap().is_success());
        assert_eq!(
            report.get("Second").unwrap().failure_kind(),
            Some(FailureKind::Timeout)
        );
        assert!(report.get("Third").unwrap().is_success());
        assert_eq!(sender.attempt_count(), 3);

        let subjects: Vec<String> = sender.sent_emails().into_iter().map(|e| e.subject).collect();
        assert_eq!(subjects, vec!["Post 1: First", "Post 3: Third"]);
    }

    #[tokio::test]
    async fn タイトルの無い投稿は連番をキーにする() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender, Some("reader@example.com"));
        let posts = vec![make_post("First"), Post::default()];

        let report = service
            .send_multiple_posts(&posts, None, MultiPostMode::Separately)
            .await;

        let keys: Vec<&str> = report.results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["First", "Post 2"]);
    }

    #[tokio::test]
    async fn 結合送信は1通のダイジェストにまとめる() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let posts = vec![make_post("First"), make_post("Second")];

        let report = service
            .send_multiple_posts(&posts, Some("reader@example.com"), MultiPostMode::Combined)
            .await;

        assert_eq!(report.len(), 1);
        assert!(report.get("Combined Posts").unwrap().is_success());
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Multiple Posts - 2 Posts Generated");
        assert_eq!(sent[0].html_body, None);
        assert!(sent[0].text_body.contains("=== POST 2 ==="));
    }

    #[tokio::test]
    async fn 結合送信でも宛先が無ければ送信を試みない() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let report = service
            .send_multiple_posts(&[make_post("First")], None, MultiPostMode::Combined)
            .await;

        assert_eq!(
            report.get("Combined Posts").unwrap().failure_kind(),
            Some(FailureKind::NoRecipient)
        );
        assert_eq!(sender.attempt_count(), 0);
    }

    // ===== send_with_attachment =====

    #[tokio::test]
    async fn 添付ファイルを付けて送信する() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"attached notes")
            .unwrap();
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let result = service
            .send_with_attachment(&make_post("Hello"), &path, Some("reader@example.com"))
            .await;

        assert!(result.is_success());
        let sent = sender.sent_emails();
        assert_eq!(sent[0].subject, "Post (with attachment): Hello");
        let attachment = sent[0].attachment.as_ref().unwrap();
        assert_eq!(attachment.filename, "notes.txt");
        assert_eq!(attachment.content, b"attached notes".to_vec());
    }

    #[tokio::test]
    async fn 添付ファイルが無ければ添付なしで送信する() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.pdf");
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let result = service
            .send_with_attachment(&make_post("Hello"), &path, Some("reader@example.com"))
            .await;

        assert!(result.is_success());
        let sent = sender.sent_emails();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].attachment.is_none());
        assert!(sent[0].html_body.is_some());
    }

    #[tokio::test]
    async fn 読み込めない添付ファイルは送信せずに失敗を返す() {
        let dir = tempfile::tempdir().unwrap();
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);

        let result = service
            .send_with_attachment(&make_post("Hello"), dir.path(), Some("reader@example.com"))
            .await;

        assert_eq!(result.failure_kind(), Some(FailureKind::Other));
        assert_eq!(sender.attempt_count(), 0);
    }

    // ===== send_batch_with_validation =====

    #[tokio::test]
    async fn 不正な宛先をスキップして有効な宛先にだけ送る() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let recipients = strings(&["good@x.com", "bad", "also@good.org"]);

        let result = service
            .send_batch_with_validation(&make_post("Hello"), &recipients, None, true)
            .await;

        assert_eq!(sender.attempt_count(), 2);
        assert_eq!(result.invalid_emails(), vec!["bad"]);
        assert_eq!(result.summary.valid_emails, 2);
        assert_eq!(result.summary.emails_sent, 2);
        assert_eq!(result.summary.emails_failed, 0);
        let sent_to: Vec<&str> = result.sending.iter().map(|r| r.recipient.as_str()).collect();
        assert_eq!(sent_to, vec!["good@x.com", "also@good.org"]);
        assert!(!result.is_aborted());
    }

    #[tokio::test]
    async fn スキップしない場合は不正な宛先があれば1通も送らない() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        let recipients = strings(&["bad"]);

        let result = service
            .send_batch_with_validation(&make_post("Hello"), &recipients, None, false)
            .await;

        assert_eq!(sender.attempt_count(), 0);
        assert!(result.sending.is_empty());
        let aborted = result.aborted.unwrap();
        assert_eq!(aborted.addresses, vec!["bad".to_string()]);
        assert!(aborted.to_string().contains("bad"));
    }

    #[tokio::test]
    async fn 全て有効ならスキップしなくても送信する() {
        let sender = MockNotificationSender::new();
        sender.fail_for_recipient("b@example.com", FailureKind::Protocol);
        let service = make_service(sender.clone(), None);
        let recipients = strings(&["a@example.com", "b@example.com"]);

        let result = service
            .send_batch_with_validation(&make_post("Hello"), &recipients, Some("Weekly"), false)
            .await;

        assert_eq!(result.summary.emails_sent, 1);
        assert_eq!(result.summary.emails_failed, 1);
        assert_eq!(sender.sent_emails()[0].subject, "Weekly: Hello");
    }

    // ===== check_connection =====

    #[tokio::test]
    async fn 接続確認は送信者の結果をそのまま返す() {
        let sender = MockNotificationSender::new();
        let service = make_service(sender.clone(), None);
        assert!(service.check_connection().await.is_ok());

        sender.fail_connection(FailureKind::Authentication);

        let result = service.check_connection().await;
        assert_eq!(result.unwrap_err().kind(), FailureKind::Authentication);
        assert_eq!(sender.attempt_count(), 0);
    }

    #[test]
    fn バックエンド名は送信者から取得する() {
        let service = make_service(MockNotificationSender::new(), None);

        assert_eq!(service.backend_name(), "mock");
    }
}
