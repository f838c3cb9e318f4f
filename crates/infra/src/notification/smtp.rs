//! SMTP 通知送信実装
//!
//! lettre の `AsyncSmtpConnection` を使い、1 通ごとに以下の段階を順に実行する。
//!
//! ```text
//! 接続（EHLO 含む） → STARTTLS → 認証 → 送信 → QUIT
//! ```
//!
//! 各段階は `SmtpSettings::timeout` で打ち切る。失敗した段階によってエラーを分類し、
//! 認証情報の誤りとネットワーク障害を呼び出し側が区別できるようにする。
//! 接続できた後は、途中の段階が失敗しても QUIT を送ってから結果を返す。
//! QUIT の失敗は送信結果を変えない。

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use derive_more::Display;
use lettre::{
    Message,
    message::{
        Attachment, Body, Mailbox, MultiPart, SinglePart,
        header::{ContentTransferEncoding, ContentType},
    },
    transport::smtp::{
        Error as SmtpError,
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        extension::ClientId,
    },
};
use postmailer_domain::{
    credentials::SenderCredentials,
    email_address::EmailAddress,
    notification::{EmailAttachment, EmailMessage, NotificationError, SessionState},
};

use super::NotificationSender;

/// SMTP 接続設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// SMTP サーバーのホスト名
    pub host:      String,
    /// SMTP サーバーのポート番号（STARTTLS を前提とするため通常 587）
    pub port:      u16,
    /// 各段階のタイムアウト
    pub timeout:   Duration,
    /// EHLO で名乗るホスト名
    pub helo_name: String,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host:      "smtp.gmail.com".to_string(),
            port:      587,
            timeout:   Duration::from_secs(10),
            helo_name: "localhost".to_string(),
        }
    }
}

/// SMTP 通知送信
///
/// 接続は保持しない。`send_email` のたびにセッションを開いて閉じる。
pub struct SmtpNotificationSender {
    settings:    SmtpSettings,
    credentials: SenderCredentials,
}

impl SmtpNotificationSender {
    /// 新しい SMTP 送信インスタンスを作成
    pub fn new(settings: SmtpSettings, credentials: SenderCredentials) -> Self {
        Self {
            settings,
            credentials,
        }
    }

    /// タイムアウト付きで 1 段階を実行し、失敗を段階に応じて分類する
    async fn run_stage<T, F>(&self, stage: Stage, operation: F) -> Result<T, NotificationError>
    where
        F: Future<Output = Result<T, SmtpError>>,
    {
        match tokio::time::timeout(self.settings.timeout, operation).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(stage.classify(&e)),
            Err(_) => Err(NotificationError::Timeout(format!(
                "{stage}が {} 秒以内に完了しませんでした",
                self.settings.timeout.as_secs_f32()
            ))),
        }
    }

    /// 接続して EHLO まで済ませたセッションを返す
    async fn connect(
        &self,
        session: &mut SessionTracker<'_>,
    ) -> Result<AsyncSmtpConnection, NotificationError> {
        let hello = self.hello();

        session.transition(SessionState::Connecting);
        let connection = self
            .run_stage(
                Stage::Connect,
                AsyncSmtpConnection::connect_tokio1(
                    (self.settings.host.clone(), self.settings.port),
                    Some(self.settings.timeout),
                    &hello,
                    None,
                    None,
                ),
            )
            .await?;

        Ok(connection)
    }

    /// 接続後の段階（STARTTLS・認証・送信）を実行する
    ///
    /// `message` が `None` の場合は認証までで止める（接続確認）。
    async fn transact(
        &self,
        session: &mut SessionTracker<'_>,
        connection: &mut AsyncSmtpConnection,
        message: Option<&Message>,
    ) -> Result<(), NotificationError> {
        let hello = self.hello();

        session.transition(SessionState::Securing);
        let tls_parameters = TlsParameters::new(self.settings.host.clone())
            .map_err(|e| NotificationError::Protocol(format!("TLS 設定の構築に失敗: {e}")))?;
        self.run_stage(Stage::StartTls, connection.starttls(tls_parameters, &hello))
            .await?;

        session.transition(SessionState::Authenticating);
        let credentials = Credentials::new(
            self.credentials.sender().to_string(),
            self.credentials.secret().to_string(),
        );
        self.run_stage(
            Stage::Auth,
            connection.auth(&[Mechanism::Plain, Mechanism::Login], &credentials),
        )
        .await?;

        let Some(message) = message else {
            return Ok(());
        };

        session.transition(SessionState::Sending);
        let formatted = message.formatted();
        self.run_stage(Stage::Send, connection.send(message.envelope(), &formatted))
            .await?;

        Ok(())
    }

    /// 1 セッションを実行する。接続できた後は結果に関わらず QUIT を試みる
    async fn run_session(
        &self,
        session: &mut SessionTracker<'_>,
        message: Option<&Message>,
    ) -> Result<(), NotificationError> {
        let mut connection = self.connect(session).await?;
        let result = self.transact(session, &mut connection, message).await;
        self.quit(&mut connection).await;
        result
    }

    async fn quit(&self, connection: &mut AsyncSmtpConnection) {
        match tokio::time::timeout(self.settings.timeout, connection.quit()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "SMTP セッションの終了に失敗（結果には影響しない）");
            }
            Err(_) => {
                tracing::warn!("SMTP セッションの終了がタイムアウト（結果には影響しない）");
            }
        }
    }

    fn hello(&self) -> ClientId {
        ClientId::Domain(self.settings.helo_name.clone())
    }
}

#[async_trait]
impl NotificationSender for SmtpNotificationSender {
    fn backend_name(&self) -> &'static str {
        "smtp"
    }

    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let message = build_message(self.credentials.sender(), email)?;

        let mut session = SessionTracker::new(&email.to);
        let result = self.run_session(&mut session, Some(&message)).await;
        session.finish(&result);

        result
    }

    async fn check_connection(&self) -> Result<(), NotificationError> {
        let mut session = SessionTracker::new("(connection check)");
        let result = self.run_session(&mut session, None).await;
        session.finish(&result);

        result
    }
}

/// ドメインの `EmailMessage` から MIME メッセージを組み立てる
///
/// | HTML 本文 | 添付 | 構造 |
/// |----------|-----|------|
/// | あり | なし | `multipart/alternative`（text/plain + text/html） |
/// | なし | なし | `text/plain` のみ |
/// | あり | あり | `multipart/mixed`（alternative + 添付） |
/// | なし | あり | `multipart/mixed`（text/plain + 添付） |
pub fn build_message(
    from: &EmailAddress,
    email: &EmailMessage,
) -> Result<Message, NotificationError> {
    let from: Mailbox = from
        .as_str()
        .parse()
        .map_err(|e| NotificationError::InvalidAddress(format!("送信元アドレス不正: {e}")))?;
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|e| NotificationError::InvalidAddress(format!("宛先アドレス不正: {e}")))?;

    let builder = Message::builder()
        .from(from)
        .to(to)
        .subject(&email.subject);

    let text_part = || {
        SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(email.text_body.clone())
    };
    let alternative = |html: &String| {
        MultiPart::alternative().singlepart(text_part()).singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html.clone()),
        )
    };

    let message = match (&email.html_body, &email.attachment) {
        (Some(html), None) => builder.multipart(alternative(html)),
        (None, None) => builder.singlepart(text_part()),
        (Some(html), Some(attachment)) => builder.multipart(
            MultiPart::mixed()
                .multipart(alternative(html))
                .singlepart(attachment_part(attachment)?),
        ),
        (None, Some(attachment)) => builder.multipart(
            MultiPart::mixed()
                .singlepart(text_part())
                .singlepart(attachment_part(attachment)?),
        ),
    };

    message.map_err(|e| NotificationError::MessageBuild(e.to_string()))
}

fn attachment_part(attachment: &EmailAttachment) -> Result<SinglePart, NotificationError> {
    let content_type = ContentType::parse(EmailAttachment::CONTENT_TYPE)
        .map_err(|e| NotificationError::MessageBuild(format!("Content-Type 不正: {e}")))?;

    let body = Body::new_with_encoding(attachment.content.clone(), ContentTransferEncoding::Base64)
        .map_err(|_| NotificationError::MessageBuild("添付の base64 エンコードに失敗".to_string()))?;

    Ok(Attachment::new(attachment.filename.clone()).body(body, content_type))
}

/// SMTP セッションの段階
#[derive(Debug, Clone, Copy, Display)]
enum Stage {
    #[display("接続")]
    Connect,
    #[display("STARTTLS")]
    StartTls,
    #[display("認証")]
    Auth,
    #[display("送信")]
    Send,
}

impl Stage {
    fn classify(self, error: &SmtpError) -> NotificationError {
        if error.is_timeout() {
            return NotificationError::Timeout(format!("{self}: {error}"));
        }

        match self {
            Self::Connect => {
                NotificationError::SendFailed(format!("SMTP サーバーへの接続に失敗: {error}"))
            }
            Self::StartTls => NotificationError::Protocol(format!("STARTTLS に失敗: {error}")),
            Self::Auth if error.is_permanent() || error.is_transient() || error.is_client() => {
                NotificationError::Authentication(error.to_string())
            }
            Self::Auth => NotificationError::SendFailed(format!("認証中に通信が失敗: {error}")),
            Self::Send if error.is_permanent() || error.is_transient() => {
                NotificationError::Protocol(format!("サーバーが送信を拒否: {error}"))
            }
            Self::Send => NotificationError::SendFailed(error.to_string()),
        }
    }
}

/// 1 回のセッションの状態遷移を記録する
struct SessionTracker<'a> {
    recipient: &'a str,
    state:     SessionState,
}

impl<'a> SessionTracker<'a> {
    fn new(recipient: &'a str) -> Self {
        Self {
            recipient,
            state: SessionState::Unsent,
        }
    }

    fn transition(&mut self, next: SessionState) {
        let from: &'static str = self.state.into();
        let to: &'static str = next.into();
        tracing::debug!(recipient = %self.recipient, from, to, "SMTP セッション状態遷移");
        self.state = next;
    }

    fn finish(&mut self, result: &Result<(), NotificationError>) {
        match result {
            Ok(()) => self.transition(SessionState::Closed),
            Err(e) => {
                tracing::debug!(recipient = %self.recipient, error = %e, "SMTP セッション失敗");
                self.transition(SessionState::Failed(e.kind()));
            }
        }
    }
}
