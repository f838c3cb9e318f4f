//! # Mail Service 設定
//!
//! 環境変数から Mail Service サーバーの設定を読み込む。
//! 送信者の認証情報は [`SecretResolver`] 経由で取得し、起動時に一度だけ検証する。

use std::{env, str::FromStr, time::Duration};

use postmailer_domain::{DomainError, credentials::SenderCredentials, email_address::EmailAddress};
use postmailer_infra::{
    InfraError,
    notification::SmtpSettings,
    secret::{EnvSecretResolver, SecretResolver},
};
use thiserror::Error;

/// 設定読み込みエラー（起動時に致命的）
#[derive(Debug, Error)]
pub enum ConfigError {
    /// シークレットの取得に失敗
    #[error("シークレットの取得に失敗: {0}")]
    Secret(#[from] InfraError),

    /// 送信者の認証情報または既定の宛先が不正
    #[error("メール設定が不正: {0}")]
    Credentials(#[from] DomainError),

    /// 設定値を解釈できない
    #[error("{name} の値が不正です: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Mail Service サーバーの設定
#[derive(Debug, Clone)]
pub struct MailServiceConfig {
    /// バインドアドレス
    pub host:         String,
    /// ポート番号
    pub port:         u16,
    /// 通知設定
    pub notification: NotificationConfig,
}

/// 送信バックエンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationBackend {
    /// SMTP サーバー経由で送信
    Smtp,
    /// 送信しない（ログ出力のみ）
    Noop,
}

impl FromStr for NotificationBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smtp" => Ok(Self::Smtp),
            "noop" => Ok(Self::Noop),
            _ => Err(ConfigError::InvalidValue {
                name:  "NOTIFICATION_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

/// 通知機能の設定
///
/// `NOTIFICATION_BACKEND` 環境変数で送信バックエンドを切り替える:
/// - `smtp`: SMTP サーバー（既定は Gmail の STARTTLS ポート）経由で送信
/// - `noop`: 送信しない（ログ出力のみ）
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    /// 送信バックエンド
    pub backend:           NotificationBackend,
    /// SMTP 接続設定
    pub smtp:              SmtpSettings,
    /// 送信者の認証情報
    pub credentials:       SenderCredentials,
    /// 既定の宛先（`EMAIL_RECIPIENT`）
    pub default_recipient: Option<EmailAddress>,
}

impl MailServiceConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&EnvSecretResolver, |name| env::var(name).ok())
    }

    /// シークレットと通常の設定値の取得元を指定して読み込む
    pub fn load<F>(secrets: &dyn SecretResolver, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            host:         var("MAIL_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port:         parse_or("MAIL_PORT", var("MAIL_PORT"), 3002)?,
            notification: NotificationConfig::load(secrets, &var)?,
        })
    }
}

impl NotificationConfig {
    fn load<F>(secrets: &dyn SecretResolver, var: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SmtpSettings::default();
        let backend = match var("NOTIFICATION_BACKEND") {
            Some(value) => value.parse()?,
            None => NotificationBackend::Smtp,
        };
        let timeout_secs = parse_or(
            "SMTP_TIMEOUT_SECS",
            var("SMTP_TIMEOUT_SECS"),
            defaults.timeout.as_secs(),
        )?;

        let credentials = SenderCredentials::new(
            secrets.resolve("EMAIL_SENDER")?,
            secrets.resolve("EMAIL_PASSWORD")?,
        )?;
        let default_recipient = secrets
            .resolve_optional("EMAIL_RECIPIENT")?
            .map(EmailAddress::parse)
            .transpose()?;

        Ok(Self {
            backend,
            smtp: SmtpSettings {
                host:      var("SMTP_HOST").unwrap_or(defaults.host),
                port:      parse_or("SMTP_PORT", var("SMTP_PORT"), defaults.port)?,
                timeout:   Duration::from_secs(timeout_secs),
                helo_name: var("SMTP_HELO_NAME").unwrap_or(defaults.helo_name),
            },
            credentials,
            default_recipient,
        })
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(default),
    }
}
