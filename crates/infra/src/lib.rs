//! # Post Mailer インフラ層
//!
//! 外部システム（SMTP サーバー、環境変数、ファイルシステム）との接続を担当する。
//!
//! ## 設計方針
//!
//! このクレートはドメイン層で定義された型を入出力とする具体的な実装を提供する。
//! 外部システムの詳細をカプセル化し、ドメイン層とユースケース層を
//! インフラの変更から保護する。
//!
//! ## 責務
//!
//! - **メール送信**: SMTP セッション（接続 → STARTTLS → 認証 → 送信 → 終了）
//! - **シークレット解決**: 送信者アドレスとパスワードの取得
//! - **添付ファイル読み込み**: ローカルファイルをメモリに読み込む
//!
//! ## 依存関係
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`error`] - インフラ層エラー定義
//! - [`notification`] - メール送信トレイトと実装
//! - [`secret`] - シークレット解決
//! - [`attachment`] - 添付ファイル読み込み
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use postmailer_infra::{
//!     notification::{NotificationSender, SmtpNotificationSender, SmtpSettings},
//!     secret::{EnvSecretResolver, SecretResolver},
//! };
//!
//! async fn check() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = EnvSecretResolver;
//!     let credentials = SenderCredentials::new(
//!         resolver.resolve("EMAIL_SENDER")?,
//!         resolver.resolve("EMAIL_PASSWORD")?,
//!     )?;
//!     let sender = SmtpNotificationSender::new(SmtpSettings::default(), credentials);
//!     sender.check_connection().await?;
//!     Ok(())
//! }
//! ```

pub mod attachment;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod secret;

pub use error::{InfraError, InfraErrorKind};
