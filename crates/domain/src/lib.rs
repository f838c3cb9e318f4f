//! # Post Mailer ドメイン層
//!
//! 投稿メール配信の中核となるドメインモデルを定義する。
//!
//! ## 依存関係の方向
//!
//! ```text
//! mail-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（SMTP など外部サービス）には一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`clock`] - 現在時刻の抽象化（投稿の生成日時デフォルト値に使用）
//! - [`post`] - メール本文の元になる投稿レコード
//! - [`email_address`] - メールアドレスの構文検証
//! - [`credentials`] - 送信者の認証情報
//! - [`notification`] - メールメッセージ・送信結果・送信エラー
//!
//! ## 使用例
//!
//! ```rust
//! use postmailer_domain::email_address::{invalid_emails, is_valid_email};
//!
//! assert!(is_valid_email("a.b+c@sub.example.co"));
//!
//! let recipients = vec!["good@x.com".to_string(), "bad".to_string()];
//! assert_eq!(invalid_emails(&recipients), vec!["bad".to_string()]);
//! ```

pub mod clock;
pub mod credentials;
pub mod email_address;
pub mod error;
pub mod notification;
pub mod post;

pub use error::DomainError;
