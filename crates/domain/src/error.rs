//! # ドメイン層エラー定義
//!
//! ドメインルール違反を表現するエラー型。
//!
//! ## 使用例
//!
//! ```rust
//! use postmailer_domain::DomainError;
//!
//! fn validate_subject(subject: &str) -> Result<(), DomainError> {
//!     if subject.is_empty() {
//!         return Err(DomainError::Validation("件名は必須です".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がドメインルールに違反している場合に使用する。
    ///
    /// # 例
    ///
    /// - 不正な形式のメールアドレス
    /// - 空の送信者認証情報
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}
