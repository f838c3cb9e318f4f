//! # 送信者認証情報
//!
//! SMTP 認証に使う送信元アドレスとシークレット（パスワードまたはアプリパスワード）。
//! サービス起動時に一度だけ解決され、以降は読み取り専用で共有される。

use std::fmt;

use crate::{DomainError, email_address::EmailAddress};

/// 送信者認証情報
///
/// `Debug` 出力ではシークレットを伏せる。
#[derive(Clone)]
pub struct SenderCredentials {
    sender: EmailAddress,
    secret: String,
}

impl SenderCredentials {
    /// 認証情報を作成する
    ///
    /// # エラー
    ///
    /// - 送信元アドレスの形式が不正
    /// - シークレットが空
    ///
    /// のいずれかで `DomainError::Validation` を返す。
    pub fn new(sender: impl Into<String>, secret: impl Into<String>) -> Result<Self, DomainError> {
        let sender = EmailAddress::parse(sender)?;
        let secret = secret.into();
        if secret.is_empty() {
            return Err(DomainError::Validation(
                "送信者のシークレットは必須です".to_string(),
            ));
        }
        Ok(Self { sender, secret })
    }

    pub fn sender(&self) -> &EmailAddress {
        &self.sender
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for SenderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderCredentials")
            .field("sender", &self.sender)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
