//! # メールアドレス検証
//!
//! 宛先アドレスの構文チェックを提供する。
//!
//! ## 設計方針
//!
//! - **構文のみ**: `local-part@domain.tld` の形を正規表現で判定する。DNS / MX の問い合わせは行わない
//! - **保守的な文字集合**: ローカル部は英数字と `._%+-`、ドメインは英数字と `.-`、TLD は 2 文字以上の英字
//! - **副作用なし**: 同じ入力には常に同じ結果を返す

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::DomainError;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("メールアドレスの正規表現が不正です")
});

/// 文字列がメールアドレスの形式を満たすか判定する
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

/// 1 件の宛先に対する検証結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressVerdict {
    pub address:  String,
    pub is_valid: bool,
}

/// 宛先リストをまとめて検証する
///
/// 入力順を保持し、重複もそのまま 1 件ずつ結果を返す。
pub fn validate_recipients(recipients: &[String]) -> Vec<AddressVerdict> {
    recipients
        .iter()
        .map(|address| AddressVerdict {
            address:  address.clone(),
            is_valid: is_valid_email(address),
        })
        .collect()
}

/// 宛先リストのうち形式が不正なものだけを返す
pub fn invalid_emails(recipients: &[String]) -> Vec<String> {
    recipients
        .iter()
        .filter(|address| !is_valid_email(address))
        .cloned()
        .collect()
}

/// 検証済みメールアドレス（値オブジェクト）
///
/// [`is_valid_email`] を通過した文字列のみ保持する。
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// メールアドレスを作成する
    ///
    /// # エラー
    ///
    /// 形式が不正な場合は `DomainError::Validation` を返す。
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if !is_valid_email(&value) {
            return Err(DomainError::Validation(format!(
                "メールアドレスの形式が不正です: {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}
