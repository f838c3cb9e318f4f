//! # シークレット解決
//!
//! 送信者アドレスやパスワードなど、設定ファイルに直接書きたくない値を取得する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: 環境変数以外（シークレットストア等）への差し替えを可能にする
//! - **空文字列は未設定扱い**: `EMAIL_PASSWORD=` のような設定ミスを起動時に検出する
//! - **値はログに出さない**: エラーには変数名のみ含める

use std::{collections::HashMap, env};

use crate::error::InfraError;

/// シークレット解決トレイト
pub trait SecretResolver: Send + Sync {
    /// 必須のシークレットを取得する
    fn resolve(&self, name: &str) -> Result<String, InfraError> {
        self.resolve_optional(name)?
            .ok_or_else(|| InfraError::missing_secret(name))
    }

    /// 任意のシークレットを取得する（未設定・空文字列なら `None`）
    fn resolve_optional(&self, name: &str) -> Result<Option<String>, InfraError>;
}

/// 環境変数からシークレットを取得する実装
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretResolver;

impl SecretResolver for EnvSecretResolver {
    fn resolve_optional(&self, name: &str) -> Result<Option<String>, InfraError> {
        match env::var(name) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => Err(InfraError::invalid_secret(
                name,
                "UTF-8 として解釈できません",
            )),
        }
    }
}

/// 固定値からシークレットを取得する実装
///
/// テストや、起動引数で値を受け取る場合に使用する。
#[derive(Debug, Clone, Default)]
pub struct StaticSecretResolver {
    values: HashMap<String, String>,
}

impl StaticSecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を追加する
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretResolver for StaticSecretResolver {
    fn resolve_optional(&self, name: &str) -> Result<Option<String>, InfraError> {
        Ok(self.values.get(name).filter(|v| !v.is_empty()).cloned())
    }
}
