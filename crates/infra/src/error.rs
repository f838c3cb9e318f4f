//! # インフラ層エラー定義
//!
//! シークレット解決やファイル読み込みで発生するエラーを表現する。
//! SMTP 送信のエラーはここではなく、ドメインの `NotificationError` で表す。
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`InfraError`]: エラー種別（[`InfraErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`InfraErrorKind`]: エラーの具体的な種別（MissingSecret, Io 等）

use std::fmt;

use derive_more::Display;
use thiserror::Error;
use tracing_error::SpanTrace;

/// インフラ層で発生するエラー
///
/// `From<std::io::Error>` や convenience constructor でエラーを生成すると、
/// その時点のスパン情報が自動的にキャプチャされる。
#[derive(Display)]
#[display("{kind}")]
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

/// インフラ層エラーの種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    /// 必須のシークレットが設定されていない（未設定または空文字列）
    #[error("シークレットが設定されていません: {name}")]
    MissingSecret { name: String },

    /// シークレットの値を解釈できない
    #[error("シークレットの値が不正です: {name}（{reason}）")]
    InvalidSecret { name: String, reason: String },

    /// ファイル I/O エラー
    #[error("ファイル I/O エラー: {0}")]
    Io(#[source] std::io::Error),

    /// 予期しないエラー
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

// ===== InfraError のメソッド =====

impl InfraError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    // ===== Convenience constructors =====

    /// シークレット未設定エラーを生成する
    pub fn missing_secret(name: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::MissingSecret { name: name.into() },
            span_trace: SpanTrace::capture(),
        }
    }

    /// シークレット値不正エラーを生成する
    pub fn invalid_secret(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::InvalidSecret {
                name:   name.into(),
                reason: reason.into(),
            },
            span_trace: SpanTrace::capture(),
        }
    }

    /// 予期しないエラーを生成する
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self {
            kind:       InfraErrorKind::Unexpected(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }
}

// ===== トレイト実装 =====

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfraError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

// ===== From 実装（SpanTrace 自動キャプチャ） =====

impl From<std::io::Error> for InfraError {
    fn from(source: std::io::Error) -> Self {
        Self {
            kind:       InfraErrorKind::Io(source),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use pretty_assertions::assert_eq;
    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    #[test]
    fn test_from_io_errorでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_attachment");
            let _enter = span.enter();

            let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
            let err: InfraError = io_err.into();

            assert!(matches!(err.kind(), InfraErrorKind::Io(_)));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_attachment"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_missing_secretでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_config");
            let _enter = span.enter();

            let err = InfraError::missing_secret("EMAIL_PASSWORD");

            assert!(matches!(
                err.kind(),
                InfraErrorKind::MissingSecret { name } if name == "EMAIL_PASSWORD"
            ));
            assert!(format!("{}", err.span_trace()).contains("test_config"));
        });
    }

    #[test]
    fn test_displayがinfra_error_kindのメッセージを出力する() {
        let err = InfraError::invalid_secret("EMAIL_SENDER", "UTF-8 ではありません");
        assert_eq!(
            format!("{err}"),
            "シークレットの値が不正です: EMAIL_SENDER（UTF-8 ではありません）"
        );
    }

    #[test]
    fn test_sourceがinfra_error_kindに委譲する() {
        let io_err = std::io::Error::other("broken");
        let err: InfraError = io_err.into();
        assert!(err.source().is_some());

        let err = InfraError::unexpected("x");
        assert!(err.source().is_none());
    }
}
