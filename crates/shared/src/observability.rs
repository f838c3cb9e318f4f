//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//!
//! ## 環境変数
//!
//! | 変数名 | 説明 |
//! |--------|------|
//! | `LOG_FORMAT` | `json` または `pretty`（デフォルト: `pretty`） |
//! | `SMTP_WIRE_LOG` | `true` / `1` で lettre の SMTP コマンド・応答を trace 出力する |
//! | `RUST_LOG` | 設定されていれば上記より優先してフィルタに使う |
//!
//! SMTP のやり取りには認証情報（AUTH の Base64）が含まれるため、
//! `SMTP_WIRE_LOG` は開発環境でのみ有効にすること。

/// ログ出力形式
///
/// 値が未設定または不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は stderr に警告を出力する（トレーシング初期化前のため）。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名（初期化ログに出力）
    pub service_name:  String,
    /// ログ出力形式
    pub log_format:    LogFormat,
    /// lettre の SMTP 通信ログを出すか
    pub smtp_wire_log: bool,
}

impl TracingConfig {
    /// 新しい設定を作成する（SMTP 通信ログは無効）
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            smtp_wire_log: false,
        }
    }

    /// 環境変数から設定を読み取る
    pub fn from_env(service_name: impl Into<String>) -> Self {
        let log_format = std::env::var("LOG_FORMAT")
            .map(|value| LogFormat::parse(&value))
            .unwrap_or_default();
        let smtp_wire_log = std::env::var("SMTP_WIRE_LOG")
            .map(|value| parse_flag(&value))
            .unwrap_or(false);

        Self {
            smtp_wire_log,
            ..Self::new(service_name, log_format)
        }
    }

    /// `RUST_LOG` 未設定時に使うフィルタ
    ///
    /// lettre は接続ごとに debug ログを出すため、通常は warn 以上に絞る。
    pub fn default_filter(&self) -> String {
        let lettre_level = if self.smtp_wire_log { "trace" } else { "warn" };
        format!("info,postmailer=debug,lettre={lettre_level}")
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。未設定なら
/// [`TracingConfig::default_filter`] を使う。
///
/// `tracing-error` の `ErrorLayer` を登録するため、インフラ層エラーの
/// `SpanTrace` にスパン情報が記録される。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.default_filter().into());

    let fmt_layer = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::debug!(
        service = %config.service_name,
        log_format = ?config.log_format,
        smtp_wire_log = config.smtp_wire_log,
        "トレーシングを初期化しました"
    );
    if config.smtp_wire_log {
        tracing::warn!("SMTP 通信ログが有効です（認証情報がログに残る可能性があります）");
    }
}
