//! # 通知
//!
//! メール配信に関するドメインモデルを定義する。
//!
//! ## ドメイン用語
//!
//! | 型 | ドメイン用語 | 説明 |
//! |---|------------|------|
//! | [`EmailMessage`] | メールメッセージ | 宛先 1 件分の組み立て済みメール |
//! | [`SendResult`] | 送信結果 | 1 回の配信試行の成否と説明文 |
//! | [`BatchResult`] | 一括送信結果 | 検証結果・宛先ごとの送信結果・集計 |
//! | [`MultiPostReport`] | 複数投稿送信結果 | 投稿タイトルごとの送信結果 |
//! | [`SessionState`] | セッション状態 | 1 回の SMTP セッションの進行状態 |
//!
//! ## 設計方針
//!
//! - **結果は値で返す**: 配信失敗は [`NotificationError`] → [`SendResult::Failed`] に変換し、
//!   ディスパッチ境界の外へエラーとして伝播させない
//! - **自動リトライなし**: どの階層でも再送しない。再送するかは呼び出し側が決める
//! - **順序保持**: 宛先・投稿ごとの結果は入力順の `Vec` で保持し、重複も潰さない

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;

use crate::email_address::AddressVerdict;

/// 結合送信モードで使う結果キー
pub const COMBINED_POSTS_KEY: &str = "Combined Posts";

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// 宛先も既定の宛先も無い
    #[error("宛先メールアドレスが指定されていません")]
    NoRecipient,

    /// 送信元・宛先アドレスの解釈に失敗
    #[error("メールアドレスが不正: {0}")]
    InvalidAddress(String),

    /// SMTP 認証の拒否（多くの場合ネットワークではなく認証情報の誤り）
    #[error("SMTP 認証に失敗（EMAIL_SENDER / EMAIL_PASSWORD を確認してください）: {0}")]
    Authentication(String),

    /// SMTP プロトコル上のエラー（STARTTLS 失敗、エラー応答など）
    #[error("SMTP プロトコルエラー: {0}")]
    Protocol(String),

    /// 接続・応答のタイムアウト
    #[error("SMTP サーバーの応答がタイムアウト: {0}")]
    Timeout(String),

    /// MIME メッセージの構築に失敗
    #[error("メッセージ構築に失敗: {0}")]
    MessageBuild(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// 上記に分類できない送信失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),
}

impl NotificationError {
    /// エラーの分類を返す
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NoRecipient => FailureKind::NoRecipient,
            Self::InvalidAddress(_) => FailureKind::InvalidAddress,
            Self::Authentication(_) => FailureKind::Authentication,
            Self::Protocol(_) => FailureKind::Protocol,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::MessageBuild(_) => FailureKind::MessageBuild,
            Self::TemplateFailed(_) => FailureKind::Template,
            Self::SendFailed(_) => FailureKind::Other,
        }
    }
}

/// 配信失敗の分類
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    NoRecipient,
    InvalidAddress,
    Authentication,
    Protocol,
    Timeout,
    MessageBuild,
    Template,
    Other,
}

/// 添付ファイル
///
/// ファイル全体をメモリに読み込んだもの。サイズ上限は設けていない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    /// ファイル名（パスを除いたベース名）
    pub filename: String,
    /// ファイル内容
    pub content:  Vec<u8>,
}

impl EmailAttachment {
    /// 添付パートの Content-Type
    pub const CONTENT_TYPE: &'static str = "application/octet-stream";
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
/// 送信元アドレスは送信側（認証情報）が持つ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:         String,
    /// 件名
    pub subject:    String,
    /// プレーンテキスト本文
    pub text_body:  String,
    /// HTML 本文（結合ダイジェストでは `None`）
    pub html_body:  Option<String>,
    /// 添付ファイル
    pub attachment: Option<EmailAttachment>,
}

impl EmailMessage {
    pub fn has_attachment(&self) -> bool {
        self.attachment.is_some()
    }
}

/// 1 回の配信試行の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendResult {
    /// 送信成功
    Sent { message: String },
    /// 送信失敗
    Failed { kind: FailureKind, message: String },
}

impl SendResult {
    /// 宛先への送信成功を表す結果を作る
    pub fn sent(recipient: &str) -> Self {
        Self::Sent {
            message: format!("{recipient} へのメール送信に成功しました"),
        }
    }

    /// エラーから失敗結果を作る
    pub fn failed(error: &NotificationError) -> Self {
        Self::Failed {
            kind:    error.kind(),
            message: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Sent { message } | Self::Failed { message, .. } => message,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Sent { .. } => None,
            Self::Failed { kind, .. } => Some(*kind),
        }
    }
}

/// 宛先ごとの送信結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientResult {
    pub recipient: String,
    pub result:    SendResult,
}

/// キー（投稿タイトルなど）付きの送信結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyedSendResult {
    pub key:    String,
    pub result: SendResult,
}

/// 複数投稿の送信モード
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiPostMode {
    /// 投稿ごとに 1 通ずつ送る
    #[default]
    Separately,
    /// 全投稿を 1 通のダイジェストにまとめて送る
    Combined,
}

/// 複数投稿送信の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiPostReport {
    pub results: Vec<KeyedSendResult>,
}

impl MultiPostReport {
    /// キーに一致する最初の結果を返す
    pub fn get(&self, key: &str) -> Option<&SendResult> {
        self.results
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.result)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 失敗した結果の件数
    pub fn failure_count(&self) -> usize {
        self.results
            .iter()
            .filter(|entry| !entry.result.is_success())
            .count()
    }
}

/// 不正な宛先が含まれていたため一括送信を中止したことを表す
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("無効なメールアドレスが含まれています: {}", addresses.join(", "))]
pub struct InvalidRecipients {
    pub addresses: Vec<String>,
}

/// 一括送信の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_recipients: usize,
    pub valid_emails:     usize,
    pub invalid_emails:   usize,
    pub emails_sent:      usize,
    pub emails_failed:    usize,
}

/// 検証付き一括送信の結果
///
/// `sending` には検証を通過した宛先のみが含まれる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    pub validation: Vec<AddressVerdict>,
    pub sending:    Vec<RecipientResult>,
    pub summary:    BatchSummary,
    pub aborted:    Option<InvalidRecipients>,
}

impl BatchResult {
    /// 検証結果と送信結果から集計を計算して組み立てる
    pub fn new(
        validation: Vec<AddressVerdict>,
        sending: Vec<RecipientResult>,
        aborted: Option<InvalidRecipients>,
    ) -> Self {
        let valid_emails = validation.iter().filter(|v| v.is_valid).count();
        let emails_sent = sending.iter().filter(|r| r.result.is_success()).count();
        let summary = BatchSummary {
            total_recipients: validation.len(),
            valid_emails,
            invalid_emails: validation.len() - valid_emails,
            emails_sent,
            emails_failed: sending.len() - emails_sent,
        };

        Self {
            validation,
            sending,
            summary,
            aborted,
        }
    }

    /// 形式が不正だった宛先（入力順）
    pub fn invalid_emails(&self) -> Vec<&str> {
        self.validation
            .iter()
            .filter(|v| !v.is_valid)
            .map(|v| v.address.as_str())
            .collect()
    }

    /// 検証を通過した宛先（入力順）
    pub fn valid_emails(&self) -> Vec<&str> {
        self.validation
            .iter()
            .filter(|v| v.is_valid)
            .map(|v| v.address.as_str())
            .collect()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

/// SMTP セッションの状態
///
/// ```text
/// Unsent → Connecting → Securing → Authenticating → Sending → Closed
///              └────────────┴──────────────┴────────────┴──→ Failed(kind)
/// ```
///
/// 終端状態は `Closed` と `Failed`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    Unsent,
    Connecting,
    Securing,
    Authenticating,
    Sending,
    Closed,
    Failed(FailureKind),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Failed(_))
    }
}
