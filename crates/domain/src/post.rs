//! # 投稿
//!
//! ダッシュボードで生成された SNS 投稿テキストのレコード。
//! メール本文の入力として使われ、メール配信処理の中で変更されることはない。
//!
//! ## デフォルト値
//!
//! | フィールド | 未設定時 |
//! |-----------|---------|
//! | `title` | `"Untitled"` |
//! | `content` | `"No content available"` |
//! | `generated_at` | 現在時刻（[`Clock`] から取得、RFC 3339） |
//! | `topic` / `tone` | `"Unknown"` |
//!
//! `hashtags` と `call_to_action` は空文字列も「未設定」として扱う。

use serde::{Deserialize, Serialize};

use crate::clock::Clock;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_CONTENT: &str = "No content available";
pub const UNKNOWN: &str = "Unknown";

/// 投稿レコード
///
/// すべてのフィールドが省略可能で、JSON からそのままデシリアライズできる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub title:          Option<String>,
    #[serde(default)]
    pub content:        Option<String>,
    #[serde(default)]
    pub hashtags:       Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub generated_at:   Option<String>,
    #[serde(default)]
    pub topic:          Option<String>,
    #[serde(default)]
    pub tone:           Option<String>,
}

impl Post {
    /// タイトル（未設定なら `"Untitled"`）
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_TITLE)
    }

    /// 本文（未設定ならプレースホルダ）
    pub fn content(&self) -> &str {
        self.content.as_deref().unwrap_or(DEFAULT_CONTENT)
    }

    /// ハッシュタグ（空文字列は `None`）
    pub fn hashtags(&self) -> Option<&str> {
        non_empty(self.hashtags.as_deref())
    }

    /// 行動喚起文（空文字列は `None`）
    pub fn call_to_action(&self) -> Option<&str> {
        non_empty(self.call_to_action.as_deref())
    }

    /// 生成日時。未設定なら `clock` の現在時刻を RFC 3339 で返す
    pub fn generated_at(&self, clock: &dyn Clock) -> String {
        match &self.generated_at {
            Some(value) => value.clone(),
            None => clock.now().to_rfc3339(),
        }
    }

    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn tone(&self) -> &str {
        self.tone.as_deref().unwrap_or(UNKNOWN)
    }

    /// 複数投稿送信時の結果キー
    ///
    /// タイトルがあればそれを、無ければ `"Post {index+1}"` を返す。
    pub fn result_key(&self, index: usize) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("Post {}", index + 1),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
