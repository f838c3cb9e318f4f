//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンで投稿メールの本文を plaintext/HTML 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **HTML は自動エスケープ**: `.html` テンプレートのみ tera の autoescape が効く
//! - **任意セクション**: ハッシュタグ・行動喚起文は値がある場合のみ出力する
//! - **生成日時のデフォルト**: 投稿に無ければ [`Clock`] の現在時刻を使う
//!
//! ## 件名パターン
//!
//! | 送信種別 | 件名 |
//! |---------|------|
//! | 単発 | `{prefix}: {title}`（既定 prefix は `Generated Post`） |
//! | 複数投稿（個別） | `Post {i+1}: {title}` |
//! | 添付付き | `Post (with attachment): {title}` |
//! | ダイジェスト | `Multiple Posts - {n} Posts Generated` |

use std::sync::Arc;

use postmailer_domain::{clock::Clock, notification::NotificationError, post::Post};
use tera::{Context, Tera};

/// 単発送信の既定の件名プレフィックス
pub const DEFAULT_SUBJECT_PREFIX: &str = "Generated Post";

/// ダイジェストの区切り線の幅
const DIGEST_RULE_WIDTH: usize = 50;

/// 単発送信の件名
pub fn post_subject(prefix: &str, post: &Post) -> String {
    format!("{prefix}: {}", post.title())
}

/// 複数投稿を個別送信する際の件名プレフィックス（`index` は 0 始まり）
pub fn numbered_prefix(index: usize) -> String {
    format!("Post {}", index + 1)
}

/// 添付付き送信の件名
pub fn attachment_subject(post: &Post) -> String {
    format!("Post (with attachment): {}", post.title())
}

/// ダイジェストの件名
pub fn digest_subject(count: usize) -> String {
    format!("Multiple Posts - {count} Posts Generated")
}

/// 投稿 1 件分の本文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostBodies {
    pub text_body: String,
    pub html_body: String,
}

/// テンプレートレンダラー
///
/// tera テンプレートエンジンをラップし、[`Post`] からメール本文を生成する。
pub struct TemplateRenderer {
    engine: Tera,
    clock:  Arc<dyn Clock>,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    ///
    /// `include_str!` で埋め込んだテンプレートを tera に登録する。
    pub fn new(clock: Arc<dyn Clock>) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    "post.txt",
                    include_str!("../../../templates/mail/post.txt"),
                ),
                (
                    "post.html",
                    include_str!("../../../templates/mail/post.html"),
                ),
                (
                    "digest.txt",
                    include_str!("../../../templates/mail/digest.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self { engine, clock })
    }

    /// 投稿からプレーンテキストと HTML の本文を生成する
    pub fn render_post(&self, post: &Post) -> Result<PostBodies, NotificationError> {
        let context = self.post_context(post);

        Ok(PostBodies {
            text_body: self.render("post.txt", &context)?,
            html_body: self.render("post.html", &context)?,
        })
    }

    /// 投稿からプレーンテキストの本文のみを生成する
    pub fn render_text(&self, post: &Post) -> Result<String, NotificationError> {
        self.render("post.txt", &self.post_context(post))
    }

    /// 複数投稿を 1 通にまとめたダイジェスト本文（プレーンテキスト）を生成する
    pub fn render_digest(&self, posts: &[Post]) -> Result<String, NotificationError> {
        let bodies = posts
            .iter()
            .map(|post| self.render_text(post))
            .collect::<Result<Vec<_>, _>>()?;

        let mut context = Context::new();
        context.insert("count", &posts.len());
        context.insert("bodies", &bodies);
        context.insert("rule", &"=".repeat(DIGEST_RULE_WIDTH));

        self.render("digest.txt", &context)
    }

    fn render(&self, template_name: &str, context: &Context) -> Result<String, NotificationError> {
        self.engine
            .render(template_name, context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))
    }

    fn post_context(&self, post: &Post) -> Context {
        let mut context = Context::new();
        context.insert("title", post.title());
        context.insert("content", post.content());
        context.insert("hashtags", &post.hashtags());
        context.insert("call_to_action", &post.call_to_action());
        context.insert("generated_at", &post.generated_at(self.clock.as_ref()));
        context.insert("topic", post.topic());
        context.insert("tone", post.tone());
        context
    }
}
