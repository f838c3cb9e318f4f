//! # 通知ユースケース
//!
//! 投稿メールの生成・送信・結果記録を統合する。
//!
//! ## モジュール構成
//!
//! - [`template_renderer`] - tera テンプレートエンジンによるメール本文と件名の生成
//! - [`service`] - 5 種類の送信方法と接続確認を提供する配信サービス

pub mod service;
pub mod template_renderer;

pub use service::{DispatchSettings, MailDispatchService};
pub use template_renderer::TemplateRenderer;
