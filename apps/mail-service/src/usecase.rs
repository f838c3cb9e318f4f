//! # ユースケース層
//!
//! メール配信のビジネスロジックを実装する。
//!
//! ## モジュール構成
//!
//! - [`notification`] - 投稿メールの生成と配信

pub mod notification;

pub use notification::{DispatchSettings, MailDispatchService, TemplateRenderer};
