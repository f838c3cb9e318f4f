//! # ヘルスチェック共通型

use serde::Serialize;

/// ヘルスチェックレスポンス
///
/// `notification_backend` が `noop` の場合、メールは実際には送信されない。
/// 稼働中のサービスがどちらで動いているかを外から確認するために含める。
///
/// ## 使用例
///
/// ```
/// use postmailer_shared::HealthResponse;
///
/// let response = HealthResponse::healthy("0.1.0", "smtp");
/// assert_eq!(response.status, "healthy");
/// ```
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// 稼働状態（`"healthy"` または `"unhealthy"`）
    pub status:               String,
    /// アプリケーションバージョン（Cargo.toml から取得）
    pub version:              String,
    /// 送信バックエンド（`smtp` / `noop`）
    pub notification_backend: String,
}

impl HealthResponse {
    /// 稼働中を表すレスポンスを作成する
    pub fn healthy(version: impl Into<String>, notification_backend: impl Into<String>) -> Self {
        Self {
            status:               "healthy".to_string(),
            version:              version.into(),
            notification_backend: notification_backend.into(),
        }
    }
}
