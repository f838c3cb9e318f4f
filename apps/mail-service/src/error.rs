//! # Mail Service エラー定義
//!
//! リクエスト単位のエラーと、HTTP レスポンスへの変換を定義する。
//! 宛先ごとの送信失敗はここには含めず、レスポンス本文の送信結果として返す。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use postmailer_domain::notification::NotificationError;
use postmailer_shared::ErrorResponse;
use thiserror::Error;

/// Mail Service で発生するエラー
#[derive(Debug, Error)]
pub enum MailServiceError {
    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 入力値の検証エラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// SMTP サーバーに接続・認証できない
    #[error("SMTP サーバーを利用できません: {0}")]
    Unavailable(#[from] NotificationError),

    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl IntoResponse for MailServiceError {
    fn into_response(self) -> Response {
        let body = match &self {
            MailServiceError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            MailServiceError::Validation(msg) => ErrorResponse::validation_error(msg.clone()),
            MailServiceError::Unavailable(e) => {
                tracing::warn!(error = %e, failure_kind = %e.kind(), "SMTP サーバーを利用できません");
                ErrorResponse::service_unavailable(e.to_string())
            }
            MailServiceError::Internal(msg) => {
                tracing::error!("内部エラー: {}", msg);
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(MailServiceError::BadRequest("x".to_string()), StatusCode::BAD_REQUEST)]
    #[case(MailServiceError::Validation("x".to_string()), StatusCode::BAD_REQUEST)]
    #[case(
        MailServiceError::Unavailable(NotificationError::Timeout("x".to_string())),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(MailServiceError::Internal("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR)]
    fn エラー種別に応じたステータスコードを返す(
        #[case] error: MailServiceError,
        #[case] expected: StatusCode,
    ) {
        let response = error.into_response();
        assert_eq!(response.status(), expected);
    }
}
