//! # メール配信ハンドラ
//!
//! ダッシュボードから呼ばれるメール配信の内部 API を提供する。
//!
//! ## エンドポイント
//!
//! - `GET /internal/mail/connection` - SMTP 接続と認証の確認
//! - `POST /internal/mail/validate` - 宛先アドレスの構文検証
//! - `POST /internal/mail/send` - 投稿を 1 通送信
//! - `POST /internal/mail/send-multiple` - 同じ投稿を複数の宛先へ送信
//! - `POST /internal/mail/send-posts` - 複数の投稿を個別または 1 通にまとめて送信
//! - `POST /internal/mail/send-with-attachment` - 添付ファイル付きで送信
//! - `POST /internal/mail/send-batch` - 宛先を検証してから一括送信
//!
//! 宛先ごとの送信失敗は 200 のレスポンス本文（送信結果）で返す。
//! エラーレスポンスになるのはリクエスト自体が不正な場合と、接続確認の失敗のみ。

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{Json, extract::State};
use postmailer_domain::{
    email_address::{self, AddressVerdict},
    notification::{BatchResult, MultiPostMode, MultiPostReport, RecipientResult, SendResult},
    post::Post,
};
use postmailer_shared::ApiResponse;
use serde::{Deserialize, Serialize};

use crate::{error::MailServiceError, usecase::MailDispatchService};

/// メール配信 API の共有状態
pub struct MailState {
    pub service: MailDispatchService,
}

// --- リクエスト/レスポンス型 ---

/// 接続確認レスポンス
#[derive(Debug, Serialize)]
pub struct ConnectionStatusDto {
    pub status: String,
}

/// 宛先検証リクエスト
#[derive(Debug, Deserialize)]
pub struct ValidateRecipientsRequest {
    pub recipients: Vec<String>,
}

/// 宛先検証レスポンス
#[derive(Debug, Serialize)]
pub struct ValidateRecipientsDto {
    pub results:        Vec<AddressVerdict>,
    pub invalid_emails: Vec<String>,
}

/// 単発送信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendPostRequest {
    pub post:           Post,
    #[serde(default)]
    pub recipient:      Option<String>,
    #[serde(default)]
    pub subject_prefix: Option<String>,
}

/// 複数宛先送信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendMultipleRequest {
    pub post:                  Post,
    pub recipients:            Vec<String>,
    #[serde(default)]
    pub subject_prefix:        Option<String>,
    #[serde(default)]
    pub personalized_subjects: Option<HashMap<String, String>>,
}

/// 複数投稿送信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendPostsRequest {
    pub posts:     Vec<Post>,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub mode:      MultiPostMode,
}

/// 添付付き送信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendWithAttachmentRequest {
    pub post:            Post,
    pub attachment_path: PathBuf,
    #[serde(default)]
    pub recipient:       Option<String>,
}

/// 検証付き一括送信リクエスト
#[derive(Debug, Deserialize)]
pub struct SendBatchRequest {
    pub post:           Post,
    pub recipients:     Vec<String>,
    #[serde(default)]
    pub subject_prefix: Option<String>,
    /// 省略時は不正な宛先をスキップして残りに送る
    #[serde(default = "default_skip_invalid")]
    pub skip_invalid:   bool,
}

fn default_skip_invalid() -> bool {
    true
}

// --- ハンドラ ---

/// GET /internal/mail/connection
///
/// メールを送らずに SMTP サーバーへの接続と認証を確認する。
pub async fn check_connection(
    State(state): State<Arc<MailState>>,
) -> Result<Json<ApiResponse<ConnectionStatusDto>>, MailServiceError> {
    state.service.check_connection().await?;

    Ok(Json(ApiResponse::new(ConnectionStatusDto {
        status: "ok".to_string(),
    })))
}

/// POST /internal/mail/validate
pub async fn validate_recipients(
    Json(req): Json<ValidateRecipientsRequest>,
) -> Json<ApiResponse<ValidateRecipientsDto>> {
    let results = email_address::validate_recipients(&req.recipients);
    let invalid_emails = email_address::invalid_emails(&req.recipients);

    Json(ApiResponse::new(ValidateRecipientsDto {
        results,
        invalid_emails,
    }))
}

/// POST /internal/mail/send
pub async fn send_post(
    State(state): State<Arc<MailState>>,
    Json(req): Json<SendPostRequest>,
) -> Json<ApiResponse<SendResult>> {
    let result = state
        .service
        .send_post(
            &req.post,
            req.recipient.as_deref(),
            req.subject_prefix.as_deref(),
        )
        .await;

    Json(ApiResponse::new(result))
}

/// POST /internal/mail/send-multiple
pub async fn send_multiple(
    State(state): State<Arc<MailState>>,
    Json(req): Json<SendMultipleRequest>,
) -> Result<Json<ApiResponse<Vec<RecipientResult>>>, MailServiceError> {
    if req.recipients.is_empty() {
        return Err(MailServiceError::BadRequest(
            "宛先を 1 件以上指定してください".to_string(),
        ));
    }

    let results = state
        .service
        .send_to_multiple_recipients(
            &req.post,
            &req.recipients,
            req.subject_prefix.as_deref(),
            req.personalized_subjects.as_ref(),
        )
        .await;

    Ok(Json(ApiResponse::new(results)))
}

/// POST /internal/mail/send-posts
pub async fn send_posts(
    State(state): State<Arc<MailState>>,
    Json(req): Json<SendPostsRequest>,
) -> Result<Json<ApiResponse<MultiPostReport>>, MailServiceError> {
    if req.posts.is_empty() {
        return Err(MailServiceError::BadRequest(
            "投稿を 1 件以上指定してください".to_string(),
        ));
    }

    let report = state
        .service
        .send_multiple_posts(&req.posts, req.recipient.as_deref(), req.mode)
        .await;

    Ok(Json(ApiResponse::new(report)))
}

/// POST /internal/mail/send-with-attachment
pub async fn send_with_attachment(
    State(state): State<Arc<MailState>>,
    Json(req): Json<SendWithAttachmentRequest>,
) -> Json<ApiResponse<SendResult>> {
    let result = state
        .service
        .send_with_attachment(&req.post, &req.attachment_path, req.recipient.as_deref())
        .await;

    Json(ApiResponse::new(result))
}

/// POST /internal/mail/send-batch
pub async fn send_batch(
    State(state): State<Arc<MailState>>,
    Json(req): Json<SendBatchRequest>,
) -> Result<Json<ApiResponse<BatchResult>>, MailServiceError> {
    if req.recipients.is_empty() {
        return Err(MailServiceError::Validation(
            "宛先を 1 件以上指定してください".to_string(),
        ));
    }

    let result = state
        .service
        .send_batch_with_validation(
            &req.post,
            &req.recipients,
            req.subject_prefix.as_deref(),
            req.skip_invalid,
        )
        .await;

    Ok(Json(ApiResponse::new(result)))
}
