//! # 添付ファイル読み込み
//!
//! ローカルファイルを読み込み、[`EmailAttachment`] に変換する。
//! ファイル全体をメモリに載せるため、大きなファイルの扱いは呼び出し側の責任とする。

use std::path::Path;

use postmailer_domain::notification::EmailAttachment;

use crate::error::InfraError;

/// 添付ファイルを読み込む
///
/// ファイルが存在しない場合は `Ok(None)` を返す（添付なしで送信を続けるため）。
/// 存在するが読み込めない場合は `InfraError` を返す。
pub async fn load_attachment(path: &Path) -> Result<Option<EmailAttachment>, InfraError> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(None);
    }

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            InfraError::unexpected(format!("ファイル名を取得できません: {}", path.display()))
        })?;
    let content = tokio::fs::read(path).await?;

    tracing::debug!(
        filename = %filename,
        size = content.len(),
        "添付ファイルを読み込みました"
    );

    Ok(Some(EmailAttachment { filename, content }))
}
