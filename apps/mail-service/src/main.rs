//! # Mail Service サーバー
//!
//! ダッシュボードで生成した投稿をメールで配信する内部サービス。
//!
//! ## 役割
//!
//! - **メール生成**: 投稿からプレーンテキスト/HTML 本文を生成
//! - **配信**: SMTP（STARTTLS + 認証）で 1 通ずつ送信し、宛先ごとの結果を返す
//! - **宛先検証**: 一括送信前に宛先アドレスの構文を検証
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `MAIL_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `MAIL_PORT` | No | ポート番号（デフォルト: `3002`） |
//! | `EMAIL_SENDER` | **Yes** | 送信元アドレス（SMTP 認証のユーザー名） |
//! | `EMAIL_PASSWORD` | **Yes** | SMTP 認証のパスワード（Gmail ではアプリパスワード） |
//! | `EMAIL_RECIPIENT` | No | 宛先を省略したときの既定の宛先 |
//! | `NOTIFICATION_BACKEND` | No | `smtp` または `noop`（デフォルト: `smtp`） |
//! | `SMTP_HOST` | No | SMTP サーバー（デフォルト: `smtp.gmail.com`） |
//! | `SMTP_PORT` | No | SMTP ポート（デフォルト: `587`） |
//! | `SMTP_TIMEOUT_SECS` | No | 各段階のタイムアウト秒数（デフォルト: `10`） |
//! | `SMTP_HELO_NAME` | No | EHLO で名乗るホスト名（デフォルト: `localhost`） |
//! | `LOG_FORMAT` | No | `json` または `pretty`（デフォルト: `pretty`） |
//! | `SMTP_WIRE_LOG` | No | `true` で SMTP のやり取りを trace 出力（開発専用） |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境（送信せずログのみ）
//! NOTIFICATION_BACKEND=noop cargo run -p postmailer-mail-service
//!
//! # 本番環境
//! EMAIL_SENDER=... EMAIL_PASSWORD=... cargo run -p postmailer-mail-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use postmailer_domain::clock::SystemClock;
use postmailer_infra::notification::{
    NoopNotificationSender,
    NotificationSender,
    SmtpNotificationSender,
};
use postmailer_mail_service::{
    config::{MailServiceConfig, NotificationBackend},
    handler::MailState,
    router,
    usecase::{DispatchSettings, MailDispatchService, TemplateRenderer},
};
use postmailer_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Mail Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    // トレーシング初期化
    init_tracing(TracingConfig::from_env("mail-service"));

    // 設定読み込み
    let config = MailServiceConfig::from_env()?;

    tracing::info!(
        "Mail Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // 送信バックエンドを選択
    let notification = config.notification;
    let sender: Arc<dyn NotificationSender> = match notification.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                host = %notification.smtp.host,
                port = notification.smtp.port,
                sender = %notification.credentials.sender(),
                "SMTP でメールを送信します"
            );
            Arc::new(SmtpNotificationSender::new(
                notification.smtp,
                notification.credentials,
            ))
        }
        NotificationBackend::Noop => {
            tracing::info!("Noop 送信バックエンドを使用します（メールは送信されません）");
            Arc::new(NoopNotificationSender)
        }
    };

    // 依存コンポーネントを初期化
    let template_renderer = TemplateRenderer::new(Arc::new(SystemClock))?;
    let service = MailDispatchService::new(
        sender,
        template_renderer,
        DispatchSettings {
            default_recipient: notification.default_recipient.map(String::from),
        },
    );
    let state = Arc::new(MailState { service });

    // ルーター構築
    let app = router(state).layer(TraceLayer::new_for_http());

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Mail Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
