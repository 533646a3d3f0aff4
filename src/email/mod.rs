// region:    --- Imports
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Email Sender Trait

/// 발신 이메일 트레이트
/// 전송 실패는 호출자에게 전파되지 않고 로그로만 남긴다 (best-effort)
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// MailerSend 계열 HTTP API로 메일을 전송하는 구현체
pub struct HttpEmailSender {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    sender: String,
}

impl HttpEmailSender {
    pub fn new(api_url: String, api_token: String, sender: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_token,
            sender,
        }
    }

    /// 환경 변수로부터 메일 전송기 구성
    /// MAIL_API_URL / MAIL_API_TOKEN이 없으면 로그 전용 전송기로 대체
    pub fn from_env() -> Arc<dyn EmailSender> {
        match (
            std::env::var("MAIL_API_URL"),
            std::env::var("MAIL_API_TOKEN"),
        ) {
            (Ok(url), Ok(token)) => {
                let sender = std::env::var("MAIL_SENDER")
                    .unwrap_or_else(|_| "noreply@auction-marketplace.local".to_string());
                Arc::new(HttpEmailSender::new(url, token, sender))
            }
            _ => {
                info!(
                    "{:<12} --> 메일 API 설정이 없어 로그 전용 전송기를 사용합니다",
                    "Email"
                );
                Arc::new(LogEmailSender)
            }
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), String> {
        let payload = serde_json::json!({
            "from": { "email": self.sender },
            "to": [{ "email": recipient }],
            "subject": subject,
            "text": body,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("mail API responded with {}", response.status()));
        }
        Ok(())
    }
}

/// 로그 전용 전송기 (개발 및 테스트 환경)
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<(), String> {
        info!(
            "{:<12} --> 메일 전송 (로그 전용) to: {} subject: {}",
            "Email", recipient, subject
        );
        Ok(())
    }
}

// endregion: --- Email Sender Trait

// region:    --- Fire-and-Forget

/// 커밋 이후 비동기로 메일 전송, 실패는 로그만 남긴다
pub fn send_detached(
    mailer: Arc<dyn EmailSender>,
    recipient: String,
    subject: String,
    body: String,
) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&recipient, &subject, &body).await {
            warn!(
                "{:<12} --> 메일 전송 실패 to: {} err: {}",
                "Email", recipient, e
            );
        }
    });
}

// endregion: --- Fire-and-Forget
