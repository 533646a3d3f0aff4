// region:    --- Imports
use crate::database::DatabaseManager;
use crate::errors::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, Transaction};
use std::fmt;
use tracing::info;

// endregion: --- Imports

// region:    --- Notification Model

/// 알림 종류 태그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Outbid,
    Won,
    Ended,
    Authentication,
    Payment,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            NotificationKind::Outbid => "outbid",
            NotificationKind::Won => "won",
            NotificationKind::Ended => "ended",
            NotificationKind::Authentication => "authentication",
            NotificationKind::Payment => "payment",
        };
        write!(f, "{}", out)
    }
}

/// 사용자 알림 모델 (append-only, is_read만 수신자가 변경)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub item_id: Option<i64>,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Notification Model

// region:    --- Notification Sink

/// 알림 적재
/// 호출자의 트랜잭션 안에서 실행되어 상태 전이와 함께 커밋된다
pub async fn notify(
    tx: &mut Transaction<'_, Postgres>,
    user_id: i64,
    item_id: Option<i64>,
    kind: NotificationKind,
    message: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO notifications (user_id, item_id, kind, message)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(item_id)
    .bind(kind.to_string())
    .bind(message)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// 알림 읽음 처리
/// 수신자 본인만 읽음 상태를 변경할 수 있다
pub async fn mark_read(
    db: &DatabaseManager,
    user_id: i64,
    notification_id: i64,
) -> Result<(), EngineError> {
    info!(
        "{:<12} --> 알림 읽음 처리 user: {} id: {}",
        "Notification", user_id, notification_id
    );
    db.transaction(|tx| {
        Box::pin(async move {
            let owner: Option<i64> =
                sqlx::query_scalar("SELECT user_id FROM notifications WHERE id = $1")
                    .bind(notification_id)
                    .fetch_optional(&mut **tx)
                    .await?;

            match owner {
                None => Err(EngineError::NotFound),
                Some(owner) if owner != user_id => Err(EngineError::AccessDenied),
                Some(_) => {
                    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
                        .bind(notification_id)
                        .execute(&mut **tx)
                        .await?;
                    Ok(())
                }
            }
        })
    })
    .await
}

// endregion: --- Notification Sink

// endregion: --- Tests
