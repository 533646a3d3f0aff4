/// 경매 수명 주기 커맨드 처리
/// 1. 상품 등록
/// 2. 입찰
/// 3. 만료 경매 마감
// region:    --- Imports
use crate::auction::model::{
    close_outcome, ensure_transition, validate_bid, Bid, CloseOutcome, Item, ItemStatus,
};
use crate::database::DatabaseManager;
use crate::email::{self, EmailSender};
use crate::errors::EngineError;
use crate::notification::{self, NotificationKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Commands

/// 상품 등록 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListItemCommand {
    pub seller_id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub minimum_price: i64,
    pub end_time: DateTime<Utc>,
    pub requires_authentication: bool,
}

/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub item_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
}

// endregion: --- Commands

// region:    --- List Item

/// 상품 등록
/// 감정 요청이 있으면 PENDING으로 생성하고 감정 요청 레코드를 함께 만든다
/// 없으면 즉시 ACTIVE로 시장에 올라간다
pub async fn list_item(db: &DatabaseManager, cmd: ListItemCommand) -> Result<Item, EngineError> {
    info!("{:<12} --> 상품 등록 요청 처리 시작: {:?}", "Command", cmd);

    let now = Utc::now();
    if cmd.end_time <= now {
        return Err(EngineError::InvalidState);
    }

    let ListItemCommand {
        seller_id,
        name,
        description,
        category_id,
        minimum_price,
        end_time,
        requires_authentication,
    } = cmd;

    let status = if requires_authentication {
        ItemStatus::Pending
    } else {
        ItemStatus::Active
    };

    db.transaction(|tx| {
        Box::pin(async move {
            let item = sqlx::query_as::<_, Item>(
                "INSERT INTO items (name, description, category_id, minimum_price, current_price,
                                    seller_id, status, start_time, end_time)
                 VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8)
                 RETURNING *",
            )
            .bind(&name)
            .bind(&description)
            .bind(category_id)
            .bind(minimum_price)
            .bind(seller_id)
            .bind(status.to_string())
            .bind(now)
            .bind(end_time)
            .fetch_one(&mut **tx)
            .await?;

            if requires_authentication {
                sqlx::query(
                    "INSERT INTO authentication_requests (item_id, requester_id, status)
                     VALUES ($1, $2, 'PENDING')",
                )
                .bind(item.id)
                .bind(seller_id)
                .execute(&mut **tx)
                .await?;
            }

            Ok(item)
        })
    })
    .await
}

/// 상품 삭제
/// 판매 전(PAYING/SOLD 이전)이라면 소유자가 상품을 내릴 수 있고 입찰은 함께 삭제된다
pub async fn remove_item(
    db: &DatabaseManager,
    item_id: i64,
    requester_id: i64,
) -> Result<(), EngineError> {
    info!(
        "{:<12} --> 상품 삭제 요청 id: {} by: {}",
        "Command", item_id, requester_id
    );
    db.transaction(|tx| {
        Box::pin(async move {
            let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(EngineError::NotFound)?;

            if item.seller_id != requester_id {
                return Err(EngineError::AccessDenied);
            }
            match item.status()? {
                ItemStatus::Paying | ItemStatus::Sold => Err(EngineError::InvalidState),
                _ => {
                    sqlx::query("DELETE FROM items WHERE id = $1")
                        .bind(item_id)
                        .execute(&mut **tx)
                        .await?;
                    Ok(())
                }
            }
        })
    })
    .await
}

// endregion: --- List Item

// region:    --- Place Bid

/// 입찰
/// 상품 행 잠금(FOR UPDATE) 아래에서 검증하므로 동시 입찰은 상품 단위로 직렬화된다
/// 입찰 기록 적재, 현재가 갱신, 이전 최고 입찰자 알림이 한 트랜잭션으로 커밋된다
pub async fn place_bid(db: &DatabaseManager, cmd: PlaceBidCommand) -> Result<Bid, EngineError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let PlaceBidCommand {
        item_id,
        bidder_id,
        amount,
    } = cmd;

    db.transaction(|tx| {
        Box::pin(async move {
            let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(EngineError::NotFound)?;

            validate_bid(&item, bidder_id, amount)?;

            let previous = sqlx::query_as::<_, Bid>(
                "SELECT * FROM bids WHERE item_id = $1
                 ORDER BY amount DESC, created_at ASC LIMIT 1",
            )
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await?;

            let bid = sqlx::query_as::<_, Bid>(
                "INSERT INTO bids (item_id, bidder_id, amount) VALUES ($1, $2, $3) RETURNING *",
            )
            .bind(item_id)
            .bind(bidder_id)
            .bind(amount)
            .fetch_one(&mut **tx)
            .await?;

            sqlx::query("UPDATE items SET current_price = $1 WHERE id = $2")
                .bind(amount)
                .bind(item_id)
                .execute(&mut **tx)
                .await?;

            // 이전 최고 입찰자에게만 알림 (본인이 연속 입찰한 경우는 생략)
            if let Some(previous) = previous {
                if previous.bidder_id != bidder_id {
                    let message = format!(
                        "You have been outbid on '{}'. The price is now {}.",
                        item.name, amount
                    );
                    notification::notify(
                        tx,
                        previous.bidder_id,
                        Some(item_id),
                        NotificationKind::Outbid,
                        &message,
                    )
                    .await?;
                }
            }

            Ok(bid)
        })
    })
    .await
}

// endregion: --- Place Bid

// region:    --- Closing Sweep

/// 한 상품의 마감 결과
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedAuction {
    pub item_id: i64,
    pub outcome: CloseOutcome,
}

/// 마감 배치 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClosedBatch {
    pub closed: Vec<ClosedAuction>,
    pub failed: usize,
}

/// 커밋 이후 전송할 메일 작업
struct MailJob {
    recipient: String,
    subject: String,
    body: String,
}

/// 만료 경매 마감
/// end_time이 지난 {ACTIVE, PENDING} 상품을 모두 찾아 개별 트랜잭션으로 마감한다
/// (감정 결정이 마감 전에 내려지지 않을 수 있으므로 PENDING도 포함한다)
/// 한 상품의 실패는 로그만 남기고 배치의 나머지 처리를 막지 않는다
pub async fn close_expired_auctions(
    db: &DatabaseManager,
    mailer: &Arc<dyn EmailSender>,
    now: DateTime<Utc>,
) -> Result<ClosedBatch, EngineError> {
    let expired_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT id FROM items
         WHERE status IN ('ACTIVE', 'PENDING') AND end_time <= $1
         ORDER BY id",
    )
    .bind(now)
    .fetch_all(db.pool())
    .await?;

    if !expired_ids.is_empty() {
        info!(
            "{:<12} --> 마감 대상 경매 {}건 발견",
            "Sweep",
            expired_ids.len()
        );
    }

    let mut batch = ClosedBatch::default();
    for item_id in expired_ids {
        match close_one(db, item_id, now).await {
            Ok(Some((outcome, mail))) => {
                if let Some(job) = mail {
                    email::send_detached(Arc::clone(mailer), job.recipient, job.subject, job.body);
                }
                batch.closed.push(ClosedAuction { item_id, outcome });
            }
            // 잠금 획득 후 재검증에서 빠진 경우 (이미 마감되었거나 입찰로 상태가 바뀜)
            Ok(None) => {}
            Err(e) => {
                error!(
                    "{:<12} --> 경매 마감 실패 id: {} err: {:?}",
                    "Sweep", item_id, e
                );
                batch.failed += 1;
            }
        }
    }

    Ok(batch)
}

/// 한 상품의 마감 처리 (행 잠금 아래 재검증 후 전이)
/// 마감과 그 알림은 하나의 트랜잭션으로 커밋되고, 메일은 커밋 이후 best-effort로 보낸다
async fn close_one(
    db: &DatabaseManager,
    item_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<(CloseOutcome, Option<MailJob>)>, EngineError> {
    db.transaction(|tx| {
        Box::pin(async move {
            let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut **tx)
                .await?;

            let item = match item {
                Some(item) => item,
                None => return Ok(None),
            };

            // 잠금을 기다리는 동안 다른 스윕이 먼저 마감했을 수 있다
            let status = item.status()?;
            if !matches!(status, ItemStatus::Active | ItemStatus::Pending) {
                return Ok(None);
            }
            if item.end_time.map_or(true, |end| end > now) {
                return Ok(None);
            }

            let highest = sqlx::query_as::<_, Bid>(
                "SELECT * FROM bids WHERE item_id = $1
                 ORDER BY amount DESC, created_at ASC LIMIT 1",
            )
            .bind(item_id)
            .fetch_optional(&mut **tx)
            .await?;

            let outcome = close_outcome(highest.as_ref());
            let mail = match &outcome {
                CloseOutcome::Paying { winner_id, amount } => {
                    ensure_transition(status, ItemStatus::Paying)?;
                    sqlx::query("UPDATE items SET status = $1, winner_id = $2 WHERE id = $3")
                        .bind(ItemStatus::Paying.to_string())
                        .bind(winner_id)
                        .bind(item_id)
                        .execute(&mut **tx)
                        .await?;

                    let message = format!(
                        "You won the auction for '{}' at {}. Please complete the payment.",
                        item.name, amount
                    );
                    notification::notify(
                        tx,
                        *winner_id,
                        Some(item_id),
                        NotificationKind::Won,
                        &message,
                    )
                    .await?;

                    let recipient: String =
                        sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
                            .bind(winner_id)
                            .fetch_one(&mut **tx)
                            .await?;
                    Some(MailJob {
                        recipient,
                        subject: format!("You won the auction for '{}'", item.name),
                        body: message,
                    })
                }
                CloseOutcome::Expired => {
                    ensure_transition(status, ItemStatus::Expired)?;
                    sqlx::query("UPDATE items SET status = $1 WHERE id = $2")
                        .bind(ItemStatus::Expired.to_string())
                        .bind(item_id)
                        .execute(&mut **tx)
                        .await?;

                    let message =
                        format!("Your auction for '{}' has ended without bids.", item.name);
                    notification::notify(
                        tx,
                        item.seller_id,
                        Some(item_id),
                        NotificationKind::Ended,
                        &message,
                    )
                    .await?;
                    None
                }
            };

            Ok(Some((outcome, mail)))
        })
    })
    .await
}

// endregion: --- Closing Sweep
