/// 수수료 계산 및 결제 정산
// region:    --- Imports
use crate::auction::model::{ensure_transition, Item, ItemStatus};
use crate::database::DatabaseManager;
use crate::errors::EngineError;
use crate::notification::{self, NotificationKind};
use crate::settings;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Fee Calculator

/// 설정 키가 없거나 값이 깨졌을 때의 기본 수수료율
pub const DEFAULT_REGULAR_FEE: f64 = 1.0;
pub const DEFAULT_AUTHENTICATED_FEE: f64 = 5.0;

/// 수수료 견적
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub percentage: f64,
    pub amount: i64,
}

/// 수수료율 결정 (설정값 파싱, 실패 시 기본값)
pub fn fee_percentage(is_authenticated: bool, configured: Option<&str>) -> f64 {
    let default = if is_authenticated {
        DEFAULT_AUTHENTICATED_FEE
    } else {
        DEFAULT_REGULAR_FEE
    };
    configured
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

/// 수수료 금액 계산 (최소 화폐 단위, 반올림)
pub fn fee_amount(amount: i64, percentage: f64) -> i64 {
    (amount as f64 * percentage / 100.0).round() as i64
}

/// 상품의 수수료 견적 계산
/// 감정 승인 상품은 authenticated_fee_percentage, 그 외에는 regular_fee_percentage를 읽는다
pub async fn compute_fee(db: &DatabaseManager, item: &Item) -> Result<FeeQuote, EngineError> {
    let key = if item.is_authenticated {
        settings::AUTHENTICATED_FEE_PERCENTAGE
    } else {
        settings::REGULAR_FEE_PERCENTAGE
    };
    let configured = settings::get(db, key).await?;
    let percentage = fee_percentage(item.is_authenticated, configured.as_deref());
    Ok(FeeQuote {
        percentage,
        amount: fee_amount(item.current_price, percentage),
    })
}

// endregion: --- Fee Calculator

// region:    --- Payment Settlement

/// 결제 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub item_id: i64,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub amount: i64,
    pub fee_percentage: f64,
    pub fee_amount: i64,
    pub status: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// 결제 정산
/// 기록된 낙찰자만 결제할 수 있고(NotWinner), SOLD 상품의 재정산은 거절된다(AlreadySettled)
/// 결제 생성, PAYING -> SOLD 전이, 구매자/판매자 알림이 한 트랜잭션으로 커밋된다
pub async fn settle(
    db: &DatabaseManager,
    item_id: i64,
    payer_id: i64,
) -> Result<Payment, EngineError> {
    info!(
        "{:<12} --> 결제 정산 요청 item: {} payer: {}",
        "Payment", item_id, payer_id
    );

    db.transaction(|tx| {
        Box::pin(async move {
            let item = sqlx::query_as::<_, Item>("SELECT * FROM items WHERE id = $1 FOR UPDATE")
                .bind(item_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(EngineError::NotFound)?;

            let status = item.status()?;
            match status {
                ItemStatus::Sold => return Err(EngineError::AlreadySettled),
                ItemStatus::Paying => {}
                _ => return Err(EngineError::InvalidState),
            }

            let winner_id = item.winner_id.ok_or(EngineError::InvalidState)?;
            if payer_id != winner_id {
                return Err(EngineError::NotWinner);
            }

            let key = if item.is_authenticated {
                settings::AUTHENTICATED_FEE_PERCENTAGE
            } else {
                settings::REGULAR_FEE_PERCENTAGE
            };
            let configured: Option<String> =
                sqlx::query_scalar("SELECT value FROM settings WHERE name = $1")
                    .bind(key)
                    .fetch_optional(&mut **tx)
                    .await?;
            let percentage = fee_percentage(item.is_authenticated, configured.as_deref());
            let fee = fee_amount(item.current_price, percentage);
            let now = Utc::now();

            let payment = sqlx::query_as::<_, Payment>(
                "INSERT INTO payments (item_id, buyer_id, seller_id, amount,
                                       fee_percentage, fee_amount, status, completed_at)
                 VALUES ($1, $2, $3, $4, $5, $6, 'completed', $7)
                 RETURNING *",
            )
            .bind(item_id)
            .bind(payer_id)
            .bind(item.seller_id)
            .bind(item.current_price)
            .bind(percentage)
            .bind(fee)
            .bind(now)
            .fetch_one(&mut **tx)
            .await?;

            ensure_transition(status, ItemStatus::Sold)?;
            sqlx::query("UPDATE items SET status = $1 WHERE id = $2")
                .bind(ItemStatus::Sold.to_string())
                .bind(item_id)
                .execute(&mut **tx)
                .await?;

            let buyer_message = format!(
                "Payment of {} for '{}' completed (fee {}).",
                item.current_price, item.name, fee
            );
            notification::notify(
                tx,
                payer_id,
                Some(item_id),
                NotificationKind::Payment,
                &buyer_message,
            )
            .await?;

            let seller_message = format!(
                "'{}' was sold for {}. Marketplace fee: {}.",
                item.name, item.current_price, fee
            );
            notification::notify(
                tx,
                item.seller_id,
                Some(item_id),
                NotificationKind::Payment,
                &seller_message,
            )
            .await?;

            Ok(payment)
        })
    })
    .await
}

// endregion: --- Payment Settlement

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_falls_back_to_defaults() {
        assert_eq!(fee_percentage(false, None), 1.0);
        assert_eq!(fee_percentage(true, None), 5.0);
        assert_eq!(fee_percentage(false, Some("not-a-number")), 1.0);
        assert_eq!(fee_percentage(true, Some("")), 5.0);
    }

    #[test]
    fn fee_uses_configured_percentage() {
        assert_eq!(fee_percentage(false, Some("2.5")), 2.5);
        assert_eq!(fee_percentage(true, Some("7")), 7.0);
        assert_eq!(fee_percentage(true, Some(" 10 ")), 10.0);
    }

    #[test]
    fn fee_amount_rounds_minor_units() {
        assert_eq!(fee_amount(10000, 1.0), 100);
        assert_eq!(fee_amount(10000, 5.0), 500);
        assert_eq!(fee_amount(999, 1.0), 10);
        assert_eq!(fee_amount(150, 2.5), 4);
        assert_eq!(fee_amount(0, 5.0), 0);
    }
}
// endregion: --- Tests
