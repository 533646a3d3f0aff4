// region:    --- Imports
use crate::errors::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// endregion: --- Imports

// region:    --- Item Status

/// 경매 상품 상태
/// PENDING -> ACTIVE -> PAYING -> SOLD, 입찰이 없으면 {PENDING, ACTIVE} -> EXPIRED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    Pending,
    Active,
    Paying,
    Sold,
    Expired,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Active => "ACTIVE",
            ItemStatus::Paying => "PAYING",
            ItemStatus::Sold => "SOLD",
            ItemStatus::Expired => "EXPIRED",
        };
        write!(f, "{}", out)
    }
}

impl FromStr for ItemStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ItemStatus::Pending),
            "ACTIVE" => Ok(ItemStatus::Active),
            "PAYING" => Ok(ItemStatus::Paying),
            "SOLD" => Ok(ItemStatus::Sold),
            "EXPIRED" => Ok(ItemStatus::Expired),
            _ => Err(EngineError::InvalidState),
        }
    }
}

impl ItemStatus {
    /// 허용된 상태 전이인지 검사
    /// SOLD, EXPIRED는 종결 상태이며 역방향 전이는 없다
    pub fn may_transition_to(self, to: ItemStatus) -> bool {
        matches!(
            (self, to),
            (ItemStatus::Pending, ItemStatus::Active)
                | (ItemStatus::Pending, ItemStatus::Expired)
                | (ItemStatus::Active, ItemStatus::Paying)
                | (ItemStatus::Active, ItemStatus::Expired)
                | (ItemStatus::Paying, ItemStatus::Sold)
        )
    }
}

// endregion: --- Item Status

// region:    --- Models

/// 경매 상품 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category_id: i64,
    pub minimum_price: i64,
    pub current_price: i64,
    pub seller_id: i64,
    pub winner_id: Option<i64>,
    pub status: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_authenticated: bool,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// 문자열 컬럼을 상태 enum으로 변환
    pub fn status(&self) -> Result<ItemStatus, EngineError> {
        self.status.parse()
    }
}

/// 상품 카테고리 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// 입찰 모델 (append-only, 커밋 이후 불변)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bid {
    pub id: i64,
    pub item_id: i64,
    pub bidder_id: i64,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Models

// region:    --- Pure Decision Logic

/// 입찰 검증
/// ACTIVE가 아니면 NotActive, 판매자 본인이면 SelfBid,
/// 현재가 이하이면 BidTooLow (동일 금액도 거절 - 엄격한 증가만 허용)
pub fn validate_bid(item: &Item, bidder_id: i64, amount: i64) -> Result<(), EngineError> {
    if item.status()? != ItemStatus::Active {
        return Err(EngineError::NotActive);
    }
    if bidder_id == item.seller_id {
        return Err(EngineError::SelfBid);
    }
    if amount <= item.current_price {
        return Err(EngineError::BidTooLow {
            current: item.current_price,
        });
    }
    Ok(())
}

/// 상태 전이 가드
pub fn ensure_transition(from: ItemStatus, to: ItemStatus) -> Result<(), EngineError> {
    if from.may_transition_to(to) {
        Ok(())
    } else {
        Err(EngineError::InvalidState)
    }
}

/// 마감 처리 결과
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CloseOutcome {
    /// 최고 입찰자가 낙찰자가 되고 결제를 대기한다
    Paying { winner_id: i64, amount: i64 },
    /// 입찰이 없어 유찰 처리된다
    Expired,
}

/// 마감 시점의 최고 입찰로부터 전이 결과 결정
pub fn close_outcome(highest: Option<&Bid>) -> CloseOutcome {
    match highest {
        Some(bid) => CloseOutcome::Paying {
            winner_id: bid.bidder_id,
            amount: bid.amount,
        },
        None => CloseOutcome::Expired,
    }
}

// endregion: --- Pure Decision Logic

// endregion: --- Tests
