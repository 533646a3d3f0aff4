// region:    --- Imports
use crate::errors::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// endregion: --- Imports

// region:    --- Request Status

/// 감정 요청 상태
/// PENDING -> {APPROVED, REJECTED, SECOND_OPINION}
/// SECOND_OPINION은 전문가 재배정을 거쳐 PENDING으로 돌아온다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    SecondOpinion,
    Approved,
    Rejected,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let out = match *self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::SecondOpinion => "SECOND_OPINION",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", out)
    }
}

impl FromStr for RequestStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "SECOND_OPINION" => Ok(RequestStatus::SecondOpinion),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            _ => Err(EngineError::InvalidState),
        }
    }
}

/// 감정 결정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Approved,
    Rejected,
    SecondOpinion,
}

// endregion: --- Request Status

// region:    --- Models

/// 감정 요청 모델 (상품과 1:1)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthenticationRequest {
    pub id: i64,
    pub item_id: i64,
    pub requester_id: i64,
    pub expert_id: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthenticationRequest {
    pub fn status(&self) -> Result<RequestStatus, EngineError> {
        self.status.parse()
    }
}

/// 감정 요청에 달리는 대화 메시지
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthenticationMessage {
    pub id: i64,
    pub request_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

// endregion: --- Models

// region:    --- Pure Decision Logic

/// 전문가 자격 검사: 선언된 전문 분야가 상품 카테고리 이름과
/// 대소문자 구분 없이 일치해야 한다
pub fn expert_matches_category(expertise: Option<&str>, category_name: &str) -> bool {
    match expertise {
        Some(expertise) => expertise.eq_ignore_ascii_case(category_name),
        None => false,
    }
}

// endregion: --- Pure Decision Logic

// endregion: --- Tests
