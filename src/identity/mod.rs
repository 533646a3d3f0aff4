// region:    --- Imports
use crate::database::DatabaseManager;
use crate::errors::{EngineError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// endregion: --- Imports

// region:    --- Principal

/// 역할 컬럼 값 (users.role)
pub const ROLE_GENERAL: i32 = 1;
pub const ROLE_EXPERT: i32 = 2;
pub const ROLE_MANAGER: i32 = 3;

/// 인증된 주체
/// 역할 검사는 라우트가 아니라 엔진 연산 진입점에서 이 변형으로 일괄 수행한다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Principal {
    Guest,
    General(i64),
    Expert(i64),
    Manager(i64),
}

impl Principal {
    pub fn user_id(&self) -> Option<i64> {
        match *self {
            Principal::Guest => None,
            Principal::General(id) | Principal::Expert(id) | Principal::Manager(id) => Some(id),
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self, Principal::Manager(_))
    }

    pub fn is_expert(&self) -> bool {
        matches!(self, Principal::Expert(_))
    }
}

/// 사용자 조회로부터 주체 구성
/// 존재하지 않는 사용자는 Guest로 취급한다
pub async fn principal_for(db: &DatabaseManager, user_id: i64) -> Result<Principal, EngineError> {
    let role: Option<i32> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(db.pool())
        .await?;

    Ok(match role {
        None => Principal::Guest,
        Some(r) if r == ROLE_MANAGER => Principal::Manager(user_id),
        Some(r) if r == ROLE_EXPERT => Principal::Expert(user_id),
        Some(_) => Principal::General(user_id),
    })
}

// endregion: --- Principal

// region:    --- Users

/// 사용자 모델
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: i32,
    pub expertise: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 사용자 생성 명령
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub role: i32,
    pub expertise: Option<String>,
}

/// 사용자명 중복 검사 (예외 대신 Result로 반환)
pub async fn check_username_available(
    db: &DatabaseManager,
    username: &str,
) -> Result<(), EngineError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(db.pool())
        .await?;
    if exists.is_some() {
        return Err(ValidationError::UsernameTaken.into());
    }
    Ok(())
}

/// 이메일 중복 검사
pub async fn check_email_available(db: &DatabaseManager, email: &str) -> Result<(), EngineError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(db.pool())
        .await?;
    if exists.is_some() {
        return Err(ValidationError::EmailTaken.into());
    }
    Ok(())
}

/// 사용자 생성 (중복 검사 포함)
pub async fn create_user(db: &DatabaseManager, new_user: NewUser) -> Result<User, EngineError> {
    info!(
        "{:<12} --> 사용자 생성: {} (role {})",
        "Identity", new_user.username, new_user.role
    );
    check_username_available(db, &new_user.username).await?;
    check_email_available(db, &new_user.email).await?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, role, expertise)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(&new_user.username)
    .bind(&new_user.email)
    .bind(new_user.role)
    .bind(&new_user.expertise)
    .fetch_one(db.pool())
    .await?;

    Ok(user)
}

// endregion: --- Users

// region:    --- Expert Availability

/// 전문가 가용 시간대 (day_of_week 0 = 월요일, 시각은 0-24시)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExpertAvailability {
    pub id: i64,
    pub expert_id: i64,
    pub day_of_week: i32,
    pub start_hour: i32,
    pub end_hour: i32,
}

/// 가용 시간대 검증: 요일 0-6, 시작 < 종료, 0-24시 범위
pub fn validate_availability_window(
    day_of_week: i32,
    start_hour: i32,
    end_hour: i32,
) -> Result<(), EngineError> {
    if !(0..=6).contains(&day_of_week) {
        return Err(EngineError::InvalidState);
    }
    if !(0..24).contains(&start_hour) || !(1..=24).contains(&end_hour) || start_hour >= end_hour {
        return Err(EngineError::InvalidState);
    }
    Ok(())
}

/// 가용 시간대 등록 (전문가 본인 전용)
pub async fn add_availability(
    db: &DatabaseManager,
    principal: Principal,
    day_of_week: i32,
    start_hour: i32,
    end_hour: i32,
) -> Result<ExpertAvailability, EngineError> {
    if !principal.is_expert() {
        return Err(EngineError::AccessDenied);
    }
    let expert_id = principal.user_id().ok_or(EngineError::AccessDenied)?;
    validate_availability_window(day_of_week, start_hour, end_hour)?;
    info!(
        "{:<12} --> 가용 시간대 등록 expert: {} day: {} {}-{}시",
        "Identity", expert_id, day_of_week, start_hour, end_hour
    );

    let window = sqlx::query_as::<_, ExpertAvailability>(
        "INSERT INTO expert_availability (expert_id, day_of_week, start_hour, end_hour)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(expert_id)
    .bind(day_of_week)
    .bind(start_hour)
    .bind(end_hour)
    .fetch_one(db.pool())
    .await?;
    Ok(window)
}

/// 전문가의 가용 시간대 조회 (요일, 시작 시각 순)
pub async fn availability_for(
    db: &DatabaseManager,
    expert_id: i64,
) -> Result<Vec<ExpertAvailability>, EngineError> {
    Ok(sqlx::query_as::<_, ExpertAvailability>(
        "SELECT * FROM expert_availability
         WHERE expert_id = $1
         ORDER BY day_of_week ASC, start_hour ASC",
    )
    .bind(expert_id)
    .fetch_all(db.pool())
    .await?)
}

// endregion: --- Expert Availability

// endregion: --- Tests
