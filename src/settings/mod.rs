// region:    --- Imports
use crate::database::DatabaseManager;
use crate::errors::EngineError;
use crate::identity::Principal;
use tracing::info;

// endregion: --- Imports

// region:    --- Configuration Store

/// 수수료 설정 키
pub const REGULAR_FEE_PERCENTAGE: &str = "regular_fee_percentage";
pub const AUTHENTICATED_FEE_PERCENTAGE: &str = "authenticated_fee_percentage";

/// 설정 조회 (키 -> 문자열 값)
pub async fn get(db: &DatabaseManager, name: &str) -> Result<Option<String>, EngineError> {
    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE name = $1")
        .bind(name)
        .fetch_optional(db.pool())
        .await?;
    Ok(value)
}

/// 설정 기록 (관리자 전용, upsert)
pub async fn set(
    db: &DatabaseManager,
    principal: Principal,
    name: &str,
    value: &str,
) -> Result<(), EngineError> {
    if !principal.is_manager() {
        return Err(EngineError::AccessDenied);
    }
    info!("{:<12} --> 설정 변경 {} = {}", "Settings", name, value);

    sqlx::query(
        "INSERT INTO settings (name, value) VALUES ($1, $2)
         ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value",
    )
    .bind(name)
    .bind(value)
    .execute(db.pool())
    .await?;
    Ok(())
}

// endregion: --- Configuration Store
