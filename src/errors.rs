// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

// endregion: --- Imports

// region:    --- Engine Errors

/// 회원 가입 검증 오류
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("username already taken")]
    UsernameTaken,
    #[error("email already taken")]
    EmailTaken,
}

/// 엔진 연산 오류
/// 오류 종류만으로 위반된 불변식을 식별할 수 있어야 한다 (UI는 추가 검사 없이 메시지로 변환)
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("auction is not active")]
    NotActive,
    #[error("seller cannot bid on own item")]
    SelfBid,
    #[error("bid must exceed current price {current}")]
    BidTooLow { current: i64 },
    #[error("operation not allowed in current state")]
    InvalidState,
    #[error("expert is not eligible for this category")]
    NoEligibleExpert,
    #[error("access denied")]
    AccessDenied,
    #[error("payer is not the recorded winner")]
    NotWinner,
    #[error("item has already been settled")]
    AlreadySettled,
    #[error("record not found")]
    NotFound,
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    /// UI 계층에서 사용하는 안정적인 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotActive => "NOT_ACTIVE",
            EngineError::SelfBid => "SELF_BID",
            EngineError::BidTooLow { .. } => "BID_TOO_LOW",
            EngineError::InvalidState => "INVALID_STATE",
            EngineError::NoEligibleExpert => "NO_ELIGIBLE_EXPERT",
            EngineError::AccessDenied => "ACCESS_DENIED",
            EngineError::NotWinner => "NOT_WINNER",
            EngineError::AlreadySettled => "ALREADY_SETTLED",
            EngineError::NotFound => "NOT_FOUND",
            EngineError::Validation(ValidationError::UsernameTaken) => "USERNAME_TAKEN",
            EngineError::Validation(ValidationError::EmailTaken) => "EMAIL_TAKEN",
            EngineError::Storage(_) => "STORAGE_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::NotFound => StatusCode::NOT_FOUND,
            EngineError::AccessDenied | EngineError::NotWinner => StatusCode::FORBIDDEN,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

// endregion: --- Engine Errors

// endregion: --- Tests
