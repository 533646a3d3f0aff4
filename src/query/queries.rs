/// 상품 조회
pub const GET_ITEM: &str = "SELECT * FROM items WHERE id = $1";

/// 진행 중 경매 목록 조회
pub const LIST_ACTIVE_ITEMS: &str =
    "SELECT * FROM items WHERE status = 'ACTIVE' ORDER BY end_time ASC";

/// 상품 이름 검색 (부분 일치, 대소문자 무시)
pub const SEARCH_ITEMS_BY_NAME: &str = r#"
    SELECT * FROM items
    WHERE status = 'ACTIVE' AND name ILIKE '%' || $1 || '%'
    ORDER BY end_time ASC
"#;

/// 최고 입찰 조회 (동액은 먼저 들어온 입찰이 이긴다)
pub const GET_HIGHEST_BID: &str = r#"
    SELECT * FROM bids
    WHERE item_id = $1
    ORDER BY amount DESC, created_at ASC
    LIMIT 1
"#;

/// 상품 입찰 이력 조회 (금액 내림차순)
pub const GET_BIDS_FOR: &str = r#"
    SELECT * FROM bids
    WHERE item_id = $1
    ORDER BY amount DESC, created_at ASC
"#;

/// 전문가에게 배정된 검토 대기 감정 요청 조회
pub const LIST_PENDING_FOR_EXPERT: &str = r#"
    SELECT * FROM authentication_requests
    WHERE expert_id = $1 AND status = 'PENDING'
    ORDER BY created_at ASC
"#;

/// 감정 요청 대화 내역 조회
pub const LIST_MESSAGES_FOR_REQUEST: &str = r#"
    SELECT * FROM authentication_messages
    WHERE request_id = $1
    ORDER BY created_at ASC
"#;

/// 사용자 알림 조회 (최신순)
pub const LIST_NOTIFICATIONS: &str = r#"
    SELECT * FROM notifications
    WHERE user_id = $1
    ORDER BY created_at DESC
"#;

/// 카테고리 목록 조회
pub const LIST_CATEGORIES: &str = "SELECT * FROM categories ORDER BY name ASC";
