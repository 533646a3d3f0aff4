/// 엔진 통합 테스트
/// DATABASE_URL이 가리키는 PostgreSQL이 필요하므로 기본으로는 ignore 처리한다
/// 실행: DATABASE_URL=... cargo test -- --ignored
use auction_marketplace::auction::commands::{self, ListItemCommand, PlaceBidCommand};
use auction_marketplace::auction::model::{Item, ItemStatus};
use auction_marketplace::authentication::model::{Decision, RequestStatus};
use auction_marketplace::authentication::workflow;
use auction_marketplace::database::DatabaseManager;
use auction_marketplace::email::{EmailSender, LogEmailSender};
use auction_marketplace::errors::EngineError;
use auction_marketplace::identity::{self, NewUser, Principal};
use auction_marketplace::notification::Notification;
use auction_marketplace::query;
use auction_marketplace::{payment, settings};
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static UNIQUE: AtomicU64 = AtomicU64::new(0);

/// 테스트 간 충돌을 피하기 위한 고유 접미사
fn unique_suffix() -> String {
    format!(
        "{}-{}",
        std::process::id(),
        UNIQUE.fetch_add(1, Ordering::Relaxed)
    )
}

/// 데이터베이스 매니저 설정 (스키마는 idempotent하게 생성)
async fn setup() -> Arc<DatabaseManager> {
    let db = Arc::new(DatabaseManager::new().await);
    db.initialize_database()
        .await
        .expect("schema initialization failed");
    db
}

fn test_mailer() -> Arc<dyn EmailSender> {
    Arc::new(LogEmailSender)
}

/// 테스트용 사용자 생성
async fn create_user(db: &DatabaseManager, role: i32, expertise: Option<&str>) -> i64 {
    let suffix = unique_suffix();
    let user = identity::create_user(
        db,
        NewUser {
            username: format!("user-{}", suffix),
            email: format!("user-{}@example.com", suffix),
            role,
            expertise: expertise.map(str::to_string),
        },
    )
    .await
    .unwrap();
    user.id
}

/// 테스트용 카테고리 생성
async fn create_category(db: &DatabaseManager, base_name: &str) -> (i64, String) {
    let name = format!("{}-{}", base_name, unique_suffix());
    let id: i64 =
        sqlx::query_scalar("INSERT INTO categories (name) VALUES ($1) RETURNING id")
            .bind(&name)
            .fetch_one(db.pool())
            .await
            .unwrap();
    (id, name)
}

/// 테스트용 상품 등록
async fn list_test_item(
    db: &DatabaseManager,
    seller_id: i64,
    category_id: i64,
    minimum_price: i64,
    requires_authentication: bool,
) -> Item {
    commands::list_item(
        db,
        ListItemCommand {
            seller_id,
            name: format!("Golden Watch {}", unique_suffix()),
            description: "A beautiful antique watch".to_string(),
            category_id,
            minimum_price,
            end_time: Utc::now() + Duration::hours(1),
            requires_authentication,
        },
    )
    .await
    .unwrap()
}

/// 대상 상품만 마감 시각을 과거로 돌린다 (다른 테스트의 상품은 건드리지 않는다)
async fn expire_item(db: &DatabaseManager, item_id: i64) {
    sqlx::query("UPDATE items SET end_time = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::seconds(1))
        .bind(item_id)
        .execute(db.pool())
        .await
        .unwrap();
}

async fn notifications_of_kind(db: &DatabaseManager, user_id: i64, kind: &str) -> Vec<Notification> {
    query::handlers::list_notifications(db, user_id)
        .await
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == kind)
        .collect()
}

/// 등록 직후 조회: 감정 요청 여부에 따라 ACTIVE / PENDING
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_list_then_get_round_trip() {
    let db = setup().await;
    let seller = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;

    let active = list_test_item(&db, seller, category_id, 100, false).await;
    let fetched = query::handlers::get_item(&db, active.id).await.unwrap();
    assert_eq!(fetched.status().unwrap(), ItemStatus::Active);
    assert_eq!(fetched.current_price, 100);
    assert!(fetched.start_time.is_some());

    let pending = list_test_item(&db, seller, category_id, 100, true).await;
    let fetched = query::handlers::get_item(&db, pending.id).await.unwrap();
    assert_eq!(fetched.status().unwrap(), ItemStatus::Pending);

    // 감정 요청이 함께 생성된다
    let request_status: String = sqlx::query_scalar(
        "SELECT status FROM authentication_requests WHERE item_id = $1",
    )
    .bind(pending.id)
    .fetch_one(db.pool())
    .await
    .unwrap();
    assert_eq!(request_status, "PENDING");
}

/// 110 -> 110(거절) -> 120 시나리오와 outbid 알림
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_bid_scenario_with_outbid_notification() {
    let db = setup().await;
    let seller = create_user(&db, 1, None).await;
    let bidder_a = create_user(&db, 1, None).await;
    let bidder_b = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "watches").await;
    let item = list_test_item(&db, seller, category_id, 100, false).await;

    // 판매자 본인 입찰은 거절
    let err = commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: seller,
            amount: 150,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::SelfBid));

    // A가 110 입찰 성공
    commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: bidder_a,
            amount: 110,
        },
    )
    .await
    .unwrap();
    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.current_price, 110);

    // B가 같은 금액 110은 거절 (엄격한 증가)
    let err = commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: bidder_b,
            amount: 110,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::BidTooLow { current: 110 }));

    // B가 120 입찰 성공, A에게 outbid 알림
    commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: bidder_b,
            amount: 120,
        },
    )
    .await
    .unwrap();
    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.current_price, 120);

    let outbids = notifications_of_kind(&db, bidder_a, "outbid").await;
    assert_eq!(outbids.len(), 1);
    assert_eq!(outbids[0].item_id, Some(item.id));

    // 최고 입찰은 B의 120
    let highest = query::handlers::highest_bid(&db, item.id).await.unwrap().unwrap();
    assert_eq!(highest.bidder_id, bidder_b);
    assert_eq!(highest.amount, 120);
}

/// 동시 입찰에서 갱신 유실이 없어야 한다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_concurrent_bidding_no_lost_updates() {
    let db = setup().await;
    let seller = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;
    let item = list_test_item(&db, seller, category_id, 10_000, false).await;

    let mut bidders = Vec::new();
    for _ in 0..20 {
        bidders.push(create_user(&db, 1, None).await);
    }

    let mut handles = Vec::new();
    for (i, bidder_id) in bidders.iter().enumerate() {
        let db = Arc::clone(&db);
        let item_id = item.id;
        let bidder_id = *bidder_id;
        let amount = 10_000 + (i as i64 + 1) * 1_000;
        handles.push(tokio::spawn(async move {
            commands::place_bid(
                &db,
                PlaceBidCommand {
                    item_id,
                    bidder_id,
                    amount,
                },
            )
            .await
        }));
    }

    let mut successes = 0;
    let mut max_accepted = 0_i64;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(bid) => {
                successes += 1;
                max_accepted = max_accepted.max(bid.amount);
            }
            Err(EngineError::BidTooLow { .. }) => {}
            Err(e) => panic!("unexpected bid error: {:?}", e),
        }
    }
    assert!(successes >= 1);

    // 기록된 최고 입찰과 current_price가 일치해야 한다
    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    let highest = query::handlers::highest_bid(&db, item.id).await.unwrap().unwrap();
    assert_eq!(item_now.current_price, highest.amount);
    assert_eq!(item_now.current_price, max_accepted);

    // 원장에는 성공한 입찰만 남는다
    let bids = query::handlers::bids_for(&db, item.id).await.unwrap();
    assert_eq!(bids.len(), successes);
}

/// 입찰이 있는 만료 경매는 PAYING으로, 낙찰자에게 won 알림 1건
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_close_with_bid_transitions_to_paying() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let bidder = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;
    let item = list_test_item(&db, seller, category_id, 100, false).await;

    commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: bidder,
            amount: 150,
        },
    )
    .await
    .unwrap();

    // 마감 시각을 과거로 돌린 뒤 스윕 실행
    expire_item(&db, item.id).await;
    let batch = commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();
    // 스윕은 전역 배치이므로 이 테스트의 상품만 확인한다
    assert!(batch.closed.iter().any(|c| c.item_id == item.id));

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Paying);
    assert_eq!(item_now.winner_id, Some(bidder));

    let won = notifications_of_kind(&db, bidder, "won").await;
    assert_eq!(won.len(), 1);
    // 낙찰된 경매에서는 판매자에게 ended 알림을 보내지 않는다
    let ended = notifications_of_kind(&db, seller, "ended").await;
    assert!(ended.iter().all(|n| n.item_id != Some(item.id)));

    // 같은 스윕을 다시 돌려도 추가 변화가 없어야 한다 (idempotent)
    let batch = commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();
    assert!(batch.closed.iter().all(|c| c.item_id != item.id));
    let won = notifications_of_kind(&db, bidder, "won").await;
    assert_eq!(won.len(), 1);
}

/// 입찰이 없는 만료 경매는 EXPIRED로, 판매자에게 ended 알림
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_close_without_bid_expires() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;
    let item = list_test_item(&db, seller, category_id, 100, false).await;

    expire_item(&db, item.id).await;
    commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Expired);
    assert_eq!(item_now.winner_id, None);

    let ended: Vec<_> = notifications_of_kind(&db, seller, "ended")
        .await
        .into_iter()
        .filter(|n| n.item_id == Some(item.id))
        .collect();
    assert_eq!(ended.len(), 1);
}

/// 감정 결정이 내려지지 않은 PENDING 상품도 마감 시각이 지나면 유찰된다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_pending_item_expires_past_deadline() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;
    let item = list_test_item(&db, seller, category_id, 100, true).await;

    expire_item(&db, item.id).await;
    commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Expired);
}

/// 배치 안의 한 상품이 실패해도 나머지 마감은 계속된다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_sweep_isolates_per_item_failures() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let bidder = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;

    // PENDING 상품에 엔진을 우회해 입찰을 심으면 마감이 PENDING -> PAYING 전이에서 실패한다
    let poisoned = list_test_item(&db, seller, category_id, 100, true).await;
    sqlx::query("INSERT INTO bids (item_id, bidder_id, amount) VALUES ($1, $2, $3)")
        .bind(poisoned.id)
        .bind(bidder)
        .bind(150_i64)
        .execute(db.pool())
        .await
        .unwrap();
    let healthy = list_test_item(&db, seller, category_id, 100, false).await;

    expire_item(&db, poisoned.id).await;
    expire_item(&db, healthy.id).await;
    let batch = commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();

    // 실패가 집계되고, 같은 배치의 정상 상품은 그대로 마감된다
    assert!(batch.failed >= 1);
    assert!(batch.closed.iter().any(|c| c.item_id == healthy.id));

    let healthy_now = query::handlers::get_item(&db, healthy.id).await.unwrap();
    assert_eq!(healthy_now.status().unwrap(), ItemStatus::Expired);
    let poisoned_now = query::handlers::get_item(&db, poisoned.id).await.unwrap();
    assert_eq!(poisoned_now.status().unwrap(), ItemStatus::Pending);

    // 이후 스윕이 계속 실패하지 않도록 치운다
    sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(poisoned.id)
        .execute(db.pool())
        .await
        .unwrap();
}

/// 결제 정산: 낙찰자만, 한 번만
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_settle_is_idempotent_per_item() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let winner = create_user(&db, 1, None).await;
    let stranger = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;
    let item = list_test_item(&db, seller, category_id, 100, false).await;

    commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: winner,
            amount: 10_000,
        },
    )
    .await
    .unwrap();
    expire_item(&db, item.id).await;
    commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();

    // 낙찰자가 아니면 거절
    let err = payment::settle(&db, item.id, stranger).await.unwrap_err();
    assert!(matches!(err, EngineError::NotWinner));

    // 낙찰자 결제: 기본 수수료 1% 적용
    let paid = payment::settle(&db, item.id, winner).await.unwrap();
    assert_eq!(paid.amount, 10_000);
    assert_eq!(paid.fee_percentage, 1.0);
    assert_eq!(paid.fee_amount, 100);
    assert_eq!(paid.status, "completed");
    assert!(paid.completed_at.is_some());

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Sold);

    // 두 번째 정산은 AlreadySettled, 결제 레코드는 그대로 1건
    let err = payment::settle(&db, item.id, winner).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadySettled));
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments WHERE item_id = $1")
        .bind(item.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    // 구매자/판매자 모두 payment 알림을 받는다
    assert_eq!(notifications_of_kind(&db, winner, "payment").await.len(), 1);
    assert_eq!(notifications_of_kind(&db, seller, "payment").await.len(), 1);
}

/// 감정 워크플로: 배정 -> 재감정 -> 재배정 -> 승인
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_authentication_workflow() {
    let db = setup().await;
    let seller = create_user(&db, 1, None).await;
    let manager = create_user(&db, 3, None).await;
    let (category_id, category_name) = create_category(&db, "Art").await;
    // 전문 분야 대조는 대소문자를 무시한다
    let expert = create_user(&db, 2, Some(&category_name.to_uppercase())).await;
    let wrong_expert = create_user(&db, 2, Some("Watches")).await;

    let item = list_test_item(&db, seller, category_id, 100, true).await;
    let request_id: i64 =
        sqlx::query_scalar("SELECT id FROM authentication_requests WHERE item_id = $1")
            .bind(item.id)
            .fetch_one(db.pool())
            .await
            .unwrap();

    // 관리자가 아니면 배정 불가
    let err = workflow::assign_expert(&db, request_id, expert, Principal::General(seller))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccessDenied));

    // 분야가 다른 전문가는 배정 불가
    let err = workflow::assign_expert(&db, request_id, wrong_expert, Principal::Manager(manager))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NoEligibleExpert));

    // 정상 배정: 전문가에게 알림이 가고 배정 메시지가 남는다
    let request = workflow::assign_expert(&db, request_id, expert, Principal::Manager(manager))
        .await
        .unwrap();
    assert_eq!(request.expert_id, Some(expert));
    assert_eq!(
        notifications_of_kind(&db, expert, "authentication").await.len(),
        1
    );
    let transcript = query::handlers::messages_for_request(&db, request_id)
        .await
        .unwrap();
    assert_eq!(transcript.len(), 1);

    // 검토 대기 목록에 나타난다
    let pending = query::handlers::list_pending_for_expert(&db, expert)
        .await
        .unwrap();
    assert!(pending.iter().any(|r| r.id == request_id));

    // 배정된 전문가와 요청자만 메시지를 쓸 수 있다
    let err = workflow::post_message(&db, request_id, manager, "hello".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccessDenied));
    workflow::post_message(&db, request_id, seller, "Please take a close look.".to_string())
        .await
        .unwrap();

    // 재감정: 요청은 SECOND_OPINION, 전문가 배정 해제, 상품은 PENDING 유지
    let request = workflow::decide(
        &db,
        request_id,
        Principal::Expert(expert),
        Decision::SecondOpinion,
        None,
    )
    .await
    .unwrap();
    assert_eq!(request.status().unwrap(), RequestStatus::SecondOpinion);
    assert_eq!(request.expert_id, None);
    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Pending);

    // 재배정 후 승인: 상품은 인증 마크와 함께 ACTIVE로 풀린다
    workflow::assign_expert(&db, request_id, expert, Principal::Manager(manager))
        .await
        .unwrap();
    let request = workflow::decide(
        &db,
        request_id,
        Principal::Expert(expert),
        Decision::Approved,
        None,
    )
    .await
    .unwrap();
    assert_eq!(request.status().unwrap(), RequestStatus::Approved);

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Active);
    assert!(item_now.is_authenticated);

    // 종결된 요청에 다시 결정을 내릴 수 없다
    let err = workflow::decide(
        &db,
        request_id,
        Principal::Expert(expert),
        Decision::Rejected,
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState));
}

/// 마감 이후에 도착한 감정 결정은 start_time을 되돌리지 않는다
/// (end_time이 지난 상품을 ACTIVE로 풀어도 start_time < end_time이 유지되고
///  다음 스윕이 그대로 마감한다)
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_late_decision_keeps_listing_start_time() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let manager = create_user(&db, 3, None).await;
    let (category_id, category_name) = create_category(&db, "art").await;
    let expert = create_user(&db, 2, Some(&category_name)).await;

    let item = list_test_item(&db, seller, category_id, 100, true).await;
    let request_id: i64 =
        sqlx::query_scalar("SELECT id FROM authentication_requests WHERE item_id = $1")
            .bind(item.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
    workflow::assign_expert(&db, request_id, expert, Principal::Manager(manager))
        .await
        .unwrap();

    // 마감 시각을 등록 이후, 현재 이전으로 돌린다 (start_time < end_time <= now)
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    sqlx::query("UPDATE items SET end_time = $1 WHERE id = $2")
        .bind(Utc::now())
        .bind(item.id)
        .execute(db.pool())
        .await
        .unwrap();

    workflow::decide(
        &db,
        request_id,
        Principal::Expert(expert),
        Decision::Approved,
        None,
    )
    .await
    .unwrap();

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Active);
    assert!(item_now.is_authenticated);
    assert_eq!(item_now.start_time, item.start_time);
    assert!(item_now.end_time.unwrap() > item_now.start_time.unwrap());

    // 다음 스윕이 그대로 마감한다
    commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();
    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Expired);
}

/// 감정 거절도 상품을 시장에 풀되 인증 마크는 남기지 않는다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_rejection_still_activates_item() {
    let db = setup().await;
    let seller = create_user(&db, 1, None).await;
    let manager = create_user(&db, 3, None).await;
    let (category_id, category_name) = create_category(&db, "art").await;
    let expert = create_user(&db, 2, Some(&category_name)).await;

    let item = list_test_item(&db, seller, category_id, 100, true).await;
    let request_id: i64 =
        sqlx::query_scalar("SELECT id FROM authentication_requests WHERE item_id = $1")
            .bind(item.id)
            .fetch_one(db.pool())
            .await
            .unwrap();

    workflow::assign_expert(&db, request_id, expert, Principal::Manager(manager))
        .await
        .unwrap();
    workflow::decide(
        &db,
        request_id,
        Principal::Expert(expert),
        Decision::Rejected,
        Some("The hallmark looks wrong.".to_string()),
    )
    .await
    .unwrap();

    let item_now = query::handlers::get_item(&db, item.id).await.unwrap();
    assert_eq!(item_now.status().unwrap(), ItemStatus::Active);
    assert!(!item_now.is_authenticated);

    // 거절 사유가 대화 내역에 남는다
    let transcript = query::handlers::messages_for_request(&db, request_id)
        .await
        .unwrap();
    assert!(transcript.iter().any(|m| m.body.contains("hallmark")));
}

/// 수수료 설정: 관리자만 쓰고, 설정값이 기본값을 덮는다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_fee_settings_override() {
    let db = setup().await;
    let manager = create_user(&db, 3, None).await;
    let general = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;
    let mut item = list_test_item(&db, general, category_id, 10_000, false).await;

    // 일반 사용자는 설정을 쓸 수 없다
    let err = settings::set(
        &db,
        Principal::General(general),
        settings::AUTHENTICATED_FEE_PERCENTAGE,
        "7.5",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::AccessDenied));

    settings::set(
        &db,
        Principal::Manager(manager),
        settings::AUTHENTICATED_FEE_PERCENTAGE,
        "7.5",
    )
    .await
    .unwrap();
    assert_eq!(
        settings::get(&db, settings::AUTHENTICATED_FEE_PERCENTAGE)
            .await
            .unwrap()
            .as_deref(),
        Some("7.5")
    );

    // 감정 승인 상품은 설정된 수수료율을 쓴다
    item.is_authenticated = true;
    let quote = payment::compute_fee(&db, &item).await.unwrap();
    assert_eq!(quote.percentage, 7.5);
    assert_eq!(quote.amount, 750);
}

/// 사용자명/이메일 중복 검사는 예외가 아니라 Result로 돌아온다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_username_and_email_availability() {
    let db = setup().await;
    let suffix = unique_suffix();
    let username = format!("taken-{}", suffix);
    let email = format!("taken-{}@example.com", suffix);

    identity::create_user(
        &db,
        NewUser {
            username: username.clone(),
            email: email.clone(),
            role: 1,
            expertise: None,
        },
    )
    .await
    .unwrap();

    let err = identity::check_username_available(&db, &username)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "USERNAME_TAKEN");
    let err = identity::check_email_available(&db, &email).await.unwrap_err();
    assert_eq!(err.code(), "EMAIL_TAKEN");

    identity::check_username_available(&db, &format!("free-{}", suffix))
        .await
        .unwrap();
}

/// 전문가 가용 시간대: 전문가 본인만 등록하고, 조회는 요일/시작 시각 순으로 돌아온다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_expert_availability_windows() {
    let db = setup().await;
    let expert = create_user(&db, 2, Some("Art")).await;
    let general = create_user(&db, 1, None).await;

    // 일반 사용자는 등록 불가
    let err = identity::add_availability(&db, Principal::General(general), 1, 9, 17)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AccessDenied));

    // 요일 범위 밖이거나 역전된 구간은 거절
    let err = identity::add_availability(&db, Principal::Expert(expert), 7, 9, 17)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState));
    let err = identity::add_availability(&db, Principal::Expert(expert), 1, 17, 9)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState));

    identity::add_availability(&db, Principal::Expert(expert), 3, 13, 18)
        .await
        .unwrap();
    identity::add_availability(&db, Principal::Expert(expert), 1, 9, 12)
        .await
        .unwrap();

    let windows = identity::availability_for(&db, expert).await.unwrap();
    assert_eq!(windows.len(), 2);
    assert_eq!((windows[0].day_of_week, windows[0].start_hour), (1, 9));
    assert_eq!((windows[1].day_of_week, windows[1].start_hour), (3, 13));
}

/// 판매자는 판매 확정 전까지 상품을 내릴 수 있다
#[tokio::test]
#[ignore = "requires PostgreSQL via DATABASE_URL"]
async fn test_remove_item_before_sale() {
    let db = setup().await;
    let mailer = test_mailer();
    let seller = create_user(&db, 1, None).await;
    let bidder = create_user(&db, 1, None).await;
    let stranger = create_user(&db, 1, None).await;
    let (category_id, _) = create_category(&db, "art").await;

    let item = list_test_item(&db, seller, category_id, 100, false).await;
    let err = commands::remove_item(&db, item.id, stranger).await.unwrap_err();
    assert!(matches!(err, EngineError::AccessDenied));
    commands::remove_item(&db, item.id, seller).await.unwrap();
    assert!(matches!(
        query::handlers::get_item(&db, item.id).await.unwrap_err(),
        EngineError::NotFound
    ));

    // 낙찰자가 정해진 뒤에는 내릴 수 없다
    let item = list_test_item(&db, seller, category_id, 100, false).await;
    commands::place_bid(
        &db,
        PlaceBidCommand {
            item_id: item.id,
            bidder_id: bidder,
            amount: 150,
        },
    )
    .await
    .unwrap();
    expire_item(&db, item.id).await;
    commands::close_expired_auctions(&db, &mailer, Utc::now())
        .await
        .unwrap();
    let err = commands::remove_item(&db, item.id, seller).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState));
}
