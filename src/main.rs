// region:    --- Imports
use auction_marketplace::auction::sweep::ClosingSweep;
use auction_marketplace::database::DatabaseManager;
use auction_marketplace::email::HttpEmailSender;
use auction_marketplace::handlers;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // DatabaseManager 생성
    let db_manager = Arc::new(DatabaseManager::new().await);

    // 데이터베이스 초기화
    if let Err(e) = db_manager.initialize_database().await {
        error!("{:<12} --> 데이터베이스 초기화 실패: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> 데이터베이스 초기화 성공", "Main");

    // 메일 전송기 구성 (best-effort 협력자)
    let mailer = HttpEmailSender::from_env();

    // 마감 스윕 시작 (요청 처리와 같은 스토리지 인터페이스를 공유)
    let sweep = ClosingSweep::new(Arc::clone(&db_manager), Arc::clone(&mailer));
    let _sweep_handle = sweep.start();

    // 테스트 페이지를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = Router::new()
        .route("/items", post(handlers::handle_list_item))
        .route("/items", get(handlers::handle_list_active_items))
        .route("/items/search", get(handlers::handle_search_items))
        .route("/items/:id", get(handlers::handle_get_item))
        .route("/items/:id", axum::routing::delete(handlers::handle_remove_item))
        .route("/items/:id/bids", get(handlers::handle_get_item_bids))
        .route(
            "/items/:id/highest-bid",
            get(handlers::handle_get_highest_bid),
        )
        .route("/items/:id/fee", get(handlers::handle_compute_fee))
        .route("/items/:id/settle", post(handlers::handle_settle))
        .route("/bid", post(handlers::handle_place_bid))
        .route("/sweep/run", post(handlers::handle_run_sweep))
        .route(
            "/authentication/:id/assign",
            post(handlers::handle_assign_expert),
        )
        .route(
            "/authentication/:id/decision",
            post(handlers::handle_decide),
        )
        .route(
            "/authentication/:id/messages",
            post(handlers::handle_post_message),
        )
        .route(
            "/authentication/:id/messages",
            get(handlers::handle_get_request_messages),
        )
        .route(
            "/experts/:id/pending",
            get(handlers::handle_list_pending_for_expert),
        )
        .route(
            "/experts/:id/availability",
            post(handlers::handle_add_availability),
        )
        .route(
            "/experts/:id/availability",
            get(handlers::handle_list_availability),
        )
        .route("/users", post(handlers::handle_create_user))
        .route(
            "/users/:id/notifications",
            get(handlers::handle_list_notifications),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::handle_mark_notification_read),
        )
        .route("/categories", get(handlers::handle_list_categories))
        .route("/settings/:name", put(handlers::handle_set_setting))
        .layer(cors)
        .with_state((db_manager, mailer));

    // 리스너 생성(로컬 호스트의 3000번 포트를 사용)
    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
