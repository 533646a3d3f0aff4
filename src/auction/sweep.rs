/// 경매 마감 스윕 스케줄러
/// 요청 처리와 독립적으로 주기 실행되는 단일 백그라운드 태스크
/// 요청 핸들러와 같은 스토리지 인터페이스를 주입받으며 명시적인 start/stop 수명 주기를 가진다
// region:    --- Imports
use crate::auction::commands;
use crate::database::DatabaseManager;
use crate::email::EmailSender;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Closing Sweep

/// 기본 실행 주기 및 시작 지연 (스토리지 초기화 대기)
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(5);

/// 마감 스윕 태스크
pub struct ClosingSweep {
    db: Arc<DatabaseManager>,
    mailer: Arc<dyn EmailSender>,
    period: Duration,
    startup_delay: Duration,
}

/// 실행 중인 스윕의 핸들 (stop으로 종료 신호를 보내고 태스크를 기다린다)
pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl ClosingSweep {
    pub fn new(db: Arc<DatabaseManager>, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            db,
            mailer,
            period: DEFAULT_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
        }
    }

    /// 실행 주기 변경 (테스트에서 짧은 주기로 돌릴 때 사용)
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// 스윕 시작
    /// 배치 오류는 모두 로그로만 남기고 루프는 계속된다
    pub fn start(self) -> SweepHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let ClosingSweep {
            db,
            mailer,
            period,
            startup_delay,
        } = self;

        let task = tokio::spawn(async move {
            sleep(startup_delay).await;
            let mut ticker = interval(period);
            info!(
                "{:<12} --> 마감 스윕 시작 (주기 {:?})",
                "Sweep", period
            );
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match commands::close_expired_auctions(&db, &mailer, Utc::now()).await {
                            Ok(batch) if !batch.closed.is_empty() || batch.failed > 0 => {
                                info!(
                                    "{:<12} --> 마감 {}건 처리, 실패 {}건",
                                    "Sweep",
                                    batch.closed.len(),
                                    batch.failed
                                );
                            }
                            Ok(_) => {
                                debug!("{:<12} --> 마감 대상 없음", "Sweep");
                            }
                            Err(e) => {
                                error!(
                                    "{:<12} --> 마감 배치 실행 중 오류 발생: {:?}",
                                    "Sweep", e
                                );
                            }
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("{:<12} --> 마감 스윕 종료", "Sweep");
                        break;
                    }
                }
            }
        });

        SweepHandle { shutdown, task }
    }
}

// endregion: --- Closing Sweep
