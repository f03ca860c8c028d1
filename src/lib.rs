pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::repositories::store::PgExamStore;
use crate::services::admin_notify;
use crate::services::ai_grading::AiGradingService;
use crate::services::attempts::ExamEngine;
use crate::services::grading::AnswerGrader;
use crate::services::rankings::{RankService, RedisRankCache};
use crate::services::timers::RedisTimerStore;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = connect_redis(&settings).await;
    let engine = build_engine(&settings, db_pool.clone(), redis.clone())?;
    let state = AppState::new(settings, db_pool, redis.clone(), engine);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Exam engine API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = connect_redis(&settings).await;
    let engine = build_engine(&settings, db_pool, redis.clone())?;

    let result = tasks::scheduler::run(engine, &settings).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

async fn connect_redis(settings: &Settings) -> RedisHandle {
    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; timers and rank cache are offline");
    } else {
        tracing::info!("Redis connected successfully");
    }
    redis
}

fn build_engine(settings: &Settings, db: PgPool, redis: RedisHandle) -> anyhow::Result<ExamEngine> {
    let exam = settings.exam();
    let store = Arc::new(PgExamStore::new(db));
    let timers = Arc::new(RedisTimerStore::new(redis.clone(), exam.timer_grace_seconds));
    let redis_timeout = Duration::from_millis(exam.cache_read_timeout_ms);
    let ranks = RankService::new(
        Arc::new(RedisRankCache::new(redis)),
        store.clone(),
        exam.rank_cache_ttl_seconds,
        redis_timeout,
    );

    let evaluator = Arc::new(AiGradingService::from_settings(settings)?);
    let notifier = admin_notify::from_settings(settings)?;
    let notify_timeout = Duration::from_secs(settings.notifications().timeout_seconds.max(1));
    let grader = AnswerGrader::new(evaluator, notifier, notify_timeout);

    Ok(ExamEngine::new(store, timers, redis_timeout, ranks, grader))
}
