use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{interval, Duration, MissedTickBehavior};

use crate::core::config::Settings;
use crate::services::attempts::ExamEngine;
use crate::tasks::timer_sweep;

pub(crate) async fn run(engine: ExamEngine, settings: &Settings) -> Result<()> {
    let shutdown = crate::core::shutdown::watch_shutdown();
    let every = Duration::from_secs(settings.exam().timer_sweep_interval_seconds);
    let grace = Duration::from_secs(settings.exam().timer_grace_seconds);

    tracing::info!(interval_seconds = every.as_secs(), "Timer sweep scheduler started");
    sweep_loop(engine, every, grace, shutdown).await;
    tracing::info!("Timer sweep scheduler stopped");

    Ok(())
}

async fn sweep_loop(
    engine: ExamEngine,
    every: Duration,
    grace: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {
                let engine = engine.clone();
                let outcome = tokio::spawn(async move {
                    let timers = timer_sweep::run_sweep(&engine).await;
                    let overdue = timer_sweep::run_overdue_sweep(&engine, grace).await;
                    timers.and(overdue)
                })
                .await;
                match outcome {
                    Ok(Ok(_)) => {
                        metrics::counter!("timer_sweep_runs_total", "outcome" => "ok").increment(1);
                    }
                    Ok(Err(err)) => {
                        metrics::counter!("timer_sweep_runs_total", "outcome" => "error").increment(1);
                        tracing::error!(error = %err, "Timer sweep failed");
                    }
                    Err(err) => {
                        metrics::counter!("timer_sweep_runs_total", "outcome" => "panic").increment(1);
                        tracing::error!(error = %err, "Timer sweep task join failed");
                    }
                }
            }
        }
    }
}
