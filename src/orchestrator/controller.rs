//! Cycle controller.
//!
//! Starts fetch cycles on launch, on manual refresh and on poll ticks, with at most one
//! cycle in flight. Outcomes are emitted as events; aggregation and rendering happen in
//! the presentation layer that receives them.

use crate::error::FetchError;
use crate::fetch::FetchRuns;
use crate::model::{CycleEvent, InfoEvent, MonitorConfig, RunCollection, Trigger};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, Interval, MissedTickBehavior};

/// Commands emitted by UI layers to drive the controller.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Refresh,
    Quit,
}

/// Handle for the cycle currently in flight.
struct CycleCtx {
    cycle: u64,
    handle: Option<JoinHandle<Result<RunCollection, FetchError>>>,
}

struct Cycles<F> {
    fetcher: Arc<F>,
    event_tx: UnboundedSender<CycleEvent>,
    next_cycle: u64,
    in_flight: Option<CycleCtx>,
}

impl<F: FetchRuns> Cycles<F> {
    /// Start a cycle unless one is already in flight. Triggers are never queued.
    fn trigger(&mut self, trigger: Trigger) {
        if let Some(ctx) = &self.in_flight {
            tracing::debug!(?trigger, cycle = ctx.cycle, "cycle in flight; trigger ignored");
            let _ = self.event_tx.send(CycleEvent::TriggerIgnored { trigger });
            return;
        }

        let cycle = self.next_cycle;
        self.next_cycle += 1;
        tracing::info!(cycle, ?trigger, "starting refresh cycle");

        let fetcher = Arc::clone(&self.fetcher);
        let handle = tokio::spawn(async move { fetcher.fetch().await });
        self.in_flight = Some(CycleCtx {
            cycle,
            handle: Some(handle),
        });
        let _ = self.event_tx.send(CycleEvent::CycleStarted { cycle, trigger });
    }
}

fn poll_timer(period: Duration) -> Interval {
    // The launch cycle is started separately, so the first tick is one period out.
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// Drive fetch cycles until told to quit (or the command channel closes).
///
/// Quitting cancels the poll timer. A cycle already in flight is not aborted: its
/// outcome is still emitted before the controller returns.
pub(crate) async fn run_controller<F: FetchRuns>(
    cfg: &MonitorConfig,
    fetcher: Arc<F>,
    event_tx: UnboundedSender<CycleEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut cycles = Cycles {
        fetcher,
        event_tx: event_tx.clone(),
        next_cycle: 1,
        in_flight: None,
    };
    if cfg.fetch_on_launch {
        cycles.trigger(Trigger::Launch);
    }

    let mut poll = cfg.poll_interval.map(poll_timer);
    let mut stopping = false;
    // Stop watchdog: if the in-flight fetch is slow, keep the UI informed.
    let mut stop_deadline: Option<Instant> = None;
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            cmd = cmd_rx.recv(), if !stopping => {
                match cmd {
                    Some(UiCommand::Refresh) => cycles.trigger(Trigger::Manual),
                    Some(UiCommand::Quit) | None => {
                        stopping = true;
                        poll = None;
                        if cycles.in_flight.is_none() {
                            break Ok(());
                        }
                        let _ = event_tx.send(CycleEvent::Info(InfoEvent::WaitingForCycle));
                        stop_deadline = Some(Instant::now() + Duration::from_secs(3));
                    }
                }
            }
            // Do not take the JoinHandle before this branch wins; otherwise it can be dropped
            // if another select branch is chosen, and we'll never observe completion.
            maybe_done = async {
                if let Some(ctx) = &mut cycles.in_flight {
                    if let Some(h) = ctx.handle.as_mut() {
                        return Some(h.await);
                    }
                }
                futures::future::pending().await
            } => {
                let Some(join_res) = maybe_done else { continue };
                let Some(ctx) = cycles.in_flight.take() else { continue };
                stop_deadline = None;
                match join_res {
                    Ok(outcome) => {
                        match &outcome {
                            Ok(runs) => tracing::info!(cycle = ctx.cycle, runs = runs.len(), "refresh cycle completed"),
                            Err(e) => tracing::warn!(cycle = ctx.cycle, kind = ?e.kind(), error = %e, "refresh cycle failed"),
                        }
                        let _ = event_tx.send(CycleEvent::CycleCompleted { cycle: ctx.cycle, outcome });
                    }
                    Err(e) => {
                        tracing::error!(cycle = ctx.cycle, error = %e, "refresh task failed");
                        let _ = event_tx.send(CycleEvent::CycleAborted {
                            cycle: ctx.cycle,
                            reason: e.to_string(),
                        });
                    }
                }
                if stopping {
                    break Ok(());
                }
            }
            _ = async {
                match poll.as_mut() {
                    Some(timer) => {
                        timer.tick().await;
                    }
                    None => futures::future::pending::<()>().await,
                }
            } => {
                cycles.trigger(Trigger::Poll);
            }
            _ = watchdog.tick() => {
                if let Some(deadline) = stop_deadline {
                    if Instant::now() >= deadline && cycles.in_flight.is_some() {
                        let _ = event_tx.send(CycleEvent::Info(InfoEvent::StillWaiting));
                        stop_deadline = None;
                    }
                }
            }
        }
    }
}
