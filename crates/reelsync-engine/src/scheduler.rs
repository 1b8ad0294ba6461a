//! The repeating tick.
//!
//! A [`TickScheduler`] runs a tick callback at a fixed rate on the tokio
//! runtime until cancelled. Hosts with their own frame loop use
//! [`TickCadence::HostDriven`] and call the session's `tick` themselves.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// How ticks are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickCadence {
    /// The scheduler ticks every period.
    FixedRate(Duration),
    /// The host drives ticks from its own callback.
    HostDriven,
}

impl TickCadence {
    /// A fixed-rate cadence at `hz` ticks per second.
    pub fn from_hz(hz: f64) -> Self {
        if hz.is_finite() && hz > 0.0 {
            Self::FixedRate(Duration::from_secs_f64(1.0 / hz))
        } else {
            Self::HostDriven
        }
    }
}

/// Cancels a running tick loop.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct TickScheduler {
    cadence: TickCadence,
    cancel: CancelHandle,
}

impl TickScheduler {
    pub fn new(cadence: TickCadence) -> Self {
        Self {
            cadence,
            cancel: CancelHandle::new(),
        }
    }

    pub fn cadence(&self) -> TickCadence {
        self.cadence
    }

    /// A handle that stops [`TickScheduler::run`] before its next tick.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Call `tick` with the seconds elapsed since the loop started, once
    /// per period, until it breaks or the loop is cancelled.
    ///
    /// The next tick is armed regardless of what the callback did. Returns
    /// the number of ticks run; a host-driven cadence returns immediately.
    pub async fn run<F>(&self, mut tick: F) -> u64
    where
        F: FnMut(f64) -> ControlFlow<()>,
    {
        let TickCadence::FixedRate(period) = self.cadence else {
            debug!("Host-driven cadence, scheduler not running");
            return 0;
        };

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let start = Instant::now();
        let mut ticks = 0u64;
        info!(period_ms = period.as_secs_f64() * 1000.0, "Tick loop started");

        loop {
            interval.tick().await;
            if self.cancel.is_cancelled() {
                debug!("Tick loop cancelled");
                break;
            }
            ticks += 1;
            if tick(start.elapsed().as_secs_f64()).is_break() {
                break;
            }
        }
        info!(ticks, "Tick loop stopped");
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hz() {
        assert_eq!(
            TickCadence::from_hz(50.0),
            TickCadence::FixedRate(Duration::from_millis(20))
        );
        assert_eq!(TickCadence::from_hz(0.0), TickCadence::HostDriven);
        assert_eq!(TickCadence::from_hz(f64::NAN), TickCadence::HostDriven);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_break() {
        let scheduler = TickScheduler::new(TickCadence::from_hz(60.0));
        let mut seen = Vec::new();
        let ticks = scheduler
            .run(|now| {
                seen.push(now);
                if seen.len() == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;
        assert_eq!(ticks, 5);
        assert!(seen.windows(2).all(|w| w[1] >= w[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_loop() {
        let scheduler = TickScheduler::new(TickCadence::from_hz(100.0));
        let cancel = scheduler.cancel_handle();
        let ticks = scheduler
            .run(|_| {
                cancel.cancel();
                ControlFlow::Continue(())
            })
            .await;
        assert_eq!(ticks, 1);
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_host_driven_returns_immediately() {
        let scheduler = TickScheduler::new(TickCadence::HostDriven);
        assert_eq!(scheduler.run(|_| ControlFlow::Continue(())).await, 0);
    }
}
