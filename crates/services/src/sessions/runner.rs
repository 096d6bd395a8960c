use std::sync::Arc;
use std::time::Duration;

use cognitia_core::Tick;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use super::session::QuizSession;
use super::workflow::QuizSessionService;
use crate::error::SessionError;

/// Drives a session's countdown on a fixed cadence.
///
/// Each period the runner takes the session lock, advances the timer, and
/// publishes the resulting [`Tick`] on a watch channel for display. The loop
/// ends after the first `Expired` or `Stopped` tick; expiry itself
/// auto-submits through [`QuizSessionService::tick`], and the timer latch
/// keeps that submission single-shot even if the loop were restarted.
#[derive(Clone)]
pub struct CountdownRunner {
    service: QuizSessionService,
    period: Duration,
}

impl CountdownRunner {
    #[must_use]
    pub fn new(service: QuizSessionService) -> Self {
        Self {
            service,
            period: Duration::from_secs(1),
        }
    }

    /// Override the tick cadence, mainly to speed tests up.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Tick the countdown until it expires or the session stops.
    ///
    /// The first tick happens immediately, so a resumed session whose limit
    /// already passed auto-submits without waiting a full period.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from the expiry auto-submit.
    pub async fn run(
        &self,
        session: Arc<Mutex<QuizSession>>,
        ticks: watch::Sender<Tick>,
    ) -> Result<(), SessionError> {
        let mut interval = tokio::time::interval(self.period);
        loop {
            interval.tick().await;
            let tick = {
                let mut guard = session.lock().await;
                self.service.tick(&mut guard).await?
            };
            // receivers may all be gone; keep ticking for the side effect
            let _ = ticks.send(tick);
            match tick {
                Tick::Running { .. } => {}
                Tick::Expired | Tick::Stopped => return Ok(()),
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime and hand back the
    /// tick receiver alongside the task handle.
    #[must_use]
    pub fn spawn(
        &self,
        session: Arc<Mutex<QuizSession>>,
    ) -> (watch::Receiver<Tick>, JoinHandle<Result<(), SessionError>>) {
        let (tx, rx) = watch::channel(Tick::Running {
            remaining_seconds: 0,
        });
        let runner = self.clone();
        let handle = tokio::spawn(async move { runner.run(session, tx).await });
        (rx, handle)
    }
}
