//! Cancellable per-question countdowns.
//!
//! Every countdown is stamped with a [`TimerToken`]. Starting a new countdown
//! or stopping the current one retires the old token, so an expiry that was
//! already in flight when the player answered is recognised as stale and
//! dropped by the session controller.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Deadline used when `now + duration` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Identifies one armed countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken {
    /// Session the countdown was armed for.
    pub session_id: Uuid,
    /// Monotonic counter, bumped on every `start`.
    pub generation: u64,
}

/// Notification produced by a running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { token: TimerToken, remaining: Duration },
    Expired { token: TimerToken },
}

impl TimerEvent {
    pub fn token(&self) -> TimerToken {
        match self {
            TimerEvent::Tick { token, .. } | TimerEvent::Expired { token } => *token,
        }
    }
}

/// A countdown the session controller can arm and disarm.
pub trait Countdown: Send {
    /// Arm a countdown of `duration`. Any running countdown is stopped first.
    fn start(&mut self, duration: Duration, session_id: Uuid) -> TimerToken;

    /// Disarm the running countdown. No-op when nothing is running.
    fn stop(&mut self);

    /// Whether a countdown is armed.
    fn is_active(&self) -> bool;

    /// Whether `token` belongs to the armed countdown.
    fn is_current(&self, token: TimerToken) -> bool;

    /// Time left on the armed countdown.
    fn remaining(&self) -> Option<Duration>;

    /// Accept an expiry for `token`. Returns `true` only for the armed
    /// countdown, which is disarmed so it can never be accepted twice.
    fn acknowledge_expiry(&mut self, token: TimerToken) -> bool {
        if self.is_current(token) {
            self.stop();
            true
        } else {
            false
        }
    }
}

struct Armed {
    token: TimerToken,
    deadline: Instant,
    task: JoinHandle<()>,
}

/// Countdown backed by a tokio task per armed deadline.
///
/// Events are delivered on an unbounded channel; the owner feeds them back
/// into the session controller from its event loop.
pub struct TokioCountdown {
    events: mpsc::UnboundedSender<TimerEvent>,
    tick_interval: Option<Duration>,
    generation: u64,
    armed: Option<Armed>,
}

impl TokioCountdown {
    pub fn new(events: mpsc::UnboundedSender<TimerEvent>, tick_interval: Option<Duration>) -> Self {
        Self {
            events,
            tick_interval: tick_interval.filter(|d| !d.is_zero()),
            generation: 0,
            armed: None,
        }
    }

    /// Create a countdown together with the receiving end of its events.
    pub fn channel(tick_interval: Option<Duration>) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx, tick_interval), rx)
    }
}

impl Countdown for TokioCountdown {
    fn start(&mut self, duration: Duration, session_id: Uuid) -> TimerToken {
        self.stop();
        self.generation += 1;
        let token = TimerToken {
            session_id,
            generation: self.generation,
        };
        let now = Instant::now();
        let deadline = now
            .checked_add(duration)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let task = tokio::spawn(run_countdown(
            self.events.clone(),
            token,
            deadline,
            self.tick_interval,
        ));
        tracing::trace!(generation = token.generation, ?duration, "countdown armed");
        self.armed = Some(Armed {
            token,
            deadline,
            task,
        });
        token
    }

    fn stop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.task.abort();
            tracing::trace!(generation = armed.token.generation, "countdown stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.armed.is_some()
    }

    fn is_current(&self, token: TimerToken) -> bool {
        self.armed.as_ref().is_some_and(|a| a.token == token)
    }

    fn remaining(&self) -> Option<Duration> {
        self.armed
            .as_ref()
            .map(|a| a.deadline.saturating_duration_since(Instant::now()))
    }
}

impl Drop for TokioCountdown {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_countdown(
    events: mpsc::UnboundedSender<TimerEvent>,
    token: TimerToken,
    deadline: Instant,
    tick_interval: Option<Duration>,
) {
    let sleep = tokio::time::sleep_until(deadline);
    tokio::pin!(sleep);

    if let Some(period) = tick_interval {
        let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = &mut sleep => break,
                at = ticks.tick() => {
                    let remaining = deadline.saturating_duration_since(at);
                    if events.send(TimerEvent::Tick { token, remaining }).is_err() {
                        return;
                    }
                }
            }
        }
    } else {
        sleep.await;
    }

    let _ = events.send(TimerEvent::Expired { token });
}

/// Countdown driven by hand, for embedders that own their clock and for
/// deterministic tests.
#[derive(Debug, Default)]
pub struct ManualCountdown {
    generation: u64,
    armed: Option<(TimerToken, Duration)>,
    history: Vec<(TimerToken, Duration)>,
}

impl ManualCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the armed countdown.
    pub fn current_token(&self) -> Option<TimerToken> {
        self.armed.map(|(token, _)| token)
    }

    /// Every countdown that was armed, oldest first.
    pub fn history(&self) -> &[(TimerToken, Duration)] {
        &self.history
    }

    /// Move time forward. Yields a tick while time remains and an expiry
    /// once it runs out; the expiry still has to be acknowledged.
    pub fn advance(&mut self, by: Duration) -> Option<TimerEvent> {
        let (token, remaining) = self.armed.as_mut()?;
        *remaining = remaining.saturating_sub(by);
        if remaining.is_zero() {
            Some(TimerEvent::Expired { token: *token })
        } else {
            Some(TimerEvent::Tick {
                token: *token,
                remaining: *remaining,
            })
        }
    }

    /// Run the armed countdown straight to zero.
    pub fn expire_now(&mut self) -> Option<TimerEvent> {
        self.advance(Duration::MAX)
    }
}

impl Countdown for ManualCountdown {
    fn start(&mut self, duration: Duration, session_id: Uuid) -> TimerToken {
        self.stop();
        self.generation += 1;
        let token = TimerToken {
            session_id,
            generation: self.generation,
        };
        self.armed = Some((token, duration));
        self.history.push((token, duration));
        token
    }

    fn stop(&mut self) {
        self.armed = None;
    }

    fn is_active(&self) -> bool {
        self.armed.is_some()
    }

    fn is_current(&self, token: TimerToken) -> bool {
        self.current_token() == Some(token)
    }

    fn remaining(&self) -> Option<Duration> {
        self.armed.map(|(_, remaining)| remaining)
    }
}
