use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error};

/// Default tick period of the room countdown
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// One firing of the periodic tick source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Source that produced this tick; see `TimerEngine::accepts`
    pub generation: u64,
}

/// Restartable periodic tick source.
///
/// Ticks are not applied here: they are sent into the session channel so
/// they interleave with inbound messages on one consumer. Every `start`
/// opens a new generation and every `stop` closes the current one, so a
/// tick still queued from an older source is recognisably stale.
///
/// The engine only holds a weak sender, so a running tick source never
/// keeps the session channel open on its own.
pub struct TimerEngine<E> {
    events: mpsc::WeakSender<E>,
    period: Duration,
    generation: u64,
    source: Option<JoinHandle<()>>,
}

impl<E> TimerEngine<E>
where
    E: From<Tick> + Send + 'static,
{
    pub fn new(events: &mpsc::Sender<E>, period: Duration) -> Self {
        Self {
            events: events.downgrade(),
            period,
            generation: 0,
            source: None,
        }
    }

    /// Start a fresh tick source, replacing any running one.
    /// The first tick fires immediately.
    pub fn start(&mut self) {
        self.stop();
        if self.period.is_zero() {
            error!("Tick period must be non-zero, timers not started");
            return;
        }
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let events = self.events.clone();

        self.source = Some(tokio::spawn(async move {
            let mut ticker = interval(period);

            // Skip missed ticks instead of bursting after a stall
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(sender) = events.upgrade() else {
                    break;
                };
                if sender.send(E::from(Tick { generation })).await.is_err() {
                    break;
                }
            }
        }));

        debug!(generation, period_ms = self.period.as_millis() as u64, "Timer engine started");
    }

    /// Cancel the running tick source, if any
    pub fn stop(&mut self) {
        if let Some(source) = self.source.take() {
            source.abort();
            self.generation += 1;
            debug!(generation = self.generation, "Timer engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.source.is_some()
    }

    /// Whether a received tick comes from the live source
    pub fn accepts(&self, tick: Tick) -> bool {
        self.source.is_some() && tick.generation == self.generation
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl<E> Drop for TimerEngine<E> {
    fn drop(&mut self) {
        if let Some(source) = self.source.take() {
            source.abort();
        }
    }
}
