use crate::session::caretakers::{Caretaker, CaretakerRegistry};
use crate::session::score::{compute_score, SessionResults};
use crate::session::{Phase, SessionConfig, SessionEvent, SessionSnapshot};
use crate::sync::clock::{secs_until, Clock, SystemClock};
use crate::sync::timer::TickTimer;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

// ── FeedingSession ──────────────────────────────────────────────────────────

/// One instance of the timed cooperative feeding activity.
///
/// The session is a phase machine cycling `Idle → Joining → Active →
/// Results → Idle`. Every operation is gated on the current phase and
/// returns `false` (no state change) when called in the wrong one; control
/// messages may legitimately arrive late, so wrong-phase calls are expected
/// traffic, not errors.
///
/// All mutation happens synchronously under one lock; events are emitted in
/// call order while the transition is still in progress. Countdown timers
/// are spawned tasks whose handles live inside the state and are cancelled
/// on every phase exit that makes them stale.
pub struct FeedingSession {
    shared: Arc<Shared>,
}

struct Shared {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    state: Mutex<State>,
}

struct State {
    phase: Phase,
    key: String,
    host: Option<Caretaker>,
    caretakers: CaretakerRegistry,
    hits: u32,
    finished: u32,
    join_ends_at: u64,
    results_ends_at: u64,
    join_timer: Option<TickTimer>,
    results_timer: Option<TickTimer>,
}

impl FeedingSession {
    /// Create an idle session driven by the system clock.
    ///
    /// The caller receives `SessionEvent`s on the returned receiver.
    pub fn new(config: SessionConfig) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create an idle session with an injected clock (used by tests).
    pub fn with_clock(
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            config,
            clock,
            event_tx,
            state: Mutex::new(State {
                phase: Phase::Idle,
                key: String::new(),
                host: None,
                caretakers: CaretakerRegistry::new(),
                hits: 0,
                finished: 0,
                join_ends_at: 0,
                results_ends_at: 0,
                join_timer: None,
                results_timer: None,
            }),
        });
        (Self { shared }, event_rx)
    }

    // ── Joining ─────────────────────────────────────────────────────────

    /// Host-side: announce a fresh session and open the join window.
    ///
    /// Only succeeds from `Idle`: a caller with a live session must `end()`
    /// it first. Generates the session key and the absolute join deadline.
    pub fn start_joining(&self, host_id: &str, host_emoji: &str) -> bool {
        let key = uuid::Uuid::new_v4().simple().to_string();
        let deadline = self.shared.clock.now_ms() + self.shared.config.join_window.as_millis() as u64;
        self.begin_joining(key, host_id, host_emoji, deadline)
    }

    /// Guest-side: instantiate the session announced by a `start` broadcast.
    ///
    /// Structurally identical to hosting, except the deadline comes off the
    /// wire instead of the local clock, so this peer counts down correctly even
    /// if the broadcast was delayed.
    pub fn adopt(&self, key: &str, host_id: &str, host_emoji: &str, join_ends_at: u64) -> bool {
        self.begin_joining(key.to_string(), host_id, host_emoji, join_ends_at)
    }

    fn begin_joining(&self, key: String, host_id: &str, host_emoji: &str, join_ends_at: u64) -> bool {
        let mut st = self.shared.state.lock();
        if st.phase != Phase::Idle {
            log::debug!("start_joining ignored: session {} is {:?}", st.key, st.phase);
            return false;
        }

        st.key = key;
        st.host = Some(Caretaker {
            id: host_id.to_string(),
            emoji: host_emoji.to_string(),
        });
        st.caretakers.clear();
        st.caretakers.add(host_id, host_emoji);
        st.hits = 0;
        st.finished = 0;
        st.join_ends_at = join_ends_at;
        st.results_ends_at = 0;
        st.phase = Phase::Joining;
        st.join_timer = Some(Self::spawn_join_timer(&self.shared));

        log::info!("session {} joining, hosted by {host_id}", st.key);
        self.shared.emit_phase(&st);
        true
    }

    /// Add a caretaker. Only valid while the join window is open; a rejoin
    /// with a different emoji updates the display emoji, count unchanged.
    pub fn join(&self, id: &str, emoji: &str) -> bool {
        let mut st = self.shared.state.lock();
        if st.phase != Phase::Joining {
            return false;
        }

        if st.caretakers.add(id, emoji) {
            log::info!("caretaker {id} joined session {}", st.key);
            let _ = self.shared.event_tx.send(SessionEvent::CaretakerJoined {
                id: id.to_string(),
                emoji: emoji.to_string(),
            });
        }
        true
    }

    /// Close the join window early and go live. `by` is the acting
    /// participant; whether only the host may do this is caller policy.
    pub fn force_start(&self, by: &str) -> bool {
        let mut st = self.shared.state.lock();
        if st.phase != Phase::Joining {
            return false;
        }

        let _stale = st.join_timer.take();
        st.phase = Phase::Active;

        log::info!("session {} started by {by}", st.key);
        self.shared.emit_phase(&st);
        true
    }

    // ── Active ──────────────────────────────────────────────────────────

    /// Record the outcome of one local food drop. No-op outside `Active`.
    ///
    /// The machine never self-transitions on completion: the driving actor
    /// checks `is_complete()` and calls `start_results()` once the
    /// completion visuals have played out.
    pub fn register_drop(&self, success: bool) -> bool {
        let mut st = self.shared.state.lock();
        if st.phase != Phase::Active {
            return false;
        }

        st.finished += 1;
        if success {
            st.hits += 1;
        }
        true
    }

    /// Surface a remote peer's drop for rendering. Visual only.
    pub fn note_remote_drop(&self, x: f32, y: f32, emoji: &str) -> bool {
        let st = self.shared.state.lock();
        if st.phase != Phase::Active {
            return false;
        }

        let _ = self.shared.event_tx.send(SessionEvent::DropSeen {
            x,
            y,
            emoji: emoji.to_string(),
        });
        true
    }

    /// Whether the configured drop target has been reached.
    pub fn is_complete(&self) -> bool {
        let st = self.shared.state.lock();
        st.finished >= self.shared.config.total_drops
    }

    // ── Results ─────────────────────────────────────────────────────────

    /// Enter the results phase and start its auto-reset countdown.
    pub fn start_results(&self) -> bool {
        let mut st = self.shared.state.lock();
        if st.phase != Phase::Active {
            return false;
        }

        st.results_ends_at =
            self.shared.clock.now_ms() + self.shared.config.results_window.as_millis() as u64;
        st.phase = Phase::Results;
        st.results_timer = Some(Self::spawn_results_timer(&self.shared));

        log::info!("session {} showing results", st.key);
        self.shared.emit_phase(&st);
        true
    }

    /// Compute the current results. Callable in any phase; repeated calls
    /// are idempotent.
    pub fn results(&self) -> SessionResults {
        let st = self.shared.state.lock();
        let cfg = &self.shared.config;
        let score = compute_score(
            st.hits,
            cfg.total_drops,
            st.caretakers.count(),
            cfg.per_player_bonus,
            cfg.bonus_cap,
        );
        SessionResults {
            players: score.players,
            base_percent: score.base_percent,
            coop_bonus: score.coop_bonus,
            final_percent: score.final_percent,
            hits: st.hits,
            misses: cfg.total_drops.saturating_sub(st.hits),
            drops: cfg.total_drops,
            caretakers: st.caretakers.all(),
            host: st.host.clone(),
        }
    }

    // ── Teardown ────────────────────────────────────────────────────────

    /// Return to `Idle`: cancel all timers, zero the deadlines.
    ///
    /// The only hard cancellation point: safe from any phase, defensive
    /// no-op when already idle.
    pub fn end(&self) {
        let mut st = self.shared.state.lock();
        if st.phase == Phase::Idle {
            return;
        }
        log::info!("session {} ended", st.key);
        Shared::end_locked(&self.shared, &mut st);
    }

    /// Immutable view of the session. Never mutates state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.snapshot_of(&self.shared.state.lock())
    }

    // ── Timers ──────────────────────────────────────────────────────────

    fn spawn_join_timer(shared: &Arc<Shared>) -> TickTimer {
        let shared = shared.clone();
        TickTimer::spawn(shared.config.tick_interval, move || {
            let shared = shared.clone();
            async move { Shared::join_tick(&shared) }
        })
    }

    fn spawn_results_timer(shared: &Arc<Shared>) -> TickTimer {
        let shared = shared.clone();
        TickTimer::spawn(shared.config.tick_interval, move || {
            let shared = shared.clone();
            async move { Shared::results_tick(&shared) }
        })
    }
}

impl Drop for FeedingSession {
    fn drop(&mut self) {
        // Backstop: a dropped session must not leave timer tasks running.
        let mut st = self.shared.state.lock();
        st.join_timer.take();
        st.results_timer.take();
    }
}

// ── Shared internals ────────────────────────────────────────────────────────

impl Shared {
    /// One join-window tick: emit the countdown, auto-advance to `Active`
    /// when the deadline elapses. Returns `false` to stop the timer.
    fn join_tick(shared: &Arc<Shared>) -> bool {
        let mut st = shared.state.lock();
        if st.phase != Phase::Joining {
            // Stale tick after a phase exit; the timer dies quietly.
            return false;
        }

        let now = shared.clock.now_ms();
        if now >= st.join_ends_at {
            let _self_timer = st.join_timer.take();
            st.phase = Phase::Active;
            log::info!("session {} join window elapsed, going active", st.key);
            shared.emit_phase(&st);
            return false;
        }

        let _ = shared.event_tx.send(SessionEvent::JoinTick {
            seconds_left: secs_until(now, st.join_ends_at),
            snapshot: shared.snapshot_of(&st),
        });
        true
    }

    /// One results-window tick: emit the countdown, auto-end when the
    /// deadline elapses.
    fn results_tick(shared: &Arc<Shared>) -> bool {
        let mut st = shared.state.lock();
        if st.phase != Phase::Results {
            return false;
        }

        let now = shared.clock.now_ms();
        if now >= st.results_ends_at {
            log::info!("session {} results window elapsed", st.key);
            Self::end_locked(shared, &mut st);
            return false;
        }

        let _ = shared.event_tx.send(SessionEvent::ResultsTick {
            seconds_left: secs_until(now, st.results_ends_at),
            snapshot: shared.snapshot_of(&st),
        });
        true
    }

    /// Shared teardown for `end()` and the results auto-reset.
    fn end_locked(shared: &Arc<Shared>, st: &mut State) {
        st.join_timer.take();
        st.results_timer.take();
        st.join_ends_at = 0;
        st.results_ends_at = 0;
        st.phase = Phase::Idle;
        shared.emit_phase(st);
    }

    fn emit_phase(&self, st: &State) {
        let _ = self.event_tx.send(SessionEvent::PhaseChanged {
            phase: st.phase,
            snapshot: self.snapshot_of(st),
        });
    }

    fn snapshot_of(&self, st: &State) -> SessionSnapshot {
        SessionSnapshot {
            key: st.key.clone(),
            phase: st.phase,
            host: st.host.clone(),
            caretakers: st.caretakers.all(),
            total_drops: self.config.total_drops,
            hits: st.hits,
            finished: st.finished,
            join_ends_at: st.join_ends_at,
            results_ends_at: st.results_ends_at,
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
