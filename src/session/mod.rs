pub mod caretakers;
pub mod coordinator;
pub mod machine;
pub mod score;

use crate::session::caretakers::Caretaker;
use serde::Serialize;
use tokio::time::Duration;

// ── Defaults ────────────────────────────────────────────────────────────────

/// Default length of the join window after a session is announced.
pub const JOIN_WINDOW: Duration = Duration::from_secs(15);

/// Default length of the results screen before the session auto-resets.
pub const RESULTS_WINDOW: Duration = Duration::from_secs(8);

/// Cadence of the join/results countdown ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Default number of food drops per session.
pub const TOTAL_DROPS: u32 = 50;

/// Default coop bonus per caretaker, in percentage points.
pub const PER_PLAYER_BONUS: u32 = 5;

/// Default cap on the total coop bonus, in percentage points.
pub const BONUS_CAP: u32 = 15;

// ── Phase ───────────────────────────────────────────────────────────────────

/// Lifecycle phase of a feeding session.
///
/// Transitions are strictly `Idle → Joining → Active → Results → Idle`;
/// every operation on the session is gated on the current phase and calls
/// made in the wrong phase are no-ops, because control messages may
/// legitimately arrive late relative to the local phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Joining,
    Active,
    Results,
}

// ── Configuration ───────────────────────────────────────────────────────────

/// Constructor-injected session parameters.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub total_drops: u32,
    pub per_player_bonus: u32,
    pub bonus_cap: u32,
    pub join_window: Duration,
    pub results_window: Duration,
    pub tick_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_drops: TOTAL_DROPS,
            per_player_bonus: PER_PLAYER_BONUS,
            bonus_cap: BONUS_CAP,
            join_window: JOIN_WINDOW,
            results_window: RESULTS_WINDOW,
            tick_interval: TICK_INTERVAL,
        }
    }
}

// ── Snapshot ────────────────────────────────────────────────────────────────

/// Immutable view of a session's state for presentation consumers.
///
/// Deadlines are absolute epoch ms, 0 when not applicable; caretakers are
/// sorted by id. Taking a snapshot never mutates the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub key: String,
    pub phase: Phase,
    pub host: Option<Caretaker>,
    pub caretakers: Vec<Caretaker>,
    pub total_drops: u32,
    pub hits: u32,
    pub finished: u32,
    pub join_ends_at: u64,
    pub results_ends_at: u64,
}

// ── Session events ──────────────────────────────────────────────────────────

/// Events emitted by the session core to the presentation layer.
///
/// Emission is synchronous within the triggering state transition and in
/// call order; the presentation layer only ever consumes these, it never
/// mutates the session directly.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session entered a new phase.
    PhaseChanged {
        phase: Phase,
        snapshot: SessionSnapshot,
    },
    /// Join-window countdown tick.
    JoinTick {
        seconds_left: u64,
        snapshot: SessionSnapshot,
    },
    /// Results-window countdown tick.
    ResultsTick {
        seconds_left: u64,
        snapshot: SessionSnapshot,
    },
    /// A caretaker was added to the registry for the first time.
    CaretakerJoined { id: String, emoji: String },
    /// A remote peer dropped food. Visual only, never affects scoring.
    DropSeen { x: f32, y: f32, emoji: String },
}
