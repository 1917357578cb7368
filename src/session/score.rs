use crate::session::caretakers::Caretaker;
use serde::Serialize;

// ── Score aggregation ───────────────────────────────────────────────────────

/// The percentage components of a feeding session's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    /// Effective player count, never below 1 (a host feeding alone is one).
    pub players: u32,
    /// Completion percentage: round(hits / total_drops * 100), 0 when the
    /// target is zero.
    pub base_percent: u32,
    /// Cooperative bonus: min(players * per_player_bonus, bonus_cap).
    pub coop_bonus: u32,
    /// base_percent + coop_bonus.
    pub final_percent: u32,
}

/// Pure scoring function. Deterministic, no side effects, safe to call
/// repeatedly while a session is still running.
pub fn compute_score(
    hits: u32,
    total_drops: u32,
    player_count: u32,
    per_player_bonus: u32,
    bonus_cap: u32,
) -> ScoreBreakdown {
    let base_percent = if total_drops > 0 {
        ((hits as f64 / total_drops as f64) * 100.0).round() as u32
    } else {
        0
    };

    let players = player_count.max(1);
    let coop_bonus = (players * per_player_bonus).min(bonus_cap);

    ScoreBreakdown {
        players,
        base_percent,
        coop_bonus,
        final_percent: base_percent + coop_bonus,
    }
}

// ── Session results ─────────────────────────────────────────────────────────

/// Everything the results screen needs, in one immutable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResults {
    pub players: u32,
    pub base_percent: u32,
    pub coop_bonus: u32,
    pub final_percent: u32,
    pub hits: u32,
    pub misses: u32,
    pub drops: u32,
    pub caretakers: Vec<Caretaker>,
    pub host: Option<Caretaker>,
}

// ── Tests ───────────────────────────────────────────────────────────────────
