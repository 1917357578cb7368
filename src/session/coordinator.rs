use crate::network::messages::{ChatEntry, ControlMessage, DecodeError};
use crate::network::transport::ChatTransport;
use crate::session::machine::FeedingSession;
use crate::session::score::SessionResults;
use crate::session::{Phase, SessionConfig, SessionEvent, SessionSnapshot};
use std::sync::Arc;
use tokio::sync::mpsc;

// ── CoopCoordinator ─────────────────────────────────────────────────────────

/// Glue between one local [`FeedingSession`] and the broadcast feed.
///
/// Local verbs run the state machine first and broadcast the matching
/// control message only when the machine accepts them; inbound feed entries
/// are decoded at the boundary and routed into the session by key. The feed
/// itself has no session concept, so the key comparison here is the entire
/// session-scoping mechanism.
///
/// One coordinator drives one session instance, reused across cycles. A
/// peer that only joins still gets a full, symmetric session seeded from
/// the host's broadcast parameters.
pub struct CoopCoordinator {
    local_id: String,
    local_emoji: String,
    transport: Arc<dyn ChatTransport>,
    session: FeedingSession,
}

impl CoopCoordinator {
    /// Create a coordinator for the participant `local_id`/`local_emoji`.
    ///
    /// Session events arrive on the returned receiver. Inbound feed entries
    /// must be handed to [`handle_inbound`](Self::handle_inbound) by the
    /// embedding application.
    pub fn new(
        local_id: impl Into<String>,
        local_emoji: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (session, event_rx) = FeedingSession::new(config);
        (
            Self {
                local_id: local_id.into(),
                local_emoji: local_emoji.into(),
                transport,
                session,
            },
            event_rx,
        )
    }

    // ── Local verbs ─────────────────────────────────────────────────────

    /// Host a new session: open the join window and announce it.
    pub fn host_start(&self) -> bool {
        if !self.session.start_joining(&self.local_id, &self.local_emoji) {
            return false;
        }
        let snap = self.session.snapshot();
        self.say(ControlMessage::Start {
            key: snap.key,
            join_ends_at: snap.join_ends_at,
            host_emoji: self.local_emoji.clone(),
        });
        true
    }

    /// Join the currently tracked session and announce the join.
    pub fn join_session(&self) -> bool {
        if !self.session.join(&self.local_id, &self.local_emoji) {
            return false;
        }
        self.say(ControlMessage::Join {
            key: self.session.snapshot().key,
        });
        true
    }

    /// End the join window early and announce the start.
    ///
    /// The machine accepts any actor; whether only the host may do this is
    /// policy for the embedding application, which should simply not call
    /// this on non-host peers.
    pub fn force_start(&self) -> bool {
        if !self.session.force_start(&self.local_id) {
            return false;
        }
        self.say(ControlMessage::Begin {
            key: self.session.snapshot().key,
        });
        true
    }

    /// Broadcast the visual for a locally spawned food piece.
    ///
    /// Fired at spawn time by the presentation layer; scoring happens later
    /// through [`register_drop`](Self::register_drop) when the piece lands.
    pub fn announce_drop(&self, x: f32, y: f32) -> bool {
        let snap = self.session.snapshot();
        if snap.phase != Phase::Active {
            return false;
        }
        self.say(ControlMessage::Drop {
            key: snap.key,
            x,
            y,
            emoji: self.local_emoji.clone(),
        });
        true
    }

    /// Record the outcome of a local drop.
    pub fn register_drop(&self, success: bool) -> bool {
        self.session.register_drop(success)
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    pub fn start_results(&self) -> bool {
        self.session.start_results()
    }

    pub fn results(&self) -> SessionResults {
        self.session.results()
    }

    pub fn end(&self) {
        self.session.end()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    // ── Inbound routing ─────────────────────────────────────────────────

    /// Route one feed entry into the local session.
    ///
    /// Everything that is not addressed to this peer's tracked session is
    /// dropped here: own echoes, regular chat, malformed control text, and
    /// key mismatches. Late or duplicate messages fall through to the
    /// machine's phase gates and die there as no-ops.
    pub fn handle_inbound(&self, entry: &ChatEntry) {
        // The feed echoes our own broadcasts back; skip them.
        if entry.from == self.local_id {
            return;
        }

        let msg = match ControlMessage::decode(&entry.text) {
            Ok(msg) => msg,
            Err(DecodeError::UnrecognizedKind) => return, // regular chat
            Err(e) => {
                log::debug!("discarding malformed control message from {}: {e}", entry.from);
                return;
            }
        };

        match msg {
            ControlMessage::Start {
                key,
                join_ends_at,
                host_emoji,
            } => {
                // The envelope sender is the host. adopt() refuses while a
                // session is live, which is the re-entrancy guard.
                if !self.session.adopt(&key, &entry.from, &host_emoji, join_ends_at) {
                    log::debug!("start for {key} ignored: a session is live");
                }
            }
            ControlMessage::Join { key } => {
                if self.tracks(&key) {
                    // Idempotent: replays of a known joiner change nothing.
                    self.session.join(&entry.from, &entry.emoji);
                }
            }
            ControlMessage::Begin { key } => {
                if self.tracks(&key) {
                    // Honored only while still joining; the machine's phase
                    // gate swallows duplicates and post-end deliveries.
                    self.session.force_start(&entry.from);
                }
            }
            ControlMessage::Drop { key, x, y, emoji } => {
                if self.tracks(&key) {
                    self.session.note_remote_drop(x, y, &emoji);
                }
            }
        }
    }

    /// Whether `key` addresses the live local session.
    fn tracks(&self, key: &str) -> bool {
        let snap = self.session.snapshot();
        snap.phase != Phase::Idle && snap.key == key
    }

    fn say(&self, msg: ControlMessage) {
        self.transport.broadcast(ChatEntry::new(
            self.local_id.clone(),
            self.local_emoji.clone(),
            msg.encode(),
        ));
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
