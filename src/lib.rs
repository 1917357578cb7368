//! Cooperative feeding-session core for the Gobachi virtual pet.
//!
//! Multiple independent clients discover, join, and synchronize one shared
//! timed feeding activity using nothing but a generic broadcast chat feed:
//! a [`FeedingSession`] phase machine owns the timers and counters, and a
//! [`CoopCoordinator`] smuggles control messages through the feed to keep
//! peers converging. Presentation layers only consume [`SessionEvent`]s.

pub mod logging;
pub mod network;
pub mod session;
pub mod sync;

pub use network::messages::{ChatEntry, ControlMessage, DecodeError};
pub use network::transport::{ChatTransport, LoopbackHub};
pub use session::caretakers::{Caretaker, CaretakerRegistry};
pub use session::coordinator::CoopCoordinator;
pub use session::machine::FeedingSession;
pub use session::score::{compute_score, ScoreBreakdown, SessionResults};
pub use session::{Phase, SessionConfig, SessionEvent, SessionSnapshot};
pub use sync::clock::{Clock, ManualClock, SystemClock};
