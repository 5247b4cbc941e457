//! Run simulation
//!
//! All gameplay logic lives here. The step is deterministic given the same
//! inputs, deltas and collaborator behavior:
//! - Variable timestep, capped per frame
//! - Fixed evaluation order inside a tick
//! - No rendering or platform dependencies

pub mod collision;
pub mod geometry;
pub mod session;
pub mod state;
pub mod tick;
pub mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use collision::{NearMissTracker, first_overlap, landing_height, resolve_floor, resolve_line_landing};
pub use geometry::{Polyline, Rect, segment_height_at};
pub use session::Session;
pub use state::{PlayerState, SessionPhase, SessionState};
pub use tick::TickInput;
pub use timers::{BoostTimer, Countdown, DutyCycle, RestPhase, RestTransition};
