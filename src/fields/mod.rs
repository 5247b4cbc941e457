//! Reference collaborators
//!
//! Seeded, self-contained implementations of the field traits. The demo
//! binary plays on them; a real host would swap in its own renderer-aware
//! versions.

mod coins;
mod lines;
mod obstacles;

pub use coins::{Coin, CoinConfig, CoinLane};
pub use lines::{InkCanvas, InkConfig};
pub use obstacles::{LaneConfig, ObstacleLane};
