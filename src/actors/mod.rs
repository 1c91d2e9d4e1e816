//! Actor-based fleet monitoring
//!
//! The fleet monitor runs as an independent async task controlled through a
//! cloneable handle over a Tokio mpsc channel.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌─────────────────┐
//!                 │   Hub (main)    │
//!                 └────────┬────────┘
//!                          │ spawns
//!                 ┌────────▼────────┐       probe (concurrent)
//!                 │  FleetMonitor   │──────────────────────────▶ target 1..N
//!                 └────────┬────────┘
//!                          │ publish (one per round)
//!                 ┌────────▼────────┐
//!                 │   StatusStore   │◀──── read ──── API handlers
//!                 └─────────────────┘
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the monitor has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels carry round summaries back to callers
//! 3. **Shared store**: results flow to readers through the status store, not through messages

pub mod fleet;
pub mod messages;
