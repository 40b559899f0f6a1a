//! Server-side sessions
//!
//! A session binds an opaque id to one Moodle host, the bearer token that host
//! issued, and the user profile collected at login. Sessions live only in
//! memory and expire a fixed 24 hours after creation.

mod clock;
mod store;
mod sweeper;

#[cfg(test)]
pub use clock::ManualClock;
pub use store::{session_ttl, Session, SessionStore};
pub use sweeper::spawn_sweeper;
