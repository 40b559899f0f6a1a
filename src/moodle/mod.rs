//! Moodle integration
//!
//! Speaks the Moodle REST web-service protocol against any instance URL:
//! `login/token.php` for credentials and `webservice/rest/server.php` for
//! named functions.

mod client;
mod error;
pub mod models;
pub mod urls;

pub use client::MoodleConnector;
