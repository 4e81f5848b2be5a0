// Kindling: a chat log with a live hot-topics summary.
//
// This is the library root. Each module corresponds to a subsystem; the
// `topics::aggregator` module holds the windowed topic ranking that the rest
// of the crate feeds and renders.

pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod output;
pub mod push;
pub mod status;
pub mod topics;
