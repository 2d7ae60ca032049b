//! QuizLive API - Backend for live multiplayer quiz sessions
//!
//! The core of this crate is the live session coordinator:
//! - [`registry`] — the process-wide table of active sessions, join-code
//!   issuance and the lifecycle state machine
//! - [`live`] — the WebSocket protocol and per-session broadcast rooms
//! - [`auth`] — resolution of session/guest tokens into principals
//! - [`stores`] — the external collaborators (templates, durable sessions,
//!   tokens, users) behind trait seams

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod live;
pub mod registry;
pub mod routes;
pub mod state;
pub mod stores;
pub mod template;
