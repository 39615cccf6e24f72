//! WebSocket relay for the tickrelay server.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) streaming poll results of the shared
//!   stream log to each connected viewer, with ping/pong keepalives
//! - **Viewer pages** (`/`, `/data`) rendered with `minijinja`
//! - **Demonstration traffic** (`/fire`, `/load`) appending entries to the log
//!
//! # Architecture
//!
//! Each upgraded connection runs one session made of two pumps. The
//! writer polls the log on a fixed period and sends what it claimed; the
//! reader watches for keepalive responses and disconnects. The first pump
//! to stop closes a shared [`CloseGate`], which stops the other.
//!
//! The log is consumed destructively and shared by every session, so
//! concurrent viewers each see a disjoint part of the update stream.

pub mod error;
pub mod gate;
pub mod handlers;
pub mod pages;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::RelayError;
pub use gate::CloseGate;
pub use router::build_router;
pub use server::{start_server, ServerError};
pub use session::{handle_session, run_reader, run_writer, PumpExit, SessionOutcome};
pub use state::AppState;
