//! # Feedsync Testkit
//!
//! Shared fakes and generators for feedsync integration tests:
//!
//! - [`ScriptedConnector`]: a duplex connector that replays refusals and
//!   test-driven sessions, recording when each attempt happened
//! - [`ScriptedHistory`]: a history source answering from a queue, with an
//!   optional gate to hold requests in flight
//! - [`RecordingSink`]: a view sink with a simulated viewport
//! - [`fixtures`] and [`strategies`] for inputs

#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod connector;
pub mod fixtures;
pub mod history;
pub mod sink;
pub mod strategies;

pub use connector::{ScriptedConnector, SessionController};
pub use history::ScriptedHistory;
pub use sink::{RecordingSink, SinkCall};

use std::time::Duration;

/// Let spawned tasks run until they block; time is paused in tests, so the
/// sleep resolves as soon as everything else is idle
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Install a test subscriber honoring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .finish(),
    );
}
