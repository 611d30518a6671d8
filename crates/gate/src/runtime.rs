//! Event-loop group lifecycle.
//!
//! Two dedicated runtimes back the listener: a single-threaded accept group
//! and a multi-threaded I/O group. Other subsystems only ever receive
//! [`tokio::runtime::Handle`] clones of the I/O group. A handle can
//! schedule work but cannot shut its runtime down, so shutdown stays
//! centralized here.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

const SHUTDOWN_WAIT: Duration = Duration::from_secs(10);

/// The accept and I/O worker groups.
pub struct EventLoopGroups {
    accept: Option<Runtime>,
    io: Option<Runtime>,
}

impl EventLoopGroups {
    pub fn new() -> Self {
        Self {
            accept: None,
            io: None,
        }
    }

    /// Create both groups. Starting twice is a usage error.
    pub fn start(&mut self) -> Result<()> {
        if self.accept.is_some() || self.io.is_some() {
            return Err(Error::config("event loop groups already started"));
        }
        self.accept = Some(
            Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("gate-accept")
                .enable_all()
                .build()?,
        );
        self.io = Some(
            Builder::new_multi_thread()
                .thread_name("gate-io")
                .enable_all()
                .build()?,
        );
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.accept.is_some() && self.io.is_some()
    }

    /// Handle of the accept group.
    pub fn accept_handle(&self) -> Result<Handle> {
        self.accept
            .as_ref()
            .map(|rt| rt.handle().clone())
            .ok_or_else(|| Error::config("event loop groups not started"))
    }

    /// Handle of the I/O group, safe to hand to other subsystems.
    pub fn io_handle(&self) -> Result<Handle> {
        self.io
            .as_ref()
            .map(|rt| rt.handle().clone())
            .ok_or_else(|| Error::config("event loop groups not started"))
    }

    /// Shut the accept group down first, then the I/O group, waiting for
    /// both to terminate. Safe to call repeatedly; never fails.
    pub fn shutdown(&mut self) {
        if let Some(accept) = self.accept.take() {
            accept.shutdown_timeout(SHUTDOWN_WAIT);
            info!("Accept group terminated");
        }
        if let Some(io) = self.io.take() {
            io.shutdown_timeout(SHUTDOWN_WAIT);
            info!("I/O group terminated");
        }
    }
}

impl Default for EventLoopGroups {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventLoopGroups {
    fn drop(&mut self) {
        self.shutdown();
    }
}
