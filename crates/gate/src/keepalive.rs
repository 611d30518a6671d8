//! Reusable per-connection keep-alive scheduler.
//!
//! Attaching spawns a repeating task that sends a keep-alive packet with a
//! fresh random identifier every interval while the connection stays
//! active. Detaching aborts the task without waiting for an in-flight
//! tick.

use crate::conduit::SharedWriter;
use bytes::BytesMut;
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

const KEEP_ALIVE: i32 = 0x1f;

/// Interval of the reference implementation.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Handle to one connection's keep-alive schedule.
pub struct KeepAlive {
    handle: Option<JoinHandle<()>>,
}

impl KeepAlive {
    /// Attach with the default interval.
    pub fn attach(writer: SharedWriter) -> Self {
        Self::attach_with_interval(writer, DEFAULT_INTERVAL)
    }

    /// Attach with a custom interval; the first packet goes out one full
    /// interval after attaching.
    pub fn attach_with_interval(writer: SharedWriter, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !writer.is_active() {
                    debug!("Cancel keep alive schedule for inactive connection");
                    break;
                }
                let id: i32 = rand::thread_rng().gen();
                let mut packet = BytesMut::new();
                wire::write_varint(&mut packet, KEEP_ALIVE);
                wire::write_varint(&mut packet, id);
                if writer.write_packet(&packet).await.is_err() {
                    break;
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Cancel the schedule unconditionally, without waiting for an
    /// in-flight tick.
    pub fn detach(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Cancel keep alive schedule");
        }
    }

    /// Whether the scheduled task has stopped (detached, connection gone or
    /// write failed).
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.detach();
    }
}
