// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic refresh loop.

use std::io;
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A running refresh loop.
///
/// The loop calls its tick function every `interval` until stopped. A slow
/// tick delays the next one but never skips it.
pub(crate) struct RefreshLoop {
    /// Stop signal sender
    stop_tx: Sender<()>,
    /// Loop thread handle
    thread: JoinHandle<()>,
}

impl RefreshLoop {
    /// Spawns a loop calling `tick` every `interval`.
    pub(crate) fn spawn<F>(interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = channel();

        let thread = thread::Builder::new()
            .name("config-refresh".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        tracing::debug!("config refresh loop stopping");
                        break;
                    }
                }
            })?;

        Ok(Self { stop_tx, thread })
    }

    /// Signals the loop and waits for it to exit.
    pub(crate) fn stop(self) {
        let _ = self.stop_tx.send(());
        if self.thread.join().is_err() {
            tracing::warn!("config refresh thread panicked");
        }
    }
}
