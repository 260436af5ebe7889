//! Trailing-edge debouncer on a worker thread.
//!
//! Every [`Debouncer::trigger`] restarts the quiet window; the callback runs
//! once the window passes without another trigger.

use crate::error::Result;
use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct Debouncer {
    tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// Spawn the worker
    pub fn spawn<F>(name: &str, window: Duration, callback: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = unbounded::<()>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                // Outer recv ends when every sender is gone
                while rx.recv().is_ok() {
                    loop {
                        match rx.recv_timeout(window) {
                            Ok(()) => continue,
                            Err(RecvTimeoutError::Timeout) => {
                                callback();
                                break;
                            }
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }
                }
                log::debug!("Debouncer exiting");
            })?;
        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Restart the quiet window
    pub fn trigger(&self) {
        if let Some(tx) = &self.tx
            && tx.send(()).is_err()
        {
            log::warn!("Debouncer worker is gone, trigger dropped");
        }
    }

    /// Stop the worker without firing a pending callback
    pub fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::error!("Debouncer worker panicked");
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
