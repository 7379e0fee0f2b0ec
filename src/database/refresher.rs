use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use log::{debug, warn};

use crate::context::Context;
use crate::database::DbSearcher;
use crate::error::Result;

/// Background thread that periodically compacts the dynamic index.
///
/// Stopped by [`stop`](Refresher::stop) or by dropping the handle.
#[derive(Debug)]
pub struct Refresher {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Refresher {
    pub fn spawn(db: Arc<DbSearcher>, period: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("plume-refresher".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => match db.refresh() {
                            Ok(true) => debug!("refresher compacted {}", db.path().display()),
                            Ok(false) => {}
                            Err(e) => warn!("refresh of {} failed: {}", db.path().display(), e),
                        },
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("refresher stopped");
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Spawn with the configured refresh interval.
    pub fn start(db: Arc<DbSearcher>, ctx: &Context) -> Result<Self> {
        Self::spawn(db, ctx.var_index().refresh_interval)
    }

    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            // Disconnecting is enough if the buffer is already full.
            let _ = stop.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("refresher thread panicked");
            }
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.stop();
    }
}
