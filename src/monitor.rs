// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use crossbeam_channel::Receiver;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;
use crossbeam_channel::select;
use crossbeam_channel::tick;

use crate::Error;
use crate::Trap;
use crate::registry::Registry;

/// Re-checks every writer periodically, so that files roll over on time even when nothing is
/// logged.
pub(crate) struct RotationMonitor {
    registry: Arc<Registry>,
    trap: Arc<dyn Trap>,
    ticker: Receiver<Instant>,
    shutdown: Receiver<()>,
}

impl RotationMonitor {
    pub(crate) fn spawn(
        registry: Arc<Registry>,
        trap: Arc<dyn Trap>,
        interval: Duration,
    ) -> Result<MonitorGuard, Error> {
        let (shutdown_sender, shutdown) = bounded(0);
        let monitor = RotationMonitor {
            registry,
            trap,
            ticker: tick(interval),
            shutdown,
        };

        let handle = std::thread::Builder::new()
            .name("tierlog-rotation-monitor".to_string())
            .spawn(move || monitor.run())
            .map_err(|err| Error::new("failed to spawn rotation monitor").with_source(err))?;

        Ok(MonitorGuard {
            handle: Some(handle),
            shutdown: Some(shutdown_sender),
        })
    }

    fn run(self) {
        loop {
            select! {
                recv(self.ticker) -> _ => check_all(&self.registry, self.trap.as_ref()),
                recv(self.shutdown) -> _ => break,
            }
        }
    }
}

/// One monitor tick. A panic while checking one writer does not stop the others from being
/// checked.
pub(crate) fn check_all(registry: &Registry, trap: &dyn Trap) {
    for writer in registry.iter() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| writer.check())) {
            let err = Error::new("rotation check panicked")
                .with_context("severity", writer.severity())
                .with_context("panic", panic_message(payload.as_ref()));
            trap.trap(&err);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Stops the rotation monitor when dropped.
#[derive(Debug)]
pub(crate) struct MonitorGuard {
    handle: Option<JoinHandle<()>>,
    shutdown: Option<Sender<()>>,
}

impl Drop for MonitorGuard {
    fn drop(&mut self) {
        // disconnecting the channel wakes the monitor up
        drop(self.shutdown.take());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
