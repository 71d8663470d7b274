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

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::mem;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use jiff::SignedDuration;
use jiff::Timestamp;
use jiff::Zoned;
use jiff::civil::Date;

use crate::Error;
use crate::Severity;
use crate::Trap;
use crate::clock::Clock;
use crate::rotation::Probe;
use crate::rotation::Rotation;

// how long writes wait before retrying a rotation that failed; monitor ticks retry regardless
const ROTATION_RETRY_DELAY: SignedDuration = SignedDuration::from_secs(1);

/// The lifecycle state of a writer's output handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Not opened yet, or closed explicitly. Opened on the next write.
    Unopened,
    /// The active file is open for appending.
    Open,
    /// The last open or write failed. Writes are dropped until a reopen succeeds.
    Degraded,
}

/// A point-in-time view of one severity tier's writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterStatus {
    /// The severity this writer owns.
    pub severity: Severity,
    /// The active log file.
    pub path: PathBuf,
    /// The state of the output handle.
    pub state: HandleState,
    /// The tracked size of the active file, if it is open.
    pub size: Option<u64>,
    /// The date of the last daily rotation, or of creation.
    pub last_rotation: Date,
    /// How many times the active file was archived by this writer.
    pub rotations: u64,
}

#[derive(Debug)]
enum Handle {
    Unopened,
    Open { file: File, size: u64 },
    Degraded,
}

#[derive(Debug)]
struct State {
    handle: Handle,
    last_rotation: Date,
    rotations: u64,
    // set once an I/O failure is reported; cleared by the next successful append
    faulted: bool,
    // set while rotation keeps failing: the earliest time a write may try again
    rotation_retry: Option<Timestamp>,
}

impl State {
    fn probe(&self, pending: u64, today: Date) -> Probe {
        let size = match self.handle {
            Handle::Open { size, .. } => Some(size),
            Handle::Unopened | Handle::Degraded => None,
        };
        Probe {
            size,
            pending,
            today,
            last_rotation: self.last_rotation,
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match mem::replace(&mut self.handle, Handle::Unopened) {
            Handle::Open { mut file, .. } => file.flush(),
            Handle::Unopened | Handle::Degraded => Ok(()),
        }
    }
}

/// Writes the lines of one severity tier and rolls its file over.
///
/// Every mutation (open, rotation, append) happens under the exclusive side of the lock, so a
/// line is never written into a half-rotated file and lines of concurrent callers never
/// interleave. The shared side is only used to peek at the state.
#[derive(Debug)]
pub(crate) struct FileWriter {
    severity: Severity,
    log_dir: PathBuf,
    path: PathBuf,
    rotation: Rotation,
    clock: Clock,
    trap: Arc<dyn Trap>,
    state: RwLock<State>,
}

impl FileWriter {
    pub(crate) fn new(
        severity: Severity,
        log_dir: &Path,
        filename: &str,
        rotation: Rotation,
        clock: Clock,
        trap: Arc<dyn Trap>,
    ) -> FileWriter {
        let path = log_dir.join(format!("{filename}_{}.log", severity.name()));

        // continue from the date the existing active file was last written to
        let today = clock.now().date();
        let last_rotation = fs::metadata(&path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|mtime| Zoned::try_from(mtime).ok())
            .map_or(today, |mtime| mtime.date().min(today));

        FileWriter {
            severity,
            log_dir: log_dir.to_path_buf(),
            path,
            rotation,
            clock,
            trap,
            state: RwLock::new(State {
                handle: Handle::Unopened,
                last_rotation,
                rotations: 0,
                faulted: false,
                rotation_retry: None,
            }),
        }
    }

    pub(crate) fn severity(&self) -> Severity {
        self.severity
    }

    /// Append one rendered line plus a terminator, rolling the file first if it is due.
    pub(crate) fn append(&self, line: &str) {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        let pending = buf.len() as u64;

        let mut state = self.state_mut();
        self.ensure_open(&mut state);

        let now = self.clock.now();
        let may_rotate = state
            .rotation_retry
            .is_none_or(|retry_at| now.timestamp() >= retry_at);
        if may_rotate && self.rotation.is_due(&state.probe(pending, now.date())) {
            self.rotate(&mut state, &now);
        }

        let written = match &mut state.handle {
            Handle::Open { file, size } => file.write_all(&buf).map(|()| *size += pending),
            // already reported; the line is dropped
            Handle::Unopened | Handle::Degraded => return,
        };

        match written {
            Ok(()) => state.faulted = false,
            Err(err) => {
                state.handle = Handle::Degraded;
                let err = Error::new("failed to write log file")
                    .with_context("path", self.path.display())
                    .with_source(err);
                self.report(&mut state, err);
            }
        }
    }

    /// Re-evaluate the writer without writing: reopen a degraded or vanished file and roll the
    /// file over if it is due.
    pub(crate) fn check(&self) {
        let now = self.clock.now();
        if !self.needs_attention(&self.state(), now.date()) {
            return;
        }

        let mut state = self.state_mut();
        if !matches!(state.handle, Handle::Unopened) {
            self.ensure_open(&mut state);
        }
        if self.rotation.is_due(&state.probe(0, now.date())) {
            self.rotate(&mut state, &now);
        }
    }

    pub(crate) fn flush(&self) {
        let mut state = self.state_mut();
        let flushed = match &mut state.handle {
            Handle::Open { file, .. } => file.flush(),
            Handle::Unopened | Handle::Degraded => Ok(()),
        };
        if let Err(err) = flushed {
            let err = Error::new("failed to flush log file")
                .with_context("path", self.path.display())
                .with_source(err);
            self.report(&mut state, err);
        }
    }

    /// Close the active file. The next write opens it again.
    pub(crate) fn close(&self) {
        let mut state = self.state_mut();
        if let Err(err) = state.close() {
            let err = Error::new("failed to flush log file on close")
                .with_context("path", self.path.display())
                .with_source(err);
            self.report(&mut state, err);
        }
    }

    pub(crate) fn status(&self) -> WriterStatus {
        let state = self.state();
        let (handle, size) = match state.handle {
            Handle::Unopened => (HandleState::Unopened, None),
            Handle::Open { size, .. } => (HandleState::Open, Some(size)),
            Handle::Degraded => (HandleState::Degraded, None),
        };
        WriterStatus {
            severity: self.severity,
            path: self.path.clone(),
            state: handle,
            size,
            last_rotation: state.last_rotation,
            rotations: state.rotations,
        }
    }

    fn state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn needs_attention(&self, state: &State, today: Date) -> bool {
        match state.handle {
            Handle::Degraded => true,
            Handle::Open { .. } if !self.active_file_exists() => true,
            _ => self.rotation.is_due(&state.probe(0, today)),
        }
    }

    fn ensure_open(&self, state: &mut State) {
        if let Handle::Open { .. } = state.handle {
            if self.active_file_exists() {
                return;
            }
            // the active file was removed behind our back; drop the stale handle
            if let Err(err) = state.close() {
                let err = Error::new("failed to flush removed log file")
                    .with_context("path", self.path.display())
                    .with_source(err);
                self.report(state, err);
            }
        }
        self.open(state);
    }

    fn open(&self, state: &mut State) {
        match open_file(&self.log_dir, &self.path) {
            Ok((file, size)) => state.handle = Handle::Open { file, size },
            Err(err) => {
                state.handle = Handle::Degraded;
                self.report(state, err.with_context("severity", self.severity));
            }
        }
    }

    fn rotate(&self, state: &mut State, now: &Zoned) {
        let rolled = match self.rotation {
            Rotation::Size { max_backups, .. } => self.roll_by_size(state, max_backups),
            Rotation::Daily => self.roll_by_date(state, now.date()),
        };

        match rolled {
            Ok(()) => state.rotation_retry = None,
            Err(err) => {
                let retry_at = now
                    .timestamp()
                    .checked_add(ROTATION_RETRY_DELAY)
                    .unwrap_or(Timestamp::MAX);
                // a rotation that keeps failing is reported on its first failure only
                if state.rotation_retry.replace(retry_at).is_none() {
                    self.trap.trap(&err);
                }
            }
        }
    }

    /// Shift the numbered backups up by one and archive the active file as backup 1.
    ///
    /// Every step is attempted even if an earlier one failed. A failed archive is returned in
    /// preference to the other failures.
    fn roll_by_size(&self, state: &mut State, max_backups: usize) -> Result<(), Error> {
        let mut failure = self.close_for_rotation(state);

        let oldest = self.backup_path(max_backups);
        if file_exists(&oldest) {
            if let Err(err) = fs::remove_file(&oldest) {
                let err = Error::new("failed to remove oldest backup")
                    .with_context("path", oldest.display())
                    .with_source(err);
                failure.get_or_insert(err);
            }
        }

        for i in (1..max_backups).rev() {
            let src = self.backup_path(i);
            if !file_exists(&src) {
                continue;
            }
            let dst = self.backup_path(i + 1);
            if let Err(err) = fs::rename(&src, &dst) {
                let err = Error::new("failed to shift backup")
                    .with_context("from", src.display())
                    .with_context("to", dst.display())
                    .with_source(err);
                failure.get_or_insert(err);
            }
        }

        let archived = self.archive(state, &self.backup_path(1));
        // a fresh file on success, the old one again if the archive failed
        self.open(state);
        archived?;
        failure.map_or(Ok(()), Err)
    }

    fn roll_by_date(&self, state: &mut State, today: Date) -> Result<(), Error> {
        let snapshot = self.snapshot_path(state.last_rotation);
        if file_exists(&snapshot) {
            state.last_rotation = today;
            return Ok(());
        }

        let failure = self.close_for_rotation(state);
        let archived = self.archive(state, &snapshot);
        if archived.is_ok() {
            state.last_rotation = today;
        }
        self.open(state);
        archived?;
        failure.map_or(Ok(()), Err)
    }

    fn close_for_rotation(&self, state: &mut State) -> Option<Error> {
        state.close().err().map(|err| {
            Error::new("failed to flush log file before rotation")
                .with_context("path", self.path.display())
                .with_source(err)
        })
    }

    /// Move the active file to `target`. A missing active file counts as nothing to archive.
    fn archive(&self, state: &mut State, target: &Path) -> Result<(), Error> {
        match fs::rename(&self.path, target) {
            Ok(()) => {
                state.rotations += 1;
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::new("failed to archive log file")
                .with_context("from", self.path.display())
                .with_context("to", target.display())
                .with_source(err)),
        }
    }

    fn report(&self, state: &mut State, err: Error) {
        if !state.faulted {
            state.faulted = true;
            self.trap.trap(&err);
        }
    }

    fn active_file_exists(&self) -> bool {
        // an inconclusive check keeps the current handle
        !matches!(fs::exists(&self.path), Ok(false))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.suffixed_path(index)
    }

    fn snapshot_path(&self, date: Date) -> PathBuf {
        self.suffixed_path(date.strftime(self.rotation.date_format()))
    }

    fn suffixed_path(&self, suffix: impl std::fmt::Display) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(format!(".{suffix}"));
        PathBuf::from(path)
    }

    #[cfg(test)]
    pub(crate) fn set_last_rotation(&self, date: Date) {
        self.state_mut().last_rotation = date;
    }
}

fn file_exists(path: &Path) -> bool {
    fs::exists(path).is_ok_and(|ok| ok)
}

fn open_file(dir: &Path, path: &Path) -> Result<(File, u64), Error> {
    fs::create_dir_all(dir).map_err(|err| {
        Error::new("failed to create log directory")
            .with_context("dir", dir.display())
            .with_source(err)
    })?;

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|err| {
            Error::new("failed to open log file")
                .with_context("path", path.display())
                .with_source(err)
        })?;
    let size = file.metadata().map_or(0, |metadata| metadata.len());
    Ok((file, size))
}
