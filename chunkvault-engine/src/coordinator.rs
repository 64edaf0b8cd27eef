//! The single-flight state machine serializing backup and restore attempts,
//! plus the confirm/countdown restore protocol and the exponential-backoff
//! host handshake waits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::host::HostAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackupState {
    None,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackState {
    None,
    WaitingConfirm,
    Confirmed,
    Aborted,
}

struct Inner {
    backup_state: BackupState,
    back_state: BackState,
    active_op: Option<&'static str>,
    autosave_disabled: bool,
    pending_wait: Option<(Regex, Option<HashMap<String, String>>)>,
}

/// Process-wide coordinator guarding `backup_state`, `back_state` and
/// `active_op`. One instance is shared (behind an `Arc`) across every
/// command entry point and the host's `on_info` callback.
pub struct OperationCoordinator {
    inner: Mutex<Inner>,
}

impl Default for OperationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationCoordinator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                backup_state: BackupState::None,
                back_state: BackState::None,
                active_op: None,
                autosave_disabled: false,
                pending_wait: None,
            }),
        }
    }

    /// Atomically claim the coordinator for `op_kind`, or refuse with
    /// [`EngineError::RepeatBackup`] if a backup or restore is already
    /// in flight. The returned guard clears all coordinator state (and
    /// re-enables auto-save if this operation had disabled it) on drop,
    /// whether the operation succeeded or failed.
    pub fn try_begin<'a>(self: &'a Arc<Self>, op_kind: &'static str, host: &'a dyn HostAdapter) -> Result<OperationGuard<'a>, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.backup_state != BackupState::None || inner.back_state != BackState::None || inner.active_op.is_some() {
            return Err(EngineError::RepeatBackup);
        }
        inner.backup_state = BackupState::Running;
        inner.active_op = Some(op_kind);
        debug!(op_kind, "coordinator claimed");
        Ok(OperationGuard { coordinator: self, host })
    }

    /// Forcefully null out all coordinator state, e.g. for `force_reload`.
    /// Re-enables auto-save unconditionally, since the caller has no way
    /// to know what state the host was left in.
    pub fn force_reset(&self, host: &dyn HostAdapter) {
        let mut inner = self.inner.lock().unwrap();
        *inner = Inner {
            backup_state: BackupState::None,
            back_state: BackState::None,
            active_op: None,
            autosave_disabled: false,
            pending_wait: None,
        };
        drop(inner);
        host.execute("save-on");
    }

    fn mark_autosave_disabled(&self) {
        self.inner.lock().unwrap().autosave_disabled = true;
    }

    /// Run one host handshake step: execute `command`, then wait for a
    /// log line matching `regex` via exponential-backoff polling starting
    /// at 1 ms and doubling to a 100 ms cap, bounded by `timeout`. The
    /// caller supplies which typed timeout to raise, since the same
    /// polling loop backs save-off, save-all-flush and data-get waits.
    pub fn handshake(
        &self,
        host: &dyn HostAdapter,
        command: &str,
        regex: &Regex,
        timeout: Duration,
        timeout_err: EngineError,
    ) -> Result<HashMap<String, String>, EngineError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.pending_wait = Some((regex.clone(), None));
        }
        host.execute(command);
        let result = self.poll_pending(timeout, timeout_err);
        self.inner.lock().unwrap().pending_wait = None;
        result
    }

    fn poll_pending(&self, timeout: Duration, timeout_err: EngineError) -> Result<HashMap<String, String>, EngineError> {
        let start = Instant::now();
        let mut delay = Duration::from_millis(1);
        let cap = Duration::from_millis(100);
        loop {
            if let Some(captures) = self.inner.lock().unwrap().pending_wait.as_ref().and_then(|(_, c)| c.clone()) {
                return Ok(captures);
            }
            if start.elapsed() >= timeout {
                return Err(timeout_err);
            }
            std::thread::sleep(delay.min(timeout.saturating_sub(start.elapsed())));
            delay = (delay * 2).min(cap);
        }
    }

    /// Feed one host console line in; if it matches the regex currently
    /// being waited on, its named capture groups are recorded for the
    /// waiting thread to pick up.
    pub fn on_info(&self, line: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some((regex, captured)) = &mut inner.pending_wait {
            if captured.is_none() {
                if let Some(caps) = regex.captures(line) {
                    let map = regex
                        .capture_names()
                        .flatten()
                        .filter_map(|name| caps.name(name).map(|m| (name.to_string(), m.as_str().to_string())))
                        .collect();
                    *captured = Some(map);
                }
            }
        }
    }

    /// Enter the restore confirm protocol: reply with a confirm/abort
    /// prompt, then wait up to `timeout` for [`OperationCoordinator::confirm`]
    /// or [`OperationCoordinator::abort`] to be called.
    pub fn request_confirm(&self, host: &dyn HostAdapter, timeout: Duration) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.back_state = BackState::WaitingConfirm;
        }
        host.reply(&host.tr("chunkvault.restore.confirm_prompt"));

        let start = Instant::now();
        loop {
            let state = self.inner.lock().unwrap().back_state;
            match state {
                BackState::Confirmed => return Ok(()),
                BackState::Aborted => return Err(EngineError::BackAbort),
                _ => {}
            }
            if start.elapsed() >= timeout {
                self.inner.lock().unwrap().back_state = BackState::None;
                return Err(EngineError::BackTimeout);
            }
            std::thread::sleep(Duration::from_millis(50));
        }
    }

    /// Broadcast a countdown, one message per second, checking for an
    /// abort between each. Returns `Ok(())` once the countdown completes
    /// with no abort.
    pub fn run_countdown(&self, host: &dyn HostAdapter, seconds: u32) -> Result<(), EngineError> {
        for remaining in (1..=seconds).rev() {
            if self.inner.lock().unwrap().back_state == BackState::Aborted {
                return Err(EngineError::BackAbort);
            }
            host.broadcast(&format!("{} {remaining}", host.tr("chunkvault.restore.countdown")));
            std::thread::sleep(Duration::from_secs(1));
        }
        if self.inner.lock().unwrap().back_state == BackState::Aborted {
            return Err(EngineError::BackAbort);
        }
        Ok(())
    }

    /// Called by the command that parses a user's `confirm` reply.
    pub fn confirm(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.back_state == BackState::WaitingConfirm {
            inner.back_state = BackState::Confirmed;
        }
    }

    /// Called by the command that parses a user's `abort` reply.
    pub fn abort(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.back_state = BackState::Aborted;
    }
}

/// RAII guard returned by [`OperationCoordinator::try_begin`]. Clears
/// coordinator state on drop and re-enables auto-save if this operation
/// disabled it.
pub struct OperationGuard<'a> {
    coordinator: &'a Arc<OperationCoordinator>,
    host: &'a dyn HostAdapter,
}

impl OperationGuard<'_> {
    pub fn mark_autosave_disabled(&self) {
        self.coordinator.mark_autosave_disabled();
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.coordinator.inner.lock().unwrap();
        let autosave_disabled = inner.autosave_disabled;
        *inner = Inner {
            backup_state: BackupState::None,
            back_state: BackState::None,
            active_op: None,
            autosave_disabled: false,
            pending_wait: None,
        };
        drop(inner);
        if autosave_disabled {
            info!("re-enabling auto-save on operation exit");
            self.host.execute("save-on");
        }
    }
}
