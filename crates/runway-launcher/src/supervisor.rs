//! Tool process table.
//!
//! Per tool: `NotRunning -> Launching -> Running -> NotRunning`. A launch
//! reserves its slot with a [`LaunchTicket`] before any work starts, so a
//! second launch of the same tool is refused while the first is still
//! provisioning or downloading. Dropping the ticket without committing a
//! process releases the slot.
//!
//! The table lock is a `std::sync::Mutex` held only for bookkeeping.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::ToolId;
use crate::process::ProcessHandle;

enum Slot {
    Launching,
    Running {
        handle: Box<dyn ProcessHandle>,
        started_at: DateTime<Utc>,
    },
}

/// Observable state of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    /// No live process.
    NotRunning,
    /// A launch is in progress.
    Launching,
    /// A live process exists.
    Running {
        /// OS process id.
        pid: Option<u32>,
        /// When it was started.
        started_at: DateTime<Utc>,
    },
}

impl ToolState {
    /// Whether the tool is launching or running.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::NotRunning)
    }
}

/// Result of [`ToolProcessSupervisor::terminate_all`].
#[derive(Debug, Default)]
pub struct TerminateReport {
    /// Tools whose process was stopped.
    pub stopped: Vec<ToolId>,
    /// Tools that could not be stopped.
    pub failures: Vec<(ToolId, io::Error)>,
}

/// Shared process table. Clones refer to the same table.
#[derive(Clone, Default)]
pub struct ToolProcessSupervisor {
    slots: Arc<Mutex<HashMap<ToolId, Slot>>>,
}

impl std::fmt::Debug for ToolProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolProcessSupervisor")
            .field("tools", &self.lock().len())
            .finish()
    }
}

impl ToolProcessSupervisor {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ToolId, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserve `tool` for launching.
    ///
    /// Returns `None` if the tool is already launching or has a live
    /// process. A dead process is reaped and the slot reused.
    #[must_use]
    pub fn begin_launch(&self, tool: &ToolId) -> Option<LaunchTicket> {
        let mut slots = self.lock();
        let busy = match slots.get_mut(tool) {
            None => false,
            Some(Slot::Launching) => true,
            Some(Slot::Running { handle, .. }) => handle.is_alive(),
        };
        if busy {
            return None;
        }
        slots.insert(tool.clone(), Slot::Launching);
        debug!(%tool, "launch slot reserved");
        Some(LaunchTicket {
            slots: Arc::clone(&self.slots),
            tool: tool.clone(),
            committed: false,
        })
    }

    /// Current state of `tool`, polling liveness. Exited processes are
    /// removed.
    #[must_use]
    pub fn state(&self, tool: &ToolId) -> ToolState {
        let mut slots = self.lock();
        Self::poll(&mut slots, tool)
    }

    fn poll(slots: &mut HashMap<ToolId, Slot>, tool: &ToolId) -> ToolState {
        let state = match slots.get_mut(tool) {
            None => return ToolState::NotRunning,
            Some(Slot::Launching) => ToolState::Launching,
            Some(Slot::Running { handle, started_at }) => {
                if handle.is_alive() {
                    ToolState::Running {
                        pid: handle.id(),
                        started_at: *started_at,
                    }
                } else {
                    ToolState::NotRunning
                }
            },
        };
        if state == ToolState::NotRunning {
            slots.remove(tool);
            debug!(%tool, "tool process exited");
        }
        state
    }

    /// State of every tracked tool, sorted by id.
    #[must_use]
    pub fn status(&self) -> Vec<(ToolId, ToolState)> {
        let mut slots = self.lock();
        let ids: Vec<ToolId> = slots.keys().cloned().collect();
        let mut out: Vec<(ToolId, ToolState)> = ids
            .into_iter()
            .map(|id| {
                let state = Self::poll(&mut slots, &id);
                (id, state)
            })
            .filter(|(_, s)| s.is_active())
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Number of live or launching tools.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.status().len()
    }

    /// Stop `tool` if it is running. Returns whether a process was stopped.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the process could not be stopped; the entry
    /// is kept in that case.
    pub fn terminate(&self, tool: &ToolId) -> io::Result<bool> {
        let mut slots = self.lock();
        let Some(Slot::Running { handle, .. }) = slots.get_mut(tool) else {
            return Ok(false);
        };
        let was_alive = handle.is_alive();
        handle.terminate()?;
        slots.remove(tool);
        if was_alive {
            info!(%tool, "tool process terminated");
        }
        Ok(was_alive)
    }

    /// Stop every running tool. Failures are collected, not propagated.
    pub fn terminate_all(&self) -> TerminateReport {
        let mut report = TerminateReport::default();
        let mut slots = self.lock();
        let running: Vec<ToolId> = slots
            .iter()
            .filter(|(_, s)| matches!(s, Slot::Running { .. }))
            .map(|(id, _)| id.clone())
            .collect();

        for id in running {
            let Some(Slot::Running { handle, .. }) = slots.get_mut(&id) else {
                continue;
            };
            let was_alive = handle.is_alive();
            match handle.terminate() {
                Ok(()) => {
                    slots.remove(&id);
                    if was_alive {
                        report.stopped.push(id);
                    }
                },
                Err(e) => {
                    warn!(tool = %id, error = %e, "failed to terminate tool process");
                    report.failures.push((id, e));
                },
            }
        }
        report.stopped.sort();
        report
    }
}

/// Reservation of a tool's slot for one launch attempt.
#[must_use = "dropping the ticket releases the launch slot"]
pub struct LaunchTicket {
    slots: Arc<Mutex<HashMap<ToolId, Slot>>>,
    tool: ToolId,
    committed: bool,
}

impl LaunchTicket {
    /// Tool this ticket reserves.
    #[must_use]
    pub fn tool(&self) -> &ToolId {
        &self.tool
    }

    /// Record the started process; the tool becomes `Running`.
    pub fn commit(mut self, handle: Box<dyn ProcessHandle>) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(
            self.tool.clone(),
            Slot::Running {
                handle,
                started_at: Utc::now(),
            },
        );
        self.committed = true;
    }
}

impl Drop for LaunchTicket {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(slots.get(&self.tool), Some(Slot::Launching)) {
            slots.remove(&self.tool);
            debug!(tool = %self.tool, "launch slot released");
        }
    }
}

impl std::fmt::Debug for LaunchTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchTicket")
            .field("tool", &self.tool)
            .field("committed", &self.committed)
            .finish()
    }
}
