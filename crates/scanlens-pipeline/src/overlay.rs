// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Latest drawable state per mode, handed from the frame thread to rendering.
//
// Writers build a new immutable snapshot and swap it in under a short lock;
// readers clone the `Arc` and never observe a half-updated frame.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use scanlens_core::types::{Mode, OverlayState};
use tracing::debug;

static EMPTY: OverlayState = OverlayState::Empty;

/// One consistent view of every mode's overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    active: Mode,
    states: HashMap<Mode, OverlayState>,
}

impl OverlaySnapshot {
    fn new(active: Mode) -> Self {
        Self {
            active,
            states: HashMap::new(),
        }
    }

    pub fn active_mode(&self) -> Mode {
        self.active
    }

    /// State for `mode`; [`OverlayState::Empty`] when nothing was stored.
    pub fn get(&self, mode: Mode) -> &OverlayState {
        self.states.get(&mode).unwrap_or(&EMPTY)
    }

    /// Every mode paired with its state, in [`Mode::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Mode, &OverlayState)> + '_ {
        Mode::ALL.into_iter().map(move |mode| (mode, self.get(mode)))
    }

    pub fn is_clear(&self) -> bool {
        self.states.values().all(OverlayState::is_empty)
    }
}

/// Single-writer / single-reader overlay handoff.
#[derive(Debug)]
pub struct OverlayStore {
    current: Mutex<Arc<OverlaySnapshot>>,
}

impl OverlayStore {
    pub fn new(active: Mode) -> Self {
        Self {
            current: Mutex::new(Arc::new(OverlaySnapshot::new(active))),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Arc<OverlaySnapshot>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store `state` for `mode`.
    ///
    /// Results tagged with a mode that is no longer active are stale and are
    /// dropped; returns whether the state was stored.
    pub fn set(&self, mode: Mode, state: OverlayState) -> bool {
        let mut slot = self.slot();
        if slot.active != mode {
            debug!(%mode, active = %slot.active, "dropping stale overlay");
            return false;
        }
        let mut next = OverlaySnapshot::clone(&slot);
        next.states.insert(mode, state);
        *slot = Arc::new(next);
        true
    }

    pub fn get(&self, mode: Mode) -> OverlayState {
        self.snapshot().get(mode).clone()
    }

    /// Drop every mode's state.
    pub fn clear_all(&self) {
        let mut slot = self.slot();
        *slot = Arc::new(OverlaySnapshot::new(slot.active));
    }

    /// Make `mode` active and clear all state in the same swap. Returns the
    /// previously active mode.
    pub fn switch_mode(&self, mode: Mode) -> Mode {
        let mut slot = self.slot();
        let previous = slot.active;
        *slot = Arc::new(OverlaySnapshot::new(mode));
        previous
    }

    pub fn active_mode(&self) -> Mode {
        self.slot().active
    }

    pub fn snapshot(&self) -> Arc<OverlaySnapshot> {
        Arc::clone(&self.slot())
    }
}
