//! Snapshot undo/redo.
//!
//! Every commit stores a full, independent copy of the scene. Edits mark
//! the history dirty and a debounced commit follows; multi-step operations
//! wrap themselves in `begin_batch`/`end_batch` so the whole operation
//! lands as one entry. A commit identical to the newest entry is dropped.
//!
//! `past` always holds at least the baseline snapshot. `future` is ordered
//! next-redo first.

use crate::schedule::Debouncer;
use festoon_core::Scene;
use std::collections::VecDeque;

/// Label of the snapshot taken by [`History::reset`].
pub const BASELINE_LABEL: &str = "initial";

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub label: String,
    pub timestamp_ms: u64,
    pub scene: Scene,
    fingerprint: Vec<u8>,
}

impl Snapshot {
    pub fn capture(scene: &Scene, label: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            label: label.into(),
            timestamp_ms,
            fingerprint: scene.fingerprint(),
            scene: scene.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryMode {
    Idle,
    Batching { depth: usize },
    Restoring,
}

#[derive(Debug)]
pub struct History {
    past: Vec<Snapshot>,
    future: VecDeque<Snapshot>,
    max_depth: usize,
    batch_depth: usize,
    batch_dirty: bool,
    batch_label: Option<String>,
    pending_label: Option<String>,
    restoring: bool,
    timer: Debouncer,
}

impl History {
    pub fn new(max_depth: usize, debounce_ms: u64) -> Self {
        Self {
            past: Vec::with_capacity(max_depth),
            future: VecDeque::new(),
            max_depth: max_depth.max(1),
            batch_depth: 0,
            batch_dirty: false,
            batch_label: None,
            pending_label: None,
            restoring: false,
            timer: Debouncer::new(debounce_ms),
        }
    }

    /// Drop everything and take `scene` as the new baseline.
    pub fn reset(&mut self, scene: &Scene, now: u64) {
        self.past.clear();
        self.past.push(Snapshot::capture(scene, BASELINE_LABEL, now));
        self.future.clear();
        self.batch_depth = 0;
        self.batch_dirty = false;
        self.batch_label = None;
        self.pending_label = None;
        self.restoring = false;
        self.timer.cancel();
    }

    pub fn mode(&self) -> HistoryMode {
        if self.restoring {
            HistoryMode::Restoring
        } else if self.batch_depth > 0 {
            HistoryMode::Batching {
                depth: self.batch_depth,
            }
        } else {
            HistoryMode::Idle
        }
    }

    /// Note a change. Inside a batch this only flags the batch; otherwise
    /// it (re)starts the debounced commit. Ignored while restoring.
    pub fn mark_dirty(&mut self, label: &str, now: u64) {
        if self.restoring {
            return;
        }
        if self.batch_depth > 0 {
            self.batch_dirty = true;
            return;
        }
        self.pending_label = Some(label.to_string());
        self.timer.schedule(now);
    }

    /// Open a batch level. The most recently opened level names the commit.
    pub fn begin_batch(&mut self, label: &str) {
        self.batch_label = Some(label.to_string());
        self.batch_depth += 1;
    }

    /// Close one batch level. When the outermost level closes after any
    /// change, exactly one commit is made for the whole batch.
    pub fn end_batch(&mut self, scene: &Scene, now: u64) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 || !self.batch_dirty {
            return false;
        }
        self.batch_dirty = false;
        self.timer.cancel();
        let label = self.batch_label.take().unwrap_or_else(|| "batch".into());
        self.commit(scene, &label, now)
    }

    /// Push a snapshot unless it matches the newest one. Evicts the oldest
    /// entries past the depth limit and discards the redo branch.
    pub fn commit(&mut self, scene: &Scene, label: &str, now: u64) -> bool {
        if self.restoring {
            return false;
        }
        let snap = Snapshot::capture(scene, label, now);
        if self
            .past
            .last()
            .is_some_and(|last| last.fingerprint == snap.fingerprint)
        {
            log::trace!("history: '{label}' changed nothing, skipped");
            return false;
        }
        self.past.push(snap);
        while self.past.len() > self.max_depth {
            self.past.remove(0);
        }
        self.future.clear();
        log::debug!("history: committed '{label}' ({} entries)", self.past.len());
        true
    }

    /// Fire the debounced commit if it is due.
    pub fn tick(&mut self, scene: &Scene, now: u64) -> bool {
        if !self.timer.fire_if_due(now) {
            return false;
        }
        let label = self.pending_label.take().unwrap_or_else(|| "edit".into());
        self.commit(scene, &label, now)
    }

    /// Commit a pending debounced change right away.
    pub fn flush(&mut self, scene: &Scene, now: u64) -> bool {
        if !self.timer.is_pending() {
            return false;
        }
        self.timer.cancel();
        let label = self.pending_label.take().unwrap_or_else(|| "edit".into());
        self.commit(scene, &label, now)
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    /// Swap in a snapshot and stay in [`HistoryMode::Restoring`] until
    /// [`Self::finish_restore`], so fix-ups the caller runs on the restored
    /// scene are not recorded as edits.
    fn restore(&mut self, scene: &mut Scene, snapshot: Scene) {
        self.restoring = true;
        *scene = snapshot;
    }

    pub fn finish_restore(&mut self) {
        self.restoring = false;
    }

    /// Step back one entry. A pending edit is committed first so it can be
    /// redone. Never drops below the baseline. Leaves the history restoring.
    pub fn undo(&mut self, scene: &mut Scene, now: u64) -> bool {
        if self.restoring {
            return false;
        }
        self.flush(scene, now);
        if self.past.len() <= 1 {
            return false;
        }
        let Some(current) = self.past.pop() else {
            return false;
        };
        log::debug!("history: undo '{}'", current.label);
        self.future.push_front(current);
        let Some(previous) = self.past.last().map(|s| s.scene.clone()) else {
            return false;
        };
        self.restore(scene, previous);
        true
    }

    pub fn redo(&mut self, scene: &mut Scene, now: u64) -> bool {
        if self.restoring {
            return false;
        }
        self.flush(scene, now);
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        log::debug!("history: redo '{}'", next.label);
        let restored = next.scene.clone();
        self.past.push(next);
        self.restore(scene, restored);
        true
    }

    /// Move to `index` in the combined timeline (`past` then `future`).
    /// Entries after the target become the redo branch.
    pub fn jump_to(&mut self, index: usize, scene: &mut Scene, now: u64) -> bool {
        if self.restoring {
            return false;
        }
        self.flush(scene, now);
        let len = self.past.len() + self.future.len();
        if index >= len || index == self.cursor() {
            return false;
        }
        let mut timeline: Vec<Snapshot> = self.past.drain(..).collect();
        timeline.extend(self.future.drain(..));
        let rest = timeline.split_off(index + 1);
        self.past = timeline;
        self.future = rest.into();

        let Some(target) = self.past.last().map(|s| s.scene.clone()) else {
            return false;
        };
        log::debug!("history: jumped to entry {index}");
        self.restore(scene, target);
        true
    }

    /// The whole timeline, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.past.iter().chain(self.future.iter())
    }

    /// Index of the current state in [`Self::entries`].
    pub fn cursor(&self) -> usize {
        self.past.len().saturating_sub(1)
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn can_undo(&self) -> bool {
        self.past.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }
}
