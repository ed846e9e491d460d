use crate::scene::model::Scene;
use crate::scene::snapshot::SceneSnapshot;

pub const HISTORY_CAP: usize = 50;

/// Bounded undo stack of deep scene snapshots. Oldest entries fall off when
/// the cap is reached.
#[derive(Debug, Default)]
pub struct History {
    entries: Vec<SceneSnapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the scene's current persisted state. Call before the mutation it
    /// protects.
    pub fn record(&mut self, scene: &Scene, label: &str) {
        tracing::debug!(label, depth = self.entries.len(), "history record");
        self.entries.push(scene.snapshot());
        if self.entries.len() > HISTORY_CAP {
            self.entries.remove(0);
        }
    }

    /// Pop and restore the most recent snapshot. Clears the selection.
    /// Returns false on an empty stack.
    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        let Some(snap) = self.entries.pop() else {
            return false;
        };
        scene.restore(&snap);
        scene.selection.clear();
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
