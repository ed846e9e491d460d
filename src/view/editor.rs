use kurbo::{Point, Rect};

use crate::scene::history::History;
use crate::scene::model::Scene;
use crate::text::layout::text_bbox;
use crate::text::measure::TextMeasure;
use crate::view::transform::local_to_scene;

/// Minimum editor box in device pixels.
pub const MIN_EDITOR_W: f64 = 120.0;
pub const MIN_EDITOR_H: f64 = 40.0;
/// Inset kept between the editor and the viewport edge.
pub const VIEWPORT_INSET: f64 = 4.0;
/// Slack added around the text bbox for the editor chrome.
const BOX_SLACK: f64 = 8.0;

/// Where the shell should place the editor box, in device pixels relative to
/// the viewport origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditorPlacement {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Clone, Debug)]
struct Active {
    text_id: String,
    last_committed: String,
    history_recorded: bool,
}

/// Inline text editor lifecycle. Text changes hit the model immediately;
/// history coalesces to one entry per editing session.
#[derive(Debug, Default)]
pub struct InlineEditor {
    active: Option<Active>,
}

impl InlineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    pub fn editing_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.text_id.as_str())
    }

    /// Open the editor over a run. The box is sized from the wrapped text
    /// bbox, mapped through the static (un-animated) card position into
    /// device pixels, then clamped inside the viewport.
    pub fn open_for(
        &mut self,
        scene: &Scene,
        measure: &dyn TextMeasure,
        text_id: &str,
        viewport: Rect,
    ) -> Option<EditorPlacement> {
        let run = scene.text(text_id)?;
        let bb = text_bbox(run, scene.card.content_w(), measure);
        let pad = scene.card.padding;
        let anchor = local_to_scene(&scene.card, None, Point::new(pad + bb.x0, pad + bb.y0));

        let scale = scene.stage.preview_scale;
        let mut x = viewport.x0 + anchor.x * scale;
        let mut y = viewport.y0 + anchor.y * scale;
        let w = (bb.width() * scale + BOX_SLACK).max(MIN_EDITOR_W);
        let h = (bb.height() * scale + BOX_SLACK).max(MIN_EDITOR_H);

        if x + w > viewport.x1 {
            x = viewport.x1 - w - VIEWPORT_INSET;
        }
        if y + h > viewport.y1 {
            y = viewport.y1 - h - VIEWPORT_INSET;
        }
        if x < viewport.x0 {
            x = viewport.x0 + VIEWPORT_INSET;
        }
        if y < viewport.y0 {
            y = viewport.y0 + VIEWPORT_INSET;
        }

        self.active = Some(Active {
            text_id: text_id.to_string(),
            last_committed: run.text.clone(),
            history_recorded: false,
        });
        Some(EditorPlacement { x, y, w, h })
    }

    /// Apply an edit to the model immediately. The first real change of the
    /// session records one history entry capturing the pre-edit state.
    pub fn input(&mut self, scene: &mut Scene, history: &mut History, new_text: &str) {
        let Some(active) = &mut self.active else {
            return;
        };
        if !active.history_recorded && new_text != active.last_committed {
            history.record(scene, "edit text");
            active.history_recorded = true;
        }
        let id = active.text_id.clone();
        if let Some(run) = scene.text_mut(&id) {
            run.text = new_text.to_string();
        }
    }

    /// Keep the current value and close.
    pub fn commit(&mut self, scene: &mut Scene) {
        if let Some(active) = self.active.take() {
            if let Some(run) = scene.text(&active.text_id) {
                tracing::debug!(id = %active.text_id, len = run.text.len(), "editor commit");
            }
        }
    }

    /// Revert to the value the session opened with and close. No extra
    /// history entry.
    pub fn cancel(&mut self, scene: &mut Scene) {
        if let Some(active) = self.active.take()
            && let Some(run) = scene.text_mut(&active.text_id)
        {
            run.text = active.last_committed;
        }
    }

    /// Close without touching the model (drags, playback, undo).
    pub fn hide(&mut self) {
        self.active = None;
    }
}
