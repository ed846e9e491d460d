use kurbo::{Point, Rect};

use crate::animation::timeline::{CardTransform, Phase, card_transform};
use crate::foundation::error::PushmockResult;
use crate::interact::controller::{InteractionController, PointerAction};
use crate::persist::store::TemplateStore;
use crate::render::plan::{FramePlan, compile_frame};
use crate::scene::history::History;
use crate::scene::model::{Scene, SelectTarget};
use crate::text::measure::TextMeasure;
use crate::view::editor::{EditorPlacement, InlineEditor};

/// The application context: one editable scene plus its undo history,
/// pointer state machine, inline editor and playback clock. The shell feeds
/// it events and times; it hands back frame plans and editor placements.
pub struct EditorSession {
    pub scene: Scene,
    pub history: History,
    controller: InteractionController,
    editor: InlineEditor,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            history: History::new(),
            controller: InteractionController::new(),
            editor: InlineEditor::new(),
        }
    }

    pub fn editor_open(&self) -> bool {
        self.editor.is_open()
    }

    // Pointer events. `now` is the shell's monotonic clock in seconds.

    pub fn pointer_down(
        &mut self,
        measure: &dyn TextMeasure,
        scene_pt: Point,
        now: f64,
        shift: bool,
    ) -> PointerAction {
        if self.editor.is_open() {
            self.editor.commit(&mut self.scene);
        }
        let at = self.animation_sample(now);
        self.controller
            .pointer_down(&mut self.scene, &mut self.history, measure, scene_pt, &at, shift)
    }

    pub fn pointer_move(&mut self, measure: &dyn TextMeasure, scene_pt: Point, now: f64) {
        let at = self.animation_sample(now);
        if self.controller.pointer_move(&mut self.scene, measure, scene_pt, &at) {
            self.editor.hide();
        }
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    /// Double-click; when it lands on (or creates) a text run, the editor
    /// opens over it and playback stops.
    pub fn double_click(
        &mut self,
        measure: &dyn TextMeasure,
        scene_pt: Point,
        now: f64,
        viewport: Rect,
    ) -> (PointerAction, Option<EditorPlacement>) {
        let at = self.animation_sample(now);
        let action = self.controller.double_click(
            &mut self.scene,
            &mut self.history,
            measure,
            scene_pt,
            &at,
        );
        let placement = match &action {
            PointerAction::EditText(id) => {
                let id = id.clone();
                self.open_editor(measure, &id, viewport)
            }
            _ => None,
        };
        (action, placement)
    }

    /// Open the inline editor over a run. Playback stops first so the box
    /// tracks the static card.
    pub fn open_editor(
        &mut self,
        measure: &dyn TextMeasure,
        text_id: &str,
        viewport: Rect,
    ) -> Option<EditorPlacement> {
        if self.scene.runtime.playing {
            self.stop();
        }
        self.editor.open_for(&self.scene, measure, text_id, viewport)
    }

    pub fn editor_input(&mut self, new_text: &str) {
        self.editor.input(&mut self.scene, &mut self.history, new_text);
    }

    pub fn editor_commit(&mut self) {
        self.editor.commit(&mut self.scene);
    }

    pub fn editor_cancel(&mut self) {
        self.editor.cancel(&mut self.scene);
    }

    // Keyboard.

    pub fn undo(&mut self) -> bool {
        self.editor.hide();
        self.history.undo(&mut self.scene)
    }

    /// Delete key: the selected text run, else the avatar image.
    pub fn delete_selected(&mut self) -> bool {
        if self.editor.is_open() {
            return false;
        }
        if let Some(id) = self.scene.selection.text_id.clone() {
            self.history.record(&self.scene, "delete text");
            let removed = self.scene.remove_text(&id);
            if removed {
                self.scene.selection.text_id = self.scene.texts.last().map(|t| t.id.clone());
                self.scene.selection.target = self
                    .scene
                    .selection
                    .text_id
                    .as_ref()
                    .map(|_| SelectTarget::Text);
            }
            return removed;
        }
        if self.scene.selection.target == Some(SelectTarget::Avatar)
            && self.scene.avatar.image.is_some()
        {
            self.history.record(&self.scene, "delete avatar");
            self.scene.clear_avatar();
            return true;
        }
        false
    }

    // Playback.

    pub fn start_preview(&mut self, now: f64) {
        self.scene.runtime.preview = true;
        self.scene.runtime.playing = true;
        self.scene.runtime.started_at = Some(now);
        self.editor.hide();
        tracing::debug!(now, "preview start");
    }

    pub fn start_recording(&mut self, now: f64) {
        self.scene.runtime.recording = true;
        self.scene.runtime.playing = true;
        self.scene.runtime.started_at = Some(now);
        self.editor.hide();
    }

    /// Stop playback, preview and recording. Idempotent.
    pub fn stop(&mut self) {
        let rt = &mut self.scene.runtime;
        rt.playing = false;
        rt.preview = false;
        rt.recording = false;
        rt.started_at = None;
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        match self.scene.runtime.started_at {
            Some(t0) if self.scene.runtime.playing => (now - t0).max(0.0),
            _ => 0.0,
        }
    }

    fn animation_sample(&self, now: f64) -> CardTransform {
        if !self.scene.runtime.playing {
            return CardTransform::default();
        }
        let (at, _) = card_transform(
            &self.scene.anim,
            &self.scene.card,
            &self.scene.stage,
            self.elapsed(now),
        );
        at
    }

    /// Compile the frame for the shell's render loop. A preview that has run
    /// past the timeline stops itself.
    pub fn tick(&mut self, now: f64, measure: &dyn TextMeasure) -> FramePlan {
        let at = if self.scene.runtime.playing {
            let (at, phase) = card_transform(
                &self.scene.anim,
                &self.scene.card,
                &self.scene.stage,
                self.elapsed(now),
            );
            if phase == Phase::Complete && self.scene.runtime.preview {
                self.stop();
            }
            at
        } else {
            CardTransform::default()
        };
        compile_frame(&self.scene, measure, &at, self.editor.editing_id())
    }

    // Templates. Store failures leave the in-memory scene untouched.

    /// Save the current scene under `name` (auto-generated when empty).
    /// A successful save records an undo step; a failed one leaves the
    /// history alone. Returns the name used.
    pub fn save_template(
        &mut self,
        store: &dyn TemplateStore,
        name: &str,
        thumb: Option<&str>,
    ) -> PushmockResult<String> {
        let name = if name.trim().is_empty() {
            format!(
                "template-{}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0)
            )
        } else {
            name.trim().to_string()
        };
        store.save(&name, &self.scene.snapshot(), thumb)?;
        self.history.record(&self.scene, "save template");
        tracing::debug!(%name, "template saved");
        Ok(name)
    }

    pub fn load_template(&mut self, store: &dyn TemplateStore, name: &str) -> PushmockResult<()> {
        let snap = store.load(name)?;
        self.history.record(&self.scene, "load template");
        self.scene.restore(&snap);
        self.scene.clamp();
        self.editor.hide();
        self.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::error::PushmockError;
    use crate::persist::store::TemplateMeta;
    use crate::scene::snapshot::SceneSnapshot;
    use crate::text::measure::FixedAdvanceMeasure;

    struct FailingStore;

    impl TemplateStore for FailingStore {
        fn list(&self) -> PushmockResult<Vec<TemplateMeta>> {
            Err(PushmockError::persist("offline"))
        }
        fn load(&self, _: &str) -> PushmockResult<SceneSnapshot> {
            Err(PushmockError::persist("offline"))
        }
        fn save(&self, _: &str, _: &SceneSnapshot, _: Option<&str>) -> PushmockResult<()> {
            Err(PushmockError::persist("offline"))
        }
        fn delete(&self, _: &str) -> PushmockResult<()> {
            Err(PushmockError::persist("offline"))
        }
    }

    #[test]
    fn stop_is_idempotent() {
        let mut s = EditorSession::new();
        s.start_preview(10.0);
        assert!(s.scene.runtime.playing);
        s.stop();
        s.stop();
        assert!(!s.scene.runtime.playing);
        assert!(!s.scene.runtime.preview);
        assert_eq!(s.scene.runtime.started_at, None);
    }

    #[test]
    fn preview_auto_stops_past_timeline() {
        let mut s = EditorSession::new();
        let m = FixedAdvanceMeasure::default();
        s.start_preview(100.0);
        s.tick(100.5, &m);
        assert!(s.scene.runtime.playing);
        s.tick(100.0 + s.scene.anim.total() + 0.5, &m);
        assert!(!s.scene.runtime.playing);
    }

    #[test]
    fn recording_does_not_auto_stop() {
        let mut s = EditorSession::new();
        let m = FixedAdvanceMeasure::default();
        s.start_recording(0.0);
        s.tick(s.scene.anim.total() + 5.0, &m);
        assert!(s.scene.runtime.recording);
    }

    #[test]
    fn elapsed_is_zero_when_stopped() {
        let mut s = EditorSession::new();
        assert_eq!(s.elapsed(50.0), 0.0);
        s.start_preview(10.0);
        assert_eq!(s.elapsed(12.5), 2.5);
    }

    #[test]
    fn failed_save_leaves_scene_unchanged() {
        let mut s = EditorSession::new();
        let before = s.scene.clone();
        assert!(s.save_template(&FailingStore, "x", None).is_err());
        assert!(s.load_template(&FailingStore, "x").is_err());
        assert_eq!(s.scene, before);
        assert!(s.history.is_empty());
    }

    #[test]
    fn successful_save_records_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = crate::persist::store::FsTemplateStore::new(dir.path());
        let mut s = EditorSession::new();
        let name = s.save_template(&store, "", None).unwrap();
        assert!(name.starts_with("template-"));
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn delete_selected_text_then_avatar() {
        let mut s = EditorSession::new();
        let id = s.scene.texts[0].id.clone();
        s.scene.selection.target = Some(SelectTarget::Text);
        s.scene.selection.text_id = Some(id.clone());
        assert!(s.delete_selected());
        assert!(s.scene.text(&id).is_none());
        // Falls back to selecting the (new) last run.
        assert!(s.scene.selection.text_id.is_some());

        s.scene.selection.clear();
        s.scene.selection.target = Some(SelectTarget::Avatar);
        assert!(!s.delete_selected());
        s.scene.set_avatar_image(
            crate::scene::model::AvatarImage {
                width: 1,
                height: 1,
                rgba: vec![0, 0, 0, 255],
            },
            "data:image/png;base64,AAAA".into(),
        );
        assert!(s.delete_selected());
        assert!(s.scene.avatar.image.is_none());
    }

    #[test]
    fn undo_hides_editor() {
        let mut s = EditorSession::new();
        let m = FixedAdvanceMeasure::default();
        let id = s.scene.texts[0].id.clone();
        let vp = Rect::new(0.0, 0.0, 356.0, 634.0);
        s.open_editor(&m, &id, vp);
        assert!(s.editor_open());
        s.history.record(&s.scene.clone(), "x");
        s.undo();
        assert!(!s.editor_open());
    }

    #[test]
    fn opening_editor_stops_playback() {
        let mut s = EditorSession::new();
        let m = FixedAdvanceMeasure::default();
        s.start_preview(0.0);
        let id = s.scene.texts[0].id.clone();
        let vp = Rect::new(0.0, 0.0, 356.0, 634.0);
        s.open_editor(&m, &id, vp);
        assert!(!s.scene.runtime.playing);
    }
}
