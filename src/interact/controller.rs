use kurbo::Point;

use crate::animation::timeline::CardTransform;
use crate::foundation::geom::Corner;
use crate::scene::history::History;
use crate::scene::model::{Card, Scene, SelectTarget};
use crate::text::layout::text_bbox;
use crate::text::measure::TextMeasure;
use crate::view::transform::{Hit, hit_test, scene_to_local};

/// Card center snaps to the stage center within this many pixels, per axis.
pub const CENTER_SNAP: f64 = 30.0;
/// Text edges snap to other runs' edges within this many pixels.
pub const TEXT_SNAP: f64 = 8.0;

#[derive(Clone, Debug, PartialEq)]
pub enum DragMode {
    Move,
    Resize(Corner),
    DragText(String),
    DragAvatar,
}

/// State captured at pointer-down, consumed by pointer-move.
#[derive(Clone, Debug)]
struct Gesture {
    mode: DragMode,
    /// Scene coords for card moves, card-local for everything else.
    start: Point,
    orig_card: Card,
    orig_pos: Point,
    square: bool,
}

/// What the shell should do after a pointer event.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerAction {
    /// Nothing beyond a redraw.
    None,
    /// A text run was pressed; a lone click should open its editor.
    ClickedText(String),
    /// Double-clicked a text run: open its editor.
    EditText(String),
    /// Double-clicked the avatar: ask the user for an image.
    PickImage,
}

/// Pointer gesture state machine. Records history once at the start of each
/// gesture; every move re-derives from the values captured then.
#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Option<Gesture>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragging(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn drag_mode(&self) -> Option<DragMode> {
        self.gesture.as_ref().map(|g| g.mode.clone())
    }

    /// Begin a gesture at a stage point. `at` is the current animation
    /// transform, `shift` requests square resizing.
    pub fn pointer_down(
        &mut self,
        scene: &mut Scene,
        history: &mut History,
        measure: &dyn TextMeasure,
        scene_pt: Point,
        at: &CardTransform,
        shift: bool,
    ) -> PointerAction {
        let local = scene_to_local(&scene.card, at, scene_pt);
        match hit_test(scene, measure, local) {
            Hit::Handle(corner) => {
                history.record(scene, "resize card");
                scene.selection.target = Some(SelectTarget::Card);
                scene.selection.text_id = None;
                self.gesture = Some(Gesture {
                    mode: DragMode::Resize(corner),
                    start: local,
                    orig_card: scene.card.clone(),
                    orig_pos: Point::ZERO,
                    square: shift,
                });
                PointerAction::None
            }
            Hit::Text(id) => {
                history.record(scene, "drag text");
                scene.selection.target = Some(SelectTarget::Text);
                scene.selection.text_id = Some(id.clone());
                let orig = scene
                    .text(&id)
                    .map(|t| Point::new(t.x, t.y))
                    .unwrap_or(Point::ZERO);
                self.gesture = Some(Gesture {
                    mode: DragMode::DragText(id.clone()),
                    start: local,
                    orig_card: scene.card.clone(),
                    orig_pos: orig,
                    square: false,
                });
                PointerAction::ClickedText(id)
            }
            Hit::Avatar => {
                history.record(scene, "drag avatar");
                scene.selection.target = Some(SelectTarget::Avatar);
                scene.selection.text_id = None;
                self.gesture = Some(Gesture {
                    mode: DragMode::DragAvatar,
                    start: local,
                    orig_card: scene.card.clone(),
                    orig_pos: Point::new(scene.avatar.off_x, scene.avatar.off_y),
                    square: false,
                });
                PointerAction::None
            }
            Hit::Card => {
                history.record(scene, "move card");
                scene.selection.target = Some(SelectTarget::Card);
                scene.selection.text_id = None;
                self.gesture = Some(Gesture {
                    mode: DragMode::Move,
                    start: scene_pt,
                    orig_card: scene.card.clone(),
                    orig_pos: Point::new(scene.card.x, scene.card.y),
                    square: false,
                });
                PointerAction::None
            }
            Hit::Miss => {
                scene.selection.clear();
                self.gesture = None;
                PointerAction::None
            }
        }
    }

    /// Continue the active gesture, if any. Returns true when the scene
    /// changed (the shell hides the inline editor on any active drag).
    pub fn pointer_move(
        &mut self,
        scene: &mut Scene,
        measure: &dyn TextMeasure,
        scene_pt: Point,
        at: &CardTransform,
    ) -> bool {
        let Some(gesture) = self.gesture.clone() else {
            return false;
        };
        match gesture.mode {
            DragMode::Move => self.move_card(scene, scene_pt, &gesture),
            DragMode::Resize(corner) => {
                let local = scene_to_local(&scene.card, at, scene_pt);
                self.resize_card(scene, local, corner, &gesture);
            }
            DragMode::DragAvatar => {
                let local = scene_to_local(&scene.card, at, scene_pt);
                scene.avatar.off_x = gesture.orig_pos.x + (local.x - gesture.start.x);
                scene.avatar.off_y = gesture.orig_pos.y + (local.y - gesture.start.y);
            }
            DragMode::DragText(ref id) => {
                let local = scene_to_local(&scene.card, at, scene_pt);
                self.drag_text(scene, measure, local, id, &gesture);
            }
        }
        true
    }

    /// End the gesture. Selection survives.
    pub fn pointer_up(&mut self) {
        self.gesture = None;
    }

    fn move_card(&self, scene: &mut Scene, scene_pt: Point, g: &Gesture) {
        scene.card.x = g.orig_pos.x + (scene_pt.x - g.start.x);
        scene.card.y = g.orig_pos.y + (scene_pt.y - g.start.y);

        let center = scene.card.center();
        if (center.x - scene.stage.w / 2.0).abs() < CENTER_SNAP {
            scene.card.x = (scene.stage.w - scene.card.w) / 2.0;
        }
        if (center.y - scene.stage.h / 2.0).abs() < CENTER_SNAP {
            scene.card.y = (scene.stage.h - scene.card.h) / 2.0;
        }
        scene.clamp();
    }

    fn resize_card(&self, scene: &mut Scene, local: Point, corner: Corner, g: &Gesture) {
        let o = &g.orig_card;
        let dx = local.x - g.start.x;
        let dy = local.y - g.start.y;
        let (mut x, mut y, mut w, mut h) = (o.x, o.y, o.w, o.h);
        match corner {
            Corner::Tl => {
                x += dx;
                y += dy;
                w -= dx;
                h -= dy;
            }
            Corner::Tr => {
                y += dy;
                w += dx;
                h -= dy;
            }
            Corner::Bl => {
                x += dx;
                w -= dx;
                h += dy;
            }
            Corner::Br => {
                w += dx;
                h += dy;
            }
        }
        if g.square {
            // Constrain to the smaller magnitude, keeping each sign.
            let s = w.signum() * w.abs().min(h.abs());
            h = if h >= 0.0 { s.abs() } else { -s.abs() };
            w = s;
        }
        scene.card.x = o.x + (x - o.x);
        scene.card.y = o.y + (y - o.y);
        scene.card.w = w.max(Card::MIN_W);
        scene.card.h = h.max(Card::MIN_H);
        scene.clamp();
    }

    fn drag_text(
        &self,
        scene: &mut Scene,
        measure: &dyn TextMeasure,
        local: Point,
        id: &str,
        g: &Gesture,
    ) {
        let content_w = scene.card.content_w();
        let content_h = scene.card.content_h();
        let Some(run) = scene.text(id) else {
            return;
        };
        let bb = text_bbox(run, content_w, measure);

        let mut nx = g.orig_pos.x + (local.x - g.start.x);
        let mut ny = g.orig_pos.y + (local.y - g.start.y);

        // Magnetic alignment against every other run: leading edge to
        // leading edge, leading to trailing, trailing to leading, per axis.
        for other in scene.texts.iter().filter(|t| t.id != id) {
            let obb = text_bbox(other, content_w, measure);
            if (nx - other.x).abs() < TEXT_SNAP {
                nx = other.x;
            }
            if (ny - other.y).abs() < TEXT_SNAP {
                ny = other.y;
            }
            if (nx - (other.x + obb.width())).abs() < TEXT_SNAP {
                nx = other.x + obb.width();
            }
            if (ny - (other.y + obb.height())).abs() < TEXT_SNAP {
                ny = other.y + obb.height();
            }
            if ((nx + bb.width()) - other.x).abs() < TEXT_SNAP {
                nx = other.x - bb.width();
            }
            if ((ny + bb.height()) - other.y).abs() < TEXT_SNAP {
                ny = other.y - bb.height();
            }
        }

        if let Some(run) = scene.text_mut(id) {
            run.x = nx.min(content_w - bb.width()).max(0.0);
            run.y = ny.min(content_h - bb.height()).max(0.0);
        }
    }

    /// Double-click dispatch: edit an existing run, request an avatar image,
    /// or create a new run on empty card area.
    pub fn double_click(
        &mut self,
        scene: &mut Scene,
        history: &mut History,
        measure: &dyn TextMeasure,
        scene_pt: Point,
        at: &CardTransform,
    ) -> PointerAction {
        let local = scene_to_local(&scene.card, at, scene_pt);
        match hit_test(scene, measure, local) {
            Hit::Text(id) => {
                scene.selection.target = Some(SelectTarget::Text);
                scene.selection.text_id = Some(id.clone());
                PointerAction::EditText(id)
            }
            Hit::Avatar => PointerAction::PickImage,
            Hit::Card | Hit::Handle(_) => {
                history.record(scene, "add text");
                let pad = scene.card.padding;
                let id = scene.add_text((local.x - pad).max(0.0), (local.y - pad).max(0.0));
                scene.selection.target = Some(SelectTarget::Text);
                scene.selection.text_id = Some(id.clone());
                PointerAction::EditText(id)
            }
            Hit::Miss => PointerAction::None,
        }
    }

    /// Toolbar add: a new run just right of the avatar column.
    pub fn add_text_default(&mut self, scene: &mut Scene, history: &mut History) -> String {
        history.record(scene, "add text");
        let x = scene.avatar.off_x + scene.avatar.size + 20.0;
        let id = scene.add_text(x.max(0.0), 20.0);
        scene.selection.target = Some(SelectTarget::Text);
        scene.selection.text_id = Some(id.clone());
        id
    }

    /// Toolbar center: put the selected run's bbox in the middle of the
    /// content area.
    pub fn center_selected_text(
        &mut self,
        scene: &mut Scene,
        history: &mut History,
        measure: &dyn TextMeasure,
    ) -> bool {
        let content_w = scene.card.content_w();
        let content_h = scene.card.content_h();
        let Some(run) = scene.selected_text() else {
            return false;
        };
        let id = run.id.clone();
        let bb = text_bbox(run, content_w, measure);
        history.record(scene, "center text");
        if let Some(run) = scene.text_mut(&id) {
            run.x = ((content_w - bb.width()) / 2.0).max(0.0);
            run.y = ((content_h - bb.height()) / 2.0).max(0.0);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::measure::FixedAdvanceMeasure;

    fn setup() -> (Scene, History, InteractionController, FixedAdvanceMeasure) {
        (
            Scene::new(),
            History::new(),
            InteractionController::new(),
            FixedAdvanceMeasure::default(),
        )
    }

    fn still() -> CardTransform {
        CardTransform::default()
    }

    #[test]
    fn card_move_records_history_once() {
        let (mut scene, mut history, mut ctl, m) = setup();
        let inside = Point::new(500.0, 330.0);
        ctl.pointer_down(&mut scene, &mut history, &m, inside, &still(), false);
        assert_eq!(history.len(), 1);
        ctl.pointer_move(&mut scene, &m, Point::new(540.0, 430.0), &still());
        ctl.pointer_move(&mut scene, &m, Point::new(560.0, 530.0), &still());
        ctl.pointer_up();
        assert_eq!(history.len(), 1);
        assert_eq!(scene.card.y, 160.0 + 200.0);
        assert_eq!(scene.selection.target, Some(SelectTarget::Card));
    }

    #[test]
    fn card_center_snaps_within_threshold() {
        let (mut scene, mut history, mut ctl, m) = setup();
        // Stage center x is 540; card at x=60 w=960 has center 540 already.
        // Drag 25 px right: center 565, within 30 -> snaps back to 60.
        ctl.pointer_down(
            &mut scene,
            &mut history,
            &m,
            Point::new(500.0, 330.0),
            &still(),
            false,
        );
        ctl.pointer_move(&mut scene, &m, Point::new(525.0, 330.0), &still());
        assert_eq!(scene.card.x, 60.0);
        // 35 px is outside the threshold: no snap.
        ctl.pointer_move(&mut scene, &m, Point::new(535.0, 330.0), &still());
        assert_eq!(scene.card.x, 95.0);
    }

    #[test]
    fn resize_respects_min_size_and_anchor() {
        let (mut scene, mut history, mut ctl, m) = setup();
        // Grab the bottom-right handle and push far past the minimum.
        let br = Point::new(scene.card.x + scene.card.w, scene.card.y + scene.card.h);
        ctl.pointer_down(&mut scene, &mut history, &m, br, &still(), false);
        assert_eq!(ctl.drag_mode(), Some(DragMode::Resize(Corner::Br)));
        ctl.pointer_move(&mut scene, &m, Point::new(100.0, 100.0), &still());
        assert_eq!(scene.card.w, Card::MIN_W);
        assert_eq!(scene.card.h, Card::MIN_H);
        // Top-left corner stays anchored.
        assert_eq!(scene.card.x, 60.0);
        assert_eq!(scene.card.y, 160.0);
    }

    #[test]
    fn shift_resize_constrains_to_square() {
        let (mut scene, mut history, mut ctl, m) = setup();
        let br = Point::new(scene.card.x + scene.card.w, scene.card.y + scene.card.h);
        ctl.pointer_down(&mut scene, &mut history, &m, br, &still(), true);
        ctl.pointer_move(&mut scene, &m, Point::new(br.x - 300.0, br.y + 400.0), &still());
        // w 660, h 580 -> square at the smaller magnitude.
        assert_eq!(scene.card.w, scene.card.h);
        assert_eq!(scene.card.w, 580.0);
    }

    #[test]
    fn text_drag_snaps_at_8_but_not_9() {
        let (mut scene, mut history, mut ctl, m) = setup();
        // Two runs with a known gap; drag the second toward the first's x.
        scene.texts.truncate(2);
        scene.texts[0].x = 140.0;
        scene.texts[1].x = 300.0;
        scene.texts[1].y = 76.0;
        let id = scene.texts[1].id.clone();
        let down = Point::new(
            scene.card.x + scene.card.padding + 305.0,
            scene.card.y + scene.card.padding + 80.0,
        );
        ctl.pointer_down(&mut scene, &mut history, &m, down, &still(), false);
        assert_eq!(ctl.drag_mode(), Some(DragMode::DragText(id.clone())));

        // Move so the run lands at x=147: 7 px from 140, snaps.
        ctl.pointer_move(&mut scene, &m, Point::new(down.x - 153.0, down.y), &still());
        assert_eq!(scene.text(&id).map(|t| t.x), Some(140.0));

        // x=149: 9 px away, stays free.
        ctl.pointer_move(&mut scene, &m, Point::new(down.x - 151.0, down.y), &still());
        assert_eq!(scene.text(&id).map(|t| t.x), Some(149.0));
    }

    #[test]
    fn text_drag_clamps_inside_content() {
        let (mut scene, mut history, mut ctl, m) = setup();
        scene.texts.truncate(1);
        let id = scene.texts[0].id.clone();
        let down = Point::new(
            scene.card.x + scene.card.padding + scene.texts[0].x + 5.0,
            scene.card.y + scene.card.padding + scene.texts[0].y + 5.0,
        );
        ctl.pointer_down(&mut scene, &mut history, &m, down, &still(), false);
        ctl.pointer_move(&mut scene, &m, Point::new(-5000.0, -5000.0), &still());
        let run = scene.text(&id).unwrap();
        assert_eq!((run.x, run.y), (0.0, 0.0));
    }

    #[test]
    fn release_keeps_selection() {
        let (mut scene, mut history, mut ctl, m) = setup();
        ctl.pointer_down(
            &mut scene,
            &mut history,
            &m,
            Point::new(500.0, 330.0),
            &still(),
            false,
        );
        ctl.pointer_up();
        assert!(!ctl.dragging());
        assert_eq!(scene.selection.target, Some(SelectTarget::Card));
        // A move after release does nothing.
        assert!(!ctl.pointer_move(&mut scene, &m, Point::new(0.0, 0.0), &still()));
    }

    #[test]
    fn double_click_empty_area_creates_run() {
        let (mut scene, mut history, mut ctl, m) = setup();
        let before = scene.texts.len();
        let action = ctl.double_click(
            &mut scene,
            &mut history,
            &m,
            Point::new(900.0, 320.0),
            &still(),
        );
        assert_eq!(scene.texts.len(), before + 1);
        assert!(matches!(action, PointerAction::EditText(_)));
        assert_eq!(history.len(), 1);
        let new = scene.texts.last().unwrap();
        assert_eq!(new.text, "Text");
        assert!(new.x >= 0.0 && new.y >= 0.0);
    }

    #[test]
    fn double_click_avatar_requests_image() {
        let (mut scene, mut history, mut ctl, m) = setup();
        let on_avatar = Point::new(scene.card.x + 60.0, scene.card.y + 90.0);
        let action = ctl.double_click(&mut scene, &mut history, &m, on_avatar, &still());
        assert_eq!(action, PointerAction::PickImage);
        assert!(history.is_empty());
    }
}
