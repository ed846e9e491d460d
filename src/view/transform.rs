use kurbo::{Point, Rect};

use crate::animation::timeline::CardTransform;
use crate::foundation::geom::{Corner, corner_handles};
use crate::scene::model::{Avatar, Card, Scene};
use crate::text::layout::text_bbox;
use crate::text::measure::TextMeasure;

/// Pixel tolerance around a resize handle.
pub const HANDLE_TOLERANCE: f64 = 8.0;

/// Map a stage point into card-local coordinates, inverting the animated
/// center translation and uniform scale.
pub fn scene_to_local(card: &Card, at: &CardTransform, p: Point) -> Point {
    let cx = card.x + card.w / 2.0 + at.offset_x;
    let cy = card.y + card.h / 2.0 + at.offset_y;
    Point::new(
        (p.x - cx) / at.scale + card.w / 2.0,
        (p.y - cy) / at.scale + card.h / 2.0,
    )
}

/// Map a card-local point into stage coordinates. `None` bypasses the
/// animation transform entirely (the static card), which editor placement
/// relies on.
pub fn local_to_scene(card: &Card, at: Option<&CardTransform>, p: Point) -> Point {
    let id = CardTransform::default();
    let at = at.unwrap_or(&id);
    let cx = card.x + card.w / 2.0 + at.offset_x;
    let cy = card.y + card.h / 2.0 + at.offset_y;
    Point::new(
        (p.x - card.w / 2.0) * at.scale + cx,
        (p.y - card.h / 2.0) * at.scale + cy,
    )
}

/// Avatar square in card-local coordinates: padding inset plus user offsets,
/// vertically centered in the content area.
pub fn avatar_rect(card: &Card, avatar: &Avatar) -> Rect {
    let pad = card.padding;
    let x = pad + avatar.off_x;
    let y = pad + avatar.off_y + (card.content_h() - avatar.size) / 2.0;
    Rect::new(x, y, x + avatar.size, y + avatar.size)
}

#[derive(Clone, Debug, PartialEq)]
pub enum Hit {
    Handle(Corner),
    Text(String),
    Avatar,
    Card,
    Miss,
}

/// What a card-local point lands on. Handles win over everything; text runs
/// are tested back to front so later runs stack on top; then the avatar,
/// then the card body.
pub fn hit_test(scene: &Scene, measure: &dyn TextMeasure, local: Point) -> Hit {
    let card = &scene.card;

    for (corner, p) in corner_handles(card.w, card.h) {
        if (local.x - p.x).abs() <= HANDLE_TOLERANCE && (local.y - p.y).abs() <= HANDLE_TOLERANCE {
            return Hit::Handle(corner);
        }
    }

    let pad = card.padding;
    for run in scene.texts.iter().rev() {
        let bb = text_bbox(run, card.content_w(), measure);
        let r = Rect::new(pad + bb.x0, pad + bb.y0, pad + bb.x1, pad + bb.y1);
        if r.contains(local) {
            return Hit::Text(run.id.clone());
        }
    }

    if avatar_rect(card, &scene.avatar).contains(local) {
        return Hit::Avatar;
    }

    if local.x >= 0.0 && local.y >= 0.0 && local.x <= card.w && local.y <= card.h {
        return Hit::Card;
    }

    Hit::Miss
}
