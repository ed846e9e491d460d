use kurbo::{Affine, BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

use crate::animation::timeline::CardTransform;
use crate::foundation::geom::{corner_handles, hex_color_or_white, rounded_rect};
use crate::scene::model::{Align, AvatarShape, Scene};
use crate::text::layout::{text_bbox, wrap_text};
use crate::text::markup::parse_spans;
use crate::text::measure::{FontSpec, TextMeasure};
use crate::view::transform::avatar_rect;

/// Text styling carried by a draw op.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub family: String,
    pub weight: u16,
    pub size: f64,
}

impl From<&FontSpec> for TextStyle {
    fn from(f: &FontSpec) -> Self {
        Self {
            family: f.family.clone(),
            weight: f.weight,
            size: f.size,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarClip {
    Circle,
    Rounded,
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideAxis {
    Vertical,
    Horizontal,
}

/// One backend-agnostic drawing instruction. `Background` and `CenterGuide`
/// are in stage space; everything else is under the plan's card transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    Background {
        color: [u8; 3],
        alpha: f64,
    },
    CardBody {
        path: BezPath,
        color: [u8; 3],
        opacity: f64,
        shadow_blur: f64,
        shadow_alpha: f64,
        shadow_offset_y: f64,
    },
    AvatarImage {
        rect: Rect,
        clip: AvatarClip,
        clip_radius: f64,
    },
    AvatarPlaceholder {
        rect: Rect,
    },
    Text {
        pos: Point,
        style: TextStyle,
        color: [u8; 3],
        blur_px: Option<f64>,
        text: String,
    },
    CardOutline {
        path: BezPath,
    },
    HandleDot {
        center: Point,
    },
    AvatarOutline {
        rect: Rect,
    },
    TextOutline {
        rect: Rect,
    },
    CenterGuide {
        axis: GuideAxis,
    },
}

/// Everything a backend needs to draw one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FramePlan {
    pub width: f64,
    pub height: f64,
    /// Maps card-local coordinates into stage coordinates.
    pub card_affine: Affine,
    pub ops: Vec<DrawOp>,
}

/// Card-local group transform for an animation sample: translate to the
/// animated center, scale uniformly, re-origin at the card's top-left.
pub fn card_affine(scene: &Scene, at: &CardTransform) -> Affine {
    let card = &scene.card;
    Affine::translate((
        card.x + card.w / 2.0 + at.offset_x,
        card.y + card.h / 2.0 + at.offset_y,
    )) * Affine::scale(at.scale)
        * Affine::translate((-card.w / 2.0, -card.h / 2.0))
}

/// Compile the scene at one animation sample into a draw plan. Pure. The run
/// named by `editing` is left out (the live editor covers it); editing
/// overlays appear only when neither recording nor previewing.
#[tracing::instrument(skip_all, fields(texts = scene.texts.len()))]
pub fn compile_frame(
    scene: &Scene,
    measure: &dyn TextMeasure,
    at: &CardTransform,
    editing: Option<&str>,
) -> FramePlan {
    let card = &scene.card;
    let mut ops = Vec::new();

    ops.push(DrawOp::Background {
        color: hex_color_or_white(&scene.stage.bg),
        alpha: scene.stage.bg_alpha.clamp(0.0, 1.0),
    });

    ops.push(DrawOp::CardBody {
        path: rounded_rect(0.0, 0.0, card.w, card.h, card.r),
        color: hex_color_or_white(&card.color),
        opacity: card.opacity,
        shadow_blur: card.shadow * at.shadow_factor,
        shadow_alpha: 0.35 * at.shadow_factor,
        shadow_offset_y: 2.0 * at.shadow_factor,
    });

    let av = avatar_rect(card, &scene.avatar);
    if scene.avatar.image.is_some() {
        ops.push(DrawOp::AvatarImage {
            rect: av,
            clip: match scene.avatar.shape {
                AvatarShape::Circle => AvatarClip::Circle,
                AvatarShape::Rounded => AvatarClip::Rounded,
                AvatarShape::Square => AvatarClip::Square,
            },
            clip_radius: scene.avatar.radius,
        });
    } else {
        ops.push(DrawOp::AvatarPlaceholder { rect: av });
    }

    for run in &scene.texts {
        if editing == Some(run.id.as_str()) {
            continue;
        }
        push_text_ops(&mut ops, scene, run, measure);
    }

    let chrome = !scene.runtime.recording && !scene.runtime.preview;
    if chrome {
        push_overlay_ops(&mut ops, scene, measure);
    }

    FramePlan {
        width: scene.stage.w,
        height: scene.stage.h,
        card_affine: card_affine(scene, at),
        ops,
    }
}

fn push_text_ops(
    ops: &mut Vec<DrawOp>,
    scene: &Scene,
    run: &crate::scene::model::TextRun,
    measure: &dyn TextMeasure,
) {
    let card = &scene.card;
    let pad = card.padding;
    let font = FontSpec::of_run(run);
    let color = hex_color_or_white(&run.color);
    let max_w = (card.content_w() - run.x).max(1.0);
    let lines = wrap_text(&run.text, max_w, &font, measure);

    let x = pad + run.x;
    let anchor = match run.align {
        Align::Left => x,
        Align::Center => x + max_w / 2.0,
        Align::Right => x + max_w,
    };
    let step = run.size * run.line;
    let mut y = pad + run.y;

    for line in &lines {
        if line.is_empty() {
            y += step;
            continue;
        }
        let spans = parse_spans(line);
        let total: f64 = spans
            .iter()
            .map(|s| measure.text_width(&s.text, &font))
            .sum();
        let mut cursor = match run.align {
            Align::Left => anchor,
            Align::Center => anchor - total / 2.0,
            Align::Right => anchor - total,
        };
        for span in spans {
            let w = measure.text_width(&span.text, &font);
            ops.push(DrawOp::Text {
                pos: Point::new(cursor, y),
                style: TextStyle::from(&font),
                color,
                blur_px: span.intensity.map(f64::from),
                text: span.text,
            });
            cursor += w;
        }
        y += step;
    }
}

fn push_overlay_ops(ops: &mut Vec<DrawOp>, scene: &Scene, measure: &dyn TextMeasure) {
    let card = &scene.card;
    ops.push(DrawOp::CardOutline {
        path: rounded_rect(0.0, 0.0, card.w, card.h, (card.r - 1.0).max(0.0)),
    });
    for (_, p) in corner_handles(card.w, card.h) {
        ops.push(DrawOp::HandleDot { center: p });
    }
    let av = avatar_rect(card, &scene.avatar);
    ops.push(DrawOp::AvatarOutline { rect: av.inflate(1.0, 1.0) });

    if let Some(run) = scene.selected_text() {
        let bb = text_bbox(run, card.content_w(), measure);
        ops.push(DrawOp::TextOutline { rect: bb });
    }

    // Center guides only while the card is near-centered, mirroring the
    // move snap threshold.
    let center = card.center();
    if (center.x - scene.stage.w / 2.0).abs() < crate::interact::controller::CENTER_SNAP {
        ops.push(DrawOp::CenterGuide {
            axis: GuideAxis::Vertical,
        });
    }
    if (center.y - scene.stage.h / 2.0).abs() < crate::interact::controller::CENTER_SNAP {
        ops.push(DrawOp::CenterGuide {
            axis: GuideAxis::Horizontal,
        });
    }
}

/// Compile a template thumbnail: the static card scaled to fit a small dark
/// canvas, no animation, no editing chrome.
pub fn compile_thumb(scene: &Scene, measure: &dyn TextMeasure, w: f64, h: f64) -> FramePlan {
    let card = &scene.card;
    let scale = ((w - 20.0) / card.w).min((h - 20.0) / card.h);
    let affine = Affine::translate((w / 2.0, h / 2.0))
        * Affine::scale(scale)
        * Affine::translate((-card.w / 2.0, -card.h / 2.0));

    let mut still = scene.clone();
    still.runtime.recording = true;
    let mut plan = compile_frame(&still, measure, &CardTransform::default(), None);
    plan.width = w;
    plan.height = h;
    plan.card_affine = affine;
    if let Some(DrawOp::Background { color, alpha }) = plan.ops.first_mut() {
        *color = [0x0f, 0x12, 0x18];
        *alpha = 1.0;
    }
    plan
}
