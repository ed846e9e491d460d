//! Pushmock is the engine behind an animated push-notification mockup
//! editor.
//!
//! It models a phone-sized stage with one notification card (avatar plus
//! freely positioned text runs), animates the card along a six-phase
//! timeline, and turns any instant of that timeline into a backend-agnostic
//! draw plan.
//!
//! # Pipeline overview
//!
//! 1. **Edit**: pointer gestures and the inline editor mutate a [`Scene`],
//!    guarded by a bounded undo [`History`]
//! 2. **Sample**: `AnimParams + seconds -> CardTransform` (pure timeline
//!    evaluation)
//! 3. **Compile**: `Scene + CardTransform -> FramePlan` (backend-agnostic
//!    draw ops)
//! 4. **Render/Encode** (optional): a [`RenderBackend`] turns plans into
//!    `FrameRgba` pixels, streamed to the system `ffmpeg` binary for MP4
//!    output
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: timeline sampling and frame compilation
//!   are pure for a given input.
//! - **Failure isolation**: collaborator errors (stores, encoders, image
//!   decodes) never leave the scene half-mutated.
#![forbid(unsafe_code)]

mod animation;
mod encode;
mod foundation;
mod interact;
mod persist;
mod render;
mod scene;
mod session;
mod text;
mod view;

pub use animation::ease::Ease;
pub use animation::timeline::{CardTransform, Phase, card_transform};
pub use encode::ffmpeg::{EncodeConfig, FfmpegEncoder, ffmpeg_available, transcode};
pub use foundation::error::{PushmockError, PushmockResult};
pub use foundation::geom::{
    Corner, corner_handles, format_hex_color, hex_color_or_white, parse_hex_color, rounded_rect,
};
pub use interact::controller::{
    CENTER_SNAP, DragMode, InteractionController, PointerAction, TEXT_SNAP,
};
pub use persist::store::{FsTemplateStore, TemplateMeta, TemplateStore};
pub use render::backend::{FrameRgba, RenderBackend};
pub use render::pipeline::{THUMB_H, THUMB_W, export_mp4, render_thumb};
pub use render::plan::{
    AvatarClip, DrawOp, FramePlan, GuideAxis, TextStyle, card_affine, compile_frame, compile_thumb,
};
pub use scene::history::{HISTORY_CAP, History};
pub use scene::model::{
    Align, AnimParams, Avatar, AvatarImage, AvatarShape, Card, Direction, Runtime, Scene,
    SelectTarget, Selection, Stage, TextRun, fresh_text_id,
};
pub use scene::snapshot::{SceneSnapshot, decode_avatar_payload, encode_avatar_payload};
pub use session::EditorSession;
pub use text::layout::{Token, WrappedLines, text_bbox, tokenize, wrap_line, wrap_text};
pub use text::markup::{Marker, Span, find_markers, parse_spans, strip_markup};
pub use text::measure::{FixedAdvanceMeasure, FontSpec, ParleyMeasure, TextMeasure};
pub use view::editor::{EditorPlacement, InlineEditor, MIN_EDITOR_H, MIN_EDITOR_W};
pub use view::transform::{
    HANDLE_TOLERANCE, Hit, avatar_rect, hit_test, local_to_scene, scene_to_local,
};
