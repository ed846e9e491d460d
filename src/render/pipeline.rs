use std::path::Path;

use base64::Engine as _;

use crate::animation::timeline::card_transform;
use crate::encode::ffmpeg::{EncodeConfig, FfmpegEncoder};
use crate::foundation::error::{PushmockError, PushmockResult};
use crate::foundation::geom::hex_color_or_white;
use crate::render::backend::RenderBackend;
use crate::render::plan::{compile_frame, compile_thumb};
use crate::scene::model::Scene;
use crate::text::measure::TextMeasure;

pub const THUMB_W: u32 = 480;
pub const THUMB_H: u32 = 270;

/// Trailing still appended after the timeline so the last frame lands.
const EXPORT_TAIL_SECS: f64 = 0.1;

/// Render the whole animation to an MP4 file. Frames are compiled without
/// editing chrome, rasterized by the backend and streamed straight into
/// ffmpeg.
#[tracing::instrument(skip(scene, measure, backend), fields(fps))]
pub fn export_mp4(
    scene: &Scene,
    measure: &dyn TextMeasure,
    backend: &mut dyn RenderBackend,
    fps: u32,
    out_path: &Path,
) -> PushmockResult<()> {
    scene.validate()?;
    if fps == 0 {
        return Err(PushmockError::encode("export fps must be non-zero"));
    }

    let cfg = EncodeConfig::for_stage(&scene.stage, fps, out_path);
    let mut encoder = FfmpegEncoder::new(cfg, hex_color_or_white(&scene.stage.bg))?;

    let mut still = scene.clone();
    still.runtime.recording = true;
    still.runtime.playing = true;

    let duration = still.anim.total() + EXPORT_TAIL_SECS;
    let frames = (duration * f64::from(fps)).ceil() as u64;
    tracing::debug!(frames, duration, "export start");

    for i in 0..frames {
        let t = i as f64 / f64::from(fps);
        let (at, _) = card_transform(&still.anim, &still.card, &still.stage, t);
        let plan = compile_frame(&still, measure, &at, None);
        let frame = backend.render_plan(&plan)?;
        encoder.encode_frame(&frame)?;
    }

    encoder.finish()
}

/// Rasterize a small static preview of the card and return it as a PNG data
/// URL, the form the template store keeps.
pub fn render_thumb(
    scene: &Scene,
    measure: &dyn TextMeasure,
    backend: &mut dyn RenderBackend,
) -> PushmockResult<String> {
    let plan = compile_thumb(scene, measure, f64::from(THUMB_W), f64::from(THUMB_H));
    let frame = backend.render_plan(&plan)?;
    let buf = image::RgbaImage::from_raw(frame.width, frame.height, frame.data)
        .ok_or_else(|| PushmockError::encode("thumbnail frame has wrong buffer length"))?;
    let mut png = Vec::new();
    buf.write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| PushmockError::encode(format!("thumbnail png encode failed: {e}")))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(format!("data:image/png;base64,{b64}"))
}
