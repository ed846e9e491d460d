use std::{
    io::Write as _,
    path::PathBuf,
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::foundation::error::{PushmockError, PushmockResult};
use crate::render::backend::FrameRgba;
use crate::scene::model::Stage;

/// Output geometry and timing for one export, derived from the stage. The
/// editor always overwrites its export target.
#[derive(Clone, Debug)]
pub struct EncodeConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub out_path: PathBuf,
}

impl EncodeConfig {
    pub fn for_stage(stage: &Stage, fps: u32, out_path: impl Into<PathBuf>) -> Self {
        Self {
            width: stage.w as u32,
            height: stage.h as u32,
            fps,
            out_path: out_path.into(),
        }
    }

    /// x264 with yuv420p output needs even frame dimensions.
    pub fn validate(&self) -> PushmockResult<()> {
        if self.width == 0 || self.height == 0 || self.fps == 0 {
            return Err(PushmockError::validation(format!(
                "export needs non-zero dimensions and fps, got {}x{} at {} fps",
                self.width, self.height, self.fps
            )));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(PushmockError::validation(format!(
                "stage dimensions must be even for yuv420p output, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Streams raw RGBA frames into a system `ffmpeg` child producing an H.264
/// MP4. Every frame is composited over the opaque stage background before it
/// leaves the process, so the clip never carries alpha. The system binary
/// avoids native FFmpeg dev header/lib requirements.
pub struct FfmpegEncoder {
    cfg: EncodeConfig,
    stage_bg: [u8; 3],
    child: Child,
    stdin: Option<ChildStdin>,
    scratch: Vec<u8>,
}

impl FfmpegEncoder {
    pub fn new(cfg: EncodeConfig, stage_bg: [u8; 3]) -> PushmockResult<Self> {
        cfg.validate()?;
        if let Some(parent) = cfg.out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                PushmockError::encode(format!(
                    "create output directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }
        if !ffmpeg_available() {
            return Err(PushmockError::encode(
                "ffmpeg is required for MP4 export, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .args([
                "-y",
                "-loglevel",
                "error",
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-s",
                &format!("{}x{}", cfg.width, cfg.height),
                "-r",
                &cfg.fps.to_string(),
                "-i",
                "pipe:0",
                "-an",
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "+faststart",
            ])
            .arg(&cfg.out_path);

        let mut child = cmd
            .spawn()
            .map_err(|e| PushmockError::encode(format!("spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PushmockError::encode("ffmpeg stdin pipe was not opened"))?;

        Ok(Self {
            scratch: vec![0u8; (cfg.width * cfg.height * 4) as usize],
            cfg,
            stage_bg,
            child,
            stdin: Some(stdin),
        })
    }

    pub fn encode_frame(&mut self, frame: &FrameRgba) -> PushmockResult<()> {
        if frame.width != self.cfg.width
            || frame.height != self.cfg.height
            || frame.data.len() != self.scratch.len()
        {
            return Err(PushmockError::validation(format!(
                "frame is {}x{} ({} bytes), export expects {}x{}",
                frame.width,
                frame.height,
                frame.data.len(),
                self.cfg.width,
                self.cfg.height
            )));
        }
        composite_over_stage(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.stage_bg,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PushmockError::encode("encoder is already finalized"));
        };
        stdin
            .write_all(&self.scratch)
            .map_err(|e| PushmockError::encode(format!("write frame to ffmpeg: {e}")))
    }

    /// Close the pipe and wait for ffmpeg to write the trailer.
    pub fn finish(mut self) -> PushmockResult<()> {
        drop(self.stdin.take());
        let output = self
            .child
            .wait_with_output()
            .map_err(|e| PushmockError::encode(format!("wait for ffmpeg: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PushmockError::encode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Re-container/transcode a finished clip (e.g. WebM capture) into MP4,
/// bytes in, bytes out, via scratch files. Leaves no state behind on
/// failure.
pub fn transcode(input: &[u8], input_ext: &str) -> PushmockResult<Vec<u8>> {
    if !ffmpeg_available() {
        return Err(PushmockError::encode(
            "ffmpeg is required for transcoding, but was not found on PATH",
        ));
    }

    let dir = tempfile::tempdir()
        .map_err(|e| PushmockError::encode(format!("create scratch dir: {e}")))?;
    let in_path = dir.path().join(format!("in.{input_ext}"));
    let out_path = dir.path().join("out.mp4");
    std::fs::write(&in_path, input)
        .map_err(|e| PushmockError::encode(format!("write scratch input: {e}")))?;

    let output = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(&in_path)
        .args([
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ])
        .arg(&out_path)
        .output()
        .map_err(|e| PushmockError::encode(format!("run ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PushmockError::encode(format!(
            "ffmpeg transcode exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    std::fs::read(&out_path)
        .map_err(|e| PushmockError::encode(format!("read transcoded output: {e}")))
}

/// Composite RGBA8 pixels over the opaque stage background, writing opaque
/// RGBA8. A premultiplied source only needs the weighted background added;
/// a straight source weights both terms.
fn composite_over_stage(
    dst: &mut [u8],
    src: &[u8],
    premultiplied: bool,
    bg: [u8; 3],
) -> PushmockResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(PushmockError::encode(
            "compositing expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let fg = u16::from(s[c]);
            let fg = if premultiplied { fg } else { scale8(fg, a) };
            d[c] = (fg + scale8(u16::from(bg[c]), inv)).min(255) as u8;
        }
        d[3] = 255;
    }
    Ok(())
}

// x * k / 255, rounded.
fn scale8(x: u16, k: u16) -> u16 {
    ((u32::from(x) * u32::from(k) + 127) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAGE_GREEN: [u8; 3] = [0x09, 0xc3, 0x5a];

    #[test]
    fn stage_config_rejects_odd_dimensions() {
        let mut stage = Stage::default();
        assert!(
            EncodeConfig::for_stage(&stage, 30, "out/clip.mp4")
                .validate()
                .is_ok()
        );
        stage.w = 1081.0;
        assert!(
            EncodeConfig::for_stage(&stage, 30, "out/clip.mp4")
                .validate()
                .is_err()
        );
        stage.w = 1080.0;
        assert!(
            EncodeConfig::for_stage(&stage, 0, "out/clip.mp4")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn translucent_pixels_blend_into_stage_green() {
        // Straight white at 50% alpha over the seeded stage background.
        let src = [255u8, 255, 255, 128];
        let mut dst = [0u8; 4];
        composite_over_stage(&mut dst, &src, false, STAGE_GREEN).unwrap();
        assert_eq!(dst, [132, 225, 173, 255]);
    }

    #[test]
    fn premultiplied_pixels_add_weighted_background() {
        let src = [64u8, 0, 0, 128];
        let mut dst = [0u8; 4];
        composite_over_stage(&mut dst, &src, true, [0, 0, 0]).unwrap();
        assert_eq!(dst, [64, 0, 0, 255]);
    }

    #[test]
    fn opaque_pixels_pass_through() {
        let src = [10u8, 20, 30, 255];
        let mut dst = [0u8; 4];
        composite_over_stage(&mut dst, &src, false, STAGE_GREEN).unwrap();
        assert_eq!(dst, src);
    }
}
