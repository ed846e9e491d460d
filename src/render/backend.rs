use crate::foundation::error::PushmockResult;
use crate::render::plan::FramePlan;

/// One rasterized frame, 4 bytes per pixel.
#[derive(Clone, Debug)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRgba {
    /// An opaque single-color frame; handy for backends and tests.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..(width * height) {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
            premultiplied: false,
        }
    }
}

/// Rasterization seam. The crate compiles scenes down to [`FramePlan`]s;
/// turning a plan into pixels is the host's concern.
pub trait RenderBackend {
    fn render_plan(&mut self, plan: &FramePlan) -> PushmockResult<FrameRgba>;
}
