use std::cell::RefCell;
use std::collections::HashMap;

use crate::foundation::error::{PushmockError, PushmockResult};
use crate::scene::model::TextRun;

/// Font selection for measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16,
    pub size: f64,
}

impl FontSpec {
    pub fn of_run(run: &TextRun) -> Self {
        Self {
            family: run.family.clone(),
            weight: run.weight,
            size: run.size,
        }
    }
}

/// Measurement seam between the layout engine and whatever text stack the
/// host has. Widths are of display text (markup already stripped).
pub trait TextMeasure {
    fn text_width(&self, text: &str, font: &FontSpec) -> f64;
}

/// Deterministic measurer for headless use and tests: every char advances a
/// fixed fraction of the font size.
#[derive(Clone, Copy, Debug)]
pub struct FixedAdvanceMeasure {
    pub advance: f64,
}

impl Default for FixedAdvanceMeasure {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMeasure for FixedAdvanceMeasure {
    fn text_width(&self, text: &str, font: &FontSpec) -> f64 {
        text.chars().count() as f64 * self.advance * font.size
    }
}

/// Parley-backed measurer. Fonts are registered per family from raw bytes;
/// widths come from the shaped layout's widest line. Interior mutability
/// keeps the trait object `&self` for the layout engine.
pub struct ParleyMeasure {
    inner: RefCell<ParleyInner>,
}

struct ParleyInner {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<[u8; 4]>,
    families: HashMap<String, String>,
}

impl ParleyMeasure {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(ParleyInner {
                font_ctx: parley::FontContext::default(),
                layout_ctx: parley::LayoutContext::new(),
                families: HashMap::new(),
            }),
        }
    }

    /// Register font bytes under a logical family name used by text runs.
    pub fn register_family(&self, family: &str, font_bytes: &[u8]) -> PushmockResult<()> {
        let mut inner = self.inner.borrow_mut();
        let registered = inner
            .font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font_bytes.to_vec()), None);
        let family_id = registered
            .first()
            .map(|(id, _)| *id)
            .ok_or_else(|| PushmockError::layout("no font families registered from font bytes"))?;
        let resolved = inner
            .font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| PushmockError::layout("registered font family has no name"))?
            .to_string();
        inner.families.insert(family.to_string(), resolved);
        Ok(())
    }
}

impl Default for ParleyMeasure {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasure for ParleyMeasure {
    fn text_width(&self, text: &str, font: &FontSpec) -> f64 {
        if text.is_empty() {
            return 0.0;
        }
        let mut inner = self.inner.borrow_mut();
        let stack_name = inner
            .families
            .get(&font.family)
            .cloned()
            .unwrap_or_else(|| font.family.clone());
        let ParleyInner {
            font_ctx,
            layout_ctx,
            ..
        } = &mut *inner;
        let mut builder = layout_ctx.ranged_builder(font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(std::borrow::Cow::Owned(stack_name)),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(font.size as f32));
        builder.push_default(parley::style::StyleProperty::FontWeight(
            parley::style::FontWeight::new(font.weight as f32),
        ));
        let mut layout: parley::Layout<[u8; 4]> = builder.build(text);
        layout.break_all_lines(None);
        layout
            .lines()
            .map(|l| f64::from(l.metrics().advance))
            .fold(0.0, f64::max)
    }
}
