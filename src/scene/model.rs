use serde::{Deserialize, Deserializer, Serialize};

use crate::foundation::error::{PushmockError, PushmockResult};

/// The output canvas: a phone-sized stage the card animates across.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stage {
    pub w: f64,
    pub h: f64,
    pub bg: String,
    pub bg_alpha: f64,
    pub preview_scale: f64,
}

impl Default for Stage {
    fn default() -> Self {
        Self {
            w: 1080.0,
            h: 1920.0,
            bg: "#09c35a".into(),
            bg_alpha: 1.0,
            preview_scale: 0.33,
        }
    }
}

/// The notification card. `x`/`y` are the static top-left in stage
/// coordinates; animation offsets are applied on top at render time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Card {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub r: f64,
    pub color: String,
    pub opacity: f64,
    pub shadow: f64,
    pub padding: f64,
}

impl Card {
    pub const MIN_W: f64 = 200.0;
    pub const MIN_H: f64 = 120.0;

    /// Card center in stage coordinates.
    pub fn center(&self) -> kurbo::Point {
        kurbo::Point::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Width of the padding-inset content area.
    pub fn content_w(&self) -> f64 {
        self.w - self.padding * 2.0
    }

    pub fn content_h(&self) -> f64 {
        self.h - self.padding * 2.0
    }
}

impl Default for Card {
    fn default() -> Self {
        Self {
            x: 60.0,
            y: 160.0,
            w: 960.0,
            h: 180.0,
            r: 20.0,
            color: "#ffffff".into(),
            opacity: 1.0,
            shadow: 18.0,
            padding: 20.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarShape {
    Circle,
    Rounded,
    Square,
}

/// Avatar slot in the card's leading column. The decoded RGBA image is a
/// runtime handle; `payload` (base64 PNG) is the stable persisted form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Avatar {
    pub shape: AvatarShape,
    pub radius: f64,
    pub size: f64,
    pub off_x: f64,
    pub off_y: f64,
    #[serde(skip)]
    pub image: Option<AvatarImage>,
    #[serde(rename = "dataURL", skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Default for AvatarShape {
    fn default() -> Self {
        Self::Rounded
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Decoded avatar pixels, kept out of the wire format.
#[derive(Clone, Debug, PartialEq)]
pub struct AvatarImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl Avatar {
    pub fn seeded() -> Self {
        Self {
            shape: AvatarShape::Rounded,
            radius: 18.0,
            size: 120.0,
            off_x: 0.0,
            off_y: 0.0,
            image: None,
            payload: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

/// One independently positioned text block. `x`/`y` are relative to the
/// card's content origin (the padding inset).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRun {
    pub id: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub family: String,
    #[serde(deserialize_with = "de_weight")]
    pub weight: u16,
    pub size: f64,
    pub color: String,
    pub align: Align,
    pub line: f64,
    #[serde(default = "default_blur_intensity")]
    pub blur_intensity: u8,
}

fn default_blur_intensity() -> u8 {
    10
}

// Older templates carry font weights as strings ("700").
fn de_weight<'de, D: Deserializer<'de>>(d: D) -> Result<u16, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum W {
        Num(u16),
        Str(String),
    }
    match W::deserialize(d)? {
        W::Num(n) => Ok(n),
        W::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

/// Timeline parameters, all durations in seconds. Missing fields fall back
/// to the seeded timeline so older snapshots keep loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimParams {
    pub before_start: f64,
    pub delay: f64,
    #[serde(rename = "in")]
    pub enter: f64,
    pub hold: f64,
    #[serde(rename = "out")]
    pub exit: f64,
    pub after_end: f64,
    pub in_direction: Direction,
    pub out_direction: Direction,
    pub press_on: bool,
    pub press_at: f64,
    pub press_dur: f64,
    pub press_depth: f64,
}

impl Default for AnimParams {
    fn default() -> Self {
        Self {
            before_start: 0.0,
            delay: 0.0,
            enter: 0.6,
            hold: 1.4,
            exit: 0.6,
            after_end: 1.0,
            in_direction: Direction::Top,
            out_direction: Direction::Top,
            press_on: true,
            press_at: 1.0,
            press_dur: 0.18,
            press_depth: 0.06,
        }
    }
}

/// Playback flags. Never persisted; reset on restore.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Runtime {
    pub playing: bool,
    pub recording: bool,
    pub preview: bool,
    pub started_at: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectTarget {
    Card,
    Avatar,
    Text,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub target: Option<SelectTarget>,
    pub text_id: Option<String>,
}

impl Selection {
    pub fn clear(&mut self) {
        self.target = None;
        self.text_id = None;
    }
}

/// The whole editable document.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub stage: Stage,
    pub card: Card,
    pub avatar: Avatar,
    pub texts: Vec<TextRun>,
    pub anim: AnimParams,
    pub runtime: Runtime,
    pub selection: Selection,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// A fresh scene with the seeded three-run layout.
    pub fn new() -> Self {
        Self {
            stage: Stage::default(),
            card: Card::default(),
            avatar: Avatar::seeded(),
            texts: vec![
                TextRun {
                    id: fresh_text_id(),
                    text: "New message".into(),
                    x: 140.0,
                    y: 26.0,
                    family: "Inter".into(),
                    weight: 700,
                    size: 44.0,
                    color: "#111111".into(),
                    align: Align::Left,
                    line: 1.1,
                    blur_intensity: 10,
                },
                TextRun {
                    id: fresh_text_id(),
                    text: "Short notification preview".into(),
                    x: 140.0,
                    y: 76.0,
                    family: "Inter".into(),
                    weight: 400,
                    size: 30.0,
                    color: "#333333".into(),
                    align: Align::Left,
                    line: 1.15,
                    blur_intensity: 10,
                },
                TextRun {
                    id: fresh_text_id(),
                    text: "now".into(),
                    x: 140.0,
                    y: 128.0,
                    family: "Inter".into(),
                    weight: 600,
                    size: 26.0,
                    color: "#1b7ae0".into(),
                    align: Align::Left,
                    line: 1.1,
                    blur_intensity: 10,
                },
            ],
            anim: AnimParams::default(),
            runtime: Runtime::default(),
            selection: Selection::default(),
        }
    }

    /// Keep the card inside the stage. When the card fits on an axis the
    /// position clamps into `[0, stage − card]`; an oversized card centers on
    /// that axis instead. Idempotent.
    pub fn clamp(&mut self) {
        let (sw, sh) = (self.stage.w, self.stage.h);
        let c = &mut self.card;
        c.x = if c.w <= sw {
            c.x.clamp(0.0, sw - c.w)
        } else {
            (sw - c.w) / 2.0
        };
        c.y = if c.h <= sh {
            c.y.clamp(0.0, sh - c.h)
        } else {
            (sh - c.h) / 2.0
        };
    }

    /// Change output dimensions. Text-run coordinates are card-local and do
    /// not move; only the card position re-clamps.
    pub fn resize_stage(&mut self, w: f64, h: f64) {
        self.stage.w = w;
        self.stage.h = h;
        self.clamp();
    }

    pub fn text(&self, id: &str) -> Option<&TextRun> {
        self.texts.iter().find(|t| t.id == id)
    }

    pub fn text_mut(&mut self, id: &str) -> Option<&mut TextRun> {
        self.texts.iter_mut().find(|t| t.id == id)
    }

    /// The selected run, falling back to the first run so style controls
    /// always have a target.
    pub fn selected_text(&self) -> Option<&TextRun> {
        match &self.selection.text_id {
            Some(id) => self.text(id),
            None => self.texts.first(),
        }
    }

    pub fn selected_text_mut(&mut self) -> Option<&mut TextRun> {
        match self.selection.text_id.clone() {
            Some(id) => self.text_mut(&id),
            None => self.texts.first_mut(),
        }
    }

    /// Append a run at `(x, y)` in content-local coordinates with the
    /// default new-text styling. Returns its id.
    pub fn add_text(&mut self, x: f64, y: f64) -> String {
        let id = fresh_text_id();
        self.texts.push(TextRun {
            id: id.clone(),
            text: "Text".into(),
            x,
            y,
            family: "Inter".into(),
            weight: 600,
            size: 34.0,
            color: "#111111".into(),
            align: Align::Left,
            line: 1.1,
            blur_intensity: 10,
        });
        id
    }

    pub fn remove_text(&mut self, id: &str) -> bool {
        let before = self.texts.len();
        self.texts.retain(|t| t.id != id);
        if self.selection.text_id.as_deref() == Some(id) {
            self.selection.clear();
        }
        self.texts.len() != before
    }

    pub fn set_avatar_image(&mut self, image: AvatarImage, payload: String) {
        self.avatar.image = Some(image);
        self.avatar.payload = Some(payload);
    }

    pub fn clear_avatar(&mut self) {
        self.avatar.image = None;
        self.avatar.payload = None;
    }

    pub fn validate(&self) -> PushmockResult<()> {
        if !(self.stage.w > 0.0 && self.stage.h > 0.0) {
            return Err(PushmockError::validation(format!(
                "stage dimensions must be positive, got {}x{}",
                self.stage.w, self.stage.h
            )));
        }
        if !(0.0..=1.0).contains(&self.stage.bg_alpha) {
            return Err(PushmockError::validation(format!(
                "stage bgAlpha must be in [0,1], got {}",
                self.stage.bg_alpha
            )));
        }
        if self.stage.preview_scale <= 0.0 {
            return Err(PushmockError::validation(
                "stage previewScale must be positive",
            ));
        }
        if !(self.card.w > 0.0 && self.card.h > 0.0) {
            return Err(PushmockError::validation(format!(
                "card dimensions must be positive, got {}x{}",
                self.card.w, self.card.h
            )));
        }
        if !(0.0..=1.0).contains(&self.card.opacity) {
            return Err(PushmockError::validation(format!(
                "card opacity must be in [0,1], got {}",
                self.card.opacity
            )));
        }
        crate::foundation::geom::parse_hex_color(&self.stage.bg)?;
        crate::foundation::geom::parse_hex_color(&self.card.color)?;
        for t in &self.texts {
            if t.size <= 0.0 || t.line <= 0.0 {
                return Err(PushmockError::validation(format!(
                    "text run '{}' has non-positive size or line height",
                    t.id
                )));
            }
            if !(1..=100).contains(&t.blur_intensity) {
                return Err(PushmockError::validation(format!(
                    "text run '{}' blurIntensity must be in [1,100], got {}",
                    t.id, t.blur_intensity
                )));
            }
        }
        self.anim.validate()?;
        Ok(())
    }
}

/// Generate a `t`-prefixed id unique within a process.
pub fn fresh_text_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("t{:x}", nanos ^ (n << 48 | n))
}
