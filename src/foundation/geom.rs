use crate::foundation::error::{PushmockError, PushmockResult};

pub use kurbo::{BezPath, Point};

/// The four card resize-handle corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Tl,
    Tr,
    Bl,
    Br,
}

impl Corner {
    /// The diagonally opposite corner (the resize anchor).
    pub fn opposite(self) -> Self {
        match self {
            Self::Tl => Self::Br,
            Self::Tr => Self::Bl,
            Self::Bl => Self::Tr,
            Self::Br => Self::Tl,
        }
    }
}

/// Handle anchor points of a `w x h` rect at the origin, in corner order.
pub fn corner_handles(w: f64, h: f64) -> [(Corner, Point); 4] {
    [
        (Corner::Tl, Point::new(0.0, 0.0)),
        (Corner::Tr, Point::new(w, 0.0)),
        (Corner::Bl, Point::new(0.0, h)),
        (Corner::Br, Point::new(w, h)),
    ]
}

/// Rounded-rect outline with quadratic corners. The radius is clamped into
/// `[0, min(w,h)/2]` so degenerate rects still produce a closed path.
pub fn rounded_rect(x: f64, y: f64, w: f64, h: f64, r: f64) -> BezPath {
    let rr = r.clamp(0.0, (w.min(h) / 2.0).max(0.0));
    let mut p = BezPath::new();
    p.move_to((x + rr, y));
    p.line_to((x + w - rr, y));
    p.quad_to((x + w, y), (x + w, y + rr));
    p.line_to((x + w, y + h - rr));
    p.quad_to((x + w, y + h), (x + w - rr, y + h));
    p.line_to((x + rr, y + h));
    p.quad_to((x, y + h), (x, y + h - rr));
    p.line_to((x, y + rr));
    p.quad_to((x, y), (x + rr, y));
    p.close_path();
    p
}

/// Parse `#rgb` or `#rrggbb` into RGB channels.
pub fn parse_hex_color(s: &str) -> PushmockResult<[u8; 3]> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => {
            return Err(PushmockError::validation(format!(
                "invalid hex color '{s}'"
            )));
        }
    };
    let n = u32::from_str_radix(&expanded, 16)
        .map_err(|_| PushmockError::validation(format!("invalid hex color '{s}'")))?;
    Ok([(n >> 16) as u8, (n >> 8) as u8, n as u8])
}

/// Parse a hex color, falling back to white on malformed input (the editor
/// never hard-fails on a color field).
pub fn hex_color_or_white(s: &str) -> [u8; 3] {
    parse_hex_color(s).unwrap_or([255, 255, 255])
}

pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}
