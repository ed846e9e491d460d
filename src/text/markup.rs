//! Inline blur markup: `[text:intensity]` spans inside a line. The marker
//! text may not contain `]` or `:`; the intensity is a decimal integer
//! clamped into [1,100]. Anything malformed stays literal. No nesting.

/// One run of a parsed line. `intensity` is `Some` for marked spans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub intensity: Option<u8>,
}

impl Span {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            intensity: None,
        }
    }
}

/// Byte range of one well-formed marker plus its parsed parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Marker {
    pub start: usize,
    pub end: usize,
    pub inner: String,
    pub intensity: u8,
}

/// Scan a line for well-formed `[text:intensity]` markers, left to right.
pub fn find_markers(line: &str) -> Vec<Marker> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        match try_marker(line, i) {
            Some(m) => {
                i = m.end;
                out.push(m);
            }
            None => i += 1,
        }
    }
    out
}

// A marker is `[` inner `:` digits `]` where inner is non-empty and free of
// `]`/`:`, and digits is a non-empty decimal run.
fn try_marker(line: &str, open: usize) -> Option<Marker> {
    let rest = &line[open + 1..];
    let colon = rest.find(':')?;
    let inner = &rest[..colon];
    if inner.is_empty() || inner.contains(']') {
        return None;
    }
    let after = &rest[colon + 1..];
    let digits_len = after.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits_len == 0 || !after[digits_len..].starts_with(']') {
        return None;
    }
    let intensity = after[..digits_len].parse::<u64>().unwrap_or(u64::MAX).clamp(1, 100) as u8;
    Some(Marker {
        start: open,
        end: open + 1 + colon + 1 + digits_len + 1,
        inner: inner.to_string(),
        intensity,
    })
}

/// Split a line into plain and blurred spans.
pub fn parse_spans(line: &str) -> Vec<Span> {
    let mut out = Vec::new();
    let mut cursor = 0;
    for m in find_markers(line) {
        if m.start > cursor {
            out.push(Span::plain(&line[cursor..m.start]));
        }
        out.push(Span {
            text: m.inner,
            intensity: Some(m.intensity),
        });
        cursor = m.end;
    }
    if cursor < line.len() {
        out.push(Span::plain(&line[cursor..]));
    }
    out
}

/// Display form of a line: marker syntax removed, inner text kept. This is
/// the measurement form; widths never include the bracket syntax.
pub fn strip_markup(line: &str) -> String {
    parse_spans(line).into_iter().map(|s| s.text).collect()
}
