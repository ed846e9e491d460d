use kurbo::Rect;

use crate::scene::model::TextRun;
use crate::text::markup::{find_markers, strip_markup};
use crate::text::measure::{FontSpec, TextMeasure};

/// One wrap token: a whitespace-delimited word, except that a blur marker is
/// atomic even when its inner text contains spaces. `raw` keeps the marker
/// syntax; `display` is what gets measured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub raw: String,
    pub display: String,
}

/// Split a single line into wrap tokens. Whitespace inside a well-formed
/// marker never splits.
pub fn tokenize(line: &str) -> Vec<Token> {
    let markers = find_markers(line);
    let in_marker = |i: usize| markers.iter().any(|m| i >= m.start && i < m.end);

    let mut out = Vec::new();
    let mut start: Option<usize> = None;
    for (i, ch) in line.char_indices() {
        if ch.is_whitespace() && !in_marker(i) {
            if let Some(s) = start.take() {
                out.push(&line[s..i]);
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        out.push(&line[s..]);
    }
    out.into_iter()
        .map(|raw| Token {
            raw: raw.to_string(),
            display: strip_markup(raw),
        })
        .collect()
}

/// Greedy word wrap of one logical line. Lines break before the word that
/// would exceed `max_w`, except that an overlong word keeps a line of its
/// own. Tokens re-join with single spaces; emitted lines keep the raw marker
/// syntax, widths use the display form.
pub fn wrap_line(line: &str, max_w: f64, font: &FontSpec, measure: &dyn TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    let mut raw = String::new();
    let mut display = String::new();
    for tok in tokenize(line) {
        let (test_raw, test_display) = if raw.is_empty() {
            (tok.raw.clone(), tok.display.clone())
        } else {
            (
                format!("{raw} {}", tok.raw),
                format!("{display} {}", tok.display),
            )
        };
        if measure.text_width(&test_display, font) > max_w && !raw.is_empty() {
            lines.push(std::mem::take(&mut raw));
            raw = tok.raw;
            display = tok.display;
        } else {
            raw = test_raw;
            display = test_display;
        }
    }
    if !raw.is_empty() {
        lines.push(raw);
    }
    lines
}

/// Wrap a full run text. `\n` splits hard lines first; a blank line stays as
/// one empty output line (it still takes a line-height of vertical space).
pub fn wrap_text(
    text: &str,
    max_w: f64,
    font: &FontSpec,
    measure: &dyn TextMeasure,
) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            out.push(String::new());
        } else {
            out.extend(wrap_line(line, max_w, font, measure));
        }
    }
    out
}

/// Lazy iterator form of [`wrap_text`]: wraps one hard line at a time.
pub struct WrappedLines<'a> {
    hard: std::str::Split<'a, char>,
    pending: std::vec::IntoIter<String>,
    max_w: f64,
    font: FontSpec,
    measure: &'a dyn TextMeasure,
}

impl<'a> WrappedLines<'a> {
    pub fn new(text: &'a str, max_w: f64, font: FontSpec, measure: &'a dyn TextMeasure) -> Self {
        Self {
            hard: text.split('\n'),
            pending: Vec::new().into_iter(),
            max_w,
            font,
            measure,
        }
    }
}

impl Iterator for WrappedLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.pending.next() {
                return Some(line);
            }
            let hard = self.hard.next()?;
            if hard.trim().is_empty() {
                return Some(String::new());
            }
            self.pending = wrap_line(hard, self.max_w, &self.font, self.measure).into_iter();
        }
    }
}

/// Bounding box of a wrapped run in content-local coordinates. Width is the
/// widest display line (at least 1), height is line count times line step
/// (at least 1). The wrap budget is what remains of the content width right
/// of the run.
pub fn text_bbox(run: &TextRun, content_w: f64, measure: &dyn TextMeasure) -> Rect {
    let font = FontSpec::of_run(run);
    let max_w = (content_w - run.x).max(1.0);
    let lines = wrap_text(&run.text, max_w, &font, measure);
    let w = lines
        .iter()
        .map(|l| measure.text_width(&strip_markup(l), &font))
        .fold(1.0, f64::max);
    let h = (lines.len() as f64 * run.size * run.line).max(1.0);
    Rect::new(run.x, run.y, run.x + w, run.y + h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::model::{Align, TextRun};
    use crate::text::measure::FixedAdvanceMeasure;

    fn font() -> FontSpec {
        FontSpec {
            family: "Inter".into(),
            weight: 400,
            size: 10.0,
        }
    }

    fn run(text: &str) -> TextRun {
        TextRun {
            id: "t1".into(),
            text: text.into(),
            x: 0.0,
            y: 0.0,
            family: "Inter".into(),
            weight: 400,
            size: 10.0,
            color: "#111111".into(),
            align: Align::Left,
            line: 1.0,
            blur_intensity: 10,
        }
    }

    // FixedAdvanceMeasure at size 10: every char is 6 units wide.
    const M: FixedAdvanceMeasure = FixedAdvanceMeasure { advance: 0.6 };

    #[test]
    fn short_text_stays_on_one_line() {
        assert_eq!(wrap_line("ab cd", 1000.0, &font(), &M), vec!["ab cd"]);
    }

    #[test]
    fn breaks_before_overflowing_word() {
        // "aaa bbb" is 42 units; budget 40 forces a break.
        assert_eq!(wrap_line("aaa bbb", 40.0, &font(), &M), vec!["aaa", "bbb"]);
    }

    #[test]
    fn overlong_word_keeps_its_own_line() {
        let lines = wrap_line("supercalifragilistic ok", 30.0, &font(), &M);
        assert_eq!(lines, vec!["supercalifragilistic", "ok"]);
    }

    #[test]
    fn marker_is_never_split() {
        // Display "hidden words" (12 chars); raw keeps the marker whole even
        // though its inner text has a space and overflows the budget.
        let lines = wrap_line("x [hidden words:30] y", 40.0, &font(), &M);
        assert!(lines.iter().any(|l| l.contains("[hidden words:30]")));
        for l in &lines {
            assert!(!l.contains("hidden words:30]") || l.contains("[hidden words:30]"));
        }
    }

    #[test]
    fn marker_measured_at_inner_width() {
        // Inner "ab" is 12 units wide; the 7-char raw marker would be 42.
        let lines = wrap_line("cd [ab:5]", 40.0, &font(), &M);
        assert_eq!(lines, vec!["cd [ab:5]"]);
    }

    #[test]
    fn multiple_spaces_collapse_on_rejoin() {
        assert_eq!(wrap_line("a    b", 1000.0, &font(), &M), vec!["a b"]);
    }

    #[test]
    fn blank_lines_are_preserved() {
        let lines = wrap_text("top\n\nbottom", 1000.0, &font(), &M);
        assert_eq!(lines, vec!["top", "", "bottom"]);
    }

    #[test]
    fn iterator_matches_eager_form() {
        let text = "one two three\n\nfour five six seven";
        let eager = wrap_text(text, 50.0, &font(), &M);
        let lazy: Vec<String> = WrappedLines::new(text, 50.0, font(), &M).collect();
        assert_eq!(eager, lazy);
    }

    #[test]
    fn bbox_ignores_marker_syntax() {
        let marked = text_bbox(&run("see [ab:40]"), 1000.0, &M);
        let plain = text_bbox(&run("see ab"), 1000.0, &M);
        assert_eq!(marked, plain);
    }

    #[test]
    fn bbox_has_minimum_dims() {
        let b = text_bbox(&run(""), 1000.0, &M);
        assert!(b.width() >= 1.0);
        assert!(b.height() >= 1.0);
    }

    #[test]
    fn bbox_counts_wrapped_lines() {
        let mut r = run("aaa bbb");
        r.line = 1.5;
        // Budget 40 wraps to two lines; step = 10 * 1.5.
        let b = text_bbox(&r, 40.0, &M);
        assert_eq!(b.height(), 30.0);
        assert_eq!(b.width(), 18.0);
    }
}
