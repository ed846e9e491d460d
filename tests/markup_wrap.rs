use pushmock::{
    FixedAdvanceMeasure, FontSpec, Scene, Span, parse_spans, strip_markup, text_bbox, wrap_line,
    wrap_text,
};

fn font() -> FontSpec {
    FontSpec {
        family: "Inter".into(),
        weight: 400,
        size: 10.0,
    }
}

// 6 units per char at size 10.
const M: FixedAdvanceMeasure = FixedAdvanceMeasure { advance: 0.6 };

#[test]
fn markup_roundtrip_through_spans() {
    let line = "before [secret one:15] middle [x:99] after";
    let spans = parse_spans(line);
    assert_eq!(spans.len(), 5);
    assert_eq!(
        spans[1],
        Span {
            text: "secret one".into(),
            intensity: Some(15)
        }
    );
    assert_eq!(spans[3].intensity, Some(99));
    assert_eq!(strip_markup(line), "before secret one middle x after");
}

#[test]
fn malformed_markers_survive_verbatim() {
    for line in ["[half open", "[:3]", "[a:b]", "no markers at all"] {
        assert_eq!(parse_spans(line), vec![Span { text: line.into(), intensity: None }]);
    }
}

#[test]
fn wrap_never_splits_inside_marker() {
    // Budget fits ~6 chars; inner "long hidden phrase" is far wider.
    let lines = wrap_line("a [long hidden phrase:20] b", 40.0, &font(), &M);
    let joined = lines.join("\n");
    assert!(joined.contains("[long hidden phrase:20]"));
    // The marker occupies one emitted line on its own.
    assert!(lines.iter().any(|l| l == "[long hidden phrase:20]"));
}

#[test]
fn wrap_measures_markers_at_display_width() {
    // Display "y ab" is 24 units; the raw "y [ab:50]" is 54. Budget 30
    // keeps it on one line because only the display width counts.
    let lines = wrap_line("y [ab:50]", 30.0, &font(), &M);
    assert_eq!(lines, vec!["y [ab:50]"]);
}

#[test]
fn hard_breaks_and_blank_lines() {
    let lines = wrap_text("one two\n\nthree", 1000.0, &font(), &M);
    assert_eq!(lines, vec!["one two", "", "three"]);
    // A whitespace-only line counts as blank.
    let lines = wrap_text("a\n   \nb", 1000.0, &font(), &M);
    assert_eq!(lines, vec!["a", "", "b"]);
}

#[test]
fn bbox_marker_equivalence_in_scene() {
    let mut scene = Scene::new();
    scene.texts[0].text = "watch [this:80]".into();
    let marked = text_bbox(&scene.texts[0], scene.card.content_w(), &M);
    scene.texts[0].text = "watch this".into();
    let plain = text_bbox(&scene.texts[0], scene.card.content_w(), &M);
    assert_eq!(marked, plain);
}

#[test]
fn wrapped_lines_stack_vertically() {
    let mut scene = Scene::new();
    scene.texts[0].text = "word ".repeat(30).trim_end().to_string();
    let bb = text_bbox(&scene.texts[0], scene.card.content_w(), &M);
    let one_line = scene.texts[0].size * scene.texts[0].line;
    assert!(bb.height() > one_line * 1.5);
    assert!(bb.width() <= (scene.card.content_w() - scene.texts[0].x).max(1.0));
}
