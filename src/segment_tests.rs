use super::*;

#[test]
fn empty_segments_have_one_entry_to_edit() {
    let Segment::Line {
        content, solution, ..
    } = SegmentKind::Line.empty_segment()
    else {
        panic!("expected line segment");
    };
    assert_eq!(content.len(), 1);
    assert_eq!(solution.len(), 1);

    let Segment::Check { content, solution } = SegmentKind::Check.empty_segment() else {
        panic!("expected check segment");
    };
    assert_eq!(content, vec![Entry::default()]);
    assert!(!solution);
}

#[test]
fn text_flavours_report_their_kind() {
    assert_eq!(Segment::text("a").kind(), SegmentKind::Text);
    assert_eq!(Segment::source("fn main() {}").kind(), SegmentKind::Source);
    assert_eq!(Segment::comment("note").kind(), SegmentKind::Comment);
    assert_eq!(SegmentKind::Comment.empty_segment().kind(), SegmentKind::Comment);
}

#[test]
fn kinds_accept_matching_variants_only() {
    assert!(SegmentKind::Source.accepts(&Segment::text("x")));
    assert!(SegmentKind::Check.accepts(&Segment::check(["2+2"], true)));
    assert!(!SegmentKind::Radio.accepts(&Segment::check(["2+2"], true)));
    assert!(!SegmentKind::Line.accepts(&Segment::text("x")));
}

#[test]
fn line_count_treats_empty_text_as_one_line() {
    assert_eq!(line_count(""), 1);
    assert_eq!(line_count("a\nb\nc"), 3);
    assert_eq!(Entry::new("x\n").line_count(), 2);
}

#[test]
fn fields_follow_display_order() {
    let segment = Segment::Line {
        content: vec![Entry::new("a"), Entry::new("b")],
        answer: Entry::default(),
        solution: vec![Entry::new("x"), Entry::new("y")],
    };
    assert_eq!(
        segment.fields(),
        vec![
            FieldRef::Entry(0),
            FieldRef::Entry(1),
            FieldRef::Answer,
            FieldRef::Solution(0),
            FieldRef::Solution(1),
        ]
    );
    assert_eq!(
        Segment::check(["q"], false).fields(),
        vec![FieldRef::Entry(0), FieldRef::Flag]
    );
    assert_eq!(SegmentKind::Radio.empty_segment().fields().len(), RADIO_OPTIONS);
}

#[test]
fn set_field_text_reports_changes() {
    let mut segment = Segment::text("Hello");
    assert!(!segment.set_field_text(FieldRef::Body, "Hello"));
    assert!(segment.set_field_text(FieldRef::Body, "Hello, world"));
    assert_eq!(segment.field_text(FieldRef::Body), Some("Hello, world"));
    assert!(!segment.set_field_text(FieldRef::Answer, "nope"));
}

#[test]
fn option_labels_are_editable() {
    let mut segment = SegmentKind::Multi.empty_segment();
    assert!(segment.set_field_text(FieldRef::Option(2), "Blue"));
    assert_eq!(segment.field_text(FieldRef::Option(2)), Some("Blue"));
    assert!(!segment.set_field_text(FieldRef::Option(MULTI_OPTIONS), "Out of range"));
    assert_eq!(segment.field_kind(FieldRef::Option(2)), None);
}

#[test]
fn toggling_kind_switches_between_text_and_source() {
    let mut segment = Segment::text("print(1)");
    assert!(segment.toggle_field_kind(FieldRef::Body));
    assert_eq!(segment.kind(), SegmentKind::Source);
    assert!(segment.toggle_field_kind(FieldRef::Body));
    assert_eq!(segment.kind(), SegmentKind::Text);
    assert!(!segment.toggle_field_kind(FieldRef::Flag));
}

#[test]
fn radio_marks_exactly_one_option() {
    let mut segment = SegmentKind::Radio.empty_segment();
    assert!(segment.is_marked(FieldRef::Option(0)));
    assert!(segment.toggle_mark(FieldRef::Option(3)));
    assert!(segment.is_marked(FieldRef::Option(3)));
    assert!(!segment.is_marked(FieldRef::Option(0)));
    assert!(!segment.toggle_mark(FieldRef::Option(3)));
}

#[test]
fn multi_marks_toggle_independently() {
    let mut segment = SegmentKind::Multi.empty_segment();
    assert!(segment.toggle_mark(FieldRef::Option(1)));
    assert!(segment.toggle_mark(FieldRef::Option(2)));
    assert!(segment.toggle_mark(FieldRef::Option(1)));
    let Segment::Multi { selected, .. } = &segment else {
        panic!("expected multi segment");
    };
    assert_eq!(selected.iter().copied().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn check_flag_flips() {
    let mut segment = Segment::check(["2+2"], false);
    assert!(segment.toggle_mark(FieldRef::Flag));
    assert!(segment.is_marked(FieldRef::Flag));
}

#[test]
fn the_last_entry_is_never_removed() {
    let mut segment = Segment::check(["a"], false);
    assert!(!segment.remove_entry());
    assert_eq!(segment.add_entry(), Some(FieldRef::Entry(1)));
    assert!(segment.remove_entry());
    assert_eq!(segment.fields(), vec![FieldRef::Entry(0), FieldRef::Flag]);
    assert_eq!(Segment::text("x").add_entry(), None);
}

#[test]
fn solutions_can_grow_and_shrink() {
    let mut segment = SegmentKind::Line.empty_segment();
    assert_eq!(segment.add_solution(), Some(FieldRef::Solution(1)));
    assert!(segment.remove_solution(0));
    assert!(!segment.remove_solution(0));
}
