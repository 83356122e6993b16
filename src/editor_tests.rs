use serde_json::{Value, json};

use super::*;
use crate::segment::Entry;

fn output_json(editor: &SegmentEditor) -> Value {
    serde_json::from_str(editor.output().value()).expect("output field holds JSON")
}

fn texts(editor: &SegmentEditor) -> Vec<String> {
    editor
        .views()
        .iter()
        .filter_map(|view| view.segment.field_text(FieldRef::Body))
        .map(str::to_string)
        .collect()
}

fn editor_with_texts(items: &[&str]) -> (SegmentEditor, Vec<SegmentId>) {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let ids = items
        .iter()
        .map(|text| editor.insert_segment(SegmentKind::Text, Some(Segment::text(*text))))
        .collect();
    (editor, ids)
}

#[test]
fn new_editor_holds_an_empty_task() {
    let editor = SegmentEditor::new(Encoding::Typed);
    assert_eq!(editor.output().name(), DEFAULT_FIELD_NAME);
    assert_eq!(output_json(&editor), json!({"segments": []}));
}

#[test]
fn insertion_order_is_serialized_order() {
    let (mut editor, ids) = editor_with_texts(&["A", "B", "C"]);
    let expected = json!({"segments": [
        {"type": "text", "content": "A"},
        {"type": "text", "content": "B"},
        {"type": "text", "content": "C"}
    ]});
    assert_eq!(output_json(&editor), expected);

    assert!(editor.remove_segment(ids[1]));
    assert_eq!(
        output_json(&editor),
        json!({"segments": [
            {"type": "text", "content": "A"},
            {"type": "text", "content": "C"}
        ]})
    );
}

#[test]
fn removal_is_terminal() {
    let (mut editor, ids) = editor_with_texts(&["A"]);
    assert!(editor.remove_segment(ids[0]));
    assert!(!editor.is_active(ids[0]));
    assert!(!editor.remove_segment(ids[0]));
    assert!(!editor.set_field(ids[0], FieldRef::Body, "edited after removal"));
    assert!(editor.is_empty());
}

#[test]
fn ids_are_not_reused_after_removal() {
    let (mut editor, ids) = editor_with_texts(&["A"]);
    editor.remove_segment(ids[0]);
    let fresh = editor.insert_segment(SegmentKind::Text, None);
    assert_ne!(fresh, ids[0]);
    assert_eq!(fresh.to_string(), "segment1");
}

#[test]
fn serialize_is_idempotent() {
    let (mut editor, _) = editor_with_texts(&["A", "B"]);
    let first = editor.serialize().to_string();
    let second = editor.serialize().to_string();
    assert_eq!(first, second);
}

#[test]
fn check_scenario_serializes_as_documented() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let id = editor.insert_segment(SegmentKind::Check, None);
    assert!(editor.set_field(id, FieldRef::Entry(0), "2+2"));
    assert!(editor.set_check_solution(id, true));
    assert_eq!(
        output_json(&editor)["segments"][0],
        json!({"type": "check", "content": [{"content": "2+2", "type": "text"}], "solution": true})
    );
}

#[test]
fn restore_renders_one_text_view() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let report =
        editor.restore(r#"{"segments":[{"type":"text","content":"Hello","type":"text"}]}"#);
    assert!(report.is_clean());
    assert_eq!(report.inserted.len(), 1);
    assert_eq!(editor.len(), 1);
    assert_eq!(editor.views()[0].segment.kind(), SegmentKind::Text);
    assert_eq!(texts(&editor), vec!["Hello".to_string()]);
}

#[test]
fn restore_then_serialize_round_trips() {
    let document = json!({"segments": [
        {"type": "text", "content": "Intro"},
        {"type": "source", "content": "print(2 + 2)"},
        {"type": "line",
         "content": [{"content": "Output:", "type": "text"}],
         "answer": {"content": "", "type": "text"},
         "solution": {"content": "4", "type": "text"}},
        {"type": "check", "content": [{"content": "2+2", "type": "text"}], "solution": true},
        {"type": "radio", "options": ["a", "b", "c", "d"], "solution": 2},
        {"type": "multi", "options": ["a", "b", "c", "d"], "solution": [0, 3]}
    ]});
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let report = editor.restore(&document.to_string());
    assert!(report.is_clean());
    assert_eq!(output_json(&editor), document);
}

#[test]
fn keyed_restore_round_trips() {
    let document = json!({"segments": [
        {"text": {"content": "Intro", "type": "text"}},
        {"comment": {"content": "for reviewers", "type": "text"}},
        {"input": {
            "content": [{"content": "x =", "type": "source"}],
            "answer": {"content": "", "type": "text"},
            "solution": {"content": "3", "type": "source"}
        }}
    ]});
    let mut editor = SegmentEditor::new(Encoding::Keyed);
    assert!(editor.restore(&document.to_string()).is_clean());
    assert_eq!(output_json(&editor), document);
}

#[test]
fn malformed_input_fails_closed() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let report = editor.restore("{\"segments\": [");
    assert_eq!(report.diagnostics.len(), 1);
    assert!(matches!(report.diagnostics[0].problem, TaskError::Malformed(_)));
    assert!(editor.is_empty());
    assert_eq!(output_json(&editor), json!({"segments": []}));
}

#[test]
fn blank_input_is_an_empty_task() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let report = editor.restore("   ");
    assert!(report.is_clean());
    assert_eq!(output_json(&editor), json!({"segments": []}));
}

#[test]
fn bad_segments_do_not_corrupt_the_rest() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let report = editor.restore(
        r#"{"segments":[{"type":"text","content":"A"},{"type":"slider"},{"type":"text","content":"C"}]}"#,
    );
    assert_eq!(report.inserted.len(), 2);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(texts(&editor), vec!["A".to_string(), "C".to_string()]);
}

#[test]
fn unknown_names_insert_nothing() {
    let mut editor = SegmentEditor::new(Encoding::Keyed);
    assert!(editor.insert_named("source", None).is_none());
    assert!(editor.insert_named("input", None).is_some());
    assert_eq!(editor.len(), 1);
    assert_eq!(editor.views()[0].segment.kind(), SegmentKind::Line);
}

#[test]
fn mismatched_initial_data_is_ignored() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let id = editor.insert_segment(SegmentKind::Check, Some(Segment::text("not a check")));
    assert_eq!(editor.segment(id), Some(&SegmentKind::Check.empty_segment()));
}

#[test]
fn reorder_follows_the_dropped_order() {
    let (mut editor, ids) = editor_with_texts(&["A", "B", "C"]);
    assert!(editor.reorder(&[ids[2], ids[0], ids[1]]));
    assert_eq!(texts(&editor), vec!["C", "A", "B"]);
    assert_eq!(output_json(&editor)["segments"][0]["content"], json!("C"));
}

#[test]
fn reorder_rejects_partial_or_repeated_orders() {
    let (mut editor, ids) = editor_with_texts(&["A", "B", "C"]);
    let before = editor.output().value().to_string();
    assert!(!editor.reorder(&[ids[0], ids[1]]));
    assert!(!editor.reorder(&[ids[0], ids[0], ids[1]]));
    editor.remove_segment(ids[2]);
    let after_removal = editor.output().value().to_string();
    assert_ne!(before, after_removal);
    assert!(!editor.reorder(&[ids[2], ids[0]]));
    assert_eq!(editor.output().value(), after_removal);
}

#[test]
fn move_up_and_down_shift_one_place() {
    let (mut editor, ids) = editor_with_texts(&["A", "B", "C"]);
    assert!(editor.move_up(ids[2]));
    assert_eq!(texts(&editor), vec!["A", "C", "B"]);
    assert!(!editor.move_up(ids[0]));
    assert!(editor.move_down(ids[0]));
    assert_eq!(texts(&editor), vec!["C", "A", "B"]);
    assert!(!editor.move_down(ids[1]));
    assert!(!editor.move_segment(ids[1], 99));
    assert!(editor.move_segment(ids[0], 99));
    assert_eq!(texts(&editor), vec!["C", "B", "A"]);
}

#[test]
fn field_edits_are_reflected_immediately() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let id = editor.insert_segment(SegmentKind::Line, None);
    assert_eq!(editor.add_entry(id), Some(FieldRef::Entry(1)));
    editor.set_field(id, FieldRef::Entry(1), "second");
    editor.set_field(id, FieldRef::Solution(0), "42");
    editor.toggle_field_kind(id, FieldRef::Solution(0));

    let segment = &output_json(&editor)["segments"][0];
    assert_eq!(segment["content"][1], json!({"content": "second", "type": "text"}));
    assert_eq!(segment["solution"], json!({"content": "42", "type": "source"}));

    assert!(editor.remove_entry(id));
    assert!(!editor.remove_entry(id));
    assert_eq!(editor.fields(id).len(), 3);
}

#[test]
fn unchanged_edits_do_not_count_as_mutations() {
    let (mut editor, ids) = editor_with_texts(&["A"]);
    assert!(!editor.set_field(ids[0], FieldRef::Body, "A"));
    assert!(!editor.set_check_solution(ids[0], true));
    assert!(!editor.select_radio(ids[0], 1));
}

#[test]
fn radio_and_multi_selection() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let radio = editor.insert_segment(SegmentKind::Radio, None);
    let multi = editor.insert_segment(SegmentKind::Multi, None);
    assert!(editor.select_radio(radio, 2));
    assert!(editor.toggle_multi(multi, 1));
    assert!(editor.toggle_multi(multi, 3));
    assert!(!editor.toggle_multi(radio, 1));

    let document = output_json(&editor);
    assert_eq!(document["segments"][0]["solution"], json!(2));
    assert_eq!(document["segments"][1]["solution"], json!([1, 3]));
}

#[test]
fn multiple_solutions_serialize_as_a_list() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let id = editor.insert_segment(SegmentKind::Line, None);
    editor.set_field(id, FieldRef::Solution(0), "4");
    assert_eq!(editor.add_solution(id), Some(FieldRef::Solution(1)));
    editor.set_field(id, FieldRef::Solution(1), "four");
    assert_eq!(
        output_json(&editor)["segments"][0]["solution"],
        json!([
            {"content": "4", "type": "text"},
            {"content": "four", "type": "text"}
        ])
    );
    assert!(editor.remove_solution(id, 0));
    assert_eq!(
        editor.segment(id).and_then(|s| s.entry(FieldRef::Solution(0))),
        Some(&Entry::new("four"))
    );
}

#[test]
fn export_value_matches_the_view_list() {
    let (mut editor, ids) = editor_with_texts(&["A", "B"]);
    editor.move_down(ids[0]);
    let task = editor.export_value();
    assert_eq!(task.segments, vec![Segment::text("B"), Segment::text("A")]);
    assert_eq!(task, editor.export_value());
}

#[test]
fn custom_output_field_keeps_its_name() {
    let editor = SegmentEditor::with_output(Encoding::Keyed, OutputField::new("task_body"));
    assert_eq!(editor.output().name(), "task_body");
    assert_eq!(editor.encoding(), Encoding::Keyed);
}

#[test]
fn typed_editor_writes_inserted_comments_with_their_flag() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let id = editor.insert_segment(SegmentKind::Comment, None);
    editor.set_field(id, FieldRef::Body, "Reviewed in week 2");
    assert_eq!(
        output_json(&editor),
        json!({"segments": [
            {"type": "text", "content": "Reviewed in week 2", "comment": true}
        ]})
    );
    assert!(editor.output().value().contains("\"comment\": true"));
}

#[test]
fn line_without_solutions_gets_one_on_insert() {
    let mut editor = SegmentEditor::new(Encoding::Typed);
    let id = editor.insert_segment(
        SegmentKind::Line,
        Some(Segment::Line {
            content: vec![Entry::new("Q")],
            answer: Entry::default(),
            solution: vec![],
        }),
    );
    assert_eq!(editor.fields(id).last(), Some(&FieldRef::Solution(0)));

    let stored = editor.output().value().to_string();
    let mut restored = SegmentEditor::new(Encoding::Typed);
    restored.restore(&stored);
    assert_eq!(restored.export_value(), editor.export_value());
}
