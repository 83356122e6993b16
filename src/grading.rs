//! Checks participant submissions against the solutions stored in a task.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::debug;

use crate::error::TaskError;
use crate::segment::{Segment, Task};

/// Shown as the expected answer when the solution is the empty string.
pub const EMPTY_SOLUTION_LABEL: &str = "<empty string>";

/// A participant's answer. In JSON: a string for line entries, a boolean for
/// checks, an index for radios and an index list for multi-selects.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Submission {
    Text(String),
    Checked(bool),
    Choice(usize),
    Choices(BTreeSet<usize>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    pub correct: bool,
    /// What to show the participant when they were wrong.
    pub expected: String,
}

impl Verdict {
    fn right() -> Self {
        Self {
            correct: true,
            expected: "OK".to_string(),
        }
    }

    fn wrong(expected: String) -> Self {
        Self {
            correct: false,
            expected,
        }
    }
}

/// Carriage returns from browser line endings never count against an answer.
pub fn normalize_submission(text: &str) -> String {
    text.replace('\r', "")
}

fn option_label(options: &[String], idx: usize) -> String {
    options.get(idx).cloned().unwrap_or_default()
}

/// Grades one segment. Text segments and submissions of the wrong shape yield
/// `None`.
pub fn grade(segment: &Segment, submission: &Submission) -> Option<Verdict> {
    match (segment, submission) {
        (Segment::Line { solution, .. }, Submission::Text(text)) => {
            let text = normalize_submission(text);
            if solution.iter().any(|entry| entry.content == text) {
                return Some(Verdict::right());
            }
            let expected = match solution.first() {
                Some(entry) if !entry.content.is_empty() => entry.content.clone(),
                _ => EMPTY_SOLUTION_LABEL.to_string(),
            };
            Some(Verdict::wrong(expected))
        }
        (Segment::Check { solution, .. }, Submission::Checked(checked)) => {
            if solution == checked {
                Some(Verdict::right())
            } else {
                Some(Verdict::wrong(if *solution { "checked" } else { "unchecked" }.to_string()))
            }
        }
        (Segment::Radio { options, selected }, Submission::Choice(choice)) => {
            if selected == choice {
                Some(Verdict::right())
            } else {
                Some(Verdict::wrong(option_label(options, *selected)))
            }
        }
        (Segment::Multi { options, selected }, Submission::Choices(choices)) => {
            if selected == choices {
                Some(Verdict::right())
            } else {
                let labels: Vec<String> = selected
                    .iter()
                    .map(|idx| option_label(options, *idx))
                    .collect();
                Some(Verdict::wrong(labels.join(", ")))
            }
        }
        _ => None,
    }
}

/// Grades every submission keyed by its segment position. Positions without
/// a gradable segment are left out of the result.
pub fn grade_task(
    task: &Task,
    submissions: &BTreeMap<usize, Submission>,
) -> BTreeMap<usize, Verdict> {
    let verdicts: BTreeMap<usize, Verdict> = submissions
        .iter()
        .filter_map(|(idx, submission)| {
            let segment = task.segments.get(*idx)?;
            grade(segment, submission).map(|verdict| (*idx, verdict))
        })
        .collect();
    debug!(
        graded = verdicts.len(),
        correct = verdicts.values().filter(|verdict| verdict.correct).count(),
        "graded submissions"
    );
    verdicts
}

/// Parses `{"<position>": <answer>, ...}` with positions counted from 1, as
/// the builder numbers its segments.
pub fn parse_submissions(input: &str) -> Result<BTreeMap<usize, Submission>, TaskError> {
    let numbered: BTreeMap<usize, Submission> = serde_json::from_str(input)?;
    numbered
        .into_iter()
        .map(|(position, submission)| {
            position
                .checked_sub(1)
                .map(|idx| (idx, submission))
                .ok_or(TaskError::SubmissionPosition)
        })
        .collect()
}

/// One line per graded segment, followed by the score.
pub fn format_report(verdicts: &BTreeMap<usize, Verdict>) -> String {
    let mut report = String::new();
    for (idx, verdict) in verdicts {
        if verdict.correct {
            report.push_str(&format!("segment {}: correct\n", idx + 1));
        } else {
            report.push_str(&format!(
                "segment {}: wrong, expected {}\n",
                idx + 1,
                verdict.expected
            ));
        }
    }
    let correct = verdicts.values().filter(|verdict| verdict.correct).count();
    report.push_str(&format!("{correct}/{} correct\n", verdicts.len()));
    report
}
