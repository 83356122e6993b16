//! Participant-facing preview of a task, projected onto a `tdoc` document so
//! it can be exported as Markdown or FTML.

use clap::ValueEnum;
use tdoc::{
    ChecklistItem, Document, InlineStyle, Paragraph, ParagraphType, Span, markdown,
    writer::Writer,
};

use crate::error::TaskError;
use crate::segment::{ContentKind, Entry, Segment, Task};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum PreviewFormat {
    #[default]
    Markdown,
    Ftml,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PreviewOptions {
    /// Reveal solutions, for reviewers rather than participants.
    pub show_solutions: bool,
}

fn text_paragraph(text: &str) -> Paragraph {
    Paragraph::new_text().with_content(vec![Span::new_text(text)])
}

fn bold_paragraph(label: &str, text: &str) -> Paragraph {
    let mut bold = Span::new_text(label);
    bold.style = InlineStyle::Bold;
    let mut content = vec![bold];
    if !text.is_empty() {
        content.push(Span::new_text(text));
    }
    Paragraph::new_text().with_content(content)
}

fn code_block(text: &str) -> Paragraph {
    Paragraph::new(ParagraphType::CodeBlock).with_content(vec![Span::new_text(text)])
}

fn entry_paragraph(entry: &Entry) -> Paragraph {
    match entry.kind {
        ContentKind::Source => code_block(&entry.content),
        ContentKind::Text => text_paragraph(&entry.content),
    }
}

fn joined_entries(entries: &[Entry]) -> String {
    entries
        .iter()
        .map(|entry| entry.content.as_str())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

struct PreviewBuilder {
    options: PreviewOptions,
    question: usize,
    document: Document,
}

impl PreviewBuilder {
    fn new(options: PreviewOptions) -> Self {
        Self {
            options,
            question: 0,
            document: Document::new(),
        }
    }

    fn push(&mut self, paragraph: Paragraph) {
        self.document.add_paragraph(paragraph);
    }

    fn question_header(&mut self) {
        self.question += 1;
        let title = format!("Question {}", self.question);
        self.push(Paragraph::new_header2().with_content(vec![Span::new_text(&title)]));
    }

    fn add_segment(&mut self, segment: &Segment) {
        match segment {
            Segment::Text { body } if body.comment => {
                self.push(Paragraph::new_quote().with_children(vec![entry_paragraph(body)]));
            }
            Segment::Text { body } => self.push(entry_paragraph(body)),
            Segment::Line {
                content,
                answer,
                solution,
            } => {
                self.question_header();
                for entry in content {
                    self.push(entry_paragraph(entry));
                }
                self.push(code_block(&answer.content));
                if self.options.show_solutions {
                    let accepted: Vec<&str> =
                        solution.iter().map(|entry| entry.content.as_str()).collect();
                    self.push(bold_paragraph("Solution: ", &accepted.join(" | ")));
                }
            }
            Segment::Check { content, solution } => {
                self.question_header();
                let checked = self.options.show_solutions && *solution;
                let item = ChecklistItem::new(checked)
                    .with_content(vec![Span::new_text(&joined_entries(content))]);
                self.push(Paragraph::new_checklist().with_checklist_items(vec![item]));
            }
            Segment::Radio { options, selected } => {
                self.question_header();
                let entries = options
                    .iter()
                    .enumerate()
                    .map(|(idx, label)| {
                        if self.options.show_solutions && idx == *selected {
                            vec![bold_paragraph(label, "")]
                        } else {
                            vec![text_paragraph(label)]
                        }
                    })
                    .collect();
                self.push(Paragraph::new_unordered_list().with_entries(entries));
            }
            Segment::Multi { options, selected } => {
                self.question_header();
                let items = options
                    .iter()
                    .enumerate()
                    .map(|(idx, label)| {
                        let checked = self.options.show_solutions && selected.contains(&idx);
                        ChecklistItem::new(checked).with_content(vec![Span::new_text(label)])
                    })
                    .collect();
                self.push(Paragraph::new_checklist().with_checklist_items(items));
            }
        }
    }

    fn finish(self) -> Document {
        self.document
    }
}

/// Builds the preview document. Question numbers start at 1 for every call.
pub fn task_document(task: &Task, options: PreviewOptions) -> Document {
    let mut builder = PreviewBuilder::new(options);
    for segment in task.iter() {
        builder.add_segment(segment);
    }
    builder.finish()
}

pub fn render_preview(
    task: &Task,
    format: PreviewFormat,
    options: PreviewOptions,
) -> Result<String, TaskError> {
    let document = task_document(task, options);
    match format {
        PreviewFormat::Markdown => {
            let mut contents = Vec::new();
            markdown::write(&mut contents, &document)
                .map_err(|err| TaskError::Render(err.to_string()))?;
            String::from_utf8(contents).map_err(|err| TaskError::Render(err.to_string()))
        }
        PreviewFormat::Ftml => Writer::new()
            .write_to_string(&document)
            .map_err(|err| TaskError::Render(err.to_string())),
    }
}
