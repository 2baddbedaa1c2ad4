use std::io::Write;

use owo_colors::OwoColorize;
use pdfquiz_core::{Question, Quiz, SummaryProgress};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

const OPTION_LABELS: &[u8] = b"ABCDEFGHIJ";

fn option_label(i: usize) -> char {
    OPTION_LABELS.get(i).map(|&b| b as char).unwrap_or('?')
}

/// Print a summarization progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &SummaryProgress,
    color: ColorMode,
) -> std::io::Result<()> {
    let line = match event {
        SummaryProgress::Chunked { chars, chunks } => format!(
            "Document is {} characters; summarizing in {} segments",
            chars, chunks
        ),
        SummaryProgress::Segment { index, total } => {
            format!("[{}/{}] Summarizing segment", index, total)
        }
        SummaryProgress::Final => "Writing final summary...".to_string(),
    };
    if color.enabled() {
        writeln!(w, "{}", line.dimmed())
    } else {
        writeln!(w, "{}", line)
    }
}

pub fn print_summary(w: &mut dyn Write, summary: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", "Summary".bold().underline())?;
    } else {
        writeln!(w, "Summary")?;
        writeln!(w, "=======")?;
    }
    writeln!(w)?;
    writeln!(w, "{}", summary.trim())?;
    Ok(())
}

/// Print every question; answers are only shown when `show_answers` is set.
pub fn print_quiz(
    w: &mut dyn Write,
    quiz: &Quiz,
    show_answers: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    for question in &quiz.questions {
        print_question(w, question, show_answers, color)?;
        writeln!(w)?;
    }

    if !show_answers {
        let key: Vec<String> = quiz
            .questions
            .iter()
            .map(|q| {
                let answer = q.correct_option().map(option_label).unwrap_or('?');
                format!("{}{}", q.question_number, answer)
            })
            .collect();
        if color.enabled() {
            writeln!(w, "{} {}", "Answer key:".bold(), key.join(" "))?;
        } else {
            writeln!(w, "Answer key: {}", key.join(" "))?;
        }
    }
    Ok(())
}

fn print_question(
    w: &mut dyn Write,
    q: &Question,
    show_answers: bool,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", format!("{}.", q.question_number).bold(), q.question.bold())?;
    } else {
        writeln!(w, "{}. {}", q.question_number, q.question)?;
    }

    for (i, option) in q.answer_options.iter().enumerate() {
        let label = option_label(i);
        if show_answers && option.is_correct {
            if color.enabled() {
                writeln!(w, "   {}) {}", label, option.text.green())?;
            } else {
                writeln!(w, " * {}) {}", label, option.text)?;
            }
        } else {
            writeln!(w, "   {}) {}", label, option.text)?;
        }
        if show_answers && !option.rationale.is_empty() {
            if color.enabled() {
                writeln!(w, "      {}", option.rationale.dimmed())?;
            } else {
                writeln!(w, "      {}", option.rationale)?;
            }
        }
    }

    if !q.hint.is_empty() {
        if color.enabled() {
            writeln!(w, "   {} {}", "Hint:".yellow(), q.hint)?;
        } else {
            writeln!(w, "   Hint: {}", q.hint)?;
        }
    }
    Ok(())
}
