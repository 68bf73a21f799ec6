// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

use std::io::{self, BufRead, Write};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::trace;

use crate::{Frame, FrameTemplate, SymbolTable};

/// Anything that looks like a (possibly qualified) Java class name.
static CLASS_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{L}_$][\p{L}\p{N}_$]*(?:\.[\p{L}_$][\p{L}\p{N}_$]*)*")
        .expect("class token pattern must compile")
});

/// Options controlling how lines are retraced.
#[derive(Clone, Debug, Default)]
pub struct RetraceOptions {
    /// Replace every class name found in lines that match no template.
    pub all_class_names: bool,
    /// Print method return types and arguments, and field types.
    pub verbose: bool,
}

/// Rewrites stack trace lines using a [`SymbolTable`].
#[derive(Debug)]
pub struct Retracer<'a> {
    table: &'a SymbolTable,
    templates: Vec<FrameTemplate>,
    options: RetraceOptions,
}

impl<'a> Retracer<'a> {
    /// A retracer for the default Java stack trace formats.
    pub fn new(table: &'a SymbolTable, options: RetraceOptions) -> Retracer<'a> {
        Retracer::with_templates(table, FrameTemplate::defaults(), options)
    }

    /// A retracer trying `templates` on each line, in order.
    pub fn with_templates(
        table: &'a SymbolTable,
        templates: Vec<FrameTemplate>,
        options: RetraceOptions,
    ) -> Retracer<'a> {
        Retracer {
            table,
            templates,
            options,
        }
    }

    /// Retrace one line (without its line terminator).
    ///
    /// The result has at least one line. Any line that can't be resolved is
    /// returned unchanged. If the line is ambiguous, the first resolution is
    /// followed by the other candidates with their common prefix blanked out.
    pub fn retrace_line(&self, line: &str) -> Vec<String> {
        let (template, frame) = match self
            .templates
            .iter()
            .find_map(|template| template.parse(line).map(|frame| (template, frame)))
        {
            Some(found) => found,
            None => return vec![self.unmatched_line(line)],
        };
        let frame = if template.resolves_fields() {
            frame
        } else {
            frame.without_field()
        };

        let frames = match self.table.transform(&frame) {
            Some(frames) if !frames.is_empty() => frames,
            _ => return vec![line.to_string()],
        };

        let format = |frame: &Frame| {
            if self.options.verbose {
                template.format_verbose(line, frame)
            } else {
                template.format(line, frame)
            }
        };

        let first = match format(&frames[0]) {
            Some(text) => text,
            None => return vec![line.to_string()],
        };
        let mut seen = vec![first.clone()];
        let mut lines = vec![first];
        for frame in &frames[1..] {
            let text = match format(frame) {
                Some(text) => text,
                None => continue,
            };
            if seen.contains(&text) {
                continue;
            }
            match trim(&seen[0], &text) {
                Some(trimmed) => lines.push(trimmed),
                None => trace!("dropping degenerate alternative {:?}", text),
            }
            seen.push(text);
        }
        lines
    }

    fn unmatched_line(&self, line: &str) -> String {
        if !self.options.all_class_names {
            return line.to_string();
        }
        CLASS_TOKEN
            .replace_all(line, |caps: &Captures| {
                self.table.original_class_name(&caps[0]).to_string()
            })
            .into_owned()
    }

    /// Retrace every line of `input` into `output`.
    ///
    /// Line terminators are kept as they were. Lines that aren't valid
    /// UTF-8 are copied through untouched.
    pub fn retrace<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> io::Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if input.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let text = match std::str::from_utf8(&buf) {
                Ok(text) => text,
                Err(_) => {
                    output.write_all(&buf)?;
                    continue;
                }
            };
            let (line, terminator) = split_terminator(text);
            let lines = self.retrace_line(line);
            let last = lines.len() - 1;
            for (i, retraced) in lines.iter().enumerate() {
                output.write_all(retraced.as_bytes())?;
                if i < last {
                    output.write_all(if terminator.is_empty() { "\n" } else { terminator }.as_bytes())?;
                } else {
                    output.write_all(terminator.as_bytes())?;
                }
            }
        }
        output.flush()
    }
}

/// Split `text` into the line and its `\n` or `\r\n` terminator.
fn split_terminator(text: &str) -> (&str, &str) {
    if let Some(line) = text.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = text.strip_suffix('\n') {
        (line, "\n")
    } else {
        (text, "")
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Blank out the part of `alternative` that repeats `reference`.
///
/// The shared prefix is cut back to the start of the identifier it ends in,
/// and every non-whitespace character before that point becomes a space.
/// Returns `None` if `alternative` starts with all of `reference`, as there
/// is nothing left to show.
pub fn trim(reference: &str, alternative: &str) -> Option<String> {
    let reference: Vec<char> = reference.chars().collect();
    let alternative: Vec<char> = alternative.chars().collect();

    let divergence = reference
        .iter()
        .zip(&alternative)
        .take_while(|(a, b)| a == b)
        .count();
    if divergence == reference.len() {
        return None;
    }

    let mut boundary = divergence;
    while boundary > 0 && is_identifier_char(alternative[boundary - 1]) {
        boundary -= 1;
    }

    let mut trimmed = String::with_capacity(alternative.len());
    trimmed.extend(
        alternative[..boundary]
            .iter()
            .map(|&c| if c.is_whitespace() { c } else { ' ' }),
    );
    trimmed.extend(&alternative[boundary..]);
    Some(trimmed)
}
