// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

//! Templates describing the shape of a stack trace line.
//!
//! A template is a regular expression in which placeholders stand for the
//! parts of a line that retrace knows how to interpret:
//!
//! | placeholder | meaning                                   |
//! |-------------|-------------------------------------------|
//! | `%c`        | fully-qualified class name                |
//! | `%s`        | source file name                          |
//! | `%l`        | line number                               |
//! | `%t`        | field type or method return type          |
//! | `%f`        | field name                                |
//! | `%m`        | method name                               |
//! | `%a`        | comma separated method argument types     |
//! | `%%`        | a literal `%`                             |
//!
//! The template always has to match the entire line. Everything that is not
//! a placeholder is copied verbatim from the input when a line is formatted
//! again, so a template only has to be precise about the tokens it wants to
//! rewrite.
//!
//! Text between placeholders is regular expression syntax, so `(`, `.` and
//! friends have to be escaped to match themselves. A template without any
//! placeholder is not treated as a regular expression at all: it matches
//! exactly one line, the template text itself.

use regex::{Captures, Match, Regex};
use tracing::trace;

use crate::Frame;

/// A frame line like `    at a.b.c(SourceFile:12)`, with an optional logback
/// style `~[jar:version]` suffix.
pub const DEFAULT_FRAME_TEMPLATE: &str = r"(?:.*?\bat\s+%c\.%m\s*\(%s(?::%l)?\)\s*(?:~\[.*\])?)";

/// An exception header such as `Exception in thread "main" a.b: message` or
/// `Caused by: a.c`.
pub const DEFAULT_HEADER_TEMPLATE: &str = r#"(?:.*?[:"]\s+)??%c(?::.*)?"#;

const REGEX_CLASS: &str = r#"(?:[^\s":./()]+\.)*[^\s":./()]+"#;
const REGEX_SOURCE_FILE: &str = r"(?:[^:()\d][^:()]*)?";
const REGEX_LINE_NUMBER: &str = r"\d*";
const REGEX_MEMBER: &str = r#"<?[^\s":./()]+>?"#;

/// Errors compiling a [`FrameTemplate`].
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown placeholder %{0}")]
    UnknownPlaceholder(char),
    #[error("invalid template expression: {0}")]
    BadExpression(#[from] regex::Error),
}

/// The kinds of token a template can capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placeholder {
    Class,
    SourceFile,
    LineNumber,
    Type,
    Field,
    Method,
    Arguments,
}

impl Placeholder {
    fn from_char(c: char) -> Option<Placeholder> {
        Some(match c {
            'c' => Placeholder::Class,
            's' => Placeholder::SourceFile,
            'l' => Placeholder::LineNumber,
            't' => Placeholder::Type,
            'f' => Placeholder::Field,
            'm' => Placeholder::Method,
            'a' => Placeholder::Arguments,
            _ => return None,
        })
    }

    fn expression(self) -> String {
        let type_regex = format!(r"{}(?:\[\])*", REGEX_CLASS);
        match self {
            Placeholder::Class => REGEX_CLASS.to_string(),
            Placeholder::SourceFile => REGEX_SOURCE_FILE.to_string(),
            Placeholder::LineNumber => REGEX_LINE_NUMBER.to_string(),
            Placeholder::Type => type_regex,
            Placeholder::Field | Placeholder::Method => REGEX_MEMBER.to_string(),
            Placeholder::Arguments => format!(r"(?:{0}(?:\s*,\s*{0})*)?", type_regex),
        }
    }
}

/// A compiled line template.
///
/// Use [`parse`][FrameTemplate::parse] to turn a line into a [`Frame`] and
/// [`format`][FrameTemplate::format] to write a (transformed) frame back
/// into the same line.
#[derive(Clone, Debug)]
pub struct FrameTemplate {
    template: String,
    regex: Regex,
    /// Each placeholder with the index of its capture group in `regex`.
    groups: Vec<(Placeholder, usize)>,
    resolve_fields: bool,
}

impl FrameTemplate {
    /// Compile `template`.
    ///
    /// Once the template has at least one placeholder, the text around the
    /// placeholders is a regular expression: `r"at \(x\) %c"` matches the
    /// line `at (x) a.b`, while `"at (x) %c"` treats `(x)` as a group and
    /// matches `at x a.b` instead. A template with no placeholder at all is
    /// matched literally, so `"at (x)"` matches exactly the line `at (x)`.
    ///
    /// `resolve_fields` says whether a field token captured by this template
    /// should be looked up in the mapping. Templates for lines that mention a
    /// field only incidentally should pass `false`.
    pub fn new(template: &str, resolve_fields: bool) -> Result<FrameTemplate, TemplateError> {
        let mut expression = String::new();
        let mut literal = String::new();
        let mut placeholders = Vec::new();

        let mut chars = template.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                expression.push(c);
                literal.push(c);
                continue;
            }
            match chars.next() {
                // A trailing '%' stands for itself.
                None | Some('%') => {
                    expression.push('%');
                    literal.push('%');
                }
                Some(p) => {
                    let placeholder =
                        Placeholder::from_char(p).ok_or(TemplateError::UnknownPlaceholder(p))?;
                    expression.push_str(&format!(
                        "(?P<p{}>{})",
                        placeholders.len(),
                        placeholder.expression()
                    ));
                    placeholders.push(placeholder);
                }
            }
        }

        let expression = if placeholders.is_empty() {
            regex::escape(&literal)
        } else {
            expression
        };
        let regex = Regex::new(&format!("^(?:{})$", expression))?;

        // The template's own groups shift the placeholder group indices.
        let names: Vec<Option<&str>> = regex.capture_names().collect();
        let groups = placeholders
            .into_iter()
            .enumerate()
            .filter_map(|(i, placeholder)| {
                let name = format!("p{}", i);
                let index = names.iter().position(|n| *n == Some(name.as_str()))?;
                Some((placeholder, index))
            })
            .collect();

        Ok(FrameTemplate {
            template: template.to_string(),
            regex,
            groups,
            resolve_fields,
        })
    }

    /// The two built-in templates: frame lines first, then exception headers.
    pub fn defaults() -> Vec<FrameTemplate> {
        [DEFAULT_FRAME_TEMPLATE, DEFAULT_HEADER_TEMPLATE]
            .iter()
            .map(|t| FrameTemplate::new(t, true).expect("built-in templates are valid"))
            .collect()
    }

    /// The template text this was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Whether field tokens matched by this template should be resolved.
    pub fn resolves_fields(&self) -> bool {
        self.resolve_fields
    }

    fn has_placeholder(&self, placeholder: Placeholder) -> bool {
        self.groups.iter().any(|&(p, _)| p == placeholder)
    }

    /// The placeholders that took part in the match, in the order they
    /// appear in the line.
    ///
    /// Inside a repetition or alternation a later placeholder can capture
    /// text that comes before an earlier one.
    fn matched<'t>(&self, captures: &Captures<'t>) -> Vec<(Placeholder, Match<'t>)> {
        let mut matched: Vec<_> = self
            .groups
            .iter()
            .filter_map(|&(p, index)| captures.get(index).map(|m| (p, m)))
            .collect();
        matched.sort_by_key(|(_, m)| m.start());
        matched
    }

    /// Parse `line` into a [`Frame`], or `None` if the template doesn't match.
    ///
    /// Empty captures are left unset. If a placeholder occurs more than
    /// once, the non-empty capture closest to the start of the line wins.
    pub fn parse(&self, line: &str) -> Option<Frame> {
        let captures = self.regex.captures(line)?;
        let mut frame = Frame::default();
        for (placeholder, m) in self.matched(&captures) {
            let text = m.as_str();
            if text.is_empty() {
                continue;
            }
            frame = match placeholder {
                Placeholder::Class if frame.class_name().is_none() => frame.with_class_name(text),
                Placeholder::SourceFile if frame.source_file().is_none() => {
                    frame.with_source_file(text)
                }
                Placeholder::LineNumber if frame.line_number() == 0 => {
                    // Absurdly large numbers are as good as unknown.
                    frame.with_line_number(text.parse().unwrap_or(0))
                }
                Placeholder::Type if frame.type_name().is_none() => frame.with_type_name(text),
                Placeholder::Field if frame.field_name().is_none() => frame.with_field_name(text),
                Placeholder::Method if frame.method_name().is_none() => {
                    frame.with_method_name(text)
                }
                Placeholder::Arguments if frame.arguments().is_none() => frame.with_arguments(text),
                _ => frame,
            };
        }
        trace!("template {:?} parsed {}", self.template, frame);
        Some(frame)
    }

    /// Rewrite `line` with the fields of `frame`.
    ///
    /// `line` must match this template; if it doesn't, `None` is returned.
    /// Fields that `frame` doesn't have keep the text they had in `line`.
    pub fn format(&self, line: &str, frame: &Frame) -> Option<String> {
        self.format_internal(line, frame, false)
    }

    /// Like [`format`][FrameTemplate::format], but methods and fields also
    /// show their type and arguments, if this template doesn't already
    /// print them on its own.
    pub fn format_verbose(&self, line: &str, frame: &Frame) -> Option<String> {
        self.format_internal(line, frame, true)
    }

    fn format_internal(&self, line: &str, frame: &Frame, verbose: bool) -> Option<String> {
        let captures = self.regex.captures(line)?;
        let mut result = String::with_capacity(line.len() * 2);
        let mut cursor = 0;
        for (placeholder, m) in self.matched(&captures) {
            if m.start() < cursor {
                continue;
            }
            result.push_str(&line[cursor..m.start()]);
            match self.substitute(placeholder, frame, verbose) {
                Some(text) => result.push_str(&text),
                None => result.push_str(m.as_str()),
            }
            cursor = m.end();
        }
        result.push_str(&line[cursor..]);
        Some(result)
    }

    /// The text `frame` has for `placeholder`, if any.
    fn substitute(&self, placeholder: Placeholder, frame: &Frame, verbose: bool) -> Option<String> {
        match placeholder {
            Placeholder::Class => frame.class_name().map(String::from),
            Placeholder::SourceFile => frame.source_file().map(String::from),
            Placeholder::LineNumber => match frame.line_number() {
                0 => None,
                line => Some(line.to_string()),
            },
            Placeholder::Type => frame.type_name().map(String::from),
            Placeholder::Arguments => frame.arguments().map(String::from),
            Placeholder::Field => {
                let name = frame.field_name()?;
                match frame.type_name() {
                    Some(ty) if verbose && !self.has_placeholder(Placeholder::Type) => {
                        Some(format!("{} {}", ty, name))
                    }
                    _ => Some(name.to_string()),
                }
            }
            Placeholder::Method => {
                let name = frame.method_name()?;
                if !verbose {
                    return Some(name.to_string());
                }
                let mut text = String::new();
                if let Some(ty) = frame.type_name() {
                    if !self.has_placeholder(Placeholder::Type) {
                        text.push_str(ty);
                        text.push(' ');
                    }
                }
                text.push_str(name);
                if let Some(args) = frame.arguments() {
                    if !self.has_placeholder(Placeholder::Arguments) {
                        text.push('(');
                        text.push_str(args);
                        text.push(')');
                    }
                }
                Some(text)
            }
        }
    }
}
