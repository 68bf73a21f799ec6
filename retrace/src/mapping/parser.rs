// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

// This file implements a reader for the text mapping files written by
// ProGuard and R8. A mapping file is a list of classes, each followed by
// its members:
//
// ```text
// com.example.Main -> a.a:
// # {"id":"sourceFile","fileName":"Main.kt"}
//     int counter -> a
//     void <init>() -> <init>
//     1:3:void run(java.lang.String):20:22 -> b
//     4:4:void com.example.Util.log():7:7 -> b
// ```
//
// # Class lines
//
// `original.Name -> obfuscated.Name:`
//
// A class line is never indented. Every member line that follows belongs to
// it, up to the next class line.
//
// # Field lines
//
// `    type originalName -> obfuscatedName`
//
// # Method lines
//
// `    [startLine:endLine:]returnType originalName(arguments)[:origStart[:origEnd]] -> obfuscatedName`
//
// The leading `startLine:endLine:` pair is the range of line numbers the
// method occupies in the *obfuscated* code, the trailing pair is the range
// it occupied in the original source. A trailing single number starts an
// original range as long as the obfuscated one. Without a leading pair the
// method has no line information at all.
//
// `originalName` may be qualified with a class name. R8 does this for code
// inlined from another class; all lines sharing one obfuscated range form
// one inlining stack, innermost frame first.
//
// # Comments
//
// Lines starting with `#` are comments. R8 puts JSON metadata in some of
// them; we only care about `{"id":"sourceFile","fileName":"..."}`, which
// names the original source file of the class it follows.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_till, take_till1, take_until};
use nom::character::complete::{char, digit1, space0, space1};
use nom::combinator::{all_consuming, map, map_res, opt, rest};
use nom::sequence::{delimited, preceded, terminated, tuple};
use nom::IResult;
use tracing::{debug, trace, warn};

use crate::mapping::types::*;
use crate::mapping::MappingSink;
use crate::MappingError;

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Class {
        original: &'a str,
        obfuscated: &'a str,
    },
    Field {
        type_name: &'a str,
        original: &'a str,
        obfuscated: &'a str,
    },
    Method {
        obfuscated_range: Option<LineRange>,
        return_type: &'a str,
        original: &'a str,
        arguments: &'a str,
        original_range: Option<LineRange>,
        obfuscated: &'a str,
    },
    Comment(&'a str),
}

fn decimal_u32(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>)(input)
}

fn arrow(input: &str) -> IResult<&str, &str> {
    delimited(space0, tag("->"), space0)(input)
}

// Matches the unindented original name before a class line's arrow.
fn class_original(input: &str) -> IResult<&str, &str> {
    let (rest, original) = take_until::<_, &str, nom::error::Error<&str>>("->")(input)?;
    if original.trim().is_empty() || original.starts_with(char::is_whitespace) {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    Ok((rest, original))
}

// Matches a class line.
fn class_line(input: &str) -> IResult<&str, Line<'_>> {
    map(
        tuple((
            class_original,
            tag("->"),
            space0,
            take_till1(|c: char| c == ':' || c.is_whitespace()),
            char(':'),
            space0,
        )),
        |(original, _, _, obfuscated, _, _)| Line::Class {
            original: original.trim_end(),
            obfuscated,
        },
    )(input)
}

// Matches the `startLine:endLine:` prefix of a method line.
fn obfuscated_range_prefix(input: &str) -> IResult<&str, LineRange> {
    map(
        tuple((decimal_u32, char(':'), decimal_u32, char(':'))),
        |(start, _, end, _)| LineRange::new(start, end),
    )(input)
}

// Matches the `:origStart[:origEnd]` suffix of a method line.
fn original_range_suffix(input: &str) -> IResult<&str, (u32, Option<u32>)> {
    preceded(
        char(':'),
        tuple((decimal_u32, opt(preceded(char(':'), decimal_u32)))),
    )(input)
}

// Matches a field or method line.
fn member_line(input: &str) -> IResult<&str, Line<'_>> {
    let (input, _) = space1(input)?;
    let (input, obfuscated_range) = opt(obfuscated_range_prefix)(input)?;
    let (input, type_name) = take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, _) = space1(input)?;
    let (input, original) = take_till1(|c: char| c.is_whitespace() || c == '(')(input)?;
    let (input, arguments) = opt(delimited(char('('), take_till(|c: char| c == ')'), char(')')))(input)?;
    let (input, original_lines) = opt(original_range_suffix)(input)?;
    let (input, obfuscated) = preceded(arrow, take_till1(|c: char| c.is_whitespace()))(input)?;
    let (input, _) = space0(input)?;

    let line = match arguments {
        Some(arguments) => {
            let original_range = original_lines.map(|(start, end)| match (end, obfuscated_range) {
                (Some(end), _) => LineRange::new(start, end),
                (None, Some(obfuscated)) => {
                    LineRange::new(start, start.saturating_add(obfuscated.span()))
                }
                (None, None) => LineRange::single(start),
            });
            Line::Method {
                obfuscated_range,
                return_type: type_name,
                original,
                arguments,
                original_range,
                obfuscated,
            }
        }
        None if obfuscated_range.is_none() && original_lines.is_none() => Line::Field {
            type_name,
            original,
            obfuscated,
        },
        None => {
            // Line numbers without an argument list make no sense.
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )));
        }
    };
    Ok((input, line))
}

// Matches a comment line.
fn comment_line(input: &str) -> IResult<&str, Line<'_>> {
    map(preceded(terminated(space0, char('#')), rest), Line::Comment)(input)
}

// Parse any line of a mapping file.
fn line(input: &str) -> IResult<&str, Line<'_>> {
    all_consuming(alt((comment_line, member_line, class_line)))(input)
}

/// Extract the file name from an R8 `sourceFile` metadata comment.
fn source_file_metadata(comment: &str) -> Option<String> {
    let comment = comment.trim();
    if !comment.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(comment).ok()?;
    if value.get("id")?.as_str()? != "sourceFile" {
        return None;
    }
    value.get("fileName")?.as_str().map(String::from)
}

/// Where the parser is relative to class lines.
#[derive(Debug)]
enum ClassState {
    /// No class line has been seen yet.
    BeforeFirstClass,
    /// Members belong to this (original) class.
    Accepted(String),
    /// The sink declined the current class, skip its members.
    Rejected,
}

/// A streaming parser for mapping files.
///
/// Each line is handed to a [`MappingSink`] as soon as it is parsed.
///
/// Use this by repeatedly calling [`parse_more`][] until the whole input is
/// consumed. Then call [`finish`][] with whatever input `parse_more` left
/// over.
///
/// [`parse_more`]: MappingParser::parse_more
/// [`finish`]: MappingParser::finish
#[derive(Debug)]
pub struct MappingParser<S> {
    sink: S,
    class: ClassState,
    /// The number of lines consumed so far.
    pub lines: u64,
    /// The number of lines that could not be understood and were skipped.
    pub skipped_lines: u64,
}

impl<S: MappingSink> MappingParser<S> {
    /// Creates a new parser feeding `sink`.
    pub fn new(sink: S) -> Self {
        MappingParser {
            sink,
            class: ClassState::BeforeFirstClass,
            lines: 0,
            skipped_lines: 0,
        }
    }

    /// Parses every complete line of `input` and returns how many bytes of
    /// the input were used. The *unused* portion (a trailing partial line)
    /// must be resubmitted, along with more data, on the next call.
    pub fn parse_more(&mut self, input: &[u8]) -> Result<usize, MappingError> {
        // Only whole lines can be parsed, so cut the input after the last newline.
        let input = match input.iter().rposition(|&x| x == b'\n') {
            Some(idx) => &input[..idx + 1],
            None => return Ok(0),
        };
        for raw in input[..input.len() - 1].split(|&x| x == b'\n') {
            self.parse_line(raw)?;
        }
        Ok(input.len())
    }

    /// Parse the remaining input (the last line, if it had no newline) and
    /// return the sink.
    pub fn finish(mut self, input: &[u8]) -> Result<S, MappingError> {
        for raw in input.split(|&x| x == b'\n') {
            if !raw.is_empty() {
                self.parse_line(raw)?;
            }
        }
        debug!(
            "parsed {} mapping lines ({} skipped)",
            self.lines, self.skipped_lines
        );
        Ok(self.sink)
    }

    fn parse_line(&mut self, raw: &[u8]) -> Result<(), MappingError> {
        let mut end = raw.len();
        while end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
        let text = std::str::from_utf8(&raw[..end])
            .map_err(|_| MappingError::ParseError("line is not valid UTF-8", self.lines + 1))?;
        self.lines += 1;

        if text.trim().is_empty() {
            return Ok(());
        }

        let parsed = match line(text) {
            Ok((_, parsed)) => parsed,
            Err(_) => {
                warn!("skipping unparseable mapping line {}: {}", self.lines, text);
                self.skipped_lines += 1;
                return Ok(());
            }
        };

        match parsed {
            Line::Class {
                original,
                obfuscated,
            } => {
                self.class = if self.sink.register_class(original, obfuscated) {
                    ClassState::Accepted(original.to_string())
                } else {
                    trace!("class {} was rejected, skipping its members", original);
                    ClassState::Rejected
                };
            }
            Line::Comment(comment) => {
                if let (ClassState::Accepted(class), Some(file_name)) =
                    (&self.class, source_file_metadata(comment))
                {
                    self.sink.register_source_file(class, &file_name);
                }
            }
            Line::Field {
                type_name,
                original,
                obfuscated,
            } => {
                if let Some(class) = self.member_class(text) {
                    self.sink
                        .register_field(&class, obfuscated, original, type_name);
                }
            }
            Line::Method {
                obfuscated_range,
                return_type,
                original,
                arguments,
                original_range,
                obfuscated,
            } => {
                if let Some(class) = self.member_class(text) {
                    self.sink.register_method(
                        &class,
                        obfuscated,
                        original,
                        MethodDescriptor::new(return_type, arguments),
                        original_range,
                        obfuscated_range,
                    );
                }
            }
        }
        Ok(())
    }

    /// The class a member line belongs to, if its members are wanted.
    fn member_class(&mut self, text: &str) -> Option<String> {
        match &self.class {
            ClassState::Accepted(class) => Some(class.clone()),
            ClassState::Rejected => None,
            ClassState::BeforeFirstClass => {
                warn!(
                    "skipping member line {} before any class: {}",
                    self.lines, text
                );
                self.skipped_lines += 1;
                None
            }
        }
    }

    /// The sink this parser feeds.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}
