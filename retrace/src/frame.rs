// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

use std::fmt;

/// The semantic fields of one line of a stack trace.
///
/// A `Frame` is a plain value: it is built once, either by
/// [`FrameTemplate::parse`][crate::FrameTemplate::parse] or by the
/// `with_*` builder methods, and every transformation produces a new
/// `Frame` instead of modifying an existing one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    class_name: Option<String>,
    source_file: Option<String>,
    line_number: u32,
    type_name: Option<String>,
    field_name: Option<String>,
    method_name: Option<String>,
    arguments: Option<String>,
}

impl Frame {
    /// A frame for `method` in `class` at `line`, the shape of a typical
    /// `at class.method(File.java:line)` line.
    pub fn new(class: &str, method: &str, line: u32) -> Frame {
        Frame::default()
            .with_class_name(class)
            .with_method_name(method)
            .with_line_number(line)
    }

    /// The fully-qualified class name.
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// The source file name, as written in the stack trace.
    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    /// The line number; `0` means unknown.
    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    /// The declared type of a field, or the return type of a method.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn field_name(&self) -> Option<&str> {
        self.field_name.as_deref()
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method_name.as_deref()
    }

    /// The textual parameter list, e.g. `int,java.lang.String`.
    pub fn arguments(&self) -> Option<&str> {
        self.arguments.as_deref()
    }

    /// True if no field is set at all.
    pub fn is_empty(&self) -> bool {
        *self == Frame::default()
    }

    pub fn with_class_name(self, class_name: impl Into<String>) -> Frame {
        Frame {
            class_name: Some(class_name.into()),
            ..self
        }
    }

    pub fn with_source_file(self, source_file: impl Into<String>) -> Frame {
        Frame {
            source_file: Some(source_file.into()),
            ..self
        }
    }

    pub fn with_line_number(self, line_number: u32) -> Frame {
        Frame {
            line_number,
            ..self
        }
    }

    pub fn with_type_name(self, type_name: impl Into<String>) -> Frame {
        Frame {
            type_name: Some(type_name.into()),
            ..self
        }
    }

    pub fn with_field_name(self, field_name: impl Into<String>) -> Frame {
        Frame {
            field_name: Some(field_name.into()),
            ..self
        }
    }

    pub fn with_method_name(self, method_name: impl Into<String>) -> Frame {
        Frame {
            method_name: Some(method_name.into()),
            ..self
        }
    }

    pub fn with_arguments(self, arguments: impl Into<String>) -> Frame {
        Frame {
            arguments: Some(arguments.into()),
            ..self
        }
    }

    /// The same frame without its field name. The type is kept.
    pub fn without_field(self) -> Frame {
        Frame {
            field_name: None,
            ..self
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = [
            ("class", self.class_name.as_deref()),
            ("source", self.source_file.as_deref()),
            ("type", self.type_name.as_deref()),
            ("field", self.field_name.as_deref()),
            ("method", self.method_name.as_deref()),
            ("args", self.arguments.as_deref()),
        ];
        write!(f, "Frame(")?;
        let mut first = true;
        for (i, (name, value)) in fields.iter().enumerate() {
            // The line number goes right after the source file.
            if i == 2 && self.line_number != 0 {
                write!(f, "{}line={}", if first { "" } else { ", " }, self.line_number)?;
                first = false;
            }
            if let Some(value) = value {
                write!(f, "{}{}={}", if first { "" } else { ", " }, name, value)?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_builder() {
        let frame = Frame::new("a.b", "c", 7).with_source_file("SourceFile");
        assert_eq!(frame.class_name(), Some("a.b"));
        assert_eq!(frame.method_name(), Some("c"));
        assert_eq!(frame.source_file(), Some("SourceFile"));
        assert_eq!(frame.line_number(), 7);
        assert_eq!(frame.field_name(), None);
        assert!(!frame.is_empty());
        assert!(Frame::default().is_empty());
    }

    #[test]
    fn test_without_field() {
        let frame = Frame::default()
            .with_class_name("a.b")
            .with_type_name("int")
            .with_field_name("c");
        let stripped = frame.clone().without_field();
        assert_eq!(stripped.field_name(), None);
        assert_eq!(stripped.type_name(), Some("int"));
        assert_eq!(stripped.class_name(), Some("a.b"));
        // The original value is untouched.
        assert_eq!(frame.field_name(), Some("c"));
    }

    #[test]
    fn test_display() {
        let frame = Frame::new("com.example.Foo", "bar", 12).with_source_file("Foo.java");
        assert_eq!(
            frame.to_string(),
            "Frame(class=com.example.Foo, source=Foo.java, line=12, method=bar)"
        );
        assert_eq!(Frame::default().to_string(), "Frame()");
        assert_eq!(
            Frame::default().with_line_number(3).to_string(),
            "Frame(line=3)"
        );
    }
}
