// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

/// An inclusive range of source line numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: u32,
    pub end: u32,
}

impl LineRange {
    /// Create a range covering `start..=end`. The bounds are swapped if they
    /// come in the wrong order.
    pub fn new(start: u32, end: u32) -> LineRange {
        if start <= end {
            LineRange { start, end }
        } else {
            LineRange {
                start: end,
                end: start,
            }
        }
    }

    /// A range covering just `line`.
    pub fn single(line: u32) -> LineRange {
        LineRange {
            start: line,
            end: line,
        }
    }

    pub fn contains(&self, line: u32) -> bool {
        self.start <= line && line <= self.end
    }

    /// The distance between the first and the last line.
    pub fn span(&self) -> u32 {
        self.end - self.start
    }
}

/// The return type and argument list of an original method.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// The return type, e.g. `void` or `java.lang.String[]`.
    pub return_type: String,
    /// The comma separated argument types, e.g. `int,java.lang.Object`.
    /// Empty for a method without arguments.
    pub arguments: String,
}

impl MethodDescriptor {
    pub fn new(return_type: &str, arguments: &str) -> MethodDescriptor {
        MethodDescriptor {
            return_type: return_type.to_string(),
            arguments: arguments.to_string(),
        }
    }
}

/// The original declaration behind an obfuscated field name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMapping {
    pub name: String,
    pub type_name: String,
}

/// The original declaration behind an obfuscated method name.
///
/// Several of these can share one obfuscated name: overloads that were
/// renamed to the same identifier, and methods inlined into each other.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodMapping {
    /// The original method name. R8 qualifies it with a class name when the
    /// method was inlined from another class.
    pub name: String,
    pub descriptor: MethodDescriptor,
    /// The lines of the original source this entry covers.
    pub original_range: Option<LineRange>,
    /// The lines of the obfuscated code this entry covers.
    pub obfuscated_range: Option<LineRange>,
}

impl MethodMapping {
    /// The class qualifier and the bare method name.
    pub fn split_name(&self) -> (Option<&str>, &str) {
        match self.name.rfind('.') {
            Some(idx) => (Some(&self.name[..idx]), &self.name[idx + 1..]),
            None => (None, &self.name),
        }
    }

    /// Map the obfuscated `line` into the original source.
    ///
    /// With both ranges known, the line is placed at the same relative
    /// position in the original range as it has in the obfuscated one.
    /// Otherwise (or for an unknown line `0`), `line` is returned as is.
    pub fn original_line(&self, line: u32) -> u32 {
        match (self.original_range, self.obfuscated_range) {
            (Some(original), Some(obfuscated)) if line != 0 => {
                if original.span() == 0 || obfuscated.span() == 0 {
                    return original.start;
                }
                let line = line.clamp(obfuscated.start, obfuscated.end);
                let offset = u64::from(line - obfuscated.start) * u64::from(original.span())
                    / u64::from(obfuscated.span());
                original.start + offset as u32
            }
            _ => line,
        }
    }
}
