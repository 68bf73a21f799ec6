// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::mapping::{FieldMapping, LineRange, MappingSink, MethodDescriptor, MethodMapping};
use crate::Frame;

/// The reverse mapping from obfuscated names to original declarations.
///
/// A `SymbolTable` is filled through the [`MappingSink`] calls (usually by
/// reading a mapping file with [`SymbolTable::from_file`]) and only read
/// afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    /// Obfuscated class name to original class name.
    classes: HashMap<String, String>,
    /// Original class name to its original source file.
    source_files: HashMap<String, String>,
    /// Original class name to obfuscated field name to original fields.
    fields: HashMap<String, HashMap<String, Vec<FieldMapping>>>,
    /// Original class name to obfuscated method name to original methods,
    /// in the order they were registered.
    methods: HashMap<String, HashMap<String, Vec<MethodMapping>>>,
}

impl SymbolTable {
    /// An empty table.
    pub fn new() -> SymbolTable {
        SymbolTable::default()
    }

    /// Record that class `original` was renamed to `obfuscated`.
    ///
    /// A later registration for the same obfuscated name replaces the
    /// earlier one.
    pub fn register_class(&mut self, original: &str, obfuscated: &str) -> bool {
        if let Some(previous) = self
            .classes
            .insert(obfuscated.to_string(), original.to_string())
        {
            if previous != original {
                debug!(
                    "class {} was {}, now mapped to {}",
                    obfuscated, previous, original
                );
            }
        }
        true
    }

    /// Record the source file that the original `class` was compiled from.
    pub fn register_source_file(&mut self, class: &str, file_name: &str) {
        self.source_files
            .insert(class.to_string(), file_name.to_string());
    }

    /// Record that field `original` of `class` was renamed to `obfuscated`.
    pub fn register_field(&mut self, class: &str, obfuscated: &str, original: &str, type_name: &str) {
        self.fields
            .entry(class.to_string())
            .or_default()
            .entry(obfuscated.to_string())
            .or_default()
            .push(FieldMapping {
                name: original.to_string(),
                type_name: type_name.to_string(),
            });
    }

    /// Record that method `original` of `class` was renamed to `obfuscated`.
    ///
    /// Entries are never merged, every call adds a new candidate.
    pub fn register_method(
        &mut self,
        class: &str,
        obfuscated: &str,
        original: &str,
        descriptor: MethodDescriptor,
        original_range: Option<LineRange>,
        obfuscated_range: Option<LineRange>,
    ) {
        self.methods
            .entry(class.to_string())
            .or_default()
            .entry(obfuscated.to_string())
            .or_default()
            .push(MethodMapping {
                name: original.to_string(),
                descriptor,
                original_range,
                obfuscated_range,
            });
    }

    /// The number of classes in the table.
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// The number of method entries in the table.
    pub fn method_count(&self) -> usize {
        self.methods
            .values()
            .flat_map(|methods| methods.values())
            .map(Vec::len)
            .sum()
    }

    /// The original name of the class `obfuscated`, or `obfuscated` itself
    /// if the table doesn't know it.
    pub fn original_class_name<'a>(&'a self, obfuscated: &'a str) -> &'a str {
        self.classes
            .get(obfuscated)
            .map(String::as_str)
            .unwrap_or(obfuscated)
    }

    /// The original spelling of a type like `a.b` or `a.b[][]`.
    ///
    /// Primitive and unknown types come back unchanged.
    pub fn original_type(&self, obfuscated: &str) -> String {
        let base = obfuscated.trim_end_matches("[]");
        let dimensions = &obfuscated[base.len()..];
        format!("{}{}", self.original_class_name(base), dimensions)
    }

    /// The source file of the original `class`.
    ///
    /// Without a recorded file name this guesses `Outer.java` from the
    /// outermost class's simple name.
    pub fn source_file_name(&self, class: &str) -> String {
        if let Some(file_name) = self.source_files.get(class) {
            return file_name.clone();
        }
        let simple = class.rsplit('.').next().unwrap_or(class);
        let outer = simple.split('$').next().unwrap_or(simple);
        format!("{}.java", outer)
    }

    /// Map an obfuscated frame back to every original frame it could stand
    /// for.
    ///
    /// Returns `None` if the frame has no class or its class isn't in the
    /// table. Otherwise at least one frame is returned: several if a field
    /// or method name is ambiguous, or if the line belongs to inlined code.
    /// Candidates come in the order their mappings were registered, which
    /// for inlined methods is innermost first.
    pub fn transform(&self, frame: &Frame) -> Option<Vec<Frame>> {
        let obfuscated_class = frame.class_name()?;
        let class = match self.classes.get(obfuscated_class) {
            Some(class) => class,
            None => {
                trace!("class {} is not in the mapping", obfuscated_class);
                return None;
            }
        };

        let line = frame.line_number();
        let source_file = |class: &str| match frame.source_file() {
            Some(file_name) => file_name.to_string(),
            None => self.source_file_name(class),
        };

        let mut base = Frame::default()
            .with_class_name(class.as_str())
            .with_source_file(source_file(class.as_str()))
            .with_line_number(line);
        if let Some(type_name) = frame.type_name() {
            base = base.with_type_name(self.original_type(type_name));
        }
        if let Some(method) = frame.method_name() {
            base = base.with_method_name(method);
        }
        if let Some(arguments) = frame.arguments() {
            base = base.with_arguments(arguments);
        }

        let with_fields: Vec<Frame> = match frame.field_name() {
            Some(field) => match self.fields.get(class).and_then(|fields| fields.get(field)) {
                Some(entries) => entries
                    .iter()
                    .map(|entry| {
                        base.clone()
                            .with_field_name(entry.name.as_str())
                            .with_type_name(entry.type_name.as_str())
                    })
                    .collect(),
                None => vec![base.with_field_name(field)],
            },
            None => vec![base],
        };

        let entries = match frame.method_name().and_then(|method| {
            self.methods
                .get(class)
                .and_then(|methods| methods.get(method))
        }) {
            Some(entries) => entries,
            None => return Some(with_fields),
        };

        let mut survivors: Vec<&MethodMapping> = Vec::new();
        if line != 0 {
            survivors.extend(entries.iter().filter(|entry| {
                entry
                    .obfuscated_range
                    .map_or(false, |range| range.contains(line))
            }));
        }
        if survivors.is_empty() {
            survivors.extend(entries.iter());
        }
        trace!(
            "{}.{}:{} has {} of {} method candidates",
            class,
            frame.method_name().unwrap_or_default(),
            line,
            survivors.len(),
            entries.len()
        );

        let mut frames = Vec::with_capacity(with_fields.len() * survivors.len());
        for candidate in &with_fields {
            for entry in &survivors {
                let (qualifier, name) = entry.split_name();
                let mut resolved = candidate
                    .clone()
                    .with_method_name(name)
                    .with_type_name(entry.descriptor.return_type.as_str())
                    .with_arguments(entry.descriptor.arguments.as_str())
                    .with_line_number(entry.original_line(line));
                if let Some(inlined_from) = qualifier {
                    resolved = resolved
                        .with_class_name(inlined_from)
                        .with_source_file(source_file(inlined_from));
                }
                frames.push(resolved);
            }
        }
        Some(frames)
    }
}

impl MappingSink for SymbolTable {
    fn register_class(&mut self, original: &str, obfuscated: &str) -> bool {
        SymbolTable::register_class(self, original, obfuscated)
    }

    fn register_source_file(&mut self, class: &str, file_name: &str) {
        SymbolTable::register_source_file(self, class, file_name)
    }

    fn register_field(&mut self, class: &str, obfuscated: &str, original: &str, type_name: &str) {
        SymbolTable::register_field(self, class, obfuscated, original, type_name)
    }

    fn register_method(
        &mut self,
        class: &str,
        obfuscated: &str,
        original: &str,
        descriptor: MethodDescriptor,
        original_range: Option<LineRange>,
        obfuscated_range: Option<LineRange>,
    ) {
        SymbolTable::register_method(
            self,
            class,
            obfuscated,
            original,
            descriptor,
            original_range,
            obfuscated_range,
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn table() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.register_class("com.example.OriginalClass", "a.b");
        table.register_method(
            "com.example.OriginalClass",
            "d",
            "originalMethod",
            MethodDescriptor::new("void", ""),
            None,
            None,
        );
        table
    }

    #[test]
    fn test_original_class_name() {
        let table = table();
        assert_eq!(table.original_class_name("a.b"), "com.example.OriginalClass");
        assert_eq!(table.original_class_name("x.y"), "x.y");
        let missing: Option<&str> = None;
        assert_eq!(missing.map(|c| table.original_class_name(c)), None);
    }

    #[test]
    fn test_register_class_last_write_wins() {
        let mut table = table();
        assert!(table.register_class("com.example.Replacement", "a.b"));
        assert_eq!(table.original_class_name("a.b"), "com.example.Replacement");
        assert_eq!(table.class_count(), 1);
    }

    #[test]
    fn test_original_type() {
        let table = table();
        assert_eq!(table.original_type("a.b"), "com.example.OriginalClass");
        assert_eq!(table.original_type("a.b[][]"), "com.example.OriginalClass[][]");
        assert_eq!(table.original_type("int[]"), "int[]");
    }

    #[test]
    fn test_source_file_name() {
        let mut table = table();
        assert_eq!(table.source_file_name("com.example.Outer$Inner$1"), "Outer.java");
        assert_eq!(table.source_file_name("Toplevel"), "Toplevel.java");
        table.register_source_file("com.example.Outer$Inner$1", "Outer.kt");
        assert_eq!(table.source_file_name("com.example.Outer$Inner$1"), "Outer.kt");
    }

    #[test]
    fn test_transform_unknown_class() {
        let table = table();
        assert_eq!(table.transform(&Frame::new("x.y", "d", 1)), None);
        assert_eq!(table.transform(&Frame::default().with_method_name("d")), None);
    }

    #[test]
    fn test_transform_method() {
        let table = table();
        let frames = table.transform(&Frame::new("a.b", "d", 10)).unwrap();
        assert_eq!(
            frames,
            vec![Frame::new("com.example.OriginalClass", "originalMethod", 10)
                .with_source_file("OriginalClass.java")
                .with_type_name("void")
                .with_arguments("")]
        );
    }

    #[test]
    fn test_transform_keeps_source_file() {
        let table = table();
        let frame = Frame::new("a.b", "d", 0).with_source_file("Unknown Source");
        let frames = table.transform(&frame).unwrap();
        assert_eq!(frames[0].source_file(), Some("Unknown Source"));
        assert_eq!(frames[0].line_number(), 0);
    }

    #[test]
    fn test_transform_unknown_method() {
        let table = table();
        let frames = table.transform(&Frame::new("a.b", "zz", 4)).unwrap();
        assert_eq!(
            frames,
            vec![Frame::new("com.example.OriginalClass", "zz", 4)
                .with_source_file("OriginalClass.java")]
        );
    }

    #[test]
    fn test_transform_class_only() {
        let table = table();
        let frames = table
            .transform(&Frame::default().with_class_name("a.b"))
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].class_name(), Some("com.example.OriginalClass"));
        assert_eq!(frames[0].method_name(), None);
    }

    #[test]
    fn test_transform_overloads_without_ranges() {
        let mut table = table();
        table.register_method(
            "com.example.OriginalClass",
            "d",
            "otherMethod",
            MethodDescriptor::new("int", "java.lang.String"),
            None,
            None,
        );
        let frames = table.transform(&Frame::new("a.b", "d", 10)).unwrap();
        let names: Vec<_> = frames.iter().map(|f| f.method_name().unwrap()).collect();
        assert_eq!(names, vec!["originalMethod", "otherMethod"]);
        assert_eq!(frames[1].type_name(), Some("int"));
        assert_eq!(frames[1].arguments(), Some("java.lang.String"));
    }

    #[test]
    fn test_transform_line_ranges() {
        let mut table = SymbolTable::new();
        table.register_class("com.example.Main", "a");
        for (name, obfuscated, original) in [
            ("first", LineRange::new(1, 3), LineRange::new(20, 22)),
            ("second", LineRange::new(4, 6), LineRange::new(40, 42)),
        ] {
            table.register_method(
                "com.example.Main",
                "a",
                name,
                MethodDescriptor::new("void", ""),
                Some(original),
                Some(obfuscated),
            );
        }

        let frames = table.transform(&Frame::new("a", "a", 2)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].method_name(), Some("first"));
        assert_eq!(frames[0].line_number(), 21);

        let frames = table.transform(&Frame::new("a", "a", 6)).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].method_name(), Some("second"));
        assert_eq!(frames[0].line_number(), 42);

        // No range contains the line, so every entry is a candidate.
        let frames = table.transform(&Frame::new("a", "a", 99)).unwrap();
        assert_eq!(frames.len(), 2);

        // An unknown line doesn't filter anything either.
        let frames = table.transform(&Frame::new("a", "a", 0)).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.line_number() == 0));
    }

    #[test]
    fn test_transform_inlined_from_other_class() {
        let mut table = SymbolTable::new();
        table.register_class("com.example.Main", "a");
        table.register_class("com.example.Util", "b");
        table.register_source_file("com.example.Util", "Util.kt");
        table.register_method(
            "com.example.Main",
            "a",
            "com.example.Util.log",
            MethodDescriptor::new("void", "java.lang.String"),
            Some(LineRange::single(7)),
            Some(LineRange::single(5)),
        );
        table.register_method(
            "com.example.Main",
            "a",
            "run",
            MethodDescriptor::new("void", ""),
            Some(LineRange::single(31)),
            Some(LineRange::single(5)),
        );

        let frames = table.transform(&Frame::new("a", "a", 5)).unwrap();
        assert_eq!(
            frames,
            vec![
                Frame::new("com.example.Util", "log", 7)
                    .with_source_file("Util.kt")
                    .with_type_name("void")
                    .with_arguments("java.lang.String"),
                Frame::new("com.example.Main", "run", 31)
                    .with_source_file("Main.java")
                    .with_type_name("void")
                    .with_arguments(""),
            ]
        );
    }

    #[test]
    fn test_transform_fields() {
        let mut table = table();
        table.register_field("com.example.OriginalClass", "a", "count", "int");
        table.register_field("com.example.OriginalClass", "a", "owner", "a.b");

        let frame = Frame::default().with_class_name("a.b").with_field_name("a");
        let frames = table.transform(&frame).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].field_name(), Some("count"));
        assert_eq!(frames[0].type_name(), Some("int"));
        assert_eq!(frames[1].field_name(), Some("owner"));
        assert_eq!(frames[1].type_name(), Some("a.b"));

        // An unknown field keeps its name, but its type is still mapped.
        let frame = Frame::default()
            .with_class_name("a.b")
            .with_field_name("q")
            .with_type_name("a.b[]");
        let frames = table.transform(&frame).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].field_name(), Some("q"));
        assert_eq!(frames[0].type_name(), Some("com.example.OriginalClass[]"));
    }

    #[test]
    fn test_counts() {
        let mut table = table();
        table.register_class("com.example.Other", "a.c");
        table.register_method(
            "com.example.Other",
            "a",
            "x",
            MethodDescriptor::default(),
            None,
            None,
        );
        assert_eq!(table.class_count(), 2);
        assert_eq!(table.method_count(), 2);
    }

    #[test]
    fn test_table_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SymbolTable>();
    }
}
