// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

use std::fs;
use std::path::PathBuf;

use retrace::*;

fn testdata(file_name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.push("testdata");
    path.push(file_name);
    path
}

fn read_test_mapping() -> SymbolTable {
    SymbolTable::from_file(&testdata("mapping.txt")).unwrap()
}

fn retrace_str(retracer: &Retracer, input: &str) -> String {
    let mut output = Vec::new();
    retracer.retrace(input.as_bytes(), &mut output).unwrap();
    String::from_utf8(output).unwrap()
}

#[test]
fn test_mapping_file() {
    let table = read_test_mapping();
    assert_eq!(table.class_count(), 5);
    assert_eq!(table.method_count(), 13);
    assert_eq!(
        table.original_class_name("a.a.a"),
        "com.example.app.data.ProfileRepository"
    );
    assert_eq!(
        table.original_class_name("com.example.app.MainActivity"),
        "com.example.app.MainActivity"
    );
    assert_eq!(table.source_file_name("com.example.app.MainActivity"), "MainActivity.kt");
    assert_eq!(
        table.source_file_name("com.example.app.data.ProfileRepository"),
        "ProfileRepository.java"
    );
}

#[test]
fn test_retrace_stacktrace() {
    let table = read_test_mapping();
    let retracer = Retracer::new(&table, RetraceOptions::default());
    let input = fs::read_to_string(testdata("stacktrace.txt")).unwrap();
    let expected = fs::read_to_string(testdata("stacktrace.retraced.txt")).unwrap();
    assert_eq!(retrace_str(&retracer, &input), expected);
}

#[test]
fn test_simple_frame() {
    let table = SymbolTable::from_bytes(
        b"com.example.OriginalClass -> a.b:\n    void originalMethod() -> d\n",
    )
    .unwrap();
    let retracer = Retracer::new(&table, RetraceOptions::default());
    let output = retracer.retrace_line("    at a.b.d(SourceFile:10)");
    assert_eq!(output.len(), 1);
    assert!(output[0].contains("com.example.OriginalClass"));
    assert!(output[0].contains("originalMethod"));
    assert!(output[0].contains(":10)"));
}

#[test]
fn test_free_text_is_unchanged() {
    let table = read_test_mapping();
    let retracer = Retracer::new(&table, RetraceOptions::default());
    let input = "Nothing to see here.\n\n  12:00:01 INFO started in 3s\r\nno newline at the end";
    assert_eq!(retrace_str(&retracer, input), input);
}

#[test]
fn test_line_ranges() {
    let table =
        SymbolTable::from_bytes(b"com.example.Main -> a:\n    1:3:void run():20:22 -> a\n").unwrap();
    let retracer = Retracer::new(&table, RetraceOptions::default());
    assert_eq!(
        retracer.retrace_line("\tat a.a(SourceFile:2)"),
        vec!["\tat com.example.Main.run(SourceFile:21)"]
    );
}

#[test]
fn test_inlined_frames() {
    let table = read_test_mapping();
    let retracer = Retracer::new(&table, RetraceOptions::default());
    let frames = table
        .transform(&Frame::new("com.example.app.MainActivity", "onCreate", 5))
        .unwrap();
    let names: Vec<_> = frames
        .iter()
        .map(|f| format!("{}.{}:{}", f.class_name().unwrap(), f.method_name().unwrap(), f.line_number()))
        .collect();
    assert_eq!(
        names,
        vec![
            "com.example.app.util.Strings.check:9",
            "com.example.app.MainActivity.loadProfile:41",
            "com.example.app.MainActivity.onCreate:24",
        ]
    );
    // Without a source file in the trace, each frame gets its own.
    assert_eq!(frames[0].source_file(), Some("Strings.java"));
    assert_eq!(frames[1].source_file(), Some("MainActivity.kt"));

    let lines = retracer.retrace_line("\tat com.example.app.MainActivity.onCreate(SourceFile:5)");
    assert_eq!(lines.len(), 3);
}

#[test]
fn test_verbose() {
    let table = read_test_mapping();
    let options = RetraceOptions {
        verbose: true,
        ..RetraceOptions::default()
    };
    let retracer = Retracer::new(&table, options);
    assert_eq!(
        retracer.retrace_line("\tat a.a.a.a(SourceFile:2)"),
        vec!["\tat com.example.app.data.ProfileRepository.com.example.app.data.Profile load(java.lang.String)(SourceFile:31)"]
    );
    // Overloads that look the same without types are told apart now.
    let lines = retracer.retrace_line("\tat a.a.a.c(SourceFile)");
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("void reset()(SourceFile)"));
    assert!(lines[1].trim_start().starts_with("boolean)"));
}

#[test]
fn test_custom_template() {
    let table = read_test_mapping();
    let template = FrameTemplate::new(r"%c\.%m:%l", true).unwrap();
    let retracer = Retracer::with_templates(&table, vec![template], RetraceOptions::default());
    assert_eq!(
        retracer.retrace_line("a.a.b.a:1"),
        vec!["com.example.app.data.Profile.getName:14"]
    );
    // The default templates are not used anymore.
    assert_eq!(
        retracer.retrace_line("\tat a.a.b.a(SourceFile:1)"),
        vec!["\tat a.a.b.a(SourceFile:1)"]
    );
}

#[test]
fn test_all_class_names() {
    let table = read_test_mapping();
    let options = RetraceOptions {
        all_class_names: true,
        ..RetraceOptions::default()
    };
    let template = FrameTemplate::new(r"\s*at %c\.%m\(%s(?::%l)?\)", true).unwrap();
    let retracer = Retracer::with_templates(&table, vec![template], options);
    assert_eq!(
        retracer.retrace_line("Loaded a.a.b from a.a.a (2 entries)"),
        vec!["Loaded com.example.app.data.Profile from com.example.app.data.ProfileRepository (2 entries)"]
    );
}

#[test]
fn test_shared_table() {
    let table = read_test_mapping();
    let input = fs::read_to_string(testdata("stacktrace.txt")).unwrap();
    let expected = fs::read_to_string(testdata("stacktrace.retraced.txt")).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let retracer = Retracer::new(&table, RetraceOptions::default());
                assert_eq!(retrace_str(&retracer, &input), expected);
            });
        }
    });
}
