#![no_main]
use libfuzzer_sys::fuzz_target;
use retrace::{Frame, FrameTemplate};

// The first line is the template, the rest are lines to match against it.
fuzz_target!(|data: &str| {
    let mut lines = data.lines();
    let template = match lines.next().map(|t| FrameTemplate::new(t, true)) {
        Some(Ok(template)) => template,
        _ => return,
    };
    let replacement = Frame::new("com.example.Class", "method", 42)
        .with_source_file("Class.java")
        .with_type_name("int")
        .with_arguments("java.lang.String");
    for line in lines {
        if let Some(frame) = template.parse(line) {
            assert!(template.format(line, &frame).is_some());
            assert!(template.format_verbose(line, &replacement).is_some());
        } else {
            assert!(template.format(line, &replacement).is_none());
        }
    }
});
