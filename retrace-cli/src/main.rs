// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

use std::boxed::Box;
use std::env;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::ops::Deref;
use std::panic;
use std::path::Path;

use retrace::{FrameTemplate, RetraceOptions, Retracer, SymbolTable};

use clap::{AppSettings, Arg, Command};
use log::{debug, error};
use simplelog::{
    ColorChoice, ConfigBuilder, Level, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};

fn make_app() -> Command<'static> {
    Command::new("retrace-cli")
        .version(clap::crate_version!())
        .about("De-obfuscates a Java stack trace using a ProGuard or R8 mapping file.")
        .next_line_help(true)
        .setting(AppSettings::DeriveDisplayOrder)
        .override_usage("retrace-cli [OPTIONS] <mapping> [stacktrace]")
        .arg(Arg::new("verbose").long("verbose").long_help(
            "Print method return types and arguments, and field types.

Without this flag only the names of classes, methods and fields are rewritten. \
The ProGuard spelling -verbose is accepted too.",
        ))
        .arg(Arg::new("allclassnames").long("allclassnames").long_help(
            "Also de-obfuscate class names in lines that don't look like stack frames.

Any token that looks like a (qualified) Java class name and is in the mapping \
is replaced. The ProGuard spelling -allclassnames is accepted too.",
        ))
        .arg(
            Arg::new("regex")
                .long("regex")
                .takes_value(true)
                .value_name("template")
                .long_help(
                    "A template describing the stack trace lines to rewrite.

The template is a regular expression that must match a whole line, with these \
placeholders for the parts to de-obfuscate:

  %c  class name           %s  source file
  %l  line number          %t  field type or method return type
  %f  field name           %m  method name
  %a  method arguments     %%  a literal %

If given, this replaces the built-in templates for Java stack frames and exception \
headers. The ProGuard spelling -regex is accepted too.",
                ),
        )
        .arg(
            Arg::new("output-file")
                .long("output-file")
                .takes_value(true)
                .allow_invalid_utf8(true)
                .help("Where to write the output to (if unspecified, stdout is used)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .default_value("error")
                .takes_value(true)
                .possible_values(&["off", "error", "warn", "info", "debug", "trace"])
                .help("Set the level of logging output."),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .takes_value(true)
                .allow_invalid_utf8(true)
                .help("Where to log to (if unspecified, stderr is used)"),
        )
        .arg(
            Arg::new("mapping")
                .required(true)
                .takes_value(true)
                .allow_invalid_utf8(true)
                .help("Path to the mapping file written by ProGuard or R8."),
        )
        .arg(
            Arg::new("stacktrace")
                .takes_value(true)
                .allow_invalid_utf8(true)
                .help("Path to the stack trace to de-obfuscate (if unspecified, stdin is used)"),
        )
}

/// Accept ProGuard's single-dash spellings of the long options.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-verbose") => OsString::from("--verbose"),
            Some("-allclassnames") => OsString::from("--allclassnames"),
            Some("-regex") => OsString::from("--regex"),
            _ => arg,
        })
        .collect()
}

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let matches = make_app().get_matches_from(normalize_args(env::args_os()));

    let output_file = matches
        .value_of_os("output-file")
        .map(|os_str| Path::new(os_str).to_owned());

    let log_file = matches
        .value_of_os("log-file")
        .map(|os_str| Path::new(os_str).to_owned());

    let verbosity = match matches.value_of("log-level").unwrap() {
        "off" => LevelFilter::Off,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Error,
    };

    // Init the logger (and make trace logging less noisy)
    if let Some(log_path) = log_file {
        let log_file = match File::create(&log_path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("Couldn't create log file {}: {}", log_path.display(), err);
                std::process::exit(1);
            }
        };
        let _ = WriteLogger::init(
            verbosity,
            ConfigBuilder::new()
                .set_location_level(LevelFilter::Off)
                .set_time_level(LevelFilter::Off)
                .set_thread_level(LevelFilter::Off)
                .set_target_level(LevelFilter::Off)
                .build(),
            log_file,
        );
    } else {
        let _ = TermLogger::init(
            verbosity,
            ConfigBuilder::new()
                .set_location_level(LevelFilter::Off)
                .set_time_level(LevelFilter::Off)
                .set_thread_level(LevelFilter::Off)
                .set_target_level(LevelFilter::Off)
                .set_level_color(Level::Trace, None)
                .build(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        );
    }

    // Set a panic hook to redirect to the logger
    panic::set_hook(Box::new(|panic_info| {
        let (filename, line) = panic_info
            .location()
            .map(|loc| (loc.file(), loc.line()))
            .unwrap_or(("<unknown>", 0));
        let cause = panic_info
            .payload()
            .downcast_ref::<String>()
            .map(String::deref)
            .unwrap_or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<&str>()
                    .copied()
                    .unwrap_or("<cause unknown>")
            });
        error!(
            "Panic - A panic occurred at {}:{}: {}",
            filename, line, cause
        );
    }));

    let options = RetraceOptions {
        verbose: matches.is_present("verbose"),
        all_class_names: matches.is_present("allclassnames"),
    };

    let templates = match matches.value_of("regex") {
        Some(template) => match FrameTemplate::new(template, true) {
            Ok(template) => vec![template],
            Err(err) => {
                error!("Invalid --regex template: {}", err);
                std::process::exit(1);
            }
        },
        None => FrameTemplate::defaults(),
    };

    let mapping_path = matches.value_of_os("mapping").map(Path::new).unwrap();
    let table = match SymbolTable::from_file(mapping_path) {
        Ok(table) => table,
        Err(err) => {
            error!(
                "Error reading mapping file {}: {}",
                mapping_path.display(),
                err
            );
            std::process::exit(1);
        }
    };
    debug!(
        "{} classes and {} methods in {}",
        table.class_count(),
        table.method_count(),
        mapping_path.display()
    );

    let input: Box<dyn Read> = match matches.value_of_os("stacktrace").map(Path::new) {
        Some(path) => match File::open(path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                error!("Error opening stack trace {}: {}", path.display(), err);
                std::process::exit(1);
            }
        },
        None => Box::new(io::stdin()),
    };

    let output: Box<dyn Write> = match output_file {
        Some(output_path) => match File::create(&output_path) {
            Ok(file) => Box::new(file),
            Err(err) => {
                error!(
                    "Error creating output file {}: {}",
                    output_path.display(),
                    err
                );
                std::process::exit(1);
            }
        },
        None => Box::new(io::stdout()),
    };

    let retracer = Retracer::with_templates(&table, templates, options);
    if let Err(err) = retracer.retrace(BufReader::new(input), BufWriter::new(output)) {
        error!("Error retracing stack trace: {}", err);
        std::process::exit(1);
    }
}
