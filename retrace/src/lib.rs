// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

//! A library for de-obfuscating Java stack traces.
//!
//! ProGuard and R8 rename classes and members and compact line numbers,
//! writing down what they did in a mapping file. Given that mapping file,
//! this crate turns an obfuscated stack trace back into one that mentions
//! the original names and source lines.
//!
//! Read the mapping file into a [`SymbolTable`], then feed the stack trace
//! through a [`Retracer`]:
//!
//! ```
//! use retrace::{RetraceOptions, Retracer, SymbolTable};
//!
//! let mapping = b"com.example.Main -> a.a:\n    void run() -> b\n";
//! let table = SymbolTable::from_bytes(mapping).unwrap();
//! let retracer = Retracer::new(&table, RetraceOptions::default());
//! assert_eq!(
//!     retracer.retrace_line("\tat a.a.b(SourceFile:3)"),
//!     vec!["\tat com.example.Main.run(SourceFile:3)"]
//! );
//! ```
//!
//! Lines are recognized with [`FrameTemplate`]s. The default ones cover the
//! usual `at class.method(File:line)` frames and exception headers; others
//! can be given to [`Retracer::with_templates`].

use std::io;

mod frame;
pub mod mapping;
mod retracer;
mod symbol_table;
mod template;

pub use crate::frame::Frame;
pub use crate::retracer::{trim, RetraceOptions, Retracer};
pub use crate::symbol_table::SymbolTable;
pub use crate::template::{
    FrameTemplate, TemplateError, DEFAULT_FRAME_TEMPLATE, DEFAULT_HEADER_TEMPLATE,
};

/// Errors reading a mapping file.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("couldn't read input stream")]
    LoadError(#[from] io::Error),
    #[error("parse error: {0} at line {1}")]
    ParseError(&'static str, u64),
}
