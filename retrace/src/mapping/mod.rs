// Copyright 2015 Ted Mielczarek. See the COPYRIGHT
// file at the top-level directory of this distribution.

mod parser;
mod types;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

pub use crate::mapping::parser::MappingParser;
pub use crate::mapping::types::*;
use crate::{MappingError, SymbolTable};

/// The size of the chunks a mapping file is read in.
const READ_CHUNK_SIZE: usize = 1 << 16;

/// Receives the declarations read from a mapping file.
///
/// [`MappingParser`] calls these in file order: a class, then the members
/// of that class, then the next class.
pub trait MappingSink {
    /// Record that class `original` was renamed to `obfuscated`.
    ///
    /// Returning `false` tells the parser to skip the members of this class.
    fn register_class(&mut self, original: &str, obfuscated: &str) -> bool;
    /// Record the original source file of `class`.
    fn register_source_file(&mut self, class: &str, file_name: &str);
    /// Record that field `original` of type `type_name` in `class` was renamed
    /// to `obfuscated`.
    fn register_field(&mut self, class: &str, obfuscated: &str, original: &str, type_name: &str);
    /// Record that method `original` in `class` was renamed to `obfuscated`.
    fn register_method(
        &mut self,
        class: &str,
        obfuscated: &str,
        original: &str,
        descriptor: MethodDescriptor,
        original_range: Option<LineRange>,
        obfuscated_range: Option<LineRange>,
    );
}

impl SymbolTable {
    /// Read a `SymbolTable` from the mapping file at `path`.
    pub fn from_file(path: &Path) -> Result<SymbolTable, MappingError> {
        let mut file = File::open(path)?;
        let table = Self::from_reader(&mut file)?;
        debug!(
            "loaded mapping {} ({} classes, {} methods)",
            path.display(),
            table.class_count(),
            table.method_count()
        );
        Ok(table)
    }

    /// Read a `SymbolTable` from a mapping file streamed out of `reader`.
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<SymbolTable, MappingError> {
        let mut parser = MappingParser::new(SymbolTable::new());
        let mut buf = Vec::with_capacity(READ_CHUNK_SIZE);
        let mut chunk = vec![0; READ_CHUNK_SIZE];
        loop {
            let read = reader.read(&mut chunk)?;
            if read == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..read]);
            let consumed = parser.parse_more(&buf)?;
            buf.drain(..consumed);
        }
        parser.finish(&buf)
    }

    /// Parse an in-memory mapping file.
    pub fn from_bytes(bytes: &[u8]) -> Result<SymbolTable, MappingError> {
        let mut parser = MappingParser::new(SymbolTable::new());
        let consumed = parser.parse_more(bytes)?;
        parser.finish(&bytes[consumed..])
    }
}
