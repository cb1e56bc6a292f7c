use crate::calibration::CalTable;
use crate::error::{FormatError, RegistryError};

use std::collections::BTreeMap;
use std::fmt::Write;

/// Named handlers registered by the caller
///
/// Lookup is always explicit: a handler is used only when it is asked for by name.
#[derive(Debug)]
pub struct Registry<H> {
    handlers: BTreeMap<String, H>,
}

impl<H> Default for Registry<H> {
    fn default() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }
}

impl<H> Registry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, handler: H) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        log::trace!("registering handler {name:?}");
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&H, RegistryError> {
        self.handlers
            .get(name)
            .ok_or_else(|| RegistryError::Unknown {
                name: name.to_owned(),
                known: self.handlers.keys().cloned().collect(),
            })
    }

    /// Registered names in lexicographic order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Text rendering of a [CalTable]
pub trait CalTableFormatter: Send + Sync {
    fn format(&self, table: &CalTable) -> Result<String, FormatError>;
}

/// Pretty-printed JSON of the table
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter;

impl CalTableFormatter for JsonFormatter {
    fn format(&self, table: &CalTable) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(table)?)
    }
}

/// Tab-separated table, real and imaginary parts in separate columns, empty cells left blank
#[derive(Clone, Copy, Debug, Default)]
pub struct TsvFormatter;

impl CalTableFormatter for TsvFormatter {
    fn format(&self, table: &CalTable) -> Result<String, FormatError> {
        let mut output = String::from("time");
        for station in table.stations() {
            write!(output, "\t{station}.re\t{station}.im")?;
        }
        output.push('\n');
        for (time, cells) in table.rows() {
            write!(output, "{time}")?;
            for cell in cells {
                match cell {
                    Some(gain) => write!(output, "\t{}\t{}", gain.re, gain.im)?,
                    None => output.push_str("\t\t"),
                }
            }
            output.push('\n');
        }
        Ok(output)
    }
}

impl Registry<Box<dyn CalTableFormatter>> {
    /// Registry with the built-in formatters: "json" and "tsv"
    pub fn with_default_formatters() -> Self {
        let mut registry = Self::new();
        registry
            .handlers
            .insert("json".to_owned(), Box::new(JsonFormatter));
        registry
            .handlers
            .insert("tsv".to_owned(), Box::new(TsvFormatter));
        registry
    }
}
