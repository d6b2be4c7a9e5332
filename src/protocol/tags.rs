// src/protocol/tags.rs

use std::collections::{BTreeMap, HashSet};

use tracing::trace;

use super::handler::{OutputHandler, StopHandler};

/// Separator between tag name and value in `-S` output.
const SEPARATOR: &str = ": ";

/// Collects `Name: value` lines for a known set of tag names.
///
/// Lines without the separator and lines naming an unknown tag are skipped.
/// Whether to keep reading is decided by the wrapped [`StopHandler`].
#[derive(Debug, Default)]
pub struct TagHandler {
    known: HashSet<String>,
    values: BTreeMap<String, String>,
    stop: StopHandler,
}

impl TagHandler {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: known.into_iter().map(Into::into).collect(),
            values: BTreeMap::new(),
            stop: StopHandler::new(),
        }
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, String> {
        self.values
    }

    fn collect(&mut self, line: &str) {
        let Some((name, value)) = line.split_once(SEPARATOR) else {
            trace!(line, "ignoring line without tag separator");
            return;
        };

        if self.known.contains(name) {
            self.values.insert(name.to_string(), value.to_string());
        } else {
            trace!(tag = name, "ignoring unrequested tag");
        }
    }
}

impl OutputHandler for TagHandler {
    fn read_line(&mut self, line: Option<&str>) -> bool {
        if let Some(line) = line {
            self.collect(line);
        }
        self.stop.read_line(line)
    }
}
