//! Text format readers. Each reader sees exactly one file and never fails:
//! malformed input degrades to a partial record plus warnings.

pub mod block;
pub mod resource;
pub mod scene;
pub mod script;
pub mod settings;

/// A reader's output: the record plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct Parsed<T> {
    pub record: T,
    pub warnings: Vec<String>,
}

impl<T> Parsed<T> {
    pub fn new(record: T, warnings: Vec<String>) -> Self {
        Self { record, warnings }
    }
}
