//! The three scan phases, run in order by [`crate::pipeline`].

pub mod parsing;
pub mod references;
pub mod structure;
