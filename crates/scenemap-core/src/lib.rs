//! Scenemap Core: cross-reference engine for Godot project directories.
//!
//! This crate contains all analysis logic: text format readers for settings, scene,
//! resource and script files, scene graph building, reference resolution, and the
//! JSON / Markdown renderings of the resulting project model.

pub mod config;
pub mod error;
pub mod formats;
pub mod graph;
pub mod model;
pub mod output;
pub mod paths;
pub mod phases;
pub mod pipeline;
pub mod report;
