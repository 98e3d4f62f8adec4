//! `.tres` reader: same block grammar as scenes, only references are of interest.

use super::block::{body_text, parse_blocks, ExtResourceTable};
use super::Parsed;
use crate::config::ResourceDefinition;
use crate::paths;

pub fn parse_resource(text: &str, resource_path: &str) -> Parsed<ResourceDefinition> {
    let base_dir = paths::parent_dir(resource_path);
    let mut warnings = Vec::new();
    let blocks = parse_blocks(text);
    let ext = ExtResourceTable::from_blocks(&blocks, base_dir, &mut warnings);

    let mut record = ResourceDefinition {
        path: resource_path.to_string(),
        ..Default::default()
    };

    match blocks.iter().find(|b| b.tag == "gd_resource") {
        Some(header) => {
            record.resource_type = header.attr("type").map(str::to_string);
            record.script_class = header.attr("script_class").map(str::to_string);
            record.uid = header.attr("uid").map(str::to_string);
        }
        None => warnings.push("missing [gd_resource] header".to_string()),
    }

    record.references = ext.paths();
    record.references.extend(paths::scheme_literals(&body_text(text), base_dir));

    Parsed::new(record, warnings)
}
