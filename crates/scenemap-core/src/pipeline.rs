//! Sequential phase orchestrator with timing.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{ScanConfig, ScanInput};
use crate::error::ScanError;
use crate::model::ProjectModel;
use crate::phases;
use crate::phases::parsing::ParsedProject;
use crate::phases::references::ResolvedReferences;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("structure", "Discovering project files"),
    ("parsing", "Reading scenes, scripts and resources"),
    ("references", "Resolving references"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Intermediate results handed from one phase to the next.
#[derive(Default)]
struct PipelineState {
    input: ScanInput,
    parsed: ParsedProject,
    resolved: ResolvedReferences,
}

type PhaseFn = Box<dyn FnOnce(&ScanConfig, &mut PipelineState) -> Result<(), ScanError>>;

/// A finished scan: the model plus per-phase timings in seconds.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub model: ProjectModel,
    pub timings: BTreeMap<String, f64>,
    pub total_ms: f64,
}

/// Execute the three-phase scan of `config.project_root`.
pub fn run_pipeline(
    config: &ScanConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<ScanResult, ScanError> {
    let mut state = PipelineState::default();
    let mut timings: BTreeMap<String, f64> = BTreeMap::new();
    let total_start = Instant::now();

    let phase_fns: Vec<(&str, PhaseFn)> = vec![
        (
            "structure",
            Box::new(|config: &ScanConfig, state: &mut PipelineState| -> Result<(), ScanError> {
                state.input = phases::structure::run_structure_phase(config)?;
                Ok(())
            }),
        ),
        (
            "parsing",
            Box::new(|_config: &ScanConfig, state: &mut PipelineState| -> Result<(), ScanError> {
                state.parsed = phases::parsing::run_parsing_phase(&state.input);
                Ok(())
            }),
        ),
        (
            "references",
            Box::new(|config: &ScanConfig, state: &mut PipelineState| -> Result<(), ScanError> {
                state.resolved =
                    phases::references::run_references_phase(&state.parsed, &state.input, config);
                Ok(())
            }),
        ),
    ];

    for (name, phase_fn) in phase_fns {
        if let Some(ref mut cb) = progress_callback {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }

        let start = Instant::now();
        phase_fn(config, &mut state)?;
        let elapsed = start.elapsed().as_secs_f64();
        log::debug!("phase {name} took {elapsed:.3}s");
        timings.insert(name.to_string(), elapsed);
    }

    let PipelineState {
        input,
        parsed,
        resolved,
    } = state;
    let model = ProjectModel::from_parts(&input, parsed, resolved);
    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;

    log::info!(
        "scanned {} files: {} warnings, {} unused resources",
        model.files.len(),
        model.warnings.len(),
        model.unused_resources.len()
    );

    Ok(ScanResult {
        model,
        timings,
        total_ms,
    })
}
