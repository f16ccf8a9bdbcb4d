//! Structural validation
//!
//! Run before the rewrite (a malformed export is fatal) and again after it
//! (a broken graph must never be written back to disk). Checks are purely
//! structural: declared outputs exist, no tensor has two producers, every
//! node input is satisfiable in graph order.

use std::collections::HashSet;

use crate::error::{ConvertError, ConvertResult};
use crate::proto::{GraphProto, ModelProto};
use crate::{SUPPORTED_OPSET_MAX, SUPPORTED_OPSET_MIN};

/// Findings from a validation run
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Defects that make the model unusable
    pub errors: Vec<String>,
    /// Oddities worth surfacing but not fatal
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no errors were found
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Whether an opset version is one this tool can rewrite
pub fn is_opset_supported(version: i64) -> bool {
    (SUPPORTED_OPSET_MIN..=SUPPORTED_OPSET_MAX).contains(&version)
}

/// Inspect a model's structure
///
/// A declared opset outside the supported range is only a warning here;
/// exports frequently omit or misstate it, and the CLI's `--opset` is what
/// gates the passes.
pub fn validate(model: &ModelProto) -> ValidationReport {
    let mut report = ValidationReport::default();

    if let Some(version) = model.opset_version() {
        if !is_opset_supported(version) {
            report.warnings.push(format!(
                "model declares opset {version}, supported range is \
                 {SUPPORTED_OPSET_MIN}..={SUPPORTED_OPSET_MAX}"
            ));
        }
    }

    match model.graph.as_ref() {
        Some(graph) => {
            check_outputs(graph, &mut report);
            check_producers(graph, &mut report);
            check_inputs_satisfied(graph, &mut report);
        }
        None => report.errors.push("model carries no graph".to_string()),
    }

    report
}

/// Validate a model, failing on any error
pub fn ensure_valid(model: &ModelProto) -> ConvertResult<()> {
    let report = validate(model);
    if report.is_clean() {
        Ok(())
    } else {
        Err(ConvertError::ValidationFailed(report.errors.join("; ")))
    }
}

fn check_outputs(graph: &GraphProto, report: &mut ValidationReport) {
    if graph.output.is_empty() {
        report.errors.push("graph declares no outputs".to_string());
    }
}

fn check_producers(graph: &GraphProto, report: &mut ValidationReport) {
    let mut produced = HashSet::new();
    for node in &graph.node {
        for output in &node.output {
            if !output.is_empty() && !produced.insert(output.as_str()) {
                report
                    .errors
                    .push(format!("tensor '{output}' has more than one producer"));
            }
        }
    }
}

fn check_inputs_satisfied(graph: &GraphProto, report: &mut ValidationReport) {
    let mut available: HashSet<&str> = graph
        .input
        .iter()
        .map(|vi| vi.name.as_str())
        .chain(graph.initializer.iter().map(|t| t.name.as_str()))
        .collect();

    for node in &graph.node {
        for input in &node.input {
            if !input.is_empty() && !available.contains(input.as_str()) {
                report.errors.push(format!(
                    "node '{}' reads tensor '{input}' that nothing provides",
                    node.name
                ));
            }
        }
        available.extend(node.output.iter().map(String::as_str).filter(|o| !o.is_empty()));
    }
}
