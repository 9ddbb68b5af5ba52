//! Structured text reports of a weld session.
//!
//! Reports are plain text, not JSON, so a failing test can print the whole
//! state of the bench in a form that reads top to bottom.

use std::fmt;

use weld_kernel::KernelIntrospect;
use weld_ops::WeldSide;

use crate::workflow::WeldBench;

/// A complete weld report.
pub struct WeldReport {
    pub entries: Vec<WeldEntry>,
    pub solid_count: usize,
    pub weld_counter: u64,
    pub warnings: Vec<String>,
    pub errors: Vec<(String, String)>,
}

/// A single feature's report entry.
pub struct WeldEntry {
    pub index: usize,
    pub name: String,
    pub label: String,
    pub suppressed: bool,
    pub bodies: Vec<String>,
    pub sections: Vec<SectionSummary>,
    pub treated_ends: usize,
}

/// One placed cross-section.
pub struct SectionSummary {
    pub op: String,
    pub side: WeldSide,
    pub depth: f64,
    pub dist_out: f64,
}

impl WeldReport {
    /// Format the report as text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str("=== Weld Report ===\n\n");

        let suppressed = self.entries.iter().filter(|e| e.suppressed).count();
        out.push_str(&format!(
            "Welds ({} features, {} suppressed, {} errors):\n",
            self.entries.len(),
            suppressed,
            self.errors.len(),
        ));
        for entry in &self.entries {
            let sup = if entry.suppressed { " [SUPPRESSED]" } else { "" };
            out.push_str(&format!(
                "  [{}] {} \"{}\"{}\n",
                entry.index, entry.label, entry.name, sup,
            ));
            if !entry.bodies.is_empty() {
                out.push_str(&format!("      Bodies: {}\n", entry.bodies.join(", ")));
            }
            for s in &entry.sections {
                let side = match s.side {
                    WeldSide::Primary => "primary",
                    WeldSide::Other => "other",
                };
                out.push_str(&format!(
                    "      Section {} ({side}): depth {:.3}, dist_out {:.3}\n",
                    s.op, s.depth, s.dist_out,
                ));
            }
            if entry.treated_ends > 0 {
                out.push_str(&format!("      Treated ends: {}\n", entry.treated_ends));
            }
        }

        out.push_str(&format!("\nSolids: {}\n", self.solid_count));
        out.push_str(&format!("Weld counter: {}\n", self.weld_counter));

        if !self.warnings.is_empty() {
            out.push_str(&format!("\nWarnings ({}):\n", self.warnings.len()));
            for w in &self.warnings {
                out.push_str(&format!("  {w}\n"));
            }
        }

        if self.errors.is_empty() {
            out.push_str("\nErrors: none\n");
        } else {
            out.push_str(&format!("\nErrors ({}):\n", self.errors.len()));
            for (feature, msg) in &self.errors {
                out.push_str(&format!("  {feature}: {msg}\n"));
            }
        }
        out
    }
}

impl fmt::Display for WeldReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl WeldBench {
    /// Generate a report of the last rebuild.
    pub fn report(&self) -> WeldReport {
        let entries = self
            .engine
            .features
            .features
            .iter()
            .enumerate()
            .map(|(index, feature)| {
                let result = self.engine.get_result(feature.id);
                WeldEntry {
                    index,
                    name: feature.name.clone(),
                    label: feature.config.label(),
                    suppressed: feature.suppressed,
                    bodies: result.map(|r| r.names.clone()).unwrap_or_default(),
                    sections: result
                        .map(|r| {
                            r.sections
                                .iter()
                                .map(|s| SectionSummary {
                                    op: s.op.to_string(),
                                    side: s.side,
                                    depth: s.depth,
                                    dist_out: s.dist_out,
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                    treated_ends: result.map_or(0, |r| r.treated_ends),
                }
            })
            .collect();

        let errors = self
            .engine
            .errors
            .iter()
            .map(|(id, e)| {
                let name = self
                    .engine
                    .features
                    .find_feature(*id)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| id.to_string());
                (name, e.to_string())
            })
            .collect();

        WeldReport {
            entries,
            solid_count: self.kernel().solids().len(),
            weld_counter: self.weld_counter(),
            warnings: self.engine.warnings.clone(),
            errors,
        }
    }
}
