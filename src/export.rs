//! Diagnostics export: read-only views of a reduced graph.
//!
//! Two flavours:
//!
//! ```text
//! export_dump()      → human-readable listing, one line per node / relation
//! SystemDiagnostics  → serde structure for JSON tooling
//! ```
//!
//! Neither is needed by reduction itself; they exist so that a viewer can
//! explain why a given interpretation was dropped.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::reduction::ReductionReport;
use crate::sig::Sig;
use crate::Result;

/// Write a textual dump of `sig`: accepted nodes, removed nodes with their
/// cause, then every relation (inert ones flagged).
pub fn export_dump(sig: &Sig, writer: &mut dyn Write) -> Result<()> {
    writeln!(writer, "// SIG {}", sig.system())?;
    writeln!(writer, "// Interpretations: {} ({} active)", sig.len(), sig.active_count())?;
    writeln!(writer, "// Relations: {}", sig.relation_count())?;
    writeln!(writer)?;

    writeln!(writer, "// Accepted")?;
    for inter in sig.active() {
        writeln!(
            writer,
            "{} {} grade={:.3} intrinsic={:.3}",
            inter.id,
            inter.shape,
            inter.contextual_grade(),
            inter.intrinsic_grade()
        )?;
    }

    writeln!(writer)?;
    writeln!(writer, "// Removed")?;
    for inter in sig.removed() {
        let cause = match inter.removal() {
            Some(r) => format!(" by {} in pass {}", r.by, r.pass),
            None => String::new(),
        };
        writeln!(writer, "{} {} grade={:.3}{}", inter.id, inter.shape, inter.contextual_grade(), cause)?;
    }

    writeln!(writer)?;
    writeln!(writer, "// Relations")?;
    for rel in sig.relations() {
        writeln!(
            writer,
            "{} {} -[{}]-> {} strength={:.3}{}",
            rel.id,
            rel.source,
            rel.kind,
            rel.target,
            rel.strength,
            if sig.is_inert(rel) { " inert" } else { "" }
        )?;
    }
    Ok(())
}

/// Snapshot of one node for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterRecord {
    pub id: InterId,
    pub shape: Shape,
    pub bounds: Rectangle,
    pub intrinsic_grade: f64,
    pub contextual_grade: f64,
    pub removal: Option<Removal>,
}

/// Snapshot of one relation for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub id: RelId,
    pub kind: RelationKind,
    pub source: InterId,
    pub target: InterId,
    pub strength: f64,
    pub resolution: Resolution,
    pub inert: bool,
}

/// Everything a viewer needs to explain a system's reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDiagnostics {
    pub system: SystemId,
    pub report: Option<ReductionReport>,
    pub accepted: Vec<InterRecord>,
    pub removed: Vec<InterRecord>,
    pub relations: Vec<RelationRecord>,
}

impl SystemDiagnostics {
    pub fn collect(sig: &Sig, report: Option<&ReductionReport>) -> Self {
        let record = |i: &Inter| InterRecord {
            id: i.id,
            shape: i.shape,
            bounds: i.bounds,
            intrinsic_grade: i.intrinsic_grade(),
            contextual_grade: i.contextual_grade(),
            removal: i.removal().copied(),
        };
        Self {
            system: sig.system(),
            report: report.cloned(),
            accepted: sig.active().map(record).collect(),
            removed: sig.removed().map(record).collect(),
            relations: sig
                .relations()
                .map(|r| RelationRecord {
                    id: r.id,
                    kind: r.kind,
                    source: r.source,
                    target: r.target,
                    strength: r.strength,
                    resolution: r.resolution(),
                    inert: sig.is_inert(r),
                })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
