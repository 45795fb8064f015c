//! Checkpoints of the mutable part of a graph.
//!
//! Reduction changes node states, contextual grades, removal records and
//! exclusion resolutions, and may append glyph exclusions before its first
//! pass. A checkpoint captures exactly those so a step can be rolled back as
//! a whole.

use crate::model::{InterState, Removal, Resolution, SystemId};
use crate::{Error, Result};
use super::Sig;

/// Opaque snapshot returned by [`Sig::checkpoint`].
#[derive(Debug, Clone)]
pub struct Checkpoint {
    system: SystemId,
    nodes: Vec<(InterState, f64, Option<Removal>)>,
    resolutions: Vec<Resolution>,
}

impl Checkpoint {
    pub fn system(&self) -> SystemId {
        self.system
    }
}

impl Sig {
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            system: self.system(),
            nodes: self
                .inters_slice()
                .iter()
                .map(|i| (i.state, i.contextual_grade, i.removal))
                .collect(),
            resolutions: self.relations_slice().iter().map(|r| r.resolution).collect(),
        }
    }

    /// Roll back to `checkpoint`. Relations created since it was taken are
    /// dropped.
    ///
    /// Fails if the checkpoint belongs to another system, or if nodes were
    /// added since it was taken.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<()> {
        if checkpoint.system != self.system {
            return Err(Error::StaleCheckpoint(format!(
                "checkpoint of {} applied to {}",
                checkpoint.system, self.system
            )));
        }
        if checkpoint.nodes.len() != self.inters.len() || checkpoint.resolutions.len() > self.relations.len() {
            return Err(Error::StaleCheckpoint(format!(
                "graph changed from {}/{} to {}/{} nodes/relations",
                checkpoint.nodes.len(),
                checkpoint.resolutions.len(),
                self.inters.len(),
                self.relations.len()
            )));
        }
        let kept = checkpoint.resolutions.len();
        if self.relations.len() > kept {
            tracing::debug!(system = %self.system, dropped = self.relations.len() - kept, "relations rolled back");
            self.relations.truncate(kept);
        }
        for (inter, &(state, grade, removal)) in self.inters.iter_mut().zip(&checkpoint.nodes) {
            inter.relations.retain(|rid| rid.index() < kept);
            inter.state = state;
            inter.contextual_grade = grade;
            inter.removal = removal;
        }
        for (rel, &resolution) in self.relations.iter_mut().zip(&checkpoint.resolutions) {
            rel.resolution = resolution;
        }
        Ok(())
    }
}
