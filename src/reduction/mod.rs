//! # Reduction Engine
//!
//! Drives one system's graph to a consistent interpretation:
//!
//! ```text
//! materialize glyph exclusions (optional)
//! initial grade sweep
//! loop pass = 1..=max_passes
//!     resolve exclusions   lower contextual grade loses, tie → larger id loses
//!     grade sweep          removed nodes stop supporting their partners
//!     no removal && max Δgrade ≤ ε  →  Converged
//! ```
//!
//! Exclusions are visited in relation id order. Within a pass the grades
//! compared are those left by the previous sweep; node states are live, so an
//! exclusion whose endpoint already lost earlier in the same pass is skipped
//! and stays unresolved (it is inert from then on).
//!
//! Preparation and each pass are atomic with respect to cancellation: if the
//! token fires while one is in flight, the graph is restored to the state it
//! had before that step started. A token that is already set leaves the graph
//! untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::config::ReductionConfig;
use crate::grade::{self, GradeSweep};
use crate::model::{InterId, Removal, Resolution, SystemId};
use crate::sig::Sig;
use crate::Result;

// ============================================================================
// States and outcomes
// ============================================================================

/// Global engine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Running,
    Converged,
}

/// How a reduction ended. Only `Converged` is a clean result; the other two
/// still leave a usable accepted set behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Converged,
    /// `max_passes` reached while the graph was still changing.
    IterationBound,
    /// Aborted by a [`CancelToken`]; the last complete pass is kept.
    Cancelled,
}

/// Cooperative cancellation flag, cheap to clone and share across threads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-system summary handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionReport {
    pub system: SystemId,
    pub outcome: Outcome,
    /// Completed passes, the initial grade sweep excluded.
    pub passes: u32,
    /// Removed nodes, in removal order.
    pub removed: Vec<InterId>,
    /// Exclusions added for candidates sharing a glyph.
    pub materialized: usize,
    /// Largest grade change observed in the last completed pass.
    pub last_grade_delta: f64,
}

impl ReductionReport {
    pub fn is_converged(&self) -> bool {
        self.outcome == Outcome::Converged
    }

    /// Result usable but not at a fixpoint.
    pub fn is_degraded(&self) -> bool {
        !self.is_converged()
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Driver of one reduction. [`state`](Reducer::state) reflects the last run.
pub struct Reducer<'a> {
    sig: &'a mut Sig,
    config: &'a ReductionConfig,
    cancel: Option<&'a CancelToken>,
    state: EngineState,
    /// Fires the token right after the given pass resolved its exclusions.
    #[cfg(test)]
    cancel_after_resolution: Option<u32>,
}

impl<'a> Reducer<'a> {
    pub fn new(sig: &'a mut Sig, config: &'a ReductionConfig) -> Self {
        Self {
            sig,
            config,
            cancel: None,
            state: EngineState::Running,
            #[cfg(test)]
            cancel_after_resolution: None,
        }
    }

    pub fn with_cancel(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn run(&mut self) -> Result<ReductionReport> {
        self.config.validate()?;
        self.state = EngineState::Running;
        let system = self.sig.system();

        let mut report = ReductionReport {
            system,
            outcome: Outcome::IterationBound,
            passes: 0,
            removed: Vec::new(),
            materialized: 0,
            last_grade_delta: 0.0,
        };
        report.outcome = self.drive(&mut report)?;

        match report.outcome {
            Outcome::Converged => {
                self.state = EngineState::Converged;
                tracing::info!(
                    %system,
                    passes = report.passes,
                    accepted = self.sig.active_count(),
                    removed = report.removed.len(),
                    "system reduced"
                );
            }
            Outcome::IterationBound => tracing::warn!(
                %system,
                max_passes = self.config.max_passes,
                last_delta = report.last_grade_delta,
                "reduction hit its pass bound before converging"
            ),
            Outcome::Cancelled => tracing::warn!(%system, passes = report.passes, "reduction cancelled"),
        }
        Ok(report)
    }

    /// Preparation followed by the pass loop. Every step is applied whole or
    /// rolled back before `Cancelled` is returned.
    fn drive(&mut self, report: &mut ReductionReport) -> Result<Outcome> {
        if self.cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let untouched = self.sig.checkpoint();
        report.materialized = if self.config.materialize_glyph_exclusions {
            self.sig.materialize_glyph_exclusions()?
        } else {
            0
        };
        grade::recompute_all(self.sig);
        if self.cancelled() {
            self.sig.restore(&untouched)?;
            report.materialized = 0;
            return Ok(Outcome::Cancelled);
        }

        for number in 1..=self.config.max_passes {
            if self.cancelled() {
                return Ok(Outcome::Cancelled);
            }
            if let Some(outcome) = self.pass(number, report)? {
                return Ok(outcome);
            }
        }
        Ok(Outcome::IterationBound)
    }

    /// One pass. `Some` ends the reduction, `None` asks for another pass.
    fn pass(&mut self, number: u32, report: &mut ReductionReport) -> Result<Option<Outcome>> {
        let checkpoint = self.sig.checkpoint();
        let removed = self.resolve_exclusions(number);

        #[cfg(test)]
        if self.cancel_after_resolution == Some(number) {
            if let Some(token) = self.cancel {
                token.cancel();
            }
        }

        if self.cancelled() {
            self.sig.restore(&checkpoint)?;
            return Ok(Some(Outcome::Cancelled));
        }
        let sweep: GradeSweep = grade::recompute_all(self.sig);

        report.passes = number;
        report.last_grade_delta = sweep.max_delta;
        let stable = removed.is_empty() && sweep.max_delta <= self.config.grade_epsilon;
        tracing::debug!(
            system = %self.sig.system(),
            pass = number,
            removed = removed.len(),
            regraded = sweep.changed,
            max_delta = sweep.max_delta,
            "reduction pass"
        );
        report.removed.extend(removed);

        Ok(stable.then_some(Outcome::Converged))
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }

    /// Step (a): settle every unresolved exclusion whose ends are both alive.
    fn resolve_exclusions(&mut self, pass: u32) -> Vec<InterId> {
        let pending: Vec<_> = self
            .sig
            .relations()
            .filter(|r| r.is_exclusion() && r.resolution() == Resolution::Unresolved)
            .map(|r| (r.id, r.source, r.target))
            .collect();

        let mut removed = Vec::new();
        for (rel, a, b) in pending {
            let (ia, ib) = (&self.sig.inters_slice()[a.index()], &self.sig.inters_slice()[b.index()]);
            if !(ia.is_active() && ib.is_active()) {
                continue;
            }
            let (ga, gb) = (ia.contextual_grade(), ib.contextual_grade());
            let (loser, grade) = if ga < gb || (ga == gb && a > b) { (a, ga) } else { (b, gb) };

            self.sig.mark_removed(loser, Removal { by: rel, pass, grade });
            self.sig.mark_resolved(rel);
            tracing::debug!(%loser, %rel, grade, "exclusion resolved");
            removed.push(loser);
        }
        removed
    }
}

/// Reduce `sig` to its accepted interpretation set.
pub fn reduce(sig: &mut Sig, config: &ReductionConfig) -> Result<ReductionReport> {
    Reducer::new(sig, config).run()
}

/// Like [`reduce`], checking `token` between and inside passes.
pub fn reduce_with_cancel(sig: &mut Sig, config: &ReductionConfig, token: &CancelToken) -> Result<ReductionReport> {
    Reducer::new(sig, config).with_cancel(token).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::*;

    fn sig() -> Sig {
        Sig::new(SystemId(0), Scale::new(10.0).unwrap())
    }

    fn add(g: &mut Sig, shape: Shape, grade: f64) -> InterId {
        g.add_inter(Candidate::new(shape, Rectangle::new(0.0, 0.0, 5.0, 5.0), grade)).unwrap()
    }

    #[test]
    fn lower_grade_loses() {
        let mut g = sig();
        let a = add(&mut g, Shape::Sharp, 0.8);
        let b = add(&mut g, Shape::Flat, 0.6);
        let x = g.add_exclusion(a, b, ExclusionCause::Incompatible).unwrap();

        let report = reduce(&mut g, &ReductionConfig::default()).unwrap();
        assert!(report.is_converged());
        assert_eq!(report.removed, vec![b]);
        assert_eq!(g.inter(b).unwrap().removal().unwrap().by, x);
        assert_eq!(g.relation(x).unwrap().resolution(), Resolution::Resolved);
    }

    #[test]
    fn tie_removes_larger_id() {
        let mut g = sig();
        let a = add(&mut g, Shape::Sharp, 0.5);
        let b = add(&mut g, Shape::Flat, 0.5);
        g.add_exclusion(b, a, ExclusionCause::Incompatible).unwrap();

        reduce(&mut g, &ReductionConfig::default()).unwrap();
        assert!(g.inter(a).unwrap().is_active());
        assert!(!g.inter(b).unwrap().is_active());
    }

    #[test]
    fn chain_skips_exclusion_with_dead_endpoint() {
        let mut g = sig();
        let a = add(&mut g, Shape::Sharp, 0.9);
        let b = add(&mut g, Shape::Flat, 0.6);
        let c = add(&mut g, Shape::Natural, 0.3);
        g.add_exclusion(a, b, ExclusionCause::Overlap).unwrap();
        let bc = g.add_exclusion(b, c, ExclusionCause::Overlap).unwrap();

        let report = reduce(&mut g, &ReductionConfig::default()).unwrap();
        assert_eq!(report.removed, vec![b]);
        assert!(g.inter(c).unwrap().is_active());
        assert_eq!(g.relation(bc).unwrap().resolution(), Resolution::Unresolved);
        assert!(g.is_inert(g.relation(bc).unwrap()));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut g = sig();
        let config = ReductionConfig { max_passes: 0, ..ReductionConfig::default() };
        assert!(reduce(&mut g, &config).is_err());
    }

    #[test]
    fn pre_cancelled_token_leaves_graph_untouched() {
        let mut g = sig();
        let a = add(&mut g, Shape::Sharp, 0.8);
        let b = add(&mut g, Shape::Flat, 0.6);
        g.add_exclusion(a, b, ExclusionCause::Incompatible).unwrap();

        let token = CancelToken::new();
        token.cancel();
        let report = reduce_with_cancel(&mut g, &ReductionConfig::default(), &token).unwrap();
        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.passes, 0);
        assert_eq!(g.active_count(), 2);
    }

    #[test]
    fn reducer_reports_converged_state() {
        let mut g = sig();
        add(&mut g, Shape::Stem, 0.4);
        let config = ReductionConfig::default();
        let mut reducer = Reducer::new(&mut g, &config);
        assert_eq!(reducer.state(), EngineState::Running);
        let report = reducer.run().unwrap();
        assert_eq!(report.passes, 1);
        assert!(report.is_converged());
        assert_eq!(reducer.state(), EngineState::Converged);
    }

    #[test]
    fn cancelled_reducer_stays_running() {
        let mut g = sig();
        add(&mut g, Shape::Stem, 0.4);
        let (config, token) = (ReductionConfig::default(), CancelToken::new());
        token.cancel();
        let mut reducer = Reducer::new(&mut g, &config).with_cancel(&token);
        assert_eq!(reducer.run().unwrap().outcome, Outcome::Cancelled);
        assert_eq!(reducer.state(), EngineState::Running);
    }

    /// Everything reduction may change, per node and per relation.
    fn observable(g: &Sig) -> (Vec<(bool, f64, Option<Removal>)>, Vec<Resolution>) {
        (
            g.inters().map(|i| (i.is_active(), i.contextual_grade(), i.removal().copied())).collect(),
            g.relations().map(|r| r.resolution()).collect(),
        )
    }

    /// `a` clashes with `b`, and `b` with `c`: pass 1 removes `b`, pass 2 is quiet.
    fn clash_chain() -> (Sig, [InterId; 3]) {
        let mut g = sig();
        let a = add(&mut g, Shape::Sharp, 0.9);
        let b = add(&mut g, Shape::Flat, 0.6);
        let c = add(&mut g, Shape::Natural, 0.3);
        g.add_exclusion(a, b, ExclusionCause::Overlap).unwrap();
        g.add_exclusion(c, b, ExclusionCause::Overlap).unwrap();
        (g, [a, b, c])
    }

    #[test]
    fn cancel_inside_first_pass_rolls_it_back() {
        let (mut g, _) = clash_chain();
        let before = observable(&g);

        let (config, token) = (ReductionConfig::default(), CancelToken::new());
        let mut reducer = Reducer::new(&mut g, &config).with_cancel(&token);
        reducer.cancel_after_resolution = Some(1);
        let report = reducer.run().unwrap();

        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.passes, 0);
        assert!(report.removed.is_empty());
        assert_eq!(observable(&g), before);
    }

    #[test]
    fn cancel_inside_second_pass_keeps_the_first() {
        let (mut g, [a, b, c]) = clash_chain();
        let (config, token) = (ReductionConfig::default(), CancelToken::new());
        let mut reducer = Reducer::new(&mut g, &config).with_cancel(&token);
        reducer.cancel_after_resolution = Some(2);
        let report = reducer.run().unwrap();

        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.passes, 1);
        assert_eq!(report.removed, vec![b]);
        assert!(g.inter(a).unwrap().is_active());
        assert!(g.inter(c).unwrap().is_active());
        assert_eq!(g.inter(b).unwrap().removal().unwrap().pass, 1);
    }

    #[test]
    fn pre_cancelled_run_skips_preparation() {
        let mut g = sig();
        let rect = Rectangle::new(0.0, 0.0, 6.0, 6.0);
        let head = g.add_inter(Candidate::new(Shape::NoteHeadBlack, rect, 0.6).with_glyph(7)).unwrap();
        let stem = g.add_inter(Candidate::new(Shape::Stem, rect, 0.7)).unwrap();
        g.add_inter(Candidate::new(Shape::Sharp, rect, 0.4).with_glyph(7)).unwrap();
        g.add_support(SupportKind::HeadStem, head, stem, 0.9).unwrap();
        let before = observable(&g);

        let token = CancelToken::new();
        token.cancel();
        let report = reduce_with_cancel(&mut g, &ReductionConfig::default(), &token).unwrap();

        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.materialized, 0);
        assert_eq!(g.relation_count(), 1);
        assert_eq!(g.inter(head).unwrap().contextual_grade(), 0.6);
        assert_eq!(observable(&g), before);
    }
}
