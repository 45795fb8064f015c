//! # Contextual Grade Engine
//!
//! ```text
//! contextual(n) = clamp(intrinsic(n) + Σ partner.contextual × strength × coeff(role of n), 0, 1)
//! ```
//!
//! The sum runs over support relations of `n` whose partner is active.
//! Exclusions and removed partners contribute nothing. Every computation
//! reads the grades currently stored in the graph, so a sweep over all
//! nodes computes first and writes afterwards: the result does not depend
//! on visiting order.

use crate::model::{Inter, InterId, RelId, RelationKind};
use crate::sig::Sig;
use crate::Result;

/// One supporting term of a contextual grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution {
    pub relation: RelId,
    pub partner: InterId,
    pub amount: f64,
}

/// Outcome of a full recomputation sweep.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradeSweep {
    /// Nodes whose grade changed.
    pub changed: usize,
    /// Largest absolute grade change.
    pub max_delta: f64,
}

/// Supporting terms currently feeding `id`.
pub fn contributions(sig: &Sig, id: InterId) -> Result<Vec<Contribution>> {
    let inter = sig.inter(id)?;
    Ok(support_terms(sig, inter).collect())
}

/// Contextual grade of `id` from the current graph state, without storing it.
///
/// A removed node keeps the grade it had when it was removed.
pub fn contextual_grade(sig: &Sig, id: InterId) -> Result<f64> {
    let inter = sig.inter(id)?;
    Ok(grade_of(sig, inter))
}

/// Compute and store the contextual grade of `id`.
pub fn compute_contextual_grade(sig: &mut Sig, id: InterId) -> Result<f64> {
    let grade = contextual_grade(sig, id)?;
    sig.set_contextual_grade(id, grade);
    Ok(grade)
}

/// Recompute every active node against one snapshot of the graph.
pub fn recompute_all(sig: &mut Sig) -> GradeSweep {
    let updates: Vec<(InterId, f64, f64)> = sig
        .inters_slice()
        .iter()
        .filter(|i| i.is_active())
        .map(|i| (i.id, i.contextual_grade(), grade_of(sig, i)))
        .collect();

    let mut sweep = GradeSweep::default();
    for (id, old, new) in updates {
        let delta = (new - old).abs();
        if delta > 0.0 {
            sweep.changed += 1;
            sweep.max_delta = sweep.max_delta.max(delta);
        }
        sig.set_contextual_grade(id, new);
    }
    sweep
}

fn grade_of(sig: &Sig, inter: &Inter) -> f64 {
    if !inter.is_active() {
        return inter.contextual_grade();
    }
    let raw = inter.intrinsic_grade() + support_terms(sig, inter).map(|c| c.amount).sum::<f64>();
    if !raw.is_finite() {
        tracing::warn!(inter = %inter.id, raw, "non-finite contextual grade, falling back to intrinsic");
        return inter.intrinsic_grade();
    }
    raw.clamp(0.0, 1.0)
}

fn support_terms<'a>(sig: &'a Sig, inter: &'a Inter) -> impl Iterator<Item = Contribution> + 'a {
    let inters = sig.inters_slice();
    let relations = sig.relations_slice();
    let id = inter.id;
    inter
        .relations()
        .iter()
        .map(move |rid| &relations[rid.index()])
        .filter_map(move |rel| {
            let RelationKind::Support(kind) = rel.kind else {
                return None;
            };
            let partner = &inters[rel.other(id)?.index()];
            if !partner.is_active() {
                return None;
            }
            let coeff = sig.catalog().spec(kind).role_coeff(rel.source == id);
            let amount = unit("partner grade", partner.contextual_grade())
                * unit("relation strength", rel.strength)
                * coeff;
            Some(Contribution { relation: rel.id, partner: partner.id, amount })
        })
}

/// Clamp a value that should already lie in [0,1], reporting drift.
fn unit(what: &'static str, v: f64) -> f64 {
    if (0.0..=1.0).contains(&v) {
        v
    } else {
        tracing::warn!(what, value = v, "value outside [0,1], clamped");
        if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
    }
}
