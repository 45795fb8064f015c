//! # Relation Catalog
//!
//! Every support kind carries a [`RelationSpec`]: the maximum gaps beyond
//! which the relation cannot exist, the per-axis impact weights, the
//! support coefficient injected into each endpoint role, and the curve that
//! turns the combined gap into a strength.
//!
//! ```text
//! dx, dy (interline fractions)
//!   dx > max_gap_x || dy > max_gap_y  → no relation
//!   t = (wx·dx/max_gap_x + wy·dy/max_gap_y) / (wx + wy)
//!   strength = curve(t) ∈ [0, 1], curve(0) = 1, curve(1) = 0
//! ```
//!
//! Gaps are measured from the source's reference point (or box) to the
//! target, according to each axis' [`GapMeasure`].

pub mod kinds;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::model::{Footprint, Scale, Shape, SupportKind};
use crate::{Error, Result};

// ============================================================================
// Gap measures
// ============================================================================

/// How one axis gap is measured between source and target.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum GapMeasure {
    /// Distance between the two reference points.
    #[default]
    Center,
    /// Distance from the source reference point to the target box, 0 inside.
    Outside,
    /// Like `Outside`, but a source point inside the target span means the
    /// two shapes overlap and cannot be related at all.
    StrictOutside,
    /// Distance between the two boxes, 0 when they overlap on this axis.
    BoxGap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl GapMeasure {
    /// Gap in pixels, or `None` when the geometry forbids the relation.
    fn measure(self, axis: Axis, source: &Footprint, target: &Footprint) -> Option<f64> {
        let (p, s_lo, s_hi, t_c, t_lo, t_hi) = match axis {
            Axis::X => (
                source.center.x,
                source.bounds.left(),
                source.bounds.right(),
                target.center.x,
                target.bounds.left(),
                target.bounds.right(),
            ),
            Axis::Y => (
                source.center.y,
                source.bounds.top(),
                source.bounds.bottom(),
                target.center.y,
                target.bounds.top(),
                target.bounds.bottom(),
            ),
        };
        match self {
            GapMeasure::Center => Some((p - t_c).abs()),
            GapMeasure::Outside => Some(outside_gap(p, t_lo, t_hi)),
            GapMeasure::StrictOutside => {
                if p >= t_lo && p <= t_hi {
                    None
                } else {
                    Some(outside_gap(p, t_lo, t_hi))
                }
            }
            GapMeasure::BoxGap => Some((t_lo - s_hi).max(s_lo - t_hi).max(0.0)),
        }
    }
}

fn outside_gap(p: f64, lo: f64, hi: f64) -> f64 {
    if p < lo {
        lo - p
    } else if p > hi {
        p - hi
    } else {
        0.0
    }
}

// ============================================================================
// Strength curves
// ============================================================================

/// Monotone decreasing map from normalized combined gap `t ∈ [0,1]` to strength.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum StrengthCurve {
    /// `1 - t`
    #[default]
    Linear,
    /// `1 - t²`: tolerant of small gaps.
    Quadratic,
    /// Exponential decay rescaled so that `t = 1` maps to 0.
    Exponential { rate: f64 },
}

impl StrengthCurve {
    pub fn apply(self, t: f64) -> f64 {
        match self {
            StrengthCurve::Linear => 1.0 - t,
            StrengthCurve::Quadratic => 1.0 - t * t,
            // expm1 keeps small rates exact; the curve tends to `1 - t` as rate → 0.
            StrengthCurve::Exponential { rate } => {
                let span = (-rate).exp_m1();
                ((-rate * t).exp_m1() - span) / -span
            }
        }
    }

    fn validate(self) -> Result<()> {
        if let StrengthCurve::Exponential { rate } = self {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::InvalidConfig(format!("exponential rate must be > 0, got {rate}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// RelationSpec
// ============================================================================

/// Constants of one support kind. Gaps are in interline fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelationSpec {
    pub max_gap_x: f64,
    pub max_gap_y: f64,
    /// Relative impact of the horizontal and vertical gaps.
    pub out_weights: [f64; 2],
    /// Share of strength injected into the source endpoint.
    pub source_coeff: f64,
    /// Share of strength injected into the target endpoint.
    pub target_coeff: f64,
    #[serde(default)]
    pub gap_x: GapMeasure,
    #[serde(default)]
    pub gap_y: GapMeasure,
    #[serde(default)]
    pub curve: StrengthCurve,
}

/// Measured gaps and resulting strength of a would-be relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub dx: f64,
    pub dy: f64,
    pub strength: f64,
}

impl RelationSpec {
    /// Plain centre-distance relation spec with a linear curve.
    pub fn new(max_gap_x: f64, max_gap_y: f64, out_weights: [f64; 2], source_coeff: f64, target_coeff: f64) -> Self {
        Self {
            max_gap_x,
            max_gap_y,
            out_weights,
            source_coeff,
            target_coeff,
            gap_x: GapMeasure::Center,
            gap_y: GapMeasure::Center,
            curve: StrengthCurve::Linear,
        }
    }

    pub fn with_gaps(mut self, gap_x: GapMeasure, gap_y: GapMeasure) -> Self {
        self.gap_x = gap_x;
        self.gap_y = gap_y;
        self
    }

    pub fn with_curve(mut self, curve: StrengthCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let non_negative = |name: &str, v: f64| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!("{name} must be finite and >= 0, got {v}")))
            }
        };
        non_negative("max_gap_x", self.max_gap_x)?;
        non_negative("max_gap_y", self.max_gap_y)?;
        non_negative("out_weights[0]", self.out_weights[0])?;
        non_negative("out_weights[1]", self.out_weights[1])?;
        non_negative("source_coeff", self.source_coeff)?;
        non_negative("target_coeff", self.target_coeff)?;
        if self.out_weights[0] + self.out_weights[1] <= 0.0 {
            return Err(Error::InvalidConfig("out_weights must not both be zero".into()));
        }
        self.curve.validate()
    }

    /// Strength for gaps already expressed in interline fractions.
    ///
    /// `None` if either gap exceeds its maximum; a gap equal to the maximum
    /// is still accepted.
    pub fn strength_for_gaps(&self, dx: f64, dy: f64) -> Option<f64> {
        if !(dx <= self.max_gap_x && dy <= self.max_gap_y) {
            return None;
        }
        let [wx, wy] = self.out_weights;
        let combined = wx * ratio(dx, self.max_gap_x) + wy * ratio(dy, self.max_gap_y);
        let t = combined / (wx + wy);
        let raw = self.curve.apply(t);
        if !(0.0..=1.0).contains(&raw) {
            tracing::warn!(raw, dx, dy, curve = ?self.curve, "relation strength outside [0,1], clamped");
            if raw.is_nan() {
                return Some(0.0);
            }
        }
        Some(raw.clamp(0.0, 1.0))
    }

    /// Measure both gaps between two footprints and derive the strength.
    pub fn evaluate(&self, scale: &Scale, source: &Footprint, target: &Footprint) -> Option<Evaluation> {
        let dx = scale.to_fraction(self.gap_x.measure(Axis::X, source, target)?);
        let dy = scale.to_fraction(self.gap_y.measure(Axis::Y, source, target)?);
        let strength = self.strength_for_gaps(dx, dy)?;
        Some(Evaluation { dx, dy, strength })
    }

    /// Coefficient for the endpoint playing the given role.
    pub fn role_coeff(&self, is_source: bool) -> f64 {
        if is_source { self.source_coeff } else { self.target_coeff }
    }
}

/// `gap / max`, with a zero maximum (only reachable with a zero gap) giving 0.
fn ratio(gap: f64, max: f64) -> f64 {
    if max > 0.0 { gap / max } else { 0.0 }
}

// ============================================================================
// Catalog
// ============================================================================

/// The full set of support-kind constants used by one graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    specs: HashMap<SupportKind, RelationSpec>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            specs: SupportKind::ALL.iter().map(|&k| (k, kinds::default_spec(k))).collect(),
        }
    }
}

impl Catalog {
    /// Constants for `kind`; falls back to the built-in default.
    pub fn spec(&self, kind: SupportKind) -> RelationSpec {
        self.specs.get(&kind).copied().unwrap_or_else(|| kinds::default_spec(kind))
    }

    /// Replace the constants of one kind.
    pub fn with_spec(mut self, kind: SupportKind, spec: RelationSpec) -> Result<Self> {
        spec.validate()?;
        self.specs.insert(kind, spec);
        Ok(self)
    }

    /// Default catalog with per-kind overrides read from a JSON object keyed
    /// by kind name, e.g. `{"RepeatDotBar": {...}}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let overrides: HashMap<SupportKind, RelationSpec> = serde_json::from_str(json)?;
        overrides
            .into_iter()
            .try_fold(Self::default(), |catalog, (kind, spec)| catalog.with_spec(kind, spec))
    }

    pub fn validate(&self) -> Result<()> {
        self.specs.values().try_for_each(RelationSpec::validate)
    }

    /// Does `kind` link a `source` shape to a `target` shape?
    pub fn accepts(&self, kind: SupportKind, source: Shape, target: Shape) -> bool {
        kinds::accepts(kind, source, target)
    }

    /// Geometric evaluation of `kind` between two footprints.
    pub fn evaluate(
        &self,
        kind: SupportKind,
        scale: &Scale,
        source: &Footprint,
        target: &Footprint,
    ) -> Option<Evaluation> {
        self.spec(kind).evaluate(scale, source, target)
    }
}
