//! Interpretation: a candidate meaning for one detected shape.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use super::{Footprint, Point, Rectangle, RelId, Shape};

/// Identifier of a system (one staff group across the page width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SystemId(pub u32);

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Interpretation identifier.
///
/// `seq` is assigned in creation order within the owning system and doubles
/// as the arena index. Ordering is only used for deterministic tie-breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterId {
    pub system: SystemId,
    pub seq: u32,
}

impl InterId {
    pub(crate) fn index(self) -> usize {
        self.seq as usize
    }
}

impl std::fmt::Display for InterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.system, self.seq)
    }
}

/// Lifecycle of an interpretation. There is no way back from `Removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterState {
    Active,
    Removed,
}

/// Why and when an interpretation was removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Removal {
    /// The exclusion relation that was lost.
    pub by: RelId,
    /// Reduction pass (1-based) in which the removal happened.
    pub pass: u32,
    /// Contextual grade at the moment of removal.
    pub grade: f64,
}

/// Input record from the segmentation/classification stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub shape: Shape,
    pub bounds: Rectangle,
    /// Reference point for gap measurement. Defaults to the bounds center.
    pub center: Point,
    pub grade: f64,
    pub staff: Option<u32>,
    /// Underlying glyph (pixel region) the hypothesis was built on.
    pub glyph: Option<u64>,
}

impl Candidate {
    pub fn new(shape: Shape, bounds: Rectangle, grade: f64) -> Self {
        Self {
            shape,
            bounds,
            center: bounds.center(),
            grade,
            staff: None,
            glyph: None,
        }
    }

    pub fn with_center(mut self, center: Point) -> Self {
        self.center = center;
        self
    }

    pub fn with_staff(mut self, staff: u32) -> Self {
        self.staff = Some(staff);
        self
    }

    pub fn with_glyph(mut self, glyph: u64) -> Self {
        self.glyph = Some(glyph);
        self
    }
}

/// A node of the interpretation graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inter {
    pub id: InterId,
    pub shape: Shape,
    pub bounds: Rectangle,
    pub center: Point,
    pub staff: Option<u32>,
    pub glyph: Option<u64>,
    intrinsic_grade: f64,
    pub(crate) contextual_grade: f64,
    pub(crate) state: InterState,
    pub(crate) removal: Option<Removal>,
    pub(crate) relations: SmallVec<[RelId; 4]>,
}

impl Inter {
    pub(crate) fn from_candidate(id: InterId, c: Candidate) -> Self {
        Self {
            id,
            shape: c.shape,
            bounds: c.bounds,
            center: c.center,
            staff: c.staff,
            glyph: c.glyph,
            intrinsic_grade: c.grade,
            contextual_grade: c.grade,
            state: InterState::Active,
            removal: None,
            relations: SmallVec::new(),
        }
    }

    /// Classifier confidence; fixed at creation.
    pub fn intrinsic_grade(&self) -> f64 {
        self.intrinsic_grade
    }

    /// Confidence adjusted by supporting neighbors.
    pub fn contextual_grade(&self) -> f64 {
        self.contextual_grade
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.center, self.bounds)
    }

    pub fn state(&self) -> InterState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == InterState::Active
    }

    pub fn removal(&self) -> Option<&Removal> {
        self.removal.as_ref()
    }

    /// All relations touching this node, in creation order.
    pub fn relations(&self) -> &[RelId] {
        &self.relations
    }
}
