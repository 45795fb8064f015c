//! Relation (edge) between two interpretations of the same system.

use serde::{Deserialize, Serialize};
use super::InterId;

/// Relation identifier; index into the owning graph's relation arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelId(pub u32);

impl RelId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Traversal direction, relative to a given node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// The node is the relation source.
    Outgoing,
    /// The node is the relation target.
    Incoming,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Endpoints are compatible and lend each other confidence.
    Support,
    /// Endpoints are mutually incompatible; at most one survives.
    Exclusion,
}

/// Geometric support relations known to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SupportKind {
    /// Repeat dot (source) next to a bar line (target).
    RepeatDotBar,
    /// Upper and lower dot of the same repeat sign.
    RepeatDotPair,
    /// Note head (source) attached to a stem (target).
    HeadStem,
    /// Beam (source) ending on a stem (target).
    BeamStem,
    /// Flag (source) hanging from a stem end (target).
    FlagStem,
    /// Augmentation dot (source) right of a head or rest (target).
    AugmentationDot,
    /// Accidental (source) left of a note head (target).
    AccidentalHead,
}

impl SupportKind {
    pub const ALL: [SupportKind; 7] = [
        SupportKind::RepeatDotBar,
        SupportKind::RepeatDotPair,
        SupportKind::HeadStem,
        SupportKind::BeamStem,
        SupportKind::FlagStem,
        SupportKind::AugmentationDot,
        SupportKind::AccidentalHead,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SupportKind::RepeatDotBar => "repeat-dot to bar-line",
            SupportKind::RepeatDotPair => "repeat-dot pair",
            SupportKind::HeadStem => "head to stem",
            SupportKind::BeamStem => "beam to stem",
            SupportKind::FlagStem => "flag to stem",
            SupportKind::AugmentationDot => "augmentation dot",
            SupportKind::AccidentalHead => "accidental to head",
        }
    }
}

/// Why two interpretations exclude each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExclusionCause {
    /// Incompatible by construction (fed by the classifier).
    Incompatible,
    /// Bounding boxes overlap too much to both be real.
    Overlap,
    /// Both hypotheses were built on the very same glyph.
    SharedGlyph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Support(SupportKind),
    Exclusion(ExclusionCause),
}

impl RelationKind {
    pub fn category(self) -> Category {
        match self {
            RelationKind::Support(_) => Category::Support,
            RelationKind::Exclusion(_) => Category::Exclusion,
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationKind::Support(k) => write!(f, "{}", k.name()),
            RelationKind::Exclusion(c) => write!(f, "exclusion ({c:?})"),
        }
    }
}

/// Resolution state of an exclusion. Support relations stay `Unresolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Unresolved,
    Resolved,
}

/// A typed, scored edge. Strength is fixed at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelId,
    pub kind: RelationKind,
    pub source: InterId,
    pub target: InterId,
    pub strength: f64,
    pub(crate) resolution: Resolution,
}

impl Relation {
    pub(crate) fn new(id: RelId, kind: RelationKind, source: InterId, target: InterId, strength: f64) -> Self {
        Self {
            id,
            kind,
            source,
            target,
            strength,
            resolution: Resolution::Unresolved,
        }
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn is_support(&self) -> bool {
        self.category() == Category::Support
    }

    pub fn is_exclusion(&self) -> bool {
        self.category() == Category::Exclusion
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The "other" end of the relation from the given node.
    pub fn other(&self, from: InterId) -> Option<InterId> {
        if from == self.source { Some(self.target) }
        else if from == self.target { Some(self.source) }
        else { None }
    }

    /// True if the relation links `a` and `b` in either order.
    pub fn links(&self, a: InterId, b: InterId) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }
}
