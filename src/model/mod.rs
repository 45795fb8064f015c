//! # Interpretation Graph Model
//!
//! Plain data for the Symbol Interpretation Graph: interpretations (nodes),
//! relations (edges), shapes and page geometry.
//!
//! Design rule: this module is pure data. Scoring and reduction live elsewhere.

pub mod geometry;
pub mod inter;
pub mod relation;
pub mod shape;

pub use geometry::{Footprint, Point, Rectangle, Scale};
pub use inter::{Candidate, Inter, InterId, InterState, Removal, SystemId};
pub use relation::{
    Category, Direction, ExclusionCause, RelId, Relation, RelationKind, Resolution, SupportKind,
};
pub use shape::Shape;
