//! # omr-sig — Symbol Interpretation Graph
//!
//! Reconciles competing, partially confident music-symbol hypotheses of one
//! system into a single consistent interpretation.
//!
//! ## Design Principles
//!
//! 1. **One graph per system**: a `Sig` owns every interpretation and relation
//!    of its system; nothing is global, nothing crosses systems.
//! 2. **Arena + ids**: nodes and edges live in flat vectors; removal flips a
//!    state flag and keeps the tombstone for diagnostics.
//! 3. **Catalog-driven scoring**: each relation kind is a tagged variant with
//!    its own gap thresholds, weights and role coefficients.
//! 4. **Greedy relaxation**: exclusions are resolved pass after pass, with
//!    contextual grades recomputed in between, until nothing moves.
//!
//! ## Quick Start
//!
//! ```rust
//! use omr_sig::{Candidate, ExclusionCause, Rectangle, ReductionConfig, Scale, Shape, Sig, SystemId};
//!
//! # fn example() -> omr_sig::Result<()> {
//! let mut sig = Sig::new(SystemId(0), Scale::new(20.0)?);
//! let r = Rectangle::new(100.0, 40.0, 12.0, 30.0);
//! let sharp = sig.add_inter(Candidate::new(Shape::Sharp, r, 0.8))?;
//! let natural = sig.add_inter(Candidate::new(Shape::Natural, r, 0.6))?;
//! sig.add_exclusion(sharp, natural, ExclusionCause::Incompatible)?;
//!
//! let report = omr_sig::reduce(&mut sig, &ReductionConfig::default())?;
//! assert!(report.is_converged());
//! assert_eq!(sig.accepted().len(), 1);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod catalog;
pub mod sig;
pub mod grade;
pub mod reduction;
pub mod config;
pub mod page;
pub mod export;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Candidate, Category, Direction, ExclusionCause, Footprint, Inter, InterId, InterState,
    Point, Rectangle, RelId, Relation, RelationKind, Removal, Resolution, Scale, Shape,
    SupportKind, SystemId,
};

// ============================================================================
// Re-exports: Engines
// ============================================================================

pub use catalog::{Catalog, GapMeasure, RelationSpec, StrengthCurve};
pub use sig::{Checkpoint, Sig};
pub use grade::{compute_contextual_grade, contextual_grade, recompute_all};
pub use reduction::{
    reduce, reduce_with_cancel, CancelToken, EngineState, Outcome, ReductionReport, Reducer,
};
pub use config::ReductionConfig;
pub use page::Page;
pub use export::{export_dump, SystemDiagnostics};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Relation from {0} to itself")]
    SelfRelation(InterId),

    #[error("Interpretation {inter} does not belong to system {system}")]
    CrossSystem { system: SystemId, inter: InterId },

    #[error("Unknown interpretation {0}")]
    UnknownInter(InterId),

    #[error("Unknown relation {0}")]
    UnknownRelation(RelId),

    #[error("Malformed geometry: {0}")]
    MalformedGeometry(String),

    #[error("Grade {0} outside [0, 1]")]
    InvalidGrade(f64),

    #[error("Relation strength {0} outside [0, 1]")]
    InvalidStrength(f64),

    #[error("{} cannot link {src} to {dst}", .kind.name())]
    ShapeMismatch { kind: SupportKind, src: Shape, dst: Shape },

    #[error("{src} and {dst} cannot both support and exclude each other")]
    ConflictingRelation { src: InterId, dst: InterId },

    #[error("Relation {kind} from {src} to {dst} already exists")]
    DuplicateRelation { kind: RelationKind, src: InterId, dst: InterId },

    #[error("Stale checkpoint: {0}")]
    StaleCheckpoint(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
