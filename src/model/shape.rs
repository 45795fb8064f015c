//! Notation shape labels assigned by the upstream classifier.

use serde::{Deserialize, Serialize};

/// Enumerated notation-symbol kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Shape {
    NoteHeadBlack,
    NoteHeadVoid,
    WholeNote,
    Stem,
    Beam,
    BeamHook,
    FlagUp,
    FlagDown,
    ThinBarLine,
    ThickBarLine,
    RepeatDot,
    AugmentationDot,
    Sharp,
    Flat,
    Natural,
    GClef,
    FClef,
    CClef,
    QuarterRest,
    EighthRest,
    Slur,
}

impl Shape {
    /// Heads that may carry a stem.
    pub fn is_stemmed_head(self) -> bool {
        matches!(self, Shape::NoteHeadBlack | Shape::NoteHeadVoid)
    }

    pub fn is_head(self) -> bool {
        self.is_stemmed_head() || self == Shape::WholeNote
    }

    pub fn is_beam(self) -> bool {
        matches!(self, Shape::Beam | Shape::BeamHook)
    }

    pub fn is_flag(self) -> bool {
        matches!(self, Shape::FlagUp | Shape::FlagDown)
    }

    pub fn is_bar_line(self) -> bool {
        matches!(self, Shape::ThinBarLine | Shape::ThickBarLine)
    }

    pub fn is_accidental(self) -> bool {
        matches!(self, Shape::Sharp | Shape::Flat | Shape::Natural)
    }

    pub fn is_clef(self) -> bool {
        matches!(self, Shape::GClef | Shape::FClef | Shape::CClef)
    }

    pub fn is_rest(self) -> bool {
        matches!(self, Shape::QuarterRest | Shape::EighthRest)
    }

    /// Things an augmentation dot can extend.
    pub fn is_augmentable(self) -> bool {
        self.is_head() || self.is_rest()
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
