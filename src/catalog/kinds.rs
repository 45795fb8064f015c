//! Built-in constants and shape compatibility of each support kind.

use super::{GapMeasure, RelationSpec, StrengthCurve};
use crate::model::{Shape, SupportKind};

/// Default constants of `kind`, in interline fractions.
pub fn default_spec(kind: SupportKind) -> RelationSpec {
    match kind {
        // Dot center must sit strictly outside the bar line, within 1.5
        // interline horizontally and 0.5 vertically of its reference point.
        // Horizontal gap weighs three times the vertical one.
        SupportKind::RepeatDotBar => RelationSpec::new(1.5, 0.5, [3.0, 1.0], 0.5, 0.0)
            .with_gaps(GapMeasure::StrictOutside, GapMeasure::Center),
        // The two dots of a repeat sign are stacked one interline apart.
        SupportKind::RepeatDotPair => RelationSpec::new(0.25, 1.5, [2.0, 1.0], 0.3, 0.3)
            .with_curve(StrengthCurve::Quadratic),
        SupportKind::HeadStem => RelationSpec::new(0.8, 0.5, [2.0, 1.0], 0.4, 0.4)
            .with_gaps(GapMeasure::Outside, GapMeasure::Outside),
        SupportKind::BeamStem => RelationSpec::new(0.25, 0.5, [1.0, 1.0], 0.3, 0.5)
            .with_gaps(GapMeasure::BoxGap, GapMeasure::BoxGap),
        SupportKind::FlagStem => RelationSpec::new(0.3, 0.5, [1.0, 1.0], 0.3, 0.3)
            .with_gaps(GapMeasure::BoxGap, GapMeasure::BoxGap),
        SupportKind::AugmentationDot => RelationSpec::new(1.2, 0.8, [1.0, 2.0], 0.4, 0.1)
            .with_gaps(GapMeasure::StrictOutside, GapMeasure::Center),
        SupportKind::AccidentalHead => RelationSpec::new(1.0, 0.5, [1.0, 3.0], 0.3, 0.1)
            .with_gaps(GapMeasure::BoxGap, GapMeasure::Center)
            .with_curve(StrengthCurve::Exponential { rate: 2.0 }),
    }
}

/// Can `kind` link a `source` of this shape to a `target` of that shape?
pub fn accepts(kind: SupportKind, source: Shape, target: Shape) -> bool {
    match kind {
        SupportKind::RepeatDotBar => source == Shape::RepeatDot && target.is_bar_line(),
        SupportKind::RepeatDotPair => source == Shape::RepeatDot && target == Shape::RepeatDot,
        SupportKind::HeadStem => source.is_stemmed_head() && target == Shape::Stem,
        SupportKind::BeamStem => source.is_beam() && target == Shape::Stem,
        SupportKind::FlagStem => source.is_flag() && target == Shape::Stem,
        SupportKind::AugmentationDot => source == Shape::AugmentationDot && target.is_augmentable(),
        SupportKind::AccidentalHead => source.is_accidental() && target.is_head(),
    }
}
