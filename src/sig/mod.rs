//! # Symbol Interpretation Graph
//!
//! One `Sig` per system. Interpretations and relations live in flat arenas
//! indexed by their ids; nothing is ever deallocated. Removing an
//! interpretation flips its state and leaves every relation in place, so
//! the full history stays inspectable after reduction.
//!
//! ## Construction rules
//!
//! - A relation never links a node to itself.
//! - Both endpoints must belong to this graph's system.
//! - A pair is either supporting or exclusive, never both.
//! - The same relation kind is never created twice on one pair.
//!
//! Violations are rejected with an [`Error`] and leave the graph untouched.

mod checkpoint;

pub use checkpoint::Checkpoint;

use hashbrown::HashMap;

use crate::catalog::Catalog;
use crate::model::*;
use crate::{Error, Result};

// ============================================================================
// Sig
// ============================================================================

/// Interpretation graph of one system.
#[derive(Debug, Clone)]
pub struct Sig {
    system: SystemId,
    scale: Scale,
    catalog: Catalog,
    inters: Vec<Inter>,
    relations: Vec<Relation>,
    /// shape → inter ids, in creation order
    shape_index: HashMap<Shape, Vec<InterId>>,
}

impl Sig {
    pub fn new(system: SystemId, scale: Scale) -> Self {
        Self {
            system,
            scale,
            catalog: Catalog::default(),
            inters: Vec::new(),
            relations: Vec::new(),
            shape_index: HashMap::new(),
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn system(&self) -> SystemId {
        self.system
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // ========================================================================
    // Interpretations
    // ========================================================================

    /// Insert a candidate; its contextual grade starts at its intrinsic grade.
    pub fn add_inter(&mut self, candidate: Candidate) -> Result<InterId> {
        if !(0.0..=1.0).contains(&candidate.grade) {
            return Err(Error::InvalidGrade(candidate.grade));
        }
        candidate.bounds.validate()?;
        if !candidate.center.is_finite() {
            return Err(Error::MalformedGeometry(format!("non-finite center {:?}", candidate.center)));
        }

        let seq = u32::try_from(self.inters.len())
            .map_err(|_| Error::MalformedGeometry("too many interpretations in one system".into()))?;
        let id = InterId { system: self.system, seq };
        self.shape_index.entry(candidate.shape).or_default().push(id);
        self.inters.push(Inter::from_candidate(id, candidate));
        Ok(id)
    }

    pub fn inter(&self, id: InterId) -> Result<&Inter> {
        self.check_inter(id)?;
        Ok(&self.inters[id.index()])
    }

    /// All interpretations, including removed ones, in id order.
    pub fn inters(&self) -> impl Iterator<Item = &Inter> {
        self.inters.iter()
    }

    pub fn active(&self) -> impl Iterator<Item = &Inter> {
        self.inters.iter().filter(|i| i.is_active())
    }

    pub fn removed(&self) -> impl Iterator<Item = &Inter> {
        self.inters.iter().filter(|i| !i.is_active())
    }

    /// The accepted interpretation set: every still-active node.
    pub fn accepted(&self) -> Vec<&Inter> {
        self.active().collect()
    }

    pub fn inters_by_shape(&self, shape: Shape) -> impl Iterator<Item = &Inter> {
        self.shape_index
            .get(&shape)
            .into_iter()
            .flatten()
            .map(|id| &self.inters[id.index()])
    }

    pub fn len(&self) -> usize {
        self.inters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inters.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    // ========================================================================
    // Relations
    // ========================================================================

    pub fn relation(&self, id: RelId) -> Result<&Relation> {
        self.relations.get(id.index()).ok_or(Error::UnknownRelation(id))
    }

    /// Every relation, inert ones included, in id order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// A relation is inert once either endpoint has been removed. Relations
    /// whose endpoints are not nodes of this graph are inert too.
    pub fn is_inert(&self, rel: &Relation) -> bool {
        let live = |id: InterId| id.system == self.system && self.inters.get(id.index()).is_some_and(Inter::is_active);
        !(live(rel.source) && live(rel.target))
    }

    /// Relations touching `id`, filtered by the role `id` plays.
    pub fn relations_of(&self, id: InterId, dir: Direction) -> Result<Vec<&Relation>> {
        let inter = self.inter(id)?;
        Ok(inter
            .relations
            .iter()
            .map(|rid| &self.relations[rid.index()])
            .filter(|rel| match dir {
                Direction::Outgoing => rel.source == id,
                Direction::Incoming => rel.target == id,
                Direction::Both => true,
            })
            .collect())
    }

    pub fn supports_of(&self, id: InterId) -> Result<Vec<&Relation>> {
        Ok(self.relations_of(id, Direction::Both)?.into_iter().filter(|r| r.is_support()).collect())
    }

    pub fn exclusions_of(&self, id: InterId) -> Result<Vec<&Relation>> {
        Ok(self.relations_of(id, Direction::Both)?.into_iter().filter(|r| r.is_exclusion()).collect())
    }

    /// First relation linking `a` and `b`, in either order.
    pub fn relation_between(&self, a: InterId, b: InterId) -> Option<&Relation> {
        let inter = self.inters.get(a.index())?;
        inter
            .relations
            .iter()
            .map(|rid| &self.relations[rid.index()])
            .find(|rel| rel.links(a, b))
    }

    /// Active interpretations linked to `id` by an active relation.
    pub fn partners(&self, id: InterId) -> Result<Vec<&Inter>> {
        Ok(self
            .relations_of(id, Direction::Both)?
            .into_iter()
            .filter(|rel| !self.is_inert(rel))
            .filter_map(|rel| rel.other(id))
            .map(|other| &self.inters[other.index()])
            .collect())
    }

    /// Evaluate `kind` on the geometry of two candidates and create the
    /// relation if they are close enough.
    ///
    /// `Ok(None)` means "no interaction": out of range, or overlapping where
    /// the kind requires the source to lie outside the target.
    pub fn connect(&mut self, kind: SupportKind, source: InterId, target: InterId) -> Result<Option<RelId>> {
        self.check_pair(source, target)?;
        self.check_shapes(kind, source, target)?;
        let (s, t) = (&self.inters[source.index()], &self.inters[target.index()]);
        let Some(eval) = self.catalog.evaluate(kind, &self.scale, &s.footprint(), &t.footprint()) else {
            return Ok(None);
        };
        self.insert(RelationKind::Support(kind), source, target, eval.strength).map(Some)
    }

    /// Insert a support relation whose strength was scored upstream.
    pub fn add_support(&mut self, kind: SupportKind, source: InterId, target: InterId, strength: f64) -> Result<RelId> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(Error::InvalidStrength(strength));
        }
        self.check_pair(source, target)?;
        self.check_shapes(kind, source, target)?;
        self.insert(RelationKind::Support(kind), source, target, strength)
    }

    /// Declare `a` and `b` mutually exclusive.
    pub fn add_exclusion(&mut self, a: InterId, b: InterId, cause: ExclusionCause) -> Result<RelId> {
        self.check_pair(a, b)?;
        self.insert(RelationKind::Exclusion(cause), a, b, 1.0)
    }

    /// Try every catalog kind on every ordered pair of active candidates
    /// whose shapes it accepts. Returns the number of relations created.
    ///
    /// Pairs already related (in either category) are left alone.
    pub fn discover_relations(&mut self) -> Result<usize> {
        let active: Vec<(InterId, Shape)> = self.active().map(|i| (i.id, i.shape)).collect();
        let mut created = 0;
        for &(source, s_shape) in &active {
            for &(target, t_shape) in &active {
                if source == target || self.relation_between(source, target).is_some() {
                    continue;
                }
                for kind in SupportKind::ALL {
                    if !self.catalog.accepts(kind, s_shape, t_shape) {
                        continue;
                    }
                    if self.connect(kind, source, target)?.is_some() {
                        created += 1;
                        break;
                    }
                }
            }
        }
        tracing::debug!(system = %self.system, created, "discovered support relations");
        Ok(created)
    }

    /// Add a `SharedGlyph` exclusion between active candidates built on the
    /// same glyph. Returns the number of exclusions created.
    pub fn materialize_glyph_exclusions(&mut self) -> Result<usize> {
        let mut by_glyph: HashMap<u64, Vec<InterId>> = HashMap::new();
        for inter in self.active() {
            if let Some(glyph) = inter.glyph {
                by_glyph.entry(glyph).or_default().push(inter.id);
            }
        }

        let mut glyphs: Vec<_> = by_glyph.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
        glyphs.sort_unstable_by_key(|(glyph, _)| *glyph);

        let mut created = 0;
        for (glyph, ids) in glyphs {
            for (i, &a) in ids.iter().enumerate() {
                for &b in &ids[i + 1..] {
                    match self.relation_between(a, b) {
                        Some(rel) if rel.is_support() => {
                            tracing::warn!(%a, %b, glyph, "supporting pair shares a glyph, no exclusion added");
                        }
                        Some(_) => {}
                        None => {
                            self.add_exclusion(a, b, ExclusionCause::SharedGlyph)?;
                            created += 1;
                        }
                    }
                }
            }
        }
        Ok(created)
    }

    // ========================================================================
    // Mutation used by the engines
    // ========================================================================

    pub(crate) fn inters_slice(&self) -> &[Inter] {
        &self.inters
    }

    pub(crate) fn relations_slice(&self) -> &[Relation] {
        &self.relations
    }

    pub(crate) fn set_contextual_grade(&mut self, id: InterId, grade: f64) {
        self.inters[id.index()].contextual_grade = grade;
    }

    pub(crate) fn mark_removed(&mut self, id: InterId, removal: Removal) {
        let inter = &mut self.inters[id.index()];
        inter.state = InterState::Removed;
        inter.removal = Some(removal);
    }

    pub(crate) fn mark_resolved(&mut self, id: RelId) {
        self.relations[id.index()].resolution = Resolution::Resolved;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn check_inter(&self, id: InterId) -> Result<()> {
        if id.system != self.system {
            return Err(Error::CrossSystem { system: self.system, inter: id });
        }
        if id.index() >= self.inters.len() {
            return Err(Error::UnknownInter(id));
        }
        Ok(())
    }

    fn check_pair(&self, source: InterId, target: InterId) -> Result<()> {
        self.check_inter(source)?;
        self.check_inter(target)?;
        if source == target {
            return Err(Error::SelfRelation(source));
        }
        Ok(())
    }

    fn check_shapes(&self, kind: SupportKind, source: InterId, target: InterId) -> Result<()> {
        let (s, t) = (self.inters[source.index()].shape, self.inters[target.index()].shape);
        if !self.catalog.accepts(kind, s, t) {
            return Err(Error::ShapeMismatch { kind, src: s, dst: t });
        }
        Ok(())
    }

    fn insert(&mut self, kind: RelationKind, source: InterId, target: InterId, strength: f64) -> Result<RelId> {
        let existing = self.inters[source.index()]
            .relations
            .iter()
            .map(|rid| &self.relations[rid.index()])
            .filter(|rel| rel.links(source, target));
        for rel in existing {
            if rel.category() != kind.category() {
                return Err(Error::ConflictingRelation { src: source, dst: target });
            }
            let same_pair = kind.category() == Category::Exclusion || rel.source == source;
            if rel.kind == kind && same_pair {
                return Err(Error::DuplicateRelation { kind, src: source, dst: target });
            }
        }

        let id = RelId(
            u32::try_from(self.relations.len())
                .map_err(|_| Error::MalformedGeometry("too many relations in one system".into()))?,
        );
        self.relations.push(Relation::new(id, kind, source, target, strength));
        self.inters[source.index()].relations.push(id);
        self.inters[target.index()].relations.push(id);
        tracing::trace!(%id, %kind, %source, %target, strength, "relation created");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> Sig {
        Sig::new(SystemId(1), Scale::new(10.0).unwrap())
    }

    fn at(shape: Shape, x: f64, y: f64, w: f64, h: f64, grade: f64) -> Candidate {
        Candidate::new(shape, Rectangle::centered(Point::new(x, y), w, h), grade)
    }

    #[test]
    fn add_inter_assigns_increasing_ids() {
        let mut g = sig();
        let a = g.add_inter(at(Shape::RepeatDot, 0.0, 0.0, 4.0, 4.0, 0.5)).unwrap();
        let b = g.add_inter(at(Shape::RepeatDot, 9.0, 0.0, 4.0, 4.0, 0.5)).unwrap();
        assert!(a < b);
        assert_eq!(g.inter(b).unwrap().contextual_grade(), 0.5);
        assert_eq!(g.inters_by_shape(Shape::RepeatDot).count(), 2);
        assert_eq!(g.inters_by_shape(Shape::Stem).count(), 0);
    }

    #[test]
    fn add_inter_rejects_bad_input() {
        let mut g = sig();
        assert!(matches!(
            g.add_inter(at(Shape::Stem, 0.0, 0.0, 1.0, 1.0, 1.2)),
            Err(Error::InvalidGrade(_))
        ));
        assert!(matches!(
            g.add_inter(at(Shape::Stem, 0.0, 0.0, -1.0, 1.0, 0.5)),
            Err(Error::MalformedGeometry(_))
        ));
        assert!(g.is_empty());
    }

    #[test]
    fn self_and_cross_system_relations_are_rejected() {
        let mut g = sig();
        let a = g.add_inter(at(Shape::RepeatDot, 0.0, 0.0, 4.0, 4.0, 0.5)).unwrap();
        assert!(matches!(
            g.add_exclusion(a, a, ExclusionCause::Incompatible),
            Err(Error::SelfRelation(_))
        ));

        let foreign = InterId { system: SystemId(2), seq: 0 };
        assert!(matches!(
            g.add_exclusion(a, foreign, ExclusionCause::Incompatible),
            Err(Error::CrossSystem { .. })
        ));
        assert_eq!(g.relation_count(), 0);
    }

    #[test]
    fn support_and_exclusion_never_share_a_pair() {
        let mut g = sig();
        let dot = g.add_inter(at(Shape::RepeatDot, 0.0, 0.0, 4.0, 4.0, 0.5)).unwrap();
        let bar = g.add_inter(at(Shape::ThinBarLine, 10.0, 0.0, 2.0, 40.0, 0.5)).unwrap();
        g.add_support(SupportKind::RepeatDotBar, dot, bar, 0.6).unwrap();
        assert!(matches!(
            g.add_exclusion(bar, dot, ExclusionCause::Overlap),
            Err(Error::ConflictingRelation { .. })
        ));
        assert!(matches!(
            g.add_support(SupportKind::RepeatDotBar, dot, bar, 0.3),
            Err(Error::DuplicateRelation { .. })
        ));
    }

    #[test]
    fn exclusion_is_symmetric_for_duplicates() {
        let mut g = sig();
        let a = g.add_inter(at(Shape::Sharp, 0.0, 0.0, 4.0, 8.0, 0.5)).unwrap();
        let b = g.add_inter(at(Shape::Natural, 0.0, 0.0, 4.0, 8.0, 0.4)).unwrap();
        g.add_exclusion(a, b, ExclusionCause::Incompatible).unwrap();
        assert!(matches!(
            g.add_exclusion(b, a, ExclusionCause::Incompatible),
            Err(Error::DuplicateRelation { .. })
        ));
        assert_eq!(g.exclusions_of(b).unwrap().len(), 1);
        assert!(g.relation_between(b, a).is_some());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut g = sig();
        let stem = g.add_inter(at(Shape::Stem, 0.0, 0.0, 2.0, 30.0, 0.5)).unwrap();
        let bar = g.add_inter(at(Shape::ThinBarLine, 10.0, 0.0, 2.0, 40.0, 0.5)).unwrap();
        assert!(matches!(
            g.connect(SupportKind::RepeatDotBar, stem, bar),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn relations_of_filters_by_role() {
        let mut g = sig();
        let dot = g.add_inter(at(Shape::RepeatDot, 0.0, 0.0, 4.0, 4.0, 0.5)).unwrap();
        let bar = g.add_inter(at(Shape::ThinBarLine, 10.0, 0.0, 2.0, 40.0, 0.5)).unwrap();
        g.add_support(SupportKind::RepeatDotBar, dot, bar, 0.6).unwrap();
        assert_eq!(g.relations_of(dot, Direction::Outgoing).unwrap().len(), 1);
        assert_eq!(g.relations_of(dot, Direction::Incoming).unwrap().len(), 0);
        assert_eq!(g.relations_of(bar, Direction::Incoming).unwrap().len(), 1);
        assert_eq!(g.partners(bar).unwrap()[0].id, dot);
    }

    #[test]
    fn discover_links_nearby_dot_and_bar_only() {
        let mut g = sig();
        let bar = g.add_inter(at(Shape::ThinBarLine, 100.0, 50.0, 2.0, 40.0, 0.8)).unwrap();
        let near = g.add_inter(at(Shape::RepeatDot, 108.0, 45.0, 4.0, 4.0, 0.6)).unwrap();
        let far = g.add_inter(at(Shape::RepeatDot, 160.0, 45.0, 4.0, 4.0, 0.6)).unwrap();

        g.discover_relations().unwrap();

        assert!(g.relation_between(near, bar).is_some());
        assert!(g.relation_between(far, bar).is_none());
        // Discovery is idempotent.
        assert_eq!(g.discover_relations().unwrap(), 0);
    }

    #[test]
    fn shared_glyph_candidates_become_exclusive() {
        let mut g = sig();
        let a = g.add_inter(at(Shape::RepeatDot, 0.0, 0.0, 4.0, 4.0, 0.5).with_glyph(7)).unwrap();
        let b = g.add_inter(at(Shape::AugmentationDot, 0.0, 0.0, 4.0, 4.0, 0.4).with_glyph(7)).unwrap();
        let c = g.add_inter(at(Shape::Stem, 30.0, 0.0, 2.0, 30.0, 0.4).with_glyph(8)).unwrap();

        assert_eq!(g.materialize_glyph_exclusions().unwrap(), 1);
        let rel = g.relation_between(a, b).unwrap();
        assert_eq!(rel.kind, RelationKind::Exclusion(ExclusionCause::SharedGlyph));
        assert!(g.relations_of(c, Direction::Both).unwrap().is_empty());
        assert_eq!(g.materialize_glyph_exclusions().unwrap(), 0);
    }

    #[test]
    fn foreign_relation_is_inert_not_a_panic() {
        let mut big = Sig::new(SystemId(2), Scale::new(10.0).unwrap());
        let ids: Vec<_> = (0..4)
            .map(|i| big.add_inter(at(Shape::Sharp, 10.0 * i as f64, 0.0, 4.0, 4.0, 0.5)).unwrap())
            .collect();
        let rel = big.add_exclusion(ids[0], ids[3], ExclusionCause::Overlap).unwrap();
        let foreign = big.relation(rel).unwrap();
        assert!(!big.is_inert(foreign));

        let mut small = sig();
        small.add_inter(at(Shape::Sharp, 0.0, 0.0, 4.0, 4.0, 0.5)).unwrap();
        assert!(small.is_inert(foreign));
    }
}
