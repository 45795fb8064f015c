//! End-to-end tests for page-level reduction, cancellation and diagnostics.

use omr_sig::{
    CancelToken, Candidate, ExclusionCause, Outcome, Page, Rectangle, ReductionConfig, Scale,
    Shape, SystemDiagnostics, SystemId, export_dump,
};
use pretty_assertions::assert_eq;

/// Page with `n` systems, each holding one sharp/flat clash.
fn page(n: usize) -> Page {
    let mut page = Page::new(Scale::new(18.0).unwrap());
    for i in 0..n {
        let sig = page.add_system();
        let r = Rectangle::new(40.0 * i as f64, 100.0, 10.0, 24.0);
        let sharp = sig.add_inter(Candidate::new(Shape::Sharp, r, 0.8)).unwrap();
        let flat = sig.add_inter(Candidate::new(Shape::Flat, r, 0.5)).unwrap();
        sig.add_exclusion(sharp, flat, ExclusionCause::Incompatible).unwrap();
    }
    page
}

#[test]
fn test_every_system_reduced_independently() {
    let mut page = page(6);
    let reports: Vec<_> = page
        .reduce_all(&ReductionConfig::default())
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert_eq!(reports.len(), 6);
    for (sig, report) in page.systems().iter().zip(&reports) {
        assert_eq!(report.system, sig.system());
        assert_eq!(report.outcome, Outcome::Converged);
        let shapes: Vec<_> = sig.accepted().iter().map(|i| i.shape).collect();
        assert_eq!(shapes, vec![Shape::Sharp]);
    }
}

#[test]
fn test_cancelled_page_is_left_untouched() {
    let mut page = page(3);
    for i in 0..3 {
        let sig = page.system_mut(SystemId(i)).unwrap();
        let r = Rectangle::new(200.0, 100.0, 6.0, 6.0);
        sig.add_inter(Candidate::new(Shape::RepeatDot, r, 0.45).with_glyph(11)).unwrap();
        sig.add_inter(Candidate::new(Shape::AugmentationDot, r, 0.35).with_glyph(11)).unwrap();
    }
    let snapshot = |page: &Page| -> Vec<(usize, Vec<f64>)> {
        page.systems()
            .iter()
            .map(|s| (s.relation_count(), s.inters().map(|i| i.contextual_grade()).collect()))
            .collect()
    };
    let before = snapshot(&page);
    let token = CancelToken::new();
    token.cancel();

    let reports = page.reduce_all_with_cancel(&ReductionConfig::default(), &token);

    for report in reports {
        let report = report.unwrap();
        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.materialized, 0);
    }
    assert!(page.systems().iter().all(|s| s.active_count() == 4));
    assert_eq!(snapshot(&page), before);
}

#[test]
fn test_diagnostics_explain_removal() {
    let mut page = page(1);
    let report = page.reduce_all(&ReductionConfig::default()).remove(0).unwrap();
    let sig = &page.systems()[0];

    let diag = SystemDiagnostics::collect(sig, Some(&report));
    assert_eq!(diag.accepted.len(), 1);
    assert_eq!(diag.removed.len(), 1);
    assert_eq!(diag.removed[0].shape, Shape::Flat);
    assert_eq!(diag.removed[0].removal.unwrap().grade, 0.5);
    assert!(diag.relations.iter().all(|r| r.inert));

    let json = diag.to_json().unwrap();
    assert!(json.contains("\"Converged\""));

    let mut out = Vec::new();
    export_dump(sig, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("// Interpretations: 2 (1 active)"));
    assert!(text.contains("S0#1 Flat grade=0.500 by r0 in pass 1"));
}
