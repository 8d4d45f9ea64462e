use approx::assert_relative_eq;

use super::polyline;
use crate::protect::{
    ChainEnd, CoverSpan, PowerIndex, ProtectError, ProtectOptions, Protector, WeightedIndex,
};

#[test]
fn straight_polyline_gets_equal_arclength_cover() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![polyline(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], false)],
        ProtectOptions::new(1.0),
    );

    assert_eq!(protector.cover(0), 12);
    let chain = protector.chain(0);
    assert_eq!(chain.len(), 12);

    let local = 10.0 / 11.0;
    let weight = (local / 1.5) * (local / 1.5);
    for (k, &ball) in chain.iter().enumerate() {
        let point = protector.index().point(ball).expect("live ball");
        let context = protector.index().context(ball).expect("live ball");
        assert_relative_eq!(point.center.x, k as f64 * local, epsilon = 1e-9);
        assert_relative_eq!(point.weight, weight, epsilon = 1e-12);
        assert_eq!(context.is_corner, k == 0 || k == 11);
        assert_eq!(context.polyline, 0);
    }

    let registry = protector.registry();
    assert_eq!(registry.corner_count(), 2);
    let (start, start_link) = registry.find(0, ChainEnd::Start).expect("start corner");
    let (end, end_link) = registry.find(0, ChainEnd::End).expect("end corner");
    assert_eq!(start, chain[0]);
    assert_eq!(end, chain[11]);
    assert_eq!(start_link.neighbor, Some(chain[1]));
    assert_eq!(end_link.neighbor, Some(chain[10]));
    assert_relative_eq!(end_link.position.arclength, 10.0, epsilon = 1e-12);
}

#[test]
fn interior_links_run_both_ways() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![polyline(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [3.0, 3.0, 0.0]], false)],
        ProtectOptions::new(0.5),
    );
    protector.cover(0);

    let chain = protector.chain(0);
    let index = protector.index();
    for window in chain[1..chain.len() - 1].windows(2) {
        assert_eq!(index.context(window[0]).and_then(|c| c.succ), Some(window[1]));
        assert_eq!(index.context(window[1]).and_then(|c| c.pred), Some(window[0]));
    }
    assert_eq!(index.context(chain[1]).and_then(|c| c.pred), Some(chain[0]));
    assert_eq!(
        index.context(chain[chain.len() - 2]).and_then(|c| c.succ),
        chain.last().copied()
    );
    // Corner balls carry no chain links of their own.
    let start = index.context(chain[0]).expect("corner");
    assert!(start.pred.is_none() && start.succ.is_none());
}

#[test]
fn square_cycle_forms_a_closed_ring() {
    let mut index = PowerIndex::new();
    let square = polyline(
        &[
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [4.0, 4.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 0.0],
        ],
        true,
    );
    let mut protector = Protector::new(&mut index, vec![square], ProtectOptions::new(2.0));

    assert_eq!(protector.cover(0), 9);
    assert_eq!(protector.registry().corner_count(), 0);

    let chain = protector.chain(0);
    assert_eq!(chain.len(), 9);
    for (k, &ball) in chain.iter().enumerate() {
        let context = protector.index().context(ball).expect("ring ball");
        assert!(!context.is_corner);
        assert_eq!(context.succ, Some(chain[(k + 1) % 9]));
        assert_eq!(context.pred, Some(chain[(k + 8) % 9]));
        assert_relative_eq!(context.position.arclength, k as f64 * 16.0 / 9.0, epsilon = 1e-9);
    }
}

#[test]
fn short_polyline_links_corners_to_each_other() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![polyline(&[[0.0, 0.0, 0.0], [0.2, 0.0, 0.0]], false)],
        ProtectOptions::new(1.0),
    );
    assert_eq!(protector.cover(0), 2);

    let chain = protector.chain(0);
    assert_eq!(chain.len(), 2);
    let registry = protector.registry();
    assert_eq!(registry.link(chain[0], 0, ChainEnd::Start).and_then(|l| l.neighbor), Some(chain[1]));
    assert_eq!(registry.link(chain[1], 0, ChainEnd::End).and_then(|l| l.neighbor), Some(chain[0]));
}

#[test]
fn degenerate_input_is_skipped_and_counted() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![
            polyline(&[[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]], false),
            polyline(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]], false),
        ],
        ProtectOptions::new(1.0),
    );

    assert_eq!(protector.cover(0), 0);
    assert!(protector.chain(0).is_empty());
    assert_eq!(protector.cover(1), 4);

    let diagnostics = protector.diagnostics();
    assert_eq!(diagnostics.degenerate_polylines, 1);
    assert_eq!(diagnostics.degenerate_segments, 1);
    assert_eq!(
        diagnostics.warnings,
        vec![ProtectError::DegenerateInput { polyline: 0 }.to_string()]
    );
}

#[test]
fn polylines_share_a_corner_ball() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![
            polyline(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]], false),
            polyline(&[[0.0, 0.0, 0.0], [0.0, 5.0, 0.0]], false),
        ],
        ProtectOptions::new(1.0),
    );

    assert_eq!(protector.cover_all(), 13);
    let shared = protector.chain(0)[0];
    assert_eq!(protector.chain(1)[0], shared);

    let registry = protector.registry();
    assert_eq!(registry.corner_count(), 3);
    let ids: Vec<_> = registry.polylines_at(shared, 0).into_iter().collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(protector.diagnostics().shared_corners, 1);
    assert!(protector.diagnostics().hidden_balls.is_empty());
}

#[test]
fn endpoint_on_interior_ball_becomes_a_pass_through_corner() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![
            polyline(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]], false),
            polyline(&[[1.5, 0.0, 0.0], [1.5, 2.0, 0.0]], false),
        ],
        ProtectOptions::new(1.0),
    );
    protector.cover_all();

    let host = protector.chain(0);
    assert_eq!(host.len(), 5);
    let apex = host[2];
    assert_eq!(protector.chain(1)[0], apex);
    let context = protector.index().context(apex).copied().expect("apex context");
    assert!(context.is_corner);
    assert_eq!(context.polyline, 0);
    assert_eq!(context.pred, Some(host[1]));
    assert_eq!(context.succ, Some(host[3]));

    let registry = protector.registry();
    assert!(registry.link(apex, 0, ChainEnd::Through).is_some());
    assert!(registry.link(apex, 1, ChainEnd::Start).is_some());
    let ids: Vec<_> = registry.polylines_at(apex, 0).into_iter().collect();
    assert_eq!(ids, vec![0, 1]);

    let hidden = &protector.diagnostics().hidden_balls;
    assert_eq!(hidden.len(), 1);
    assert_eq!(hidden[0].by, apex);
    assert_eq!(hidden[0].by_center, [1.5, 0.0, 0.0]);
    assert!(protector.verify().is_ok());

    // Refining the corner shrinks the host neighbors as well.
    let refined = protector.refine_ball(apex).expect("refine corner");
    let host = protector.chain(0);
    assert_eq!(host.len(), 5);
    assert_eq!(host[2], refined);
    let weight = |ball| protector.index().point(ball).map(|p| p.weight).expect("ball");
    assert_relative_eq!(weight(refined), 0.25 / 4.0, epsilon = 1e-12);
    assert_relative_eq!(weight(host[1]), 0.25 / 16.0, epsilon = 1e-12);
    assert_relative_eq!(weight(host[3]), 0.25 / 16.0, epsilon = 1e-12);
    assert!(protector.verify().is_ok());
}

#[test]
fn cover_span_splices_balls_between_existing_ones() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![polyline(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], false)],
        ProtectOptions::new(5.0),
    );
    assert_eq!(protector.cover(0), 4);
    let before = protector.chain(0);

    let placed = protector
        .cover_span(CoverSpan::new(0, before[1], before[2]).alpha(1.0))
        .expect("cover span");
    assert_eq!(placed, 3);

    let placed_at_start = protector
        .cover_span(CoverSpan::new(0, before[0], before[1]).alpha(1.0))
        .expect("cover span from corner");
    assert_eq!(placed_at_start, 3);

    let chain = protector.chain(0);
    assert_eq!(chain.len(), 10);
    let xs: Vec<f64> = chain
        .iter()
        .map(|&b| protector.index().point(b).expect("live ball").center.x)
        .collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]));
    assert_relative_eq!(xs[1], 10.0 / 12.0, epsilon = 1e-9);
    assert_eq!(protector.diagnostics().gap_balls, 6);
    assert!(protector.verify().is_ok());
}

#[test]
fn cover_span_radius_hints_can_leave_span_empty() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![polyline(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], false)],
        ProtectOptions::new(5.0),
    );
    protector.cover(0);
    let chain = protector.chain(0);

    let span = CoverSpan::new(0, chain[1], chain[2])
        .alpha(1.0)
        .radius_hints(1.5, 1.5);
    assert_eq!(protector.cover_span(span), Ok(0));
    assert_eq!(protector.chain(0), chain);
}

#[test]
fn cover_span_rejects_bad_input() {
    let mut index = PowerIndex::new();
    let mut protector = Protector::new(
        &mut index,
        vec![
            polyline(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]], false),
            polyline(&[[0.0, 5.0, 0.0], [10.0, 5.0, 0.0]], false),
        ],
        ProtectOptions::new(5.0),
    );
    protector.cover_all();
    let first = protector.chain(0);
    let second = protector.chain(1);

    assert_eq!(
        protector.cover_span(CoverSpan::new(0, first[1], first[2]).alpha(0.0)),
        Err(ProtectError::InvalidBallSize(0.0))
    );
    assert!(matches!(
        protector.cover_span(CoverSpan::new(0, first[1], second[1])),
        Err(ProtectError::InconsistentRegistry { .. })
    ));
}
