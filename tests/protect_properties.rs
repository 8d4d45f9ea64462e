use std::collections::{BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use curve_protect::geom::{GeomMesh, HalfedgeMesh, Point3, open_box, planar_grid, polygon_fan};
use curve_protect::protect::{
    BallId, ChainEnd, PolylineId, PowerIndex, ProtectOptions, ProtectReport, Protector,
    WeightedIndex, extract_polylines, protect_mesh,
};

const RUNS: usize = 24;

fn random_mesh(rng: &mut StdRng) -> GeomMesh {
    match rng.random_range(0..3) {
        0 => planar_grid(
            rng.random_range(1..6),
            rng.random_range(1..6),
            rng.random_range(0.5..2.0),
        ),
        1 => open_box(rng.random_range(0.5..3.0)),
        _ => polygon_fan(
            Point3::new(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                0.0,
            ),
            rng.random_range(0.5..3.0),
            rng.random_range(3..12),
        ),
    }
}

/// A 3 x 1 strip and a separate triangle whose apex sits on the strip's
/// bottom border, halfway along it.
fn touching_components() -> GeomMesh {
    let mut mesh = planar_grid(3, 1, 1.0);
    let base = mesh.positions.len() as u32;
    mesh.positions
        .extend_from_slice(&[[1.5, 0.0, 0.0], [1.0, -1.0, 0.0], [2.0, -1.0, 0.0]]);
    mesh.indices.extend_from_slice(&[base, base + 1, base + 2]);
    mesh
}

fn polyline_set(index: &PowerIndex, report: &ProtectReport, ball: BallId) -> BTreeSet<PolylineId> {
    let own = index.context(ball).map_or(0, |c| c.polyline);
    report.registry.polylines_at(ball, own)
}

fn check_separation(index: &PowerIndex, report: &ProtectReport) {
    let balls: Vec<_> = index.balls().collect();
    for (i, &(a, pa, ca)) in balls.iter().enumerate() {
        for &(b, pb, cb) in &balls[i + 1..] {
            if !pa.intersects(pb) {
                continue;
            }
            if !ca.is_corner && !cb.is_corner {
                assert_eq!(ca.polyline, cb.polyline, "interior balls {a} and {b} overlap");
            } else {
                let shared = polyline_set(index, report, a)
                    .intersection(&polyline_set(index, report, b))
                    .count();
                assert!(shared > 0, "balls {a} and {b} overlap without a common polyline");
            }
        }
    }
}

fn check_chains(index: &PowerIndex, report: &ProtectReport) {
    for (id, chain) in report.chains.iter().enumerate() {
        if report.polylines[id].is_cycle() {
            continue;
        }
        let [first, .., last] = chain.as_slice() else {
            panic!("open polyline {id} has fewer than two balls");
        };
        assert!(index.context(*first).is_some_and(|c| c.is_corner));
        assert!(index.context(*last).is_some_and(|c| c.is_corner));

        // Forward along succ, backward along pred.
        for pair in chain[1..chain.len() - 1].windows(2) {
            assert_eq!(index.context(pair[0]).and_then(|c| c.succ), Some(pair[1]));
            assert_eq!(index.context(pair[1]).and_then(|c| c.pred), Some(pair[0]));
        }
        let mut backward = vec![*last];
        let mut next = report
            .registry
            .link(*last, id, ChainEnd::End)
            .and_then(|l| l.neighbor);
        while let Some(ball) = next {
            backward.push(ball);
            if backward.len() > chain.len() {
                break;
            }
            let context = index.context(ball).expect("chain ball");
            let passes = report.registry.link(ball, id, ChainEnd::Through).is_some();
            next = if context.is_corner && !passes { None } else { context.pred };
        }
        backward.reverse();
        assert_eq!(&backward, chain);
    }
}

fn check_registry(index: &PowerIndex, report: &ProtectReport) {
    for corner in report.registry.corners() {
        let expected: BTreeSet<PolylineId> = report
            .chains
            .iter()
            .enumerate()
            .filter(|(_, chain)| chain.contains(&corner))
            .map(|(id, _)| id)
            .collect();
        let registered: BTreeSet<PolylineId> = report
            .registry
            .links(corner)
            .iter()
            .map(|l| l.polyline)
            .collect();
        assert_eq!(registered, expected, "corner {corner}");
        assert_eq!(polyline_set(index, report, corner), expected);
    }
}

fn center_key(center: Point3) -> [u64; 3] {
    center.to_array().map(f64::to_bits)
}

/// Runs cover and separation step by step and checks that no ball center
/// ends up heavier than it was right after cover.
fn check_weights_only_shrink(mesh: &GeomMesh, options: &ProtectOptions) {
    let mut halfedges = HalfedgeMesh::from_mesh(mesh).expect("halfedge mesh");
    let set = extract_polylines(&mut halfedges, &options.extract);

    let mut index = PowerIndex::new();
    let mut protector = Protector::new(&mut index, set.polylines, *options);
    protector.cover_all();
    let covered: HashMap<[u64; 3], f64> = protector
        .index()
        .balls()
        .map(|(_, point, _)| (center_key(point.center), point.weight))
        .collect();

    protector.separate_balls().expect("separate balls");
    for (ball, point, _) in protector.index().balls() {
        match covered.get(&center_key(point.center)) {
            Some(&weight) => assert!(
                point.weight <= weight,
                "ball {ball} grew from {weight} to {}",
                point.weight
            ),
            None => assert!(options.recover_gaps, "ball {ball} appeared without gap re-cover"),
        }
    }
}

fn check_all(mesh: &GeomMesh, options: &ProtectOptions) {
    let mut index = PowerIndex::new();
    let report = protect_mesh(&mut index, mesh, options).expect("protect mesh");

    assert_eq!(report.diagnostics.protecting_balls, index.number_of_vertices());
    check_separation(&index, &report);
    check_chains(&index, &report);
    check_registry(&index, &report);
    check_weights_only_shrink(mesh, options);
}

#[test]
fn random_meshes_satisfy_protection_properties() {
    let mut rng = StdRng::seed_from_u64(0x5eed_ba11);
    for _ in 0..RUNS {
        let mesh = random_mesh(&mut rng);
        let options = ProtectOptions::new(rng.random_range(0.2..1.5))
            .recover_gaps(rng.random_bool(0.3));
        check_all(&mesh, &options);
    }
}

#[test]
fn touching_components_satisfy_protection_properties() {
    for recover_gaps in [false, true] {
        check_all(&touching_components(), &ProtectOptions::new(1.0).recover_gaps(recover_gaps));
    }
}

#[test]
fn repeated_runs_are_deterministic() {
    let mesh = planar_grid(3, 3, 1.0);
    let options = ProtectOptions::new(0.4);

    let mut first = PowerIndex::new();
    let mut second = PowerIndex::new();
    let a = protect_mesh(&mut first, &mesh, &options).expect("first run");
    let b = protect_mesh(&mut second, &mesh, &options).expect("second run");

    assert_eq!(a.chains, b.chains);
    assert_eq!(a.diagnostics.summary(), b.diagnostics.summary());
    assert_eq!(a.diagnostics.restarts, b.diagnostics.restarts);
    let centers = |index: &PowerIndex| -> Vec<[f64; 3]> {
        index.balls().map(|(_, p, _)| p.center.to_array()).collect()
    };
    assert_eq!(centers(&first), centers(&second));
}
