mod test_cover_basic;

use crate::geom::Point3;
use crate::protect::Polyline;

pub(super) fn polyline(points: &[[f64; 3]], is_cycle: bool) -> Polyline {
    Polyline::new(points.iter().copied().map(Point3::from).collect(), is_cycle)
}
