//! Catmull-Rom fitting through strand segment positions.

use glam::Vec3;

/// Evaluate a uniform Catmull-Rom segment between `p1` and `p2`.
fn catmull_rom(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Sample a curve through `points`, `samples_per_segment` samples per span.
///
/// The curve passes through every input point; end tangents are formed by
/// repeating the first and last points. Fewer than two points are returned
/// unchanged.
pub fn fit(points: &[Vec3], samples_per_segment: usize) -> Vec<Vec3> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let samples_per_segment = samples_per_segment.max(1);
    let last = points.len() - 1;
    let mut curve = Vec::with_capacity(last * samples_per_segment + 1);

    for i in 0..last {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(last)];
        for s in 0..samples_per_segment {
            let t = s as f32 / samples_per_segment as f32;
            curve.push(catmull_rom(p0, p1, p2, p3, t));
        }
    }
    curve.push(points[last]);
    curve
}

/// Polyline length of a sampled curve.
pub fn arc_length(curve: &[Vec3]) -> f32 {
    curve.windows(2).map(|w| w[0].distance(w[1])).sum()
}
