//! Stroke smoothing for free-hand drawing.
//!
//! Raw pointer samples are joined with quadratic segments: each interior
//! sample is the control point of a segment ending at the midpoint between it
//! and the next sample. The stroke opens at the first sample and closes with a
//! straight segment to the last one, so both ends stay exactly where the
//! gesture started and stopped.

use kurbo::{BezPath, ParamCurve, PathSeg, Point};

/// Steps each quadratic segment is evaluated at in [`smooth_points`].
pub const SEGMENT_STEPS: usize = 4;

/// Build the smoothed curve for a gesture.
///
/// Empty input yields an empty path; a single sample yields a path holding
/// only its start point.
pub fn smooth_path(samples: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some((&first, rest)) = samples.split_first() else {
        return path;
    };
    path.move_to(first);

    let Some((&last, interior)) = rest.split_last() else {
        return path;
    };

    for (i, &control) in interior.iter().enumerate() {
        let next = rest[i + 1];
        path.quad_to(control, control.midpoint(next));
    }
    path.line_to(last);
    path
}

/// The smoothed curve as an ordered point sequence.
///
/// Quadratic segments are evaluated at [`SEGMENT_STEPS`] evenly spaced
/// parameters; straight segments contribute their end point. The first and
/// last points equal the first and last samples.
pub fn smooth_points(samples: &[Point]) -> Vec<Point> {
    let path = smooth_path(samples);
    let mut points = Vec::with_capacity(samples.len() * SEGMENT_STEPS + 1);
    if let Some(&first) = samples.first() {
        points.push(first);
    }

    for seg in path.segments() {
        match seg {
            PathSeg::Quad(quad) => {
                for step in 1..=SEGMENT_STEPS {
                    points.push(quad.eval(step as f64 / SEGMENT_STEPS as f64));
                }
            }
            PathSeg::Line(line) => points.push(line.p1),
            PathSeg::Cubic(cubic) => points.push(cubic.p3),
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(smooth_path(&[]).elements().is_empty());
        assert!(smooth_points(&[]).is_empty());
    }

    #[test]
    fn test_single_sample_is_degenerate() {
        let samples = pts(&[(12.0, 34.0)]);
        let path = smooth_path(&samples);
        assert_eq!(path.elements(), &[PathEl::MoveTo(Point::new(12.0, 34.0))]);
        assert_eq!(smooth_points(&samples), samples);
        assert_eq!(smooth_points(&smooth_points(&samples)), samples);
    }

    #[test]
    fn test_two_samples_are_a_line() {
        let samples = pts(&[(0.0, 0.0), (10.0, 5.0)]);
        let path = smooth_path(&samples);
        assert_eq!(
            path.elements(),
            &[
                PathEl::MoveTo(Point::new(0.0, 0.0)),
                PathEl::LineTo(Point::new(10.0, 5.0)),
            ]
        );
    }

    #[test]
    fn test_interior_samples_become_quad_controls() {
        let samples = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        let path = smooth_path(&samples);
        assert_eq!(
            path.elements(),
            &[
                PathEl::MoveTo(Point::new(0.0, 0.0)),
                PathEl::QuadTo(Point::new(10.0, 0.0), Point::new(10.0, 5.0)),
                PathEl::QuadTo(Point::new(10.0, 10.0), Point::new(5.0, 10.0)),
                PathEl::LineTo(Point::new(0.0, 10.0)),
            ]
        );
    }

    #[test]
    fn test_endpoints_preserved() {
        let samples = pts(&[(3.0, 4.0), (8.0, 9.5), (15.0, 7.0), (22.0, 18.0), (30.0, 2.5)]);
        let smoothed = smooth_points(&samples);

        assert_eq!(smoothed.first(), samples.first());
        assert_eq!(smoothed.last(), samples.last());
        // 3 quads * steps + 1 line + start
        assert_eq!(smoothed.len(), 3 * SEGMENT_STEPS + 2);
    }

    #[test]
    fn test_smoothing_stays_within_sample_hull() {
        let samples = pts(&[(0.0, 0.0), (50.0, 100.0), (100.0, 0.0)]);
        for p in smooth_points(&samples) {
            assert!((0.0..=100.0).contains(&p.x));
            assert!((0.0..=100.0).contains(&p.y));
        }
    }
}
