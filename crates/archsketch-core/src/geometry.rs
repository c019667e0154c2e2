//! Geometry helpers shared by the view, guides and tools.
//!
//! Everything here works in canvas-local coordinates and never fails loudly:
//! degenerate input yields `None` or an identity result.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Tolerance used for parallel / zero-length checks.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// A line through two points, used by the ruler, mirror and perspective guides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideLine {
    pub start: Point,
    pub end: Point,
}

impl GuideLine {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Direction from `start` to `end` (not normalized).
    pub fn direction(&self) -> Vec2 {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.direction().hypot()
    }

    /// A line whose endpoints coincide constrains nothing.
    pub fn is_degenerate(&self) -> bool {
        self.direction().hypot2() < GEOMETRY_EPSILON
    }

    pub fn midpoint(&self) -> Point {
        self.start.midpoint(self.end)
    }

    /// Orthogonal foot of `point` on the infinite line, or `None` if degenerate.
    pub fn project(&self, point: Point) -> Option<Point> {
        project_onto_line(point, self.start, self.end)
    }

    /// Mirror image of `point` across the infinite line.
    pub fn reflect(&self, point: Point) -> Option<Point> {
        reflect_across_line(point, self.start, self.end)
    }
}

/// Four corners of a (possibly non-rectangular) quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub tl: Point,
    pub tr: Point,
    pub br: Point,
    pub bl: Point,
}

impl Quad {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            tl: Point::new(rect.x0, rect.y0),
            tr: Point::new(rect.x1, rect.y0),
            br: Point::new(rect.x1, rect.y1),
            bl: Point::new(rect.x0, rect.y1),
        }
    }

    /// Corners in clockwise order starting at top-left.
    pub fn points(&self) -> [Point; 4] {
        [self.tl, self.tr, self.br, self.bl]
    }

    pub fn bounds(&self) -> Rect {
        bounding_box(&self.points()).unwrap_or(Rect::ZERO)
    }

    pub fn contains(&self, point: Point) -> bool {
        point_in_polygon(point, &self.points())
    }
}

/// Intersection of the two infinite lines `a0-a1` and `b0-b1`.
///
/// Returns `None` when the lines are parallel (or either is degenerate).
pub fn line_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Point> {
    let da = a1 - a0;
    let db = b1 - b0;
    let denom = da.cross(db);
    let scale = da.hypot() * db.hypot();
    if scale < GEOMETRY_EPSILON || denom.abs() <= scale * 1e-9 {
        return None;
    }
    let t = (b0 - a0).cross(db) / denom;
    Some(a0 + da * t)
}

/// Orthogonal projection of `point` onto the infinite line through `a` and `b`.
pub fn project_onto_line(point: Point, a: Point, b: Point) -> Option<Point> {
    let dir = b - a;
    let len_sq = dir.hypot2();
    if len_sq < GEOMETRY_EPSILON {
        return None;
    }
    let t = (point - a).dot(dir) / len_sq;
    Some(a + dir * t)
}

/// Projection onto the line through `origin` with direction `dir`.
pub fn project_onto_ray_line(point: Point, origin: Point, dir: Vec2) -> Option<Point> {
    project_onto_line(point, origin, origin + dir)
}

/// Reflection of `point` across the infinite line through `a` and `b`:
/// `p' = 2 * proj(p) - p`.
pub fn reflect_across_line(point: Point, a: Point, b: Point) -> Option<Point> {
    let foot = project_onto_line(point, a, b)?;
    Some(Point::new(2.0 * foot.x - point.x, 2.0 * foot.y - point.y))
}

/// Rotate `point` around `center` by `angle` radians.
pub fn rotate_about(point: Point, center: Point, angle: f64) -> Point {
    let (sin, cos) = angle.sin_cos();
    let d = point - center;
    Point::new(
        center.x + d.x * cos - d.y * sin,
        center.y + d.x * sin + d.y * cos,
    )
}

/// Axis-aligned bounding box of a point set.
pub fn bounding_box(points: &[Point]) -> Option<Rect> {
    let first = points.first()?;
    let mut rect = Rect::from_points(*first, *first);
    for p in &points[1..] {
        rect = rect.union_pt(*p);
    }
    Some(rect)
}

/// Normalized rectangle spanned by two corners.
pub fn rect_from_corners(a: Point, b: Point) -> Rect {
    Rect::from_points(a, b)
}

/// Even-odd point-in-polygon test.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = pj.x + (point.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Convex hull (Andrew's monotone chain), counter-clockwise, no collinear points.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| (*a - *b).hypot2() < GEOMETRY_EPSILON);
    if pts.len() < 3 {
        return pts;
    }

    let turn = |o: Point, a: Point, b: Point| (a - o).cross(b - o);
    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && turn(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && turn(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Smallest angle (radians, in `[0, PI/2]`) between two undirected directions.
pub fn undirected_angle_between(a: Vec2, b: Vec2) -> f64 {
    let la = a.hypot();
    let lb = b.hypot();
    if la < GEOMETRY_EPSILON || lb < GEOMETRY_EPSILON {
        return std::f64::consts::FRAC_PI_2;
    }
    let cos = (a.dot(b) / (la * lb)).abs().min(1.0);
    cos.acos()
}

/// Total length of a polyline.
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// A 3x3 projective transform mapping source points to destination points.
///
/// Stored row-major with `m[2][2]` normalized to 1 after solving.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [[f64; 3]; 3],
}

impl Homography {
    pub fn identity() -> Self {
        Self { m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]] }
    }

    /// Solve the homography taking each `src[i]` to `dst[i]`.
    ///
    /// Returns `None` when the correspondences are degenerate (three collinear
    /// corners, coincident points).
    pub fn from_quads(src: &Quad, dst: &Quad) -> Option<Self> {
        let s = src.points();
        let d = dst.points();
        // 8 unknowns h00..h21 with h22 = 1.
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (s[i].x, s[i].y);
            let (u, v) = (d[i].x, d[i].y);
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }
        let h = solve_linear_8(a)?;
        let hom = Self {
            m: [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]],
        };
        if hom.determinant().abs() < GEOMETRY_EPSILON {
            return None;
        }
        Some(hom)
    }

    fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Map a point; `None` if it lands on the line at infinity.
    pub fn apply(&self, p: Point) -> Option<Point> {
        let m = &self.m;
        let w = m[2][0] * p.x + m[2][1] * p.y + m[2][2];
        if w.abs() < GEOMETRY_EPSILON {
            return None;
        }
        Some(Point::new(
            (m[0][0] * p.x + m[0][1] * p.y + m[0][2]) / w,
            (m[1][0] * p.x + m[1][1] * p.y + m[1][2]) / w,
        ))
    }

    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < GEOMETRY_EPSILON {
            return None;
        }
        let m = &self.m;
        let inv = 1.0 / det;
        Some(Self {
            m: [
                [
                    (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv,
                    (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv,
                    (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv,
                ],
                [
                    (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv,
                    (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv,
                    (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv,
                ],
                [
                    (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv,
                    (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv,
                    (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv,
                ],
            ],
        })
    }

    /// Raw matrix rows.
    pub fn rows(&self) -> [[f64; 3]; 3] {
        self.m
    }
}

/// Gaussian elimination with partial pivoting on an 8x9 augmented matrix.
fn solve_linear_8(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    for col in 0..8 {
        let pivot = (col..8).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        for row in 0..8 {
            if row == col {
                continue;
            }
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..9 {
                a[row][k] -= factor * a[col][k];
            }
        }
    }
    let mut out = [0.0; 8];
    for i in 0..8 {
        out[i] = a[i][8] / a[i][i];
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-6
    }

    #[test]
    fn test_line_intersection() {
        let p = line_intersection(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        )
        .unwrap();
        assert!(close(p, Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_parallel_lines_have_no_intersection() {
        let p = line_intersection(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 5.0),
            Point::new(10.0, 5.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn test_project_onto_degenerate_line() {
        let a = Point::new(3.0, 3.0);
        assert!(project_onto_line(Point::new(1.0, 2.0), a, a).is_none());
    }

    #[test]
    fn test_reflect_across_diagonal() {
        let r = reflect_across_line(Point::new(1.0, 0.0), Point::ZERO, Point::new(1.0, 1.0)).unwrap();
        assert!(close(r, Point::new(0.0, 1.0)));
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square));
    }

    #[test]
    fn test_convex_hull_drops_interior() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(5.0, 5.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Point::new(5.0, 5.0)));
    }

    #[test]
    fn test_homography_maps_corners() {
        let src = Quad::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        let dst = Quad {
            tl: Point::new(10.0, 20.0),
            tr: Point::new(120.0, 5.0),
            br: Point::new(140.0, 130.0),
            bl: Point::new(0.0, 110.0),
        };
        let h = Homography::from_quads(&src, &dst).unwrap();
        for (s, d) in src.points().iter().zip(dst.points().iter()) {
            assert!(close(h.apply(*s).unwrap(), *d));
        }
        let inv = h.inverse().unwrap();
        assert!(close(inv.apply(dst.br).unwrap(), src.br));
    }

    #[test]
    fn test_homography_rejects_collapsed_quad() {
        let src = Quad::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0));
        let p = Point::new(5.0, 5.0);
        let dst = Quad { tl: p, tr: p, br: p, bl: p };
        assert!(Homography::from_quads(&src, &dst).is_none());
    }

    #[test]
    fn test_undirected_angle() {
        let a = Vec2::new(1.0, 0.0);
        let b = Vec2::new(-1.0, 0.0);
        assert!(undirected_angle_between(a, b) < 1e-9);
    }
}
