// src/shape_analysis.rs - Boundary, hull and moment measurements for one labelled region

use log::warn;

/// Direction vectors for Moore-Neighbor contour tracing (clockwise, image coordinates)
static MOORE_NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),   // right
    (1, 1),   // down-right
    (0, 1),   // down
    (-1, 1),  // down-left
    (-1, 0),  // left
    (-1, -1), // up-left
    (0, -1),  // up
    (1, -1),  // up-right
];

/// Kulpa's correction for the length bias of 8-connected chain codes
const CHAIN_LENGTH_CORRECTION: f64 = 0.948;

/// Pixels of a single region, stored over its bounding box
#[derive(Debug, Clone)]
pub struct RegionMask {
    /// (x, y) of the top-left corner of the bounding box in the source image
    pub origin: (u32, u32),
    pub width: u32,
    pub height: u32,
    cells: Vec<bool>,
    count: u32,
}

impl RegionMask {
    /// Build from absolute pixel coordinates. Returns `None` for an empty set.
    pub fn from_pixels(pixels: &[(u32, u32)]) -> Option<Self> {
        let first = pixels.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
        for &(x, y) in pixels {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        let mut cells = vec![false; (width as usize) * (height as usize)];
        let mut count = 0;
        for &(x, y) in pixels {
            let idx = ((y - min_y) as usize) * (width as usize) + (x - min_x) as usize;
            if !cells[idx] {
                cells[idx] = true;
                count += 1;
            }
        }

        Some(Self {
            origin: (min_x, min_y),
            width,
            height,
            cells,
            count,
        })
    }

    /// Membership test in local (bounding box) coordinates
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0
            && y >= 0
            && (x as u32) < self.width
            && (y as u32) < self.height
            && self.cells[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn area(&self) -> u32 {
        self.count
    }

    /// Mean (row, col) position in source image coordinates
    pub fn centroid(&self) -> (f64, f64) {
        let mut sum_row = 0.0;
        let mut sum_col = 0.0;
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                if self.contains(x, y) {
                    sum_row += f64::from(y);
                    sum_col += f64::from(x);
                }
            }
        }
        let n = f64::from(self.count.max(1));
        (
            f64::from(self.origin.1) + sum_row / n,
            f64::from(self.origin.0) + sum_col / n,
        )
    }
}

/// Outer boundary of a region as a start pixel plus Freeman chain code
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryTrace {
    /// Start pixel in local coordinates (first pixel in raster order)
    pub start: (i32, i32),
    /// Directions into [`MOORE_NEIGHBORHOOD`]; even codes are axis steps, odd codes diagonal
    pub chain: Vec<u8>,
}

impl BoundaryTrace {
    /// Boundary pixels in local coordinates, start pixel first, without the closing repeat
    pub fn points(&self) -> Vec<(i32, i32)> {
        let mut points = Vec::with_capacity(self.chain.len() + 1);
        let mut current = self.start;
        points.push(current);
        for &code in &self.chain {
            let (dx, dy) = MOORE_NEIGHBORHOOD[code as usize];
            current = (current.0 + dx, current.1 + dy);
            points.push(current);
        }
        if points.len() > 1 && points.last() == Some(&self.start) {
            points.pop();
        }
        points
    }

    /// Perimeter estimate from the chain code. Zero for a single isolated pixel.
    pub fn perimeter(&self) -> f64 {
        let even = self.chain.iter().filter(|&&c| c % 2 == 0).count() as f64;
        let odd = self.chain.len() as f64 - even;
        CHAIN_LENGTH_CORRECTION * (even + std::f64::consts::SQRT_2 * odd)
    }
}

/// Trace the outer boundary of a region with Moore-Neighbor tracing.
///
/// Tracing stops when the start pixel is left again in the same direction
/// as the first move, which closes the contour for regions with one-pixel
/// necks as well.
pub fn trace_boundary(mask: &RegionMask) -> BoundaryTrace {
    let mut start = None;
    'outer: for y in 0..mask.height as i32 {
        for x in 0..mask.width as i32 {
            if mask.contains(x, y) {
                start = Some((x, y));
                break 'outer;
            }
        }
    }

    let start = match start {
        Some(point) => point,
        None => {
            return BoundaryTrace {
                start: (0, 0),
                chain: Vec::new(),
            }
        }
    };

    let mut chain = Vec::new();
    let mut current = start;
    // The start is the first pixel in raster order, so its left neighbour is outside
    let mut backtrack = 4usize;
    let mut first_move: Option<usize> = None;
    let max_steps = 8 * mask.area() as usize + 8;

    loop {
        let mut next = None;
        for i in 1..=8 {
            let dir = (backtrack + i) % 8;
            let (dx, dy) = MOORE_NEIGHBORHOOD[dir];
            if mask.contains(current.0 + dx, current.1 + dy) {
                next = Some(dir);
                break;
            }
        }

        // Isolated pixel
        let dir = match next {
            Some(dir) => dir,
            None => break,
        };

        if current == start && first_move == Some(dir) {
            break;
        }
        if first_move.is_none() {
            first_move = Some(dir);
        }

        chain.push(dir as u8);
        let (dx, dy) = MOORE_NEIGHBORHOOD[dir];
        current = (current.0 + dx, current.1 + dy);
        backtrack = (dir + 5) % 8;

        if chain.len() > max_steps {
            warn!(
                "Boundary trace exceeded {} steps for region at {:?}, stopping early",
                max_steps, mask.origin
            );
            break;
        }
    }

    BoundaryTrace { start, chain }
}

#[inline]
fn cross(o: (i64, i64), a: (i64, i64), b: (i64, i64)) -> i64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Convex hull by Andrew's monotone chain. Collinear points are dropped;
/// an all-collinear input yields its two end points.
pub fn convex_hull(points: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut sorted = points.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let mut lower: Vec<(i64, i64)> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<(i64, i64)> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Number of pixel centres of the region's bounding box lying inside or on the hull
pub fn convex_area(mask: &RegionMask, hull: &[(i64, i64)]) -> u32 {
    if hull.is_empty() {
        return 0;
    }

    let mut count = 0;
    for y in 0..i64::from(mask.height) {
        for x in 0..i64::from(mask.width) {
            let p = (x, y);
            let mut positive = false;
            let mut negative = false;
            for i in 0..hull.len() {
                let c = cross(hull[i], hull[(i + 1) % hull.len()], p);
                positive |= c > 0;
                negative |= c < 0;
            }
            if !(positive && negative) {
                count += 1;
            }
        }
    }
    count
}

/// Raw geometry of one region
#[derive(Debug, Clone, PartialEq)]
pub struct RegionGeometry {
    pub area: u32,
    pub perimeter: f64,
    pub centroid: (f64, f64),
    pub convex_area: u32,
}

/// Measure area, perimeter, centroid and convex area in one pass over the mask
pub fn measure_region(mask: &RegionMask) -> RegionGeometry {
    let trace = trace_boundary(mask);
    let boundary: Vec<(i64, i64)> = trace
        .points()
        .into_iter()
        .map(|(x, y)| (i64::from(x), i64::from(y)))
        .collect();
    let hull = convex_hull(&boundary);

    RegionGeometry {
        area: mask.area(),
        perimeter: trace.perimeter(),
        centroid: mask.centroid(),
        convex_area: convex_area(mask, &hull),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pixels_where(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Vec<(u32, u32)> {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    pixels.push((x, y));
                }
            }
        }
        pixels
    }

    #[test]
    fn single_pixel_has_zero_perimeter() {
        let mask = RegionMask::from_pixels(&[(4, 7)]).unwrap();
        let geometry = measure_region(&mask);
        assert_eq!(geometry.area, 1);
        assert_eq!(geometry.perimeter, 0.0);
        assert_eq!(geometry.convex_area, 1);
        assert_eq!(geometry.centroid, (7.0, 4.0));
    }

    #[test]
    fn empty_pixel_set_has_no_mask() {
        assert!(RegionMask::from_pixels(&[]).is_none());
    }

    #[test]
    fn square_trace_visits_every_border_pixel() {
        let mask = RegionMask::from_pixels(&pixels_where(4, 4, |_, _| true)).unwrap();
        let trace = trace_boundary(&mask);
        assert_eq!(trace.chain.len(), 12);
        assert!(trace.chain.iter().all(|c| c % 2 == 0));
        assert_eq!(trace.points().len(), 12);
        assert_approx_eq!(trace.perimeter(), 12.0 * 0.948, 1e-9);
    }

    #[test]
    fn trace_closes_through_one_pixel_neck() {
        // Two 2x2 blocks joined diagonally at a single corner
        let pixels = vec![(0, 0), (1, 0), (0, 1), (1, 1), (2, 2), (3, 2), (2, 3), (3, 3)];
        let mask = RegionMask::from_pixels(&pixels).unwrap();
        let trace = trace_boundary(&mask);
        let points = trace.points();
        for p in &pixels {
            assert!(points.contains(&(p.0 as i32, p.1 as i32)), "missing {:?}", p);
        }
        // Closed: walking the chain ends at the start pixel
        let mut end = trace.start;
        for &c in &trace.chain {
            let (dx, dy) = MOORE_NEIGHBORHOOD[c as usize];
            end = (end.0 + dx, end.1 + dy);
        }
        assert_eq!(end, trace.start);
    }

    #[test]
    fn hull_of_square_has_four_corners() {
        let points: Vec<(i64, i64)> = (0..5).flat_map(|x| (0..5).map(move |y| (x, y))).collect();
        let mut hull = convex_hull(&points);
        hull.sort_unstable();
        assert_eq!(hull, vec![(0, 0), (0, 4), (4, 0), (4, 4)]);
    }

    #[test]
    fn hull_of_collinear_points_is_segment() {
        let hull = convex_hull(&[(0, 0), (1, 1), (2, 2), (1, 1)]);
        assert_eq!(hull.len(), 2);
    }

    #[test]
    fn convex_area_fills_concavity() {
        // L shape: 3x3 block minus its top-right 2x2 corner
        let pixels = pixels_where(3, 3, |x, y| !(x >= 1 && y <= 1));
        let mask = RegionMask::from_pixels(&pixels).unwrap();
        let geometry = measure_region(&mask);
        assert_eq!(geometry.area, 5);
        // Hull is the triangle (0,0)-(0,2)-(2,2); (1,1) sits on its hypotenuse
        assert_eq!(geometry.convex_area, 6);
    }

    #[test]
    fn disk_perimeter_close_to_circumference() {
        let r = 20.0f64;
        let pixels = pixels_where(45, 45, |x, y| {
            let dx = x as f64 - 22.0;
            let dy = y as f64 - 22.0;
            dx * dx + dy * dy <= r * r
        });
        let mask = RegionMask::from_pixels(&pixels).unwrap();
        let geometry = measure_region(&mask);
        let circumference = 2.0 * std::f64::consts::PI * r;
        assert!((geometry.perimeter - circumference).abs() / circumference < 0.03);
        assert_approx_eq!(geometry.centroid.0, 22.0, 1e-9);
        assert_approx_eq!(geometry.centroid.1, 22.0, 1e-9);
        assert!(geometry.convex_area >= geometry.area);
    }
}
