// src/metrics.rs - Shape descriptors derived from perimeter and area

use std::f64::consts::PI;

use crate::regions::PropertyTable;

/// Region area divided by its perimeter.
///
/// `None` when the perimeter is zero (single pixel regions) or either input
/// is not a positive finite number.
pub fn convexity(perimeter: f64, area: f64) -> Option<f64> {
    if !is_positive(perimeter) || !is_positive(area) {
        return None;
    }
    Some(area / perimeter)
}

/// Perimeter² / (4π·area): 1.0 for a circle, larger for less circular shapes.
///
/// Same `None` policy as [`convexity`].
pub fn circularity_reciprocal(perimeter: f64, area: f64) -> Option<f64> {
    if !is_positive(perimeter) || !is_positive(area) {
        return None;
    }
    Some(perimeter * perimeter / (4.0 * PI * area))
}

/// Diameter of the circle with the same area
pub fn equivalent_diameter(area: f64) -> f64 {
    (4.0 * area / PI).sqrt()
}

/// Area over convex hull area, in (0, 1]
pub fn solidity(area: f64, convex_area: f64) -> f64 {
    if convex_area > 0.0 {
        area / convex_area
    } else {
        0.0
    }
}

/// Recompute the derived columns of every row from its stored geometry
pub fn recompute_derived(table: &mut PropertyTable) {
    for row in table.rows_mut() {
        let area = f64::from(row.area);
        row.equivalent_diameter = equivalent_diameter(area);
        row.solidity = solidity(area, f64::from(row.convex_area));
        row.convexity = convexity(row.perimeter, area);
        row.circularity_reciprocal = circularity_reciprocal(row.perimeter, area);
    }
}

#[inline]
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn circle_has_unit_circularity_reciprocal() {
        let r = 7.5;
        let value = circularity_reciprocal(2.0 * PI * r, PI * r * r).unwrap();
        assert_approx_eq!(value, 1.0, 1e-12);
    }

    #[test]
    fn square_is_less_circular() {
        // Side 10: perimeter 40, area 100 -> 1600 / (400 pi)
        let value = circularity_reciprocal(40.0, 100.0).unwrap();
        assert_approx_eq!(value, 4.0 / PI, 1e-12);
        assert!(value > 1.0);
    }

    #[test]
    fn convexity_is_area_over_perimeter() {
        assert_approx_eq!(convexity(40.0, 100.0).unwrap(), 2.5, 1e-12);
    }

    #[test]
    fn zero_perimeter_is_undefined() {
        assert_eq!(convexity(0.0, 1.0), None);
        assert_eq!(circularity_reciprocal(0.0, 1.0), None);
        assert_eq!(convexity(3.0, 0.0), None);
        assert_eq!(circularity_reciprocal(f64::NAN, 4.0), None);
    }

    #[test]
    fn equivalent_diameter_matches_circle() {
        let r = 3.0;
        assert_approx_eq!(equivalent_diameter(PI * r * r), 2.0 * r, 1e-12);
    }

    #[test]
    fn solidity_guards_empty_hull() {
        assert_eq!(solidity(5.0, 0.0), 0.0);
        assert_approx_eq!(solidity(5.0, 6.0), 5.0 / 6.0, 1e-12);
    }
}
