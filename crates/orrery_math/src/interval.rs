/// A closed range of ray parameters `[min, max]`.
///
/// Used both for the valid `t` window of an intersection query and for the
/// per-axis extent of a bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: f32,
    pub max: f32,
}

impl Interval {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Inclusive membership test.
    pub fn contains(&self, x: f32) -> bool {
        self.min <= x && x <= self.max
    }

    /// Exclusive membership test. Intersection roots must satisfy this, so a
    /// root sitting exactly on `min` (the self-intersection epsilon) is rejected.
    pub fn surrounds(&self, x: f32) -> bool {
        self.min < x && x < self.max
    }

    /// Same lower bound, new upper bound. Used to shrink the search window
    /// to the closest hit found so far.
    pub fn with_max(&self, max: f32) -> Interval {
        Interval::new(self.min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surrounds_excludes_endpoints() {
        let window = Interval::new(0.001, 10.0);

        assert!(!window.surrounds(0.001));
        assert!(!window.surrounds(10.0));
        assert!(window.surrounds(0.0011));
        assert!(!window.surrounds(0.0));
    }

    #[test]
    fn test_contains_includes_endpoints() {
        let window = Interval::new(-1.0, 1.0);

        assert!(window.contains(-1.0));
        assert!(window.contains(1.0));
        assert!(!window.contains(1.0001));
    }

    #[test]
    fn test_with_max_shrinks_window() {
        let window = Interval::new(0.001, f32::INFINITY).with_max(4.0);

        assert_eq!(window.min, 0.001);
        assert_eq!(window.max, 4.0);
        assert!(!window.surrounds(5.0));
    }
}
