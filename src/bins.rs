//! Circular arithmetic on angle bins.
//!
//! The angle axis of the accumulator is a ring: the bin after the last one is bin
//! zero again. All wraparound arithmetic goes through [`AngleRing`].

/// Angle bins `[0, bins)` arranged on a ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AngleRing {
    bins: u32,
}

impl AngleRing {
    /// Creates a ring with `bins` elements, `bins` must be positive.
    pub fn new(bins: u32) -> Self {
        debug_assert!(bins > 0);
        Self { bins }
    }

    /// Number of bins of the ring.
    pub fn bins(&self) -> u32 {
        self.bins
    }

    /// Maps any signed bin index onto the ring.
    #[inline]
    pub fn wrap(&self, bin: i64) -> u32 {
        bin.rem_euclid(self.bins as i64) as u32
    }

    /// Moves `bin` by a signed `offset` along the ring.
    #[inline]
    pub fn offset(&self, bin: u32, offset: i32) -> u32 {
        self.wrap(bin as i64 + offset as i64)
    }

    /// Shortest number of steps between two bins on the ring.
    #[inline]
    pub fn distance(&self, a: u32, b: u32) -> u32 {
        debug_assert!(a < self.bins && b < self.bins);
        let direct = a.abs_diff(b);
        direct.min(self.bins - direct)
    }

    /// True if `bin` lies within `tolerance` bins of `center`.
    #[inline]
    pub fn within(&self, center: u32, bin: u32, tolerance: u32) -> bool {
        self.distance(center, bin) <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_handles_boundaries() {
        let ring = AngleRing::new(360);
        assert_eq!(ring.wrap(0), 0);
        assert_eq!(ring.wrap(359), 359);
        assert_eq!(ring.wrap(360), 0);
        assert_eq!(ring.wrap(-1), 359);
        assert_eq!(ring.wrap(-360), 0);
        assert_eq!(ring.wrap(-361), 359);
        assert_eq!(ring.wrap(725), 5);
    }

    #[test]
    fn offset_wraps_in_both_directions() {
        let ring = AngleRing::new(10);
        assert_eq!(ring.offset(0, -2), 8);
        assert_eq!(ring.offset(9, 1), 0);
        assert_eq!(ring.offset(9, 3), 2);
        assert_eq!(ring.offset(4, 0), 4);
    }

    #[test]
    fn distance_takes_the_short_way() {
        let ring = AngleRing::new(10);
        assert_eq!(ring.distance(0, 9), 1);
        assert_eq!(ring.distance(9, 0), 1);
        assert_eq!(ring.distance(2, 7), 5);
        assert_eq!(ring.distance(3, 3), 0);
        assert!(ring.within(0, 8, 2));
        assert!(!ring.within(0, 7, 2));
    }
}
