use crate::math::TV;
use std::ops::Range;

pub trait RangeExt {
    /// Note that this does _not_ treat the range as exclusive, and returns true at `self.end`.
    fn contains_point(&self, x: &TV) -> bool;

    fn union(&self, other: &Self) -> Self;
}

impl RangeExt for Range<TV> {
    fn contains_point(&self, x: &TV) -> bool {
        self.start.all_le(x) && x.all_le(&self.end)
    }

    fn union(&self, other: &Self) -> Self {
        self.start.inf(&other.start)..self.end.sup(&other.end)
    }
}

pub trait VecExt {
    fn all_le(&self, other: &Self) -> bool;
}

impl VecExt for TV {
    fn all_le(&self, other: &Self) -> bool {
        self.x <= other.x && self.y <= other.y && self.z <= other.z
    }
}
