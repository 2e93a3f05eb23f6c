use std::fmt;

use noodles::core::Position;

/// A closed, 1-based genomic interval.
///
/// Intervals order by start, then by end.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Interval {
    start: Position,
    end: Position,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid interval: end ({end}) < start ({start})")]
    EndBeforeStart { start: Position, end: Position },
}

impl Interval {
    pub fn new(start: Position, end: Position) -> Result<Self, Error> {
        if end < start {
            Err(Error::EndBeforeStart { start, end })
        } else {
            Ok(Self { start, end })
        }
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn end(&self) -> Position {
        self.end
    }

    pub fn len(&self) -> usize {
        usize::from(self.end) - usize::from(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Returns the smallest interval covering both intervals.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub(crate) fn with_start(self, start: Position) -> Self {
        Self {
            start: start.min(self.end),
            end: self.end,
        }
    }

    pub(crate) fn with_end(self, end: Position) -> Self {
        Self {
            start: self.start,
            end: end.max(self.start),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Returns the bounding interval of all given intervals.
pub fn bounding<I>(intervals: I) -> Option<Interval>
where
    I: IntoIterator<Item = Interval>,
{
    intervals.into_iter().reduce(|a, b| a.union(&b))
}

/// Merges overlapping and abutting intervals.
///
/// The result is sorted by start.
pub fn merge(intervals: &[Interval]) -> Vec<Interval> {
    if intervals.is_empty() {
        return Vec::new();
    }

    let mut intervals = intervals.to_vec();
    intervals.sort_unstable();

    let mut merged_intervals: Vec<Interval> = Vec::with_capacity(intervals.len());
    merged_intervals.push(intervals[0]);

    for b in intervals {
        let a = merged_intervals.last_mut().expect("list cannot be empty");

        if usize::from(b.start) > usize::from(a.end) + 1 {
            merged_intervals.push(b);
            continue;
        }

        if a.end < b.end {
            a.end = b.end;
        }
    }

    merged_intervals
}

#[cfg(test)]
pub(crate) fn build(start: usize, end: usize) -> Interval {
    let start = Position::try_from(start).expect("invalid start");
    let end = Position::try_from(end).expect("invalid end");
    Interval::new(start, end).expect("invalid interval")
}
