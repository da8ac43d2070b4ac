// Contiguous sector runs
// Coalescing of sector sequences and slicing of run lists

use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous run of sectors `[start, start + length)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorRange {
    pub start: u64,
    pub length: u64,
}

impl SectorRange {
    pub fn new(start: u64, length: u64) -> Self {
        Self { start, length }
    }

    /// First sector past the end of the run, saturating at `u64::MAX`
    pub fn end(&self) -> u64 {
        self.start.saturating_add(self.length)
    }

    /// The sectors covered by this run, in order
    pub fn sectors(&self) -> impl Iterator<Item = u64> {
        let start = self.start;
        (0..self.length).map(move |i| start + i)
    }
}

impl fmt::Display for SectorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.start, self.length)
    }
}

/// Iterator adapter merging consecutive sector values into runs.
///
/// A value joins the pending run only when it is exactly the next sector
/// after it. Input order is authoritative: a value contiguous with some
/// earlier, already emitted run starts a new run instead.
pub struct Coalesce<I> {
    values: I,
    pending: Option<SectorRange>,
}

impl<I: Iterator<Item = u64>> Iterator for Coalesce<I> {
    type Item = SectorRange;

    fn next(&mut self) -> Option<SectorRange> {
        for value in self.values.by_ref() {
            match self.pending.as_mut() {
                Some(run) if run.start.checked_add(run.length) == Some(value) => run.length += 1,
                Some(_) => return self.pending.replace(SectorRange::new(value, 1)),
                None => self.pending = Some(SectorRange::new(value, 1)),
            }
        }
        self.pending.take()
    }
}

/// Coalesce a sequence of sector indices into contiguous runs
pub fn coalesce<I>(values: I) -> Coalesce<I::IntoIter>
where
    I: IntoIterator<Item = u64>,
{
    Coalesce {
        values: values.into_iter(),
        pending: None,
    }
}

/// Flatten runs back into the sector sequence they describe
pub fn expand(ranges: &[SectorRange]) -> impl Iterator<Item = u64> + '_ {
    ranges.iter().flat_map(SectorRange::sectors)
}

/// Select the on-disk runs backing a file-relative sector section.
///
/// `ranges` describes a file in order: its first run holds file sectors
/// `0..ranges[0].length`, the next run continues from there, and so on.
/// `section.start` and `section.length` are in those file-relative sectors.
/// Runs are split at the section boundaries; a section reaching past the
/// end of the file is truncated.
pub fn slice_ranges(ranges: &[SectorRange], section: SectorRange) -> Vec<SectorRange> {
    let mut result = Vec::new();
    let mut position = 0u64;
    let mut wanted = section.start;
    let mut remaining = section.length;

    for run in ranges {
        if remaining == 0 {
            break;
        }

        let run_end = position.saturating_add(run.length);
        if wanted >= position && wanted < run_end {
            let skip = wanted - position;
            let take = (run.length - skip).min(remaining);
            result.push(SectorRange::new(run.start + skip, take));
            remaining -= take;
            wanted = wanted.saturating_add(take);
        }

        position = run_end;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(values: &[u64]) -> Vec<SectorRange> {
        coalesce(values.iter().copied()).collect()
    }

    fn r(start: u64, length: u64) -> SectorRange {
        SectorRange::new(start, length)
    }

    #[test]
    fn test_single_run() {
        assert_eq!(runs(&[100, 101, 102, 103, 104, 105, 106, 107]), vec![r(100, 8)]);
    }

    #[test]
    fn test_two_runs() {
        assert_eq!(
            runs(&[100, 101, 102, 103, 120, 121, 122, 123]),
            vec![r(100, 4), r(120, 4)]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(runs(&[]).is_empty());
    }

    #[test]
    fn test_single_value() {
        assert_eq!(runs(&[42]), vec![r(42, 1)]);
    }

    #[test]
    fn test_out_of_order_value_starts_new_run() {
        // 104 follows 100..104 numerically, but 200 sits in between
        assert_eq!(
            runs(&[100, 101, 102, 103, 200, 104, 105]),
            vec![r(100, 4), r(200, 1), r(104, 2)]
        );
    }

    #[test]
    fn test_descending_values_are_not_merged() {
        assert_eq!(runs(&[5, 4, 3]), vec![r(5, 1), r(4, 1), r(3, 1)]);
    }

    #[test]
    fn test_repeated_value_is_not_merged() {
        assert_eq!(runs(&[7, 7, 8]), vec![r(7, 1), r(7, 2)]);
    }

    #[test]
    fn test_expand_reproduces_input() {
        let inputs: [&[u64]; 7] = [
            &[],
            &[1],
            &[10, 11, 12, 40, 41, 3, 4, 5, 6],
            &[9, 8, 7, 7, 8, 9],
            &[u64::MAX - 3, u64::MAX - 2, 0, 1],
            &[u64::MAX],
            &[u64::MAX - 1, u64::MAX],
        ];
        for input in inputs {
            let ranges = runs(input);
            let expanded: Vec<u64> = expand(&ranges).collect();
            assert_eq!(expanded, input);
        }
    }

    #[test]
    fn test_adjacent_runs_are_not_mergeable_for_ascending_input() {
        let input = [3, 4, 5, 9, 10, 11, 12, 30, 31, 33, 34];
        let ranges = runs(&input);
        for pair in ranges.windows(2) {
            assert!(pair[1].start > pair[0].end());
        }
    }

    #[test]
    fn test_coalesce_is_lazy() {
        let mut iter = coalesce([1u64, 2, 10, 11].into_iter());
        assert_eq!(iter.next(), Some(r(1, 2)));
        assert_eq!(iter.next(), Some(r(10, 2)));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_display_format() {
        assert_eq!(r(2148, 8).to_string(), "2148 8");
    }

    #[test]
    fn test_slice_inside_one_run() {
        let ranges = vec![r(100, 4), r(120, 4)];
        assert_eq!(slice_ranges(&ranges, r(1, 2)), vec![r(101, 2)]);
    }

    #[test]
    fn test_slice_across_runs() {
        let ranges = vec![r(100, 4), r(120, 4), r(300, 10)];
        assert_eq!(
            slice_ranges(&ranges, r(2, 8)),
            vec![r(102, 2), r(120, 4), r(300, 2)]
        );
    }

    #[test]
    fn test_slice_starting_at_run_boundary() {
        let ranges = vec![r(100, 4), r(120, 4)];
        assert_eq!(slice_ranges(&ranges, r(4, 4)), vec![r(120, 4)]);
    }

    #[test]
    fn test_slice_past_end_is_truncated() {
        let ranges = vec![r(100, 4), r(120, 4)];
        assert_eq!(slice_ranges(&ranges, r(6, 100)), vec![r(122, 2)]);
        assert!(slice_ranges(&ranges, r(8, 1)).is_empty());
    }

    #[test]
    fn test_slice_empty_section() {
        let ranges = vec![r(100, 4)];
        assert!(slice_ranges(&ranges, r(0, 0)).is_empty());
    }

    #[test]
    fn test_slice_with_file_offsets_at_u64_limit() {
        let ranges = vec![r(0, u64::MAX), r(500, 10)];
        assert_eq!(slice_ranges(&ranges, r(u64::MAX - 1, 5)), vec![r(u64::MAX - 1, 1)]);
    }
}
