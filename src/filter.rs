//! Post-processing of detected lines: duplicate removal and parallel grouping.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::lines::InfiniteLine;

/// Removes lines that have a similar but strictly stronger counterpart.
///
/// Two lines are similar if their normals differ by less than `min_angle` radians and
/// their distances by less than `min_distance` pixels (with `half_orientation`, flipped
/// lines compare against the negated distance). Lines of equal strength both survive.
/// Applying the filter twice gives the same result as applying it once.
pub fn filter_lines(lines: &[InfiniteLine], min_distance: f64, min_angle: f64, half_orientation: bool) -> Vec<InfiniteLine> {
    let min_cos = min_angle.cos();

    lines
        .iter()
        .enumerate()
        .filter(|&(n, line)| {
            !lines.iter().enumerate().any(|(i, other)| {
                i != n
                    && line.is_similar(other, min_distance, min_cos, half_orientation)
                    && line.strength() < other.strength()
            })
        })
        .map(|(_, line)| *line)
        .collect()
}

/// Groups of mutually parallel lines, largest groups first.
///
/// Every line forms a candidate group with all lines parallel to it within
/// `max_angle` radians. Groups with a single line are never reported, groups smaller
/// than `minimal_set_size` are skipped (`0` accepts any size). With `no_duplicates`
/// a line is reported in the first (largest) group containing it only.
///
/// # Examples
///
/// ```rust
/// use hough_lines::{parallel_lines, InfiniteLine};
///
/// let lines = [
///     InfiniteLine::from_angle(0.30, 10.0, 1.0),
///     InfiniteLine::from_angle(1.40, 0.0, 1.0),
///     InfiniteLine::from_angle(0.31, 40.0, 1.0),
/// ];
/// let groups = parallel_lines(&lines, 2f64.to_radians(), 0, true);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].len(), 2);
/// ```
pub fn parallel_lines(
    lines: &[InfiniteLine],
    max_angle: f64,
    minimal_set_size: usize,
    no_duplicates: bool,
) -> Vec<Vec<InfiniteLine>> {
    let max_cos = max_angle.cos();

    let mut index_sets: Vec<BTreeSet<usize>> = (0..lines.len()).map(|n| BTreeSet::from([n])).collect();
    for n0 in 0..lines.len() {
        for n1 in n0 + 1..lines.len() {
            if lines[n0].is_parallel(&lines[n1], max_cos) {
                index_sets[n0].insert(n1);
                index_sets[n1].insert(n0);
            }
        }
    }

    index_sets.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut used = BTreeSet::new();
    let mut groups = Vec::new();

    for set in index_sets.iter().take_while(|set| set.len() > 1) {
        let group: Vec<InfiniteLine> = set
            .iter()
            .filter(|&&index| !no_duplicates || used.insert(index))
            .map(|&index| lines[index])
            .collect();

        if group.len() > 1 && (minimal_set_size == 0 || group.len() >= minimal_set_size) {
            groups.push(group);
        }
    }

    groups
}

/// The longest chain of parallel lines.
///
/// Lines are sorted by distance; starting from every line the chain is extended to
/// both sides with each next line parallel to the previous chain member, closer than
/// `min_angle` radians. The chain with the most members wins, among equally long
/// chains the one with the smallest angular deviation. The first element is the line
/// the chain started from. Returns an empty vector for no input.
pub fn dominant_parallel_lines(lines: &[InfiniteLine], min_angle: f64) -> Vec<InfiniteLine> {
    let min_cos = min_angle.cos();

    let mut sorted = lines.to_vec();
    sort_lines_by_distance(&mut sorted);

    let mut best: Option<(usize, f64, Vec<InfiniteLine>)> = None;

    for i in 0..sorted.len() {
        let mut chain = vec![sorted[i]];
        let left = extend_chain(&sorted[i], sorted[..i].iter().rev(), min_cos, &mut chain);
        let right = extend_chain(&sorted[i], sorted[i + 1..].iter(), min_cos, &mut chain);
        let worst_cos = left.min(right);

        let neighbors = chain.len() - 1;
        let better = match &best {
            None => true,
            Some((best_neighbors, best_cos, _)) => {
                neighbors > *best_neighbors || (neighbors == *best_neighbors && worst_cos > *best_cos)
            }
        };
        if better {
            best = Some((neighbors, worst_cos, chain));
        }
    }

    best.map(|(_, _, chain)| chain).unwrap_or_default()
}

/// Appends every candidate parallel to the last appended line; returns the smallest
/// absolute cosine between consecutive chain members, `1` if nothing was appended.
fn extend_chain<'a>(
    start: &InfiniteLine,
    candidates: impl Iterator<Item = &'a InfiniteLine>,
    min_cos: f64,
    chain: &mut Vec<InfiniteLine>,
) -> f64 {
    let mut current = *start;
    let mut worst_cos = 1.0f64;
    for candidate in candidates {
        let cos = current.normal().dot(&candidate.normal()).abs();
        if cos > min_cos {
            worst_cos = worst_cos.min(cos);
            chain.push(*candidate);
            current = *candidate;
        }
    }
    worst_cos
}

/// Sorts lines by their signed distance, ascending.
pub fn sort_lines_by_distance(lines: &mut [InfiniteLine]) {
    lines.sort_by(|a, b| a.distance().partial_cmp(&b.distance()).unwrap_or(Ordering::Equal));
}

/// Sorts lines by strength, strongest first.
pub fn sort_lines_by_strength(lines: &mut [InfiniteLine]) {
    lines.sort_by(|a, b| b.strength().partial_cmp(&a.strength()).unwrap_or(Ordering::Equal));
}

/// Sorts groups by their number of elements, largest first.
pub fn sort_groups_descending<T>(groups: &mut [Vec<T>]) {
    groups.sort_by(|a, b| b.len().cmp(&a.len()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn line(degrees: f64, distance: f64, strength: f64) -> InfiniteLine {
        InfiniteLine::from_angle(degrees.to_radians(), distance, strength)
    }

    #[test]
    fn weaker_duplicates_are_removed() {
        let lines = [line(30.0, 20.0, 10.0), line(31.0, 22.0, 5.0), line(80.0, -40.0, 3.0)];
        let filtered = filter_lines(&lines, 10.0, 5f64.to_radians(), true);
        assert_eq!(filtered, vec![lines[0], lines[2]]);
    }

    #[test]
    fn flipped_duplicates_need_half_orientation() {
        let strong = line(30.0, 20.0, 10.0);
        let flipped = InfiniteLine::from_angle(30f64.to_radians() + PI, -21.0, 4.0);
        let lines = [strong, flipped];
        assert_eq!(filter_lines(&lines, 10.0, 0.1, true), vec![strong]);
        assert_eq!(filter_lines(&lines, 10.0, 0.1, false).len(), 2);
    }

    #[test]
    fn equal_strength_duplicates_survive() {
        let lines = [line(10.0, 0.0, 5.0), line(10.5, 1.0, 5.0)];
        assert_eq!(filter_lines(&lines, 10.0, 0.1, true).len(), 2);
    }

    #[test]
    fn filtering_is_idempotent() {
        let lines: Vec<InfiniteLine> = (0..40)
            .map(|i| line((i * 37 % 180) as f64, (i * 13 % 50) as f64 - 25.0, (i * 29 % 17) as f64 + 1.0))
            .collect();
        let once = filter_lines(&lines, 8.0, 6f64.to_radians(), true);
        let twice = filter_lines(&once, 8.0, 6f64.to_radians(), true);
        assert_eq!(once, twice);
        assert!(once.len() < lines.len());
    }

    #[test]
    fn groups_are_sorted_and_deduplicated() {
        let lines = [
            line(10.0, 0.0, 1.0),
            line(10.5, 30.0, 1.0),
            line(60.0, 5.0, 1.0),
            line(11.0, -30.0, 1.0),
            line(61.0, 50.0, 1.0),
            line(120.0, 0.0, 1.0),
        ];
        let groups = parallel_lines(&lines, 2f64.to_radians(), 0, true);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[1], vec![lines[2], lines[4]]);

        let with_duplicates = parallel_lines(&lines, 2f64.to_radians(), 0, false);
        // three groups of three (one per member) and two of two
        assert_eq!(with_duplicates.iter().map(Vec::len).collect::<Vec<_>>(), vec![3, 3, 3, 2, 2]);

        let large = parallel_lines(&lines, 2f64.to_radians(), 3, true);
        assert_eq!(large.len(), 1);
    }

    #[test]
    fn last_line_gets_its_own_group() {
        let lines = [line(0.0, 0.0, 1.0), line(45.0, 0.0, 1.0), line(45.5, 10.0, 1.0)];
        let groups = parallel_lines(&lines, 2f64.to_radians(), 0, false);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|group| group.len() == 2));
        assert!(parallel_lines(&[], 0.1, 0, true).is_empty());
    }

    #[test]
    fn dominant_chain_is_the_longest() {
        let lines = [
            line(20.0, -10.0, 1.0),
            line(70.0, 0.0, 1.0),
            line(21.0, 15.0, 1.0),
            line(22.0, 40.0, 1.0),
            line(71.0, 60.0, 1.0),
        ];
        let chain = dominant_parallel_lines(&lines, 3f64.to_radians());
        assert_eq!(chain.len(), 3);
        assert!(chain.iter().all(|l| (l.angle().to_degrees() - 21.0).abs() < 1.5));
        assert!(dominant_parallel_lines(&[], 0.1).is_empty());
    }

    #[test]
    fn dominant_ties_prefer_tighter_chains() {
        let lines = [
            line(10.0, 0.0, 1.0),
            line(12.5, 10.0, 1.0),
            line(80.0, 20.0, 1.0),
            line(80.2, 30.0, 1.0),
        ];
        let chain = dominant_parallel_lines(&lines, 3f64.to_radians());
        assert_eq!(chain.len(), 2);
        assert!(chain.iter().all(|l| l.angle().to_degrees() > 79.0));
    }

    #[test]
    fn sorting_helpers() {
        let mut lines = vec![line(0.0, 5.0, 1.0), line(0.0, -3.0, 9.0), line(0.0, 1.0, 4.0)];
        sort_lines_by_distance(&mut lines);
        assert_eq!(lines.iter().map(|l| l.distance()).collect::<Vec<_>>(), vec![-3.0, 1.0, 5.0]);
        sort_lines_by_strength(&mut lines);
        assert_eq!(lines.iter().map(|l| l.strength()).collect::<Vec<_>>(), vec![9.0, 4.0, 1.0]);

        let mut groups = vec![vec![1], vec![1, 2, 3], vec![1, 2]];
        sort_groups_descending(&mut groups);
        assert_eq!(groups, vec![vec![1, 2, 3], vec![1, 2], vec![1]]);
    }
}
