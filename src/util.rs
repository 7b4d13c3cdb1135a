//! Small combinatorial helpers shared by the inverse-glyph search and the
//! automatic syllabifier.

/// All subsets of the break positions `1..n`, ordered by subset size and then
/// lexicographically. The empty subset (no breaks) comes first.
pub(crate) fn break_patterns(n: usize) -> Vec<Vec<usize>> {
    let positions: Vec<usize> = (1..n).collect();
    let mut patterns = Vec::new();
    for size in 0..=positions.len() {
        combinations(&positions, size, 0, &mut Vec::new(), &mut patterns);
    }
    patterns
}

fn combinations(
    positions: &[usize],
    size: usize,
    start: usize,
    current: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    for i in start..positions.len() {
        current.push(positions[i]);
        combinations(positions, size, i + 1, current, out);
        current.pop();
    }
}

/// Splits `items` into contiguous blocks before each index in `breaks`.
/// `breaks` must be ascending and within `1..items.len()`.
pub(crate) fn split_at_breaks<'a, T>(items: &'a [T], breaks: &[usize]) -> Vec<&'a [T]> {
    let mut blocks = Vec::with_capacity(breaks.len() + 1);
    let mut start = 0;
    for &b in breaks {
        blocks.push(&items[start..b]);
        start = b;
    }
    blocks.push(&items[start..]);
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn break_patterns_start_with_empty() {
        let patterns = break_patterns(3);
        assert_eq!(patterns[0], Vec::<usize>::new());
        assert!(patterns.contains(&vec![1]));
        assert!(patterns.contains(&vec![2]));
        assert!(patterns.contains(&vec![1, 2]));
        assert_eq!(patterns.len(), 4);
    }

    #[test]
    fn break_patterns_single_item() {
        assert_eq!(break_patterns(1), vec![Vec::<usize>::new()]);
    }

    #[test]
    fn split_respects_breaks() {
        let items = [1, 2, 3, 4];
        let blocks = split_at_breaks(&items, &[1, 3]);
        assert_eq!(blocks, vec![&items[0..1], &items[1..3], &items[3..4]]);
    }

    #[test]
    fn split_without_breaks_is_whole() {
        let items = ["a", "b"];
        let blocks = split_at_breaks(&items, &[]);
        assert_eq!(blocks, vec![&items[..]]);
    }
}
