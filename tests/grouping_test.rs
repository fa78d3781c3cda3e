use std::path::PathBuf;

use pagestrip::{LayoutMode, PageGroup, PageId, PageMeta, SourceId, group_index_for_page, group_pages};

fn make_pages(flags: impl IntoIterator<Item = bool>) -> Vec<PageMeta> {
    flags
        .into_iter()
        .enumerate()
        .map(|(idx, spread)| PageMeta {
            id: PageId::new(SourceId::new("grouping"), idx as u32),
            rel_path: PathBuf::from(format!("{idx:04}.jpg")),
            width: if spread { 2400 } else { 1200 },
            height: 1800,
            is_double_spread: spread,
        })
        .collect()
}

/// Deterministic flag sequences without pulling in an RNG crate
fn pseudo_random_flags(seed: u64, len: usize, one_in: u64) -> Vec<bool> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state % one_in == 0
        })
        .collect()
}

fn assert_partition(groups: &[PageGroup], n: usize) {
    let mut expected_start = 0;
    for group in groups {
        assert_eq!(group.start_index, expected_start, "gap or overlap at {}", group.id);
        assert!(group.end_index >= group.start_index);
        assert!((1..=2).contains(&group.pages.len()));
        assert_eq!(group.end_index - group.start_index + 1, group.pages.len());
        for (offset, page) in group.pages.iter().enumerate() {
            assert_eq!(page.index(), group.start_index + offset);
        }
        expected_start = group.end_index + 1;
    }
    assert_eq!(expected_start, n);
}

#[test]
fn every_third_page_spread_in_double_layout() {
    let pages = make_pages((0..1200).map(|i| i % 3 == 2));
    let groups = group_pages(&pages, LayoutMode::Double);

    let ranges: Vec<(usize, usize)> = groups.iter().map(|g| (g.start_index, g.end_index)).collect();
    assert_eq!(
        &ranges[..7],
        &[(0, 0), (1, 1), (2, 2), (3, 4), (5, 5), (6, 7), (8, 8)]
    );
    assert_eq!(groups.len(), 3 + 399 * 2);
    assert_eq!(ranges.last(), Some(&(1199, 1199)));
    assert_partition(&groups, 1200);
}

#[test]
fn grouping_partitions_in_every_mode() {
    for seed in 0..40 {
        let len = (seed as usize * 7) % 53;
        let pages = make_pages(pseudo_random_flags(seed, len, 4));
        for mode in [LayoutMode::Single, LayoutMode::Double, LayoutMode::Vertical] {
            let groups = group_pages(&pages, mode);
            assert_partition(&groups, len);
        }
    }
}

#[test]
fn double_layout_pairing_rules() {
    for seed in 0..40 {
        let pages = make_pages(pseudo_random_flags(seed, 60, 3));
        let groups = group_pages(&pages, LayoutMode::Double);

        assert_eq!(groups[0].pages.len(), 1, "first page must be alone");
        for group in &groups {
            if group.pages.iter().any(|p| p.is_double_spread) {
                assert_eq!(group.pages.len(), 1, "spread paired in {}", group.id);
            }
            let lone = &group.pages[0];
            if group.pages.len() == 1 && !lone.is_double_spread && group.start_index != 0 {
                // A lone regular page is either last or sits before a spread.
                let next = pages.get(group.start_index + 1);
                assert!(next.is_none_or(|p| p.is_double_spread), "unpaired {}", group.id);
            }
        }
    }
}

#[test]
fn single_and_vertical_never_pair() {
    let pages = make_pages([false; 9]);
    for mode in [LayoutMode::Single, LayoutMode::Vertical] {
        let groups = group_pages(&pages, mode);
        assert_eq!(groups.len(), 9);
        assert!(groups.iter().all(|g| g.pages.len() == 1));
    }
}

#[test]
fn lookup_finds_owner_and_clamps() {
    let pages = make_pages(pseudo_random_flags(11, 80, 5));
    let groups = group_pages(&pages, LayoutMode::Double);
    for index in 0..pages.len() {
        let owner = group_index_for_page(&groups, index);
        assert!(groups[owner].contains(index));
    }
    assert_eq!(group_index_for_page(&groups, 10_000), groups.len() - 1);
}
