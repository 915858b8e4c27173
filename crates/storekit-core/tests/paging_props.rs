//! Property tests for paging arithmetic

use proptest::prelude::*;
use storekit_core::paging::page_count_for;
use storekit_core::{calculate_visible_page_range, Orientation, PagingCalculator};

fn orientation() -> impl Strategy<Value = Orientation> {
    prop_oneof![
        Just(Orientation::Left),
        Just(Orientation::Center),
        Just(Orientation::Right),
    ]
}

/// (total, per_page, page) with a page that is valid for the pair.
fn valid_paging() -> impl Strategy<Value = (usize, usize, usize)> {
    (0usize..2_000, 1usize..100).prop_flat_map(|(total, per_page)| {
        let count = page_count_for(total, per_page);
        let pages = if count == 0 { 0..=0 } else { 1..=count };
        (Just(total), Just(per_page), pages)
    })
}

proptest! {
    #[test]
    fn offsets_stay_within_total((total, per_page, page) in valid_paging()) {
        let calc = PagingCalculator::new(total, per_page, page, false).unwrap();
        prop_assert!(calc.offset_start() <= calc.offset_end());
        prop_assert!(calc.offset_end() <= total);
        prop_assert!(calc.offset_end() - calc.offset_start() <= per_page);
    }

    #[test]
    fn visible_range_within_bounds(
        page_count in 1usize..300,
        page_seed in 0usize..300,
        size in 1usize..20,
        orientation in orientation(),
    ) {
        let page = page_seed % page_count + 1;
        let range = calculate_visible_page_range(page, page_count, size, orientation).unwrap();

        prop_assert!(range.start >= 1);
        prop_assert!(range.end <= page_count);
        prop_assert_eq!(range.len(), size.min(page_count));
        prop_assert!(range.contains(page));
    }

    #[test]
    fn auto_adjust_keeps_page_valid(
        (total, per_page, page) in valid_paging(),
        new_total in 0usize..2_000,
    ) {
        let mut calc = PagingCalculator::new(total, per_page, page, true).unwrap();
        calc.set_total(new_total).unwrap();
        prop_assert!(calc.validate().is_ok());
    }
}

#[test]
fn visible_range_documented_examples() {
    let range = |page, count, size, o| calculate_visible_page_range(page, count, size, o).unwrap();

    assert_eq!(range(5, 15, 5, Orientation::Right).pages(), 5..=9);
    assert_eq!(range(5, 15, 5, Orientation::Left).pages(), 1..=5);
    assert_eq!(range(5, 15, 5, Orientation::Center).pages(), 3..=7);
    assert_eq!(range(1, 20, 5, Orientation::Center).pages(), 1..=5);
    assert_eq!(range(1, 1, 5, Orientation::Right).pages(), 1..=1);
    assert!(calculate_visible_page_range(1, 0, 5, Orientation::Center).is_none());
}
