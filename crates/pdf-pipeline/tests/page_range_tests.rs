use pdf_pipeline::page_range::{self, PageRange};

#[test]
fn test_all_pages() {
    assert_eq!(page_range::parse("ALL", 4).unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(page_range::parse("all", 4).unwrap(), vec![0, 1, 2, 3]);
}

#[test]
fn test_empty_input_is_all() {
    assert_eq!(page_range::parse("", 3).unwrap(), page_range::parse("ALL", 3).unwrap());
    assert_eq!(page_range::parse("   ", 3).unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_odd_and_even() {
    assert_eq!(page_range::parse("ODD", 5).unwrap(), vec![1, 3]);
    assert_eq!(page_range::parse("EVEN", 5).unwrap(), vec![0, 2, 4]);
    assert_eq!(page_range::parse("odd", 1).unwrap(), Vec::<usize>::new());
}

#[test]
fn test_single_pages_and_last() {
    assert_eq!(page_range::parse("2", 5).unwrap(), vec![1]);
    assert_eq!(page_range::parse("N", 5).unwrap(), vec![4]);
    assert_eq!(page_range::parse("N", 5).unwrap(), page_range::parse("5", 5).unwrap());
}

#[test]
fn test_ascending_and_descending_ranges() {
    assert_eq!(page_range::parse("1-3", 5).unwrap(), vec![0, 1, 2]);
    assert_eq!(page_range::parse("3-1", 5).unwrap(), vec![2, 1, 0]);
    assert_eq!(page_range::parse("2-N", 4).unwrap(), vec![1, 2, 3]);
    assert_eq!(page_range::parse("N-3", 5).unwrap(), vec![4, 3, 2]);
    assert_eq!(page_range::parse("2-2", 5).unwrap(), vec![1]);
}

#[test]
fn test_adjacent_reversed_bounds_are_empty() {
    // "5-4" resolves to the empty range 4..=3
    assert_eq!(page_range::parse("5-4", 6).unwrap(), Vec::<usize>::new());
}

#[test]
fn test_sections_concatenate_without_dedup() {
    assert_eq!(page_range::parse("1,1-2,N", 3).unwrap(), vec![0, 0, 1, 2]);
}

#[test]
fn test_whitespace_case_and_fullwidth_comma() {
    assert_eq!(page_range::parse(" 1 - 2 ，n ", 4).unwrap(), vec![0, 1, 3]);
}

#[test]
fn test_out_of_bounds_pages_fail() {
    assert!(page_range::parse("0", 3).is_err());
    assert!(page_range::parse("4", 3).is_err());
    assert!(page_range::parse("1-4", 3).is_err());
    assert!(page_range::parse("N", 0).is_err());
}

#[test]
fn test_malformed_sections_fail() {
    assert!(page_range::parse("abc", 3).is_err());
    assert!(page_range::parse("1,,2", 3).is_err());
    assert!(page_range::parse("1-", 3).is_err());
    assert!(page_range::parse("-2", 3).is_err());
    assert!(page_range::parse("1-2-3", 3).is_err());
    assert!(page_range::parse("1.5", 3).is_err());
}

#[test]
fn test_error_names_the_section() {
    let err = page_range::parse("1,x", 3).unwrap_err();
    assert_eq!(err.section, "X");
}

#[test]
fn test_indices_stay_in_bounds() {
    for count in 1..8 {
        for input in ["ALL", "ODD", "EVEN", "N", "1-N", "N-1", "1", "ODD,EVEN"] {
            let range = PageRange::parse(input, count).unwrap();
            assert!(range.iter().all(|&i| i < count), "{input} with {count} pages");
            assert_eq!(range.page_count(), count);
        }
    }
}

#[test]
fn test_page_range_iteration() {
    let range = PageRange::parse("3-1", 3).unwrap();
    assert_eq!(range.len(), 3);
    assert!(!range.is_empty());
    let collected: Vec<usize> = range.iter().copied().collect();
    assert_eq!(collected, range.indices());
    assert_eq!(range.into_indices(), vec![2, 1, 0]);
}
