use super::*;

#[test]
fn none_is_empty_and_sized_zero() {
    assert!(Rect::NONE.is_empty());
    assert_eq!(Rect::NONE.width(), 0);
    assert_eq!(Rect::NONE.area(), 0);
}

#[test]
fn intersect_of_disjoint_rects_is_none() {
    let a = Rect::from_size(10, 10);
    let b = Rect::new(20, 30, 0, 10);
    assert_eq!(a.intersect(&b), Rect::NONE);
}

#[test]
fn intersect_and_union_of_overlapping_rects() {
    let a = Rect::new(0, 10, 0, 10);
    let b = Rect::new(5, 15, -5, 5);
    assert_eq!(a.intersect(&b), Rect::new(5, 10, 0, 5));
    assert_eq!(a.union(&b), Rect::new(0, 15, -5, 10));
}

#[test]
fn union_ignores_empty_operands() {
    let a = Rect::new(3, 4, 3, 4);
    assert_eq!(a.union(&Rect::NONE), a);
    assert_eq!(Rect::NONE.union(&a), a);
}

#[test]
fn contains_is_half_open() {
    let r = Rect::from_size(3, 3);
    assert!(r.contains(0, 0));
    assert!(r.contains(2, 2));
    assert!(!r.contains(3, 0));
    assert!(!r.contains(-1, 1));
}

#[test]
fn translate_and_expand() {
    let r = Rect::from_size(2, 2);
    assert_eq!(r.translate(5, -1), Rect::new(5, 7, -1, 1));
    assert_eq!(r.expand(1, 2), Rect::new(-1, 3, -2, 4));
}
