use crate::bitvec::BitVector;

#[test]
fn test_new_all_unset() {
    let v = BitVector::new(10);
    assert_eq!(v.size(), 10);
    for i in 0..10 {
        assert!(!v.get(i));
    }
}

#[test]
fn test_set_and_get() {
    let mut v = BitVector::new(70);
    v.set(0, true);
    v.set(63, true);
    v.set(64, true);
    assert!(v.get(0));
    assert!(v.get(63));
    assert!(v.get(64));
    assert!(!v.get(1));
    assert!(!v.get(69));

    v.set(63, false);
    assert!(!v.get(63));
    assert!(v.get(64));
}

#[test]
fn test_clone_diverges_on_write() {
    let mut a = BitVector::new(8);
    a.set(3, true);
    let mut b = a.clone();
    b.set(5, true);
    assert!(b.get(3));
    assert!(b.get(5));
    assert!(!a.get(5), "writes to a clone must not leak back");
    a.set(6, true);
    assert!(!b.get(6));
}

#[test]
fn test_sentinel_reads_all_set() {
    let mut v = BitVector::new(5);
    v.mark_all_assigned();
    for i in 0..5 {
        assert!(v.get(i));
    }
    v.mark_all_unassigned();
    for i in 0..5 {
        assert!(!v.get(i));
    }
}

#[test]
fn test_intersect_words() {
    let mut a = BitVector::new(8);
    a.set(1, true);
    a.set(2, true);
    let mut b = BitVector::new(8);
    b.set(2, true);
    b.set(3, true);
    a.intersect(&b);
    assert!(!a.get(1));
    assert!(a.get(2));
    assert!(!a.get(3));
}

#[test]
fn test_intersect_same_size_sentinel_is_identity() {
    let mut a = BitVector::new(8);
    a.set(1, true);
    a.set(7, true);
    let mut b = BitVector::new(8);
    b.mark_all_assigned();
    a.intersect(&b);
    assert!(a.get(1));
    assert!(a.get(7));
    assert!(!a.get(0));
}

#[test]
fn test_intersect_smaller_sentinel_clears_tail() {
    // The sentinel carries no information past its own declared size, so a
    // larger vector loses everything from there on.
    let mut a = BitVector::new(10);
    a.set(2, true);
    a.set(8, true);
    let mut b = BitVector::new(5);
    b.mark_all_assigned();
    a.intersect(&b);
    assert!(a.get(2));
    assert!(!a.get(8));
}

#[test]
fn test_intersect_shorter_words_clears_tail() {
    let mut a = BitVector::new(10);
    a.set(2, true);
    a.set(8, true);
    let mut b = BitVector::new(3);
    b.set(2, true);
    a.intersect(&b);
    assert!(a.get(2));
    assert!(!a.get(8), "indices past the other's size count as unset there");
}

#[test]
fn test_union_words() {
    let mut a = BitVector::new(8);
    a.set(1, true);
    let mut b = BitVector::new(8);
    b.set(6, true);
    a.union(&b);
    assert!(a.get(1));
    assert!(a.get(6));
}

#[test]
fn test_union_covering_sentinel_becomes_sentinel() {
    let mut a = BitVector::new(5);
    a.set(0, true);
    let mut b = BitVector::new(5);
    b.mark_all_assigned();
    a.union(&b);
    for i in 0..5 {
        assert!(a.get(i));
    }
}

#[test]
fn test_union_smaller_sentinel_sets_only_its_range() {
    let mut a = BitVector::new(10);
    a.set(7, true);
    let mut b = BitVector::new(4);
    b.mark_all_assigned();
    a.union(&b);
    for i in 0..4 {
        assert!(a.get(i));
    }
    assert!(!a.get(4));
    assert!(!a.get(5));
    assert!(a.get(7));
}

#[test]
fn test_union_longer_other_is_truncated() {
    let mut a = BitVector::new(5);
    let mut b = BitVector::new(70);
    b.set(3, true);
    b.set(40, true);
    b.set(68, true);
    a.union(&b);
    assert!(a.get(3));
    assert!(!a.get(0));
    assert_eq!(a.size(), 5);
}

#[test]
fn test_grow_pins_sentinel_at_old_size() {
    let mut v = BitVector::new(3);
    v.mark_all_assigned();
    v.grow(6);
    assert!(v.get(0));
    assert!(v.get(1));
    assert!(v.get(2));
    assert!(!v.get(3));
    assert!(!v.get(5));
}

#[test]
fn test_grow_preserves_bits() {
    let mut v = BitVector::new(2);
    v.set(1, true);
    v.grow(130);
    assert!(v.get(1));
    assert!(!v.get(0));
    assert!(!v.get(129));
    v.set(129, true);
    assert!(v.get(129));
}

#[test]
fn test_display() {
    let mut v = BitVector::new(4);
    v.set(1, true);
    v.set(3, true);
    assert_eq!(v.to_string(), "BitVector (4:0101)");
    v.mark_all_assigned();
    assert_eq!(v.to_string(), "BitVector (4: all)");
}
