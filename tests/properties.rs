//! Property-based tests checking the deque against a sequential `VecDeque` oracle, plus a
//! handful of concrete scenarios taken directly from the crate's documented contract.

use std::collections::VecDeque;

use anchor_deque::Deque;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    PushLeft(i32),
    PushRight(i32),
    PopLeft,
    PopRight,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i32>().prop_map(Op::PushLeft),
        any::<i32>().prop_map(Op::PushRight),
        Just(Op::PopLeft),
        Just(Op::PopRight),
    ]
}

proptest! {
    /// Applying the same sequence of operations, single-threaded, to the lock-free deque and to
    /// a `VecDeque` oracle must produce identical pop results and leave both in the same
    /// emptiness state.
    #[test]
    fn matches_vecdeque_oracle(ops in prop::collection::vec(op_strategy(), 0..200)) {
        let deque = Deque::new();
        let mut oracle: VecDeque<i32> = VecDeque::new();

        for op in ops {
            match op {
                Op::PushLeft(v) => {
                    deque.push_left(v);
                    oracle.push_front(v);
                }
                Op::PushRight(v) => {
                    deque.push_right(v);
                    oracle.push_back(v);
                }
                Op::PopLeft => {
                    prop_assert_eq!(deque.try_pop_left(), oracle.pop_front());
                }
                Op::PopRight => {
                    prop_assert_eq!(deque.try_pop_right(), oracle.pop_back());
                }
            }
        }

        prop_assert_eq!(deque.is_empty(), oracle.is_empty());
    }

    /// A single-ended workload (push_right/try_pop_right only) is LIFO regardless of how many
    /// pushes and pops are interleaved.
    #[test]
    fn single_ended_right_is_lifo(values in prop::collection::vec(any::<i32>(), 0..100)) {
        let deque = Deque::new();
        let mut stack = Vec::new();

        for v in values {
            deque.push_right(v);
            stack.push(v);
        }
        while let Some(expected) = stack.pop() {
            prop_assert_eq!(deque.try_pop_right(), Some(expected));
        }
        prop_assert_eq!(deque.try_pop_right(), None);
    }

    /// Mirror of the above on the left end.
    #[test]
    fn single_ended_left_is_lifo(values in prop::collection::vec(any::<i32>(), 0..100)) {
        let deque = Deque::new();
        let mut stack = Vec::new();

        for v in values {
            deque.push_left(v);
            stack.push(v);
        }
        while let Some(expected) = stack.pop() {
            prop_assert_eq!(deque.try_pop_left(), Some(expected));
        }
        prop_assert_eq!(deque.try_pop_left(), None);
    }

    /// `is_empty` tests only the left end; by the emptiness-symmetry invariant this must always
    /// agree with what testing the right end would report, for any sequence of operations.
    #[test]
    fn emptiness_left_right_symmetry(ops in prop::collection::vec(op_strategy(), 0..100)) {
        let deque = Deque::new();
        let mut len: i64 = 0;

        for op in ops {
            match op {
                Op::PushLeft(v) => { deque.push_left(v); len += 1; }
                Op::PushRight(v) => { deque.push_right(v); len += 1; }
                Op::PopLeft => { if deque.try_pop_left().is_some() { len -= 1; } }
                Op::PopRight => { if deque.try_pop_right().is_some() { len -= 1; } }
            }
        }

        prop_assert_eq!(deque.is_empty(), len == 0);
    }
}

#[test]
fn degenerate_single_threaded_scenario() {
    let d = Deque::new();
    d.push_right(1);
    d.push_right(2);
    assert_eq!(d.try_pop_left(), Some(1));
    assert_eq!(d.try_pop_left(), Some(2));
}

#[test]
fn concrete_scenario_two() {
    let d = Deque::new();
    d.push_right(1);
    d.push_right(2);
    d.push_right(3);
    assert_eq!(d.try_pop_right(), Some(3));
    assert_eq!(d.try_pop_left(), Some(1));
    assert_eq!(d.try_pop_right(), Some(2));
    assert_eq!(d.try_pop_right(), None);
}

#[test]
fn concrete_scenario_three() {
    let d = Deque::new();
    d.push_left(1);
    d.push_right(2);
    d.push_left(3);
    assert_eq!(d.try_pop_right(), Some(2));
    assert_eq!(d.try_pop_right(), Some(1));
    assert_eq!(d.try_pop_right(), Some(3));
    assert_eq!(d.try_pop_right(), None);
}
