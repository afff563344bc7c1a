//! A lock-free concurrent double-ended queue.
//!
//! [`Deque`] supports pushing and popping at both ends from any number of concurrent threads
//! with no mutual-exclusion primitive on the hot path. Correctness rests on a single atomic
//! word, the *anchor*, that publishes both end pointers and a short-lived status flag marking
//! an in-progress push. All progress is achieved through compare-and-swap; any thread that
//! observes a push that has not yet finished its second phase helps complete it before making
//! its own progress, which is what makes the whole structure lock-free rather than merely
//! obstruction-free.
//!
//! See [`Deque`] for the operations and their contracts.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]

mod deque;

pub use deque::Deque;
