//! Anchor-based lock-free concurrent double-ended queue.
//!
//! The anchor names the leftmost and rightmost node of a doubly-linked chain plus a status tag
//! recording whether a push is mid-flight. Every operation is a CAS-retry loop against the
//! anchor; any thread that observes a mid-flight push helps finish it (stabilization) before
//! making its own progress. See the crate-level documentation for the full contract.

use core::mem;
use core::sync::atomic::Ordering;

use crossbeam_epoch::{self as epoch, unprotected, Atomic, Guard, Owned, Shared};
use crossbeam_utils::CachePadded;

/// Status tag carried by an [`Anchor`], recording whether a push at one end has been published
/// but not yet stabilized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Both ends are internally consistent; the chain can be traversed end to end.
    Stable,
    /// A `push_left` published its node; the old leftmost node's outward link may be stale.
    LPush,
    /// A `push_right` published its node; the old rightmost node's outward link may be stale.
    RPush,
}

/// The single atomic witness of deque shape: the two end pointers and the in-flight status.
///
/// A fresh `Anchor` is allocated for every state transition and never mutated in place; CAS on
/// the deque's anchor pointer compares by identity, not by field equality, which is what lets
/// the stabilizer tell "nothing else has happened since I observed `A`" from a single load.
#[derive(Debug)]
struct Anchor<T> {
    left: Atomic<Node<T>>,
    right: Atomic<Node<T>>,
    status: Status,
}

impl<T> Anchor<T> {
    fn empty() -> Self {
        Anchor {
            left: Atomic::null(),
            right: Atomic::null(),
            status: Status::Stable,
        }
    }
}

/// A single element of the chain.
///
/// `value` is initialized for the entire time the node is reachable from the anchor (this deque
/// has no sentinel) and is read out exactly once, at the moment a pop wins ownership of it.
/// `left` and `right` are mutated by CAS once the node is public, and may only be plain-stored
/// by the thread that is still constructing the node, before the publishing anchor CAS.
struct Node<T> {
    value: mem::MaybeUninit<T>,
    left: Atomic<Node<T>>,
    right: Atomic<Node<T>>,
}

impl<T> core::fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // `value` may or may not be live depending on detachment state; never read it here.
        f.debug_struct("Node")
            .field("left", &self.left)
            .field("right", &self.right)
            .finish_non_exhaustive()
    }
}

impl<T> Node<T> {
    fn new(value: T) -> Owned<Self> {
        Owned::new(Node {
            value: mem::MaybeUninit::new(value),
            left: Atomic::null(),
            right: Atomic::null(),
        })
    }
}

/// A lock-free concurrent double-ended queue.
///
/// Supports [`push_left`](Deque::push_left), [`push_right`](Deque::push_right),
/// [`try_pop_left`](Deque::try_pop_left), [`try_pop_right`](Deque::try_pop_right), and
/// [`is_empty`](Deque::is_empty) from any number of threads, none of which block. There is no
/// FIFO ordering guarantee between the two ends, and `is_empty` is a racy snapshot.
#[derive(Debug)]
pub struct Deque<T> {
    anchor: CachePadded<Atomic<Anchor<T>>>,
}

// The value of type `T` stored in a node is handed off between threads (a push on one thread,
// a pop on another), never accessed concurrently, so `Send` alone is sufficient; no access is
// ever shared without exclusive transfer, so no `Sync` bound on `T` is required.
unsafe impl<T: Send> Send for Deque<T> {}
unsafe impl<T: Send> Sync for Deque<T> {}

impl<T> Default for Deque<T> {
    fn default() -> Self {
        // SAFETY: we are creating a new deque, hence have sole ownership of it.
        let anchor = Owned::new(Anchor::empty()).into_shared(unsafe { unprotected() });
        Deque {
            anchor: CachePadded::new(Atomic::from(anchor)),
        }
    }
}

impl<T> Deque<T> {
    /// Creates a new, empty deque.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value` to the left end. Never blocks and never fails.
    pub fn push_left(&self, value: T) {
        let guard = &epoch::pin();
        let new_node = Node::new(value).into_shared(guard);

        loop {
            let anchor = self.anchor.load(Ordering::Acquire, guard);
            let anchor_ref = unsafe { anchor.deref() };
            let left = anchor_ref.left.load(Ordering::Acquire, guard);

            if left.is_null() {
                // Empty deque: the new node becomes both ends, no stabilization needed.
                let new_anchor = Owned::new(Anchor {
                    left: Atomic::from(new_node),
                    right: Atomic::from(new_node),
                    status: anchor_ref.status,
                });
                match self.anchor.compare_exchange(
                    anchor,
                    new_anchor,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                    guard,
                ) {
                    Ok(_) => {
                        unsafe { guard.defer_destroy(anchor) };
                        return;
                    }
                    Err(_) => continue,
                }
            }

            if anchor_ref.status != Status::Stable {
                self.stabilize(anchor, guard);
                continue;
            }

            // `new_node` is not yet public, so a plain store is safe here.
            unsafe { new_node.deref() }
                .right
                .store(left, Ordering::Relaxed);
            let new_anchor = Owned::new(Anchor {
                left: Atomic::from(new_node),
                right: Atomic::from(anchor_ref.right.load(Ordering::Acquire, guard)),
                status: Status::LPush,
            });
            match self.anchor.compare_exchange(
                anchor,
                new_anchor,
                Ordering::AcqRel,
                Ordering::Relaxed,
                guard,
            ) {
                Ok(new_anchor) => {
                    unsafe { guard.defer_destroy(anchor) };
                    self.stabilize_left(new_anchor, guard);
                    return;
                }
                Err(_) => continue,
            }
        }
    }

    /// Appends `value` to the right end. Never blocks and never fails.
    pub fn push_right(&self, value: T) {
        let guard = &epoch::pin();
        let new_node = Node::new(value).into_shared(guard);

        loop {
            let anchor = self.anchor.load(Ordering::Acquire, guard);
            let anchor_ref = unsafe { anchor.deref() };
            let right = anchor_ref.right.load(Ordering::Acquire, guard);

            if right.is_null() {
                let new_anchor = Owned::new(Anchor {
                    left: Atomic::from(new_node),
                    right: Atomic::from(new_node),
                    status: anchor_ref.status,
                });
                match self.anchor.compare_exchange(
                    anchor,
                    new_anchor,
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                    guard,
                ) {
                    Ok(_) => {
                        unsafe { guard.defer_destroy(anchor) };
                        return;
                    }
                    Err(_) => continue,
                }
            }

            if anchor_ref.status != Status::Stable {
                self.stabilize(anchor, guard);
                continue;
            }

            unsafe { new_node.deref() }
                .left
                .store(right, Ordering::Relaxed);
            let new_anchor = Owned::new(Anchor {
                left: Atomic::from(anchor_ref.left.load(Ordering::Acquire, guard)),
                right: Atomic::from(new_node),
                status: Status::RPush,
            });
            match self.anchor.compare_exchange(
                anchor,
                new_anchor,
                Ordering::AcqRel,
                Ordering::Relaxed,
                guard,
            ) {
                Ok(new_anchor) => {
                    unsafe { guard.defer_destroy(anchor) };
                    self.stabilize_right(new_anchor, guard);
                    return;
                }
                Err(_) => continue,
            }
        }
    }

    /// Removes and returns the leftmost value, or `None` if the deque was observed empty.
    pub fn try_pop_left(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let anchor = self.anchor.load(Ordering::Acquire, guard);
            let anchor_ref = unsafe { anchor.deref() };
            let left = anchor_ref.left.load(Ordering::Acquire, guard);

            if left.is_null() {
                return None;
            }

            if anchor_ref.status != Status::Stable {
                self.stabilize(anchor, guard);
                continue;
            }

            let right = anchor_ref.right.load(Ordering::Acquire, guard);
            let left_ref = unsafe { left.deref() };

            let new_anchor = if left == right {
                Owned::new(Anchor::empty())
            } else {
                let next = left_ref.right.load(Ordering::Acquire, guard);
                Owned::new(Anchor {
                    left: Atomic::from(next),
                    right: Atomic::from(right),
                    status: Status::Stable,
                })
            };

            match self.anchor.compare_exchange(
                anchor,
                new_anchor,
                Ordering::AcqRel,
                Ordering::Relaxed,
                guard,
            ) {
                Ok(_) => {
                    // SAFETY: `left` is now unreachable from the anchor; no other thread can
                    // observe it, so reading its value out and retiring it is exclusive to us.
                    let value = unsafe { left_ref.value.assume_init_read() };
                    unsafe {
                        guard.defer_destroy(anchor);
                        guard.defer_destroy(left);
                    }
                    return Some(value);
                }
                Err(_) => continue,
            }
        }
    }

    /// Removes and returns the rightmost value, or `None` if the deque was observed empty.
    pub fn try_pop_right(&self) -> Option<T> {
        let guard = &epoch::pin();
        loop {
            let anchor = self.anchor.load(Ordering::Acquire, guard);
            let anchor_ref = unsafe { anchor.deref() };
            let right = anchor_ref.right.load(Ordering::Acquire, guard);

            if right.is_null() {
                return None;
            }

            if anchor_ref.status != Status::Stable {
                self.stabilize(anchor, guard);
                continue;
            }

            let left = anchor_ref.left.load(Ordering::Acquire, guard);
            let right_ref = unsafe { right.deref() };

            let new_anchor = if left == right {
                Owned::new(Anchor::empty())
            } else {
                let prev = right_ref.left.load(Ordering::Acquire, guard);
                Owned::new(Anchor {
                    left: Atomic::from(left),
                    right: Atomic::from(prev),
                    status: Status::Stable,
                })
            };

            match self.anchor.compare_exchange(
                anchor,
                new_anchor,
                Ordering::AcqRel,
                Ordering::Relaxed,
                guard,
            ) {
                Ok(_) => {
                    let value = unsafe { right_ref.value.assume_init_read() };
                    unsafe {
                        guard.defer_destroy(anchor);
                        guard.defer_destroy(right);
                    }
                    return Some(value);
                }
                Err(_) => continue,
            }
        }
    }

    /// Best-effort, racy snapshot of emptiness.
    ///
    /// Tests `left` only; invariant (1) in the deque's data model makes this equivalent to
    /// testing `right`, and the property test suite cross-checks that symmetry directly.
    pub fn is_empty(&self) -> bool {
        let guard = &epoch::pin();
        let anchor = self.anchor.load(Ordering::Acquire, guard);
        unsafe { anchor.deref() }
            .left
            .load(Ordering::Acquire, guard)
            .is_null()
    }

    /// Helps complete whatever push is in flight on `anchor`, if any.
    fn stabilize<'g>(&self, anchor: Shared<'g, Anchor<T>>, guard: &'g Guard) {
        let anchor_ref = unsafe { anchor.deref() };
        match anchor_ref.status {
            Status::RPush => self.stabilize_right(anchor, guard),
            Status::LPush => self.stabilize_left(anchor, guard),
            Status::Stable => {}
        }
    }

    /// Repairs the stale forward link left behind by a `push_right` and retires `anchor` into
    /// `Stable`. A single pass; safe to call redundantly since every CAS here is benign on
    /// failure (it only means another thread already made the same progress).
    fn stabilize_right<'g>(&self, anchor: Shared<'g, Anchor<T>>, guard: &'g Guard) {
        if self.anchor.load(Ordering::Acquire, guard) != anchor {
            return;
        }
        let anchor_ref = unsafe { anchor.deref() };
        let n = anchor_ref.right.load(Ordering::Acquire, guard);
        let n_ref = unsafe { n.deref() };
        let p = n_ref.left.load(Ordering::Acquire, guard);
        let p_ref = unsafe { p.deref() };
        let p_next = p_ref.right.load(Ordering::Acquire, guard);

        if p_next != n {
            if self.anchor.load(Ordering::Acquire, guard) != anchor {
                return;
            }
            let _ = p_ref.right.compare_exchange(
                p_next,
                n,
                Ordering::AcqRel,
                Ordering::Relaxed,
                guard,
            );
        }

        let new_anchor = Owned::new(Anchor {
            left: Atomic::from(anchor_ref.left.load(Ordering::Acquire, guard)),
            right: Atomic::from(n),
            status: Status::Stable,
        });
        if self
            .anchor
            .compare_exchange(anchor, new_anchor, Ordering::AcqRel, Ordering::Relaxed, guard)
            .is_ok()
        {
            unsafe { guard.defer_destroy(anchor) };
        }
    }

    /// Mirror of [`stabilize_right`](Deque::stabilize_right).
    fn stabilize_left<'g>(&self, anchor: Shared<'g, Anchor<T>>, guard: &'g Guard) {
        if self.anchor.load(Ordering::Acquire, guard) != anchor {
            return;
        }
        let anchor_ref = unsafe { anchor.deref() };
        let n = anchor_ref.left.load(Ordering::Acquire, guard);
        let n_ref = unsafe { n.deref() };
        let p = n_ref.right.load(Ordering::Acquire, guard);
        let p_ref = unsafe { p.deref() };
        let p_next = p_ref.left.load(Ordering::Acquire, guard);

        if p_next != n {
            if self.anchor.load(Ordering::Acquire, guard) != anchor {
                return;
            }
            let _ = p_ref.left.compare_exchange(
                p_next,
                n,
                Ordering::AcqRel,
                Ordering::Relaxed,
                guard,
            );
        }

        let new_anchor = Owned::new(Anchor {
            left: Atomic::from(n),
            right: Atomic::from(anchor_ref.right.load(Ordering::Acquire, guard)),
            status: Status::Stable,
        });
        if self
            .anchor
            .compare_exchange(anchor, new_anchor, Ordering::AcqRel, Ordering::Relaxed, guard)
            .is_ok()
        {
            unsafe { guard.defer_destroy(anchor) };
        }
    }
}

impl<T> Drop for Deque<T> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` means no other thread can be observing this deque.
        let anchor = mem::take(&mut *self.anchor);
        let anchor = unsafe { anchor.into_owned() }.into_box();
        let mut cursor = anchor.left;

        // SAFETY: every node reachable from `anchor.left` via `right` links was owned
        // exclusively by this deque, and holds an initialized value.
        while let Some(node) = unsafe { cursor.try_into_owned() } {
            let node = node.into_box();
            drop(unsafe { node.value.assume_init() });
            cursor = node.right;
        }
    }
}
