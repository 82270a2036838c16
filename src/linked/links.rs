//! Circular doubly linked list of sibling nodes.
//!
//! Every node starts out as a singleton cycle (its own `prev` and `next`). Nodes of different
//! pointee types share this header, which lets handles of related types join one cycle.
use std::{
    cell::Cell,
    ptr::NonNull
};

#[repr(C)]
pub(crate) struct Links {
    prev: Cell<NonNull<Links>>,
    next: Cell<NonNull<Links>>,
    // nulls the address stored in the node that owns this header
    clear: unsafe fn(NonNull<Links>)
}

impl Links {
    /// The returned header points nowhere yet. Call [`make_single`] once it sits at its final
    /// address.
    pub(crate) fn new_unlinked(clear: unsafe fn(NonNull<Links>)) -> Self {
        Self {
            prev: Cell::new(NonNull::dangling()),
            next: Cell::new(NonNull::dangling()),
            clear
        }
    }
}

pub(crate) unsafe fn make_single(node: NonNull<Links>) {
    let links = node.as_ref();
    links.prev.set(node);
    links.next.set(node);
}

pub(crate) unsafe fn next(node: NonNull<Links>) -> NonNull<Links> { node.as_ref().next.get() }
pub(crate) unsafe fn prev(node: NonNull<Links>) -> NonNull<Links> { node.as_ref().prev.get() }

pub(crate) unsafe fn is_single(node: NonNull<Links>) -> bool { next(node) == node }

/// Number of nodes in the cycle containing `node`, `node` included.
pub(crate) unsafe fn count(node: NonNull<Links>) -> usize {
    let mut count = 1;
    let mut curr = next(node);
    while curr != node {
        count += 1;
        curr = next(curr);
    }
    count
}

/// True if `other` is a member of the cycle containing `node`.
pub(crate) unsafe fn same_cycle(node: NonNull<Links>, other: NonNull<Links>) -> bool {
    let mut curr = node;
    loop {
        if curr == other { return true; }
        curr = next(curr);
        if curr == node { return false; }
    }
}

/// Insert the singleton `node` directly after `anchor`.
pub(crate) unsafe fn splice_after(anchor: NonNull<Links>, node: NonNull<Links>) {
    debug_assert!(is_single(node), "only a singleton can be spliced into a cycle");
    let after = next(anchor);
    let links = node.as_ref();
    links.prev.set(anchor);
    links.next.set(after);
    after.as_ref().prev.set(node);
    anchor.as_ref().next.set(node);
    verify(anchor);
}

/// Bypass `node` in both directions and turn it back into a singleton.
pub(crate) unsafe fn unlink(node: NonNull<Links>) {
    let before = prev(node);
    let after = next(node);
    before.as_ref().next.set(after);
    after.as_ref().prev.set(before);
    make_single(node);
    if before != node { verify(before); }
}

/// Break up the whole cycle containing `node`: every member has its address cleared and
/// becomes a singleton.
pub(crate) unsafe fn clear_all(node: NonNull<Links>) {
    let mut curr = node;
    loop {
        let after = next(curr);
        (curr.as_ref().clear)(curr);
        make_single(curr);
        curr = after;
        if curr == node { break; }
    }
}

/// Walk the cycle containing `node` in both directions and check it closes with the same
/// length each way and that every `next` is matched by a `prev`. Gives up after `limit`
/// steps, so a broken cycle that never returns to `node` is reported rather than looping.
#[cfg_attr(not(any(test, feature = "verify-links")), allow(dead_code))]
pub(crate) unsafe fn is_consistent(node: NonNull<Links>, limit: usize) -> bool {
    let mut forward = 0;
    let mut curr = node;
    loop {
        let after = next(curr);
        if prev(after) != curr { return false; }
        forward += 1;
        curr = after;
        if curr == node { break; }
        if forward > limit { return false; }
    }
    let mut backward = 0;
    loop {
        curr = prev(curr);
        backward += 1;
        if curr == node { break; }
        if backward > limit { return false; }
    }
    forward == backward
}

#[cfg(any(test, feature = "verify-links"))]
unsafe fn verify(node: NonNull<Links>) {
    assert!(is_consistent(node, usize::MAX >> 1), "sibling cycle is corrupted");
}

#[cfg(not(any(test, feature = "verify-links")))]
unsafe fn verify(_node: NonNull<Links>) {}
