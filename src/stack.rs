//! Stack growth for the recursive parser and evaluator.
//!
//! Loop nesting is unbounded, and the parser, the evaluator and the tree's
//! clone, equality and display impls recurse once per nesting level.
//! Wrapping each level in [`ensure_sufficient_stack`] lets deeply nested
//! programs grow the stack on demand instead of aborting.

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
