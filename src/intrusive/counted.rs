use allocator_api2::{
    alloc::{ Allocator, Global },
    boxed::Box
};
use log::trace;
use std::{
    cell::Cell,
    fmt::{ Debug, Display },
    ops::Deref,
    ptr::NonNull,
    sync::atomic::{ AtomicUsize, Ordering }
};
use crate::intrusive::auto_ptr::{ AutoPtr, RefCounted };

/// Counting strategy for a [`Counted`] control block. A fresh counter starts at one, which stands
/// for the reference held by the handle that created the block.
pub trait Counter {
    fn one() -> Self;
    fn increment(&self);
    /// Returns true when the count reached zero.
    fn decrement(&self) -> bool;
    fn get(&self) -> usize;
}

/// Plain counter for values that never leave their thread.
pub struct LocalCount(Cell<usize>);

impl Counter for LocalCount {
    fn one() -> Self { Self(Cell::new(1)) }
    fn increment(&self) { self.0.set(self.0.get() + 1) }
    fn decrement(&self) -> bool {
        let new = self.0.get() - 1;
        self.0.set(new);
        new == 0
    }
    fn get(&self) -> usize { self.0.get() }
}

/// Atomic counter, so handles to the same block can be cloned and dropped from different threads.
pub struct AtomicCount(AtomicUsize);

impl Counter for AtomicCount {
    fn one() -> Self { Self(AtomicUsize::new(1)) }
    fn increment(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
    fn decrement(&self) -> bool { self.0.fetch_sub(1, Ordering::SeqCst) == 1 }
    fn get(&self) -> usize { self.0.load(Ordering::SeqCst) }
}

/// Control block that makes any `T` usable behind an [`AutoPtr`]. The count, the allocator that
/// owns the block and the value share one allocation, and the block frees itself when the last
/// reference is released.
///
/// Blocks are only ever created by [`Counted::new_in`] and friends, which hand out the first
/// reference as an [`AutoPtr`].
pub struct Counted<T, C = LocalCount, A = Global>
where C: Counter,
      A: Allocator + Clone
{
    count: C,
    _allocator: A,
    value: T
}

impl<T> Counted<T, LocalCount, Global> {
    pub fn new(value: T) -> AutoPtr<Self> { Self::new_in(value, Global) }
}

impl<T> Counted<T, AtomicCount, Global> {
    pub fn new_atomic(value: T) -> AutoPtr<Self> { Self::new_in(value, Global) }
}

impl<T, C, A> Counted<T, C, A>
where C: Counter,
      A: Allocator + Clone
{
    pub fn new_in(value: T, alloc: A) -> AutoPtr<Self> {
        let block = Box::new_in(Self { count: C::one(), _allocator: alloc.clone(), value }, alloc);
        let (raw, _) = Box::into_raw_with_allocator(block);
        // the count already holds the reference we hand out
        unsafe { AutoPtr::from_raw(raw) }
    }

    pub fn use_count(&self) -> usize { self.count.get() }
    pub fn value(&self) -> &T { &self.value }
}

unsafe impl<T, C, A> RefCounted for Counted<T, C, A>
where C: Counter,
      A: Allocator + Clone
{
    fn duplicate(&self) { self.count.increment() }

    unsafe fn release(&self) -> bool { self.count.decrement() }

    fn destroyer(&self) -> unsafe fn(NonNull<()>) { destroy_counted::<T, C, A> }
}

unsafe fn destroy_counted<T, C, A>(block: NonNull<()>)
where C: Counter,
      A: Allocator + Clone
{
    trace!("destroying counted {}", std::any::type_name::<T>());
    let block = block.cast::<Counted<T, C, A>>();
    let alloc = (*block.as_ptr())._allocator.clone();
    drop(Box::from_raw_in(block.as_ptr(), alloc));
}

impl<T, C, A> Deref for Counted<T, C, A>
where C: Counter,
      A: Allocator + Clone
{
    type Target = T;
    fn deref(&self) -> &Self::Target { &self.value }
}

impl<T, C, A> Debug for Counted<T, C, A>
where T: Debug,
      C: Counter,
      A: Allocator + Clone
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Counted {{ data: {:?}, uses: {} }}", &self.value, self.use_count())
    }
}

impl<T, C, A> Display for Counted<T, C, A>
where T: Display,
      C: Counter,
      A: Allocator + Clone
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.value)
    }
}

/// Allocate `value` in a single-threaded control block and return its first handle.
pub fn make_auto<T>(value: T) -> AutoPtr<Counted<T>> { Counted::new(value) }

/// Like [`make_auto`], with an atomic count so the handle can cross threads.
pub fn make_auto_atomic<T>(value: T) -> AutoPtr<Counted<T, AtomicCount>> { Counted::new_atomic(value) }

pub fn make_auto_in<T, A>(value: T, alloc: A) -> AutoPtr<Counted<T, LocalCount, A>>
where A: Allocator + Clone
{
    Counted::new_in(value, alloc)
}
