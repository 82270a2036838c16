use log::trace;
use std::{
    any::Any,
    cmp::Ordering,
    fmt::{ Debug, Display },
    hash::{ Hash, Hasher },
    marker::PhantomData,
    mem::ManuallyDrop,
    ops::Deref,
    ptr::{ self, NonNull }
};
use crate::error::PtrError;

/// Reference counting implemented by the pointee itself. [`AutoPtr`] never looks at the count, it
/// only calls these methods.
///
/// # Safety
/// - A newly created value must already account for the one reference handed to its first owner.
/// - `duplicate` adds a reference. `release` removes one and reports whether it was the last, but
///   never frees anything itself.
/// - The function returned by `destroyer` frees a value of the implementing type, given its
///   address. The value must live in its own allocation that this function knows how to free.
/// - If `Self: Sync`, `duplicate` and `release` must be safe to call concurrently from several
///   threads.
pub unsafe trait RefCounted {
    fn duplicate(&self);
    /// Remove one reference. Returns true when none are left, and the caller must then free the
    /// value with the function from [`destroyer`](Self::destroyer).
    ///
    /// # Safety
    /// The caller gives up one reference it holds.
    unsafe fn release(&self) -> bool;
    /// Frees the value behind the given address once the last reference is gone. Handles fetch
    /// it before calling `release`, because another handle may free the value as soon as the
    /// count drops.
    fn destroyer(&self) -> unsafe fn(NonNull<()>);
}

/// Gives checked casts access to the concrete type behind a (possibly `dyn`) pointee. Every
/// `'static` type gets it for free; add it as a supertrait to make trait objects castable.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any { self }
}

/// Handle holding one reference to an intrusively counted value, or nothing.
pub struct AutoPtr<T>
where T: ?Sized + RefCounted
{
    ptr: Option<NonNull<T>>,
    _data: PhantomData<T>
}

impl<T> AutoPtr<T>
where T: ?Sized + RefCounted
{
    pub const fn null() -> Self { Self { ptr: None, _data: PhantomData } }

    /// Take over the reference `ptr` already carries, without calling `duplicate`. A null
    /// pointer gives a null handle.
    ///
    /// # Safety
    /// `ptr` must be null or point to a live value whose count includes the adopted reference.
    pub unsafe fn from_raw(ptr: *mut T) -> Self {
        Self { ptr: NonNull::new(ptr), _data: PhantomData }
    }

    /// Wrap `ptr`, adding a reference of its own first when `shared` is set.
    ///
    /// # Safety
    /// Same as [`from_raw`](Self::from_raw). When `shared` is false the caller hands over a
    /// reference it owns.
    pub unsafe fn from_raw_shared(ptr: *mut T, shared: bool) -> Self {
        let out = Self::from_raw(ptr);
        if shared { out.duplicate_inner(); }
        out
    }

    fn duplicate_inner(&self) {
        if let Some(v) = self.get() { v.duplicate() }
    }

    pub fn get(&self) -> Option<&T> { self.ptr.map(|p| unsafe { &*p.as_ptr() }) }
    pub fn try_get(&self) -> Result<&T, PtrError> { self.get().ok_or(PtrError::Null) }
    pub fn as_ptr(&self) -> Option<NonNull<T>> { self.ptr }
    pub fn is_null(&self) -> bool { self.ptr.is_none() }

    /// Address of the pointee without metadata, null for a null handle. Only useful for
    /// identity comparisons.
    pub fn addr(&self) -> *const () {
        match self.ptr {
            Some(p) => p.cast::<()>().as_ptr(),
            None => ptr::null()
        }
    }

    /// Add a reference and hand it out as a raw pointer. The caller now owns that reference.
    pub fn share_raw(&self) -> Option<NonNull<T>> {
        self.duplicate_inner();
        self.ptr
    }

    /// Give up the handle without releasing its reference.
    pub fn into_raw(this: Self) -> Option<NonNull<T>> {
        let this = ManuallyDrop::new(this);
        this.ptr
    }

    pub fn take(&mut self) -> Self { std::mem::take(self) }
    pub fn swap(&mut self, other: &mut Self) { std::mem::swap(&mut self.ptr, &mut other.ptr) }

    /// Release the held reference, leaving the handle null.
    pub fn reset(&mut self) {
        if let Some(p) = self.ptr.take() {
            // the borrow has to end before the value is freed through the handle's own pointer
            let destroy = unsafe {
                let value = p.as_ref();
                let destroy = value.destroyer();
                value.release().then_some(destroy)
            };
            if let Some(destroy) = destroy {
                unsafe { destroy(p.cast()) }
            }
        }
    }

    /// Replace the pointee with `ptr`. Nothing happens when `ptr` is already held. Otherwise the
    /// old reference is released and `ptr` is adopted, duplicated first if `shared` is set.
    ///
    /// # Safety
    /// Same as [`from_raw_shared`](Self::from_raw_shared).
    pub unsafe fn reset_raw(&mut self, ptr: *mut T, shared: bool) {
        if self.addr() == ptr.cast::<()>().cast_const() { return; }
        self.reset();
        self.ptr = NonNull::new(ptr);
        if shared { self.duplicate_inner(); }
    }

    /// Create a handle to the same object seen as a related type, e.g. a trait object it
    /// implements.
    ///
    /// # Safety
    /// `cast` must return a pointer to the same object (not a part of it), and `U`'s counting
    /// must be the same count as `T`'s.
    pub unsafe fn convert<U, F>(&self, cast: F) -> AutoPtr<U>
    where U: ?Sized + RefCounted,
          F: FnOnce(NonNull<T>) -> NonNull<U>
    {
        match self.ptr {
            Some(p) => AutoPtr::from_raw_shared(cast(p).as_ptr(), true),
            None => AutoPtr::null()
        }
    }

    /// Assign a handle of a related type, with the same discipline as [`Clone::clone_from`].
    ///
    /// # Safety
    /// See [`convert`](Self::convert).
    pub unsafe fn assign_from<U, F>(&mut self, other: &AutoPtr<U>, cast: F)
    where U: ?Sized + RefCounted,
          F: FnOnce(NonNull<U>) -> NonNull<T>
    {
        if self.addr() == other.addr() { return; }
        self.reset();
        if let Some(p) = other.ptr {
            self.ptr = Some(cast(p));
            self.duplicate_inner();
        }
    }

    /// Checked cast to the concrete type `U`. Gives a null handle if the pointee is something
    /// else, otherwise a new handle sharing the pointee.
    ///
    /// `U` has to be the pointee's exact sized type, since the check goes through [`Any`]. Casting
    /// sideways to another trait object the pointee implements is not possible here; cast to the
    /// concrete type first and then [`convert`](Self::convert).
    pub fn dycast<U>(&self) -> AutoPtr<U>
    where T: AsAny,
          U: RefCounted + Any
    {
        match self.ptr.filter(|p| unsafe { p.as_ref() }.as_any().is::<U>()) {
            Some(p) => unsafe { AutoPtr::from_raw_shared(p.cast::<U>().as_ptr(), true) },
            None => {
                if !self.is_null() {
                    trace!("dycast to {} failed", std::any::type_name::<U>());
                }
                AutoPtr::null()
            }
        }
    }

    /// Unchecked cast to `U`, sharing the pointee.
    ///
    /// # Safety
    /// The pointee must really be a `U` at the same address.
    pub unsafe fn scast<U>(&self) -> AutoPtr<U>
    where U: RefCounted
    {
        match self.ptr {
            Some(p) => AutoPtr::from_raw_shared(p.cast::<U>().as_ptr(), true),
            None => AutoPtr::null()
        }
    }
}

impl<T> Default for AutoPtr<T>
where T: ?Sized + RefCounted
{
    fn default() -> Self { Self::null() }
}

impl<T> Clone for AutoPtr<T>
where T: ?Sized + RefCounted
{
    fn clone(&self) -> Self {
        self.duplicate_inner();
        Self { ptr: self.ptr, _data: PhantomData }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.addr() == source.addr() { return; }
        self.reset();
        source.duplicate_inner();
        self.ptr = source.ptr;
    }
}

impl<T> Drop for AutoPtr<T>
where T: ?Sized + RefCounted
{
    fn drop(&mut self) { self.reset() }
}

impl<T> Deref for AutoPtr<T>
where T: ?Sized + RefCounted
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        match self.get() {
            Some(v) => v,
            None => panic!("dereferenced a null AutoPtr<{}>", std::any::type_name::<T>())
        }
    }
}

impl<T, U> PartialEq<AutoPtr<U>> for AutoPtr<T>
where T: ?Sized + RefCounted,
      U: ?Sized + RefCounted
{
    fn eq(&self, other: &AutoPtr<U>) -> bool { self.addr() == other.addr() }
}

impl<T> Eq for AutoPtr<T> where T: ?Sized + RefCounted {}

impl<T> PartialOrd for AutoPtr<T>
where T: ?Sized + RefCounted
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl<T> Ord for AutoPtr<T>
where T: ?Sized + RefCounted
{
    fn cmp(&self, other: &Self) -> Ordering { self.addr().cmp(&other.addr()) }
}

impl<T> Hash for AutoPtr<T>
where T: ?Sized + RefCounted
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.addr().hash(state) }
}

impl<T> Debug for AutoPtr<T>
where T: ?Sized + RefCounted + Debug
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(v) => write!(f, "AutoPtr {{ data: {:?} }}", v),
            None => write!(f, "AutoPtr {{ null }}")
        }
    }
}

impl<T> Display for AutoPtr<T>
where T: ?Sized + RefCounted + Display
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "null")
        }
    }
}

// counting is the pointee's job, so sharing across threads is fine when the pointee is
unsafe impl<T> Send for AutoPtr<T> where T: ?Sized + RefCounted + Send + Sync {}
unsafe impl<T> Sync for AutoPtr<T> where T: ?Sized + RefCounted + Send + Sync {}
