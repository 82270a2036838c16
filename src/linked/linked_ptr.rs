use allocator_api2::{
    alloc::{ Allocator, Global },
    boxed::Box
};
use log::trace;
use std::{
    alloc::{ handle_alloc_error, Layout },
    cell::Cell,
    fmt::{ Debug, Display },
    hash::{ Hash, Hasher },
    marker::PhantomData,
    mem,
    ops::Deref,
    ptr::{ self, NonNull }
};
use crate::{
    error::PtrError,
    linked::links::{ self, Links }
};

#[repr(C)]
struct LinkNode<T: ?Sized> {
    links: Links,
    value: Cell<Option<NonNull<T>>>
}

unsafe fn clear_value<T: ?Sized>(links: NonNull<Links>) {
    links.cast::<LinkNode<T>>().as_ref().value.set(None)
}

impl<T: ?Sized> LinkNode<T> {
    fn new_in<A: Allocator>(value: Option<NonNull<T>>, alloc: &A) -> NonNull<Self> {
        let layout = Layout::new::<Self>();
        let node = alloc.allocate(layout)
            .unwrap_or_else(|_| handle_alloc_error(layout))
            .cast::<Self>();
        unsafe {
            node.as_ptr().write(Self {
                links: Links::new_unlinked(clear_value::<T>),
                value: Cell::new(value)
            });
            links::make_single(node.cast());
        }
        node
    }
}

/// Shared pointer that keeps no count. Every handle owns a small node, and all handles sharing
/// a value are linked into one circular list; the value is deleted by the last handle to leave
/// the list.
///
/// This keeps sharing free of any per-value bookkeeping, at two costs that come with the
/// structure: [`count`](Self::count) walks the list, and copying or dropping a handle rewrites
/// its siblings' links. Handles are therefore neither `Send` nor `Sync`.
///
/// A handle allocates its node with its own allocator. The value is freed with the allocator
/// instance that allocated it, which handles joining a list copy from the handle they join.
pub struct LinkedPtr<T, A = Global>
where T: ?Sized,
      A: Allocator + Clone
{
    node: NonNull<LinkNode<T>>,
    _allocator: A,
    value_alloc: A,
    _data: PhantomData<T>
}

impl<T> LinkedPtr<T, Global> {
    pub fn new(value: T) -> Self { Self::new_in(value, Global) }
}

impl<T> LinkedPtr<T, Global>
where T: ?Sized
{
    pub fn null() -> Self { Self::null_in(Global) }

    /// Take ownership of `ptr` as a new, unshared value.
    ///
    /// # Safety
    /// `ptr` must be null or come from a global [`Box`] that nobody else owns.
    pub unsafe fn from_raw(ptr: *mut T) -> Self { Self::from_raw_in(ptr, Global) }
}

impl<T, A> LinkedPtr<T, A>
where A: Allocator + Clone
{
    pub fn new_in(value: T, alloc: A) -> Self { Self::from_box(Box::new_in(value, alloc)) }

    /// Drop the current value (or leave its list) and own `value` alone. The value is allocated
    /// with this handle's own allocator.
    pub fn reset_with(&mut self, value: T) {
        let (raw, _) = Box::into_raw_with_allocator(Box::new_in(value, self._allocator.clone()));
        unsafe { self.reset_raw(raw) }
    }
}

impl<T, A> LinkedPtr<T, A>
where T: ?Sized,
      A: Allocator + Clone
{
    pub fn null_in(alloc: A) -> Self {
        Self {
            node: LinkNode::new_in(None, &alloc),
            value_alloc: alloc.clone(),
            _allocator: alloc,
            _data: PhantomData
        }
    }

    pub fn from_box(value: Box<T, A>) -> Self {
        let (raw, alloc) = Box::into_raw_with_allocator(value);
        unsafe { Self::from_raw_in(raw, alloc) }
    }

    /// # Safety
    /// `ptr` must be null or be allocated by `alloc` the way [`Box`] does, with nobody else
    /// owning it.
    pub unsafe fn from_raw_in(ptr: *mut T, alloc: A) -> Self {
        Self {
            node: LinkNode::new_in(NonNull::new(ptr), &alloc),
            value_alloc: alloc.clone(),
            _allocator: alloc,
            _data: PhantomData
        }
    }

    fn links(&self) -> NonNull<Links> { self.node.cast() }
    fn value(&self) -> Option<NonNull<T>> { unsafe { self.node.as_ref().value.get() } }
    fn set_value(&self, value: Option<NonNull<T>>) { unsafe { self.node.as_ref().value.set(value) } }

    pub fn as_ptr(&self) -> Option<NonNull<T>> { self.value() }
    pub fn is_null(&self) -> bool { self.value().is_none() }

    /// Address of the value without metadata, null for a null handle.
    ///
    /// Values of a zero-sized type all sit at the same dangling address, so unrelated handles to
    /// them report the same `addr`. Comparisons and assignments tell them apart by their lists.
    pub fn addr(&self) -> *const () {
        match self.value() {
            Some(p) => p.cast::<()>().as_ptr(),
            None => ptr::null()
        }
    }

    pub fn get(&self) -> Option<&T> { self.value().map(|p| unsafe { &*p.as_ptr() }) }
    pub fn try_get(&self) -> Result<&T, PtrError> { self.get().ok_or(PtrError::Null) }

    /// Mutable access, only while this is the sole handle to the value.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match self.unique() {
            true => self.value().map(|p| unsafe { &mut *p.as_ptr() }),
            false => None
        }
    }

    pub fn try_get_mut(&mut self) -> Result<&mut T, PtrError> {
        if self.is_null() { return Err(PtrError::Null); }
        let count = self.count();
        self.get_mut().ok_or(PtrError::Shared { count })
    }

    /// True if no other handle shares this value. Null handles are always unique.
    pub fn unique(&self) -> bool { unsafe { links::is_single(self.links()) } }

    /// Number of handles sharing this value, this one included. Walks the whole list.
    pub fn count(&self) -> usize { unsafe { links::count(self.links()) } }

    fn is_zero_sized(&self) -> bool { self.get().is_some_and(|v| mem::size_of_val(v) == 0) }

    // same value as `other`: same address, and for zero-sized values also the same list
    fn shares_with<U, B>(&self, other: &LinkedPtr<U, B>) -> bool
    where U: ?Sized,
          B: Allocator + Clone
    {
        if self.addr() != other.addr() { return false; }
        match self.is_zero_sized() || other.is_zero_sized() {
            true => unsafe { links::same_cycle(self.links(), other.links()) },
            false => true
        }
    }

    // leave the list, deleting the value if we were its last owner
    fn release(&mut self) {
        let links = self.links();
        let value = self.value();
        self.set_value(None);
        unsafe {
            match links::is_single(links) {
                true => if let Some(v) = value {
                    trace!("deleting linked {}", std::any::type_name::<T>());
                    drop(Box::from_raw_in(v.as_ptr(), self.value_alloc.clone()));
                },
                false => links::unlink(links)
            }
        }
    }

    /// Give up the value, deleting it if no other handle shares it. The handle becomes null.
    pub fn reset(&mut self) { self.release() }

    /// Like [`reset`](Self::reset), then take ownership of `ptr` alone. Nothing happens when
    /// `ptr` is the current value, which for a zero-sized type is any non-null `ptr`.
    ///
    /// # Safety
    /// See [`from_raw_in`](Self::from_raw_in), with this handle's allocator.
    pub unsafe fn reset_raw(&mut self, ptr: *mut T) {
        if self.addr() == ptr.cast::<()>().cast_const() { return; }
        self.release();
        self.set_value(NonNull::new(ptr));
        self.value_alloc = self._allocator.clone();
    }

    /// Take the value away from every handle sharing it, without deleting it. All of them,
    /// this one included, end up null and unshared; the caller owns the returned pointer.
    pub fn detach(&mut self) -> Option<NonNull<T>> {
        let value = self.value();
        if value.is_some() {
            trace!("detaching linked {} from {} handles", std::any::type_name::<T>(), self.count());
        }
        unsafe { links::clear_all(self.links()) }
        value
    }

    /// Delete the value now, no matter how many handles share it. They all become null.
    ///
    /// # Safety
    /// No reference obtained through any sibling handle may still be in use.
    pub unsafe fn force_delete(&mut self) {
        if let Some(v) = self.detach() {
            trace!("force deleting linked {}", std::any::type_name::<T>());
            drop(Box::from_raw_in(v.as_ptr(), self.value_alloc.clone()));
        }
    }

    /// Get the value back out if this is its only handle.
    pub fn try_unwrap(this: Self) -> Result<Box<T, A>, Self> {
        match (this.value(), this.unique()) {
            (Some(v), true) => {
                this.set_value(None);
                Ok(unsafe { Box::from_raw_in(v.as_ptr(), this.value_alloc.clone()) })
            },
            _ => Err(this)
        }
    }

    /// New handle sharing this value as a related type, e.g. a trait object it implements.
    ///
    /// # Safety
    /// `cast` must return a pointer to the same object, and deleting it as `U` must be
    /// equivalent to deleting it as `T`.
    pub unsafe fn convert<U, F>(&self, cast: F) -> LinkedPtr<U, A>
    where U: ?Sized,
          F: FnOnce(NonNull<T>) -> NonNull<U>
    {
        let alloc = self._allocator.clone();
        let value = self.value().map(cast);
        let out = LinkedPtr {
            node: LinkNode::new_in(value, &alloc),
            _allocator: alloc,
            value_alloc: self.value_alloc.clone(),
            _data: PhantomData
        };
        if value.is_some() { links::splice_after(self.links(), out.links()); }
        out
    }

    /// Assign a handle of a related type, with the same rules as [`Clone::clone_from`].
    ///
    /// # Safety
    /// See [`convert`](Self::convert).
    pub unsafe fn assign_from<U, F>(&mut self, other: &LinkedPtr<U, A>, cast: F)
    where U: ?Sized,
          F: FnOnce(NonNull<U>) -> NonNull<T>
    {
        if self.shares_with(other) { return; }
        self.release();
        if let Some(v) = other.value() {
            self.set_value(Some(cast(v)));
            self.value_alloc = other.value_alloc.clone();
            links::splice_after(other.links(), self.links());
        }
    }
}

impl<T> Default for LinkedPtr<T, Global>
where T: ?Sized
{
    fn default() -> Self { Self::null() }
}

impl<T, A> Clone for LinkedPtr<T, A>
where T: ?Sized,
      A: Allocator + Clone
{
    fn clone(&self) -> Self {
        unsafe { self.convert(|p| p) }
    }

    fn clone_from(&mut self, source: &Self) {
        unsafe { self.assign_from(source, |p| p) }
    }
}

impl<T, A> Drop for LinkedPtr<T, A>
where T: ?Sized,
      A: Allocator + Clone
{
    fn drop(&mut self) {
        self.release();
        unsafe { self._allocator.deallocate(self.node.cast(), Layout::new::<LinkNode<T>>()) }
    }
}

impl<T, A> Deref for LinkedPtr<T, A>
where T: ?Sized,
      A: Allocator + Clone
{
    type Target = T;
    fn deref(&self) -> &Self::Target {
        match self.get() {
            Some(v) => v,
            None => panic!("dereferenced a null LinkedPtr<{}>", std::any::type_name::<T>())
        }
    }
}

impl<T, U, A, B> PartialEq<LinkedPtr<U, B>> for LinkedPtr<T, A>
where T: ?Sized,
      U: ?Sized,
      A: Allocator + Clone,
      B: Allocator + Clone
{
    fn eq(&self, other: &LinkedPtr<U, B>) -> bool { self.shares_with(other) }
}

impl<T, A> Eq for LinkedPtr<T, A>
where T: ?Sized,
      A: Allocator + Clone
{}

impl<T, A> Hash for LinkedPtr<T, A>
where T: ?Sized,
      A: Allocator + Clone
{
    fn hash<H: Hasher>(&self, state: &mut H) { self.addr().hash(state) }
}

impl<T, A> Debug for LinkedPtr<T, A>
where T: ?Sized + Debug,
      A: Allocator + Clone
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(v) => write!(f, "LinkedPtr {{ data: {:?}, count: {} }}", v, self.count()),
            None => write!(f, "LinkedPtr {{ null }}")
        }
    }
}

impl<T, A> Display for LinkedPtr<T, A>
where T: ?Sized + Display,
      A: Allocator + Clone
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get() {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "null")
        }
    }
}

/// Allocate `value` and return its first handle.
pub fn make_linked<T>(value: T) -> LinkedPtr<T> { LinkedPtr::new(value) }

pub fn make_linked_in<T, A>(value: T, alloc: A) -> LinkedPtr<T, A>
where A: Allocator + Clone
{
    LinkedPtr::new_in(value, alloc)
}

#[cfg(test)]
pub mod tests {
    use super::{ make_linked, make_linked_in, LinkedPtr };
    use crate::{
        error::PtrError,
        linked::links,
        test::{ DropCounter, Watched }
    };
    use allocator_api2::{
        alloc::{ AllocError, Allocator, Global },
        boxed::Box as AllocBox
    };
    use std::{
        alloc::Layout,
        cell::RefCell,
        collections::{ HashMap, HashSet },
        error::Error,
        ptr::NonNull,
        rc::Rc
    };
    type TestReturn = Result<(), Box<dyn Error>>;

    type AllocLog = Rc<RefCell<Vec<(usize, &'static str, usize)>>>;

    // global allocator that logs which instance allocated or freed each address
    #[derive(Clone)]
    struct Tagged {
        id: usize,
        log: AllocLog
    }

    unsafe impl Allocator for Tagged {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            let block = Global.allocate(layout)?;
            self.log.borrow_mut().push((self.id, "alloc", block.cast::<u8>().as_ptr() as usize));
            Ok(block)
        }
        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            self.log.borrow_mut().push((self.id, "free", ptr.as_ptr() as usize));
            Global.deallocate(ptr, layout)
        }
    }

    // every block is freed by the instance that allocated it
    fn check_alloc_log(log: &AllocLog) {
        let mut owners = HashMap::new();
        for (id, event, addr) in log.borrow().iter() {
            match *event {
                "alloc" => { owners.insert(*addr, *id); },
                _ => {
                    let owner = owners.remove(addr);
                    assert!(owner == Some(*id), "Block allocated by {:?} was freed by {}", owner, id);
                }
            }
        }
        assert!(owners.is_empty(), "{} blocks were never freed", owners.len());
    }

    struct Marker;

    struct Circle(f64);

    trait Shape {
        fn area(&self) -> f64;
    }
    impl Shape for Watched<Circle> {
        fn area(&self) -> f64 { 3.0 * self.value.0 * self.value.0 }
    }

    fn check_count<T: ?Sized, A: Allocator + Clone>(ptr: &LinkedPtr<T, A>, expect: usize) {
        assert!(ptr.count() == expect, "Count should be {} instead of {}", expect, ptr.count());
        assert!(ptr.unique() == (expect == 1), "unique() should be {} for count {}", expect == 1, expect);
        assert!(unsafe { links::is_consistent(ptr.links(), 1024) }, "Sibling cycle should be consistent");
    }

    fn check_drops(drops: &DropCounter, expect: usize) {
        assert!(drops.count() == expect, "Value should be dropped {} times instead of {}", expect, drops.count());
    }

    #[test]
    fn null_is_single() -> TestReturn {
        let ptr: LinkedPtr<i32> = LinkedPtr::default();
        assert!(ptr.is_null(), "Default handle should be null");
        check_count(&ptr, 1);
        let copy = ptr.clone();
        check_count(&ptr, 1);
        check_count(&copy, 1);
        assert!(copy == ptr, "Null handles should compare equal");
        assert!(ptr.try_get() == Err(PtrError::Null), "try_get should fail with Null");
        let raw = unsafe { LinkedPtr::<i32>::from_raw(std::ptr::null_mut()) };
        check_count(&raw, 1);
        assert!(raw.is_null(), "Handle from null pointer should be null");
        Ok(())
    }

    #[test]
    fn copy_then_drop_copy() -> TestReturn {
        let drops = DropCounter::new();
        let p = make_linked(drops.track(100));
        check_count(&p, 1);
        let q = p.clone();
        check_count(&p, 2);
        check_count(&q, 2);
        assert!(q.value == 100, "Copy should see 100 instead of {}", q.value);
        drop(q);
        check_count(&p, 1);
        check_drops(&drops, 0);
        drop(p);
        check_drops(&drops, 1);
        Ok(())
    }

    #[test]
    fn last_handle_deletes_once() -> TestReturn {
        let drops = DropCounter::new();
        let mut handles: Vec<_> = {
            let first = LinkedPtr::new(drops.track("Player"));
            (0..6).map(|_| first.clone()).collect()
        };
        check_count(&handles[0], 6);
        // drop from the middle, front and back of the list
        for i in [3, 0, 3, 1, 0] {
            handles.remove(i);
            check_drops(&drops, 0);
            check_count(&handles[0], handles.len());
        }
        drop(handles);
        check_drops(&drops, 1);
        Ok(())
    }

    #[test]
    fn detach_three_way() -> TestReturn {
        let drops = DropCounter::new();
        let mut p = make_linked(drops.track(7));
        let q = p.clone();
        let r = q.clone();
        let addr = p.addr();
        let raw = p.detach().ok_or("detach should return the value")?;
        for h in [&p, &q, &r] {
            assert!(h.is_null(), "Every handle should be null after detach");
            check_count(h, 1);
        }
        check_drops(&drops, 0);
        assert!(raw.as_ptr() as *const () == addr, "Detached pointer should be the original address");
        let value = unsafe { AllocBox::from_raw_in(raw.as_ptr(), Global) };
        assert!(value.value == 7, "Detached value should be intact");
        drop(value);
        check_drops(&drops, 1);
        drop((p, q, r));
        check_drops(&drops, 1);
        Ok(())
    }

    #[test]
    fn force_delete_nulls_siblings() -> TestReturn {
        let drops = DropCounter::new();
        let p = make_linked(drops.track(8));
        let mut q = p.clone();
        let r = p.clone();
        unsafe { q.force_delete(); }
        check_drops(&drops, 1);
        assert!(p.is_null() && q.is_null() && r.is_null(), "Every handle should be null");
        drop((p, q, r));
        check_drops(&drops, 1);
        Ok(())
    }

    #[test]
    fn self_assignment_is_noop() -> TestReturn {
        let drops = DropCounter::new();
        let mut p = make_linked(drops.track(9));
        let q = p.clone();
        let addr = p.addr();
        p.clone_from(&q);
        check_count(&p, 2);
        p = p.clone();
        check_count(&p, 2);
        assert!(p.addr() == addr, "Address should be unchanged");
        check_drops(&drops, 0);
        Ok(())
    }

    #[test]
    fn assign_joins_other_list() -> TestReturn {
        let drops = DropCounter::new();
        let mut a = make_linked(drops.track('a'));
        let b = make_linked(drops.track('b'));
        let c = b.clone();
        let d = b.clone();
        a.clone_from(&c);
        check_drops(&drops, 1);
        assert!(a == b, "a should now share b's value");
        check_count(&a, 4);
        // leave a shared list without deleting anything
        let mut e = d.clone();
        e.clone_from(&LinkedPtr::new(drops.track('e')));
        check_drops(&drops, 1);
        check_count(&b, 4);
        check_count(&e, 1);
        assert!(e.value == 'e', "e should hold its own value");
        Ok(())
    }

    #[test]
    fn value_freed_by_its_allocator() -> TestReturn {
        let log = AllocLog::default();
        let first = Tagged { id: 1, log: log.clone() };
        let second = Tagged { id: 2, log: log.clone() };
        let mut a = make_linked_in(0, first.clone());
        let b = make_linked_in(42, second.clone());
        a.clone_from(&b);
        assert!(*a == 42, "a should share b's value");
        drop(b);
        drop(a);
        check_alloc_log(&log);
        // every way of freeing a shared value
        let mut c = make_linked_in(1, first.clone());
        let d = make_linked_in(2, second.clone());
        unsafe { c.assign_from(&d, |p| p); }
        unsafe { c.force_delete(); }
        let mut e = make_linked_in(3, first.clone());
        let f = make_linked_in(4, second.clone());
        e.clone_from(&f);
        drop(f);
        let value = LinkedPtr::try_unwrap(e).map_err(|_| "sole handle should unwrap")?;
        assert!(*value == 4, "Unwrapped value should be 4 instead of {}", *value);
        drop(value);
        let mut g = make_linked_in(5, first);
        let h = make_linked_in(6, second);
        g.clone_from(&h);
        g.reset_with(7);
        drop((c, d, g, h));
        check_alloc_log(&log);
        Ok(())
    }

    #[test]
    fn zero_sized_values_stay_apart() -> TestReturn {
        let mut a = make_linked(Marker);
        let b = make_linked(Marker);
        let c = b.clone();
        assert!(a.addr() == b.addr(), "Zero-sized values share their address");
        assert!(a != b, "Unrelated zero-sized values should differ");
        assert!(b == c, "Clones should be equal");
        a.clone_from(&b);
        check_count(&a, 3);
        assert!(a == b, "a should now share b's value");
        a.clone_from(&c);
        check_count(&a, 3);
        Ok(())
    }

    #[test]
    fn reset_variants() -> TestReturn {
        let drops = DropCounter::new();
        let mut p = make_linked(drops.track(1));
        let mut q = p.clone();
        q.reset();
        assert!(q.is_null(), "Reset handle should be null");
        check_count(&q, 1);
        check_count(&p, 1);
        check_drops(&drops, 0);
        p.reset_with(drops.track(2));
        check_drops(&drops, 1);
        assert!(p.value == 2, "p should hold the new value");
        let raw = p.as_ptr().ok_or("p should be set")?.as_ptr();
        unsafe { p.reset_raw(raw); }
        check_drops(&drops, 1);
        p.reset();
        check_drops(&drops, 2);
        Ok(())
    }

    #[test]
    fn move_out_leaves_null() -> TestReturn {
        let drops = DropCounter::new();
        let mut p = make_linked(drops.track(3));
        let q = p.clone();
        let moved = std::mem::take(&mut p);
        assert!(p.is_null(), "Moved-from handle should be null");
        check_count(&p, 1);
        check_count(&moved, 2);
        assert!(moved == q, "Moved handle should keep sharing with q");
        drop(p);
        check_drops(&drops, 0);
        Ok(())
    }

    #[test]
    fn convert_to_trait_object() -> TestReturn {
        let drops = DropCounter::new();
        let circle = make_linked(drops.track(Circle(2.0)));
        let shape: LinkedPtr<dyn Shape> = unsafe { circle.convert(|p| p as NonNull<dyn Shape>) };
        check_count(&circle, 2);
        check_count(&shape, 2);
        assert!(shape == circle, "Both handles should share the circle");
        assert!(shape.area() == 12.0, "Area should be 12 instead of {}", shape.area());
        drop(circle);
        check_count(&shape, 1);
        check_drops(&drops, 0);
        drop(shape);
        check_drops(&drops, 1);
        Ok(())
    }

    #[test]
    fn converting_assign_and_detach_across_types() -> TestReturn {
        let drops = DropCounter::new();
        let circle = make_linked(drops.track(Circle(1.0)));
        let mut shape: LinkedPtr<dyn Shape> = LinkedPtr::null();
        unsafe { shape.assign_from(&circle, |p| p as NonNull<dyn Shape>); }
        check_count(&shape, 2);
        let raw = shape.detach().ok_or("detach should return the value")?;
        assert!(circle.is_null(), "Sibling of another type should be nulled too");
        drop(unsafe { AllocBox::from_raw_in(raw.as_ptr(), Global) });
        check_drops(&drops, 1);
        Ok(())
    }

    #[test]
    fn unique_access() -> TestReturn {
        let mut p = make_linked_in(vec![1, 2], Global);
        p.get_mut().ok_or("sole handle should get mutable access")?.push(3);
        let q = p.clone();
        assert!(p.get_mut().is_none(), "Shared handle shouldn't get mutable access");
        assert!(p.try_get_mut().err() == Some(PtrError::Shared { count: 2 }), "try_get_mut should report 2 handles");
        let p = match LinkedPtr::try_unwrap(p) {
            Ok(_) => return Err("shared value shouldn't unwrap".into()),
            Err(p) => p
        };
        drop(q);
        let value = LinkedPtr::try_unwrap(p).map_err(|_| "sole handle should unwrap")?;
        assert!(*value == vec![1, 2, 3], "Unwrapped value should be [1, 2, 3]");
        Ok(())
    }

    #[test]
    fn equality_and_hash() -> TestReturn {
        let a = make_linked(5);
        let b = a.clone();
        let c = make_linked(5);
        assert!(a == b, "Clones should be equal");
        assert!(a != c, "Equal contents at different addresses should differ");
        let set: HashSet<_> = [a.clone(), b.clone(), c.clone()].into_iter().collect();
        assert!(set.len() == 2, "Set should hold 2 addresses instead of {}", set.len());
        assert!(format!("{}", a) == "5", "Display should show the value");
        assert!(format!("{:?}", a).contains("count: 3"), "Debug should show the count");
        Ok(())
    }
}
