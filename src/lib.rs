pub mod error;
pub mod intrusive {
    pub mod auto_ptr;
    pub mod counted;
}
pub mod linked {
    pub(crate) mod links;
    pub mod linked_ptr;
}

pub use error::PtrError;
pub use intrusive::{
    auto_ptr::{ AsAny, AutoPtr, RefCounted },
    counted::{ make_auto, make_auto_atomic, make_auto_in, AtomicCount, Counted, Counter, LocalCount }
};
pub use linked::linked_ptr::{ make_linked, make_linked_in, LinkedPtr };
