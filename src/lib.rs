pub mod error;
pub mod gc;
pub mod mem;
pub mod object;
pub mod runtime;
pub mod timer;
pub mod version;

#[cfg(test)]
mod mock;

pub use error::GcError;
pub use gc::handle::GcHandle;
pub use gc::{Address, Flags, Gc};
pub use object::Object;
pub use runtime::{
    LivenessState, ReallocateCallback, RegisterObjectsCallback, Runtime, TypeToken, WorldCallback,
};
pub use version::{RuntimeVersion, LIVENESS_ALLOCATION_API};
