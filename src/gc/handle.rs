use std::sync::Arc;

use crate::object::Object;
use crate::runtime::Runtime;

/// Weak reference slot issued by the runtime. Holding one does not keep the
/// referent alive; creation happens outside this crate, this type only
/// resolves and releases the slot.
pub struct GcHandle {
    runtime: Arc<dyn Runtime>,
    handle: u32,
}

impl GcHandle {
    pub fn new(runtime: Arc<dyn Runtime>, handle: u32) -> GcHandle {
        GcHandle { runtime, handle }
    }

    pub fn raw(&self) -> u32 {
        self.handle
    }

    /// Resolves the handle. `None` means the referent has been collected or
    /// the handle is invalid.
    pub fn target(&self) -> Option<Object> {
        let address = self.runtime.gc_handle_get_target(self.handle);

        if address.is_null() {
            None
        } else {
            Some(Object::new(address))
        }
    }

    /// Releases the handle slot. Consuming `self` makes resolving a freed
    /// handle unrepresentable; re-wrapping the raw value after this call is
    /// runtime-defined misbehavior.
    pub fn free(self) {
        self.runtime.gc_handle_free(self.handle)
    }
}
