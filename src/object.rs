use std::fmt;

use crate::gc::Address;

/// Reference to a managed heap object, as discovered by a liveness scan or
/// resolved through a weak handle. This is only the address-carrying shell
/// the control layer needs; field access and marshaling belong to the full
/// object wrapper outside this crate.
///
/// Addresses are stable only while the world is stopped. A reference held
/// across the resume must be re-validated before it is dereferenced, since
/// the collector may have moved or freed the object in the meantime.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Object {
    address: Address,
}

impl Object {
    pub fn new(address: Address) -> Object {
        Object { address }
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Object({})", self.address)
    }
}
