use std::os::raw::{c_int, c_void};

use crate::gc::Address;
use crate::version::RuntimeVersion;

/// Delivery callback for liveness scans: the runtime hands over a packed
/// array of `count` object addresses. Invoked zero or more times per scan,
/// always synchronously on the scanning thread while the world is stopped.
pub type RegisterObjectsCallback =
    extern "C" fn(buffer: *const Address, count: c_int, userdata: *mut c_void);

/// Scan-buffer allocator with realloc semantics: a non-null `buffer` with
/// `size` 0 frees and returns null, everything else returns a fresh region
/// of `size` bytes. The allocator never copies; preserving old contents is
/// the runtime's concern.
pub type ReallocateCallback =
    extern "C" fn(buffer: *mut c_void, size: usize, userdata: *mut c_void) -> *mut c_void;

/// World-stopped/world-started notification required by the older liveness
/// protocol signature.
pub type WorldCallback = extern "C" fn(userdata: *mut c_void);

/// Opaque identifier for a managed type, owned by the runtime's type system.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct TypeToken(Address);

impl TypeToken {
    pub fn new(address: Address) -> TypeToken {
        TypeToken(address)
    }

    pub fn address(&self) -> Address {
        self.0
    }
}

/// Opaque liveness-session handle returned by the begin/allocate step of
/// either protocol variant. Null signals that the runtime failed to set up
/// the session.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct LivenessState(Address);

impl LivenessState {
    pub fn new(address: Address) -> LivenessState {
        LivenessState(address)
    }

    pub fn null() -> LivenessState {
        LivenessState(Address::null())
    }

    pub fn address(&self) -> Address {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

/// Native call surface of the managed runtime. The control layer threads an
/// explicit handle to this trait through every component instead of going
/// through ambient globals, so the whole crate runs unchanged against a mock.
///
/// All calls are synchronous and block until the native side returns. The
/// liveness operations are unsafe: they exchange raw buffers and C-ABI
/// function pointers, and their session handles must only be used in the
/// sequences described on `Gc::choose`.
pub trait Runtime {
    fn version(&self) -> RuntimeVersion;

    fn gc_get_heap_size(&self) -> i64;
    fn gc_get_used_size(&self) -> i64;

    fn gc_is_disabled(&self) -> bool;
    fn gc_enable(&self);
    fn gc_disable(&self);

    fn gc_is_incremental(&self) -> bool;
    fn gc_get_max_time_slice(&self) -> i64;
    fn gc_set_max_time_slice(&self, nanoseconds: i64);

    /// Collects the given generation. Callers pass a value in `[0, 2]`.
    fn gc_collect(&self, generation: i32);
    fn gc_collect_a_little(&self);
    fn gc_start_incremental_collection(&self);

    /// Suspends all threads that may access the managed heap, other than the
    /// caller. Not reentrant; must be paired with `gc_start_world`.
    fn gc_stop_world(&self);

    /// Resumes the threads suspended by the matching `gc_stop_world`.
    fn gc_start_world(&self);

    /// Newer liveness protocol: sets up a session for `class` with a
    /// caller-supplied delivery callback and buffer allocator. The world
    /// must already be stopped by the caller.
    unsafe fn liveness_allocate_struct(
        &self,
        class: TypeToken,
        flags: i32,
        register: RegisterObjectsCallback,
        userdata: *mut c_void,
        reallocate: ReallocateCallback,
    ) -> LivenessState;

    /// Older liveness protocol: sets up a session for `class` and stops the
    /// world itself. `liveness_calculation_end` resumes it.
    unsafe fn liveness_calculation_begin(
        &self,
        class: TypeToken,
        flags: i32,
        register: RegisterObjectsCallback,
        userdata: *mut c_void,
        on_world_stopped: WorldCallback,
        on_world_started: WorldCallback,
    ) -> LivenessState;

    /// Runs the trace from static roots. Used by both protocol variants.
    unsafe fn liveness_calculation_from_statics(&self, state: LivenessState);

    /// Newer protocol: flushes remaining matches through the delivery
    /// callback.
    unsafe fn liveness_finalize(&self, state: LivenessState);

    /// Older protocol: finalizes the trace and resumes the world.
    unsafe fn liveness_calculation_end(&self, state: LivenessState);

    /// Newer protocol: tears the session down. Does not require the pause.
    unsafe fn liveness_free_struct(&self, state: LivenessState);

    /// Resolves a weak handle to its referent, or null if it was collected.
    fn gc_handle_get_target(&self, handle: u32) -> Address;

    /// Releases a weak handle slot. Freeing twice or resolving afterwards is
    /// runtime-defined misbehavior.
    fn gc_handle_free(&self, handle: u32);
}
