use std::os::raw::{c_int, c_void};
use std::ptr;

use crate::error::GcError;
use crate::gc::Address;
use crate::mem;
use crate::object::Object;
use crate::runtime::{Runtime, TypeToken};
use crate::version::LIVENESS_ALLOCATION_API;

/// Transient state for one liveness scan. A pointer to this struct is handed
/// to the runtime as the callback userdata, so it must stay pinned on the
/// caller's stack until the scan finishes.
struct ScanState {
    matches: Vec<Object>,
    buffers: Vec<*mut c_void>,
}

impl ScanState {
    fn new() -> ScanState {
        ScanState {
            matches: Vec::new(),
            buffers: Vec::new(),
        }
    }

    fn userdata(&mut self) -> *mut c_void {
        self as *mut ScanState as *mut c_void
    }
}

impl Drop for ScanState {
    fn drop(&mut self) {
        // The runtime frees scan buffers through the reallocate callback.
        // Anything still outstanding at teardown is released here, so no
        // scan memory survives the call, success or failure.
        for &buffer in &self.buffers {
            unsafe { libc::free(buffer) };
        }
    }
}

/// Runs a stop-the-world liveness trace and returns every live object of
/// `class`. The protocol variant is picked once per call from the runtime
/// version; the two paths stay fully separate because their pause ownership
/// differs.
pub fn choose(runtime: &dyn Runtime, class: TypeToken) -> Result<Vec<Object>, GcError> {
    let mut scan = ScanState::new();

    if runtime.version() >= LIVENESS_ALLOCATION_API {
        choose_with_allocation_api(runtime, class, &mut scan)?;
    } else {
        choose_with_runtime_pause(runtime, class, &mut scan)?;
    }

    Ok(std::mem::take(&mut scan.matches))
}

/// Newer protocol: the caller owns the pause and supplies the buffer
/// allocator. Session teardown runs after the resume, which does not need
/// the world to be stopped.
fn choose_with_allocation_api(
    runtime: &dyn Runtime,
    class: TypeToken,
    scan: &mut ScanState,
) -> Result<(), GcError> {
    let userdata = scan.userdata();

    runtime.gc_stop_world();

    let state = unsafe {
        runtime.liveness_allocate_struct(class, 0, register_objects, userdata, reallocate_buffer)
    };

    let result = if state.is_null() {
        Err(GcError::LivenessStateAllocation)
    } else {
        unsafe {
            runtime.liveness_calculation_from_statics(state);
            runtime.liveness_finalize(state);
        }
        Ok(())
    };

    // The world is resumed on every exit path, before any error surfaces.
    runtime.gc_start_world();

    if !state.is_null() {
        unsafe { runtime.liveness_free_struct(state) };
    }

    result
}

/// Older protocol: begin stops the world itself and end resumes it, so a
/// failed begin leaves nothing to undo.
fn choose_with_runtime_pause(
    runtime: &dyn Runtime,
    class: TypeToken,
    scan: &mut ScanState,
) -> Result<(), GcError> {
    let userdata = scan.userdata();

    let state = unsafe {
        runtime.liveness_calculation_begin(
            class,
            0,
            register_objects,
            userdata,
            world_stopped,
            world_started,
        )
    };

    if state.is_null() {
        return Err(GcError::LivenessStateAllocation);
    }

    unsafe {
        runtime.liveness_calculation_from_statics(state);
        runtime.liveness_calculation_end(state);
    }

    Ok(())
}

/// Delivery callback shared by both variants. Runs nested inside the native
/// trace on the scanning thread, so it only appends to the match list and
/// never calls back into the runtime.
extern "C" fn register_objects(buffer: *const Address, count: c_int, userdata: *mut c_void) {
    let scan = unsafe { &mut *(userdata as *mut ScanState) };

    let addresses = unsafe { mem::ptr_slice(buffer, count.max(0) as usize) };
    for &address in addresses {
        scan.matches.push(Object::new(address));
    }
}

/// Variant A buffer allocator. Plain memory only; managed allocation during
/// the pause would deadlock against the stopped collector.
extern "C" fn reallocate_buffer(buffer: *mut c_void, size: usize, userdata: *mut c_void) -> *mut c_void {
    let scan = unsafe { &mut *(userdata as *mut ScanState) };

    if !buffer.is_null() && size == 0 {
        scan.buffers.retain(|&outstanding| outstanding != buffer);
        unsafe { libc::free(buffer) };
        return ptr::null_mut();
    }

    let fresh = unsafe { libc::malloc(size) };
    scan.buffers.push(fresh);
    fresh
}

extern "C" fn world_stopped(_userdata: *mut c_void) {}

extern "C" fn world_started(_userdata: *mut c_void) {}
