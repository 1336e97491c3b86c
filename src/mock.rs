use std::collections::HashMap;
use std::os::raw::{c_int, c_void};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::gc::{Address, M};
use crate::mem;
use crate::runtime::{
    LivenessState, ReallocateCallback, RegisterObjectsCallback, Runtime, TypeToken, WorldCallback,
};
use crate::version::RuntimeVersion;

const OBJECT_SIZE: usize = 32;

/// In-memory stand-in for the native runtime. Objects live in boxed cells so
/// their addresses stay stable for the duration of a test; both liveness
/// protocol variants are simulated, including the world-pause rules each one
/// expects from its caller.
pub struct MockRuntime {
    version: RuntimeVersion,
    objects: Mutex<Vec<(TypeToken, Box<u64>)>>,
    disabled: AtomicBool,
    max_time_slice: AtomicI64,
    world_stopped: AtomicBool,
    collected: Mutex<Vec<i32>>,
    incremental_steps: AtomicUsize,
    handles: Mutex<HashMap<u32, Address>>,
    next_handle: Mutex<u32>,
    fail_liveness_allocation: AtomicBool,
    leak_scan_buffers: AtomicBool,
}

struct MockSession {
    class: TypeToken,
    register: RegisterObjectsCallback,
    userdata: *mut c_void,
    reallocate: Option<ReallocateCallback>,
    on_world_started: Option<WorldCallback>,
}

impl MockRuntime {
    pub fn new(version: RuntimeVersion) -> MockRuntime {
        MockRuntime {
            version,
            objects: Mutex::new(Vec::new()),
            disabled: AtomicBool::new(false),
            max_time_slice: AtomicI64::new(0),
            world_stopped: AtomicBool::new(false),
            collected: Mutex::new(Vec::new()),
            incremental_steps: AtomicUsize::new(0),
            handles: Mutex::new(HashMap::new()),
            next_handle: Mutex::new(1),
            fail_liveness_allocation: AtomicBool::new(false),
            leak_scan_buffers: AtomicBool::new(false),
        }
    }

    /// Allocates a simulated heap object of `class` with a stable address.
    pub fn alloc_object(&self, class: TypeToken) -> Address {
        let cell = Box::new(0u64);
        let address = Address::from_ptr(&*cell as *const u64);
        self.objects.lock().push((class, cell));
        address
    }

    /// Makes every instance of `class` unreachable. Weak handles are only
    /// pruned by the next collection, matching the real runtime.
    pub fn drop_objects_of(&self, class: TypeToken) {
        self.objects.lock().retain(|(c, _)| *c != class);
    }

    pub fn create_handle(&self, target: Address) -> u32 {
        let mut next = self.next_handle.lock();
        let handle = *next;
        *next += 1;
        self.handles.lock().insert(handle, target);
        handle
    }

    pub fn fail_liveness_allocation(&self, fail: bool) {
        self.fail_liveness_allocation.store(fail, Ordering::SeqCst);
    }

    /// When set, the mock never frees scan buffers through the reallocate
    /// callback, leaving cleanup to the scanner.
    pub fn leak_scan_buffers(&self, leak: bool) {
        self.leak_scan_buffers.store(leak, Ordering::SeqCst);
    }

    pub fn collected_generations(&self) -> Vec<i32> {
        self.collected.lock().clone()
    }

    pub fn incremental_steps(&self) -> usize {
        self.incremental_steps.load(Ordering::SeqCst)
    }

    fn live_addresses(&self, class: TypeToken) -> Vec<Address> {
        self.objects
            .lock()
            .iter()
            .filter(|(c, _)| *c == class)
            .map(|(_, cell)| Address::from_ptr(&**cell as *const u64))
            .collect()
    }

    fn deliver(&self, session: &MockSession) {
        let addresses = self.live_addresses(session.class);

        if addresses.is_empty() {
            return;
        }

        match session.reallocate {
            Some(reallocate) => {
                let bytes = addresses.len() * mem::ptr_width_usize();
                let buffer =
                    reallocate(ptr::null_mut(), bytes, session.userdata) as *mut Address;
                assert!(!buffer.is_null());

                for (idx, &address) in addresses.iter().enumerate() {
                    unsafe { *buffer.add(idx) = address };
                }

                // Deliver in two batches to exercise repeated callbacks.
                let first = addresses.len() / 2;
                (session.register)(buffer, first as c_int, session.userdata);
                (session.register)(
                    unsafe { buffer.add(first) },
                    (addresses.len() - first) as c_int,
                    session.userdata,
                );

                if !self.leak_scan_buffers.load(Ordering::SeqCst) {
                    reallocate(buffer as *mut c_void, 0, session.userdata);
                }
            }
            None => {
                // Older protocol: fixed internal buffering.
                (session.register)(
                    addresses.as_ptr(),
                    addresses.len() as c_int,
                    session.userdata,
                );
            }
        }
    }

    fn session(state: LivenessState) -> &'static MockSession {
        unsafe { &*state.address().to_ptr::<MockSession>() }
    }
}

impl Runtime for MockRuntime {
    fn version(&self) -> RuntimeVersion {
        self.version
    }

    fn gc_get_heap_size(&self) -> i64 {
        (M + self.objects.lock().len() * OBJECT_SIZE) as i64
    }

    fn gc_get_used_size(&self) -> i64 {
        (self.objects.lock().len() * OBJECT_SIZE) as i64
    }

    fn gc_is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    fn gc_enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }

    fn gc_disable(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }

    fn gc_is_incremental(&self) -> bool {
        false
    }

    fn gc_get_max_time_slice(&self) -> i64 {
        self.max_time_slice.load(Ordering::SeqCst)
    }

    fn gc_set_max_time_slice(&self, nanoseconds: i64) {
        self.max_time_slice.store(nanoseconds, Ordering::SeqCst);
    }

    fn gc_collect(&self, generation: i32) {
        assert!(
            !self.world_stopped.load(Ordering::SeqCst),
            "collection while the world is stopped"
        );
        assert!(
            (0..=2).contains(&generation),
            "generation must arrive pre-clamped"
        );

        self.collected.lock().push(generation);

        // Weak handles whose referent is gone resolve to null afterwards.
        let objects = self.objects.lock();
        self.handles.lock().retain(|_, target| {
            objects
                .iter()
                .any(|(_, cell)| Address::from_ptr(&**cell as *const u64) == *target)
        });
    }

    fn gc_collect_a_little(&self) {
        self.incremental_steps.fetch_add(1, Ordering::SeqCst);
    }

    fn gc_start_incremental_collection(&self) {
        self.incremental_steps.fetch_add(1, Ordering::SeqCst);
    }

    fn gc_stop_world(&self) {
        let was_stopped = self.world_stopped.swap(true, Ordering::SeqCst);
        assert!(!was_stopped, "world already stopped");
    }

    fn gc_start_world(&self) {
        let was_stopped = self.world_stopped.swap(false, Ordering::SeqCst);
        assert!(was_stopped, "world not stopped");
    }

    unsafe fn liveness_allocate_struct(
        &self,
        class: TypeToken,
        _flags: i32,
        register: RegisterObjectsCallback,
        userdata: *mut c_void,
        reallocate: ReallocateCallback,
    ) -> LivenessState {
        assert!(
            self.world_stopped.load(Ordering::SeqCst),
            "allocation-api scan requires a stopped world"
        );

        if self.fail_liveness_allocation.load(Ordering::SeqCst) {
            return LivenessState::null();
        }

        let session = Box::new(MockSession {
            class,
            register,
            userdata,
            reallocate: Some(reallocate),
            on_world_started: None,
        });

        LivenessState::new(Address::from_ptr(Box::into_raw(session)))
    }

    unsafe fn liveness_calculation_begin(
        &self,
        class: TypeToken,
        _flags: i32,
        register: RegisterObjectsCallback,
        userdata: *mut c_void,
        on_world_stopped: WorldCallback,
        on_world_started: WorldCallback,
    ) -> LivenessState {
        if self.fail_liveness_allocation.load(Ordering::SeqCst) {
            return LivenessState::null();
        }

        self.gc_stop_world();
        on_world_stopped(userdata);

        let session = Box::new(MockSession {
            class,
            register,
            userdata,
            reallocate: None,
            on_world_started: Some(on_world_started),
        });

        LivenessState::new(Address::from_ptr(Box::into_raw(session)))
    }

    unsafe fn liveness_calculation_from_statics(&self, state: LivenessState) {
        assert!(
            self.world_stopped.load(Ordering::SeqCst),
            "trace requires a stopped world"
        );
        self.deliver(Self::session(state));
    }

    unsafe fn liveness_finalize(&self, _state: LivenessState) {
        assert!(
            self.world_stopped.load(Ordering::SeqCst),
            "finalize requires a stopped world"
        );
    }

    unsafe fn liveness_calculation_end(&self, state: LivenessState) {
        let session = Box::from_raw(state.address().to_mut_ptr::<MockSession>());

        self.gc_start_world();
        if let Some(on_world_started) = session.on_world_started {
            on_world_started(session.userdata);
        }
    }

    unsafe fn liveness_free_struct(&self, state: LivenessState) {
        assert!(
            !self.world_stopped.load(Ordering::SeqCst),
            "teardown happens after the resume"
        );
        drop(Box::from_raw(state.address().to_mut_ptr::<MockSession>()));
    }

    fn gc_handle_get_target(&self, handle: u32) -> Address {
        self.handles
            .lock()
            .get(&handle)
            .copied()
            .unwrap_or_else(Address::null)
    }

    fn gc_handle_free(&self, handle: u32) {
        let removed = self.handles.lock().remove(&handle);
        assert!(removed.is_some(), "freed an unknown handle");
    }
}
