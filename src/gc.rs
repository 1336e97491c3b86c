use parking_lot::Mutex;

use std::cmp::{Ord, Ordering, PartialOrd};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::error::GcError;
use crate::mem;
use crate::object::Object;
use crate::runtime::{Runtime, TypeToken};
use crate::timer::Timer;

pub mod choose;
pub mod handle;

pub const K: usize = 1024;
pub const M: usize = K * K;

pub struct Flags {
    /// Record per-scan pause times for `dump_summary`.
    pub gc_stats: bool,
    /// Print a line per scan.
    pub gc_verbose: bool,
}

impl Default for Flags {
    fn default() -> Flags {
        Flags {
            gc_stats: false,
            gc_verbose: false,
        }
    }
}

/// Control and introspection surface over the managed runtime's collector.
///
/// Every operation delegates synchronously to the runtime; the only state
/// kept here is scan statistics and the single-flight scan guard. The world
/// pause primitives (`stop_world`/`start_world`) are exposed for external
/// callers and used internally by `choose`.
pub struct Gc {
    runtime: Arc<dyn Runtime>,
    scan_in_flight: AtomicBool,
    stats: Mutex<CollectionStats>,
    gc_stats: bool,
    gc_verbose: bool,
}

impl Gc {
    pub fn new(runtime: Arc<dyn Runtime>, flags: &Flags) -> Gc {
        Gc {
            runtime,
            scan_in_flight: AtomicBool::new(false),
            stats: Mutex::new(CollectionStats::new()),
            gc_stats: flags.gc_stats,
            gc_verbose: flags.gc_verbose,
        }
    }

    /// Total bytes reserved by the managed heap.
    pub fn heap_size(&self) -> i64 {
        self.runtime.gc_get_heap_size()
    }

    /// Bytes currently occupied by reachable data.
    pub fn used_heap_size(&self) -> i64 {
        self.runtime.gc_get_used_size()
    }

    pub fn is_enabled(&self) -> bool {
        !self.runtime.gc_is_disabled()
    }

    /// Turns automatic collection on or off. Disabling does not stop
    /// allocation, only the collector.
    pub fn set_enabled(&self, value: bool) {
        if value {
            self.runtime.gc_enable()
        } else {
            self.runtime.gc_disable()
        }
    }

    pub fn is_incremental(&self) -> bool {
        self.runtime.gc_is_incremental()
    }

    /// Upper bound in nanoseconds on the time spent in one incremental step.
    pub fn max_time_slice(&self) -> i64 {
        self.runtime.gc_get_max_time_slice()
    }

    /// Always accepted, but only meaningful in incremental mode.
    pub fn set_max_time_slice(&self, nanoseconds: i64) {
        self.runtime.gc_set_max_time_slice(nanoseconds)
    }

    /// Forces a collection of the given generation. Out-of-range values are
    /// clamped into `[0, 2]`.
    pub fn collect(&self, generation: i32) {
        self.runtime.gc_collect(generation.clamp(0, 2))
    }

    /// Forces a small, bounded collection step.
    pub fn collect_a_little(&self) {
        self.runtime.gc_collect_a_little()
    }

    /// Forces one incremental collection step.
    pub fn start_incremental_collection(&self) {
        self.runtime.gc_start_incremental_collection()
    }

    /// Suspends all threads that may access the managed heap, other than the
    /// caller. Must be paired with `start_world`; calling it while the world
    /// is already stopped is undefined and up to the caller to avoid.
    pub fn stop_world(&self) {
        self.runtime.gc_stop_world()
    }

    /// Resumes the threads suspended by the matching `stop_world`.
    pub fn start_world(&self) {
        self.runtime.gc_start_world()
    }

    /// Returns every heap object whose type matches `class` at the instant
    /// of the scan, per the runtime's type-matching rules. Blocks the caller
    /// and all mutator threads for the duration of the trace and returns
    /// only after the world has been resumed, on success and on failure.
    ///
    /// Delivery order carries no guarantee beyond being stable for one call.
    /// Overlapping scans are refused with `GcError::ScanInProgress`; calling
    /// this while an external `stop_world` is pending is undefined.
    pub fn choose(&self, class: TypeToken) -> Result<Vec<Object>, GcError> {
        if self.scan_in_flight.swap(true, AtomicOrdering::Acquire) {
            return Err(GcError::ScanInProgress);
        }

        let mut timer = Timer::new(self.gc_stats);
        let result = choose::choose(&*self.runtime, class);

        if self.gc_stats {
            let duration = timer.stop();
            let mut stats = self.stats.lock();
            stats.add(duration);
        }

        if self.gc_verbose {
            match &result {
                Ok(matches) => println!("GC: choose found {} objects", matches.len()),
                Err(error) => println!("GC: choose failed: {}", error),
            }
        }

        self.scan_in_flight.store(false, AtomicOrdering::Release);
        result
    }

    /// Prints heap and scan statistics.
    pub fn dump_summary(&self, runtime: f32) {
        let stats = self.stats.lock();

        println!(
            "GC stats: heap={}",
            formatted_size(self.heap_size().max(0) as usize)
        );
        println!(
            "GC stats: used={}",
            formatted_size(self.used_heap_size().max(0) as usize)
        );

        println!("");
        println!("GC stats: scan-count={}", stats.scans());
        println!("GC stats: scan-pauses={}", stats.pauses());

        println!(
            "GC summary: {:.1}ms scanning ({}), {:.1}ms mutator, {:.1}ms total",
            stats.pause(),
            stats.scans(),
            stats.mutator(runtime),
            runtime,
        );
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
#[repr(C)]
pub struct Address(usize);

impl Address {
    #[inline(always)]
    pub fn from(val: usize) -> Address {
        Address(val)
    }

    #[inline(always)]
    pub fn offset(self, offset: usize) -> Address {
        Address(self.0 + offset)
    }

    #[inline(always)]
    pub fn add_ptr(self, words: usize) -> Address {
        Address(self.0 + words * mem::ptr_width_usize())
    }

    #[inline(always)]
    pub fn to_usize(self) -> usize {
        self.0
    }

    #[inline(always)]
    pub fn from_ptr<T>(ptr: *const T) -> Address {
        Address(ptr as usize)
    }

    #[inline(always)]
    pub fn to_ptr<T>(&self) -> *const T {
        self.0 as *const T
    }

    #[inline(always)]
    pub fn to_mut_ptr<T>(&self) -> *mut T {
        self.0 as *const T as *mut T
    }

    #[inline(always)]
    pub fn null() -> Address {
        Address(0)
    }

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn is_non_null(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}", self.to_usize())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:x}", self.to_usize())
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Address) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Address) -> Ordering {
        self.to_usize().cmp(&other.to_usize())
    }
}

impl From<usize> for Address {
    fn from(val: usize) -> Address {
        Address(val)
    }
}

struct FormattedSize {
    size: usize,
}

impl fmt::Display for FormattedSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ksize = (self.size as f64) / 1024f64;

        if ksize < 1f64 {
            return write!(f, "{}B", self.size);
        }

        let msize = ksize / 1024f64;

        if msize < 1f64 {
            return write!(f, "{:.1}K", ksize);
        }

        let gsize = msize / 1024f64;

        if gsize < 1f64 {
            write!(f, "{:.1}M", msize)
        } else {
            write!(f, "{:.1}G", gsize)
        }
    }
}

fn formatted_size(size: usize) -> FormattedSize {
    FormattedSize { size }
}

struct CollectionStats {
    scans: usize,
    total_pause: f32,
    pauses: Vec<f32>,
}

impl CollectionStats {
    fn new() -> CollectionStats {
        CollectionStats {
            scans: 0,
            total_pause: 0f32,
            pauses: Vec::new(),
        }
    }

    fn add(&mut self, pause: f32) {
        self.scans += 1;
        self.total_pause += pause;
        self.pauses.push(pause);
    }

    fn pause(&self) -> f32 {
        self.total_pause
    }

    fn pauses(&self) -> AllNumbers {
        AllNumbers(self.pauses.clone())
    }

    fn mutator(&self, runtime: f32) -> f32 {
        runtime - self.total_pause
    }

    fn scans(&self) -> usize {
        self.scans
    }
}

pub struct AllNumbers(Vec<f32>);

impl fmt::Display for AllNumbers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for num in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{:.1}", num)?;
            first = false;
        }
        write!(f, "]")
    }
}
