//! Thin wrappers around the operating system's anonymous memory interface.

use std::ptr;

/// Options applied to every map operation of a run.
///
/// # Examples
///
/// ```
/// use mmap_lat::MapOptions;
///
/// // The defaults mirror a typical benchmark run: page tables populated
/// // eagerly, regular page size.
/// let options = MapOptions::default();
/// assert!(options.populate);
/// assert!(!options.huge_pages);
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MapOptions {
    /// Pre-populate page tables (`MAP_POPULATE`), so the cost of physical
    /// allocation is part of the measured map call instead of being deferred
    /// to the first touch of each page.
    pub populate: bool,

    /// Request huge-page backing (`MAP_HUGETLB`). Fails per operation when the
    /// host has no huge pages available; the run continues regardless.
    pub huge_pages: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            populate: true,
            huge_pages: false,
        }
    }
}

/// The outcome of one map operation: the address of the mapped region plus its
/// length.
///
/// A failed map yields [`RegionHandle::invalid()`]. Passing an invalid handle
/// to [`unmap_region()`] releases nothing and reports failure, so a failed map
/// never poisons the rest of a run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RegionHandle {
    addr: *mut libc::c_void,
    len: usize,
}

// SAFETY: A handle is an address + length pair referring to memory outside of
// any Rust allocation. Ownership of the region moves with the handle.
unsafe impl Send for RegionHandle {}

impl RegionHandle {
    /// The sentinel handle produced by a failed map operation.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            addr: libc::MAP_FAILED,
            len: 0,
        }
    }

    /// Whether this handle refers to a mapped region.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.addr != libc::MAP_FAILED
    }

    /// The address of the mapped region, as reported by the operating system.
    #[must_use]
    pub fn addr(&self) -> *mut libc::c_void {
        self.addr
    }

    /// The length of the mapped region in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region has zero length.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Maps a fresh anonymous private region of `len` bytes at a kernel-chosen
/// address.
///
/// Returns [`RegionHandle::invalid()`] when the operating system cannot
/// provide the region (address space exhausted, no huge pages available,
/// zero length requested). The caller decides whether that is fatal; the
/// benchmark treats it as a counted, non-fatal event.
#[must_use]
pub fn map_region(len: usize, options: &MapOptions) -> RegionHandle {
    let mut flags = libc::MAP_ANONYMOUS | libc::MAP_PRIVATE;

    if options.populate {
        flags |= libc::MAP_POPULATE;
    }

    if options.huge_pages {
        flags |= libc::MAP_HUGETLB;
    }

    // SAFETY: Mapping fresh anonymous memory at a kernel-chosen address cannot
    // alias any existing Rust object.
    let addr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            flags,
            -1,
            0,
        )
    };

    if addr == libc::MAP_FAILED {
        RegionHandle::invalid()
    } else {
        RegionHandle { addr, len }
    }
}

/// Releases a region previously produced by [`map_region()`], returning its
/// address range to the operating system.
///
/// Returns whether a region was actually released. Invalid handles are skipped
/// and report `false`, as does a release the operating system rejects.
pub fn unmap_region(handle: RegionHandle) -> bool {
    if !handle.is_valid() {
        return false;
    }

    // SAFETY: The handle was produced by a successful mmap call and ownership
    // rules ensure each handle is released at most once.
    let result = unsafe { libc::munmap(handle.addr, handle.len) };

    result == 0
}
