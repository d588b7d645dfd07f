//! # Atomic integer in shared memory.
//!
//! [`SharedCell`] maps one anonymous `MAP_SHARED` page and places an [`AtomicU32`] at its
//! start. A process created by `fork` after the mapping inherits the same physical page,
//! so loads and stores on either side are immediately visible to the other.
//!
//! The mapping is released when the last `SharedCell` handle in a process is dropped.
//! A forked child leaves through `_exit` and never unmaps.

use std::io;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};

use rustix::mm::{MapFlags, ProtFlags};

/// Atomic `u32` visible across `fork`.
pub(crate) struct SharedCell {
    ptr: NonNull<AtomicU32>,
    len: usize,
}

// SAFETY: the pointee is an atomic; all access goes through `AtomicU32` methods.
unsafe impl Send for SharedCell {}
unsafe impl Sync for SharedCell {}

impl SharedCell {
    /// Maps a fresh shared page holding `initial`.
    pub(crate) fn new(initial: u32) -> io::Result<Self> {
        let len = rustix::param::page_size();

        // SAFETY: anonymous mapping at a kernel-chosen address; nothing else aliases it.
        let raw = unsafe {
            rustix::mm::mmap_anonymous(
                std::ptr::null_mut(),
                len,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
            )?
        };

        let ptr = NonNull::new(raw.cast::<AtomicU32>())
            .ok_or_else(|| io::Error::other("mmap returned null"))?;

        // SAFETY: the page is zero-filled, writable and page-aligned, which satisfies
        // `AtomicU32` layout; writing the initial value before sharing the handle.
        unsafe { ptr.as_ptr().write(AtomicU32::new(initial)) };

        Ok(Self { ptr, len })
    }

    #[inline]
    fn atomic(&self) -> &AtomicU32 {
        // SAFETY: initialized in `new`, lives until `drop`.
        unsafe { self.ptr.as_ref() }
    }

    #[inline]
    pub(crate) fn load(&self) -> u32 {
        self.atomic().load(Ordering::SeqCst)
    }

    #[inline]
    pub(crate) fn store(&self, value: u32) {
        self.atomic().store(value, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn compare_exchange(&self, current: u32, new: u32) -> Result<u32, u32> {
        self.atomic()
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
    }
}

impl Drop for SharedCell {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe the mapping created in `new`; no references outlive `self`.
        let _ = unsafe { rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len) };
    }
}
