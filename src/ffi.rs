//! Opaque-handle C API: the stable surface foreign callers (an R package, a
//! CLI written in another language) use instead of linking against the Rust
//! types directly.
//!
//! None of the example repos in this crate's lineage ship an FFI surface, so
//! this module is grounded instead on the "opaque handle, explicit
//! create/destroy, no panics across the boundary" discipline this codebase
//! already applies to resource-owning types like `DiskCache` — every handle
//! here is a `Box::into_raw` pointer the caller must eventually hand back to
//! the matching `_deinit`/`_destroy` function, and every fallible operation
//! collapses to a null/zero return plus a separately retrievable
//! last-error message, per the error-handling policy in `crate::error`.
//!
//! # Safety
//!
//! Every `extern "C" fn` here is `unsafe` to call: callers must pass
//! pointers obtained from the matching `_init`/`_create` function, must not
//! use a handle after its `_deinit`/`_destroy`, and must not let a
//! `RepoIndexHandle` outlive the `RepoHandle` it was built from (mutating or
//! destroying the Repository invalidates every Index over it — the same
//! contract [`crate::Index`] documents for in-process callers).

use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::slice;
use std::sync::Mutex;

use crate::index::Index;
use crate::nvc::NameAndVersionConstraint;
use crate::repository::Repository;
use crate::version::{Operator, Version};

/// Opaque handle to a [`Repository`]. Always non-null when returned from
/// [`repo_init`]; becomes dangling the instant [`repo_deinit`] is called on
/// it.
#[repr(C)]
pub struct RepoHandle {
    _private: [u8; 0],
}

/// Opaque handle to an [`Index`] snapshot over some `RepoHandle`.
#[repr(C)]
pub struct RepoIndexHandle {
    _private: [u8; 0],
}

struct RepoState {
    repo: Repository,
    last_error: Option<String>,
    // Kept alongside `last_error` so `repo_last_error_message` can hand back
    // a pointer that stays valid until the next `repo_read`/`repo_deinit`,
    // without allocating a fresh CString per call.
    last_error_c: Option<CString>,
}

/// `operator` ordering matches [`crate::Operator`]'s `#[repr(u8)]` discriminants.
#[repr(C)]
pub struct FfiVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub rev: u32,
}

impl From<Version> for FfiVersion {
    fn from(v: Version) -> Self {
        Self {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            rev: v.rev,
        }
    }
}

/// One `(name, operator, version)` record in an [`NvBuffer`]. `name_ptr`
/// points into memory owned by the `RepoHandle` the record was produced
/// from and is valid only for that Repository's lifetime.
#[repr(C)]
pub struct NvRecord {
    pub name_ptr: *const c_char,
    pub name_len: usize,
    pub operator: u8,
    pub version: FfiVersion,
}

/// A flat, owned array of [`NvRecord`]s. Must be freed exactly once, via
/// [`repo_name_version_buffer_destroy`].
#[repr(C)]
pub struct NvBuffer {
    pub records: *mut NvRecord,
    pub len: usize,
    capacity: usize,
}

fn nvc_to_record(repo: &Repository, nvc: &NameAndVersionConstraint) -> NvRecord {
    let name = repo.interner().resolve(nvc.name);
    NvRecord {
        name_ptr: name.as_ptr().cast(),
        name_len: name.len(),
        operator: nvc.constraint.operator as u8,
        version: nvc.constraint.version.into(),
    }
}

fn buffer_from_records(mut records: Vec<NvRecord>) -> *mut NvBuffer {
    let buffer = Box::new(NvBuffer {
        records: records.as_mut_ptr(),
        len: records.len(),
        capacity: records.capacity(),
    });
    std::mem::forget(records);
    Box::into_raw(buffer)
}

/// Creates an empty Repository. Returns null only if allocation fails.
///
/// # Safety
/// The returned pointer must eventually be passed to [`repo_deinit`] exactly once.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_init() -> *mut RepoHandle {
    let state = Box::new(Mutex::new(RepoState {
        repo: Repository::new(),
        last_error: None,
        last_error_c: None,
    }));
    Box::into_raw(state) as *mut RepoHandle
}

/// Releases a Repository created by [`repo_init`]. `handle` must not be
/// used again after this call.
///
/// # Safety
/// `handle` must be a pointer returned by [`repo_init`] that has not already
/// been passed to this function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_deinit(handle: *mut RepoHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle as *mut Mutex<RepoState>) });
}

unsafe fn state<'a>(handle: *mut RepoHandle) -> &'a Mutex<RepoState> {
    unsafe { &*(handle as *mut Mutex<RepoState>) }
}

/// Locks `state`, recovering from a poisoned lock rather than panicking: a
/// prior panic while the lock was held (which this module's own code never
/// triggers, but a foreign caller sharing the handle across threads could)
/// must not propagate across the FFI boundary.
fn lock_state(state: &Mutex<RepoState>) -> std::sync::MutexGuard<'_, RepoState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Parses `bytes[..len]` as DCF text labelled `origin` and appends its
/// stanzas to the Repository. Returns the number of stanzas committed, or 0
/// on failure (retrieve the reason via [`repo_last_error_message`]).
///
/// # Safety
/// `handle` must be a live pointer from [`repo_init`]; `origin`/`bytes` must
/// point to at least `origin_len`/`len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_read(
    handle: *mut RepoHandle,
    origin: *const u8,
    origin_len: usize,
    bytes: *const u8,
    len: usize,
) -> usize {
    if handle.is_null() || bytes.is_null() {
        return 0;
    }
    let origin = if origin.is_null() {
        ""
    } else {
        let raw = unsafe { slice::from_raw_parts(origin, origin_len) };
        std::str::from_utf8(raw).unwrap_or("")
    };
    let raw = unsafe { slice::from_raw_parts(bytes, len) };

    let mut guard = lock_state(unsafe { state(handle) });
    match guard.repo.read(origin, raw) {
        Ok(n) => {
            guard.last_error = None;
            guard.last_error_c = None;
            n
        }
        Err(e) => {
            let message = e.to_string();
            guard.last_error_c = CString::new(message.clone()).ok();
            guard.last_error = Some(message);
            0
        }
    }
}

/// Returns the message from the most recent failing [`repo_read`] on this
/// handle, or null if the last call succeeded (or none has been made yet).
/// The pointer is valid until the next `repo_read` or `repo_deinit` call on
/// `handle` — callers that need it longer must copy it.
///
/// # Safety
/// `handle` must be a live pointer from [`repo_init`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_last_error_message(handle: *mut RepoHandle) -> *const c_char {
    if handle.is_null() {
        return std::ptr::null();
    }
    let guard = lock_state(unsafe { state(handle) });
    guard
        .last_error_c
        .as_ref()
        .map(|c| c.as_ptr())
        .unwrap_or(std::ptr::null())
}

/// Builds a snapshot [`Index`] over the Repository's current contents.
/// Returns null only if `handle` is null.
///
/// # Safety
/// `handle` must be a live pointer from [`repo_init`], and must outlive the
/// returned `RepoIndexHandle` — mutating (another `repo_read`) or
/// `repo_deinit`-ing the Repository before calling [`repo_index_deinit`] is
/// undefined behavior.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_index_init(handle: *mut RepoHandle) -> *mut RepoIndexHandle {
    if handle.is_null() {
        return std::ptr::null_mut();
    }
    let guard = lock_state(unsafe { state(handle) });
    // SAFETY: the returned Index borrows from `guard.repo` for as long as
    // the caller's documented contract (repo outlives index) holds; we
    // erase the lifetime here because the C ABI has no way to express it,
    // exactly as `crate::index` itself refuses to: Index<'a> always borrows,
    // this boundary is where that borrow becomes a documented caller duty
    // instead of a compiler-checked one.
    let index: Index<'static> = unsafe { std::mem::transmute(guard.repo.create_index()) };
    Box::into_raw(Box::new(index)) as *mut RepoIndexHandle
}

/// Releases an Index created by [`repo_index_init`].
///
/// # Safety
/// `handle` must be a pointer returned by [`repo_index_init`] that has not
/// already been passed to this function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_index_deinit(handle: *mut RepoIndexHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle as *mut Index<'static>) });
}

/// Looks up `name[..name_len]`'s latest row via `repo_handle` and returns
/// its unmet `depends ∪ imports ∪ linkingTo` as a freshly allocated
/// [`NvBuffer`] (see [`crate::Index::unmet`]). Returns null if the name
/// isn't found or any argument is null.
///
/// # Safety
/// `index_handle` must be a live pointer from [`repo_index_init`] built from
/// `repo_handle`, which must still be live; `name` must point to at least
/// `name_len` readable bytes. The returned buffer must be released via
/// [`repo_name_version_buffer_destroy`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_index_unsatisfied(
    index_handle: *mut RepoIndexHandle,
    repo_handle: *mut RepoHandle,
    name_ptr: *const u8,
    name_len: usize,
) -> *mut NvBuffer {
    if index_handle.is_null() || repo_handle.is_null() || name_ptr.is_null() {
        return std::ptr::null_mut();
    }
    let index = unsafe { &*(index_handle as *mut Index<'static>) };
    let raw = unsafe { slice::from_raw_parts(name_ptr, name_len) };
    let Ok(name) = std::str::from_utf8(raw) else {
        return std::ptr::null_mut();
    };

    let guard = lock_state(unsafe { state(repo_handle) });
    let Ok(unmet) = index.unmet(name) else {
        return std::ptr::null_mut();
    };
    let records = unmet.iter().map(|nvc| nvc_to_record(&guard.repo, nvc)).collect();
    buffer_from_records(records)
}

/// Allocates an `NvBuffer` with `n` zeroed records, for callers that want to
/// fill one themselves rather than receive one from a query. The result must
/// be released via [`repo_name_version_buffer_destroy`].
#[unsafe(no_mangle)]
pub extern "C" fn repo_name_version_buffer_create(n: usize) -> *mut NvBuffer {
    let records: Vec<NvRecord> = (0..n)
        .map(|_| NvRecord {
            name_ptr: std::ptr::null(),
            name_len: 0,
            operator: Operator::Ge as u8,
            version: Version::default().into(),
        })
        .collect();
    buffer_from_records(records)
}

/// Releases a buffer returned by [`repo_index_unsatisfied`] or
/// [`repo_name_version_buffer_create`].
///
/// # Safety
/// `buffer` must be a pointer from one of those functions that has not
/// already been passed to this function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn repo_name_version_buffer_destroy(buffer: *mut NvBuffer) {
    if buffer.is_null() {
        return;
    }
    let buffer = unsafe { Box::from_raw(buffer) };
    drop(unsafe { Vec::from_raw_parts(buffer.records, buffer.len, buffer.capacity) });
}

// Silences an unused-import warning when the `c_void` re-export below isn't
// otherwise referenced; kept for FFI consumers that want an untyped handle
// alias without depending on this crate's handle struct names.
#[allow(dead_code)]
type _OpaquePtr = *mut c_void;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_init_read_index_unsatisfied_deinit() {
        unsafe {
            let handle = repo_init();
            assert!(!handle.is_null());

            let origin = b"cran";
            let bytes = b"Package: A\nVersion: 1.0\nDepends: B (>= 2.0)\n";
            let committed = repo_read(
                handle,
                origin.as_ptr(),
                origin.len(),
                bytes.as_ptr(),
                bytes.len(),
            );
            assert_eq!(committed, 1);

            let index = repo_index_init(handle);
            assert!(!index.is_null());

            let name = b"A";
            let buffer = repo_index_unsatisfied(index, handle, name.as_ptr(), name.len());
            assert!(!buffer.is_null());
            let buf = &*buffer;
            assert_eq!(buf.len, 1);
            let record = &*buf.records;
            let record_name =
                std::str::from_utf8(slice::from_raw_parts(record.name_ptr.cast(), record.name_len))
                    .unwrap();
            assert_eq!(record_name, "B");

            repo_name_version_buffer_destroy(buffer);
            repo_index_deinit(index);
            repo_deinit(handle);
        }
    }

    #[test]
    fn null_handle_is_tolerated() {
        unsafe {
            assert!(repo_index_init(std::ptr::null_mut()).is_null());
            assert!(repo_last_error_message(std::ptr::null_mut()).is_null());
            repo_deinit(std::ptr::null_mut());
            repo_index_deinit(std::ptr::null_mut());
            repo_name_version_buffer_destroy(std::ptr::null_mut());
        }
    }

    #[test]
    fn last_error_message_reports_a_failed_parse_and_clears_on_success() {
        unsafe {
            let handle = repo_init();
            assert!(repo_last_error_message(handle).is_null());

            let origin = b"cran";
            let bad = b"Package\n";
            let committed = repo_read(handle, origin.as_ptr(), origin.len(), bad.as_ptr(), bad.len());
            assert_eq!(committed, 0);
            assert!(!repo_last_error_message(handle).is_null());

            let good = b"Package: A\nVersion: 1.0\n";
            let committed =
                repo_read(handle, origin.as_ptr(), origin.len(), good.as_ptr(), good.len());
            assert_eq!(committed, 1);
            assert!(repo_last_error_message(handle).is_null());

            repo_deinit(handle);
        }
    }
}
