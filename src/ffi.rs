//! FFI bindings for cognigraph
//!
//! This module provides C-compatible functions for calling cognigraph from other
//! languages. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `cg_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::behavior::session::events_to_state;
use crate::concepts::pipeline::{text_to_concepts_json, ConceptProcessor};
use crate::error::CoreError;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Hand a result string to C, recording the error on failure
fn result_to_cstr(result: Result<String, CoreError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Classify a JSON array of interaction events and return the state JSON.
///
/// # Safety
/// - `events_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cg_free_string`.
/// - Returns NULL on error; call `cg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cg_events_to_state(
    events_json: *const c_char,
    window_ms: u64,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(events_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(events_to_state(&json_str, window_ms))
}

/// Extract weighted concepts from text and return them as a JSON array.
///
/// # Safety
/// - `text` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cg_free_string`.
/// - Returns NULL on error; call `cg_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cg_extract_concepts(text: *const c_char) -> *mut c_char {
    clear_last_error();

    let text_str = match cstr_to_string(text) {
        Some(s) => s,
        None => {
            set_last_error("Invalid text string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(text_to_concepts_json(&text_str))
}

// ============================================================================
// Concept Processor API
// ============================================================================

/// Opaque handle to a ConceptProcessor
pub struct ProcessorHandle {
    processor: ConceptProcessor,
}

/// Create a concept processor for one user.
///
/// # Safety
/// - `user_id` must be a valid null-terminated C string.
/// - Must be freed with `cg_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn cg_processor_new(user_id: *const c_char) -> *mut ProcessorHandle {
    clear_last_error();

    let user = match cstr_to_string(user_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid user_id string pointer");
            return ptr::null_mut();
        }
    };

    let handle = Box::new(ProcessorHandle {
        processor: ConceptProcessor::new(user),
    });
    Box::into_raw(handle)
}

/// Free a concept processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cg_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cg_processor_free(processor: *mut ProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Analyze viewed content and return `{concepts, new_edges}` as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cg_processor_new`.
/// - `text` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cg_free_string`.
#[no_mangle]
pub unsafe extern "C" fn cg_processor_analyze(
    processor: *mut ProcessorHandle,
    text: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &mut *processor;

    let text_str = match cstr_to_string(text) {
        Some(s) => s,
        None => {
            set_last_error("Invalid text string pointer");
            return ptr::null_mut();
        }
    };

    let analysis = handle.processor.analyze(&text_str);
    result_to_cstr(serde_json::to_string(&analysis).map_err(CoreError::from))
}

/// Return the graph output contract `{nodes, edges}` as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `cg_processor_new`.
/// - Returns a newly allocated string that must be freed with `cg_free_string`.
#[no_mangle]
pub unsafe extern "C" fn cg_processor_snapshot(processor: *mut ProcessorHandle) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    result_to_cstr((*processor).processor.snapshot_json())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by cognigraph functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a cognigraph function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cg_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next cognigraph call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cg_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffi_events_to_state() {
        let events = CString::new(
            r#"[{"type":"blur","timestamp":"2024-01-15T14:00:01Z"},
                {"type":"blur","timestamp":"2024-01-15T14:00:02Z"}]"#,
        )
        .unwrap();

        unsafe {
            let result = cg_events_to_state(events.as_ptr(), 30_000);
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("\"state\""));
            assert!(result_str.contains("\"confidence\""));

            cg_free_string(result);
        }
    }

    #[test]
    fn test_ffi_extract_concepts() {
        let text = CString::new("Machine learning uses neural networks for deep learning tasks")
            .unwrap();

        unsafe {
            let result = cg_extract_concepts(text.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            assert!(result_str.contains("machine-learning"));

            cg_free_string(result);
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        let user = CString::new("user-1").unwrap();
        let text = CString::new("Machine learning uses neural networks for deep learning tasks")
            .unwrap();

        unsafe {
            let processor = cg_processor_new(user.as_ptr());
            assert!(!processor.is_null());

            let analysis = cg_processor_analyze(processor, text.as_ptr());
            assert!(!analysis.is_null());
            let analysis_str = CStr::from_ptr(analysis).to_str().unwrap();
            assert!(analysis_str.contains("new_edges"));
            cg_free_string(analysis);

            let snapshot = cg_processor_snapshot(processor);
            assert!(!snapshot.is_null());
            let snapshot_str = CStr::from_ptr(snapshot).to_str().unwrap();
            assert!(snapshot_str.contains("\"edges\""));
            assert!(snapshot_str.contains("machine-learning"));
            cg_free_string(snapshot);

            cg_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid = CString::new("not json").unwrap();
            let result = cg_events_to_state(invalid.as_ptr(), 30_000);
            assert!(result.is_null());

            let error = cg_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            assert!(cg_processor_analyze(ptr::null_mut(), invalid.as_ptr()).is_null());
            assert!(!cg_last_error().is_null());

            assert!(cg_extract_concepts(ptr::null()).is_null());
            let error_str = CStr::from_ptr(cg_last_error()).to_str().unwrap();
            assert!(error_str.contains("text"));
        }
    }

    #[test]
    fn test_ffi_error_cleared_on_success() {
        let text = CString::new("Photosynthesis converts light into chemical energy").unwrap();

        unsafe {
            assert!(cg_events_to_state(ptr::null(), 0).is_null());
            assert!(!cg_last_error().is_null());

            let result = cg_extract_concepts(text.as_ptr());
            assert!(!result.is_null());
            assert!(cg_last_error().is_null());
            cg_free_string(result);
        }
    }
}
