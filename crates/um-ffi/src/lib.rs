//! C FFI bindings for um-core
//!
//! This crate provides a C-compatible API over a merge session for native
//! front ends. Sides are passed as `0` (left) and `1` (right); categories as
//! `0` left only, `1` right only, `2` identical, `3` conflict; inclusion states
//! as `0` included, `1` excluded, `2` pending resolution. Functions that can
//! fail return `0` (or a non-null string) on success and `-1` (or null) on
//! error; the message is then available from `um_session_last_error`.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use tracing::warn;
use um_core::{Category, InclusionState, Session, Side};

/// Opaque handle to a merge session
pub struct FfiSession {
    inner: Session,
    last_error: Option<String>,
}

impl FfiSession {
    fn record<T>(&mut self, result: um_core::Result<T>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(e) => {
                warn!(error = %e, "ffi call failed");
                self.last_error = Some(e.to_string());
                None
            }
        }
    }

    fn status<T>(&mut self, result: um_core::Result<T>) -> c_int {
        match self.record(result) {
            Some(_) => 0,
            None => -1,
        }
    }
}

fn side_from(value: c_int) -> Option<Side> {
    match value {
        0 => Some(Side::Left),
        1 => Some(Side::Right),
        _ => None,
    }
}

fn category_from(value: c_int) -> Option<Category> {
    match value {
        0 => Some(Category::LeftOnly),
        1 => Some(Category::RightOnly),
        2 => Some(Category::Identical),
        3 => Some(Category::Conflict),
        _ => None,
    }
}

unsafe fn str_arg<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        None
    } else {
        CStr::from_ptr(s).to_str().ok()
    }
}

fn into_c_string(s: String) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Create a session with the default configuration
#[no_mangle]
pub extern "C" fn um_session_new() -> *mut FfiSession {
    Box::into_raw(Box::new(FfiSession {
        inner: Session::default(),
        last_error: None,
    }))
}

/// Free a session
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new` or null
#[no_mangle]
pub unsafe extern "C" fn um_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Load document text as one side
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `name` and `text` must be valid UTF-8 C strings
#[no_mangle]
pub unsafe extern "C" fn um_session_load(
    session: *mut FfiSession,
    side: c_int,
    name: *const c_char,
    text: *const c_char,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;

    let (Some(side), Some(name), Some(text)) = (side_from(side), str_arg(name), str_arg(text))
    else {
        session.last_error = Some("invalid side, name or text".to_string());
        return -1;
    };

    let result = session.inner.load(side, name, text);
    session.status(result)
}

/// Number of conditions in a category, 0 before both sides are loaded
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
#[no_mangle]
pub unsafe extern "C" fn um_session_count(session: *const FfiSession, category: c_int) -> usize {
    if session.is_null() {
        return 0;
    }
    match (category_from(category), (*session).inner.partition()) {
        (Some(category), Some(partition)) => partition.conditions(category).len(),
        _ => 0,
    }
}

/// Condition at `index` within a category
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `um_free_string`
#[no_mangle]
pub unsafe extern "C" fn um_session_condition(
    session: *const FfiSession,
    category: c_int,
    index: usize,
) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    match (category_from(category), (*session).inner.partition()) {
        (Some(category), Some(partition)) => partition
            .conditions(category)
            .get(index)
            .map(|c| into_c_string(c.to_string()))
            .unwrap_or(ptr::null_mut()),
        _ => ptr::null_mut(),
    }
}

/// Choose a side for one conflict
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `condition` must be a valid UTF-8 C string
#[no_mangle]
pub unsafe extern "C" fn um_session_resolve(
    session: *mut FfiSession,
    condition: *const c_char,
    side: c_int,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;
    let (Some(condition), Some(side)) = (str_arg(condition), side_from(side)) else {
        session.last_error = Some("invalid condition or side".to_string());
        return -1;
    };
    let result = session.inner.resolve(condition, side);
    session.status(result)
}

/// Choose the same side for every conflict
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
#[no_mangle]
pub unsafe extern "C" fn um_session_resolve_all(session: *mut FfiSession, side: c_int) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;
    let Some(side) = side_from(side) else {
        session.last_error = Some("invalid side".to_string());
        return -1;
    };
    let result = session.inner.resolve_all(side);
    session.status(result)
}

/// Flip inclusion of one condition
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `condition` must be a valid UTF-8 C string
#[no_mangle]
pub unsafe extern "C" fn um_session_toggle(
    session: *mut FfiSession,
    condition: *const c_char,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;
    let Some(condition) = str_arg(condition) else {
        session.last_error = Some("invalid condition".to_string());
        return -1;
    };
    let result = session.inner.toggle(condition);
    session.status(result)
}

/// Select-all / deselect-all over an arbitrary list of conditions
///
/// Every listed condition becomes excluded if all were included, otherwise
/// all become included. An empty list changes nothing but is still undoable.
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `conditions` must point to `count` valid UTF-8 C strings (may be null when `count` is 0)
#[no_mangle]
pub unsafe extern "C" fn um_session_toggle_all(
    session: *mut FfiSession,
    conditions: *const *const c_char,
    count: usize,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;
    if conditions.is_null() && count > 0 {
        session.last_error = Some("invalid condition list".to_string());
        return -1;
    }

    let mut keys = Vec::with_capacity(count);
    for i in 0..count {
        match str_arg(*conditions.add(i)) {
            Some(key) => keys.push(key),
            None => {
                session.last_error = Some(format!("invalid condition at index {}", i));
                return -1;
            }
        }
    }

    let result = session.inner.toggle_all(&keys);
    session.status(result)
}

/// Select-all / deselect-all over one category
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
#[no_mangle]
pub unsafe extern "C" fn um_session_toggle_category(
    session: *mut FfiSession,
    category: c_int,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;
    let Some(category) = category_from(category) else {
        session.last_error = Some("invalid category".to_string());
        return -1;
    };
    let result = session.inner.toggle_category(category);
    session.status(result)
}

/// Undo the last resolve or toggle
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
#[no_mangle]
pub unsafe extern "C" fn um_session_undo(session: *mut FfiSession) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &mut *session;
    let result = session.inner.undo();
    session.status(result)
}

/// True when every conflict has a resolution
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
#[no_mangle]
pub unsafe extern "C" fn um_session_can_export(session: *const FfiSession) -> bool {
    !session.is_null() && (*session).inner.can_export()
}

/// Export state of one condition: `0` included, `1` excluded, `2` pending
///
/// Returns `-1` for an unknown condition or before both sides are loaded.
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `condition` must be a valid UTF-8 C string
#[no_mangle]
pub unsafe extern "C" fn um_session_inclusion_state(
    session: *const FfiSession,
    condition: *const c_char,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    match str_arg(condition).and_then(|c| (*session).inner.inclusion_state(c)) {
        Some(InclusionState::Included) => 0,
        Some(InclusionState::Excluded) => 1,
        Some(InclusionState::PendingResolution) => 2,
        None => -1,
    }
}

/// Side chosen for one conflict, `-1` while unresolved
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `condition` must be a valid UTF-8 C string
#[no_mangle]
pub unsafe extern "C" fn um_session_resolution(
    session: *const FfiSession,
    condition: *const c_char,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    match str_arg(condition).and_then(|c| (*session).inner.resolutions().get(c)) {
        Some(Side::Left) => 0,
        Some(Side::Right) => 1,
        None => -1,
    }
}

/// Pretty JSON of the record at `index` within a category
///
/// For the conflict category the object holds `condition`, `left` and `right`.
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - Returns null if the index is out of bounds or on error
/// - Caller must free the returned string with `um_free_string`
#[no_mangle]
pub unsafe extern "C" fn um_session_record_json(
    session: *mut FfiSession,
    category: c_int,
    index: usize,
) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    let session = &mut *session;
    let Some(category) = category_from(category) else {
        session.last_error = Some("invalid category".to_string());
        return ptr::null_mut();
    };

    let result = session.inner.require_partition().and_then(|p| {
        let json = match category {
            Category::LeftOnly => p.left_only.get(index).map(serde_json::to_string_pretty),
            Category::RightOnly => p.right_only.get(index).map(serde_json::to_string_pretty),
            Category::Identical => p.identical.get(index).map(serde_json::to_string_pretty),
            Category::Conflict => p.conflicts.get(index).map(serde_json::to_string_pretty),
        };
        json.transpose().map_err(um_core::Error::from)
    });

    match session.record(result) {
        Some(Some(json)) => into_c_string(json),
        Some(None) => {
            session.last_error = Some(format!("no {} record at index {}", category, index));
            ptr::null_mut()
        }
        None => ptr::null_mut(),
    }
}

/// Merged document as pretty JSON
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - Returns null while conflicts are unresolved or on error
/// - Caller must free the returned string with `um_free_string`
#[no_mangle]
pub unsafe extern "C" fn um_session_export_json(session: *mut FfiSession) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    let session = &mut *session;
    let result = session.inner.export().and_then(|doc| doc.to_pretty_json());
    session
        .record(result)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Line diff of one conflict, one line per diff line prefixed with ' ', '-' or '+'
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - `condition` must be a valid UTF-8 C string
/// - Returns null if the condition is not a conflict, with the reason in `um_session_last_error`
/// - Caller must free the returned string with `um_free_string`
#[no_mangle]
pub unsafe extern "C" fn um_session_conflict_diff(
    session: *mut FfiSession,
    condition: *const c_char,
) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    let session = &mut *session;
    let Some(condition) = str_arg(condition) else {
        session.last_error = Some("invalid condition".to_string());
        return ptr::null_mut();
    };

    let result = session.inner.conflict_diff(condition).map(|lines| {
        lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    });
    session
        .record(result)
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Message of the last failed call, null if the last call succeeded
///
/// # Safety
/// - `session` must be a valid pointer returned by `um_session_new`
/// - Caller must free the returned string with `um_free_string`
#[no_mangle]
pub unsafe extern "C" fn um_session_last_error(session: *const FfiSession) -> *mut c_char {
    if session.is_null() {
        return ptr::null_mut();
    }
    (*session)
        .last_error
        .clone()
        .map(into_c_string)
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a um_* function or null
#[no_mangle]
pub unsafe extern "C" fn um_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    unsafe fn take(s: *mut c_char) -> Option<String> {
        if s.is_null() {
            return None;
        }
        let owned = CStr::from_ptr(s).to_str().unwrap().to_string();
        um_free_string(s);
        Some(owned)
    }

    unsafe fn loaded() -> *mut FfiSession {
        let session = um_session_new();
        let left = c(r#"{"utterances":[{"condition":"x","v":1},{"condition":"a"}]}"#);
        let right = c(r#"{"utterances":[{"condition":"x","v":2},{"condition":"b"}]}"#);
        assert_eq!(um_session_load(session, 0, c("l.json").as_ptr(), left.as_ptr()), 0);
        assert_eq!(um_session_load(session, 1, c("r.json").as_ptr(), right.as_ptr()), 0);
        session
    }

    #[test]
    fn test_counts_and_conditions() {
        unsafe {
            let session = loaded();
            assert_eq!(um_session_count(session, 0), 1);
            assert_eq!(um_session_count(session, 3), 1);
            assert_eq!(take(um_session_condition(session, 3, 0)).as_deref(), Some("x"));
            assert!(um_session_condition(session, 3, 5).is_null());
            um_session_free(session);
        }
    }

    #[test]
    fn test_export_after_resolution() {
        unsafe {
            let session = loaded();
            assert!(!um_session_can_export(session));
            assert!(um_session_export_json(session).is_null());
            let err = take(um_session_last_error(session)).unwrap();
            assert!(err.contains("unresolved"));

            assert_eq!(um_session_resolve(session, c("x").as_ptr(), 1), 0);
            assert!(um_session_can_export(session));

            let json = take(um_session_export_json(session)).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["utterances"][2]["v"], 2);
            assert!(um_session_last_error(session).is_null());
            um_session_free(session);
        }
    }

    #[test]
    fn test_toggle_and_undo() {
        unsafe {
            let session = loaded();
            assert_eq!(um_session_resolve_all(session, 0), 0);
            assert_eq!(um_session_toggle(session, c("a").as_ptr()), 0);

            let json = take(um_session_export_json(session)).unwrap();
            assert!(!json.contains("\"a\""));

            assert_eq!(um_session_undo(session), 0);
            let json = take(um_session_export_json(session)).unwrap();
            assert!(json.contains("\"a\""));
            um_session_free(session);
        }
    }

    #[test]
    fn test_conflict_diff_text() {
        unsafe {
            let session = loaded();
            let diff = take(um_session_conflict_diff(session, c("x").as_ptr())).unwrap();
            assert!(diff.contains("-   \"v\": 1"));
            assert!(diff.contains("+   \"v\": 2"));
            assert!(um_session_last_error(session).is_null());

            assert!(um_session_conflict_diff(session, c("a").as_ptr()).is_null());
            let err = take(um_session_last_error(session)).unwrap();
            assert!(err.contains("'a' is not a conflict"));
            um_session_free(session);
        }
    }

    #[test]
    fn test_bad_input_reports_error() {
        unsafe {
            let session = um_session_new();
            let bad = c("{}");
            assert_eq!(um_session_load(session, 0, c("bad.json").as_ptr(), bad.as_ptr()), -1);
            let err = take(um_session_last_error(session)).unwrap();
            assert!(err.contains("bad.json"));
            assert_eq!(um_session_load(session, 7, c("x").as_ptr(), bad.as_ptr()), -1);
            assert_eq!(um_session_resolve(session, c("x").as_ptr(), 0), -1);
            um_session_free(session);
        }
    }

    #[test]
    fn test_conflict_diff_before_compare_sets_error() {
        unsafe {
            let session = um_session_new();
            assert!(um_session_conflict_diff(session, c("x").as_ptr()).is_null());
            let err = take(um_session_last_error(session)).unwrap();
            assert!(err.contains("both documents"));
            assert!(um_session_conflict_diff(session, ptr::null()).is_null());
            assert!(take(um_session_last_error(session)).is_some());
            um_session_free(session);
        }
    }

    #[test]
    fn test_inclusion_state_and_resolution() {
        unsafe {
            let session = loaded();
            assert_eq!(um_session_inclusion_state(session, c("a").as_ptr()), 0);
            assert_eq!(um_session_inclusion_state(session, c("x").as_ptr()), 2);
            assert_eq!(um_session_inclusion_state(session, c("ghost").as_ptr()), -1);
            assert_eq!(um_session_resolution(session, c("x").as_ptr()), -1);

            assert_eq!(um_session_toggle(session, c("a").as_ptr()), 0);
            assert_eq!(um_session_resolve(session, c("x").as_ptr(), 1), 0);
            assert_eq!(um_session_inclusion_state(session, c("a").as_ptr()), 1);
            assert_eq!(um_session_inclusion_state(session, c("x").as_ptr()), 0);
            assert_eq!(um_session_resolution(session, c("x").as_ptr()), 1);
            um_session_free(session);
        }
    }

    #[test]
    fn test_record_json() {
        unsafe {
            let session = loaded();
            let json = take(um_session_record_json(session, 0, 0)).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value, serde_json::json!({"condition": "a"}));

            let json = take(um_session_record_json(session, 3, 0)).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["condition"], "x");
            assert_eq!(value["left"]["v"], 1);
            assert_eq!(value["right"]["v"], 2);

            assert!(um_session_record_json(session, 2, 0).is_null());
            let err = take(um_session_last_error(session)).unwrap();
            assert!(err.contains("index 0"));
            assert!(um_session_record_json(session, 9, 0).is_null());
            um_session_free(session);
        }
    }

    #[test]
    fn test_toggle_all_over_list() {
        unsafe {
            let session = loaded();
            let a = c("a");
            let b = c("b");
            let keys = [a.as_ptr(), b.as_ptr()];

            assert_eq!(um_session_toggle_all(session, keys.as_ptr(), keys.len()), 0);
            assert_eq!(um_session_inclusion_state(session, a.as_ptr()), 1);
            assert_eq!(um_session_inclusion_state(session, b.as_ptr()), 1);

            assert_eq!(um_session_toggle(session, a.as_ptr()), 0);
            assert_eq!(um_session_toggle_all(session, keys.as_ptr(), keys.len()), 0);
            assert_eq!(um_session_inclusion_state(session, a.as_ptr()), 0);
            assert_eq!(um_session_inclusion_state(session, b.as_ptr()), 0);

            assert_eq!(um_session_toggle_all(session, ptr::null(), 0), 0);
            assert_eq!(um_session_toggle_all(session, ptr::null(), 2), -1);
            let bad = [a.as_ptr(), ptr::null()];
            assert_eq!(um_session_toggle_all(session, bad.as_ptr(), bad.len()), -1);
            um_session_free(session);
        }
    }
}
