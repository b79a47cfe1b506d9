//! Store path normalisation.
//!
//! Store paths are `/`-delimited and always relative to the store root.
//! Leading, trailing and repeated slashes are insignificant, so `"/a//b/"`
//! and `"a/b"` address the same entry and `""` addresses the root.
//!
//! Rejected components:
//! - `.` and `..`
//! - anything containing `\` or a NUL byte

use crate::error::{StoreError, StoreResult};

/// Characters that are forbidden in any component.
const FORBIDDEN_CHARS: &[char] = &['\\', '\0'];

/// Split `path` into its non-empty components, validating each one.
pub fn components(path: &str) -> StoreResult<Vec<&str>> {
    let mut out = Vec::new();
    for component in path.split('/').filter(|c| !c.is_empty()) {
        if component == "." || component == ".." {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: format!("relative component {component:?}"),
            });
        }
        if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| component.contains(**ch)) {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: format!("contains forbidden character: {ch:?}"),
            });
        }
        out.push(component);
    }
    Ok(out)
}

/// The canonical spelling of `path`.
///
/// ```
/// use treekv_store::path::normalize;
///
/// assert_eq!(normalize("/loan//borrower_B1/").unwrap(), "loan/borrower_B1");
/// assert_eq!(normalize("").unwrap(), "");
/// assert!(normalize("loan/../identity").is_err());
/// ```
pub fn normalize(path: &str) -> StoreResult<String> {
    Ok(components(path)?.join("/"))
}

/// Append `child` to `parent`.
pub fn join(parent: &str, child: &str) -> String {
    let parent = parent.trim_end_matches('/');
    let child = child.trim_start_matches('/');
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}/{child}")
    }
}

/// The last non-empty component of `path`, if any.
pub fn file_name(path: &str) -> Option<&str> {
    path.split('/').filter(|c| !c.is_empty()).next_back()
}
