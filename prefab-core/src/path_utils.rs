//! Save path utilities
//!
//! Prefabs are addressed by asset-database URLs (`db://assets/ui/Hero.prefab`).
//! Windows callers may hand in backslashes; URLs always use forward slashes.

use std::path::{Path, PathBuf};

/// URL scheme of the asset database
pub const DB_SCHEME: &str = "db://";

/// Prefab file extension
pub const PREFAB_EXT: &str = ".prefab";

/// Meta file suffix appended to an asset path
pub const META_SUFFIX: &str = ".meta";

/// Normalize path to forward slashes
#[inline]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Sanitize a prefab name for use as a file name
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Turn a caller-supplied save path into a full prefab URL.
///
/// Paths already ending in `.prefab` are kept; anything else is treated as a
/// folder and `<name>.prefab` is appended.
pub fn normalize_save_path(save_path: &str, prefab_name: &str) -> String {
    let path = normalize_path(save_path.trim());
    if path.ends_with(PREFAB_EXT) {
        return path;
    }
    let folder = path.trim_end_matches('/');
    format!("{}/{}{}", folder, sanitize_filename(prefab_name), PREFAB_EXT)
}

/// Map an asset URL onto the project directory.
///
/// `db://assets/ui/Hero.prefab` becomes `<root>/assets/ui/Hero.prefab`;
/// anything without the `db://` scheme is taken as relative to `root`
/// (or used as-is when absolute).
pub fn resolve_db_url(root: &Path, url: &str) -> PathBuf {
    let normalized = normalize_path(url);
    match normalized.strip_prefix(DB_SCHEME) {
        Some(rest) => rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(root.to_path_buf(), |path, segment| path.join(segment)),
        None => {
            let path = PathBuf::from(&normalized);
            if path.is_absolute() {
                path
            } else {
                root.join(path)
            }
        }
    }
}

/// Path of the `.meta` file next to `asset`
pub fn meta_path(asset: &Path) -> PathBuf {
    let mut os = asset.as_os_str().to_os_string();
    os.push(META_SUFFIX);
    PathBuf::from(os)
}
