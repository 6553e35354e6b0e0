use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use std::path::{Path, PathBuf};

/// Extension appended to every stored body
pub const FILE_SUFFIX: &str = ".txt";

/// File name for a URL: padded URL-safe base64 of its UTF-8 bytes plus
/// [`FILE_SUFFIX`]
///
/// The same URL always maps to the same name, so a re-run overwrites.
///
/// # Examples
///
/// ```
/// use url_harvest::sink::file_name_for;
///
/// assert_eq!(file_name_for("http://a.b"), "aHR0cDovL2EuYg==.txt");
/// ```
pub fn file_name_for(url: &str) -> String {
    format!("{}{}", URL_SAFE.encode(url.as_bytes()), FILE_SUFFIX)
}

/// Full destination path for a URL inside `dir`
pub fn file_path_for(dir: &Path, url: &str) -> PathBuf {
    dir.join(file_name_for(url))
}
