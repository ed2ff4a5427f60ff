//! Best-effort hidden/system attributes.
//!
//! Directory names already start with a dot, which hides them on Unix
//! listings. On Windows the `attrib` tool adds the hidden and system flags.

use std::path::Path;

use tracing::debug;

/// Mark `path` hidden where the platform supports it. Returns whether the
/// attribute is in effect. Never fails.
pub fn hide(path: &Path) -> bool {
    #[cfg(windows)]
    {
        let status = std::process::Command::new("attrib")
            .arg("+H")
            .arg("+S")
            .arg(path)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
        match status {
            Ok(s) if s.success() => true,
            Ok(s) => {
                debug!(path = %path.display(), status = %s, "attrib exited unsuccessfully");
                false
            },
            Err(e) => {
                debug!(path = %path.display(), error = %e, "could not run attrib");
                false
            },
        }
    }

    #[cfg(not(windows))]
    {
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if !hidden {
            debug!(path = %path.display(), "directory name is not dot-prefixed");
        }
        hidden
    }
}
