//! Opening redirection targets.
//!
//! A redirected stream is just a [`File`] threaded into the command in place
//! of the inherited handle. The file is owned by the dispatch scope and
//! closed when that scope ends, so release happens on every exit path.

use crate::lexer::RedirectionSpec;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

/// Open the target file of a redirection, creating missing parent
/// directories first. Truncates existing content unless the spec asks for
/// append mode.
pub(crate) fn open_target(spec: &RedirectionSpec) -> io::Result<File> {
    let path = Path::new(&spec.target);

    if let Some(parent) = path.parent() {
        // A bare filename has an empty parent; nothing to create then.
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true);
    if spec.append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options.open(path)
}
