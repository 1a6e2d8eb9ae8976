//! Input resolution: find `.docx` files and check they look like one.
//!
//! A `.docx` is a ZIP container, so every valid input starts with the local
//! file header magic `PK\x03\x04`. Checking it up front gives callers a
//! meaningful error instead of an opaque zip failure deep in parsing.

use crate::error::Docx2MdError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// ZIP local file header signature.
pub const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Validate that `path` exists, is readable and starts with the ZIP magic.
pub fn validate_docx(path: &Path) -> Result<(), Docx2MdError> {
    if !path.exists() {
        return Err(Docx2MdError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    match std::fs::File::open(path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            let read = f.read(&mut magic).unwrap_or(0);
            if read < magic.len() || magic != ZIP_MAGIC {
                return Err(Docx2MdError::NotADocx {
                    path: path.to_path_buf(),
                    magic,
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(Docx2MdError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(Docx2MdError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }

    debug!("Validated DOCX: {}", path.display());
    Ok(())
}

/// True for a `.docx` file name that is not a Word lock file (`~$name.docx`).
pub fn is_docx_name(name: &str) -> bool {
    !name.starts_with("~$")
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"))
}

/// List the `.docx` files directly inside `dir`, sorted by file name.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, Docx2MdError> {
    let entries = std::fs::read_dir(dir).map_err(|e| Docx2MdError::DirectoryFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Docx2MdError::DirectoryFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_docx = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_docx_name);
        if is_docx {
            found.push(path);
        }
    }

    found.sort();
    debug!("Discovered {} document(s) in {}", found.len(), dir.display());
    Ok(found)
}
