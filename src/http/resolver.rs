//! Request path resolution against the document root
//!
//! The resolver is the only barrier between request targets and the rest of
//! the filesystem. Containment is decided on the decoded, lexically
//! normalized candidate, compared component by component with the
//! normalized root.

use percent_encoding::percent_decode_str;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

/// The request target escapes the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forbidden;

impl fmt::Display for Forbidden {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("path escapes document root")
    }
}

impl std::error::Error for Forbidden {}

/// Maps request targets to files below a fixed document root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    index_file: String,
}

impl PathResolver {
    /// Create a resolver rooted at `root`.
    ///
    /// The root is made absolute against the current directory and
    /// normalized once here. Existence is not checked.
    pub fn new(root: impl AsRef<Path>, index_file: impl Into<String>) -> io::Result<Self> {
        let root = normalize(&std::path::absolute(root.as_ref())?);
        Ok(Self {
            root,
            index_file: index_file.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a raw request target to a file path under the root.
    ///
    /// Directory-like targets (`/`, `/docs/`, `/docs/.`) get the index file
    /// appended. Whether the target exists is not this function's concern.
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf, Forbidden> {
        let decoded = decode_target(request_path)?;

        if decoded.contains('\0') {
            return Err(Forbidden);
        }

        let relative = decoded.replace('\\', "/");
        let relative = relative.trim_start_matches('/');

        let names_directory = match relative.rsplit('/').next() {
            None | Some("") | Some(".") | Some("..") => true,
            Some(_) => false,
        };

        let candidate = normalize(&self.root.join(relative));

        // Component-wise: `/srv/www-evil` does not start with `/srv/www`
        if !candidate.starts_with(&self.root) {
            return Err(Forbidden);
        }

        if names_directory {
            Ok(candidate.join(&self.index_file))
        } else {
            Ok(candidate)
        }
    }
}

/// Reduce a request target to a percent-decoded path string.
///
/// Absolute-form targets keep their raw path; only scheme and authority are
/// removed, so dot segments reach the same normalization as origin-form.
fn decode_target(target: &str) -> Result<String, Forbidden> {
    let path = match absolute_form_path(target)? {
        Some(path) => path,
        None => target,
    };

    let end = path.find(['?', '#']).unwrap_or(path.len());
    Ok(percent_decode_str(&path[..end]).decode_utf8_lossy().into_owned())
}

/// Path portion of an `http`/`https` absolute-form target, scheme matched
/// case-insensitively. `None` for origin-form targets.
fn absolute_form_path(target: &str) -> Result<Option<&str>, Forbidden> {
    let Some((scheme, rest)) = target.split_once("://") else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
        return Ok(None);
    }

    let url = url::Url::parse(target).map_err(|_| Forbidden)?;
    if url.host_str().is_none() {
        return Err(Forbidden);
    }

    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    Ok(Some(&rest[authority_end..]))
}

/// Lexically resolve `.` and `..` without touching the filesystem.
///
/// `..` at the filesystem root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}
