//! Workbook resolution: reuse an open document or open it from disk.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};
use crate::host::{SpreadsheetHost, WorkbookId};

/// Where to find a workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// A file path. When it does not exist, its directory is searched for the
    /// file name.
    Path(PathBuf),
    /// A file name (wildcards allowed) inside a directory.
    InDirectory { dir: PathBuf, file_name: String },
}

impl Locator {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Locator::Path(path.into())
    }

    pub fn in_directory(dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Locator::InDirectory {
            dir: dir.into(),
            file_name: file_name.into(),
        }
    }

    /// The file name as written by the caller.
    fn literal_name(&self) -> Option<String> {
        match self {
            Locator::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            Locator::InDirectory { file_name, .. } => Some(file_name.clone()),
        }
    }
}

impl From<&str> for Locator {
    fn from(path: &str) -> Self {
        Locator::Path(PathBuf::from(path))
    }
}

impl From<String> for Locator {
    fn from(path: String) -> Self {
        Locator::Path(PathBuf::from(path))
    }
}

impl From<&Path> for Locator {
    fn from(path: &Path) -> Self {
        Locator::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Locator {
    fn from(path: PathBuf) -> Self {
        Locator::Path(path)
    }
}

/// A workbook file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    /// File name, which is also the host's display name for the document.
    pub display_name: String,
}

/// Return the open document matching the locator, or open it from disk.
///
/// Disk resolution runs first; the display name it yields is then matched
/// against the open documents. Resolving the same locator twice never opens
/// the file twice.
pub fn resolve<H: SpreadsheetHost + ?Sized>(host: &mut H, locator: &Locator) -> Result<WorkbookId> {
    let resolved = match locate_on_disk(locator) {
        Ok(resolved) => resolved,
        Err(e @ (Error::WorkbookNotFound(_) | Error::InvalidLocator(_))) => {
            // Unsaved documents ("Book1") exist only inside the host.
            if let Some(name) = locator.literal_name() {
                if let Some(open) = find_open(host, &name)? {
                    tracing::debug!("{name} is not on disk but is open as {open}");
                    return Ok(open);
                }
            }
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if let Some(open) = find_open(host, &resolved.display_name)? {
        tracing::debug!("{} already open as {open}", resolved.display_name);
        return Ok(open);
    }

    tracing::info!("Opening {}", resolved.path.display());
    host.open(&resolved.path)
}

/// First open document whose display name equals `name`, ignoring case.
pub fn find_open<H: SpreadsheetHost + ?Sized>(host: &mut H, name: &str) -> Result<Option<WorkbookId>> {
    let wanted = name.to_lowercase();
    for workbook in host.list_open_documents()? {
        if host.document_name(workbook)?.to_lowercase() == wanted {
            return Ok(Some(workbook));
        }
    }
    Ok(None)
}

/// Turn a locator into an existing file path.
pub fn locate_on_disk(locator: &Locator) -> Result<ResolvedPath> {
    let (dir, pattern, candidate) = match locator {
        Locator::Path(path) => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::InvalidLocator(format!("'{}' has no file name", path.display()))
                })?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf);
            (dir, name, path.clone())
        }
        Locator::InDirectory { dir, file_name } => {
            (Some(dir.clone()), file_name.clone(), dir.join(file_name))
        }
    };

    if candidate.is_file() {
        return Ok(resolved(candidate));
    }

    let dir = dir.ok_or_else(|| {
        Error::InvalidLocator(format!(
            "'{}' does not exist and has no directory to search",
            candidate.display()
        ))
    })?;

    match search_directory(&dir, &pattern)? {
        Some(found) => {
            tracing::debug!("Found {} for pattern {pattern}", found.display());
            Ok(resolved(found))
        }
        None => Err(Error::WorkbookNotFound(format!(
            "no file matching '{pattern}' in {}",
            dir.display()
        ))),
    }
}

/// Files in `dir` whose names match `pattern`, sorted; the first one wins.
///
/// `*` and `?` are wildcards and matching ignores case. A missing directory
/// counts as no match.
pub fn search_directory(dir: &Path, pattern: &str) -> Result<Option<PathBuf>> {
    let matcher = wildcard_regex(pattern)?;
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if matcher.is_match(&entry.file_name().to_string_lossy()) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches.into_iter().next())
}

fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| Error::InvalidLocator(format!("bad pattern '{pattern}': {e}")))
}

fn resolved(path: PathBuf) -> ResolvedPath {
    let display_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    ResolvedPath { path, display_name }
}
