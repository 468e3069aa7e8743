use crate::error::{ConfigurationError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| ConfigurationError::io(path, e))
}

pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| ConfigurationError::io(path, e))
}

pub(crate) fn write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigurationError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| ConfigurationError::io(path, e))
}

pub(crate) fn create_dir_all(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| ConfigurationError::io(path, e))
}

pub(crate) fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConfigurationError::io(path, e)),
    }
}

pub(crate) fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| ConfigurationError::io(from, e))
}

/// Subdirectories of `path` not starting with a dot, sorted by name.
pub(crate) fn subdirectories(path: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| ConfigurationError::io(path, e))? {
        let entry = entry.map_err(|e| ConfigurationError::io(path, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| ConfigurationError::io(entry.path(), e))?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if file_type.is_dir() && !name.starts_with('.') {
            dirs.push((name, entry.path()));
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every regular file below `root`, as `/`-separated paths relative to it.
/// Hidden entries are skipped.
pub(crate) fn files_below(root: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).map_err(|e| ConfigurationError::io(&dir, e))? {
            let entry = entry.map_err(|e| ConfigurationError::io(&dir, e))?;
            let path = entry.path();
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let file_type = entry
                .file_type()
                .map_err(|e| ConfigurationError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                if let Ok(rel) = path.strip_prefix(root) {
                    let parts: Vec<String> = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    out.push(parts.join("/"));
                }
            }
        }
    }
    out.sort();
    Ok(out)
}

/// Recursively copy `from` into `to`, creating `to` if needed.
pub(crate) fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    create_dir_all(to)?;
    for rel in files_below(from)? {
        let src = from.join(&rel);
        let dst = to.join(&rel);
        if let Some(parent) = dst.parent() {
            create_dir_all(parent)?;
        }
        fs::copy(&src, &dst).map_err(|e| ConfigurationError::io(&src, e))?;
    }
    Ok(())
}

/// Replace the directory `target` by a copy of `source`, going through a
/// staging directory next to `target` so that a failed copy leaves `target`
/// untouched.
pub(crate) fn replace_dir_with_copy(source: &Path, target: &Path) -> Result<()> {
    let staging = staging_path(target);
    remove_dir_all(&staging)?;
    copy_dir(source, &staging)?;
    swap_in(&staging, target)
}

/// Move a fully prepared `staging` directory to `target`.
pub(crate) fn swap_in(staging: &Path, target: &Path) -> Result<()> {
    remove_dir_all(target)?;
    rename(staging, target)
}

/// Hidden sibling of `target`; dot directories are skipped when parsing.
pub(crate) fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.staging"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_and_replace() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        write(&src.join("a/b/c.json"), b"{}").unwrap();
        write(&src.join("top"), b"1").unwrap();

        let dst = tmp.path().join("dst");
        write(&dst.join("stale"), b"old").unwrap();
        replace_dir_with_copy(&src, &dst).unwrap();

        assert_eq!(files_below(&dst).unwrap(), vec!["a/b/c.json", "top"]);
        assert!(!staging_path(&dst).exists());
    }

    #[test]
    fn subdirectories_skip_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        create_dir_all(&tmp.path().join("b")).unwrap();
        create_dir_all(&tmp.path().join("a")).unwrap();
        create_dir_all(&tmp.path().join(".a.staging")).unwrap();
        write(&tmp.path().join("file"), b"").unwrap();
        let names: Vec<String> = subdirectories(tmp.path())
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
