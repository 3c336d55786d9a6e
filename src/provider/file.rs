//! Filesystem metadata fields: path components, stat values, timestamps
//!
//! The I/O lives here, not in the engine; stat-derived values are cached
//! in the render context so a template touching `size`, `uid` and `user`
//! stats the file once per field at most.

use std::fs::Metadata;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::EvalError;
use crate::eval::EvalScope;
use crate::provider::{dates, FieldProvider, FieldRef, Resolved};

const NAMESPACES: [&str; 11] = [
    "filepath",
    "size",
    "uid",
    "gid",
    "user",
    "group",
    "created",
    "modified",
    "accessed",
    "today",
    "now",
];

pub struct FileProvider;

impl FieldProvider for FileProvider {
    fn namespaces(&self) -> &[&'static str] {
        &NAMESPACES
    }

    fn resolve(
        &self,
        field: &FieldRef<'_>,
        scope: &mut EvalScope<'_, '_>,
    ) -> Result<Option<Resolved>, EvalError> {
        match field.field {
            "filepath" => path_value(scope.file().path(), field.attributes).map(Some),
            "size" | "uid" | "gid" | "user" | "group" => {
                if let Some(values) = scope.cached(field.field, None, &[]) {
                    return Ok(Some(Resolved::new(values)));
                }
                let meta = stat(field.field, scope.file().path())?;
                let value = stat_value(field.field, &meta)?;
                scope.cache_insert(field.field, None, &[], vec![value.clone()]);
                Ok(Some(Resolved::one(value)))
            }
            "created" | "modified" | "accessed" => {
                let meta = stat(field.field, scope.file().path())?;
                let time = match field.field {
                    "created" => meta.created(),
                    "accessed" => meta.accessed(),
                    _ => meta.modified(),
                }
                .map_err(|e| EvalError::provider(field.field, e))?;
                let dt = DateTime::<Local>::from(time);
                dates::resolve_datetime(field.field, dt, field.attributes, field.default, scope)
                    .map(Some)
            }
            "today" => {
                let dt = scope.sticky_now();
                dates::resolve_datetime("today", dt, field.attributes, field.default, scope)
                    .map(Some)
            }
            "now" => {
                dates::resolve_datetime("now", Local::now(), field.attributes, field.default, scope)
                    .map(Some)
            }
            _ => Ok(None),
        }
    }
}

fn stat(namespace: &str, path: &Path) -> Result<Metadata, EvalError> {
    std::fs::metadata(path).map_err(|e| EvalError::provider(namespace, e))
}

/// Walk the `name`/`stem`/`suffix`/`parent` attribute chain; `parent` is
/// the only attribute that stays a path and may be chained further.
fn path_value(path: &Path, attributes: &[String]) -> Result<Resolved, EvalError> {
    let mut current: PathBuf = path.to_path_buf();
    let mut terminal: Option<String> = None;
    for attr in attributes {
        if terminal.is_some() {
            return Err(EvalError::unknown_field("filepath", Some(attr)));
        }
        match attr.as_str() {
            "parent" => {
                current = match current.parent() {
                    Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                    _ => PathBuf::from("."),
                };
            }
            "name" => {
                terminal = Some(
                    current
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
            }
            "stem" => {
                terminal = Some(
                    current
                        .file_stem()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                );
            }
            "suffix" => {
                terminal = Some(
                    current
                        .extension()
                        .map(|e| format!(".{}", e.to_string_lossy()))
                        .unwrap_or_default(),
                );
            }
            _ => return Err(EvalError::unknown_field("filepath", Some(attr))),
        }
    }
    let value = terminal.unwrap_or_else(|| current.display().to_string());
    Ok(Resolved::one(value))
}

#[cfg(unix)]
fn stat_value(field: &str, meta: &Metadata) -> Result<String, EvalError> {
    use std::os::unix::fs::MetadataExt;
    let value = match field {
        "size" => meta.len().to_string(),
        "uid" => meta.uid().to_string(),
        "gid" => meta.gid().to_string(),
        "user" => unix::user_name(meta.uid()).unwrap_or_else(|| meta.uid().to_string()),
        "group" => unix::group_name(meta.gid()).unwrap_or_else(|| meta.gid().to_string()),
        other => return Err(EvalError::unknown_field(other, None)),
    };
    Ok(value)
}

#[cfg(not(unix))]
fn stat_value(field: &str, meta: &Metadata) -> Result<String, EvalError> {
    match field {
        "size" => Ok(meta.len().to_string()),
        other => Err(EvalError::provider(
            other,
            "file ownership fields require a unix platform",
        )),
    }
}

#[cfg(unix)]
mod unix {
    use std::ffi::CStr;

    /// Reentrant passwd lookup; `None` when the id has no entry
    pub fn user_name(uid: u32) -> Option<String> {
        let mut buf = vec![0u8; 1024];
        loop {
            let mut pwd: libc::passwd = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::passwd = std::ptr::null_mut();
            let rc = unsafe {
                libc::getpwuid_r(
                    uid,
                    &mut pwd,
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE {
                let len = buf.len() * 2;
                buf.resize(len, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }
            let name = unsafe { CStr::from_ptr(pwd.pw_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }

    pub fn group_name(gid: u32) -> Option<String> {
        let mut buf = vec![0u8; 1024];
        loop {
            let mut grp: libc::group = unsafe { std::mem::zeroed() };
            let mut result: *mut libc::group = std::ptr::null_mut();
            let rc = unsafe {
                libc::getgrgid_r(
                    gid,
                    &mut grp,
                    buf.as_mut_ptr() as *mut libc::c_char,
                    buf.len(),
                    &mut result,
                )
            };
            if rc == libc::ERANGE {
                let len = buf.len() * 2;
                buf.resize(len, 0);
                continue;
            }
            if rc != 0 || result.is_null() {
                return None;
            }
            let name = unsafe { CStr::from_ptr(grp.gr_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }
}
