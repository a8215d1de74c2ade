use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

use crate::config::Config;
use crate::error::{Result, StampError};
use crate::git::CommitSource;
use crate::record::TimestampRecord;

/// What one run produced.
#[derive(Debug, Clone)]
pub struct Stamp {
    pub record: TimestampRecord,
    pub text: String,
}

/// Compose the stamp for `now` and overwrite `config.output` with it.
pub fn run<Tz: TimeZone>(
    config: &Config,
    source: &dyn CommitSource,
    now: &DateTime<Tz>,
) -> Result<Stamp> {
    let commit = match source.latest_commit() {
        Ok(c) => {
            tracing::debug!(hash = %c.short_hash, subject = %c.subject, "latest commit");
            Some(c)
        }
        Err(e) if !config.strict => {
            tracing::warn!(error = %e, "no commit information, writing empty commit fields");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let record = TimestampRecord::new(now, commit.as_ref(), &config.zone, config.precision);
    let text = config.template.render(&record);
    write_replacing(&config.output, &text)?;
    tracing::info!(path = %config.output.display(), bytes = text.len(), "timestamp written");

    Ok(Stamp { record, text })
}

/// Replace `path` with `contents` in one rename. The parent directory must exist.
///
/// A symlinked output is written through to its target, and a new file gets
/// the usual umask-filtered mode, same as a plain `open(path, "w")`.
fn write_replacing(path: &Path, contents: &str) -> Result<()> {
    let fail = |source: io::Error| StampError::Write {
        path: path.to_path_buf(),
        source,
    };
    let target = resolve_symlink(path).map_err(fail)?;
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut builder = tempfile::Builder::new();
    builder.prefix(".docstamp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // the kernel applies the umask on create
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(dir).map_err(fail)?;
    tmp.write_all(contents.as_bytes()).map_err(fail)?;
    tmp.as_file().sync_all().map_err(fail)?;
    // keep the mode of a file we are replacing
    if let Ok(meta) = fs::metadata(&target) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(fail)?;
    }
    tmp.persist(&target).map_err(|e| fail(e.error))?;
    Ok(())
}

/// Follow `path` if it is a symlink, even a dangling one.
fn resolve_symlink(path: &Path) -> io::Result<PathBuf> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => match fs::canonicalize(path) {
            Ok(real) => Ok(real),
            Err(_) => {
                let link = fs::read_link(path)?;
                Ok(match path.parent() {
                    Some(parent) => parent.join(link),
                    None => link,
                })
            }
        },
        _ => Ok(path.to_path_buf()),
    }
}
