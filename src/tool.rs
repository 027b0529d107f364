//! Invocation of the external metadata tools (exiv2, jpegoptim).
//!
//! Every invocation blocks until the tool exits; success is the tool's exit
//! status. Nothing here interprets metadata.

use std::ffi::OsStr;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Runs external programs. Swappable so callers can observe invocations.
pub trait CommandRunner {
    /// Whether `program` can be invoked at all.
    fn is_available(&self, program: &Path) -> bool {
        is_executable(program)
    }

    /// Run `program` with `args`, returning whether it exited successfully.
    fn run(&self, program: &Path, args: &[&OsStr]) -> Result<bool>;
}

/// Default runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[&OsStr]) -> Result<bool> {
        log::debug!("Running {} {:?}", program.display(), args);
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            );
        }
        Ok(output.status.success())
    }
}

/// Check that `path` points at an executable file.
pub fn is_executable(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Feed a command script to exiv2 (`exiv2 -m <script> <image>`).
///
/// The script lives in a temporary file for the duration of the call only;
/// it is removed on every return path, including errors.
pub fn run_exiv2_script(
    runner: &dyn CommandRunner,
    exiv2: &Path,
    script: &[u8],
    image: &Path,
) -> Result<bool> {
    let mut file = tempfile::Builder::new()
        .prefix("image-metadata-")
        .suffix(".exv")
        .tempfile()?;
    file.write_all(script)?;
    file.flush()?;

    runner.run(
        exiv2,
        &[OsStr::new("-m"), file.path().as_os_str(), image.as_os_str()],
    )
}

/// Remove XMP, comments, IPTC and EXIF from `path` in place using jpegoptim.
pub fn strip_metadata(runner: &dyn CommandRunner, jpegoptim: &Path, path: &Path) -> Result<bool> {
    if !runner.is_available(jpegoptim) {
        return Err(Error::Save("jpegoptim is missing".to_string()));
    }

    let ok = runner.run(
        jpegoptim,
        &[
            OsStr::new("--strip-xmp"),
            OsStr::new("--strip-com"),
            OsStr::new("--strip-iptc"),
            OsStr::new("--strip-exif"),
            path.as_os_str(),
        ],
    )?;
    if ok {
        log::info!("Stripped metadata from {}", path.display());
    }
    Ok(ok)
}
