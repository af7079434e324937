use std::fs::{self, File, FileType, Metadata, OpenOptions};
use std::io;
use std::path::Path;

use crate::error::{DumpError, Result};

/// OS services the core cannot express portably.
pub trait Platform {
    /// Size in bytes of the block device at `path`.
    fn block_device_size(&self, path: &Path) -> io::Result<u64>;

    /// Restart the machine. Returns `Ok` only if the restart was initiated.
    fn reboot_now(&self) -> io::Result<()>;
}

impl<P: Platform + ?Sized> Platform for &P {
    fn block_device_size(&self, path: &Path) -> io::Result<u64> {
        (**self).block_device_size(path)
    }

    fn reboot_now(&self) -> io::Result<()> {
        (**self).reboot_now()
    }
}

/// File types a dump can be read from or installed onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    CharDevice,
    BlockDevice,
}

impl FileKind {
    pub fn from_file_type(ft: FileType) -> Option<Self> {
        if ft.is_file() {
            return Some(Self::Regular);
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            if ft.is_char_device() {
                return Some(Self::CharDevice);
            }
            if ft.is_block_device() {
                return Some(Self::BlockDevice);
            }
        }
        None
    }

    /// `lstat` the path and classify it. Symlinks, directories, sockets and fifos are refused.
    pub fn probe(path: &Path) -> Result<(Self, Metadata)> {
        let meta = fs::symlink_metadata(path).map_err(|source| DumpError::Stat {
            path: path.to_path_buf(),
            source,
        })?;
        let kind = Self::from_file_type(meta.file_type()).ok_or_else(|| {
            DumpError::UnsupportedFileType {
                path: path.to_path_buf(),
            }
        })?;
        Ok((kind, meta))
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::Regular => "regular file",
            Self::CharDevice => "character device",
            Self::BlockDevice => "block device",
        }
    }
}

/// Size of a probed source. Block devices are measured through the platform; everything else
/// reports its stat size.
pub fn source_size<P: Platform + ?Sized>(
    path: &Path,
    kind: FileKind,
    meta: &Metadata,
    platform: &P,
) -> Result<u64> {
    match kind {
        FileKind::Regular | FileKind::CharDevice => Ok(meta.len()),
        FileKind::BlockDevice => {
            platform
                .block_device_size(path)
                .map_err(|source| DumpError::DeviceSize {
                    path: path.to_path_buf(),
                    source,
                })
        }
    }
}

/// Open `path` with `options`, refusing to follow a symlink in the final component.
pub(crate) fn open_no_follow(options: &mut OpenOptions, path: &Path) -> Result<File> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NOFOLLOW);
    }
    options.open(path).map_err(|source| DumpError::Open {
        path: path.to_path_buf(),
        source,
    })
}
