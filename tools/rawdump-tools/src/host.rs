use std::io;
use std::path::Path;

use rawdump::Platform;

/// The machine we are running on.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlatform;

// _IOR(0x12, 114, size_t) from <linux/fs.h>.
#[cfg(target_os = "linux")]
const BLKGETSIZE64: u64 =
    (2 << 30) | ((std::mem::size_of::<libc::size_t>() as u64) << 16) | (0x12 << 8) | 114;

impl Platform for HostPlatform {
    #[cfg(target_os = "linux")]
    fn block_device_size(&self, path: &Path) -> io::Result<u64> {
        use std::os::unix::io::AsRawFd;

        let file = std::fs::File::open(path)?;
        let mut size: u64 = 0;
        // SAFETY: the request writes one u64 through the pointer, which outlives the call.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64 as _, &mut size as *mut u64) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(size)
    }

    #[cfg(not(target_os = "linux"))]
    fn block_device_size(&self, _path: &Path) -> io::Result<u64> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "block device sizes are only available on Linux",
        ))
    }

    #[cfg(target_os = "linux")]
    fn reboot_now(&self) -> io::Result<()> {
        // SAFETY: reboot(2) takes no pointers.
        let rc = unsafe { libc::reboot(libc::RB_AUTOBOOT) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn reboot_now(&self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "reboot is only available on Linux",
        ))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn ioctl_number_matches_kernel_header() {
        #[cfg(target_pointer_width = "64")]
        assert_eq!(BLKGETSIZE64, 0x8008_1272);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(BLKGETSIZE64, 0x8004_1272);
    }

    #[test]
    fn regular_file_is_not_a_block_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(HostPlatform.block_device_size(file.path()).is_err());
    }
}
