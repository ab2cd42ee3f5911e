//! Free-space accounting for the firmware partition.

use std::path::{Path, PathBuf};

use fs4::available_space;
use loader_core::PartitionInfo;
use tracing::warn;

/// Queries total/free space for the filesystem mounted at a fixed path.
///
/// `used_bytes` is derived as `total - free` rather than tracked
/// separately, since the only thing callers need is
/// [`PartitionInfo::free_bytes`].
pub struct FilesystemPartition {
    mount_point: PathBuf,
    total_bytes: u64,
}

impl FilesystemPartition {
    /// Probe the filesystem mounted at `mount_point` for its total
    /// capacity, caching it for the life of this value.
    ///
    /// # Errors
    ///
    /// Propagates the underlying I/O error if `mount_point` cannot be
    /// statted.
    pub fn new(mount_point: impl Into<PathBuf>) -> std::io::Result<Self> {
        let mount_point = mount_point.into();
        let total_bytes = fs4::total_space(&mount_point)?;
        Ok(Self { mount_point, total_bytes })
    }

    fn free_bytes_or_zero(&self) -> u64 {
        available_space(&self.mount_point).unwrap_or_else(|err| {
            warn!(path = %self.mount_point.display(), %err, "failed to query free space");
            0
        })
    }
}

impl PartitionInfo for FilesystemPartition {
    fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    fn used_bytes(&self) -> u64 {
        self.total_bytes.saturating_sub(self.free_bytes_or_zero())
    }

    fn free_bytes(&self) -> u64 {
        self.free_bytes_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn reports_nonzero_total_and_free_space() {
        let dir = tempdir().unwrap();
        let partition = FilesystemPartition::new(dir.path()).unwrap();
        assert!(partition.total_bytes() > 0);
        assert!(partition.free_bytes() <= partition.total_bytes());
    }

    #[test]
    fn path_must_exist() {
        let path = Path::new("/definitely/not/a/real/mount/point/loader-sink-test");
        assert!(FilesystemPartition::new(path).is_err());
    }
}
