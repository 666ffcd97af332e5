// CLASSIFICATION: COMMUNITY
// Filename: block.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Block device capture.
//!
//! `/sys/block/<dev>` entries are symlinks into the device tree. Globbing
//! through them would recurse into `subsystem` and other circular links, so
//! block devices are mirrored directly: the symlink is recreated, the backing
//! directory is created at the link target, and only its plain attribute
//! files, partition subdirectories and `queue/rotational` are copied.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, trace, warn};

use super::staging::{make_symlink, stage_file, StagingStats};
use super::{path_err, SnapshotError};
use crate::utils::paths::{clean, is_contained};

/// Loop devices describe files, not hardware.
const SKIP_PREFIXES: &[&str] = &["loop"];

#[derive(Debug)]
pub struct BlockDeviceCloner<'a> {
    /// `sys/block` on the source side.
    source_block: PathBuf,
    /// Staging tree root.
    build_root: &'a Path,
}

impl<'a> BlockDeviceCloner<'a> {
    pub fn new(source_block: impl Into<PathBuf>, build_root: &'a Path) -> Self {
        Self {
            source_block: source_block.into(),
            build_root,
        }
    }

    /// Mirror every non-loop block device into the staging tree.
    pub fn clone_into(&self, stats: &mut StagingStats) -> Result<(), SnapshotError> {
        let entries = match fs::read_dir(&self.source_block) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("block: {} missing, no devices", self.source_block.display());
                return Ok(());
            }
            Err(err) => return Err(path_err("readdir", &self.source_block)(err)),
        };
        for entry in entries {
            let entry = entry.map_err(path_err("readdir", &self.source_block))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if SKIP_PREFIXES.iter().any(|p| name.starts_with(p)) {
                continue;
            }
            self.clone_device(&name, stats)?;
        }
        Ok(())
    }

    fn clone_device(&self, name: &str, stats: &mut StagingStats) -> Result<(), SnapshotError> {
        let dev_path = self.source_block.join(name);
        let target = fs::read_link(&dev_path).map_err(path_err("readlink", &dev_path))?;
        trace!("block: {} -> {}", dev_path.display(), target.display());

        // The target is relative to sys/block; it has to stay relative or the
        // expanded snapshot would point back into this build directory.
        let rel_device_dir = clean(&Path::new("sys/block").join(&target));
        if target.is_absolute() || !is_contained(&rel_device_dir) {
            warn!(
                "block: {} links outside the tree ({}) - skipped",
                dev_path.display(),
                target.display()
            );
            return Ok(());
        }
        let build_device_dir = self.build_root.join(&rel_device_dir);
        fs::create_dir_all(&build_device_dir).map_err(path_err("mkdir", &build_device_dir))?;

        let link_path = self.build_root.join("sys/block").join(name);
        make_symlink(&target, &link_path).map_err(path_err("symlink", &link_path))?;
        stats.links += 1;

        copy_device_dir(&dev_path, &build_device_dir, name, stats)?;
        copy_rotational(&dev_path, &build_device_dir, stats)
    }
}

/// Copy the plain files of a device directory plus those of partition
/// subdirectories (named after the device, e.g. `sda1` under `sda`).
fn copy_device_dir(
    src: &Path,
    dest: &Path,
    dev_name: &str,
    stats: &mut StagingStats,
) -> Result<(), SnapshotError> {
    for entry in fs::read_dir(src).map_err(path_err("readdir", src))? {
        let entry = entry.map_err(path_err("readdir", src))?;
        let fname = entry.file_name();
        let path = entry.path();
        let meta = fs::symlink_metadata(&path).map_err(path_err("lstat", &path))?;
        if meta.file_type().is_symlink() {
            // subsystem, bdi, device and friends: self-referential or
            // uninteresting.
            continue;
        }
        if meta.is_dir() {
            if fname.to_string_lossy().starts_with(dev_name) {
                let part_dest = dest.join(&fname);
                fs::create_dir_all(&part_dest).map_err(path_err("mkdir", &part_dest))?;
                copy_partition_dir(&path, &part_dest, stats)?;
            }
            continue;
        }
        if meta.is_file() {
            copy_attr(&path, &dest.join(&fname), stats)?;
        }
    }
    Ok(())
}

fn copy_partition_dir(src: &Path, dest: &Path, stats: &mut StagingStats) -> Result<(), SnapshotError> {
    for entry in fs::read_dir(src).map_err(path_err("readdir", src))? {
        let entry = entry.map_err(path_err("readdir", src))?;
        let path = entry.path();
        let meta = fs::symlink_metadata(&path).map_err(path_err("lstat", &path))?;
        if meta.is_file() {
            copy_attr(&path, &dest.join(entry.file_name()), stats)?;
        }
    }
    Ok(())
}

/// `queue/rotational` tells spinning disks from solid state ones.
fn copy_rotational(src: &Path, dest: &Path, stats: &mut StagingStats) -> Result<(), SnapshotError> {
    let rotational = src.join("queue/rotational");
    if !rotational.exists() {
        return Ok(());
    }
    let queue = dest.join("queue");
    fs::create_dir_all(&queue).map_err(path_err("mkdir", &queue))?;
    copy_attr(&rotational, &queue.join("rotational"), stats)
}

fn copy_attr(src: &Path, dest: &Path, stats: &mut StagingStats) -> Result<(), SnapshotError> {
    stage_file(src, dest, stats).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::tempdir;

    const NVME: &str = "devices/pci0000:00/0000:00:1d.0/0000:3d:00.0/nvme/nvme0/nvme0n1";

    fn block_tree(root: &Path) {
        let sys_block = root.join("sys/block");
        fs::create_dir_all(&sys_block).unwrap();

        let dev = root.join("sys").join(NVME);
        fs::create_dir_all(dev.join("queue")).unwrap();
        fs::create_dir_all(dev.join("nvme0n1p1")).unwrap();
        fs::create_dir_all(dev.join("holders")).unwrap();
        fs::write(dev.join("size"), b"1000215216\n").unwrap();
        fs::write(dev.join("ro"), b"0\n").unwrap();
        fs::write(dev.join("queue/rotational"), b"0\n").unwrap();
        fs::write(dev.join("queue/scheduler"), b"[none]\n").unwrap();
        fs::write(dev.join("nvme0n1p1/size"), b"1048576\n").unwrap();
        fs::write(dev.join("nvme0n1p1/start"), b"2048\n").unwrap();
        symlink("../../../../../../../class/block", dev.join("subsystem")).unwrap();
        symlink(format!("../{NVME}"), sys_block.join("nvme0n1")).unwrap();

        let loop_dev = root.join("sys/devices/virtual/block/loop0");
        fs::create_dir_all(&loop_dev).unwrap();
        fs::write(loop_dev.join("size"), b"0\n").unwrap();
        symlink("../devices/virtual/block/loop0", sys_block.join("loop0")).unwrap();
    }

    #[test]
    fn mirrors_devices_and_partitions() {
        let src = tempdir().expect("src");
        let build = tempdir().expect("build");
        block_tree(src.path());
        fs::create_dir_all(build.path().join("sys/block")).unwrap();

        let mut stats = StagingStats::default();
        BlockDeviceCloner::new(src.path().join("sys/block"), build.path())
            .clone_into(&mut stats)
            .unwrap();

        let b = build.path();
        assert_eq!(
            fs::read_link(b.join("sys/block/nvme0n1")).unwrap(),
            PathBuf::from(format!("../{NVME}"))
        );
        let dev = b.join("sys").join(NVME);
        assert_eq!(fs::read(dev.join("size")).unwrap(), b"1000215216\n");
        assert_eq!(fs::read(dev.join("nvme0n1p1/start")).unwrap(), b"2048\n");
        assert_eq!(fs::read(dev.join("queue/rotational")).unwrap(), b"0\n");
        assert!(!dev.join("queue/scheduler").exists());
        assert!(!dev.join("holders").exists());
        assert!(fs::symlink_metadata(dev.join("subsystem")).is_err());
        assert!(!b.join("sys/block/loop0").exists());
        // size, ro, two partition files, rotational
        assert_eq!(stats.files, 5);
        assert_eq!(stats.links, 1);
    }

    #[test]
    fn missing_block_directory_is_empty() {
        let src = tempdir().expect("src");
        let build = tempdir().expect("build");
        let mut stats = StagingStats::default();
        BlockDeviceCloner::new(src.path().join("sys/block"), build.path())
            .clone_into(&mut stats)
            .unwrap();
        assert_eq!(stats, StagingStats::default());
    }

    #[test]
    fn escaping_links_are_skipped() {
        let src = tempdir().expect("src");
        let build = tempdir().expect("build");
        let sys_block = src.path().join("sys/block");
        fs::create_dir_all(&sys_block).unwrap();
        symlink("../../../../etc", sys_block.join("sdz")).unwrap();
        fs::create_dir_all(build.path().join("sys/block")).unwrap();

        let mut stats = StagingStats::default();
        BlockDeviceCloner::new(&sys_block, build.path())
            .clone_into(&mut stats)
            .unwrap();
        assert!(fs::symlink_metadata(build.path().join("sys/block/sdz")).is_err());
    }
}
