// CLASSIFICATION: COMMUNITY
// Filename: snapshot_roundtrip.rs v0.1
// Date Modified: 2026-10-15
// Author: Lukas Bower

use hwsnap::path::{PathOptions, Paths};
use hwsnap::snapshot::{self, CaptureConfig, Snapshotter, SnapshotError};
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(root: &Path, rel: &str, data: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, data).unwrap();
}

fn link(root: &Path, rel: &str, target: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    symlink(target, path).unwrap();
}

/// A small but complete host: one NUMA node, one CPU, a root port with a
/// NIC behind it, an integrated GPU, an NVMe disk and a loopback interface.
fn fake_host(root: &Path) {
    write(root, "proc/cpuinfo", "processor\t: 0\nvendor_id\t: GenuineIntel\n");
    write(root, "proc/meminfo", "MemTotal:       16318872 kB\n");
    write(root, "proc/self/mounts", "sysfs /sys sysfs rw,nosuid 0 0\n");

    let cpu = "sys/devices/system/cpu/cpu0";
    write(root, &format!("{cpu}/cache/index0/size"), "48K\n");
    write(root, &format!("{cpu}/cache/index0/level"), "1\n");
    write(root, &format!("{cpu}/topology/core_id"), "0\n");
    write(root, &format!("{cpu}/topology/physical_package_id"), "0\n");
    write(root, "sys/devices/system/cpu/online", "0\n");

    write(root, "sys/devices/system/memory/block_size_bytes", "8000000\n");
    write(root, "sys/devices/system/memory/memory0/online", "1\n");
    write(root, "sys/devices/system/memory/memory0/state", "online\n");
    write(root, "sys/devices/system/memory/memory0/phys_device", "0\n");

    let node = "sys/devices/system/node";
    write(root, &format!("{node}/has_cpu"), "0\n");
    write(root, &format!("{node}/online"), "0\n");
    write(root, &format!("{node}/possible"), "0\n");
    write(root, &format!("{node}/node0/distance"), "10\n");
    write(root, &format!("{node}/node0/meminfo"), "Node 0 MemTotal: 16318872 kB\n");
    write(
        root,
        &format!("{node}/node0/hugepages/hugepages-2048kB/nr_hugepages"),
        "0\n",
    );
    link(root, &format!("{node}/node0/cpu0"), "../../cpu/cpu0");
    link(root, &format!("{node}/node0/memory0"), "../../memory/memory0");

    let rc = "sys/devices/pci0000:00";
    for (dev, class) in [
        ("0000:00:00.0", "0x060000"),
        ("0000:00:02.0", "0x030000"),
        ("0000:00:1c.0", "0x060400"),
        ("0000:00:1c.0/0000:02:00.0", "0x020000"),
    ] {
        write(root, &format!("{rc}/{dev}/class"), &format!("{class}\n"));
        write(root, &format!("{rc}/{dev}/vendor"), "0x8086\n");
        write(root, &format!("{rc}/{dev}/numa_node"), "-1\n");
        write(root, &format!("{rc}/{dev}/config"), "binary config space");
        let addr = dev.rsplit('/').next().unwrap();
        link(root, &format!("sys/bus/pci/devices/{addr}"), &format!("../../../devices/pci0000:00/{dev}"));
    }
    // Second function of the NIC: present under its bridge, absent from the
    // flat bus listing.
    write(root, &format!("{rc}/0000:00:1c.0/0000:02:00.1/class"), "0x020000\n");
    write(root, &format!("{rc}/0000:00:1c.0/0000:02:00.1/vendor"), "0x8086\n");
    write(root, "sys/bus/pci/drivers/e1000e/new_id", "");
    write(root, "sys/bus/pci/drivers/i915/bind", "");
    link(
        root,
        &format!("{rc}/0000:00:1c.0/0000:02:00.0/driver"),
        "../../../../bus/pci/drivers/e1000e",
    );

    let nic = format!("{rc}/0000:00:1c.0/0000:02:00.0/net/enp2s0");
    write(root, &format!("{nic}/addr_assign_type"), "0\n");
    write(root, &format!("{nic}/address"), "52:54:00:12:34:56\n");
    link(root, "sys/class/net/enp2s0", "../../devices/pci0000:00/0000:00:1c.0/0000:02:00.0/net/enp2s0");
    write(root, "sys/devices/virtual/net/lo/addr_assign_type", "0\n");
    link(root, "sys/class/net/lo", "../../devices/virtual/net/lo");

    let card = format!("{rc}/0000:00:02.0/drm/card0");
    link(root, &format!("{card}/device"), "../../../0000:00:02.0");
    fs::create_dir_all(root.join(format!("{rc}/0000:00:02.0/drm/renderD128"))).unwrap();
    link(root, "sys/class/drm/card0", "../../devices/pci0000:00/0000:00:02.0/drm/card0");
    link(root, "sys/class/drm/renderD128", "../../devices/pci0000:00/0000:00:02.0/drm/renderD128");

    let nvme = "devices/pci0000:00/0000:00:1d.0/nvme/nvme0/nvme0n1";
    write(root, &format!("sys/{nvme}/size"), "1000215216\n");
    write(root, &format!("sys/{nvme}/queue/rotational"), "0\n");
    write(root, &format!("sys/{nvme}/nvme0n1p1/start"), "2048\n");
    link(root, "sys/block/nvme0n1", &format!("../{nvme}"));
}

fn rel<'a>(root: &Path, path: &'a Path) -> &'a Path {
    path.strip_prefix(root).unwrap()
}

#[test]
fn every_resolved_spec_survives_capture_and_expand() {
    let _ = env_logger::builder().is_test(true).try_init();
    let host = tempdir().expect("host");
    let work = tempdir().expect("work");
    fake_host(host.path());

    let archive = work.path().join("linux-test.tar.gz");
    let cfg = CaptureConfig::new(work.path().join("build"), &archive).with_source_root(host.path());
    let snapshotter = Snapshotter::new(cfg);
    let specs = snapshotter.file_specs();
    let report = snapshotter.capture().expect("capture");
    assert!(report.skipped.is_empty());
    assert!(report.files > 0);

    let dest = work.path().join("restored");
    snapshot::expand(&archive, &dest).expect("expand");

    let mut checked = 0;
    for spec in &specs {
        for path in spec.resolve().unwrap() {
            let restored = dest.join(rel(host.path(), &path));
            let meta = fs::symlink_metadata(&path).unwrap();
            if meta.file_type().is_symlink() {
                assert_eq!(
                    fs::read_link(&restored).unwrap_or_else(|e| panic!("{}: {e}", restored.display())),
                    fs::read_link(&path).unwrap()
                );
            } else if meta.is_file() {
                assert_eq!(
                    fs::read(&restored).unwrap_or_else(|e| panic!("{}: {e}", restored.display())),
                    fs::read(&path).unwrap()
                );
            } else if path.to_string_lossy().contains("drivers") {
                assert!(restored.is_dir(), "{}", restored.display());
            } else {
                continue;
            }
            checked += 1;
        }
    }
    assert!(checked >= 30, "only {checked} paths checked");
}

#[test]
fn capture_respects_filters_and_exclusions() {
    let host = tempdir().expect("host");
    let work = tempdir().expect("work");
    fake_host(host.path());

    let archive = work.path().join("snap.tar.gz");
    snapshot::Snapshotter::new(
        CaptureConfig::new(work.path().join("build"), &archive).with_source_root(host.path()),
    )
    .capture()
    .expect("capture");
    let dest = work.path().join("restored");
    snapshot::expand(&archive, &dest).expect("expand");

    let paths = Paths::new(&PathOptions::rooted(&dest));
    assert_eq!(
        fs::read_to_string(&paths.proc_cpuinfo).unwrap(),
        "processor\t: 0\nvendor_id\t: GenuineIntel\n"
    );
    assert_eq!(
        fs::read_to_string(paths.node_cpu_cache_index(0, 0, 0).join("size")).unwrap(),
        "48K\n"
    );
    // NIC captured, its MAC address and the loopback interface are not.
    assert!(fs::symlink_metadata(paths.sys_class_net.join("enp2s0")).is_ok());
    assert!(fs::symlink_metadata(paths.sys_class_net.join("lo")).is_err());
    let nic = paths.sys_class_net.join("enp2s0");
    assert_eq!(fs::read_to_string(nic.join("addr_assign_type")).unwrap(), "0\n");
    assert!(!nic.join("address").exists());
    // Primary card only.
    assert!(fs::symlink_metadata(paths.sys_class_drm.join("card0")).is_ok());
    assert!(fs::symlink_metadata(paths.sys_class_drm.join("renderD128")).is_err());
    // PCI attributes reachable through the bus symlinks, config space is not.
    let nic_dev = paths.sys_bus_pci_devices.join("0000:02:00.0");
    assert_eq!(fs::read_to_string(nic_dev.join("class")).unwrap(), "0x020000\n");
    assert!(!nic_dev.join("config").exists());
    assert_eq!(
        fs::read_link(nic_dev.join("driver")).unwrap(),
        PathBuf::from("../../../../bus/pci/drivers/e1000e")
    );
    let bridged = dest.join("sys/devices/pci0000:00/0000:00:1c.0/0000:02:00.1");
    assert_eq!(fs::read_to_string(bridged.join("class")).unwrap(), "0x020000\n");
    assert_eq!(fs::read_to_string(bridged.join("vendor")).unwrap(), "0x8086\n");
    assert!(fs::symlink_metadata(paths.sys_bus_pci_devices.join("0000:02:00.1")).is_err());
    assert!(paths.sys_bus_pci_drivers.join("i915").is_dir());
    assert!(!paths.sys_bus_pci_drivers.join("i915/bind").exists());
    // Block devices are mirrored through their symlink.
    let disk = paths.sys_block.join("nvme0n1");
    assert_eq!(fs::read_to_string(disk.join("size")).unwrap(), "1000215216\n");
    assert_eq!(fs::read_to_string(disk.join("queue/rotational")).unwrap(), "0\n");
    assert_eq!(fs::read_to_string(disk.join("nvme0n1p1/start")).unwrap(), "2048\n");
    // Files outside the catalog stay behind.
    assert!(!dest.join("sys/devices/system/memory/memory0/phys_device").exists());
}

#[test]
fn staged_tree_scenario() {
    let build = tempdir().expect("build");
    let work = tempdir().expect("work");
    let b = build.path();
    write(b, "proc/cpuinfo", "hello\n");
    fs::create_dir_all(b.join("sys/block")).unwrap();
    link(b, "sys/class/net/eth0", "../../devices/virtual/net/eth0");

    let archive = work.path().join("snap.tar.gz");
    let packed = snapshot::pack(b, &archive).expect("pack");
    assert_eq!(packed.entries(), 3);
    assert_eq!((packed.files, packed.dirs, packed.links), (1, 1, 1));

    let dest = work.path().join("dest");
    fs::create_dir(&dest).unwrap();
    let expanded = snapshot::expand(&archive, &dest).expect("expand");
    assert_eq!((expanded.files, expanded.dirs, expanded.links), (1, 1, 1));

    assert_eq!(fs::read(dest.join("proc/cpuinfo")).unwrap(), b"hello\n");
    assert!(dest.join("sys/block").is_dir());
    assert_eq!(fs::read_dir(dest.join("sys/block")).unwrap().count(), 0);
    assert_eq!(
        fs::read_link(dest.join("sys/class/net/eth0")).unwrap(),
        PathBuf::from("../../devices/virtual/net/eth0")
    );
}

#[test]
fn expand_refuses_a_populated_destination() {
    let build = tempdir().expect("build");
    let work = tempdir().expect("work");
    write(build.path(), "proc/meminfo", "MemTotal: 1 kB\n");
    let archive = work.path().join("snap.tar.gz");
    snapshot::pack(build.path(), &archive).expect("pack");

    let dest = work.path().join("dest");
    write(&dest, "proc/meminfo", "MemTotal: 2 kB\n");
    let err = snapshot::expand(&archive, &dest).unwrap_err();
    assert!(matches!(err, SnapshotError::DestinationNotEmpty(_)));
    assert_eq!(
        fs::read_to_string(dest.join("proc/meminfo")).unwrap(),
        "MemTotal: 2 kB\n"
    );
}
