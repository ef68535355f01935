#![cfg(feature = "std")]

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use bootimage_repack::header::consts::mtk::MTK_HEADER_SIZE;
use bootimage_repack::header::{is_mtk_section, unwrap_section, wrap_section, LoadAddress, MtkSectionHeader};
use bootimage_repack::image::{compute_id, ImageReader};
use bootimage_repack::pack::{pack, PackConfig, PackMode, SectionSource};
use bootimage_repack::unpack::{unpack, unpack_file};
use bootimage_repack::{HeaderTrait, PackError, PageSize, Section, UnpackError};
use tempfile::{tempdir, TempDir};

fn build_config(dir: &Path) -> PackConfig {
    PackConfig {
        kernel: Some(SectionSource::Bytes(vec![0x4B; 5000])),
        ramdisk: Some(SectionSource::Bytes(vec![0x52; 1234])),
        output: dir.join("boot.img"),
        ..PackConfig::default()
    }
}

fn template_config(template: &Path, output: PathBuf) -> PackConfig {
    PackConfig {
        mode: PackMode::Template {
            dir: template.to_path_buf(),
        },
        output,
        ..PackConfig::default()
    }
}

/// Builds `boot.img` from scratch and unpacks it into `unpacked`.
fn unpacked_image(config: PackConfig) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let config = PackConfig {
        output: dir.path().join("boot.img"),
        ..config
    };
    pack(&config).unwrap();
    let template = dir.path().join("unpacked");
    unpack_file(&config.output, &template).unwrap();
    (dir, template)
}

#[test]
fn build_from_scratch() {
    let dir = tempdir().unwrap();
    let config = build_config(dir.path());
    let report = pack(&config).unwrap();

    let image = fs::read(&config.output).unwrap();
    assert_eq!(report.written, image.len() as u64);
    assert_eq!(image.len(), 2048 * (1 + 3 + 1));
    assert!(!report.mtk);

    let reader = ImageReader::new(&image).unwrap();
    let header = reader.header();
    assert_eq!(header, &report.header);
    assert_eq!(header.kernel_size, 5000);
    assert_eq!(header.ramdisk_size, 1234);
    assert_eq!(header.second_size, 0);
    assert_eq!(header.kernel_addr, 0x1000_8000);
    assert_eq!(Ok(header.id), compute_id(&[0x4B; 5000], &[0x52; 1234], None));
    assert_eq!(reader.kernel(), &[0x4B; 5000][..]);
    assert_eq!(reader.ramdisk(), &[0x52; 1234][..]);
}

#[test]
fn build_with_overrides() {
    let dir = tempdir().unwrap();
    let config = PackConfig {
        base: Some(0x8000_0000),
        tags_offset: Some(0x0e00_0000),
        page_size: Some(PageSize::P4096),
        cmdline: Some("console=ttyMT0,921600n1 androidboot.hardware=mt6589".into()),
        board: Some("mt6589".into()),
        second: Some(SectionSource::Bytes(b"second".to_vec())),
        ..build_config(dir.path())
    };
    let report = pack(&config).unwrap();

    let reader = ImageReader::from_file(&config.output).unwrap();
    let header = reader.header();
    assert_eq!(header.page_size, 4096);
    assert_eq!(header.address(LoadAddress::Kernel), 0x8000_8000);
    assert_eq!(header.address(LoadAddress::Ramdisk), 0x8100_0000);
    assert_eq!(header.address(LoadAddress::Second), 0x80f0_0000);
    assert_eq!(header.address(LoadAddress::Tags), 0x8e00_0000);
    assert_eq!(header.cmdline(), "console=ttyMT0,921600n1 androidboot.hardware=mt6589");
    assert_eq!(header.board_name(), "mt6589");
    assert_eq!(reader.second(), b"second");
    assert_eq!(report.written, 4096 * 5);
}

#[test]
fn build_without_ramdisk_fails() {
    let dir = tempdir().unwrap();
    let config = PackConfig {
        ramdisk: None,
        ..build_config(dir.path())
    };
    assert!(matches!(pack(&config), Err(PackError::MissingSource(Section::Ramdisk))));
    assert!(!config.output.exists());
}

#[test]
fn unpack_then_pack_is_identical() {
    let (dir, template) = unpacked_image(PackConfig {
        second: Some(SectionSource::Bytes(vec![0x53; 77])),
        cmdline: Some("x".repeat(700)),
        ..build_config(Path::new(""))
    });
    assert_eq!(fs::read(template.join("second.bin")).unwrap(), vec![0x53; 77]);

    let output = dir.path().join("repacked.img");
    let report = pack(&template_config(&template, output.clone())).unwrap();
    assert!(!report.mtk);
    assert_eq!(fs::read(&output).unwrap(), fs::read(dir.path().join("boot.img")).unwrap());
}

#[test]
fn explicit_source_replaces_template_file() {
    let (dir, template) = unpacked_image(build_config(Path::new("")));
    let kernel_path = dir.path().join("new-zImage");
    fs::write(&kernel_path, b"new kernel").unwrap();

    let config = PackConfig {
        kernel: Some(SectionSource::Path(kernel_path)),
        ..template_config(&template, dir.path().join("repacked.img"))
    };
    pack(&config).unwrap();

    let reader = ImageReader::from_file(&config.output).unwrap();
    assert_eq!(reader.kernel(), b"new kernel");
    assert_eq!(reader.ramdisk(), &[0x52; 1234][..]);
}

#[test]
fn template_without_header_fails() {
    let dir = tempdir().unwrap();
    let config = template_config(dir.path(), dir.path().join("boot.img"));
    match pack(&config) {
        Err(PackError::MissingTemplate(path)) => assert_eq!(path, dir.path().join("image.hdr")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn template_with_garbage_header_fails() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("image.hdr"), vec![0u8; 1632]).unwrap();
    let config = template_config(dir.path(), dir.path().join("boot.img"));
    assert!(matches!(pack(&config), Err(PackError::InvalidTemplate { .. })));
}

#[test]
fn forced_mtk_sections_round_trip() {
    let dir = tempdir().unwrap();
    let config = PackConfig {
        mtk_force: true,
        mtk_ramdisk_name: Some("RECOVERY".into()),
        ..build_config(dir.path())
    };
    let report = pack(&config).unwrap();
    assert!(report.mtk);
    assert_eq!(report.header.kernel_size as usize, MTK_HEADER_SIZE + 5000);
    assert_eq!(report.header.ramdisk_size as usize, MTK_HEADER_SIZE + 1234);

    let reader = ImageReader::from_file(&config.output).unwrap();
    assert!(is_mtk_section(reader.kernel()));
    let (kernel_header, kernel) = unwrap_section(reader.kernel()).unwrap();
    assert_eq!(kernel_header.name(), "KERNEL");
    assert_eq!(kernel, &[0x4B; 5000][..]);
    let (ramdisk_header, ramdisk) = unwrap_section(reader.ramdisk()).unwrap();
    assert_eq!(ramdisk_header.name(), "RECOVERY");
    assert_eq!(ramdisk.len(), 1234);

    let template = dir.path().join("unpacked");
    let unpacked = unpack_file(&config.output, &template).unwrap();
    assert_eq!(fs::read(template.join("zImage")).unwrap(), vec![0x4B; 5000]);
    let saved = MtkSectionHeader::parse(&fs::read(template.join("ram_disk.gz.mtkhdr")).unwrap()).unwrap();
    assert_eq!(saved.name(), "RECOVERY");
    assert_eq!(saved.section_size, 1234);
    assert_eq!(unpacked.sections[0].mtk_name.as_deref(), Some("KERNEL"));

    // The saved headers alone switch the repack back to MTK format.
    let repacked = dir.path().join("repacked.img");
    let report = pack(&template_config(&template, repacked.clone())).unwrap();
    assert!(report.mtk);
    assert_eq!(fs::read(&repacked).unwrap(), fs::read(&config.output).unwrap());
}

#[test]
fn wrapped_second_stage_is_unwrapped_and_stays_plain() {
    let second = wrap_section(&mut MtkSectionHeader::new("SECOND"), &[0x53; 300]);
    let (dir, template) = unpacked_image(PackConfig {
        second: Some(SectionSource::Bytes(second.clone())),
        ..build_config(Path::new(""))
    });
    assert_eq!(fs::read(template.join("second.bin")).unwrap(), vec![0x53; 300]);
    assert_eq!(fs::read(template.join("second.bin.mtkhdr")).unwrap(), &second[..MTK_HEADER_SIZE]);

    // Only kernel and ramdisk are ever wrapped on the way back.
    let output = dir.path().join("repacked.img");
    let report = pack(&template_config(&template, output.clone())).unwrap();
    assert!(!report.mtk);
    let reader = ImageReader::from_file(&output).unwrap();
    assert_eq!(reader.second(), &[0x53; 300][..]);
    assert!(!is_mtk_section(reader.kernel()));
}

#[test]
fn supplied_mtk_header_is_used() {
    let dir = tempdir().unwrap();
    let header_path = dir.path().join("kernel.mtkhdr");
    fs::write(&header_path, MtkSectionHeader::new("CUSTOM").to_bytes()).unwrap();
    let config = PackConfig {
        mtk_kernel_header: Some(SectionSource::Path(header_path)),
        ..build_config(dir.path())
    };
    let report = pack(&config).unwrap();
    assert!(report.mtk);

    let reader = ImageReader::from_file(&config.output).unwrap();
    assert_eq!(unwrap_section(reader.kernel()).unwrap().0.name(), "CUSTOM");
    assert_eq!(unwrap_section(reader.ramdisk()).unwrap().0.name(), "ROOTFS");
}

#[test]
fn unpack_refuses_existing_directory() {
    let dir = tempdir().unwrap();
    let config = build_config(dir.path());
    pack(&config).unwrap();
    let existing = dir.path().join("existing");
    fs::create_dir(&existing).unwrap();

    assert!(matches!(
        unpack_file(&config.output, &existing),
        Err(UnpackError::DestinationExists(_))
    ));
    assert_eq!(fs::read_dir(&existing).unwrap().count(), 0);
}

#[test]
fn unpack_rejects_non_image() {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("unpacked");
    assert!(matches!(
        unpack(b"definitely not a boot image", &destination),
        Err(UnpackError::InvalidImage(_))
    ));
    assert!(!destination.exists());
}

#[test]
fn pack_replaces_previous_output() {
    let dir = tempdir().unwrap();
    let config = build_config(dir.path());
    fs::write(&config.output, vec![0xEE; 100_000]).unwrap();
    #[cfg(unix)]
    fs::set_permissions(&config.output, fs::Permissions::from_mode(0o640)).unwrap();

    let report = pack(&config).unwrap();
    let metadata = fs::metadata(&config.output).unwrap();
    assert_eq!(metadata.len(), report.written);
    #[cfg(unix)]
    assert_eq!(metadata.permissions().mode() & 0o777, 0o640);
    let leftovers = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftovers, 1);
}

#[cfg(unix)]
#[test]
fn new_output_gets_regular_file_mode() {
    let dir = tempdir().unwrap();
    let config = build_config(dir.path());
    pack(&config).unwrap();

    let plain = dir.path().join("plain");
    fs::write(&plain, b"").unwrap();
    let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&config.output), mode(&plain));
}
