//! Building boot images, either from scratch or from an unpacked template.

use alloc::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::string::String;
use std::vec::Vec;

use tracing::{debug, info, warn};

use crate::errors::PackError;
use crate::header::consts::mtk::{KERNEL_SECTION_NAME, RAMDISK_SECTION_NAME};
use crate::header::{wrap_section, BootHeader, HeaderTrait, LoadAddress, MtkSectionHeader, PageSize};
use crate::image::{ImageWriter, Section};
use crate::template::TemplateDir;

/// Images larger than this usually do not fit the boot partition of the
/// devices this format is used on.
pub const LARGE_IMAGE_WARNING_SIZE: u64 = 0x0060_0000;

/// Where the header and the default section files come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PackMode {
    /// Start from a fresh header with the default layout.
    #[default]
    Build,
    /// Start from the `image.hdr` and section files of an unpacked image.
    Template { dir: PathBuf },
}

/// Content supplied for a section or an MTK header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl SectionSource {
    pub fn load(&self) -> Result<Cow<'_, [u8]>, PackError> {
        match self {
            SectionSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes.as_slice())),
            SectionSource::Path(path) => read_file(path).map(Cow::Owned),
        }
    }
}

impl From<Vec<u8>> for SectionSource {
    fn from(bytes: Vec<u8>) -> Self {
        SectionSource::Bytes(bytes)
    }
}

impl From<PathBuf> for SectionSource {
    fn from(path: PathBuf) -> Self {
        SectionSource::Path(path)
    }
}

/// Everything `pack` needs to know. Unset options leave the corresponding
/// header field as the template (or the default header) has it.
#[derive(Debug, Clone, Default)]
pub struct PackConfig {
    pub mode: PackMode,
    pub kernel: Option<SectionSource>,
    pub ramdisk: Option<SectionSource>,
    pub second: Option<SectionSource>,
    /// New load-address base. All addresses are shifted along with it.
    pub base: Option<u32>,
    pub kernel_offset: Option<u32>,
    pub ramdisk_offset: Option<u32>,
    pub second_offset: Option<u32>,
    pub tags_offset: Option<u32>,
    pub page_size: Option<PageSize>,
    pub cmdline: Option<String>,
    pub board: Option<String>,
    pub mtk_kernel_header: Option<SectionSource>,
    pub mtk_ramdisk_header: Option<SectionSource>,
    pub mtk_ramdisk_name: Option<String>,
    /// Wrap kernel and ramdisk in MTK headers even without any header
    /// template.
    pub mtk_force: bool,
    pub output: PathBuf,
}

/// Outcome of a successful `pack`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackReport {
    /// The header as written, sizes and id included.
    pub header: BootHeader,
    pub written: u64,
    /// Whether kernel and ramdisk were wrapped in MTK headers.
    pub mtk: bool,
}

impl PackReport {
    pub fn is_large(&self) -> bool {
        self.written > LARGE_IMAGE_WARNING_SIZE
    }
}

/// Applies the header related options of `config` to `header`.
///
/// Offsets are relative to the base: the configured one if any, the one
/// guessed from the current addresses otherwise.
pub fn apply_overrides(header: &mut BootHeader, config: &PackConfig) {
    let mut base = header.conjectural_base();
    debug!("guessed load address base {:#010x}", base);
    if let Some(new_base) = config.base {
        header.rebase(base, new_base);
        base = new_base;
    }

    let offsets = [
        (LoadAddress::Kernel, config.kernel_offset),
        (LoadAddress::Ramdisk, config.ramdisk_offset),
        (LoadAddress::Second, config.second_offset),
        (LoadAddress::Tags, config.tags_offset),
    ];
    for (which, offset) in offsets {
        if let Some(offset) = offset {
            header.set_address(which, base, offset);
        }
    }

    if let Some(page_size) = config.page_size {
        header.page_size = page_size.as_u32();
    }
    if let Some(cmdline) = &config.cmdline {
        header.set_cmdline(cmdline);
    }
    if let Some(board) = &config.board {
        header.set_board_name(board);
    }
}

/// Builds a boot image as described by `config` and writes it to
/// `config.output`.
pub fn pack(config: &PackConfig) -> Result<PackReport, PackError> {
    let template = match &config.mode {
        PackMode::Build => None,
        PackMode::Template { dir } => Some(TemplateDir::new(dir.clone())),
    };

    let mut header = match &template {
        Some(template) => load_template_header(template)?,
        None => BootHeader::default(),
    };
    apply_overrides(&mut header, config);

    let kernel = resolve_section(Section::Kernel, config.kernel.as_ref(), template.as_ref())?
        .ok_or(PackError::MissingSource(Section::Kernel))?;
    let ramdisk = resolve_section(Section::Ramdisk, config.ramdisk.as_ref(), template.as_ref())?
        .ok_or(PackError::MissingSource(Section::Ramdisk))?;
    let second = resolve_section(Section::Second, config.second.as_ref(), template.as_ref())?;

    let mtk = wants_mtk(config, template.as_ref());
    let (kernel, ramdisk) = if mtk {
        info!("wrapping kernel and ramdisk in MTK headers");
        let mut kernel_header = resolve_mtk_header(
            Section::Kernel,
            config.mtk_kernel_header.as_ref(),
            template.as_ref(),
            KERNEL_SECTION_NAME,
        )?;
        let mut ramdisk_header = resolve_mtk_header(
            Section::Ramdisk,
            config.mtk_ramdisk_header.as_ref(),
            template.as_ref(),
            RAMDISK_SECTION_NAME,
        )?;
        if let Some(name) = &config.mtk_ramdisk_name {
            debug!(name = %name, "renaming MTK ramdisk section");
            ramdisk_header.set_name(name);
        }
        (
            Cow::Owned(wrap_section(&mut kernel_header, &kernel)),
            Cow::Owned(wrap_section(&mut ramdisk_header, &ramdisk)),
        )
    } else {
        (kernel, ramdisk)
    };

    let writer = ImageWriter::new(header, &kernel, &ramdisk, second.as_deref())?;
    let written = writer.write_file(&config.output).map_err(|source| PackError::Io {
        path: config.output.clone(),
        source,
    })?;
    info!(path = %config.output.display(), size = written, "boot image written");

    Ok(PackReport {
        header: *writer.header(),
        written,
        mtk,
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, PackError> {
    fs::read(path).map_err(|source| PackError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn load_template_header(template: &TemplateDir) -> Result<BootHeader, PackError> {
    let path = template.header_path();
    if !path.is_file() {
        return Err(PackError::MissingTemplate(path));
    }
    let bytes = read_file(&path)?;
    debug!(path = %path.display(), "loaded template header");
    BootHeader::parse(&bytes).map_err(|source| PackError::InvalidTemplate { path, source })
}

/// An explicit source wins over the file of the template directory.
fn resolve_section<'a>(
    section: Section,
    explicit: Option<&'a SectionSource>,
    template: Option<&TemplateDir>,
) -> Result<Option<Cow<'a, [u8]>>, PackError> {
    if let Some(source) = explicit {
        debug!(%section, "using explicit source");
        return source.load().map(Some);
    }
    let Some(path) = template
        .map(|template| template.section_path(section))
        .filter(|path| path.is_file())
    else {
        debug!(%section, "no source found");
        return Ok(None);
    };
    debug!(%section, path = %path.display(), "using template file");
    read_file(&path).map(|bytes| Some(Cow::Owned(bytes)))
}

fn wants_mtk(config: &PackConfig, template: Option<&TemplateDir>) -> bool {
    let template_headers = template.is_some_and(|template| {
        [Section::Kernel, Section::Ramdisk]
            .into_iter()
            .any(|section| template.mtk_header_path(section).is_file())
    });
    template_headers
        || config.mtk_kernel_header.is_some()
        || config.mtk_ramdisk_header.is_some()
        || config.mtk_force
}

/// Picks the MTK header for `section`: explicit, then template, then a
/// fresh one called `fresh_name`.
fn resolve_mtk_header(
    section: Section,
    explicit: Option<&SectionSource>,
    template: Option<&TemplateDir>,
    fresh_name: &str,
) -> Result<MtkSectionHeader, PackError> {
    let bytes = match explicit {
        Some(source) => Some(source.load()?),
        None => match template
            .map(|template| template.mtk_header_path(section))
            .filter(|path| path.is_file())
        {
            Some(path) => Some(Cow::Owned(read_file(&path)?)),
            None => None,
        },
    };

    match bytes {
        Some(bytes) => MtkSectionHeader::parse(&bytes)
            .map_err(|source| PackError::InvalidMtkHeader { section, source }),
        None => {
            warn!(%section, name = fresh_name, "no MTK header template, creating a fresh one");
            Ok(MtkSectionHeader::new(fresh_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::consts::boot::DEFAULT_BASE;

    #[test]
    fn overrides_rebase_before_offsets() {
        let mut header = BootHeader::default();
        let config = PackConfig {
            base: Some(0x8000_0000),
            ramdisk_offset: Some(0x0200_0000),
            ..PackConfig::default()
        };
        apply_overrides(&mut header, &config);
        assert_eq!(header.kernel_addr, 0x8000_8000);
        assert_eq!(header.ramdisk_addr, 0x8200_0000);
        assert_eq!(header.second_addr, 0x80f0_0000);
        assert_eq!(header.tags_addr, 0x8000_0100);
    }

    #[test]
    fn offsets_use_guessed_base() {
        let mut header = BootHeader::default();
        let config = PackConfig {
            tags_offset: Some(0x0e00_0000),
            kernel_offset: Some(0x0008_0000),
            ..PackConfig::default()
        };
        apply_overrides(&mut header, &config);
        assert_eq!(header.tags_addr, DEFAULT_BASE + 0x0e00_0000);
        assert_eq!(header.kernel_addr, DEFAULT_BASE + 0x0008_0000);
        assert_eq!(header.ramdisk_addr, DEFAULT_BASE + 0x0100_0000);
    }

    #[test]
    fn overrides_strings_and_page_size() {
        let mut header = BootHeader::default();
        let config = PackConfig {
            page_size: Some(PageSize::P4096),
            cmdline: Some("console=ttyMT0".into()),
            board: Some("a-very-long-board-name".into()),
            ..PackConfig::default()
        };
        apply_overrides(&mut header, &config);
        assert_eq!(header.page_size, 4096);
        assert_eq!(header.cmdline(), "console=ttyMT0");
        assert_eq!(header.board_name(), "a-very-long-boa");
    }

    #[test]
    fn no_overrides_keep_header() {
        let mut header = BootHeader::default();
        header.set_cmdline("keep me");
        let before = header;
        apply_overrides(&mut header, &PackConfig::default());
        assert_eq!(header, before);
    }

    #[test]
    fn bytes_source_is_borrowed() {
        let source = SectionSource::from(std::vec![1, 2, 3]);
        assert!(matches!(source.load().unwrap(), Cow::Borrowed(&[1, 2, 3])));
    }

    #[test]
    fn missing_path_source_reports_path() {
        let source = SectionSource::Path(PathBuf::from("/nonexistent/zImage"));
        match source.load() {
            Err(PackError::Io { path, .. }) => assert_eq!(path, Path::new("/nonexistent/zImage")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn build_mode_wants_mtk_only_when_asked() {
        let mut config = PackConfig::default();
        assert!(!wants_mtk(&config, None));
        config.mtk_force = true;
        assert!(wants_mtk(&config, None));
        config.mtk_force = false;
        config.mtk_ramdisk_header = Some(SectionSource::Bytes(std::vec![0; 512]));
        assert!(wants_mtk(&config, None));
    }

    #[test]
    fn fresh_mtk_headers_when_nothing_supplied() {
        let header = resolve_mtk_header(Section::Ramdisk, None, None, RAMDISK_SECTION_NAME).unwrap();
        assert_eq!(header.name(), "ROOTFS");
    }

    #[test]
    fn undecodable_mtk_header_is_rejected() {
        let source = SectionSource::Bytes(std::vec![0; 512]);
        assert!(matches!(
            resolve_mtk_header(Section::Kernel, Some(&source), None, KERNEL_SECTION_NAME),
            Err(PackError::InvalidMtkHeader { section: Section::Kernel, .. })
        ));
    }

    #[test]
    fn large_image_threshold() {
        let report = |written| PackReport {
            header: BootHeader::default(),
            written,
            mtk: false,
        };
        assert!(!report(0x60_0000).is_large());
        assert!(report(0x60_0001).is_large());
    }
}
