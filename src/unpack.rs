//! Splitting a boot image into a template directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::string::String;
use std::vec::Vec;

use tracing::{debug, info};

use crate::errors::UnpackError;
use crate::header::{is_mtk_section, unwrap_section, BootHeader};
use crate::image::{ImageReader, Section};
use crate::template::TemplateDir;

/// A section file written by [`unpack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedSection {
    pub section: Section,
    pub path: PathBuf,
    /// Size of the file written, without any MTK header.
    pub size: usize,
    /// Name from the MTK header, if the section was wrapped in one.
    pub mtk_name: Option<String>,
}

/// Outcome of a successful [`unpack`]. Empty sections are not listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackReport {
    pub header: BootHeader,
    pub header_path: PathBuf,
    pub sections: Vec<UnpackedSection>,
}

/// Splits `image` into a new template directory at `destination`.
///
/// The destination must not exist yet. Nothing is created unless `image`
/// is a valid boot image.
pub fn unpack(image: &[u8], destination: &Path) -> Result<UnpackReport, UnpackError> {
    if destination.exists() {
        return Err(UnpackError::DestinationExists(destination.to_path_buf()));
    }
    let reader = ImageReader::new(image)?;

    fs::create_dir_all(destination).map_err(|source| io_error(destination, source))?;
    let template = TemplateDir::new(destination);

    let header_path = template.header_path();
    write_file(&header_path, &reader.header().to_bytes())?;
    debug!(path = %header_path.display(), "saved image header");

    let mut sections = Vec::new();
    for section in Section::ALL {
        if let Some(unpacked) = unpack_section(&template, section, reader.section(section))? {
            sections.push(unpacked);
        }
    }

    info!(path = %destination.display(), sections = sections.len(), "boot image unpacked");
    Ok(UnpackReport {
        header: *reader.header(),
        header_path,
        sections,
    })
}

/// Reads the boot image at `path` and unpacks it into `destination`.
pub fn unpack_file(path: &Path, destination: &Path) -> Result<UnpackReport, UnpackError> {
    let image = fs::read(path).map_err(|source| io_error(path, source))?;
    unpack(&image, destination)
}

fn unpack_section(
    template: &TemplateDir,
    section: Section,
    data: &[u8],
) -> Result<Option<UnpackedSection>, UnpackError> {
    if data.is_empty() {
        debug!(%section, "empty section skipped");
        return Ok(None);
    }

    let path = template.section_path(section);
    let (payload, mtk_name) = if is_mtk_section(data) {
        let (header, payload) =
            unwrap_section(data).map_err(|source| UnpackError::InvalidMtkSection { section, source })?;
        let name = header.name();
        debug!(%section, name = %name, "found MTK section");
        write_file(&template.mtk_header_path(section), &header.to_bytes())?;
        (payload, Some(name))
    } else {
        (data, None)
    };

    write_file(&path, payload)?;
    debug!(%section, path = %path.display(), size = payload.len(), "section saved");
    Ok(Some(UnpackedSection {
        section,
        path,
        size: payload.len(),
        mtk_name,
    }))
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), UnpackError> {
    fs::write(path, data).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> UnpackError {
    UnpackError::Io {
        path: path.to_path_buf(),
        source,
    }
}
