use alloc::vec::Vec;
use core2::io::{Error as IoError, Write};
use sha1::{Digest, Sha1};

use super::{padding_len, Section};
use crate::errors::FormatError;
use crate::header::consts::boot::{HEADER_SIZE, ID_SIZE, SHA_DIGEST_SIZE};
use crate::header::{BootHeader, HeaderTrait};

#[cfg(feature = "std")]
use std::{fs, io, path::Path};
#[cfg(feature = "std")]
use tempfile::Builder;

static ZERO_PAGE: [u8; 16384] = [0; 16384];

/// Assembles a boot image from a header and its sections.
///
/// The section sizes and the `id` of the header are always recomputed from
/// the supplied buffers, whatever the header said before.
#[derive(Debug, Clone)]
pub struct ImageWriter<'a> {
    header: BootHeader,
    kernel: &'a [u8],
    ramdisk: &'a [u8],
    second: Option<&'a [u8]>,
}

impl<'a> ImageWriter<'a> {
    pub fn new(
        mut header: BootHeader,
        kernel: &'a [u8],
        ramdisk: &'a [u8],
        second: Option<&'a [u8]>,
    ) -> Result<Self, FormatError> {
        if header.page_size == 0 {
            return Err(FormatError::NoPageSize);
        }

        header.kernel_size = section_size(Section::Kernel, kernel)?;
        header.ramdisk_size = section_size(Section::Ramdisk, ramdisk)?;
        header.second_size = section_size(Section::Second, second.unwrap_or_default())?;
        header.id = digest_sections([
            (kernel, header.kernel_size),
            (ramdisk, header.ramdisk_size),
            (second.unwrap_or_default(), header.second_size),
        ]);

        Ok(Self {
            header,
            kernel,
            ramdisk,
            second,
        })
    }

    /// The header as it will be written.
    pub fn header(&self) -> &BootHeader {
        &self.header
    }

    fn page_size(&self) -> usize {
        self.header.page_size as usize
    }

    fn padded(&self, size: usize) -> usize {
        size + padding_len(size, self.page_size())
    }

    /// Total size of the image, padding included.
    pub fn image_size(&self) -> usize {
        self.padded(HEADER_SIZE)
            + self.padded(self.kernel.len())
            + self.padded(self.ramdisk.len())
            + self.second.map_or(0, |second| self.padded(second.len()))
    }

    /// Writes this boot image to a `Write` target. Returns the amount of
    /// bytes written.
    pub fn write_to<W: Write>(&self, dst: &mut W) -> Result<usize, IoError> {
        let page_size = self.page_size();
        let mut bytes_written = self.header.write_to(dst)?;
        bytes_written += write_padding(dst, page_size, HEADER_SIZE)?;
        bytes_written += write_section(dst, page_size, self.kernel)?;
        bytes_written += write_section(dst, page_size, self.ramdisk)?;
        if let Some(second) = self.second {
            bytes_written += write_section(dst, page_size, second)?;
        }
        Ok(bytes_written)
    }

    /// Builds the whole image in memory.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut image = Vec::with_capacity(self.image_size());
        image.extend_from_slice(&self.header.to_bytes());
        image.resize(self.padded(image.len()), 0);
        for section in [Some(self.kernel), Some(self.ramdisk), self.second].into_iter().flatten() {
            image.extend_from_slice(section);
            image.resize(self.padded(image.len()), 0);
        }
        image
    }

    /// Writes the image to `path`. The data goes to a temporary file next to
    /// `path` first, which replaces `path` only once everything is written.
    ///
    /// A replaced file keeps its permissions. A new file gets the usual
    /// mode for new files, `0o666` minus the umask.
    #[cfg(feature = "std")]
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> io::Result<u64> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut builder = Builder::new();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o666));
        }
        let mut file = builder.tempfile_in(dir)?;
        if let Ok(existing) = fs::metadata(path) {
            file.as_file().set_permissions(existing.permissions())?;
        }
        let bytes_written = self.write_to(&mut file)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|error| error.error)?;
        Ok(bytes_written as u64)
    }
}

/// Computes the header `id`: a SHA-1 over every section followed by its
/// little-endian 32 bit size, left-justified in a zeroed 32 byte field.
///
/// Fails like [`ImageWriter::new`] when a section does not fit a 32 bit size.
pub fn compute_id(kernel: &[u8], ramdisk: &[u8], second: Option<&[u8]>) -> Result<[u8; ID_SIZE], FormatError> {
    let second = second.unwrap_or_default();
    Ok(digest_sections([
        (kernel, section_size(Section::Kernel, kernel)?),
        (ramdisk, section_size(Section::Ramdisk, ramdisk)?),
        (second, section_size(Section::Second, second)?),
    ]))
}

/// Hashes sections whose sizes were already checked to fit in 32 bits.
fn digest_sections(sections: [(&[u8], u32); 3]) -> [u8; ID_SIZE] {
    let mut hasher = Sha1::new();
    for (data, size) in sections {
        hasher.update(data);
        hasher.update(size.to_le_bytes());
    }

    let mut id = [0u8; ID_SIZE];
    id[..SHA_DIGEST_SIZE].copy_from_slice(&hasher.finalize());
    id
}

fn section_size(section: Section, data: &[u8]) -> Result<u32, FormatError> {
    u32::try_from(data.len()).map_err(|_| FormatError::SectionTooLarge {
        section,
        size: data.len(),
    })
}

fn write_section<W: Write>(dst: &mut W, page_size: usize, data: &[u8]) -> Result<usize, IoError> {
    dst.write_all(data)?;
    Ok(data.len() + write_padding(dst, page_size, data.len())?)
}

/// Pads a section of `item_size` bytes with zeroes up to the next page.
fn write_padding<W: Write>(dst: &mut W, page_size: usize, item_size: usize) -> Result<usize, IoError> {
    let count = padding_len(item_size, page_size);
    let mut remaining = count;
    while remaining > 0 {
        let chunk = remaining.min(ZERO_PAGE.len());
        dst.write_all(&ZERO_PAGE[..chunk])?;
        remaining -= chunk;
    }
    Ok(count)
}
