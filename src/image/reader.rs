use alloc::vec::Vec;

use super::Section;
use crate::errors::FormatError;
use crate::header::consts::boot::HEADER_SIZE;
use crate::header::{BootHeader, HeaderTrait};

#[cfg(feature = "std")]
use crate::errors::ReadBootImageError;
#[cfg(feature = "std")]
use std::path::Path;

/// A validated view over the bytes of a complete boot image.
///
/// All checks happen in [`ImageReader::new`], so the section accessors never
/// fail and never read past the end of the buffer.
#[derive(Debug, Clone)]
pub struct ImageReader<D = Vec<u8>> {
    header: BootHeader,
    data: D,
}

impl<D: AsRef<[u8]>> ImageReader<D> {
    pub fn new(data: D) -> Result<Self, FormatError> {
        let bytes = data.as_ref();
        let header = BootHeader::parse(bytes)?;

        let declared = HEADER_SIZE as u64
            + u64::from(header.kernel_size)
            + u64::from(header.ramdisk_size)
            + u64::from(header.second_size);
        if (bytes.len() as u64) < declared {
            return Err(FormatError::Truncated {
                what: "boot image",
                expected: usize::try_from(declared).unwrap_or(usize::MAX),
                actual: bytes.len(),
            });
        }

        if header.page_size == 0 {
            return Err(FormatError::NoPageSize);
        }

        let reader = Self { header, data };
        let available = reader.data.as_ref().len();
        for section in Section::ALL {
            let (offset, size) = reader.section_location(section);
            if size != 0 && !matches!(offset.checked_add(size), Some(end) if end <= available) {
                return Err(FormatError::SectionOutOfBounds {
                    section,
                    offset,
                    size,
                    available,
                });
            }
        }
        Ok(reader)
    }

    pub fn header(&self) -> &BootHeader {
        &self.header
    }

    /// Returns the size of a single page.
    pub fn page_size(&self) -> usize {
        self.header.page_size as usize
    }

    /// Returns the offset to the kernel, in pages. The header always takes
    /// up the first page.
    pub fn kernel_offset_in_pages(&self) -> usize {
        1
    }

    /// Returns the offset to the ramdisk, in pages.
    pub fn ramdisk_offset_in_pages(&self) -> usize {
        self.kernel_offset_in_pages() + self.header.kernel_pages()
    }

    /// Returns the offset to the second stage, in pages.
    pub fn second_offset_in_pages(&self) -> usize {
        self.ramdisk_offset_in_pages() + self.header.ramdisk_pages()
    }

    /// Returns the byte offset and size of a section.
    pub fn section_location(&self, section: Section) -> (usize, usize) {
        let (pages, size) = match section {
            Section::Kernel => (self.kernel_offset_in_pages(), self.header.kernel_size),
            Section::Ramdisk => (self.ramdisk_offset_in_pages(), self.header.ramdisk_size),
            Section::Second => (self.second_offset_in_pages(), self.header.second_size),
        };
        (pages * self.page_size(), size as usize)
    }

    /// Returns the bytes of a section. Empty sections yield an empty slice
    /// wherever their offset points.
    pub fn section(&self, section: Section) -> &[u8] {
        let (offset, size) = self.section_location(section);
        if size == 0 {
            return &[];
        }
        &self.data.as_ref()[offset..offset + size]
    }

    pub fn kernel(&self) -> &[u8] {
        self.section(Section::Kernel)
    }

    pub fn ramdisk(&self) -> &[u8] {
        self.section(Section::Ramdisk)
    }

    /// Returns the second stage, empty when the image has none.
    pub fn second(&self) -> &[u8] {
        self.section(Section::Second)
    }

    pub fn into_inner(self) -> D {
        self.data
    }
}

#[cfg(feature = "std")]
impl ImageReader<Vec<u8>> {
    /// Reads and validates the boot image stored at `path`.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ReadBootImageError> {
        let data = std::fs::read(path)?;
        Ok(Self::new(data)?)
    }
}
