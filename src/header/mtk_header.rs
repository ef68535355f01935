use alloc::{string::String, vec::Vec};
use byteorder::{ByteOrder, LittleEndian};

use super::consts::mtk::*;
use super::{c_str_to_string, read_c_str, write_c_str, HeaderTrait};
use crate::errors::FormatError;

/// The 512 byte header MediaTek bootloaders expect in front of the kernel and
/// ramdisk sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtkSectionHeader {
    /// Always [`MTK_MAGIC`] for a valid header.
    pub magic: u32,
    /// Size of the wrapped payload, in bytes.
    pub section_size: u32,
    /// Name of the section. This is a null-terminated ASCII string.
    pub name: [u8; MTK_NAME_SIZE],
    /// Unused, conventionally filled with `0xFF`.
    pub filler: [u8; MTK_FILLER_SIZE],
}

impl MtkSectionHeader {
    /// Creates a fresh header for a section called `name`.
    pub fn new(name: &str) -> Self {
        let mut header = Self {
            magic: MTK_MAGIC,
            section_size: 0,
            name: [0; MTK_NAME_SIZE],
            filler: [MTK_FILLER_BYTE; MTK_FILLER_SIZE],
        };
        header.set_name(name);
        header
    }

    /// Stores the section name, truncated to [`MAX_MTK_NAME_LEN`] bytes.
    pub fn set_name(&mut self, name: &str) {
        write_c_str(&mut self.name, name.as_bytes());
    }

    pub fn name(&self) -> String {
        c_str_to_string(&self.name)
    }

    pub fn to_bytes(&self) -> [u8; MTK_HEADER_SIZE] {
        let mut dst = [0u8; MTK_HEADER_SIZE];
        LittleEndian::write_u32(&mut dst, self.magic);
        LittleEndian::write_u32(&mut dst[OFFSET_MTK_SECTION_SIZE..], self.section_size);
        write_c_str(&mut dst[OFFSET_MTK_NAME..OFFSET_MTK_FILLER], read_c_str(&self.name));
        dst[OFFSET_MTK_FILLER..].copy_from_slice(&self.filler);
        dst
    }
}

impl HeaderTrait for MtkSectionHeader {
    const SIZE: usize = MTK_HEADER_SIZE;

    fn has_correct_magic(&self) -> bool {
        self.magic == MTK_MAGIC
    }

    /// Decodes the header alone, without looking at any payload. Template
    /// header files saved next to unpacked sections are read this way.
    fn parse(src: &[u8]) -> Result<Self, FormatError> {
        if src.len() < MTK_HEADER_SIZE {
            return Err(FormatError::Truncated {
                what: "MTK section header",
                expected: MTK_HEADER_SIZE,
                actual: src.len(),
            });
        }

        let mut header = Self {
            magic: LittleEndian::read_u32(src),
            section_size: LittleEndian::read_u32(&src[OFFSET_MTK_SECTION_SIZE..]),
            name: [0; MTK_NAME_SIZE],
            filler: [0; MTK_FILLER_SIZE],
        };
        header.name.copy_from_slice(&src[OFFSET_MTK_NAME..OFFSET_MTK_FILLER]);
        header.filler.copy_from_slice(&src[OFFSET_MTK_FILLER..MTK_HEADER_SIZE]);

        if !header.has_correct_magic() {
            return Err(FormatError::BadMagic("MTK section header"));
        }
        Ok(header)
    }

    fn to_vec(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }
}

/// Checks whether `data` starts with the MTK section magic.
pub fn is_mtk_section(data: &[u8]) -> bool {
    data.len() >= MTK_MAGIC_SIZE && LittleEndian::read_u32(data) == MTK_MAGIC
}

/// Splits an MTK wrapped section into its header and payload. The payload is
/// exactly `section_size` bytes; anything after it is ignored.
pub fn unwrap_section(data: &[u8]) -> Result<(MtkSectionHeader, &[u8]), FormatError> {
    let header = MtkSectionHeader::parse(data)?;
    let size = header.section_size as usize;
    let available = data.len() - MTK_HEADER_SIZE;
    if size > available {
        return Err(FormatError::Truncated {
            what: "MTK section payload",
            expected: size,
            actual: available,
        });
    }
    Ok((header, &data[MTK_HEADER_SIZE..MTK_HEADER_SIZE + size]))
}

/// Prefixes `payload` with `header`, updating its `section_size` first.
pub fn wrap_section(header: &mut MtkSectionHeader, payload: &[u8]) -> Vec<u8> {
    header.section_size = payload.len() as u32;
    let mut section = Vec::with_capacity(MTK_HEADER_SIZE + payload.len());
    section.extend_from_slice(&header.to_bytes());
    section.extend_from_slice(payload);
    section
}
