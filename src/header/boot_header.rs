use alloc::{string::String, vec::Vec};
use byteorder::{ByteOrder, LittleEndian};
use core::fmt;

use super::consts::boot::*;
use super::{c_str_to_string, read_c_str, write_c_str, HeaderTrait};
use crate::errors::FormatError;
use crate::image::size_to_size_in_pages;

/// Page sizes a boot image can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PageSize {
    #[default]
    P2048 = 2048,
    P4096 = 4096,
    P8192 = 8192,
    P16384 = 16384,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [PageSize::P2048, PageSize::P4096, PageSize::P8192, PageSize::P16384];

    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for PageSize {
    type Error = FormatError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        PageSize::ALL
            .iter()
            .copied()
            .find(|page_size| page_size.as_u32() == value)
            .ok_or(FormatError::UnsupportedPageSize(value))
    }
}

impl From<PageSize> for u32 {
    fn from(page_size: PageSize) -> Self {
        page_size.as_u32()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// One of the four physical addresses stored in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadAddress {
    Kernel,
    Ramdisk,
    Second,
    Tags,
}

impl LoadAddress {
    pub const ALL: [LoadAddress; 4] = [LoadAddress::Kernel, LoadAddress::Ramdisk, LoadAddress::Second, LoadAddress::Tags];

    /// Offset from the base address used by a freshly built image.
    pub const fn default_offset(self) -> u32 {
        match self {
            LoadAddress::Kernel => KERNEL_OFFSET,
            LoadAddress::Ramdisk => RAMDISK_OFFSET,
            LoadAddress::Second => SECOND_OFFSET,
            LoadAddress::Tags => TAGS_OFFSET,
        }
    }
}

/// The primary boot image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootHeader {
    /// Header magic. Used to make sure this is in fact a header.
    pub magic: [u8; MAGIC_SIZE],
    /// Kernel size, in bytes.
    pub kernel_size: u32,
    /// Address the kernel should be loaded to.
    pub kernel_addr: u32,
    /// Ramdisk size, in bytes.
    pub ramdisk_size: u32,
    /// Address the ramdisk should be loaded to.
    pub ramdisk_addr: u32,
    /// Size of the optional second stage, 0 when absent.
    pub second_size: u32,
    /// Address the optional second stage should be loaded to.
    pub second_addr: u32,
    /// Physical address of the kernel tags.
    pub tags_addr: u32,
    /// The flash page size.
    pub page_size: u32,
    /// Room for future expansion. This should always be set to 0.
    pub unused: [u32; UNUSED_SIZE],
    /// Name of the board. This is a null-terminated ASCII string.
    pub name: [u8; NAME_SIZE],
    /// Kernel command line. This is a null-terminated ASCII string.
    pub cmdline: [u8; ARGS_SIZE],
    /// SHA-1 over the sections, zero padded.
    pub id: [u8; ID_SIZE],
    /// Continuation of `cmdline` for command lines longer than 511 bytes.
    pub extra_cmdline: [u8; EXTRA_ARGS_SIZE],
}

impl BootHeader {
    /// Stores a kernel command line, spilling into `extra_cmdline` once
    /// `cmdline` is full. Anything beyond [`MAX_CMDLINE_LEN`] is dropped.
    pub fn set_cmdline(&mut self, cmdline: &str) {
        let bytes = cmdline.as_bytes();
        let (head, tail) = bytes.split_at(bytes.len().min(ARGS_SIZE - 1));
        write_c_str(&mut self.cmdline, head);
        write_c_str(&mut self.extra_cmdline, tail);
    }

    /// Returns the full kernel command line, `extra_cmdline` included.
    pub fn cmdline(&self) -> String {
        let mut cmdline = Vec::with_capacity(MAX_CMDLINE_LEN);
        cmdline.extend_from_slice(read_c_str(&self.cmdline));
        cmdline.extend_from_slice(read_c_str(&self.extra_cmdline));
        String::from_utf8_lossy(&cmdline).into_owned()
    }

    /// Stores the board name, truncated to [`MAX_NAME_LEN`] bytes.
    pub fn set_board_name(&mut self, name: &str) {
        write_c_str(&mut self.name, name.as_bytes());
    }

    pub fn board_name(&self) -> String {
        c_str_to_string(&self.name)
    }

    pub fn address(&self, which: LoadAddress) -> u32 {
        match which {
            LoadAddress::Kernel => self.kernel_addr,
            LoadAddress::Ramdisk => self.ramdisk_addr,
            LoadAddress::Second => self.second_addr,
            LoadAddress::Tags => self.tags_addr,
        }
    }

    fn address_mut(&mut self, which: LoadAddress) -> &mut u32 {
        match which {
            LoadAddress::Kernel => &mut self.kernel_addr,
            LoadAddress::Ramdisk => &mut self.ramdisk_addr,
            LoadAddress::Second => &mut self.second_addr,
            LoadAddress::Tags => &mut self.tags_addr,
        }
    }

    /// Sets one address to `base + offset`.
    pub fn set_address(&mut self, which: LoadAddress, base: u32, offset: u32) {
        *self.address_mut(which) = base.wrapping_add(offset);
    }

    /// Moves all four addresses from `old_base` to `new_base`, keeping their
    /// offsets relative to the base.
    pub fn rebase(&mut self, old_base: u32, new_base: u32) {
        for which in LoadAddress::ALL {
            let address = self.address_mut(which);
            *address = address.wrapping_sub(old_base).wrapping_add(new_base);
        }
    }

    /// Guesses the base address the addresses were derived from, falling
    /// back to [`DEFAULT_BASE`].
    ///
    /// Images in the wild were produced with this exact comparison order,
    /// mismatched offsets included, so it must not be tidied up.
    pub fn conjectural_base(&self) -> u32 {
        let kernel_base = self.kernel_addr.wrapping_sub(KERNEL_OFFSET);
        let ramdisk_base = self.ramdisk_addr.wrapping_sub(RAMDISK_OFFSET);
        let second_base = self.second_addr.wrapping_sub(SECOND_OFFSET);
        let tags_base = self.tags_addr.wrapping_sub(TAGS_OFFSET);

        if (kernel_base == ramdisk_base) == (second_base == tags_base) {
            return kernel_base;
        }
        if kernel_base == ramdisk_base {
            return kernel_base;
        }
        if kernel_base == self.second_addr.wrapping_sub(RAMDISK_OFFSET) {
            return kernel_base;
        }
        if kernel_base == self.tags_addr.wrapping_sub(RAMDISK_OFFSET) {
            return kernel_base;
        }
        if self.ramdisk_addr.wrapping_sub(KERNEL_OFFSET) == self.second_addr.wrapping_sub(RAMDISK_OFFSET) {
            return kernel_base;
        }
        if self.ramdisk_addr.wrapping_sub(KERNEL_OFFSET) == self.tags_addr.wrapping_sub(RAMDISK_OFFSET) {
            return kernel_base;
        }
        if self.second_addr.wrapping_sub(KERNEL_OFFSET) == self.tags_addr.wrapping_sub(RAMDISK_OFFSET) {
            return kernel_base;
        }
        DEFAULT_BASE
    }

    /// Returns how many pages the kernel is big.
    pub fn kernel_pages(&self) -> usize {
        size_to_size_in_pages(self.kernel_size as usize, self.page_size as usize)
    }

    /// Returns how many pages the ramdisk is big.
    pub fn ramdisk_pages(&self) -> usize {
        size_to_size_in_pages(self.ramdisk_size as usize, self.page_size as usize)
    }

    /// Returns how many pages the second stage is big.
    pub fn second_pages(&self) -> usize {
        size_to_size_in_pages(self.second_size as usize, self.page_size as usize)
    }

    /// Encodes the header. String fields are written back NUL-terminated and
    /// zero padded.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut dst = [0u8; HEADER_SIZE];
        dst[..MAGIC_SIZE].copy_from_slice(&self.magic);
        LittleEndian::write_u32(&mut dst[OFFSET_KERNEL_SIZE..], self.kernel_size);
        LittleEndian::write_u32(&mut dst[OFFSET_KERNEL_ADDR..], self.kernel_addr);
        LittleEndian::write_u32(&mut dst[OFFSET_RAMDISK_SIZE..], self.ramdisk_size);
        LittleEndian::write_u32(&mut dst[OFFSET_RAMDISK_ADDR..], self.ramdisk_addr);
        LittleEndian::write_u32(&mut dst[OFFSET_SECOND_SIZE..], self.second_size);
        LittleEndian::write_u32(&mut dst[OFFSET_SECOND_ADDR..], self.second_addr);
        LittleEndian::write_u32(&mut dst[OFFSET_TAGS_ADDR..], self.tags_addr);
        LittleEndian::write_u32(&mut dst[OFFSET_PAGE_SIZE..], self.page_size);
        LittleEndian::write_u32_into(&self.unused, &mut dst[OFFSET_UNUSED..OFFSET_NAME]);
        write_c_str(&mut dst[OFFSET_NAME..OFFSET_CMDLINE], read_c_str(&self.name));
        write_c_str(&mut dst[OFFSET_CMDLINE..OFFSET_ID], read_c_str(&self.cmdline));
        dst[OFFSET_ID..OFFSET_EXTRA_CMDLINE].copy_from_slice(&self.id);
        write_c_str(&mut dst[OFFSET_EXTRA_CMDLINE..], read_c_str(&self.extra_cmdline));
        dst
    }
}

impl HeaderTrait for BootHeader {
    const SIZE: usize = HEADER_SIZE;

    fn has_correct_magic(&self) -> bool {
        self.magic == MAGIC
    }

    /// Reads a header from the supplied bytes. Only the length and the magic
    /// are checked; section sizes are the reader's business.
    fn parse(src: &[u8]) -> Result<Self, FormatError> {
        if src.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                what: "boot image header",
                expected: HEADER_SIZE,
                actual: src.len(),
            });
        }

        let mut header = Self {
            magic: [0; MAGIC_SIZE],
            kernel_size: LittleEndian::read_u32(&src[OFFSET_KERNEL_SIZE..]),
            kernel_addr: LittleEndian::read_u32(&src[OFFSET_KERNEL_ADDR..]),
            ramdisk_size: LittleEndian::read_u32(&src[OFFSET_RAMDISK_SIZE..]),
            ramdisk_addr: LittleEndian::read_u32(&src[OFFSET_RAMDISK_ADDR..]),
            second_size: LittleEndian::read_u32(&src[OFFSET_SECOND_SIZE..]),
            second_addr: LittleEndian::read_u32(&src[OFFSET_SECOND_ADDR..]),
            tags_addr: LittleEndian::read_u32(&src[OFFSET_TAGS_ADDR..]),
            page_size: LittleEndian::read_u32(&src[OFFSET_PAGE_SIZE..]),
            unused: [0; UNUSED_SIZE],
            name: [0; NAME_SIZE],
            cmdline: [0; ARGS_SIZE],
            id: [0; ID_SIZE],
            extra_cmdline: [0; EXTRA_ARGS_SIZE],
        };
        header.magic.copy_from_slice(&src[..MAGIC_SIZE]);
        LittleEndian::read_u32_into(&src[OFFSET_UNUSED..OFFSET_NAME], &mut header.unused);
        header.name.copy_from_slice(&src[OFFSET_NAME..OFFSET_CMDLINE]);
        header.cmdline.copy_from_slice(&src[OFFSET_CMDLINE..OFFSET_ID]);
        header.id.copy_from_slice(&src[OFFSET_ID..OFFSET_EXTRA_CMDLINE]);
        header.extra_cmdline.copy_from_slice(&src[OFFSET_EXTRA_CMDLINE..HEADER_SIZE]);

        if !header.has_correct_magic() {
            return Err(FormatError::BadMagic("boot image header"));
        }
        Ok(header)
    }

    fn to_vec(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }
}

impl Default for BootHeader {
    fn default() -> Self {
        Self {
            magic: MAGIC,
            kernel_size: 0,
            kernel_addr: DEFAULT_BASE + LoadAddress::Kernel.default_offset(),
            ramdisk_size: 0,
            ramdisk_addr: DEFAULT_BASE + LoadAddress::Ramdisk.default_offset(),
            second_size: 0,
            second_addr: DEFAULT_BASE + LoadAddress::Second.default_offset(),
            tags_addr: DEFAULT_BASE + LoadAddress::Tags.default_offset(),
            page_size: DEFAULT_PAGE_SIZE,
            unused: [0; UNUSED_SIZE],
            name: [0; NAME_SIZE],
            cmdline: [0; ARGS_SIZE],
            id: [0; ID_SIZE],
            extra_cmdline: [0; EXTRA_ARGS_SIZE],
        }
    }
}
