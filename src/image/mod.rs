use core::fmt;

mod reader;
mod writer;

pub use self::reader::ImageReader;
pub use self::writer::{compute_id, ImageWriter};

/// The content sections of a boot image, in on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Kernel,
    Ramdisk,
    Second,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Kernel, Section::Ramdisk, Section::Second];

    /// File name of the section inside an unpacked template directory.
    pub const fn file_name(self) -> &'static str {
        match self {
            Section::Kernel => "zImage",
            Section::Ramdisk => "ram_disk.gz",
            Section::Second => "second.bin",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::Kernel => "kernel",
            Section::Ramdisk => "ramdisk",
            Section::Second => "second stage",
        })
    }
}

/// Helper function to calculate how big something would be in pages, given
/// the size and the page size. A page size of 0 yields 0 pages.
pub(crate) fn size_to_size_in_pages(size: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    size.div_ceil(page_size)
}

/// Number of zero bytes needed after `size` bytes to reach the next page
/// boundary.
pub(crate) fn padding_len(size: usize, page_size: usize) -> usize {
    (page_size - size % page_size) % page_size
}
