use alloc::{string::String, vec, vec::Vec};
use core2::io::{Error as IoError, Read, Write};

use crate::errors::{FormatError, ReadBootImageError};

pub mod consts;
mod boot_header;
mod mtk_header;

pub use self::boot_header::{BootHeader, LoadAddress, PageSize};
pub use self::mtk_header::{is_mtk_section, unwrap_section, wrap_section, MtkSectionHeader};

/// Behaviour shared by the fixed-size headers found in a boot image.
pub trait HeaderTrait: Sized {
    /// Encoded size of the header, in bytes.
    const SIZE: usize;

    fn has_correct_magic(&self) -> bool;

    /// Decodes a header from the start of `src`. Trailing bytes are ignored.
    fn parse(src: &[u8]) -> Result<Self, FormatError>;

    /// Encodes the header into exactly [`Self::SIZE`] bytes.
    fn to_vec(&self) -> Vec<u8>;

    fn read_from<R>(src: &mut R) -> Result<Self, ReadBootImageError>
    where
        R: Read,
    {
        let mut buffer = vec![0; Self::SIZE];
        src.read_exact(&mut buffer)?;
        Ok(Self::parse(&buffer)?)
    }

    fn write_to<W>(&self, dst: &mut W) -> Result<usize, IoError>
    where
        W: Write,
    {
        let buffer = self.to_vec();
        dst.write_all(&buffer)?;
        Ok(buffer.len())
    }
}

/// Stores `text` in a fixed-width NUL-terminated field. Anything that does
/// not fit in front of the terminator is dropped, and the rest of the field
/// is zeroed.
pub(crate) fn write_c_str(field: &mut [u8], text: &[u8]) {
    let len = text.len().min(field.len().saturating_sub(1));
    field[..len].copy_from_slice(&text[..len]);
    field[len..].fill(0);
}

/// Returns the bytes of a NUL-terminated field up to its first NUL.
pub(crate) fn read_c_str(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&byte| byte == 0).unwrap_or(field.len());
    &field[..end]
}

pub(crate) fn c_str_to_string(field: &[u8]) -> String {
    String::from_utf8_lossy(read_c_str(field)).into_owned()
}
