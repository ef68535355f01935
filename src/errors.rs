use core2::io::Error as IoError;
use thiserror_no_std::Error;
use crate::image::Section;

#[cfg(feature = "std")]
use std::{io, path::PathBuf};


/// Problems with the bytes of a boot image or of one of its headers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("{what} is truncated: expected at least {expected} bytes, got {actual}.")]
    Truncated {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Bad magic number in {0}.")]
    BadMagic(&'static str),
    #[error("No page size specified.")]
    NoPageSize,
    #[error("{section} section ({size} bytes at offset {offset}) exceeds the {available} bytes available.")]
    SectionOutOfBounds {
        section: Section,
        offset: usize,
        size: usize,
        available: usize,
    },
    #[error("{section} section is too large ({size} bytes).")]
    SectionTooLarge { section: Section, size: usize },
    #[error("Unsupported page size {0}, expected one of 2048, 4096, 8192 or 16384.")]
    UnsupportedPageSize(u32),
}

#[derive(Debug, Error)]
pub enum ReadBootImageError {
    #[error("IO error whilst reading boot image from Reader.")]
    Io(#[from] IoError),
    #[error("Bad boot image read into memory.")]
    Format(#[from] FormatError),
}

#[cfg(feature = "std")]
#[derive(Debug, Error)]
pub enum PackError {
    #[error("Template header '{}' not found.", .0.display())]
    MissingTemplate(PathBuf),
    #[error("Template header '{}' is not a valid boot image header.", .path.display())]
    InvalidTemplate {
        path: PathBuf,
        #[source]
        source: FormatError,
    },
    #[error("No {0} image found in the configuration or the template directory.")]
    MissingSource(Section),
    #[error("MTK header for the {section} section is invalid.")]
    InvalidMtkHeader {
        section: Section,
        #[source]
        source: FormatError,
    },
    #[error("Could not assemble boot image.")]
    Format(#[from] FormatError),
    #[error("IO error on '{}'.", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(feature = "std")]
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("The directory '{}' already exists.", .0.display())]
    DestinationExists(PathBuf),
    #[error("Wrong Android boot image.")]
    InvalidImage(#[from] FormatError),
    #[error("The {section} section carries an invalid MTK header.")]
    InvalidMtkSection {
        section: Section,
        #[source]
        source: FormatError,
    },
    #[error("IO error on '{}'.", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
