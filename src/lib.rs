//! Reading, writing and repacking Android boot images, including images
//! whose kernel and ramdisk are wrapped in MTK section headers.
//!
//! The codecs only need `alloc`. Packing and unpacking to the filesystem
//! live behind the `std` feature.
#![no_std]
#![deny(
    // warnings,
    unused_imports,
    missing_debug_implementations,
    // missing_docs,
    clippy::all,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces
)]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod errors;
pub mod header;
pub mod image;
pub mod info;
#[cfg(feature = "std")]
pub mod pack;
#[cfg(feature = "std")]
pub mod template;
#[cfg(feature = "std")]
pub mod unpack;

pub use crate::errors::*;
pub use crate::header::{BootHeader, HeaderTrait, MtkSectionHeader, PageSize};
pub use crate::image::{ImageReader, ImageWriter, Section};
