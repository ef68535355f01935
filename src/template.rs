//! File layout of an unpacked boot image.

use alloc::format;
use std::path::{Path, PathBuf};

use crate::image::Section;

/// File holding the encoded primary header of an unpacked image.
pub const HEADER_FILE_NAME: &str = "image.hdr";
/// Extension appended to a section file name for its saved MTK header.
pub const MTK_HEADER_EXTENSION: &str = "mtkhdr";

/// A directory produced by [`crate::unpack::unpack`] and consumed by
/// [`crate::pack::pack`] in template mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDir {
    root: PathBuf,
}

impl TemplateDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn header_path(&self) -> PathBuf {
        self.root.join(HEADER_FILE_NAME)
    }

    pub fn section_path(&self, section: Section) -> PathBuf {
        self.root.join(section.file_name())
    }

    /// `zImage.mtkhdr`, `ram_disk.gz.mtkhdr` or `second.bin.mtkhdr`.
    pub fn mtk_header_path(&self, section: Section) -> PathBuf {
        self.root
            .join(format!("{}.{}", section.file_name(), MTK_HEADER_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        let template = TemplateDir::new("/tmp/boot");
        assert_eq!(template.root(), Path::new("/tmp/boot"));
        assert_eq!(template.header_path(), Path::new("/tmp/boot/image.hdr"));
        assert_eq!(template.section_path(Section::Kernel), Path::new("/tmp/boot/zImage"));
        assert_eq!(template.section_path(Section::Ramdisk), Path::new("/tmp/boot/ram_disk.gz"));
        assert_eq!(template.section_path(Section::Second), Path::new("/tmp/boot/second.bin"));
        assert_eq!(
            template.mtk_header_path(Section::Ramdisk),
            Path::new("/tmp/boot/ram_disk.gz.mtkhdr")
        );
    }
}
