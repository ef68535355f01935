//! Human readable overview of a boot image header.

use core::fmt;

use crate::header::BootHeader;

const NOT_DEFINED: &str = "[Not Defined]";

/// Renders the "IMAGE INFORMATION" block for a header. Created with
/// [`BootHeader::summary`].
#[derive(Debug, Clone, Copy)]
pub struct Summary<'a> {
    header: &'a BootHeader,
}

impl BootHeader {
    pub fn summary(&self) -> Summary<'_> {
        Summary { header: self }
    }
}

fn or_not_defined(value: &str) -> &str {
    if value.is_empty() {
        NOT_DEFINED
    } else {
        value
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header;
        let name = header.board_name();
        let cmdline = header.cmdline();

        writeln!(f, "IMAGE INFORMATION:")?;
        writeln!(f)?;
        writeln!(f, "Page size:    {}", header.page_size)?;
        writeln!(f, "Tags address: 0x{:08x}", header.tags_addr)?;
        writeln!(f, "Product name: {}", or_not_defined(&name))?;
        writeln!(f, "Command line: {}", or_not_defined(&cmdline))?;
        writeln!(f, "===============SECTIONS TABLE=================")?;
        writeln!(f, "Name        Size          Address       Pages")?;
        writeln!(f, "==============================================")?;

        let rows = [
            ("Kernel", header.kernel_size, header.kernel_addr, header.kernel_pages()),
            ("Ramdisk", header.ramdisk_size, header.ramdisk_addr, header.ramdisk_pages()),
            ("Second", header.second_size, header.second_addr, header.second_pages()),
        ];
        for (label, size, addr, pages) in rows {
            writeln!(f, "{:<12}0x{:08x}    0x{:08x}    {}", label, size, addr, pages)?;
        }
        Ok(())
    }
}
