pub use self::boot::*;

pub mod boot {
        pub const HEADER_SIZE: usize = 1632;
        pub const MAGIC: [u8; MAGIC_SIZE] = [0x41, 0x4E, 0x44, 0x52, 0x4F, 0x49, 0x44, 0x21];
        pub const MAGIC_STR: &str = "ANDROID!";
        pub const MAGIC_SIZE: usize = 8;
        pub const NAME_SIZE: usize = 16;
        pub const UNUSED_SIZE: usize = 2;
        pub const ARGS_SIZE: usize = 512;
        pub const EXTRA_ARGS_SIZE: usize = 1024;
        pub const ID_SIZE: usize = 32;
        pub const SHA_DIGEST_SIZE: usize = 20;

        /// Longest command line that fits in `cmdline` and `extra_cmdline`.
        pub const MAX_CMDLINE_LEN: usize = ARGS_SIZE + EXTRA_ARGS_SIZE - 2;
        /// Longest board name that fits in `name`.
        pub const MAX_NAME_LEN: usize = NAME_SIZE - 1;

        pub const DEFAULT_BASE: u32 = 0x1000_0000;
        pub const KERNEL_OFFSET: u32 = 0x0000_8000;
        pub const RAMDISK_OFFSET: u32 = 0x0100_0000;
        pub const SECOND_OFFSET: u32 = 0x00f0_0000;
        pub const TAGS_OFFSET: u32 = 0x0000_0100;
        pub const DEFAULT_PAGE_SIZE: u32 = 2048;

        pub const OFFSET_KERNEL_SIZE: usize = 8;
        pub const OFFSET_KERNEL_ADDR: usize = 12;
        pub const OFFSET_RAMDISK_SIZE: usize = 16;
        pub const OFFSET_RAMDISK_ADDR: usize = 20;
        pub const OFFSET_SECOND_SIZE: usize = 24;
        pub const OFFSET_SECOND_ADDR: usize = 28;
        pub const OFFSET_TAGS_ADDR: usize = 32;
        pub const OFFSET_PAGE_SIZE: usize = 36;
        pub const OFFSET_UNUSED: usize = 40;
        pub const OFFSET_NAME: usize = 48;
        pub const OFFSET_CMDLINE: usize = 64;
        pub const OFFSET_ID: usize = 576;
        pub const OFFSET_EXTRA_CMDLINE: usize = 608;
}

pub mod mtk {
        pub const MTK_HEADER_SIZE: usize = 512;
        pub const MTK_MAGIC: u32 = 0x5888_1688;
        pub const MTK_MAGIC_SIZE: usize = 4;
        pub const MTK_NAME_SIZE: usize = 32;
        pub const MTK_FILLER_SIZE: usize = 472;
        pub const MTK_FILLER_BYTE: u8 = 0xFF;

        /// Longest section name that fits in `name`.
        pub const MAX_MTK_NAME_LEN: usize = MTK_NAME_SIZE - 1;

        pub const KERNEL_SECTION_NAME: &str = "KERNEL";
        pub const RAMDISK_SECTION_NAME: &str = "ROOTFS";

        pub const OFFSET_MTK_SECTION_SIZE: usize = 4;
        pub const OFFSET_MTK_NAME: usize = 8;
        pub const OFFSET_MTK_FILLER: usize = 40;
}
