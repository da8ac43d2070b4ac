// FAT on-disk constants shared by the reader and the test image builder

// Boot sector offsets
pub const BS_JMP_BOOT: usize = 0x00;
pub const BS_OEM_NAME: usize = 0x03;
pub const BPB_BYTES_PER_SEC: usize = 0x0B;
pub const BPB_SEC_PER_CLUS: usize = 0x0D;
pub const BPB_RSVD_SEC_CNT: usize = 0x0E;
pub const BPB_NUM_FATS: usize = 0x10;
pub const BPB_ROOT_ENT_CNT: usize = 0x11;
pub const BPB_TOT_SEC16: usize = 0x13;
pub const BPB_MEDIA: usize = 0x15;
pub const BPB_FAT_SZ16: usize = 0x16;
pub const BPB_TOT_SEC32: usize = 0x20;

// FAT12/16 extended BPB
pub const BS16_BOOT_SIG: usize = 0x26;
pub const BS16_VOL_LAB: usize = 0x2B;
pub const BS16_FIL_SYS_TYPE: usize = 0x36;

// FAT32 extended BPB
pub const BPB_FAT_SZ32: usize = 0x24;
pub const BPB_ROOT_CLUS: usize = 0x2C;
pub const BPB_FS_INFO: usize = 0x30;
pub const BPB_BK_BOOT_SEC: usize = 0x32;
pub const BS32_BOOT_SIG: usize = 0x42;
pub const BS32_VOL_LAB: usize = 0x47;
pub const BS32_FIL_SYS_TYPE: usize = 0x52;

// Boot sector signature
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const BOOT_SIGNATURE_OFFSET: usize = 0x1FE;

// Cluster count thresholds
pub const FAT12_MAX_CLUSTERS: u32 = 4084;
pub const FAT16_MAX_CLUSTERS: u32 = 65524;

// Directory entries
pub const DIR_ENTRY_SIZE: usize = 32;
pub const DIR_ENTRY_END: u8 = 0x00;
pub const DIR_ENTRY_DELETED: u8 = 0xE5;
pub const DIR_ENTRY_KANJI_E5: u8 = 0x05;
pub const LFN_LAST_ENTRY: u8 = 0x40;
pub const LFN_SEQUENCE_MASK: u8 = 0x3F;
pub const LFN_CHARS_PER_ENTRY: usize = 13;

// Directory entry attributes
pub const ATTR_READ_ONLY: u8 = 0x01;
pub const ATTR_HIDDEN: u8 = 0x02;
pub const ATTR_SYSTEM: u8 = 0x04;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_LONG_NAME: u8 = ATTR_READ_ONLY | ATTR_HIDDEN | ATTR_SYSTEM | ATTR_VOLUME_ID;

// Directory entry field offsets
pub const DIR_ATTR: usize = 11;
pub const DIR_FST_CLUS_HI: usize = 20;
pub const DIR_FST_CLUS_LO: usize = 26;
pub const DIR_FILE_SIZE: usize = 28;
pub const LDIR_CHKSUM: usize = 13;
