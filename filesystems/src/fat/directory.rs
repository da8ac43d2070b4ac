// FAT directory entry parsing
// Short (8.3) entries with their preceding long filename (LFN) entries

use super::constants::*;
use super::FatType;
use byteorder::{ByteOrder, LittleEndian};

/// A directory entry with its long name resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Long name when one is present and valid, otherwise the short name
    pub name: String,
    /// 8.3 name as `NAME.EXT`
    pub short_name: String,
    pub attributes: u8,
    pub first_cluster: u32,
    pub size: u32,
}

impl DirEntry {
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    /// Case-insensitive match against either the long or the short name
    pub fn matches(&self, component: &str) -> bool {
        self.name.eq_ignore_ascii_case(component) || self.short_name.eq_ignore_ascii_case(component)
    }
}

struct LfnPart {
    sequence: u8,
    checksum: u8,
    units: [u16; LFN_CHARS_PER_ENTRY],
}

/// Checksum of an 11-byte short name, stored in each of its LFN entries
pub fn lfn_checksum(short_name: &[u8]) -> u8 {
    short_name
        .iter()
        .take(11)
        .fold(0u8, |sum, &b| sum.rotate_right(1).wrapping_add(b))
}

fn build_short_name(raw: &[u8]) -> String {
    let mut base = raw[0..8].to_vec();
    if base[0] == DIR_ENTRY_KANJI_E5 {
        base[0] = DIR_ENTRY_DELETED;
    }

    let name_part = String::from_utf8_lossy(&base).trim_end().to_string();
    let ext_part = String::from_utf8_lossy(&raw[8..11]).trim_end().to_string();

    if ext_part.is_empty() {
        name_part
    } else {
        format!("{}.{}", name_part, ext_part)
    }
}

fn lfn_units(entry: &[u8]) -> [u16; LFN_CHARS_PER_ENTRY] {
    // Characters live at 1..11, 14..26 and 28..32; 26..28 is the cluster field
    const OFFSETS: [usize; LFN_CHARS_PER_ENTRY] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
    let mut units = [0u16; LFN_CHARS_PER_ENTRY];
    for (unit, &offset) in units.iter_mut().zip(OFFSETS.iter()) {
        *unit = LittleEndian::read_u16(&entry[offset..]);
    }
    units
}

fn assemble_long_name(parts: &mut [LfnPart], short_raw: &[u8]) -> Option<String> {
    if parts.is_empty() {
        return None;
    }

    let checksum = lfn_checksum(short_raw);
    if parts.iter().any(|part| part.checksum != checksum) {
        return None;
    }

    parts.sort_by_key(|part| part.sequence);
    let units: Vec<u16> = parts
        .iter()
        .flat_map(|part| part.units.iter().copied())
        .take_while(|&unit| unit != 0x0000 && unit != 0xFFFF)
        .collect();

    let name: String = char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Parse raw directory data into entries.
///
/// Stops at the end-of-directory marker. Deleted entries, volume labels and
/// the `.`/`..` entries are skipped. Long names whose checksum does not
/// match the following short entry are ignored.
pub fn parse_directory(data: &[u8], fat_type: FatType) -> Vec<DirEntry> {
    let mut entries = Vec::new();
    let mut long_name_parts: Vec<LfnPart> = Vec::new();

    for raw in data.chunks_exact(DIR_ENTRY_SIZE) {
        if raw[0] == DIR_ENTRY_END {
            break;
        }

        if raw[0] == DIR_ENTRY_DELETED {
            long_name_parts.clear();
            continue;
        }

        let attributes = raw[DIR_ATTR];

        if attributes & (ATTR_LONG_NAME | ATTR_DIRECTORY | ATTR_ARCHIVE) == ATTR_LONG_NAME {
            if raw[0] & LFN_LAST_ENTRY != 0 {
                long_name_parts.clear();
            }
            long_name_parts.push(LfnPart {
                sequence: raw[0] & LFN_SEQUENCE_MASK,
                checksum: raw[LDIR_CHKSUM],
                units: lfn_units(raw),
            });
            continue;
        }

        if attributes & ATTR_VOLUME_ID != 0 {
            long_name_parts.clear();
            continue;
        }

        let short_name = build_short_name(raw);
        if short_name == "." || short_name == ".." {
            long_name_parts.clear();
            continue;
        }

        let long_name = assemble_long_name(&mut long_name_parts, &raw[0..11]);
        long_name_parts.clear();

        let cluster_lo = LittleEndian::read_u16(&raw[DIR_FST_CLUS_LO..]) as u32;
        let cluster_hi = if fat_type == FatType::Fat32 {
            LittleEndian::read_u16(&raw[DIR_FST_CLUS_HI..]) as u32
        } else {
            0
        };

        entries.push(DirEntry {
            name: long_name.unwrap_or_else(|| short_name.clone()),
            short_name,
            attributes,
            first_cluster: (cluster_hi << 16) | cluster_lo,
            size: LittleEndian::read_u32(&raw[DIR_FILE_SIZE..]),
        });
    }

    entries
}
