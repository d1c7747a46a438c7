//! OLE2 compound file writer.
//!
//! Produces version 3 (512-byte sector) compound files holding a flat list of
//! top-level streams. Every stream is stored in regular sectors, so callers
//! must pad streams to at least [`MINI_STREAM_CUTOFF`] bytes; this is what
//! Excel itself does for the `Workbook` stream of small files.
//!
//! Sector layout: stream data first, then the directory, then the FAT.

use super::consts::*;
use super::file::OleError;
use std::io::Write;

const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE_V3 / DIRENTRY_SIZE;
const FAT_ENTRIES_PER_SECTOR: usize = SECTOR_SIZE_V3 / 4;

/// Builder for a compound file containing top-level streams only.
#[derive(Debug, Default)]
pub struct OleWriter {
    streams: Vec<(String, Vec<u8>)>,
}

impl OleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a top-level stream.
    pub fn create_stream(&mut self, name: &str, data: Vec<u8>) -> Result<(), OleError> {
        if name.is_empty() || name.encode_utf16().count() > 31 {
            return Err(OleError::InvalidFormat(format!(
                "Stream name '{}' must be 1-31 characters",
                name
            )));
        }
        if data.len() < MINI_STREAM_CUTOFF as usize {
            return Err(OleError::InvalidFormat(format!(
                "Stream '{}' is shorter than the mini stream cutoff",
                name
            )));
        }
        if data.len() > u32::MAX as usize {
            return Err(OleError::TooLarge(data.len()));
        }
        self.streams.push((name.to_string(), data));
        Ok(())
    }

    /// Serialize the compound file.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OleError> {
        let stream_sectors: Vec<usize> = self
            .streams
            .iter()
            .map(|(_, data)| data.len().div_ceil(SECTOR_SIZE_V3))
            .collect();
        let data_sectors: usize = stream_sectors.iter().sum();
        let dir_sectors = (self.streams.len() + 1).div_ceil(ENTRIES_PER_SECTOR);

        // The FAT must also describe its own sectors.
        let mut fat_sectors = 1;
        while fat_sectors * FAT_ENTRIES_PER_SECTOR < data_sectors + dir_sectors + fat_sectors {
            fat_sectors += 1;
        }
        if fat_sectors > HEADER_DIFAT_SLOTS {
            return Err(OleError::TooLarge(data_sectors * SECTOR_SIZE_V3));
        }

        let first_dir_sector = data_sectors as u32;
        let first_fat_sector = (data_sectors + dir_sectors) as u32;

        // FAT
        let mut fat = vec![FREESECT; fat_sectors * FAT_ENTRIES_PER_SECTOR];
        let mut start_sectors = Vec::with_capacity(self.streams.len());
        let mut next = 0usize;
        for &count in &stream_sectors {
            start_sectors.push(next as u32);
            link_chain(&mut fat, next, count);
            next += count;
        }
        link_chain(&mut fat, next, dir_sectors);
        for slot in fat.iter_mut().skip(first_fat_sector as usize).take(fat_sectors) {
            *slot = FATSECT;
        }

        // Header
        let mut header = vec![0u8; SECTOR_SIZE_V3];
        header[0..8].copy_from_slice(MAGIC);
        header[0x18..0x1A].copy_from_slice(&0x003Eu16.to_le_bytes()); // minor version
        header[0x1A..0x1C].copy_from_slice(&0x0003u16.to_le_bytes()); // major version
        header[0x1C..0x1E].copy_from_slice(&0xFFFEu16.to_le_bytes()); // byte order
        header[0x1E..0x20].copy_from_slice(&9u16.to_le_bytes()); // sector shift
        header[0x20..0x22].copy_from_slice(&6u16.to_le_bytes()); // mini sector shift
        header[0x2C..0x30].copy_from_slice(&(fat_sectors as u32).to_le_bytes());
        header[0x30..0x34].copy_from_slice(&first_dir_sector.to_le_bytes());
        header[0x38..0x3C].copy_from_slice(&MINI_STREAM_CUTOFF.to_le_bytes());
        header[0x3C..0x40].copy_from_slice(&ENDOFCHAIN.to_le_bytes()); // no mini FAT
        header[0x44..0x48].copy_from_slice(&ENDOFCHAIN.to_le_bytes()); // no DIFAT
        for i in 0..HEADER_DIFAT_SLOTS {
            let id = if i < fat_sectors {
                first_fat_sector + i as u32
            } else {
                FREESECT
            };
            let offset = 0x4C + i * 4;
            header[offset..offset + 4].copy_from_slice(&id.to_le_bytes());
        }
        writer.write_all(&header)?;

        // Stream data, each padded to a sector boundary
        for (_, data) in &self.streams {
            writer.write_all(data)?;
            let padding = data.len().next_multiple_of(SECTOR_SIZE_V3) - data.len();
            writer.write_all(&vec![0u8; padding])?;
        }

        // Directory: root entry, then the streams as a chain of right siblings
        let mut directory = vec![0u8; dir_sectors * SECTOR_SIZE_V3];
        let root_child = if self.streams.is_empty() { NOSTREAM } else { 1 };
        write_dir_entry(
            &mut directory[0..DIRENTRY_SIZE],
            "Root Entry",
            STGTY_ROOT,
            NOSTREAM,
            root_child,
            ENDOFCHAIN,
            0,
        );
        for (index, ((name, data), start)) in self.streams.iter().zip(&start_sectors).enumerate() {
            let sid = index + 1;
            let right = if sid < self.streams.len() {
                (sid + 1) as u32
            } else {
                NOSTREAM
            };
            let offset = sid * DIRENTRY_SIZE;
            write_dir_entry(
                &mut directory[offset..offset + DIRENTRY_SIZE],
                name,
                STGTY_STREAM,
                right,
                NOSTREAM,
                *start,
                data.len() as u64,
            );
        }
        for unused in (self.streams.len() + 1)..(dir_sectors * ENTRIES_PER_SECTOR) {
            let offset = unused * DIRENTRY_SIZE;
            let entry = &mut directory[offset..offset + DIRENTRY_SIZE];
            entry[0x44..0x48].copy_from_slice(&NOSTREAM.to_le_bytes());
            entry[0x48..0x4C].copy_from_slice(&NOSTREAM.to_le_bytes());
            entry[0x4C..0x50].copy_from_slice(&NOSTREAM.to_le_bytes());
        }
        writer.write_all(&directory)?;

        let mut fat_bytes = Vec::with_capacity(fat.len() * 4);
        for entry in fat {
            fat_bytes.extend_from_slice(&entry.to_le_bytes());
        }
        writer.write_all(&fat_bytes)?;

        Ok(())
    }
}

fn link_chain(fat: &mut [u32], start: usize, count: usize) {
    for i in 0..count {
        let sector = start + i;
        fat[sector] = if i + 1 == count {
            ENDOFCHAIN
        } else {
            (sector + 1) as u32
        };
    }
}

fn write_dir_entry(
    entry: &mut [u8],
    name: &str,
    entry_type: u8,
    sid_right: u32,
    sid_child: u32,
    start_sector: u32,
    size: u64,
) {
    let mut name_len = 0usize;
    for (i, unit) in name.encode_utf16().take(31).enumerate() {
        entry[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        name_len = i + 1;
    }
    // Length in bytes including the terminating NUL
    entry[0x40..0x42].copy_from_slice(&(((name_len + 1) * 2) as u16).to_le_bytes());
    entry[0x42] = entry_type;
    entry[0x43] = 1; // black
    entry[0x44..0x48].copy_from_slice(&NOSTREAM.to_le_bytes()); // left sibling
    entry[0x48..0x4C].copy_from_slice(&sid_right.to_le_bytes());
    entry[0x4C..0x50].copy_from_slice(&sid_child.to_le_bytes());
    entry[0x74..0x78].copy_from_slice(&start_sector.to_le_bytes());
    entry[0x78..0x80].copy_from_slice(&size.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::OleFile;
    use std::io::Cursor;

    #[test]
    fn test_rejects_small_stream() {
        let mut writer = OleWriter::new();
        assert!(writer.create_stream("Workbook", vec![0u8; 100]).is_err());
    }

    #[test]
    fn test_round_trip_single_stream() {
        let payload: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mut writer = OleWriter::new();
        writer.create_stream("Workbook", payload.clone()).unwrap();

        let mut bytes = Vec::new();
        writer.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len() % SECTOR_SIZE_V3, 0);

        let mut ole = OleFile::open(Cursor::new(bytes)).unwrap();
        assert!(ole.exists("workbook"));
        assert_eq!(ole.open_stream("Workbook").unwrap(), payload);
    }

    #[test]
    fn test_round_trip_multiple_fat_sectors() {
        // 200 KiB needs 400 data sectors, more than one FAT sector can map
        let payload = vec![0xABu8; 200 * 1024];
        let mut writer = OleWriter::new();
        writer.create_stream("Workbook", payload.clone()).unwrap();
        writer.create_stream("Extra", vec![1u8; 4096]).unwrap();

        let mut bytes = Vec::new();
        writer.write_to(&mut bytes).unwrap();

        let mut ole = OleFile::open(Cursor::new(bytes)).unwrap();
        assert_eq!(ole.open_stream("Workbook").unwrap().len(), payload.len());
        assert_eq!(ole.open_stream("Extra").unwrap(), vec![1u8; 4096]);
        assert!(matches!(
            ole.open_stream("Missing"),
            Err(OleError::StreamNotFound(_))
        ));
    }
}
