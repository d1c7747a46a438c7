use super::consts::*;
use std::io::{self, Read, Seek, SeekFrom};
use zerocopy::{FromBytes, LE, U16, U32, U64};
use zerocopy_derive::FromBytes as DeriveFromBytes;

/// Raw OLE directory entry structure (128 bytes)
///
/// This represents the on-disk format of a directory entry.
#[derive(Debug, Clone, DeriveFromBytes)]
#[allow(dead_code)]
#[repr(C)]
struct RawDirectoryEntry {
    /// Entry name in UTF-16LE (64 bytes, null-padded)
    name: [u8; 64],
    /// Length of name in bytes (including null terminator)
    name_len: U16<LE>,
    /// Entry type (1 = storage, 2 = stream, 5 = root)
    entry_type: u8,
    /// Node color (0 = red, 1 = black)
    node_color: u8,
    /// Left sibling SID
    sid_left: U32<LE>,
    /// Right sibling SID
    sid_right: U32<LE>,
    /// Child SID
    sid_child: U32<LE>,
    /// CLSID (16 bytes)
    clsid: [u8; 16],
    /// State bits
    state_bits: U32<LE>,
    /// Creation time (FILETIME)
    creation_time: U64<LE>,
    /// Modified time (FILETIME)
    modified_time: U64<LE>,
    /// Starting sector
    start_sector: U32<LE>,
    /// Stream size
    stream_size: U64<LE>,
}

/// A directory entry of the compound file.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Entry name (UTF-16 decoded)
    pub name: String,
    /// Entry type (stream, storage, root)
    pub entry_type: u8,
    /// First sector of the stream
    pub start_sector: u32,
    /// Size of the stream in bytes
    pub size: u64,
}

/// Error types for OLE file handling
#[derive(Debug)]
pub enum OleError {
    Io(io::Error),
    InvalidFormat(String),
    NotOleFile,
    CorruptedFile(String),
    StreamNotFound(String),
    TooLarge(usize),
}

impl From<io::Error> for OleError {
    fn from(err: io::Error) -> Self {
        OleError::Io(err)
    }
}

impl std::fmt::Display for OleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OleError::Io(e) => write!(f, "IO error: {}", e),
            OleError::InvalidFormat(s) => write!(f, "Invalid format: {}", s),
            OleError::NotOleFile => write!(f, "Not an OLE file"),
            OleError::CorruptedFile(s) => write!(f, "Corrupted file: {}", s),
            OleError::StreamNotFound(s) => write!(f, "Stream not found: {}", s),
            OleError::TooLarge(size) => write!(f, "Stream too large: {} bytes", size),
        }
    }
}

impl std::error::Error for OleError {}

#[inline]
fn read_u16(data: &[u8], offset: usize) -> u16 {
    U16::<LE>::read_from_bytes(&data[offset..offset + 2])
        .map(|v| v.get())
        .unwrap_or(0)
}

#[inline]
fn read_u32(data: &[u8], offset: usize) -> u32 {
    U32::<LE>::read_from_bytes(&data[offset..offset + 4])
        .map(|v| v.get())
        .unwrap_or(0)
}

/// Read-only view of an OLE2 structured storage file.
///
/// Only what a workbook reader needs is exposed: the flat list of directory
/// entries and whole-stream reads through either the FAT or the mini FAT.
#[derive(Debug)]
pub struct OleFile<R: Read + Seek> {
    reader: R,
    sector_size: usize,
    mini_sector_size: usize,
    mini_stream_cutoff: u32,
    fat: Vec<u32>,
    minifat: Vec<u32>,
    entries: Vec<DirectoryEntry>,
    ministream: Option<Vec<u8>>,
}

impl<R: Read + Seek> OleFile<R> {
    /// Open and parse an OLE file from a reader
    pub fn open(mut reader: R) -> Result<Self, OleError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        if file_size < MINIMAL_OLEFILE_SIZE as u64 {
            return Err(OleError::NotOleFile);
        }

        let mut header = [0u8; 512];
        reader.read_exact(&mut header)?;

        if &header[0..8] != MAGIC {
            return Err(OleError::NotOleFile);
        }

        let dll_version = read_u16(&header, 0x1A);
        let byte_order = read_u16(&header, 0x1C);
        let sector_shift = read_u16(&header, 0x1E);
        let mini_sector_shift = read_u16(&header, 0x20);
        let first_dir_sector = read_u32(&header, 0x30);
        let mini_stream_cutoff = read_u32(&header, 0x38);
        let first_minifat_sector = read_u32(&header, 0x3C);
        let num_minifat_sectors = read_u32(&header, 0x40);
        let first_difat_sector = read_u32(&header, 0x44);
        let num_difat_sectors = read_u32(&header, 0x48);

        if byte_order != 0xFFFE {
            return Err(OleError::InvalidFormat("Invalid byte order".to_string()));
        }
        if !(7..=12).contains(&sector_shift) || mini_sector_shift > sector_shift {
            return Err(OleError::InvalidFormat(format!(
                "Unsupported sector shift {}",
                sector_shift
            )));
        }

        let sector_size = 1usize << sector_shift;
        if (dll_version == 3 && sector_size != SECTOR_SIZE_V3)
            || (dll_version == 4 && sector_size != 4096)
        {
            return Err(OleError::InvalidFormat("Sector size mismatch".to_string()));
        }

        let mut ole = OleFile {
            reader,
            sector_size,
            mini_sector_size: 1usize << mini_sector_shift,
            mini_stream_cutoff,
            fat: Vec::new(),
            minifat: Vec::new(),
            entries: Vec::new(),
            ministream: None,
        };

        ole.load_fat(&header, first_difat_sector, num_difat_sectors)?;
        ole.load_directory(first_dir_sector)?;
        if num_minifat_sectors > 0 {
            ole.load_minifat(first_minifat_sector)?;
        }

        Ok(ole)
    }

    /// Load the File Allocation Table.
    ///
    /// The first 109 FAT sector ids sit in the header, the rest in the DIFAT
    /// chain.
    fn load_fat(
        &mut self,
        header: &[u8; 512],
        first_difat_sector: u32,
        num_difat_sectors: u32,
    ) -> Result<(), OleError> {
        let mut fat_sectors = Vec::new();
        for i in 0..HEADER_DIFAT_SLOTS {
            let sector = read_u32(header, 0x4C + i * 4);
            if sector == FREESECT || sector == ENDOFCHAIN {
                break;
            }
            fat_sectors.push(sector);
        }

        let entries_per_sector = (self.sector_size / 4) - 1;
        let mut difat_sector = first_difat_sector;
        for _ in 0..num_difat_sectors {
            if difat_sector == ENDOFCHAIN || difat_sector == FREESECT {
                break;
            }
            let sector_data = self.read_sector(difat_sector)?;
            for i in 0..entries_per_sector {
                let sector = read_u32(&sector_data, i * 4);
                if sector == FREESECT || sector == ENDOFCHAIN {
                    break;
                }
                fat_sectors.push(sector);
            }
            difat_sector = read_u32(&sector_data, entries_per_sector * 4);
        }

        let per_sector = self.sector_size / 4;
        self.fat.reserve(fat_sectors.len() * per_sector);
        for sector_id in fat_sectors {
            let sector_data = self.read_sector(sector_id)?;
            for i in 0..per_sector {
                self.fat.push(read_u32(&sector_data, i * 4));
            }
        }

        Ok(())
    }

    fn load_minifat(&mut self, first_minifat_sector: u32) -> Result<(), OleError> {
        let data = self.read_stream_from_fat(first_minifat_sector)?;
        self.minifat = data.chunks_exact(4).map(|c| read_u32(c, 0)).collect();
        Ok(())
    }

    fn load_directory(&mut self, first_dir_sector: u32) -> Result<(), OleError> {
        let dir_data = self.read_stream_from_fat(first_dir_sector)?;

        for chunk in dir_data.chunks_exact(DIRENTRY_SIZE) {
            let raw = RawDirectoryEntry::read_from_bytes(chunk).map_err(|_| {
                OleError::InvalidFormat("Failed to parse directory entry".to_string())
            })?;

            let name_len = (raw.name_len.get() as usize).saturating_sub(2).min(64);
            let units: Vec<u16> = raw.name[..name_len]
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();

            // 512-byte sector files only use the low 32 bits of the size
            let size = if self.sector_size == SECTOR_SIZE_V3 {
                raw.stream_size.get() & 0xFFFF_FFFF
            } else {
                raw.stream_size.get()
            };

            self.entries.push(DirectoryEntry {
                name: String::from_utf16_lossy(&units),
                entry_type: raw.entry_type,
                start_sector: raw.start_sector.get(),
                size,
            });
        }

        if self.entries.first().map(|e| e.entry_type) != Some(STGTY_ROOT) {
            return Err(OleError::CorruptedFile("Missing root entry".to_string()));
        }

        Ok(())
    }

    /// All directory entries in SID order.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Check whether a stream with the given name exists (case-insensitive).
    pub fn exists(&self, name: &str) -> bool {
        self.find_stream(name).is_some()
    }

    fn find_stream(&self, name: &str) -> Option<&DirectoryEntry> {
        self.entries
            .iter()
            .find(|e| e.entry_type == STGTY_STREAM && e.name.eq_ignore_ascii_case(name))
    }

    /// Read a whole stream by name.
    pub fn open_stream(&mut self, name: &str) -> Result<Vec<u8>, OleError> {
        let entry = self
            .find_stream(name)
            .cloned()
            .ok_or_else(|| OleError::StreamNotFound(name.to_string()))?;

        let mut data = if entry.size < self.mini_stream_cutoff as u64 {
            self.read_stream_from_minifat(entry.start_sector)?
        } else {
            self.read_stream_from_fat(entry.start_sector)?
        };

        if (data.len() as u64) < entry.size {
            return Err(OleError::CorruptedFile(format!(
                "Stream '{}' is truncated",
                entry.name
            )));
        }
        data.truncate(entry.size as usize);
        Ok(data)
    }

    fn read_sector(&mut self, sector_id: u32) -> Result<Vec<u8>, OleError> {
        // Sector position in file: (sector_id + 1) * sector_size
        let position = ((sector_id as u64) + 1) * (self.sector_size as u64);
        self.reader.seek(SeekFrom::Start(position))?;

        let mut buffer = vec![0u8; self.sector_size];
        self.reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn read_stream_from_fat(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut visited = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.fat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in FAT".to_string(),
                ));
            }
            visited += 1;
            if visited > self.fat.len() {
                return Err(OleError::CorruptedFile("Cyclic FAT chain".to_string()));
            }

            let sector_data = self.read_sector(sector)?;
            data.extend_from_slice(&sector_data);
            sector = self.fat[sector as usize];
        }

        Ok(data)
    }

    fn read_stream_from_minifat(&mut self, start_sector: u32) -> Result<Vec<u8>, OleError> {
        if self.ministream.is_none() {
            let root_start = self.entries[0].start_sector;
            self.ministream = Some(self.read_stream_from_fat(root_start)?);
        }
        let ministream = self.ministream.as_deref().unwrap_or_default();

        let mut data = Vec::new();
        let mut sector = start_sector;
        let mut visited = 0usize;

        while sector != ENDOFCHAIN {
            if sector as usize >= self.minifat.len() {
                return Err(OleError::CorruptedFile(
                    "Invalid sector index in MiniFAT".to_string(),
                ));
            }
            visited += 1;
            if visited > self.minifat.len() {
                return Err(OleError::CorruptedFile("Cyclic MiniFAT chain".to_string()));
            }

            let position = (sector as usize) * self.mini_sector_size;
            let end = position + self.mini_sector_size;
            if end > ministream.len() {
                return Err(OleError::CorruptedFile(
                    "Mini sector out of bounds".to_string(),
                ));
            }
            data.extend_from_slice(&ministream[position..end]);
            sector = self.minifat[sector as usize];
        }

        Ok(data)
    }
}

/// Check if a byte slice starts with the OLE signature.
pub fn is_ole_file(data: &[u8]) -> bool {
    data.len() >= MAGIC.len() && &data[..MAGIC.len()] == MAGIC
}
