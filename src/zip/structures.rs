use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x0605_4b50;
    pub const SIZE: usize = 22;
    pub const MAX_COMMENT_SIZE: usize = u16::MAX as usize;
    /// Offset of the central directory size field within the record.
    pub const CD_SIZE_FIELD_OFFSET: usize = 12;
    /// Offset of the central directory start offset field within the record.
    pub const CD_OFFSET_FIELD_OFFSET: usize = 16;
    /// Offset of the comment length field within the record.
    pub const COMMENT_LEN_FIELD_OFFSET: usize = 20;

    /// Parse a record from `data`, which must start at the signature.
    ///
    /// Trailing bytes beyond the declared comment are ignored; a comment that
    /// runs past the end of `data` is truncated to what is available.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::SignatureNotFound("EOCD not found".into()));
        }

        let mut cursor = Cursor::new(data);
        if cursor.read_u32::<LittleEndian>()? != Self::SIGNATURE {
            return Err(Error::SignatureNotFound("EOCD not found".into()));
        }

        let disk_number = cursor.read_u16::<LittleEndian>()?;
        let disk_with_cd = cursor.read_u16::<LittleEndian>()?;
        let disk_entries = cursor.read_u16::<LittleEndian>()?;
        let total_entries = cursor.read_u16::<LittleEndian>()?;
        let cd_size = cursor.read_u32::<LittleEndian>()?;
        let cd_offset = cursor.read_u32::<LittleEndian>()?;
        let comment_len = cursor.read_u16::<LittleEndian>()?;

        let comment_end = (Self::SIZE + comment_len as usize).min(data.len());
        let comment = data
            .get(Self::SIZE..comment_end)
            .unwrap_or_default()
            .to_vec();

        Ok(Self {
            disk_number,
            disk_with_cd,
            disk_entries,
            total_entries,
            cd_size,
            cd_offset,
            comment_len,
            comment,
        })
    }

    /// Serialize the record and its comment.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(Self::SIZE + self.comment.len());
        data.extend_from_slice(&Self::SIGNATURE.to_le_bytes());
        data.extend_from_slice(&self.disk_number.to_le_bytes());
        data.extend_from_slice(&self.disk_with_cd.to_le_bytes());
        data.extend_from_slice(&self.disk_entries.to_le_bytes());
        data.extend_from_slice(&self.total_entries.to_le_bytes());
        data.extend_from_slice(&self.cd_size.to_le_bytes());
        data.extend_from_slice(&self.cd_offset.to_le_bytes());
        data.extend_from_slice(&self.comment_len.to_le_bytes());
        data.extend_from_slice(&self.comment);
        data
    }

    /// Total on-disk length of the record including its comment.
    pub fn record_len(&self) -> usize {
        Self::SIZE + self.comment.len()
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
///
/// Only its position and signature matter here: when present it sits
/// immediately before the regular EOCD and marks a ZIP64 archive.
pub struct Zip64EocdLocator;

impl Zip64EocdLocator {
    pub const SIGNATURE: u32 = 0x0706_4b50;
    pub const SIZE: usize = 20;
}
