//! Low-level ZIP trailer parser.
//!
//! An APK keeps its signing block between the last local file entry and the
//! central directory, so everything we need is found by reading the file
//! from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. Reject ZIP64 archives (the locator record precedes the EOCD)
//! 3. Read the central directory offset from the EOCD
//!
//! Reading from the tail keeps remote inputs cheap: listing the layout of
//! an APK over HTTP only fetches the last few kilobytes.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::{EndOfCentralDirectory, Zip64EocdLocator};

/// Low-level ZIP trailer parser.
///
/// Borrows the reader for the duration of the parse; it never owns or
/// closes it.
pub struct ZipParser<'a, R: ReadAt + ?Sized> {
    /// The underlying data source
    reader: &'a R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<'a, R: ReadAt + ?Sized> ZipParser<'a, R> {
    /// Create a new parser for the given reader.
    pub fn new(reader: &'a R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature. A comment may
    /// itself contain the EOCD signature; only the candidate whose comment
    /// length reaches exactly to the end of the file is accepted.
    ///
    /// # Returns
    ///
    /// A tuple of (EOCD record, offset of EOCD in file).
    ///
    /// # Errors
    ///
    /// [`Error::SignatureNotFound`] if no valid EOCD can be found.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(Error::SignatureNotFound("EOCD not found".into()));
        }

        // Optimization: First try the simple case where there's no comment.
        let offset = self.size - eocd_size;
        let buf = self.reader.read_vec_at(offset, EndOfCentralDirectory::SIZE)?;
        if LittleEndian::read_u32(&buf[0..4]) == EndOfCentralDirectory::SIGNATURE
            && LittleEndian::read_u16(&buf[20..22]) == 0
        {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            log::debug!("EOCD found at offset {} (no comment)", offset);
            return Ok((eocd, offset));
        }

        // EOCD not at expected location - search for it.
        // The EOCD could be earlier if there's a ZIP comment.
        let search_size =
            (EndOfCentralDirectory::MAX_COMMENT_SIZE as u64 + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let buf = self.reader.read_vec_at(search_start, search_size as usize)?;

        // Search backwards for EOCD signature (PK\x05\x06)
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if LittleEndian::read_u32(&buf[i..i + 4]) != EndOfCentralDirectory::SIGNATURE {
                continue;
            }

            // Found a potential EOCD - verify the comment length is correct.
            let field = i + EndOfCentralDirectory::COMMENT_LEN_FIELD_OFFSET;
            let comment_len = LittleEndian::read_u16(&buf[field..field + 2]) as usize;

            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd = EndOfCentralDirectory::from_bytes(&buf[i..])?;
                let offset = search_start + i as u64;
                log::debug!(
                    "EOCD found at offset {} ({} byte comment)",
                    offset,
                    comment_len
                );
                return Ok((eocd, offset));
            }
        }

        Err(Error::SignatureNotFound("EOCD not found".into()))
    }

    /// Fail if a ZIP64 End of Central Directory Locator precedes the EOCD.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`] for ZIP64 archives.
    pub fn ensure_not_zip64(&self, eocd_offset: u64) -> Result<()> {
        if is_zip64_locator_present(self.reader, eocd_offset)? {
            return Err(Error::UnsupportedFormat("ZIP64 APK not supported".into()));
        }
        Ok(())
    }
}

/// Check for the ZIP64 EOCD locator signature 20 bytes before the EOCD.
pub fn is_zip64_locator_present<R: ReadAt + ?Sized>(reader: &R, eocd_offset: u64) -> Result<bool> {
    let locator_size = Zip64EocdLocator::SIZE as u64;
    if eocd_offset < locator_size {
        // No room for a locator record.
        return Ok(false);
    }

    let mut sig = [0u8; 4];
    reader.read_exact_at(eocd_offset - locator_size, &mut sig)?;
    Ok(LittleEndian::read_u32(&sig) == Zip64EocdLocator::SIGNATURE)
}

/// Resolve the central directory start offset declared by the EOCD.
///
/// # Errors
///
/// [`Error::SignatureNotFound`] if the declared offset is not strictly
/// before the EOCD itself.
pub fn central_dir_offset(eocd: &EndOfCentralDirectory, eocd_offset: u64) -> Result<u64> {
    let cd_offset = eocd.cd_offset as u64;
    if cd_offset >= eocd_offset {
        return Err(Error::SignatureNotFound(format!(
            "central dir after EOCD: ZIP Central Directory offset out of range: {}. \
             ZIP End of Central Directory offset: {}",
            cd_offset, eocd_offset
        )));
    }
    Ok(cd_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 22-byte EOCD with the given central directory location and comment.
    fn eocd_bytes(cd_offset: u32, cd_size: u32, comment: &[u8]) -> Vec<u8> {
        let mut data = EndOfCentralDirectory::SIGNATURE.to_le_bytes().to_vec();
        data.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        data.extend_from_slice(&cd_size.to_le_bytes());
        data.extend_from_slice(&cd_offset.to_le_bytes());
        data.extend_from_slice(&(comment.len() as u16).to_le_bytes());
        data.extend_from_slice(comment);
        data
    }

    #[test]
    fn finds_eocd_without_comment() {
        let mut file = vec![0xAAu8; 100];
        file.extend(eocd_bytes(60, 40, b""));
        let (eocd, offset) = ZipParser::new(&file).find_eocd().unwrap();
        assert_eq!(offset, 100);
        assert_eq!(eocd.cd_offset, 60);
        assert_eq!(eocd.cd_size, 40);
    }

    #[test]
    fn finds_eocd_with_comment() {
        let comment = [b'c'; 40];
        let mut file = vec![0u8; 64];
        file.extend(eocd_bytes(10, 54, &comment));
        let len = file.len() as u64;
        let (eocd, offset) = ZipParser::new(&file).find_eocd().unwrap();
        assert_eq!(offset, len - 22 - 40);
        assert_eq!(eocd.comment, comment.to_vec());
    }

    #[test]
    fn ignores_fake_eocd_inside_comment() {
        // The comment embeds an EOCD-looking record whose comment length is wrong.
        let mut comment = eocd_bytes(1, 1, b"");
        comment.extend_from_slice(b"tail");
        let mut file = vec![0u8; 32];
        file.extend(eocd_bytes(8, 24, &comment));
        let (eocd, offset) = ZipParser::new(&file).find_eocd().unwrap();
        assert_eq!(offset, 32);
        assert_eq!(eocd.cd_offset, 8);
    }

    #[test]
    fn missing_eocd_is_signature_not_found() {
        let file = vec![0u8; 500];
        let err = ZipParser::new(&file).find_eocd().unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg == "EOCD not found"));

        let tiny = vec![0u8; 5];
        assert!(matches!(
            ZipParser::new(&tiny).find_eocd(),
            Err(Error::SignatureNotFound(_))
        ));
    }

    #[test]
    fn zip64_locator_is_rejected() {
        let mut file = vec![0u8; 40];
        file.extend_from_slice(&Zip64EocdLocator::SIGNATURE.to_le_bytes());
        file.extend_from_slice(&[0u8; 16]);
        file.extend(eocd_bytes(0, 0, b""));
        let parser = ZipParser::new(&file);
        let (_, offset) = parser.find_eocd().unwrap();
        let err = parser.ensure_not_zip64(offset).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ref msg) if msg == "ZIP64 APK not supported"));
    }

    #[test]
    fn central_dir_must_precede_eocd() {
        let eocd = EndOfCentralDirectory::from_bytes(&eocd_bytes(100, 0, b"")).unwrap();
        assert_eq!(central_dir_offset(&eocd, 101).unwrap(), 100);
        assert!(matches!(
            central_dir_offset(&eocd, 100),
            Err(Error::SignatureNotFound(_))
        ));
    }

    #[test]
    fn finds_eocd_with_max_length_comment() {
        let comment = vec![b'z'; EndOfCentralDirectory::MAX_COMMENT_SIZE];
        let mut file = vec![0u8; 62];
        file.extend(eocd_bytes(0, 0, &comment));
        let (eocd, offset) = ZipParser::new(&file).find_eocd().unwrap();
        assert_eq!(offset, 62);
        assert_eq!(eocd.comment.len(), 65535);
    }

    #[test]
    fn eocd_beyond_search_window_is_not_found() {
        // Declares the longest comment but is followed by one byte more,
        // so the record starts 65558 bytes from the end.
        let comment = vec![b'z'; EndOfCentralDirectory::MAX_COMMENT_SIZE];
        let mut file = vec![0u8; 16];
        file.extend(eocd_bytes(0, 0, &comment));
        file.push(b'z');
        let err = ZipParser::new(&file).find_eocd().unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg == "EOCD not found"));
    }

    #[test]
    fn no_room_for_zip64_locator() {
        let mut file = vec![0u8; 10];
        file.extend(eocd_bytes(0, 0, b""));
        assert!(!is_zip64_locator_present(&file, 10).unwrap());
    }
}
