use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::io::ReadAt;
use crate::sections::FileRegion;

use super::{FOOTER_SIZE, MAGIC, MAX_SIZE_FIELD};

/// Find the APK Signing Block that ends at `central_dir_offset`.
///
/// Validates the magic, both size fields and that the block fits before the
/// central directory, then returns an owned copy of the whole block
/// (header size field through magic) with its starting offset.
///
/// # Errors
///
/// [`Error::SignatureNotFound`] if there is no well-formed block, or
/// [`Error::Io`] if the reader fails.
pub fn find_signing_block<R: ReadAt + ?Sized>(
    reader: &R,
    central_dir_offset: u64,
) -> Result<FileRegion> {
    let footer_size = FOOTER_SIZE as u64;
    // Room for the header size field plus the footer
    if central_dir_offset < footer_size + 8 {
        return Err(Error::SignatureNotFound(format!(
            "APK too small for APK Signing Block. ZIP Central Directory offset: {}",
            central_dir_offset
        )));
    }

    let mut footer = [0u8; FOOTER_SIZE];
    reader.read_exact_at(central_dir_offset - footer_size, &mut footer)?;

    if &footer[8..] != MAGIC {
        return Err(Error::SignatureNotFound(
            "magic mismatch: no APK Signing Block before ZIP Central Directory".into(),
        ));
    }

    // The footer size excludes the header size field, so the whole block
    // (size + 8) must itself stay within MAX_SIZE_FIELD.
    let size_in_footer = LittleEndian::read_u64(&footer[..8]);
    if size_in_footer < footer_size || size_in_footer > MAX_SIZE_FIELD - 8 {
        return Err(Error::SignatureNotFound(format!(
            "APK Signing Block size out of range: {}",
            size_in_footer
        )));
    }

    let total_size = size_in_footer + 8;
    if total_size > central_dir_offset {
        return Err(Error::SignatureNotFound(format!(
            "APK Signing Block offset out of range: {} bytes before ZIP Central Directory at {}",
            total_size, central_dir_offset
        )));
    }

    let block_offset = central_dir_offset - total_size;
    let block = reader.read_vec_at(block_offset, total_size as usize)?;

    let size_in_header = LittleEndian::read_u64(&block[..8]);
    if size_in_header != size_in_footer {
        return Err(Error::SignatureNotFound(format!(
            "size mismatch: APK Signing Block sizes in header and footer do not match: {} vs {}",
            size_in_header, size_in_footer
        )));
    }

    log::debug!(
        "APK Signing Block found at offset {} ({} bytes)",
        block_offset,
        total_size
    );
    Ok(FileRegion::new(block, block_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing_block::{IdValueMap, serialize_pairs};

    fn block() -> Vec<u8> {
        let mut pairs = IdValueMap::new();
        pairs.insert(0x7109871a, vec![1, 2, 3, 4]);
        serialize_pairs(&pairs).unwrap()
    }

    #[test]
    fn finds_block_before_central_dir() {
        let block = block();
        let mut file = vec![0x11u8; 30];
        file.extend_from_slice(&block);
        let cd_offset = file.len() as u64;
        file.extend_from_slice(&[0x22; 10]);

        let region = find_signing_block(&file, cd_offset).unwrap();
        assert_eq!(region.offset, 30);
        assert_eq!(region.bytes, block);
    }

    #[test]
    fn too_small_offset() {
        let file = vec![0u8; 64];
        let err = find_signing_block(&file, 31).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(_)));
    }

    #[test]
    fn magic_mismatch() {
        let mut file = block();
        let len = file.len();
        file[len - 1] ^= 0xFF;
        let err = find_signing_block(&file, len as u64).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg.starts_with("magic mismatch")));
    }

    #[test]
    fn header_footer_size_mismatch() {
        let mut file = block();
        file[0] += 1;
        let len = file.len() as u64;
        let err = find_signing_block(&file, len).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg.starts_with("size mismatch")));
    }

    #[test]
    fn declared_size_larger_than_prefix() {
        let mut file = block();
        let len = file.len();
        // Footer size field claims more than the bytes available before it
        file[len - 24..len - 16].copy_from_slice(&1000u64.to_le_bytes());
        let err = find_signing_block(&file, len as u64).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(_)));
    }

    #[test]
    fn declared_size_above_ceiling() {
        let mut file = block();
        let len = file.len();
        file[len - 24..len - 16].copy_from_slice(&(i32::MAX as u64).to_le_bytes());
        let err = find_signing_block(&file, len as u64).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg.contains("size out of range")));
    }

    #[test]
    fn whole_block_must_fit_size_ceiling() {
        let mut file = block();
        let len = file.len();
        let footer = len - 24..len - 16;

        file[footer.clone()].copy_from_slice(&(i32::MAX as u64 - 7).to_le_bytes());
        let err = find_signing_block(&file, len as u64).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg.contains("size out of range")));

        // At the ceiling the size is accepted and the block no longer fits the file.
        file[footer].copy_from_slice(&(i32::MAX as u64 - 8).to_le_bytes());
        let err = find_signing_block(&file, len as u64).unwrap_err();
        assert!(matches!(err, Error::SignatureNotFound(ref msg) if msg.contains("offset out of range")));
    }
}
