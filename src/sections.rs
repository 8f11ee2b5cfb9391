//! Splitting a signed APK into its four contiguous regions.
//!
//! ```text
//! +------------------+-----------------------+-------------------+------+
//! | content entries  | APK Signing Block     | central directory | EOCD |
//! +------------------+-----------------------+-------------------+------+
//! 0                  block offset            cd offset           eocd offset
//! ```
//!
//! [`locate_layout`] resolves the offsets only, reading the tail of the file
//! and the signing block. [`extract_sections`] additionally copies every
//! region into memory so that callers can rebuild the APK with a new block.

use std::path::Path;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};
use crate::signing_block::{self, IdValueMap};
use crate::zip::{EndOfCentralDirectory, ZipParser, central_dir_offset};

/// A contiguous run of bytes copied out of the APK, with its file offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRegion {
    pub bytes: Vec<u8>,
    pub offset: u64,
}

impl FileRegion {
    pub fn new(bytes: Vec<u8>, offset: u64) -> Self {
        Self { bytes, offset }
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset one past the last byte of the region.
    pub fn end(&self) -> u64 {
        self.offset + self.len()
    }
}

/// Offsets of the four regions, without their contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApkLayout {
    pub file_size: u64,
    pub signing_block_offset: u64,
    pub central_dir_offset: u64,
    /// Central directory size as declared by the EOCD
    pub central_dir_size: u64,
    pub eocd_offset: u64,
}

impl ApkLayout {
    pub fn content_entries_len(&self) -> u64 {
        self.signing_block_offset
    }

    pub fn signing_block_len(&self) -> u64 {
        self.central_dir_offset - self.signing_block_offset
    }

    /// Length of the central directory region, measured up to the EOCD.
    pub fn central_dir_len(&self) -> u64 {
        self.eocd_offset - self.central_dir_offset
    }

    pub fn eocd_len(&self) -> u64 {
        self.file_size - self.eocd_offset
    }
}

/// The four regions of a signed APK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApkSections {
    pub content_entries: FileRegion,
    pub signing_block: FileRegion,
    pub central_dir: FileRegion,
    pub eocd: FileRegion,
}

/// Signing block plus the trailer facts every entry point needs.
struct Located {
    eocd_offset: u64,
    eocd: EndOfCentralDirectory,
    central_dir_offset: u64,
    signing_block: FileRegion,
}

fn locate<R: ReadAt + ?Sized>(reader: &R) -> Result<Located> {
    let parser = ZipParser::new(reader);
    let (eocd, eocd_offset) = parser.find_eocd()?;
    parser.ensure_not_zip64(eocd_offset)?;

    // The APK Signing Block immediately precedes the Central Directory.
    let central_dir_offset = central_dir_offset(&eocd, eocd_offset)?;
    let signing_block = signing_block::find_signing_block(reader, central_dir_offset)?;

    Ok(Located {
        eocd_offset,
        eocd,
        central_dir_offset,
        signing_block,
    })
}

/// Resolve the region offsets of the APK behind `reader`.
///
/// Only the EOCD search window and the signing block are read.
///
/// # Errors
///
/// [`Error::SignatureNotFound`] if the APK has no valid signing block,
/// [`Error::UnsupportedFormat`] for ZIP64, [`Error::Io`] on read failure.
pub fn locate_layout<R: ReadAt + ?Sized>(reader: &R) -> Result<ApkLayout> {
    locate_signing_block(reader).map(|(layout, _)| layout)
}

/// Resolve the region offsets and copy out the signing block.
///
/// # Errors
///
/// Same as [`locate_layout`].
pub fn locate_signing_block<R: ReadAt + ?Sized>(reader: &R) -> Result<(ApkLayout, FileRegion)> {
    let located = locate(reader)?;
    let layout = ApkLayout {
        file_size: reader.size(),
        signing_block_offset: located.signing_block.offset,
        central_dir_offset: located.central_dir_offset,
        central_dir_size: located.eocd.cd_size as u64,
        eocd_offset: located.eocd_offset,
    };
    Ok((layout, located.signing_block))
}

/// Copy the four regions of the APK behind `reader` into memory.
///
/// # Errors
///
/// Same as [`locate_layout`], plus [`Error::CorruptLayout`] if the regions
/// do not tile the file.
pub fn extract_sections<R: ReadAt + ?Sized>(reader: &R) -> Result<ApkSections> {
    let Located {
        eocd_offset,
        central_dir_offset,
        signing_block,
        ..
    } = locate(reader)?;
    let size = reader.size();

    let central_dir = FileRegion::new(
        reader.read_vec_at(central_dir_offset, to_len(eocd_offset - central_dir_offset)?)?,
        central_dir_offset,
    );
    let content_entries = FileRegion::new(reader.read_vec_at(0, to_len(signing_block.offset)?)?, 0);
    let eocd = FileRegion::new(
        reader.read_vec_at(eocd_offset, to_len(size - eocd_offset)?)?,
        eocd_offset,
    );

    let sections = ApkSections {
        content_entries,
        signing_block,
        central_dir,
        eocd,
    };
    sections.check_tiling(size)?;

    log::info!(
        "APK sections: content entries {} bytes, signing block {} bytes at {}, \
         central directory {} bytes at {}, EOCD {} bytes at {}",
        sections.content_entries.len(),
        sections.signing_block.len(),
        sections.signing_block.offset,
        sections.central_dir.len(),
        sections.central_dir.offset,
        sections.eocd.len(),
        sections.eocd.offset
    );
    Ok(sections)
}

/// Read only the APK Signing Block of the file at `path`.
///
/// # Errors
///
/// Same as [`locate_layout`].
pub fn read_signing_block(path: &Path) -> Result<FileRegion> {
    let reader = LocalFileReader::new(path)?;
    locate_signing_block(&reader).map(|(_, block)| block)
}

fn to_len(len: u64) -> Result<usize> {
    usize::try_from(len)
        .map_err(|_| Error::UnsupportedFormat(format!("region of {} bytes does not fit in memory", len)))
}

impl ApkSections {
    /// Open the APK at `path` and extract its regions.
    ///
    /// The file is closed before this returns, whether or not extraction succeeds.
    ///
    /// # Errors
    ///
    /// Same as [`extract_sections`].
    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = LocalFileReader::new(path)?;
        extract_sections(&reader)
    }

    /// Check that the regions are contiguous, in order, and cover `file_size` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::CorruptLayout`] naming the first boundary that does not line up.
    pub fn check_tiling(&self, file_size: u64) -> Result<()> {
        if self.content_entries.offset != 0 {
            return Err(Error::CorruptLayout(format!(
                "content entries start at {} instead of 0",
                self.content_entries.offset
            )));
        }

        let boundaries = [
            ("signing block", &self.content_entries, &self.signing_block),
            ("central directory", &self.signing_block, &self.central_dir),
            ("EOCD", &self.central_dir, &self.eocd),
        ];
        for (name, previous, next) in boundaries {
            if previous.end() != next.offset {
                return Err(Error::CorruptLayout(format!(
                    "{} starts at {} but the previous region ends at {}",
                    name,
                    next.offset,
                    previous.end()
                )));
            }
        }

        if self.eocd.end() != file_size {
            return Err(Error::CorruptLayout(format!(
                "regions end at {} but the file is {} bytes",
                self.eocd.end(),
                file_size
            )));
        }
        Ok(())
    }

    /// Total length of all four regions.
    pub fn total_len(&self) -> u64 {
        self.content_entries.len()
            + self.signing_block.len()
            + self.central_dir.len()
            + self.eocd.len()
    }

    /// Concatenate the regions back into the original file bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut apk = Vec::with_capacity(self.total_len() as usize);
        apk.extend_from_slice(&self.content_entries.bytes);
        apk.extend_from_slice(&self.signing_block.bytes);
        apk.extend_from_slice(&self.central_dir.bytes);
        apk.extend_from_slice(&self.eocd.bytes);
        apk
    }

    /// Parse the ID-value pairs of the signing block.
    ///
    /// # Errors
    ///
    /// See [`signing_block::parse_pairs`].
    pub fn pairs(&self) -> Result<IdValueMap> {
        signing_block::parse_pairs(&self.signing_block.bytes)
    }

    /// Rebuild the APK with a signing block serialized from `pairs`.
    ///
    /// The EOCD's central directory offset is moved by the size change of the
    /// block. Whether the result still verifies depends on the pairs supplied:
    /// the v2 signature covers the content entries, central directory and
    /// EOCD, but not the other pairs of the block.
    ///
    /// # Errors
    ///
    /// See [`signing_block::serialize_pairs`]; [`Error::UnsupportedFormat`] if
    /// the new central directory offset no longer fits the 32-bit EOCD field.
    pub fn rebuild_with_pairs(&self, pairs: &IdValueMap) -> Result<Vec<u8>> {
        let block = signing_block::serialize_pairs(pairs)?;

        let new_cd_offset = self.content_entries.len() + block.len() as u64;
        let new_cd_offset = u32::try_from(new_cd_offset).map_err(|_| {
            Error::UnsupportedFormat(format!(
                "central directory offset {} requires ZIP64",
                new_cd_offset
            ))
        })?;

        let mut eocd = EndOfCentralDirectory::from_bytes(&self.eocd.bytes)?;
        eocd.cd_offset = new_cd_offset;
        let eocd_bytes = eocd.to_bytes();
        if eocd_bytes.len() != self.eocd.bytes.len() {
            return Err(Error::CorruptLayout(format!(
                "EOCD region is {} bytes but its record declares {}",
                self.eocd.bytes.len(),
                eocd_bytes.len()
            )));
        }

        log::debug!(
            "rebuilding APK: signing block {} -> {} bytes, central directory offset {} -> {}",
            self.signing_block.len(),
            block.len(),
            self.central_dir.offset,
            new_cd_offset
        );

        let mut apk = Vec::with_capacity(
            self.content_entries.bytes.len()
                + block.len()
                + self.central_dir.bytes.len()
                + eocd_bytes.len(),
        );
        apk.extend_from_slice(&self.content_entries.bytes);
        apk.extend_from_slice(&block);
        apk.extend_from_slice(&self.central_dir.bytes);
        apk.extend_from_slice(&eocd_bytes);
        Ok(apk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(offset: u64, len: usize) -> FileRegion {
        FileRegion::new(vec![0; len], offset)
    }

    #[test]
    fn layout_lengths() {
        let layout = ApkLayout {
            file_size: 200,
            signing_block_offset: 50,
            central_dir_offset: 98,
            central_dir_size: 80,
            eocd_offset: 178,
        };
        assert_eq!(layout.content_entries_len(), 50);
        assert_eq!(layout.signing_block_len(), 48);
        assert_eq!(layout.central_dir_len(), 80);
        assert_eq!(layout.eocd_len(), 22);
    }

    #[test]
    fn tiling_detects_gaps() {
        let mut sections = ApkSections {
            content_entries: region(0, 10),
            signing_block: region(10, 32),
            central_dir: region(42, 5),
            eocd: region(47, 22),
        };
        sections.check_tiling(69).unwrap();
        assert_eq!(sections.total_len(), 69);

        assert!(matches!(sections.check_tiling(70), Err(Error::CorruptLayout(_))));

        sections.central_dir.offset = 43;
        let err = sections.check_tiling(69).unwrap_err();
        assert!(matches!(err, Error::CorruptLayout(ref msg) if msg.starts_with("central directory")));
    }
}
