//! ZIP trailer parsing.
//!
//! An APK is a ZIP archive, and the APK Signing Block is found relative to
//! the ZIP central directory. This module reads just enough of the ZIP
//! trailer to get there.
//!
//! ## Architecture
//!
//! - [`structures`]: the End of Central Directory record and the ZIP64 locator
//! - [`parser`]: locating those records in a [`ReadAt`](crate::io::ReadAt) source
//!
//! ## ZIP Format Overview
//!
//! A signed APK consists of:
//! 1. Local file headers and compressed data for each file
//! 2. The APK Signing Block
//! 3. Central Directory with metadata for all files
//! 4. End of Central Directory (EOCD) record at the end
//!
//! ## Limitations
//!
//! - ZIP64 archives are detected and rejected
//! - No multi-disk archive support

mod parser;
mod structures;

pub use parser::{ZipParser, central_dir_offset, is_zip64_locator_present};
pub use structures::{EndOfCentralDirectory, Zip64EocdLocator};
