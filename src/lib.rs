//! # apksigblock
//!
//! Locate, parse and rebuild the APK Signing Block of signed Android packages.
//!
//! A v2-signed APK is a ZIP archive with an extra block between the last
//! local file entry and the central directory. This library finds that
//! block, enumerates its ID-value pairs in order, serializes a new block from
//! an ordered map of pairs, and splits the APK into its four contiguous
//! regions so downstream tooling can recompute signatures or swap in extra
//! pairs such as channel identifiers.
//!
//! Signature verification is out of scope: the library only locates, parses
//! and emits the block.
//!
//! ## Features
//!
//! - EOCD discovery, including archives with a ZIP comment
//! - ZIP64 detection (rejected with [`Error::UnsupportedFormat`])
//! - Order-preserving pair parsing, with a duplicate-preserving list form
//! - Byte-exact serialization compatible with the Android verifier
//! - Section extraction from local files, in-memory buffers or HTTP URLs
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use apksigblock::{ApkSections, APK_SIGNATURE_SCHEME_V2_BLOCK_ID};
//!
//! fn main() -> apksigblock::Result<()> {
//!     let sections = ApkSections::from_path(Path::new("app-release.apk"))?;
//!     let mut pairs = sections.pairs()?;
//!     assert!(pairs.contains_key(&APK_SIGNATURE_SCHEME_V2_BLOCK_ID));
//!
//!     pairs.insert(0x7177_7777, b"channel=store".to_vec());
//!     let rebuilt = sections.rebuild_with_pairs(&pairs)?;
//!     std::fs::write("app-store.apk", rebuilt)?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod sections;
pub mod signing_block;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use sections::{
    ApkLayout, ApkSections, FileRegion, extract_sections, locate_layout, locate_signing_block,
    read_signing_block,
};
pub use signing_block::{
    APK_SIGNATURE_SCHEME_V2_BLOCK_ID, IdValueMap, IdValuePair, find_signing_block,
    parse_pair_list, parse_pairs, serialize_pair_list, serialize_pairs,
};
