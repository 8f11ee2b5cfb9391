//! APK Signing Block location, parsing and serialization.
//!
//! The block sits immediately before the ZIP central directory:
//!
//! ```text
//! u64   size in bytes (excluding this field)
//! repeated ID-value pairs:
//!     u64            size of pair (excluding this field)
//!     u32            ID
//!     (size - 4)     value
//! u64   size in bytes (same as the first field)
//! u128  magic "APK Sig Block 42"
//! ```
//!
//! All integers are little-endian.
//! <https://source.android.com/docs/security/features/apksigning/v2>

mod locator;
mod pairs;

pub use locator::find_signing_block;
pub use pairs::{
    IdValueMap, IdValuePair, parse_pair_list, parse_pairs, serialize_pair_list, serialize_pairs,
};

/// Magic number at the end of the APK Signing Block
pub const MAGIC: &[u8; 16] = b"APK Sig Block 42";

/// Low half of [`MAGIC`] read as a little-endian u64
pub const MAGIC_LO: u64 = 0x2067_6953_204b_5041;

/// High half of [`MAGIC`] read as a little-endian u64
pub const MAGIC_HI: u64 = 0x3234_206b_636f_6c42;

/// Size of the trailing size field plus the magic
pub const FOOTER_SIZE: usize = 8 + MAGIC.len();

/// Smallest possible block: both size fields and the magic, no pairs
pub const MIN_BLOCK_SIZE: usize = 8 + FOOTER_SIZE;

/// Largest size field accepted, for the block and for each pair.
///
/// Matches the Android verifier, which indexes with signed 32-bit integers.
pub const MAX_SIZE_FIELD: u64 = i32::MAX as u64;

/// APK Signature Scheme v2 block ID
pub const APK_SIGNATURE_SCHEME_V2_BLOCK_ID: u32 = 0x7109_871a;

/// APK Signature Scheme v3 block ID
pub const APK_SIGNATURE_SCHEME_V3_BLOCK_ID: u32 = 0xf053_68c0;

/// APK Signature Scheme v3.1 block ID
pub const APK_SIGNATURE_SCHEME_V31_BLOCK_ID: u32 = 0x1b93_ad61;

/// <https://android.googlesource.com/platform/tools/apksig/+/master/src/main/java/com/android/apksig/internal/apk/ApkSigningBlockUtils.java>
pub const VERITY_PADDING_BLOCK_ID: u32 = 0x4272_6577;

/// <https://android.googlesource.com/platform/frameworks/base/+/master/core/java/android/util/apk/SourceStampVerifier.java>
pub const SOURCE_STAMP_BLOCK_ID: u32 = 0x6dff_800d;

/// Dependency metadata block written by the Android Gradle Plugin
pub const DEPENDENCY_INFO_BLOCK_ID: u32 = 0x504b_4453;

/// Human-readable name for the well-known block IDs.
pub fn block_id_name(id: u32) -> Option<&'static str> {
    match id {
        APK_SIGNATURE_SCHEME_V2_BLOCK_ID => Some("APK Signature Scheme v2"),
        APK_SIGNATURE_SCHEME_V3_BLOCK_ID => Some("APK Signature Scheme v3"),
        APK_SIGNATURE_SCHEME_V31_BLOCK_ID => Some("APK Signature Scheme v3.1"),
        VERITY_PADDING_BLOCK_ID => Some("Verity padding"),
        SOURCE_STAMP_BLOCK_ID => Some("Source stamp"),
        DEPENDENCY_INFO_BLOCK_ID => Some("Dependency info"),
        _ => None,
    }
}
