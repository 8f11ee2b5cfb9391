use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use indexmap::IndexMap;
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

use super::{
    APK_SIGNATURE_SCHEME_V2_BLOCK_ID, FOOTER_SIZE, MAGIC_HI, MAGIC_LO, MAX_SIZE_FIELD,
    MIN_BLOCK_SIZE,
};

/// Ordered ID to value mapping of an APK Signing Block.
///
/// Iteration order is the order the pairs appear in the block. Inserting an
/// existing ID replaces its value in place.
pub type IdValueMap = IndexMap<u32, Vec<u8>>;

/// A single ID-value pair, used where duplicate IDs must be kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdValuePair {
    pub id: u32,
    pub value: Vec<u8>,
}

impl IdValuePair {
    pub fn new(id: u32, value: Vec<u8>) -> Self {
        Self { id, value }
    }

    /// Encoded length including the u64 size prefix.
    fn encoded_len(&self) -> u64 {
        8 + 4 + self.value.len() as u64
    }
}

/// Parse every pair of `block`, keeping duplicates and order.
///
/// `block` is a whole signing block as returned by
/// [`find_signing_block`](super::find_signing_block): header size field,
/// pairs, footer size field and magic. The framing itself is not re-checked
/// here; only the pairs region `block[8..len - 24]` is read.
///
/// # Errors
///
/// [`Error::SignatureNotFound`] if an entry is truncated or out of range, or
/// if the block holds no pairs at all.
pub fn parse_pair_list(block: &[u8]) -> Result<Vec<IdValuePair>> {
    if block.len() < MIN_BLOCK_SIZE {
        return Err(Error::SignatureNotFound(format!(
            "APK Signing Block too small: {} bytes",
            block.len()
        )));
    }

    let pairs_region = &block[8..block.len() - FOOTER_SIZE];
    let mut cursor = Cursor::new(pairs_region);
    let mut pairs = Vec::new();
    let mut entry_count = 0;

    loop {
        let remaining = pairs_region.len() as u64 - cursor.position();
        if remaining == 0 {
            break;
        }
        entry_count += 1;

        if remaining < 8 {
            return Err(Error::SignatureNotFound(format!(
                "Insufficient data to read size of APK Signing Block entry #{}",
                entry_count
            )));
        }

        let len = cursor.read_u64::<LittleEndian>()?;
        if !(4..=MAX_SIZE_FIELD).contains(&len) {
            return Err(Error::SignatureNotFound(format!(
                "APK Signing Block entry #{} size out of range: {}",
                entry_count, len
            )));
        }

        let available = remaining - 8;
        if len > available {
            return Err(Error::SignatureNotFound(format!(
                "APK Signing Block entry #{} size out of range: {}, available: {}",
                entry_count, len, available
            )));
        }
        let next_entry_pos = cursor.position() + len;

        let id = cursor.read_u32::<LittleEndian>()?;
        let mut value = vec![0u8; (len - 4) as usize];
        cursor.read_exact(&mut value)?;

        if id == APK_SIGNATURE_SCHEME_V2_BLOCK_ID {
            log::debug!(
                "found APK Signature Scheme v2 block id {:#x} in entry #{}",
                id,
                entry_count
            );
        }
        pairs.push(IdValuePair::new(id, value));
        cursor.set_position(next_entry_pos);
    }

    if pairs.is_empty() {
        return Err(Error::SignatureNotFound(format!(
            "no pairs: no ID-value pair in APK Signing Block entry #{}",
            entry_count
        )));
    }

    Ok(pairs)
}

/// Parse `block` into an ordered map.
///
/// A repeated ID overwrites the earlier value but keeps the position of its
/// first occurrence. Use [`parse_pair_list`] to observe duplicates.
///
/// # Errors
///
/// Same as [`parse_pair_list`].
pub fn parse_pairs(block: &[u8]) -> Result<IdValueMap> {
    let list = parse_pair_list(block)?;
    let mut map = IdValueMap::with_capacity(list.len());
    for pair in list {
        map.insert(pair.id, pair.value);
    }
    Ok(map)
}

/// Serialize `pairs` into a complete, self-framed APK Signing Block.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for an empty map or an oversized value.
pub fn serialize_pairs(pairs: &IdValueMap) -> Result<Vec<u8>> {
    let list: Vec<IdValuePair> = pairs
        .iter()
        .map(|(&id, value)| IdValuePair::new(id, value.clone()))
        .collect();
    serialize_pair_list(&list)
}

/// Serialize a list of pairs in order, duplicates included.
///
/// # Errors
///
/// [`Error::InvalidArgument`] for an empty list, an oversized value or a
/// block too large to be located again, [`Error::Internal`] if the written length disagrees with the computed one.
pub fn serialize_pair_list(pairs: &[IdValuePair]) -> Result<Vec<u8>> {
    if pairs.is_empty() {
        return Err(Error::InvalidArgument("empty pair map".into()));
    }

    // Size excluding the leading size field: footer size field + magic + pairs
    let mut length = FOOTER_SIZE as u64;
    for pair in pairs {
        if pair.value.len() as u64 + 4 > MAX_SIZE_FIELD {
            return Err(Error::InvalidArgument(format!(
                "value of pair {:#x} too large: {} bytes",
                pair.id,
                pair.value.len()
            )));
        }
        length += pair.encoded_len();
    }

    check_block_length(length)?;
    let total = usize::try_from(length + 8)
        .map_err(|_| Error::InvalidArgument(format!("pair map too large: {} bytes", length)))?;
    let mut block = Vec::with_capacity(total);

    block.write_u64::<LittleEndian>(length)?;
    for pair in pairs {
        block.write_u64::<LittleEndian>(pair.value.len() as u64 + 4)?;
        block.write_u32::<LittleEndian>(pair.id)?;
        block.extend_from_slice(&pair.value);
    }
    block.write_u64::<LittleEndian>(length)?;
    block.write_u64::<LittleEndian>(MAGIC_LO)?;
    block.write_u64::<LittleEndian>(MAGIC_HI)?;

    if block.len() != total {
        return Err(Error::Internal(format!(
            "serialized APK Signing Block is {} bytes, expected {}",
            block.len(),
            total
        )));
    }

    Ok(block)
}

/// Reject a block size field that [`find_signing_block`](super::find_signing_block)
/// would refuse, so a rebuilt APK can always be located again.
fn check_block_length(length: u64) -> Result<()> {
    if length > MAX_SIZE_FIELD - 8 {
        return Err(Error::InvalidArgument(format!(
            "pair map too large: APK Signing Block size {} exceeds {}",
            length,
            MAX_SIZE_FIELD - 8
        )));
    }
    Ok(())
}
