//! Object identifier node sequences.
//!
//! The first subidentifier packs the first two nodes (`40 * first + second`);
//! every subidentifier is base-128, most significant group first, with the
//! top bit of each octet set while more octets follow.

use std::fmt;

use smallvec::SmallVec;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};

const MORE_BIT: u8 = 0x80;

/// Well-known identifiers used by the certificate decoder.
pub mod known {
    /// id-at-commonName
    pub const COMMON_NAME: &[u32] = &[2, 5, 4, 3];
    /// id-at-countryName
    pub const COUNTRY_NAME: &[u32] = &[2, 5, 4, 6];
    /// id-at-organizationName
    pub const ORGANIZATION_NAME: &[u32] = &[2, 5, 4, 10];
    /// sha256WithRSAEncryption
    pub const SHA256_WITH_RSA: &[u32] = &[1, 2, 840, 113549, 1, 1, 11];
    /// ecdsa-with-SHA256
    pub const ECDSA_WITH_SHA256: &[u32] = &[1, 2, 840, 10045, 4, 3, 2];
    /// rsaEncryption
    pub const RSA_ENCRYPTION: &[u32] = &[1, 2, 840, 113549, 1, 1, 1];
}

/// Decode the node sequence held in the next `size` bytes into `out`.
///
/// Returns the number of nodes written. The cursor always advances by exactly
/// `size` bytes on success; decoding stops filling `out` once it is full but
/// still validates the remaining subidentifiers.
///
/// Every subidentifier is accumulated until an octet with the top bit clear,
/// so nodes of any width up to 32 bits decode, and byte accounting follows the
/// octets actually consumed. Errors:
/// - fewer than `size` bytes captured: `TooShort`, nothing consumed
/// - a node wider than 32 bits, or a final subidentifier cut off by `size`:
///   `Malformed`
pub fn read_node_sequence(cursor: &mut Cursor<'_>, size: usize, out: &mut [u32]) -> DecodeResult<usize> {
    cursor.ensure(size)?;
    let mut seq = cursor.take(size)?;
    let mut count = 0;

    if seq.is_empty() {
        return Ok(0);
    }

    let mut push = |node: u32, count: &mut usize| {
        if let Some(slot) = out.get_mut(*count) {
            *slot = node;
            *count += 1;
        }
    };

    let first = read_subidentifier(&mut seq)?;
    // First subidentifier packs the first two nodes as first * 40 + second
    push(first / 40, &mut count);
    push(first % 40, &mut count);

    while !seq.is_empty() {
        let node = read_subidentifier(&mut seq)?;
        push(node, &mut count);
    }

    Ok(count)
}

fn read_subidentifier(seq: &mut Cursor<'_>) -> DecodeResult<u32> {
    let mut value: u32 = 0;
    let mut octets = 0usize;
    loop {
        let b = seq.read_u8().map_err(|_| {
            DecodeError::malformed("oid", "subidentifier runs past the end of the sequence")
        })?;
        octets += 1;
        if value > (u32::MAX >> 7) {
            return Err(DecodeError::malformed("oid", "node overflows 32 bits"));
        }
        value = (value << 7) | u32::from(b & !MORE_BIT);
        if b & MORE_BIT == 0 {
            if octets > 1 {
                debug!("Decoded {octets}-octet node {value}");
            }
            return Ok(value);
        }
    }
}

/// An owned object identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Oid(SmallVec<[u32; 12]>);

impl Oid {
    /// Maximum nodes kept from a single identifier.
    pub const MAX_NODES: usize = 32;

    pub fn from_nodes(nodes: &[u32]) -> Self {
        Oid(SmallVec::from_slice(nodes))
    }

    /// Decode the content octets of an OBJECT IDENTIFIER element.
    pub fn from_content(content: &[u8]) -> DecodeResult<Self> {
        let mut nodes = [0u32; Self::MAX_NODES];
        let mut cursor = Cursor::new(content);
        let n = read_node_sequence(&mut cursor, content.len(), &mut nodes)?;
        Ok(Self::from_nodes(&nodes[..n]))
    }

    pub fn nodes(&self) -> &[u32] {
        &self.0
    }

    pub fn is(&self, nodes: &[u32]) -> bool {
        self.0.as_slice() == nodes
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseStatus;

    fn decode(bytes: &[u8]) -> DecodeResult<Vec<u32>> {
        let mut out = [0u32; 16];
        let mut c = Cursor::new(bytes);
        let n = read_node_sequence(&mut c, bytes.len(), &mut out)?;
        assert_eq!(c.position(), bytes.len());
        Ok(out[..n].to_vec())
    }

    #[test]
    fn test_first_octet_splits_into_two_nodes() {
        assert_eq!(decode(&[0x2a]).unwrap(), vec![1, 2]);
        assert_eq!(decode(&[0x00]).unwrap(), vec![0, 0]);
        assert_eq!(decode(&[0x55]).unwrap(), vec![2, 5]);
    }

    #[test]
    fn test_two_octet_node() {
        // 0x81 0x00 = 1 * 128 + 0
        assert_eq!(decode(&[0x2a, 0x81, 0x00]).unwrap(), vec![1, 2, 128]);
    }

    #[test]
    fn test_rsa_encryption() {
        // 1.2.840.113549.1.1.1
        let bytes = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
        assert_eq!(decode(&bytes).unwrap(), known::RSA_ENCRYPTION.to_vec());
    }

    #[test]
    fn test_first_octet_above_arc_two() {
        assert_eq!(decode(&[0x78]).unwrap(), vec![3, 0]);
        assert_eq!(decode(&[0x7f]).unwrap(), vec![3, 7]);
        // 1079 = 0x88 0x37, split by 40 like a single-octet value
        assert_eq!(decode(&[0x88, 0x37]).unwrap(), vec![26, 39]);
    }

    #[test]
    fn test_wide_nodes_decode() {
        // 16384 needs three octets
        assert_eq!(decode(&[0x2a, 0x81, 0x80, 0x00]).unwrap(), vec![1, 2, 16384]);
    }

    #[test]
    fn test_truncated_capture() {
        let mut out = [0u32; 8];
        let mut c = Cursor::new(&[0x2a, 0x86]);
        let err = read_node_sequence(&mut c, 3, &mut out).unwrap_err();
        assert_eq!(err.status(), ParseStatus::TooShort);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_unterminated_node_is_malformed() {
        assert_eq!(
            decode(&[0x2a, 0x86]).unwrap_err().status(),
            ParseStatus::Malformed
        );
    }

    #[test]
    fn test_node_overflow_is_malformed() {
        let bytes = [0x2a, 0x8f, 0xff, 0xff, 0xff, 0xff, 0x7f];
        assert_eq!(decode(&bytes).unwrap_err().status(), ParseStatus::Malformed);
    }

    #[test]
    fn test_output_capacity_bounds_count() {
        let bytes = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
        let mut out = [0u32; 3];
        let mut c = Cursor::new(&bytes);

        assert_eq!(read_node_sequence(&mut c, bytes.len(), &mut out).unwrap(), 3);
        assert_eq!(out, [1, 2, 840]);
        assert!(c.is_empty());
    }

    #[test]
    fn test_size_limits_sequence() {
        // Only the first byte belongs to this sequence
        let bytes = [0x2a, 0x03];
        let mut out = [0u32; 4];
        let mut c = Cursor::new(&bytes);

        assert_eq!(read_node_sequence(&mut c, 1, &mut out).unwrap(), 2);
        assert_eq!(c.rest(), &[0x03]);
        assert_eq!(read_node_sequence(&mut c, 0, &mut out).unwrap(), 0);
    }

    #[test]
    fn test_oid_display() {
        let oid = Oid::from_content(&[0x55, 0x04, 0x03]).unwrap();
        assert!(oid.is(known::COMMON_NAME));
        assert_eq!(oid.to_string(), "2.5.4.3");
    }
}
