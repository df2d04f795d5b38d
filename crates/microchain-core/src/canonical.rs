//! Canonical encoding for deterministic serialization.
//!
//! Two layouts are used:
//! - The microblock header is a fixed 122-byte big-endian record.
//! - Everything else (section payloads, the body, the microblock envelope) is
//!   CBOR under RFC 8949 Core Deterministic Encoding: map keys sorted by
//!   encoded bytes, shortest integers, definite lengths, no floats.
//!
//! Hashes and signatures are computed over these bytes, so decoding refuses
//! anything that would not re-encode to the exact input.

use ciborium::value::{Integer, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::header::{MicroblockHeader, MAX_GAS, MAX_HEIGHT, MAX_TIMESTAMP};
use crate::types::{AccountId, Sha256Hash, VirtualBlockchainType};

/// Size of an encoded header in bytes.
pub const HEADER_SIZE: usize = 122;

/// Envelope and body map keys (integer keys for compact encoding).
mod keys {
    pub const MICROBLOCK_HEADER: u64 = 0;
    pub const MICROBLOCK_BODY: u64 = 1;
    pub const BODY_SECTIONS: u64 = 0;
    pub const SECTION_TYPE: u64 = 0;
    pub const SECTION_DATA: u64 = 1;
}

/// Bit 15 of a section type word marks an externally-schemed section.
pub const EXTERNAL_SCHEMA_FLAG: u16 = 0x8000;

// ─────────────────────────────────────────────────────────────────────────────
// Header
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a header to its fixed-width canonical bytes.
pub fn encode_header(header: &MicroblockHeader) -> Result<Vec<u8>> {
    check_width("height", header.height, MAX_HEIGHT)?;
    check_width("timestamp", header.timestamp, MAX_TIMESTAMP)?;
    check_width("gas", u64::from(header.gas), u64::from(MAX_GAS))?;

    let mut buf = Vec::with_capacity(HEADER_SIZE);
    buf.extend_from_slice(&header.magic_string);
    buf.extend_from_slice(&header.protocol_version.to_be_bytes());
    buf.push(header.microblock_type.to_u8());
    buf.extend_from_slice(&header.height.to_be_bytes()[2..]);
    buf.extend_from_slice(header.previous_hash.as_bytes());
    buf.extend_from_slice(&header.timestamp.to_be_bytes()[2..]);
    buf.extend_from_slice(&header.gas.to_be_bytes()[1..]);
    buf.extend_from_slice(&header.gas_price.to_be_bytes());
    buf.extend_from_slice(header.body_hash.as_bytes());
    buf.extend_from_slice(header.fees_payer_account.as_bytes());
    debug_assert_eq!(buf.len(), HEADER_SIZE);
    Ok(buf)
}

/// Decode a header from its fixed-width canonical bytes.
///
/// The magic string is returned as read; checking it is the caller's
/// integrity decision.
pub fn decode_header(bytes: &[u8]) -> Result<MicroblockHeader> {
    if bytes.len() != HEADER_SIZE {
        return Err(CoreError::DecodingError(format!(
            "header must be {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut reader = FixedReader::new(bytes);
    let magic_string = reader.array::<4>();
    let protocol_version = reader.uint(2) as u16;
    let type_byte = reader.uint(1) as u8;
    let microblock_type = VirtualBlockchainType::from_u8(type_byte)
        .ok_or(CoreError::UnknownVirtualBlockchainType(type_byte))?;
    let height = reader.uint(6);
    let previous_hash = Sha256Hash(reader.array::<32>());
    let timestamp = reader.uint(6);
    let gas = reader.uint(3) as u32;
    let gas_price = reader.uint(4) as u32;
    let body_hash = Sha256Hash(reader.array::<32>());
    let fees_payer_account = AccountId(reader.array::<32>());

    Ok(MicroblockHeader {
        magic_string,
        protocol_version,
        microblock_type,
        height,
        previous_hash,
        timestamp,
        gas,
        gas_price,
        body_hash,
        fees_payer_account,
    })
}

fn check_width(field: &str, value: u64, max: u64) -> Result<()> {
    if value > max {
        return Err(CoreError::EncodingError(format!(
            "{} {} exceeds maximum {}",
            field, value, max
        )));
    }
    Ok(())
}

/// Sequential reader over a buffer whose length was checked up front.
struct FixedReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FixedReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn array<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        out
    }

    /// Big-endian unsigned integer of `width` bytes (at most 8).
    fn uint(&mut self, width: usize) -> u64 {
        let value = self.bytes[self.offset..self.offset + width]
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        self.offset += width;
        value
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Body and microblock envelope
// ─────────────────────────────────────────────────────────────────────────────

/// A section as it travels on the wire: type word and payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSection {
    pub section_type: u16,
    pub data: Vec<u8>,
}

/// Encode a list of `(type, data)` pairs as a canonical body.
///
/// Layout: `{0: [{0: type, 1: data}, ...]}`.
pub fn encode_body<'a, I>(sections: I) -> Vec<u8>
where
    I: IntoIterator<Item = (u16, &'a [u8])>,
    I::IntoIter: ExactSizeIterator,
{
    let sections = sections.into_iter();
    let mut buf = Vec::new();
    encode_uint(&mut buf, 5, 1);
    encode_uint(&mut buf, 0, keys::BODY_SECTIONS);
    encode_uint(&mut buf, 4, sections.len() as u64);
    for (section_type, data) in sections {
        encode_uint(&mut buf, 5, 2);
        encode_uint(&mut buf, 0, keys::SECTION_TYPE);
        encode_uint(&mut buf, 0, u64::from(section_type));
        encode_uint(&mut buf, 0, keys::SECTION_DATA);
        encode_bytes(&mut buf, data);
    }
    buf
}

/// Decode a canonical body into raw sections.
pub fn decode_body(bytes: &[u8]) -> Result<Vec<RawSection>> {
    let value = decode_canonical(bytes)?;
    let entries = expect_int_map(&value, &[keys::BODY_SECTIONS], "body")?;
    let list = match &entries[0] {
        Value::Array(list) => list,
        _ => return Err(CoreError::DecodingError("body sections must be an array".into())),
    };

    list.iter()
        .map(|item| {
            let fields = expect_int_map(item, &[keys::SECTION_TYPE, keys::SECTION_DATA], "section")?;
            let section_type = match &fields[0] {
                Value::Integer(i) => u16::try_from(i128::from(*i)).map_err(|_| {
                    CoreError::DecodingError("section type out of range".into())
                })?,
                _ => return Err(CoreError::DecodingError("section type must be an integer".into())),
            };
            let data = match &fields[1] {
                Value::Bytes(b) => b.clone(),
                _ => return Err(CoreError::DecodingError("section data must be bytes".into())),
            };
            Ok(RawSection { section_type, data })
        })
        .collect()
}

/// Wrap encoded header and body into the microblock envelope.
///
/// Layout: `{0: header bytes, 1: body bytes}`.
pub fn encode_microblock(header: &[u8], body: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(header.len() + body.len() + 8);
    encode_uint(&mut buf, 5, 2);
    encode_uint(&mut buf, 0, keys::MICROBLOCK_HEADER);
    encode_bytes(&mut buf, header);
    encode_uint(&mut buf, 0, keys::MICROBLOCK_BODY);
    encode_bytes(&mut buf, body);
    buf
}

/// Split a microblock envelope into `(header bytes, body bytes)`.
pub fn decode_microblock(bytes: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let value = decode_canonical(bytes)?;
    let fields = expect_int_map(
        &value,
        &[keys::MICROBLOCK_HEADER, keys::MICROBLOCK_BODY],
        "microblock",
    )?;
    match (&fields[0], &fields[1]) {
        (Value::Bytes(header), Value::Bytes(body)) => Ok((header.clone(), body.clone())),
        _ => Err(CoreError::DecodingError(
            "microblock header and body must be bytes".into(),
        )),
    }
}

/// Check that `value` is a map with exactly the given integer keys, in order,
/// and return the values.
fn expect_int_map<'v>(value: &'v Value, expected: &[u64], what: &str) -> Result<Vec<&'v Value>> {
    let map = match value {
        Value::Map(m) => m,
        _ => return Err(CoreError::DecodingError(format!("{} must be a map", what))),
    };
    if map.len() != expected.len() {
        return Err(CoreError::DecodingError(format!(
            "{} must have {} fields, got {}",
            what,
            expected.len(),
            map.len()
        )));
    }
    map.iter()
        .zip(expected)
        .map(|((k, v), key)| match k {
            Value::Integer(i) if i128::from(*i) == i128::from(*key) => Ok(v),
            _ => Err(CoreError::DecodingError(format!(
                "{} has unexpected field {:?}",
                what, k
            ))),
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Serde payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Serialize a payload to canonical CBOR.
pub fn to_canonical_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = Value::serialized(value).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    encode_cbor_value_canonical(&value)
}

/// Deserialize a payload, refusing non-canonical input.
pub fn from_canonical_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let value = decode_canonical(bytes)?;
    value
        .deserialized()
        .map_err(|e| CoreError::DecodingError(e.to_string()))
}

/// Parse CBOR and check that it is the canonical encoding of itself.
///
/// This rejects trailing bytes, unsorted keys, non-minimal integers and
/// indefinite lengths in one comparison.
pub fn decode_canonical(bytes: &[u8]) -> Result<Value> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let reencoded = encode_cbor_value_canonical(&value)
        .map_err(|e| CoreError::DecodingError(e.to_string()))?;
    if reencoded != bytes {
        return Err(CoreError::DecodingError("non-canonical encoding".into()));
    }
    Ok(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Deterministic CBOR writer
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a CBOR Value to canonical bytes.
pub fn encode_cbor_value_canonical(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value)?;
    Ok(buf)
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => {
            encode_uint(buf, 4, arr.len() as u64);
            for item in arr {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        Value::Float(_) => {
            return Err(CoreError::EncodingError(
                "floats not supported in canonical encoding".into(),
            ))
        }
        _ => {
            return Err(CoreError::EncodingError(
                "unsupported CBOR value type".into(),
            ))
        }
    }
    Ok(())
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n = i128::from(i);
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Encode a text string (major type 3).
fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map with keys sorted by their encoded bytes (major type 5).
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        pairs.push((key_buf, v));
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    if pairs.windows(2).any(|w| w[0].0 == w[1].0) {
        return Err(CoreError::EncodingError("duplicate map key".into()));
    }

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{MAGIC_STRING, PROTOCOL_VERSION};
    use proptest::prelude::*;

    fn sample_header() -> MicroblockHeader {
        MicroblockHeader {
            magic_string: MAGIC_STRING,
            protocol_version: PROTOCOL_VERSION,
            microblock_type: VirtualBlockchainType::Account,
            height: 7,
            previous_hash: Sha256Hash::from_bytes([0x11; 32]),
            timestamp: 1_736_870_400,
            gas: 0x01_02_03,
            gas_price: 0x0a0b_0c0d,
            body_hash: Sha256Hash::from_bytes([0x22; 32]),
            fees_payer_account: AccountId::from_bytes([0x33; 32]),
        }
    }

    #[test]
    fn test_header_layout() {
        let bytes = encode_header(&sample_header()).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"CMTS");
        assert_eq!(&bytes[4..6], &[0x00, 0x01]);
        assert_eq!(bytes[6], 1);
        assert_eq!(&bytes[7..13], &[0, 0, 0, 0, 0, 7]);
        assert_eq!(&bytes[13..45], &[0x11; 32]);
        assert_eq!(&bytes[45..51], &[0x00, 0x00, 0x67, 0x86, 0x8a, 0x00]);
        assert_eq!(&bytes[51..54], &[0x01, 0x02, 0x03]);
        assert_eq!(&bytes[54..58], &[0x0a, 0x0b, 0x0c, 0x0d]);
        assert_eq!(&bytes[58..90], &[0x22; 32]);
        assert_eq!(&bytes[90..122], &[0x33; 32]);
    }

    #[test]
    fn test_header_roundtrip_is_stable() {
        let header = sample_header();
        let bytes = encode_header(&header).unwrap();
        let decoded = decode_header(&bytes).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(encode_header(&decoded).unwrap(), bytes);
    }

    #[test]
    fn test_header_width_limits() {
        let mut header = sample_header();
        header.height = MAX_HEIGHT + 1;
        assert!(matches!(encode_header(&header), Err(CoreError::EncodingError(_))));

        let mut header = sample_header();
        header.gas = MAX_GAS + 1;
        assert!(matches!(encode_header(&header), Err(CoreError::EncodingError(_))));
    }

    #[test]
    fn test_header_rejects_bad_length_and_type() {
        let bytes = encode_header(&sample_header()).unwrap();
        assert!(matches!(
            decode_header(&bytes[..121]),
            Err(CoreError::DecodingError(_))
        ));

        let mut bad_type = bytes.clone();
        bad_type[6] = 0x09;
        assert!(matches!(
            decode_header(&bad_type),
            Err(CoreError::UnknownVirtualBlockchainType(9))
        ));
    }

    #[test]
    fn test_integer_encoding() {
        let mut buf = Vec::new();
        encode_uint(&mut buf, 0, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 23);
        assert_eq!(buf, vec![0x17]);

        buf.clear();
        encode_uint(&mut buf, 0, 24);
        assert_eq!(buf, vec![0x18, 24]);

        buf.clear();
        encode_uint(&mut buf, 0, 256);
        assert_eq!(buf, vec![0x19, 0x01, 0x00]);

        buf.clear();
        encode_uint(&mut buf, 0, 65536);
        assert_eq!(buf, vec![0x1a, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_map_key_ordering() {
        let entries = vec![
            (Value::Integer(8.into()), Value::Integer(80.into())),
            (Value::Integer(0.into()), Value::Integer(0.into())),
            (Value::Integer(5.into()), Value::Integer(50.into())),
        ];
        let mut buf = Vec::new();
        encode_map_canonical(&mut buf, &entries).unwrap();
        assert_eq!(
            buf,
            vec![0xa3, 0x00, 0x00, 0x05, 0x18, 50, 0x08, 0x18, 80]
        );
    }

    #[test]
    fn test_text_keys_sorted_by_length_first() {
        let value = Value::Map(vec![
            (Value::Text("amount".into()), Value::Integer(1.into())),
            (Value::Text("id".into()), Value::Integer(2.into())),
        ]);
        let bytes = encode_cbor_value_canonical(&value).unwrap();
        // "id" (0x62) sorts before "amount" (0x66).
        assert_eq!(bytes[1], 0x62);
    }

    #[test]
    fn test_body_roundtrip() {
        let body = encode_body(vec![(0x0200u16, &b"abc"[..]), (0x0000u16, &b""[..])]);
        let sections = decode_body(&body).unwrap();
        assert_eq!(
            sections,
            vec![
                RawSection { section_type: 0x0200, data: b"abc".to_vec() },
                RawSection { section_type: 0x0000, data: vec![] },
            ]
        );
    }

    #[test]
    fn test_empty_body_encoding() {
        let body = encode_body(Vec::<(u16, &[u8])>::new());
        assert_eq!(body, vec![0xa1, 0x00, 0x80]);
        assert!(decode_body(&body).unwrap().is_empty());
    }

    #[test]
    fn test_non_canonical_rejected() {
        // {0: []} with the array length in a needlessly long form.
        let bytes = vec![0xa1, 0x00, 0x98, 0x00];
        assert!(matches!(decode_body(&bytes), Err(CoreError::DecodingError(_))));

        // Trailing garbage.
        let mut bytes = encode_body(Vec::<(u16, &[u8])>::new());
        bytes.push(0x00);
        assert!(matches!(decode_body(&bytes), Err(CoreError::DecodingError(_))));
    }

    #[test]
    fn test_extra_body_field_rejected() {
        let value = Value::Map(vec![
            (Value::Integer(0.into()), Value::Array(vec![])),
            (Value::Integer(1.into()), Value::Null),
        ]);
        let bytes = encode_cbor_value_canonical(&value).unwrap();
        assert!(matches!(decode_body(&bytes), Err(CoreError::DecodingError(_))));
    }

    #[test]
    fn test_microblock_envelope_roundtrip() {
        let envelope = encode_microblock(b"header", b"body");
        let (h, b) = decode_microblock(&envelope).unwrap();
        assert_eq!(h, b"header");
        assert_eq!(b, b"body");
    }

    #[test]
    fn test_float_rejected() {
        assert!(encode_cbor_value_canonical(&Value::Float(1.5)).is_err());
    }

    #[test]
    fn test_unencodable_input_is_a_decoding_error() {
        // {0: 1.0} as a half float
        let float_body = decode_body(&[0xa1, 0x00, 0xf9, 0x3c, 0x00]).unwrap_err();
        assert!(float_body.is_decoding(), "{float_body}");

        // {1: 1, 1: 2}
        let duplicate_key = decode_canonical(&[0xa2, 0x01, 0x01, 0x01, 0x02]).unwrap_err();
        assert!(duplicate_key.is_decoding(), "{duplicate_key}");

        let typed = from_canonical_cbor::<u64>(&[0xf9, 0x3c, 0x00]).unwrap_err();
        assert!(typed.is_decoding(), "{typed}");
    }

    proptest! {
        #[test]
        fn integers_use_the_shortest_form(n in any::<u64>()) {
            let bytes = encode_cbor_value_canonical(&Value::Integer(n.into())).unwrap();
            let expected_len = match n {
                0..=23 => 1,
                24..=0xff => 2,
                0x100..=0xffff => 3,
                0x1_0000..=0xffff_ffff => 5,
                _ => 9,
            };
            prop_assert_eq!(bytes.len(), expected_len);
            prop_assert_eq!(decode_canonical(&bytes).unwrap(), Value::Integer(n.into()));
        }

        #[test]
        fn bodies_decode_to_their_sections(
            sections in prop::collection::vec((any::<u16>(), prop::collection::vec(any::<u8>(), 0..40)), 0..8)
        ) {
            let body = encode_body(sections.iter().map(|(t, d)| (*t, d.as_slice())));
            let decoded = decode_body(&body).unwrap();
            prop_assert_eq!(decoded.len(), sections.len());
            for (raw, (section_type, data)) in decoded.iter().zip(&sections) {
                prop_assert_eq!(raw.section_type, *section_type);
                prop_assert_eq!(&raw.data, data);
            }

            let truncated = decode_body(&body[..body.len() - 1]).unwrap_err();
            prop_assert!(truncated.is_decoding());
        }
    }
}
