//! Minimal Solidity ABI encoding for the `ComplaintRegistry` surface.
//!
//! Selectors and topics are keccak-256 values fixed by the contract
//! signatures listed next to each constant.

use super::types::LedgerRecord;
use super::LedgerError;

const WORD: usize = 32;

// ═══════════════════════════════════════════════════════════
// Selectors and topics
// ═══════════════════════════════════════════════════════════

/// `createRecord(string,uint256)`
pub const CREATE_RECORD: [u8; 4] = [0x6f, 0x10, 0x62, 0x37];
/// `setVerified(uint256,bool)`
pub const SET_VERIFIED: [u8; 4] = [0x34, 0x75, 0x6d, 0x95];
/// `getRecord(uint256)`
pub const GET_RECORD: [u8; 4] = [0x03, 0xe9, 0xe6, 0x09];
/// `getRecordsByStatus(bool,uint256,uint256)`
pub const GET_RECORDS_BY_STATUS: [u8; 4] = [0xb9, 0x4e, 0x57, 0xfc];
/// `getRecordsForClaimant(address)`
pub const GET_RECORDS_FOR_CLAIMANT: [u8; 4] = [0x24, 0x44, 0xf6, 0x8d];
/// `getTotalRecords()`
pub const GET_TOTAL_RECORDS: [u8; 4] = [0x0a, 0xea, 0xcb, 0x5e];
/// `hasRole(bytes32,address)`
pub const HAS_ROLE: [u8; 4] = [0x91, 0xd1, 0x48, 0x54];
/// `Error(string)`, the revert payload prefix.
pub const ERROR_STRING: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// `RecordCreated(uint256 indexed id, address indexed claimant, string cid, uint256 score)`
pub const RECORD_CREATED_TOPIC: &str =
    "0xae3fba9ab8248594af4e2e2c7a44b5b956ea8971a9f163ecffd8fd0f80bc3d78";
/// `RecordVerified(uint256 indexed id, bool verified, address indexed verifier)`
pub const RECORD_VERIFIED_TOPIC: &str =
    "0xbf9e1a26769bf0d4e07325d268e2c93940e20c420ef6e5d386020d92c557b629";

/// keccak256("CLAIMANT_ROLE")
pub const CLAIMANT_ROLE: [u8; 32] = [
    0xde, 0x60, 0x45, 0x2b, 0x7e, 0x5e, 0xf5, 0x25,
    0x56, 0x4a, 0x29, 0x46, 0x9a, 0x0b, 0xce, 0x46,
    0xdb, 0xce, 0x1b, 0xcf, 0xb8, 0x8f, 0x88, 0x3d,
    0xcb, 0xd9, 0x57, 0xa9, 0xcb, 0x50, 0xdd, 0xc6,
];

/// keccak256("GOVERNMENT_ROLE")
pub const GOVERNMENT_ROLE: [u8; 32] = [
    0xd9, 0xd0, 0x62, 0xb2, 0x9c, 0x87, 0x56, 0xd8,
    0x94, 0xf3, 0x01, 0xc5, 0x16, 0x7d, 0x21, 0x4c,
    0x34, 0xd6, 0x27, 0x72, 0x4c, 0xd7, 0xfc, 0x85,
    0x9a, 0xb9, 0x32, 0x9c, 0x93, 0x30, 0xcf, 0x51,
];

// ═══════════════════════════════════════════════════════════
// Encoding
// ═══════════════════════════════════════════════════════════

/// Argument to a contract call.
#[derive(Debug, Clone, Copy)]
pub enum Token<'a> {
    Uint(u64),
    Bool(bool),
    Address([u8; 20]),
    FixedBytes([u8; 32]),
    String(&'a str),
}

fn uint_word(v: u64) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[24..].copy_from_slice(&v.to_be_bytes());
    w
}

/// Selector followed by the head/tail encoding of `tokens`.
pub fn encode_call(selector: [u8; 4], tokens: &[Token<'_>]) -> Vec<u8> {
    let mut head = Vec::with_capacity(tokens.len() * WORD);
    let mut tail = Vec::new();
    let head_len = tokens.len() * WORD;

    for token in tokens {
        match token {
            Token::Uint(v) => head.extend_from_slice(&uint_word(*v)),
            Token::Bool(b) => head.extend_from_slice(&uint_word(u64::from(*b))),
            Token::Address(a) => {
                let mut w = [0u8; WORD];
                w[12..].copy_from_slice(a);
                head.extend_from_slice(&w);
            }
            Token::FixedBytes(b) => head.extend_from_slice(b),
            Token::String(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u64));
                tail.extend_from_slice(&uint_word(s.len() as u64));
                tail.extend_from_slice(s.as_bytes());
                let pad = (WORD - s.len() % WORD) % WORD;
                tail.resize(tail.len() + pad, 0);
            }
        }
    }

    let mut out = selector.to_vec();
    out.extend(head);
    out.extend(tail);
    out
}

pub fn parse_address(address: &str) -> Result<[u8; 20], LedgerError> {
    let hex_part = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .ok_or_else(|| LedgerError::InvalidArgument(format!("address without 0x prefix: {address}")))?;
    let bytes = hex::decode(hex_part)
        .map_err(|e| LedgerError::InvalidArgument(format!("bad address {address}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::InvalidArgument(format!("address must be 20 bytes: {address}")))
}

/// `0x`-prefixed lowercase hex.
pub fn to_hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex_data(data: &str) -> Result<Vec<u8>, LedgerError> {
    let stripped = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(stripped).map_err(|e| LedgerError::Decode(format!("bad hex data: {e}")))
}

/// JSON-RPC quantity (`0x`-prefixed, no leading zeros).
pub fn to_quantity(v: u64) -> String {
    format!("{v:#x}")
}

pub fn parse_quantity(q: &str) -> Result<u64, LedgerError> {
    let stripped = q
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::Decode(format!("quantity without 0x prefix: {q}")))?;
    if stripped.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(stripped, 16).map_err(|e| LedgerError::Decode(format!("bad quantity {q}: {e}")))
}

// ═══════════════════════════════════════════════════════════
// Decoding
// ═══════════════════════════════════════════════════════════

fn word(data: &[u8], index: usize) -> Result<&[u8], LedgerError> {
    let too_short = || LedgerError::Decode(format!("return data too short for word {index}"));
    let start = index.checked_mul(WORD).ok_or_else(too_short)?;
    let end = start.checked_add(WORD).ok_or_else(too_short)?;
    data.get(start..end).ok_or_else(too_short)
}

/// Offsets and lengths come straight from return data.
fn checked_range(start: u64, len: usize, what: &str) -> Result<std::ops::Range<usize>, LedgerError> {
    let out_of_range = || LedgerError::Decode(format!("{what} out of range"));
    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    let end = start.checked_add(len).ok_or_else(out_of_range)?;
    Ok(start..end)
}

fn word_to_u64(w: &[u8]) -> Result<u64, LedgerError> {
    if w[..24].iter().any(|&b| b != 0) {
        return Err(LedgerError::Decode("uint256 value exceeds u64".into()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&w[24..]);
    Ok(u64::from_be_bytes(buf))
}

pub fn decode_uint(data: &[u8], index: usize) -> Result<u64, LedgerError> {
    word_to_u64(word(data, index)?)
}

pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, LedgerError> {
    Ok(decode_uint(data, index)? != 0)
}

pub fn decode_address(data: &[u8], index: usize) -> Result<String, LedgerError> {
    Ok(to_hex_data(&word(data, index)?[12..]))
}

/// Dynamic `string` whose offset sits in head word `index`.
pub fn decode_string(data: &[u8], index: usize) -> Result<String, LedgerError> {
    let offset = decode_uint(data, index)?;
    let len_range = checked_range(offset, WORD, "string offset")?;
    let len_word = data
        .get(len_range.clone())
        .ok_or_else(|| LedgerError::Decode("string offset out of range".into()))?;
    let len = usize::try_from(word_to_u64(len_word)?)
        .map_err(|_| LedgerError::Decode("string length out of range".into()))?;
    let bytes_range = checked_range(len_range.end as u64, len, "string length")?;
    let bytes = data
        .get(bytes_range)
        .ok_or_else(|| LedgerError::Decode("string length out of range".into()))?;
    String::from_utf8(bytes.to_vec()).map_err(|e| LedgerError::Decode(e.to_string()))
}

/// Dynamic `uint256[]` whose offset sits in head word `index`.
pub fn decode_uint_array(data: &[u8], index: usize) -> Result<Vec<u64>, LedgerError> {
    let offset = usize::try_from(decode_uint(data, index)?)
        .map_err(|_| LedgerError::Decode("array offset out of range".into()))?;
    if offset % WORD != 0 {
        return Err(LedgerError::Decode("unaligned array offset".into()));
    }
    let base = offset / WORD;
    let len = decode_uint(data, base)?;
    let available = (data.len() / WORD).saturating_sub(base + 1);
    if len > available as u64 {
        return Err(LedgerError::Decode(format!("array of {len} elements exceeds return data")));
    }
    (0..len as usize).map(|i| decode_uint(data, base + 1 + i)).collect()
}

/// Decode `getRecord` output:
/// `(uint256 id, address claimant, string cid, uint256 score, bool verified, uint256 createdAt)`.
/// A zero claimant is the contract's empty slot and yields `None`.
pub fn decode_record(data: &[u8]) -> Result<Option<LedgerRecord>, LedgerError> {
    let claimant = decode_address(data, 1)?;
    if claimant.trim_start_matches("0x").chars().all(|c| c == '0') {
        return Ok(None);
    }
    let score = decode_uint(data, 3)?;
    Ok(Some(LedgerRecord {
        id: decode_uint(data, 0)?,
        claimant,
        content_identifier: decode_string(data, 2)?,
        score: u8::try_from(score).map_err(|_| LedgerError::Decode(format!("score {score} out of range")))?,
        verified: decode_bool(data, 4)?,
        created_at: decode_uint(data, 5)?,
    }))
}

/// Record id from an indexed `uint256` topic.
pub fn topic_to_u64(topic: &str) -> Result<u64, LedgerError> {
    let bytes = from_hex_data(topic)?;
    if bytes.len() != WORD {
        return Err(LedgerError::Decode(format!("topic must be 32 bytes: {topic}")));
    }
    word_to_u64(&bytes)
}

/// Reason string from an `Error(string)` revert payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    let rest = data.strip_prefix(&ERROR_STRING[..])?;
    decode_string(rest, 0).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_static_args() {
        let data = encode_call(SET_VERIFIED, &[Token::Uint(7), Token::Bool(true)]);
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &SET_VERIFIED);
        assert_eq!(data[4 + 31], 7);
        assert_eq!(data[4 + 63], 1);
    }

    #[test]
    fn encodes_dynamic_string_with_padding() {
        let data = encode_call(CREATE_RECORD, &[Token::String("bafkrei"), Token::Uint(96)]);
        let body = &data[4..];
        // head: offset, score; tail: length, padded bytes
        assert_eq!(body.len(), 4 * 32);
        assert_eq!(decode_uint(body, 0).unwrap(), 64);
        assert_eq!(decode_uint(body, 1).unwrap(), 96);
        assert_eq!(decode_uint(body, 2).unwrap(), 7);
        assert_eq!(decode_string(body, 0).unwrap(), "bafkrei");
    }

    #[test]
    fn string_of_exact_word_length_has_no_padding() {
        let s = "a".repeat(32);
        let data = encode_call(CREATE_RECORD, &[Token::String(&s), Token::Uint(1)]);
        assert_eq!(data.len(), 4 + 4 * 32);
    }

    #[test]
    fn address_round_trip_is_lowercase() {
        let raw = parse_address("0xAbCdEf0000000000000000000000000000000001").unwrap();
        let data = encode_call(GET_RECORDS_FOR_CLAIMANT, &[Token::Address(raw)]);
        assert_eq!(
            decode_address(&data[4..], 0).unwrap(),
            "0xabcdef0000000000000000000000000000000001"
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(parse_address("abcdef").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzz00000000000000000000000000000000000000").is_err());
    }

    #[test]
    fn decodes_uint_array() {
        let mut data = Vec::new();
        for v in [32u64, 3, 4, 9, 12] {
            data.extend_from_slice(&uint_word(v));
        }
        assert_eq!(decode_uint_array(&data, 0).unwrap(), vec![4, 9, 12]);
    }

    fn record_return(claimant: [u8; 20]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&uint_word(5));
        let mut w = [0u8; 32];
        w[12..].copy_from_slice(&claimant);
        data.extend_from_slice(&w);
        data.extend_from_slice(&uint_word(6 * 32));
        data.extend_from_slice(&uint_word(82));
        data.extend_from_slice(&uint_word(1));
        data.extend_from_slice(&uint_word(1_767_225_600));
        data.extend_from_slice(&uint_word(3));
        let mut s = [0u8; 32];
        s[..3].copy_from_slice(b"bcd");
        data.extend_from_slice(&s);
        data
    }

    #[test]
    fn decodes_record() {
        let record = decode_record(&record_return([0x11; 20])).unwrap().unwrap();
        assert_eq!(record.id, 5);
        assert_eq!(record.content_identifier, "bcd");
        assert_eq!(record.score, 82);
        assert!(record.verified);
        assert_eq!(record.created_at, 1_767_225_600);
    }

    #[test]
    fn overflowing_string_offset_is_a_decode_error() {
        let mut data = record_return([0x11; 20]);
        data[2 * 32 + 24..3 * 32].copy_from_slice(&[0xff; 8]);
        assert!(matches!(decode_record(&data), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn overflowing_string_length_is_a_decode_error() {
        let mut data = record_return([0x11; 20]);
        data[6 * 32 + 24..7 * 32].copy_from_slice(&[0xff; 8]);
        assert!(matches!(decode_record(&data), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn revert_with_overflowing_offset_has_no_reason() {
        let mut data = ERROR_STRING.to_vec();
        data.extend_from_slice(&uint_word(u64::MAX));
        assert!(decode_revert_reason(&data).is_none());
    }

    #[test]
    fn oversized_array_length_is_a_decode_error() {
        let mut data = Vec::new();
        for v in [32u64, u64::MAX] {
            data.extend_from_slice(&uint_word(v));
        }
        assert!(matches!(decode_uint_array(&data, 0), Err(LedgerError::Decode(_))));
    }

    #[test]
    fn zero_claimant_is_empty_slot() {
        assert!(decode_record(&record_return([0; 20])).unwrap().is_none());
    }

    #[test]
    fn quantities() {
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(21_000), "0x5208");
        assert_eq!(parse_quantity("0x5208").unwrap(), 21_000);
        assert!(parse_quantity("5208").is_err());
    }

    #[test]
    fn topic_id() {
        let topic = format!("0x{}", "0".repeat(62) + "2a");
        assert_eq!(topic_to_u64(&topic).unwrap(), 42);
    }

    #[test]
    fn revert_reason() {
        let mut data = ERROR_STRING.to_vec();
        data.extend(encode_call([0; 4], &[Token::String("record does not exist")])[4..].iter());
        assert_eq!(decode_revert_reason(&data).as_deref(), Some("record does not exist"));
        assert!(decode_revert_reason(&[0xde, 0xad]).is_none());
    }
}
