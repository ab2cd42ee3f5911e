//! ARINC 615A record codec: LUI, LUS and LUR.
//!
//! All three records are packed, big-endian, fixed-field layouts. LUI and LUS
//! are emitted by the target and have a single fixed wire size (265 and 274
//! bytes respectively); LUR is received from the loader and only its first
//! header is parsed.

use crate::errors::{CodecError, Result};

/// ARINC 615A operation status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// Operation accepted, not yet started.
    AcceptedNotStarted,
    /// Operation in progress.
    InProgress,
    /// Operation completed without error.
    CompletedOk,
    /// Operation rejected by the target.
    Rejected,
    /// Operation aborted by the target.
    AbortedByTarget,
    /// Operation aborted by the loader.
    AbortedByLoader,
    /// Operation cancelled by the operator.
    Cancelled,
}

impl StatusCode {
    /// Numeric wire value.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        match self {
            Self::AcceptedNotStarted => 0x0001,
            Self::InProgress => 0x0002,
            Self::CompletedOk => 0x0003,
            Self::Rejected => 0x1000,
            Self::AbortedByTarget => 0x1003,
            Self::AbortedByLoader => 0x1004,
            Self::Cancelled => 0x1005,
        }
    }

    /// Parse a wire status code. `None` if unrecognized.
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0001 => Some(Self::AcceptedNotStarted),
            0x0002 => Some(Self::InProgress),
            0x0003 => Some(Self::CompletedOk),
            0x1000 => Some(Self::Rejected),
            0x1003 => Some(Self::AbortedByTarget),
            0x1004 => Some(Self::AbortedByLoader),
            0x1005 => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Protocol version literal carried by every LUI/LUS/LUR record.
pub const PROTOCOL_VERSION: [u8; 2] = *b"A4";

/// Maximum length of a description string (the field is 256 bytes: up to
/// 255 bytes of text plus a mandatory NUL terminator).
const DESCRIPTION_FIELD_LEN: usize = 256;

/// Load Upload Information record sent by the target (265 bytes on the
/// wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuiRecord {
    /// Status of the operation.
    pub status_code: StatusCode,
    /// Human-readable description, truncated to 255 bytes.
    pub description: String,
}

impl LuiRecord {
    /// Serialized size in bytes: 4 (length) + 2 (version) + 2 (status) + 1
    /// (desc length) + 256 (description) = 265.
    pub const WIRE_SIZE: usize = 265;

    /// Encode to the exact 265-byte wire image.
    ///
    /// # Errors
    ///
    /// Never fails; description is truncated to fit rather than rejected, as
    /// specified ("description is truncated to 255 bytes plus NUL").
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::WIRE_SIZE);
        out.extend_from_slice(&(Self::WIRE_SIZE as u32).to_be_bytes());
        out.extend_from_slice(&PROTOCOL_VERSION);
        out.extend_from_slice(&self.status_code.to_u16().to_be_bytes());
        push_description(&mut out, &self.description);
        debug_assert_eq!(out.len(), Self::WIRE_SIZE);
        out
    }

    /// Decode a 265-byte LUI record (used by tests and by a loader-side
    /// peer; the target itself only ever encodes).
    ///
    /// # Errors
    ///
    /// [`CodecError::Truncated`] if shorter than [`Self::WIRE_SIZE`];
    /// [`CodecError::Malformed`] for an unrecognized status code.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(CodecError::Truncated { expected: Self::WIRE_SIZE, actual: bytes.len() });
        }
        let status_code = StatusCode::from_u16(u16::from_be_bytes([bytes[6], bytes[7]]))
            .ok_or_else(|| CodecError::Malformed("unrecognized LUI status code".to_string()))?;
        let description = pop_description(&bytes[9..9 + DESCRIPTION_FIELD_LEN]);
        Ok(Self { status_code, description })
    }
}

/// Encode a LUI record. See [`LuiRecord::encode`].
#[must_use]
pub fn encode_lui(status: StatusCode, description: &str) -> Vec<u8> {
    LuiRecord { status_code: status, description: truncate_description(description) }.encode()
}

/// Load Upload Status record sent by the target (274 bytes on the wire).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LusRecord {
    /// Status of the operation.
    pub status_code: StatusCode,
    /// Human-readable description, truncated to 255 bytes.
    pub description: String,
    /// Monotonically increasing counter across the three LUS emissions of a
    /// session (0 = INIT, 1 = INTERMEDIATE, 2 = FINAL).
    pub counter: u16,
    /// Exception timer; unused, always 0 in this dialog.
    pub exception_timer: u16,
    /// Estimated time; unused, always 0 in this dialog.
    pub estimated_time: u16,
    /// Three ASCII digits, "000".."100".
    pub load_list_ratio: [u8; 3],
}

impl LusRecord {
    /// Serialized size in bytes: LUI's 265 + 2 (counter) + 2 (exception
    /// timer) + 2 (estimated time) + 3 (ratio) = 274.
    pub const WIRE_SIZE: usize = 274;

    /// Encode to the exact 274-byte wire image.
    ///
    /// # Errors
    ///
    /// [`CodecError::BadArgument`] if `load_list_ratio` is not exactly 3
    /// ASCII digits in "000".."100".
    pub fn encode(&self) -> Result<Vec<u8>> {
        validate_ratio(&self.load_list_ratio)?;
        let mut out = Vec::with_capacity(Self::WIRE_SIZE);
        out.extend_from_slice(&(Self::WIRE_SIZE as u32).to_be_bytes());
        out.extend_from_slice(&PROTOCOL_VERSION);
        out.extend_from_slice(&self.status_code.to_u16().to_be_bytes());
        push_description(&mut out, &self.description);
        out.extend_from_slice(&self.counter.to_be_bytes());
        out.extend_from_slice(&self.exception_timer.to_be_bytes());
        out.extend_from_slice(&self.estimated_time.to_be_bytes());
        out.extend_from_slice(&self.load_list_ratio);
        debug_assert_eq!(out.len(), Self::WIRE_SIZE);
        Ok(out)
    }

    /// Decode a 274-byte LUS record.
    ///
    /// # Errors
    ///
    /// [`CodecError::Truncated`] if shorter than [`Self::WIRE_SIZE`];
    /// [`CodecError::Malformed`] for an unrecognized status code.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(CodecError::Truncated { expected: Self::WIRE_SIZE, actual: bytes.len() });
        }
        let status_code = StatusCode::from_u16(u16::from_be_bytes([bytes[6], bytes[7]]))
            .ok_or_else(|| CodecError::Malformed("unrecognized LUS status code".to_string()))?;
        let description = pop_description(&bytes[9..9 + DESCRIPTION_FIELD_LEN]);
        let tail = &bytes[9 + DESCRIPTION_FIELD_LEN..];
        let counter = u16::from_be_bytes([tail[0], tail[1]]);
        let exception_timer = u16::from_be_bytes([tail[2], tail[3]]);
        let estimated_time = u16::from_be_bytes([tail[4], tail[5]]);
        let load_list_ratio = [tail[6], tail[7], tail[8]];
        Ok(Self {
            status_code,
            description,
            counter,
            exception_timer,
            estimated_time,
            load_list_ratio,
        })
    }
}

/// Encode a LUS record. See [`LusRecord::encode`].
///
/// # Errors
///
/// [`CodecError::BadArgument`] if `ratio` is not exactly 3 ASCII bytes in
/// "000".."100".
pub fn encode_lus(
    status: StatusCode,
    description: &str,
    counter: u16,
    ratio: [u8; 3],
) -> Result<Vec<u8>> {
    LusRecord {
        status_code: status,
        description: truncate_description(description),
        counter,
        exception_timer: 0,
        estimated_time: 0,
        load_list_ratio: ratio,
    }
    .encode()
}

/// Load Upload Request, received from the loader. Only the first header
/// entry is retained; the core parses only the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LurRecord {
    /// Total length declared by the loader.
    pub file_length: u32,
    /// Protocol version bytes as sent (not validated against "A4").
    pub protocol_version: [u8; 2],
    /// Number of header entries the loader declares (must be >= 1).
    pub num_header_files: u16,
    /// First header's filename, truncated to 255 bytes if longer.
    pub name: String,
    /// First header's software part number, truncated to 255 bytes if
    /// longer.
    pub part_number: String,
}

/// Parse a LUR buffer. See [`parse_lur`].
impl LurRecord {
    /// Minimum bytes needed before any per-header field: 4 + 2 + 2.
    const HEADER_PREFIX_LEN: usize = 8;

    /// Maximum length retained for a parsed string field.
    const MAX_STRING_LEN: usize = 255;
}

/// Parse a loader-supplied LUR buffer.
///
/// # Errors
///
/// [`CodecError::Truncated`] if fewer than 8 bytes are present, or a
/// declared length runs past the end of the buffer.
/// [`CodecError::Malformed`] if `num_header_files == 0`.
///
/// Name and part-number fields longer than 255 bytes are truncated and
/// retained rather than rejected, per spec.
pub fn parse_lur(bytes: &[u8]) -> Result<LurRecord> {
    if bytes.len() < LurRecord::HEADER_PREFIX_LEN {
        return Err(CodecError::Truncated {
            expected: LurRecord::HEADER_PREFIX_LEN,
            actual: bytes.len(),
        });
    }

    let file_length = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let protocol_version = [bytes[4], bytes[5]];
    let num_header_files = u16::from_be_bytes([bytes[6], bytes[7]]);
    if num_header_files == 0 {
        return Err(CodecError::Malformed("num_header_files == 0".to_string()));
    }

    let mut cursor = &bytes[LurRecord::HEADER_PREFIX_LEN..];
    let (name, rest) = pop_length_prefixed(cursor)?;
    cursor = rest;
    let (part_number, _rest) = pop_length_prefixed(cursor)?;

    Ok(LurRecord {
        file_length,
        protocol_version,
        num_header_files,
        name: truncate_to(&name, LurRecord::MAX_STRING_LEN),
        part_number: truncate_to(&part_number, LurRecord::MAX_STRING_LEN),
    })
}

/// Encode a LUR record, used by tests to exercise the `parse_lur`
/// round-trip and by fuzz/property harnesses.
#[must_use]
pub fn encode_lur(record: &LurRecord) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&record.file_length.to_be_bytes());
    out.extend_from_slice(&record.protocol_version);
    out.extend_from_slice(&record.num_header_files.to_be_bytes());
    push_length_prefixed(&mut out, &record.name);
    push_length_prefixed(&mut out, &record.part_number);
    out
}

fn push_length_prefixed(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(255) as u8;
    out.push(len);
    out.extend_from_slice(&bytes[..len as usize]);
}

fn pop_length_prefixed(bytes: &[u8]) -> Result<(String, &[u8])> {
    let len = *bytes.first().ok_or(CodecError::Truncated { expected: 1, actual: 0 })? as usize;
    let rest = &bytes[1..];
    if len > rest.len() {
        return Err(CodecError::Truncated { expected: len, actual: rest.len() });
    }
    let s = String::from_utf8_lossy(&rest[..len]).into_owned();
    Ok((s, &rest[len..]))
}

fn truncate_to(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn truncate_description(description: &str) -> String {
    truncate_to(description, 255)
}

/// Write the `desc_length` byte followed by the fixed 256-byte
/// NUL-terminated, NUL-padded description field.
fn push_description(out: &mut Vec<u8>, description: &str) {
    let truncated = truncate_description(description);
    let bytes = truncated.as_bytes();
    #[allow(clippy::cast_possible_truncation)]
    let desc_length = bytes.len() as u8;
    out.push(desc_length);

    let field_start = out.len();
    out.extend_from_slice(bytes);
    out.resize(field_start + DESCRIPTION_FIELD_LEN, 0);
}

/// Read the 256-byte description field, stopping at the first NUL.
fn pop_description(field: &[u8]) -> String {
    debug_assert_eq!(field.len(), DESCRIPTION_FIELD_LEN);
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

fn validate_ratio(ratio: &[u8; 3]) -> Result<()> {
    if !ratio.iter().all(u8::is_ascii_digit) {
        return Err(CodecError::BadArgument("ratio must be 3 ASCII digits".to_string()));
    }
    let value: u32 = std::str::from_utf8(ratio)
        .map_err(|_| CodecError::BadArgument("ratio must be ASCII".to_string()))?
        .parse()
        .map_err(|_| CodecError::BadArgument("ratio must be numeric".to_string()))?;
    if value > 100 {
        return Err(CodecError::BadArgument("ratio must be in 000..=100".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn lui_round_trip() {
        let lui =
            LuiRecord { status_code: StatusCode::AcceptedNotStarted, description: "Operation Accepted".to_string() };
        let wire = lui.encode();
        assert_eq!(wire.len(), LuiRecord::WIRE_SIZE);
        let decoded = LuiRecord::decode(&wire).expect("should decode");
        assert_eq!(lui, decoded);
    }

    #[test]
    fn lui_description_is_truncated_at_255_bytes() {
        let long = "x".repeat(400);
        let wire = encode_lui(StatusCode::Rejected, &long);
        let decoded = LuiRecord::decode(&wire).expect("should decode");
        assert_eq!(decoded.description.len(), 255);
    }

    #[test]
    fn lus_round_trip() {
        let wire = encode_lus(StatusCode::CompletedOk, "done", 2, *b"100").expect("should encode");
        assert_eq!(wire.len(), LusRecord::WIRE_SIZE);
        let decoded = LusRecord::decode(&wire).expect("should decode");
        assert_eq!(decoded.status_code, StatusCode::CompletedOk);
        assert_eq!(decoded.counter, 2);
        assert_eq!(decoded.load_list_ratio, *b"100");
    }

    #[test]
    fn lus_rejects_non_ascii_ratio() {
        let result = encode_lus(StatusCode::InProgress, "x", 1, *b"0%0");
        assert!(matches!(result, Err(CodecError::BadArgument(_))));
    }

    #[test]
    fn lus_rejects_ratio_above_100() {
        let result = encode_lus(StatusCode::InProgress, "x", 1, *b"101");
        assert!(matches!(result, Err(CodecError::BadArgument(_))));
    }

    #[test]
    fn lur_round_trip() {
        let record = LurRecord {
            file_length: 42,
            protocol_version: PROTOCOL_VERSION,
            num_header_files: 1,
            name: "fw.bin".to_string(),
            part_number: "EMB-SW-007-137-045".to_string(),
        };
        let wire = encode_lur(&record);
        let decoded = parse_lur(&wire).expect("should parse");
        assert_eq!(record, decoded);
    }

    #[test]
    fn lur_rejects_zero_header_files() {
        let record = LurRecord {
            file_length: 0,
            protocol_version: PROTOCOL_VERSION,
            num_header_files: 0,
            name: String::new(),
            part_number: String::new(),
        };
        let wire = encode_lur(&record);
        assert!(matches!(parse_lur(&wire), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn lur_rejects_short_buffer() {
        assert!(matches!(parse_lur(&[0u8; 4]), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn lur_name_length_overrunning_buffer_is_rejected() {
        let mut wire = vec![0u8, 0, 0, 0, b'A', b'4', 0, 1];
        wire.push(250); // name_length claims 250 bytes but none follow
        assert!(matches!(parse_lur(&wire), Err(CodecError::Truncated { .. })));
    }

    proptest! {
        #[test]
        fn lur_round_trip_props(
            name in "[ -~]{0,255}",
            part_number in "[ -~]{0,255}",
            num_header_files in 1u16..=u16::MAX,
        ) {
            let record = LurRecord {
                file_length: 0,
                protocol_version: PROTOCOL_VERSION,
                num_header_files,
                name,
                part_number,
            };
            let wire = encode_lur(&record);
            let decoded = parse_lur(&wire).expect("should parse");
            prop_assert_eq!(record, decoded);
        }

        #[test]
        fn parse_lur_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..=300)) {
            let _ = parse_lur(&bytes);
        }
    }
}
