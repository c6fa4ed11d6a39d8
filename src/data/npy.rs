use log::{debug, warn};

// ---------------------------------------------------------------------------
// Array file layout
// ---------------------------------------------------------------------------

/// Magic prefix written by NumPy (`\x93NUMPY`).
pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Fallback payload offset when no header terminator is found.
pub const DEFAULT_HEADER_LEN: usize = 10;

/// The terminator scan never looks past this byte.
pub const HEADER_SCAN_LIMIT: usize = 1000;

/// Where the numeric payload of an array file begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayHeader {
    /// Byte offset of the first payload byte.
    pub payload_offset: usize,
    /// Whether the buffer starts with [`MAGIC`].
    pub has_magic: bool,
}

impl ArrayHeader {
    /// Locate the header terminator.
    ///
    /// Scans `bytes[10 .. min(1000, len))` for the first line feed; the
    /// payload starts right after it. Without a line feed the payload starts
    /// at byte 10. The declared `descr` / `shape` are deliberately ignored.
    pub fn locate(bytes: &[u8]) -> Self {
        let has_magic = bytes.starts_with(MAGIC);
        let limit = HEADER_SCAN_LIMIT.min(bytes.len());

        let payload_offset = if limit > DEFAULT_HEADER_LEN {
            bytes[DEFAULT_HEADER_LEN..limit]
                .iter()
                .position(|&b| b == b'\n')
                .map(|pos| DEFAULT_HEADER_LEN + pos + 1)
                .unwrap_or(DEFAULT_HEADER_LEN)
        } else {
            DEFAULT_HEADER_LEN
        };

        ArrayHeader {
            payload_offset,
            has_magic,
        }
    }
}

// ---------------------------------------------------------------------------
// Decode strategies
// ---------------------------------------------------------------------------

/// Element interpretation picked for a payload.
///
/// Apart from [`DecodeStrategy::SelfDescribed`], the choice depends only on
/// the payload length: the first width that divides it wins, in declaration
/// order. This is a sniffing heuristic, not a header parser; a float32 file
/// with an even element count is read as float64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum DecodeStrategy {
    /// Header is byte-identical to the one [`encode`] writes.
    SelfDescribed,
    TryDouble,
    TryFloat,
    TryInt16,
    TryInt8,
}

impl DecodeStrategy {
    /// Pick the strategy for a payload.  `None` for an empty payload.
    pub fn select(header: &[u8], payload_len: usize) -> Option<Self> {
        if payload_len == 0 {
            return None;
        }
        if payload_len % 4 == 0 && header == header_bytes("<f4", payload_len / 4).as_slice() {
            return Some(DecodeStrategy::SelfDescribed);
        }
        let strategy = if payload_len % 8 == 0 {
            DecodeStrategy::TryDouble
        } else if payload_len % 4 == 0 {
            DecodeStrategy::TryFloat
        } else if payload_len % 2 == 0 {
            DecodeStrategy::TryInt16
        } else {
            DecodeStrategy::TryInt8
        };
        Some(strategy)
    }

    /// Bytes per element.
    pub fn width(self) -> usize {
        match self {
            DecodeStrategy::TryDouble => 8,
            DecodeStrategy::SelfDescribed | DecodeStrategy::TryFloat => 4,
            DecodeStrategy::TryInt16 => 2,
            DecodeStrategy::TryInt8 => 1,
        }
    }
}

/// Full outcome of a decode, for callers that want to know how the bytes
/// were read.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub header: ArrayHeader,
    /// `None` when the payload was empty.
    pub strategy: Option<DecodeStrategy>,
    /// Set when the little-endian float32 read produced NaN/∞ and the
    /// big-endian re-read was clean.
    pub big_endian: bool,
    pub values: Vec<f64>,
}

impl Decoded {
    fn empty(header: ArrayHeader) -> Self {
        Decoded {
            header,
            strategy: None,
            big_endian: false,
            values: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Decode an array buffer into a flat `f64` sequence.
///
/// Undecodable input (too short, empty payload) yields an empty sequence;
/// callers decide whether that is an error.
pub fn decode(bytes: &[u8]) -> Vec<f64> {
    decode_detailed(bytes).values
}

/// Like [`decode`], but also reports the header and strategy used.
pub fn decode_detailed(bytes: &[u8]) -> Decoded {
    let header = ArrayHeader::locate(bytes);

    if bytes.len() < DEFAULT_HEADER_LEN {
        debug!("buffer too small to hold an array: {} bytes", bytes.len());
        return Decoded::empty(header);
    }
    if !header.has_magic {
        warn!("buffer has no array magic bytes, decoding anyway");
    }
    if header.payload_offset >= bytes.len() {
        debug!("header ends at byte {} with no payload", header.payload_offset);
        return Decoded::empty(header);
    }

    let (prefix, payload) = bytes.split_at(header.payload_offset);
    let Some(strategy) = DecodeStrategy::select(prefix, payload.len()) else {
        return Decoded::empty(header);
    };

    let (values, big_endian) = match strategy {
        DecodeStrategy::SelfDescribed => (read_f32(payload, f32::from_le_bytes), false),
        DecodeStrategy::TryDouble => (read_f64_le(payload), false),
        DecodeStrategy::TryFloat => read_f32_with_fallback(payload),
        DecodeStrategy::TryInt16 => (
            payload
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]) as f64)
                .collect(),
            false,
        ),
        DecodeStrategy::TryInt8 => (payload.iter().map(|&b| b as i8 as f64).collect(), false),
    };

    debug!(
        "decoded {} values from {} payload bytes at offset {} ({strategy:?}{})",
        values.len(),
        payload.len(),
        header.payload_offset,
        if big_endian { ", big-endian" } else { "" }
    );

    Decoded {
        header,
        strategy: Some(strategy),
        big_endian,
        values,
    }
}

/// Encode a 1-D float32 array with a fixed `'<f4'` header.
pub fn encode(values: &[f32]) -> Vec<u8> {
    let mut out = header_bytes("<f4", values.len());
    out.reserve(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

/// Encode a 1-D float64 array with a fixed `'<f8'` header.
///
/// This is the layout device tooling produces; decoding it goes through the
/// width heuristic like any foreign file.
pub fn encode_f64(values: &[f64]) -> Vec<u8> {
    let mut out = header_bytes("<f8", values.len());
    out.reserve(values.len() * 8);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fixed header: raw `0x93`, `NUMPY`, version 1.0, dict literal, line feed.
/// No alignment padding.
fn header_bytes(descr: &str, len: usize) -> Vec<u8> {
    let text = format!(
        "NUMPY\x01\x00{{'descr': '{descr}', 'fortran_order': False, 'shape': ({len},), }}\n"
    );
    let mut bytes = Vec::with_capacity(text.len() + 1);
    bytes.push(MAGIC[0]);
    bytes.extend_from_slice(text.as_bytes());
    bytes
}

fn read_f64_le(payload: &[u8]) -> Vec<f64> {
    payload
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect()
}

fn read_f32(payload: &[u8], from_bytes: fn([u8; 4]) -> f32) -> Vec<f64> {
    payload
        .chunks_exact(4)
        .map(|c| from_bytes([c[0], c[1], c[2], c[3]]) as f64)
        .collect()
}

fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Little-endian float32 read, re-read as big-endian when the first attempt
/// contains NaN/∞ and the second one does not.
fn read_f32_with_fallback(payload: &[u8]) -> (Vec<f64>, bool) {
    let primary = read_f32(payload, f32::from_le_bytes);
    if all_finite(&primary) {
        return (primary, false);
    }
    let secondary = read_f32(payload, f32::from_be_bytes);
    if all_finite(&secondary) {
        warn!("little-endian float32 read produced non-finite values, using big-endian");
        (secondary, true)
    } else {
        (primary, false)
    }
}
