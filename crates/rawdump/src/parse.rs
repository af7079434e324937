use std::str::FromStr;

use crate::error::{DumpError, Result};
use crate::format::{RecordHeader, MAX_OFFSET};

/// Parse a command-line offset.
///
/// Only the canonical spelling of a value is accepted: `0`, decimal without leading zeros,
/// lowercase hex with a `0x` prefix, or octal with a single leading `0`. Signs, whitespace,
/// redundant zeros and trailing garbage are rejected, as are values beyond [`MAX_OFFSET`].
pub fn parse_offset(text: &str) -> Result<u64> {
    canonical_offset(text).ok_or_else(|| DumpError::InvalidOffset(text.to_string()))
}

fn canonical_offset(text: &str) -> Option<u64> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x") {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    let value = u64::from_str_radix(digits, radix).ok()?;
    let rendered = match radix {
        16 => format!("{value:#x}"),
        8 => format!("0{value:o}"),
        _ => value.to_string(),
    };
    if rendered != text || (radix != 10 && value == 0) || value > MAX_OFFSET {
        return None;
    }
    Some(value)
}

/// A NUL-terminated string patched into the destination after all blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stump {
    offset: u64,
    // Always ends in exactly one NUL.
    payload: Vec<u8>,
}

impl Stump {
    pub fn new(offset: u64, text: impl Into<Vec<u8>>) -> Result<Self> {
        let mut payload = text.into();
        if payload.is_empty() || payload.contains(&0) {
            return Err(DumpError::InvalidStump(
                String::from_utf8_lossy(&payload).into_owned(),
            ));
        }
        payload.push(0);
        let stump = Self { offset, payload };
        if stump.header().checked_end().is_none() {
            return Err(DumpError::BadOffset {
                offset,
                length: stump.len(),
            });
        }
        Ok(stump)
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// On-disk length, trailing NUL included.
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    /// String bytes followed by the terminating NUL.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// String bytes without the terminating NUL.
    pub fn text(&self) -> &[u8] {
        &self.payload[..self.payload.len() - 1]
    }

    pub fn header(&self) -> RecordHeader {
        RecordHeader::new(self.offset, self.len())
    }
}

/// Parse `<offset>:<string>`, splitting on the last colon.
pub fn parse_stump(text: &str) -> Result<Stump> {
    let invalid = || DumpError::InvalidStump(text.to_string());
    let (prefix, payload) = text.rsplit_once(':').ok_or_else(invalid)?;
    if payload.is_empty() {
        return Err(invalid());
    }
    let offset = canonical_offset(prefix).ok_or_else(invalid)?;
    Stump::new(offset, payload).map_err(|_| invalid())
}

impl FromStr for Stump {
    type Err = DumpError;

    fn from_str(s: &str) -> Result<Self> {
        parse_stump(s)
    }
}

/// Stumps in application order: the most recently specified one comes first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stumps(Vec<Stump>);

impl Stumps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly specified stump. It is applied before every stump pushed earlier.
    pub fn push(&mut self, stump: Stump) {
        self.0.insert(0, stump);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Stump> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collects stumps in the order they were given (e.g. repeated `-S` flags).
impl FromIterator<Stump> for Stumps {
    fn from_iter<I: IntoIterator<Item = Stump>>(iter: I) -> Self {
        let mut stumps: Vec<Stump> = iter.into_iter().collect();
        stumps.reverse();
        Self(stumps)
    }
}

impl<'a> IntoIterator for &'a Stumps {
    type Item = &'a Stump;
    type IntoIter = std::slice::Iter<'a, Stump>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
