//! Incremental line decoding for chat log bytes.
//!
//! The game writes its logs as UTF-16LE with a byte order mark and CRLF line
//! endings. Other encodings are recognised from their BOM, or from the first
//! code unit when there is none.

use crate::error::Result;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Text encodings a chat log may be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Detects the encoding from the first bytes of a file.
    ///
    /// Returns the encoding and the length of its byte order mark, or `None`
    /// when more bytes are needed to decide.
    pub fn sniff(head: &[u8]) -> Option<(Self, usize)> {
        if head.starts_with(&UTF16LE_BOM) {
            return Some((Self::Utf16Le, UTF16LE_BOM.len()));
        }
        if head.starts_with(&UTF16BE_BOM) {
            return Some((Self::Utf16Be, UTF16BE_BOM.len()));
        }
        if head.starts_with(&UTF8_BOM) {
            return Some((Self::Utf8, UTF8_BOM.len()));
        }
        if head.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(head) {
            return None;
        }
        if head.len() < 2 {
            return None;
        }

        let encoding = match (head[0], head[1]) {
            (lo, 0) if lo != 0 => Self::Utf16Le,
            (0, lo) if lo != 0 => Self::Utf16Be,
            _ => Self::Utf8,
        };
        Some((encoding, 0))
    }

    fn unit_len(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16Le | Self::Utf16Be => 2,
        }
    }

    fn is_newline(self, unit: &[u8]) -> bool {
        match self {
            Self::Utf8 => unit == b"\n",
            Self::Utf16Le => unit == [b'\n', 0],
            Self::Utf16Be => unit == [0, b'\n'],
        }
    }

    fn decode(self, bytes: &[u8]) -> Result<String> {
        let text = match self {
            Self::Utf8 => String::from_utf8(bytes.to_vec())?,
            Self::Utf16Le => String::from_utf16(&code_units(bytes, u16::from_le_bytes))?,
            Self::Utf16Be => String::from_utf16(&code_units(bytes, u16::from_be_bytes))?,
        };
        Ok(text)
    }
}

fn code_units(bytes: &[u8], convert: fn([u8; 2]) -> u16) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| convert([pair[0], pair[1]]))
        .collect()
}

/// Splits a byte stream into complete lines, keeping any unfinished tail.
#[derive(Debug, Default)]
pub struct LineDecoder {
    encoding: Option<TextEncoding>,
    pending: Vec<u8>,
}

impl LineDecoder {
    /// A decoder that detects the encoding from the first bytes it sees.
    pub fn new() -> Self {
        Self::default()
    }

    /// A decoder for a stream that starts mid-file, where no BOM will appear.
    pub fn with_encoding(encoding: TextEncoding) -> Self {
        Self {
            encoding: Some(encoding),
            pending: Vec::new(),
        }
    }

    pub fn encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }

    /// Number of buffered bytes that do not yet form a complete line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feeds bytes and returns every line completed by them, without the
    /// line terminator.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>> {
        self.pending.extend_from_slice(bytes);

        let encoding = match self.encoding {
            Some(encoding) => encoding,
            None => match TextEncoding::sniff(&self.pending) {
                Some((encoding, bom_len)) => {
                    self.pending.drain(..bom_len);
                    self.encoding = Some(encoding);
                    encoding
                }
                None => return Ok(Vec::new()),
            },
        };

        let unit = encoding.unit_len();
        let mut lines = Vec::new();
        let mut line_start = 0;
        let mut offset = 0;
        while offset + unit <= self.pending.len() {
            if encoding.is_newline(&self.pending[offset..offset + unit]) {
                let mut line = encoding.decode(&self.pending[line_start..offset])?;
                if line.ends_with('\r') {
                    line.pop();
                }
                lines.push(line);
                line_start = offset + unit;
            }
            offset += unit;
        }
        self.pending.drain(..line_start);

        Ok(lines)
    }
}
