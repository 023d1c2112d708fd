// Encode-side element tree.
//
// Elements, attributes, and cdata all share the TLV framing; the value
// types differ. Attribute values are a closed tagged variant with one
// exhaustive match at the encode boundary.

use std::time::Duration;

use log::debug;

use super::bitbuf::BitBuf;
use super::contentid::encode_contentid;
use super::frame::{self, TAG_CDATA};
use super::genre::encode_genre;
use super::timepoint::encode_timepoint;
use super::encoder::EncodeError;
use crate::model::{ContentId, Timepoint};

/// Wire width of a duration value, in bits.
const DURATION_BITS: u32 = 16;
/// Largest encodable duration in whole seconds.
pub const MAX_DURATION_SECS: u64 = (1 << DURATION_BITS) - 1;

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// A typed attribute value. Integers carry their wire width explicitly,
/// since the encoded form has no intrinsic width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Uint { value: u64, width: u32 },
    Duration(Duration),
    Text(String),
    Genre(String),
    Timepoint(Timepoint),
    ContentId(ContentId),
}

impl Value {
    fn to_bits(&self) -> Result<BitBuf, EncodeError> {
        let mut bits = match self {
            Value::Uint { value, width } => {
                let mut bits = BitBuf::new();
                bits.append_uint(*value, *width)?;
                bits
            }
            Value::Duration(duration) => {
                if duration.as_secs() > MAX_DURATION_SECS || duration.subsec_nanos() != 0 {
                    return Err(EncodeError::DurationOutOfRange(*duration));
                }
                let mut bits = BitBuf::new();
                bits.append_uint(duration.as_secs(), DURATION_BITS)?;
                bits
            }
            Value::Text(text) => {
                let mut bits = BitBuf::new();
                bits.append_bytes(text.as_bytes());
                bits
            }
            Value::Genre(href) => encode_genre(href)?,
            Value::Timepoint(tp) => encode_timepoint(tp)?,
            Value::ContentId(id) => encode_contentid(id)?,
        };
        bits.pad_to_byte();
        Ok(bits)
    }
}

// ---------------------------------------------------------------------------
// Attributes and elements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub tag: u8,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: u8,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    pub cdata: Option<String>,
}

impl Element {
    pub fn new(tag: u8) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
            cdata: None,
        }
    }

    pub fn attr(&mut self, tag: u8, value: Value) {
        self.attributes.push(Attribute { tag, value });
    }

    pub fn uint(&mut self, tag: u8, value: u64, width: u32) {
        self.attr(tag, Value::Uint { value, width });
    }

    pub fn text(&mut self, tag: u8, value: impl Into<String>) {
        self.attr(tag, Value::Text(value.into()));
    }

    pub fn child(&mut self, element: Element) {
        self.children.push(element);
    }

    /// Render this element and its subtree as framed bits.
    /// Wire order: attributes, then children, then cdata.
    pub fn to_bits(&self) -> Result<BitBuf, EncodeError> {
        debug!("rendering element {:#04x}", self.tag);
        let mut payload = BitBuf::new();
        for attribute in &self.attributes {
            let value = attribute.value.to_bits()?;
            frame::write_frame(&mut payload, attribute.tag, &value)?;
        }
        for child in &self.children {
            payload.append(&child.to_bits()?);
        }
        if let Some(cdata) = &self.cdata {
            let mut text = BitBuf::new();
            text.append_bytes(cdata.as_bytes());
            frame::write_frame(&mut payload, TAG_CDATA, &text)?;
        }

        let mut bits = BitBuf::new();
        frame::write_frame(&mut bits, self.tag, &payload)?;
        Ok(bits)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::frame::read_frame;

    #[test]
    fn element_frames_attributes_before_children() {
        let mut root = Element::new(0x1C);
        root.uint(0x81, 21480, 24);
        let mut child = Element::new(0x10);
        child.cdata = Some("Gold".into());
        root.child(child);

        let bytes = root.to_bits().unwrap().into_bytes();
        let outer = read_frame(&bytes, 0).unwrap();
        assert_eq!(outer.tag, 0x1C);

        let attr = read_frame(outer.payload, 0).unwrap();
        assert_eq!(attr.tag, 0x81);
        assert_eq!(attr.payload, &[0x00, 0x53, 0xE8]);

        let name = read_frame(outer.payload, attr.end).unwrap();
        assert_eq!(name.tag, 0x10);
        let cdata = read_frame(name.payload, 0).unwrap();
        assert_eq!(cdata.tag, TAG_CDATA);
        assert_eq!(cdata.payload, b"Gold");
    }

    #[test]
    fn duration_range_checks() {
        let ok = Value::Duration(Duration::from_secs(MAX_DURATION_SECS));
        assert!(ok.to_bits().is_ok());

        let long = Value::Duration(Duration::from_secs(MAX_DURATION_SECS + 1));
        assert!(matches!(
            long.to_bits(),
            Err(EncodeError::DurationOutOfRange(_))
        ));

        let subsec = Value::Duration(Duration::from_millis(1500));
        assert!(matches!(
            subsec.to_bits(),
            Err(EncodeError::DurationOutOfRange(_))
        ));
    }

    #[test]
    fn values_pad_to_byte_boundary() {
        // A genre payload is 4+4 bits plus levels; already aligned.
        // A content id long form is 48 bits; aligned. Timepoint short form
        // is 32 bits; aligned. The padding matters for LTO forms (40/56).
        let id: ContentId = "e1.ce00.c000.0".parse().unwrap();
        let bits = Value::ContentId(id).to_bits().unwrap();
        assert_eq!(bits.len() % 8, 0);
    }
}
