//! Tag and length octets of a BER/DER element.

use std::fmt;

use tracing::debug;

use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};

const CLASS_MASK: u8 = 0b1100_0000;
const CONSTRUCTED_BIT: u8 = 0b0010_0000;
const TAG_MASK: u8 = 0b0001_1111;
const MORE_BIT: u8 = 0x80;

/// Low-bit tag value announcing a multi-octet tag number.
pub const LONG_FORM_TAG: u8 = 0x1f;

/// Class of a tag (two high bits of the identifier octet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    fn from_bits(bits: u8) -> Self {
        match bits >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TagClass::Universal => "universal",
            TagClass::Application => "application",
            TagClass::ContextSpecific => "context-specific",
            TagClass::Private => "private",
        }
    }
}

/// Primitive or constructed encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construction {
    Primitive,
    Constructed,
}

/// Tag numbers of the universal class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UniversalTag {
    Eoc = 0,
    Boolean = 1,
    Integer = 2,
    BitString = 3,
    OctetString = 4,
    Null = 5,
    ObjectIdentifier = 6,
    ObjectDescriptor = 7,
    External = 8,
    Real = 9,
    Enumerated = 10,
    EmbeddedPdv = 11,
    Utf8String = 12,
    RelativeOid = 13,
    Sequence = 16,
    Set = 17,
    NumericString = 18,
    PrintableString = 19,
    T61String = 20,
    VideotexString = 21,
    Ia5String = 22,
    UtcTime = 23,
    GeneralizedTime = 24,
    GraphicString = 25,
    VisibleString = 26,
    GeneralString = 27,
    UniversalString = 28,
    CharacterString = 29,
    BmpString = 30,
}

impl UniversalTag {
    pub fn from_number(n: u32) -> Option<Self> {
        use UniversalTag::*;
        Some(match n {
            0 => Eoc,
            1 => Boolean,
            2 => Integer,
            3 => BitString,
            4 => OctetString,
            5 => Null,
            6 => ObjectIdentifier,
            7 => ObjectDescriptor,
            8 => External,
            9 => Real,
            10 => Enumerated,
            11 => EmbeddedPdv,
            12 => Utf8String,
            13 => RelativeOid,
            16 => Sequence,
            17 => Set,
            18 => NumericString,
            19 => PrintableString,
            20 => T61String,
            21 => VideotexString,
            22 => Ia5String,
            23 => UtcTime,
            24 => GeneralizedTime,
            25 => GraphicString,
            26 => VisibleString,
            27 => GeneralString,
            28 => UniversalString,
            29 => CharacterString,
            30 => BmpString,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        use UniversalTag::*;
        match self {
            Eoc => "EOC",
            Boolean => "BOOLEAN",
            Integer => "INTEGER",
            BitString => "BIT STRING",
            OctetString => "OCTET STRING",
            Null => "NULL",
            ObjectIdentifier => "OBJECT IDENTIFIER",
            ObjectDescriptor => "ObjectDescriptor",
            External => "EXTERNAL",
            Real => "REAL",
            Enumerated => "ENUMERATED",
            EmbeddedPdv => "EMBEDDED PDV",
            Utf8String => "UTF8String",
            RelativeOid => "RELATIVE-OID",
            Sequence => "SEQUENCE",
            Set => "SET",
            NumericString => "NumericString",
            PrintableString => "PrintableString",
            T61String => "T61String",
            VideotexString => "VideotexString",
            Ia5String => "IA5String",
            UtcTime => "UTCTime",
            GeneralizedTime => "GeneralizedTime",
            GraphicString => "GraphicString",
            VisibleString => "VisibleString",
            GeneralString => "GeneralString",
            UniversalString => "UniversalString",
            CharacterString => "CHARACTER STRING",
            BmpString => "BMPString",
        }
    }

    /// Whether the content is a character string.
    pub fn is_string(&self) -> bool {
        use UniversalTag::*;
        matches!(
            self,
            Utf8String
                | NumericString
                | PrintableString
                | T61String
                | VideotexString
                | Ia5String
                | GraphicString
                | VisibleString
                | GeneralString
                | UniversalString
                | BmpString
        )
    }
}

/// A decoded identifier and length, with a view of the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvHeader<'a> {
    pub class: TagClass,
    pub construction: Construction,
    pub tag_number: u32,
    /// Length announced by the length octets.
    pub length: u64,
    /// Content octets, exactly `length` bytes, borrowed from the capture.
    pub value: &'a [u8],
    long_form_tag: bool,
}

impl<'a> TlvHeader<'a> {
    pub fn is_constructed(&self) -> bool {
        self.construction == Construction::Constructed
    }

    /// True when the identifier used the multi-octet tag number form.
    pub fn is_long_form_tag(&self) -> bool {
        self.long_form_tag
    }

    /// Universal tag, if this is a universal-class element with a known number.
    pub fn universal(&self) -> Option<UniversalTag> {
        match self.class {
            TagClass::Universal => UniversalTag::from_number(self.tag_number),
            _ => None,
        }
    }

    pub fn is_universal(&self, tag: UniversalTag) -> bool {
        self.universal() == Some(tag)
    }

    /// Context-specific tag `[n]`.
    pub fn is_context(&self, n: u32) -> bool {
        self.class == TagClass::ContextSpecific && self.tag_number == n
    }

    /// Cursor over the content octets.
    pub fn content(&self) -> Cursor<'a> {
        Cursor::new(self.value)
    }
}

impl fmt::Display for TlvHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let construction = match self.construction {
            Construction::Primitive => "primitive",
            Construction::Constructed => "constructed",
        };
        write!(f, "{} {} ", self.class.as_str(), construction)?;
        match self.universal() {
            Some(tag) => f.write_str(tag.name())?,
            None => write!(f, "[{}]", self.tag_number)?,
        }
        write!(f, ", size {}", self.length)
    }
}

/// Decode one identifier octet group and length, leaving the cursor at the
/// first content octet.
///
/// The content is not consumed: callers either step into it with
/// [`TlvHeader::content`] and then [`Cursor::skip`] past it, or keep reading
/// the parent in place.
///
/// Failure modes:
/// - long-form length whose octet count exceeds the captured bytes: `TooShort`
///   before any of those octets are read
/// - declared length beyond the captured bytes: `TooShort`
/// - indefinite (`0x80`) or reserved (`0xff`) length octet: `Malformed`
///
/// On any failure the cursor is left where it was.
pub fn read_tlv_header<'a>(cursor: &mut Cursor<'a>) -> DecodeResult<TlvHeader<'a>> {
    let mut c = *cursor;
    let header = decode_header(&mut c)?;
    *cursor = c;
    Ok(header)
}

fn decode_header<'a>(cursor: &mut Cursor<'a>) -> DecodeResult<TlvHeader<'a>> {
    let identifier = cursor.read_u8()?;
    let class = TagClass::from_bits(identifier & CLASS_MASK);
    let construction = if identifier & CONSTRUCTED_BIT != 0 {
        Construction::Constructed
    } else {
        Construction::Primitive
    };

    let low = identifier & TAG_MASK;
    let long_form_tag = low == LONG_FORM_TAG;
    let tag_number = if long_form_tag {
        read_long_tag_number(cursor)?
    } else {
        u32::from(low)
    };

    let length = read_length(cursor)?;
    if length > cursor.remaining() as u64 {
        return Err(DecodeError::too_short(
            usize::try_from(length).unwrap_or(usize::MAX),
            cursor.remaining(),
        ));
    }
    let value = cursor.peek_bytes(length as usize)?;

    let header = TlvHeader {
        class,
        construction,
        tag_number,
        length,
        value,
        long_form_tag,
    };
    debug!("Parsed TLV {header} (identifier {identifier:#04x})");
    Ok(header)
}

/// Read a header and advance past its content.
pub fn read_tlv<'a>(cursor: &mut Cursor<'a>) -> DecodeResult<TlvHeader<'a>> {
    let header = read_tlv_header(cursor)?;
    cursor.skip(header.value.len())?;
    Ok(header)
}

/// Short form: one octet, top bit clear. Long form: top bit set, low seven
/// bits count the big-endian length octets that follow.
fn read_length(cursor: &mut Cursor<'_>) -> DecodeResult<u64> {
    let first = cursor.read_u8()?;
    if first & MORE_BIT == 0 {
        return Ok(u64::from(first));
    }

    let num_octets = usize::from(first & !MORE_BIT);
    match num_octets {
        0 => Err(DecodeError::malformed(
            "length",
            "indefinite length is not allowed",
        )),
        0x7f => Err(DecodeError::malformed("length", "reserved length octet 0xff")),
        n => {
            cursor.ensure(n)?;
            cursor.read_fixed_int_n(n)
        }
    }
}

fn read_long_tag_number(cursor: &mut Cursor<'_>) -> DecodeResult<u32> {
    let mut value: u32 = 0;
    loop {
        let b = cursor.read_u8()?;
        if value > (u32::MAX >> 7) {
            return Err(DecodeError::malformed("tag", "tag number overflows 32 bits"));
        }
        value = (value << 7) | u32::from(b & !MORE_BIT);
        if b & MORE_BIT == 0 {
            return Ok(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseStatus;

    #[test]
    fn test_short_form_lengths_round_trip() {
        for len in 0u8..=127 {
            let mut data = vec![0x04, len];
            data.extend(std::iter::repeat(0xab).take(len as usize));
            let mut c = Cursor::new(&data);

            let h = read_tlv_header(&mut c).unwrap();
            assert_eq!(h.length, u64::from(len));
            assert_eq!(h.value.len(), len as usize);
            assert_eq!(c.position(), 2); // left at content start
        }
    }

    #[test]
    fn test_long_form_one_octet() {
        let mut data = vec![0x04, 0x81, 0x80];
        data.extend(std::iter::repeat(0).take(128));
        let mut c = Cursor::new(&data);

        let h = read_tlv_header(&mut c).unwrap();
        assert_eq!(h.length, 128);
        assert_eq!(c.position(), 3);
    }

    #[test]
    fn test_long_form_two_octets() {
        let mut data = vec![0x30, 0x82, 0x01, 0x00];
        data.extend(std::iter::repeat(0).take(256));
        let mut c = Cursor::new(&data);

        let h = read_tlv_header(&mut c).unwrap();
        assert_eq!(h.length, 256);
        assert!(h.is_constructed());
        assert!(h.is_universal(UniversalTag::Sequence));
    }

    #[test]
    fn test_long_form_octet_count_beyond_capture() {
        // Announces 4 length octets, only 2 captured
        let data = [0x04, 0x84, 0x00, 0x01];
        let mut c = Cursor::new(&data);

        let err = read_tlv_header(&mut c).unwrap_err();
        assert_eq!(err.status(), ParseStatus::TooShort);
    }

    #[test]
    fn test_content_beyond_capture_is_too_short() {
        let data = [0x04, 0x05, 0x01, 0x02];
        let mut c = Cursor::new(&data);

        let err = read_tlv_header(&mut c).unwrap_err();
        assert_eq!(err, DecodeError::too_short(5, 2));
    }

    #[test]
    fn test_failed_header_does_not_move_cursor() {
        let data = [0x05, 0x00, 0x04, 0x05, 0x01, 0x02];
        let mut c = Cursor::new(&data);
        read_tlv(&mut c).unwrap();

        assert!(read_tlv_header(&mut c).unwrap_err().is_too_short());
        assert_eq!(c.position(), 2);

        let mut c = Cursor::new(&[0x30, 0x84, 0x00, 0x00]);
        assert!(read_tlv_header(&mut c).is_err());
        assert_eq!(c.position(), 0);

        let mut c = Cursor::new(&[0x30, 0x80, 0x00, 0x00]);
        assert_eq!(read_tlv_header(&mut c).unwrap_err().status(), ParseStatus::Malformed);
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn test_huge_declared_length_is_too_short() {
        let data = [0x04, 0x88, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];
        let mut c = Cursor::new(&data);

        let err = read_tlv_header(&mut c).unwrap_err();
        assert_eq!(err.status(), ParseStatus::TooShort);
    }

    #[test]
    fn test_indefinite_and_reserved_lengths() {
        let mut c = Cursor::new(&[0x30, 0x80, 0x00, 0x00]);
        assert_eq!(
            read_tlv_header(&mut c).unwrap_err().status(),
            ParseStatus::Malformed
        );

        let mut c = Cursor::new(&[0x30, 0xff, 0x00, 0x00]);
        assert_eq!(
            read_tlv_header(&mut c).unwrap_err().status(),
            ParseStatus::Malformed
        );
    }

    #[test]
    fn test_identifier_bits() {
        // 0x78 = 01 1 11000
        let data = [0x78, 0x00];
        let mut c = Cursor::new(&data);

        let h = read_tlv_header(&mut c).unwrap();
        assert_eq!(h.class, TagClass::Application);
        assert_eq!(h.construction, Construction::Constructed);
        assert_eq!(h.tag_number, 24);
        assert!(!h.is_long_form_tag());
        assert!(h.universal().is_none());
    }

    #[test]
    fn test_context_and_private_classes() {
        let mut c = Cursor::new(&[0xa0, 0x00]);
        let h = read_tlv_header(&mut c).unwrap();
        assert!(h.is_context(0));
        assert!(h.is_constructed());

        let mut c = Cursor::new(&[0xc1, 0x00]);
        let h = read_tlv_header(&mut c).unwrap();
        assert_eq!(h.class, TagClass::Private);
        assert_eq!(h.construction, Construction::Primitive);
        assert_eq!(h.tag_number, 1);
    }

    #[test]
    fn test_long_form_tag_number() {
        // [APPLICATION 201]: 0x5f, 0x81 0x49
        let data = [0x5f, 0x81, 0x49, 0x01, 0xaa];
        let mut c = Cursor::new(&data);

        let h = read_tlv_header(&mut c).unwrap();
        assert!(h.is_long_form_tag());
        assert_eq!(h.class, TagClass::Application);
        assert_eq!(h.tag_number, 201);
        assert_eq!(h.value, &[0xaa]);

        // Continuation never terminates within the capture
        let mut c = Cursor::new(&[0x1f, 0x81, 0x82]);
        assert_eq!(
            read_tlv_header(&mut c).unwrap_err().status(),
            ParseStatus::TooShort
        );
    }

    #[test]
    fn test_read_tlv_skips_content() {
        let data = [0x02, 0x01, 0x05, 0x05, 0x00];
        let mut c = Cursor::new(&data);

        let int = read_tlv(&mut c).unwrap();
        assert!(int.is_universal(UniversalTag::Integer));
        assert_eq!(int.value, &[0x05]);
        let null = read_tlv(&mut c).unwrap();
        assert!(null.is_universal(UniversalTag::Null));
        assert!(c.is_empty());
    }

    #[test]
    fn test_display() {
        let data = [0x30, 0x03, 0x02, 0x01, 0x00];
        let mut c = Cursor::new(&data);
        let h = read_tlv_header(&mut c).unwrap();
        assert_eq!(h.to_string(), "universal constructed SEQUENCE, size 3");

        let mut c = Cursor::new(&[0xa3, 0x00]);
        let h = read_tlv_header(&mut c).unwrap();
        assert_eq!(h.to_string(), "context-specific constructed [3], size 0");
    }

    #[test]
    fn test_empty_input() {
        let mut c = Cursor::new(&[]);
        assert_eq!(read_tlv_header(&mut c), Err(DecodeError::too_short(1, 0)));

        // Identifier without length octet
        let mut c = Cursor::new(&[0x30]);
        assert_eq!(read_tlv_header(&mut c), Err(DecodeError::too_short(1, 0)));
    }
}
