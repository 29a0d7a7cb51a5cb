//! X.509 certificate summary.
//!
//! Pulls the identifying fields out of a DER certificate without validating
//! signatures or interpreting extensions:
//!
//! ```text
//! Certificate ::= SEQUENCE {
//!     tbsCertificate       SEQUENCE {
//!         version         [0] EXPLICIT INTEGER DEFAULT v1,
//!         serialNumber        INTEGER,
//!         signature           AlgorithmIdentifier,
//!         issuer              Name,
//!         validity            SEQUENCE { notBefore Time, notAfter Time },
//!         subject             Name,
//!         subjectPublicKeyInfo SEQUENCE { AlgorithmIdentifier, BIT STRING },
//!         ... [3] EXPLICIT Extensions OPTIONAL },
//!     signatureAlgorithm   AlgorithmIdentifier,
//!     signatureValue       BIT STRING }
//! ```

use std::fmt::Write as _;

use bitflags::bitflags;
use compact_str::CompactString;
use tracing::debug;

use super::header::{read_tlv, TlvHeader, UniversalTag};
use super::iter::{count_elements, integer_u64, oid, string, Limits, TlvIter};
use super::oid::{known, Oid};
use crate::cursor::Cursor;
use crate::error::{DecodeError, DecodeResult};
use crate::protocol::record::{presence, push_some};
use crate::protocol::{FieldList, FieldValue, ProtoInfo, ProtoRecord};

bitflags! {
    /// Presence set for [`CertInfo`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CertFields: u32 {
        const ISSUER_CN = 1 << 0;
        const ISSUER_ORG = 1 << 1;
        const SUBJECT_CN = 1 << 2;
        const SUBJECT_ORG = 1 << 3;
        const KEY_ALGORITHM = 1 << 4;
        const EXTENSIONS = 1 << 5;
    }
}

/// Identifying fields of one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertInfo {
    /// `head_len` covers the whole certificate element.
    pub info: ProtoInfo,
    /// 1-based (v1, v2, v3).
    pub version: u8,
    /// Serial number as lowercase hex, leading zero octet stripped.
    pub serial: CompactString,
    pub signature_algorithm: Oid,
    pub not_before: CompactString,
    pub not_after: CompactString,
    pub issuer_cn: Option<CompactString>,
    pub issuer_org: Option<CompactString>,
    pub subject_cn: Option<CompactString>,
    pub subject_org: Option<CompactString>,
    pub key_algorithm: Option<Oid>,
    /// Number of extensions in the `[3]` block.
    pub extensions: Option<u64>,
}

impl CertInfo {
    pub fn presence(&self) -> CertFields {
        presence!(self, CertFields {
            ISSUER_CN => issuer_cn,
            ISSUER_ORG => issuer_org,
            SUBJECT_CN => subject_cn,
            SUBJECT_ORG => subject_org,
            KEY_ALGORITHM => key_algorithm,
            EXTENSIONS => extensions,
        })
    }

    pub fn has(&self, fields: CertFields) -> bool {
        self.presence().contains(fields)
    }
}

impl ProtoRecord for CertInfo {
    fn info(&self) -> &ProtoInfo {
        &self.info
    }

    fn presence_bits(&self) -> u32 {
        self.presence().bits()
    }

    fn fields(&self) -> FieldList<'_> {
        let mut out = FieldList::new();
        out.push(("version", FieldValue::UInt8(self.version)));
        out.push(("serial", FieldValue::Str(&self.serial)));
        out.push((
            "signature_algorithm",
            FieldValue::OwnedString(CompactString::from(self.signature_algorithm.to_string())),
        ));
        out.push(("not_before", FieldValue::Str(&self.not_before)));
        out.push(("not_after", FieldValue::Str(&self.not_after)));
        push_some!(out,
            "issuer_cn" => self.issuer_cn.as_deref().map(FieldValue::Str),
            "issuer_org" => self.issuer_org.as_deref().map(FieldValue::Str),
            "subject_cn" => self.subject_cn.as_deref().map(FieldValue::Str),
            "subject_org" => self.subject_org.as_deref().map(FieldValue::Str),
            "key_algorithm" => self
                .key_algorithm
                .as_ref()
                .map(|o| FieldValue::OwnedString(CompactString::from(o.to_string()))),
            "extensions" => self.extensions.map(FieldValue::UInt64),
        );
        out
    }
}

#[derive(Default)]
struct Name {
    common_name: Option<CompactString>,
    organization: Option<CompactString>,
}

/// Decode the certificate at the start of `data` with default limits.
pub fn decode_certificate(data: &[u8]) -> DecodeResult<CertInfo> {
    decode_certificate_with(&mut Cursor::new(data), Limits::default())
}

/// Decode one certificate and advance the cursor past it.
///
/// A certificate cut off by the capture is `TooShort`; any structural
/// violation, including nesting deeper than `limits.max_depth`, is
/// `Malformed`.
pub fn decode_certificate_with(cursor: &mut Cursor<'_>, limits: Limits) -> DecodeResult<CertInfo> {
    let start = cursor.position();
    let cert = read_tlv(cursor)?;
    if !cert.is_universal(UniversalTag::Sequence) {
        return Err(DecodeError::malformed("certificate", format!("found {cert}")));
    }
    count_elements(cert.value, limits)?;

    let mut outer = TlvIter::children(&cert);
    let tbs = outer.expect(UniversalTag::Sequence)?;
    let mut fields = TlvIter::children(&tbs);

    let version = match fields.next_if_context(0)? {
        Some(explicit) => {
            let value = integer_u64(&TlvIter::children(&explicit).expect(UniversalTag::Integer)?)?;
            value
                .checked_add(1)
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| DecodeError::malformed("version", format!("{value}")))?
        }
        None => 1,
    };

    let serial = hex(&fields.expect(UniversalTag::Integer)?);
    let signature_algorithm = algorithm(&fields.expect(UniversalTag::Sequence)?)?;
    let issuer = name(&fields.expect(UniversalTag::Sequence)?)?;

    let validity = fields.expect(UniversalTag::Sequence)?;
    let mut times = TlvIter::children(&validity);
    let not_before = time(&next_element(&mut times, "not_before")?)?;
    let not_after = time(&next_element(&mut times, "not_after")?)?;

    let subject = name(&fields.expect(UniversalTag::Sequence)?)?;

    let key_algorithm = match fields.next() {
        Some(spki) => {
            let spki = spki?;
            let mut parts = TlvIter::children(&spki);
            Some(algorithm(&parts.expect(UniversalTag::Sequence)?)?)
        }
        None => None,
    };

    // Optional [1] and [2] unique identifiers precede the extensions
    let mut extensions = None;
    for element in fields {
        let element = element?;
        if element.is_context(3) {
            let list = TlvIter::children(&element).expect(UniversalTag::Sequence)?;
            let mut count = 0;
            for extension in TlvIter::children(&list) {
                extension?;
                count += 1;
            }
            extensions = Some(count);
        }
    }

    let info = CertInfo {
        info: ProtoInfo::new(cursor.position() - start, 0),
        version,
        serial,
        signature_algorithm,
        not_before,
        not_after,
        issuer_cn: issuer.common_name,
        issuer_org: issuer.organization,
        subject_cn: subject.common_name,
        subject_org: subject.organization,
        key_algorithm,
        extensions,
    };
    debug!(
        "Decoded certificate v{} serial {} subject {:?}",
        info.version, info.serial, info.subject_cn
    );
    Ok(info)
}

fn next_element<'a>(iter: &mut TlvIter<'a>, field: &'static str) -> DecodeResult<TlvHeader<'a>> {
    iter.next()
        .unwrap_or_else(|| Err(DecodeError::malformed(field, "missing")))
}

fn hex(h: &TlvHeader<'_>) -> CompactString {
    let bytes = match h.value {
        [0, rest @ ..] if !rest.is_empty() => rest,
        all => all,
    };
    let mut out = CompactString::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// AlgorithmIdentifier: the OID, parameters ignored.
fn algorithm(h: &TlvHeader<'_>) -> DecodeResult<Oid> {
    oid(&TlvIter::children(h).expect(UniversalTag::ObjectIdentifier)?)
}

fn time(h: &TlvHeader<'_>) -> DecodeResult<CompactString> {
    match h.universal() {
        Some(UniversalTag::UtcTime | UniversalTag::GeneralizedTime) => {
            Ok(CompactString::from(String::from_utf8_lossy(h.value)))
        }
        _ => Err(DecodeError::malformed("time", format!("found {h}"))),
    }
}

/// Name ::= SEQUENCE OF SET OF SEQUENCE { type OID, value ANY }
///
/// Keeps the first common name and organization seen.
fn name(h: &TlvHeader<'_>) -> DecodeResult<Name> {
    let mut out = Name::default();
    for rdn in TlvIter::children(h) {
        let rdn = rdn?;
        if !rdn.is_universal(UniversalTag::Set) {
            return Err(DecodeError::malformed("name", format!("found {rdn}")));
        }
        for attribute in TlvIter::children(&rdn) {
            let attribute = attribute?;
            let mut parts = TlvIter::children(&attribute);
            let kind = oid(&parts.expect(UniversalTag::ObjectIdentifier)?)?;
            let value = next_element(&mut parts, "attribute")?;
            let slot = if kind.is(known::COMMON_NAME) {
                &mut out.common_name
            } else if kind.is(known::ORGANIZATION_NAME) {
                &mut out.organization
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(string(&value)?);
            }
        }
    }
    Ok(out)
}
