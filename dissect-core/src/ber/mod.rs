//! BER/DER tag-length-value toolkit.
//!
//! - [`read_tlv_header`] decodes one identifier and length and checks the
//!   content fits in the capture
//! - [`read_node_sequence`] / [`Oid`] decode object identifier content
//! - [`TlvIter`] walks sibling elements inside a constructed value
//! - [`decode_certificate`] summarises an X.509 certificate
//!
//! Only the definite-length forms are accepted (the DER subset); indefinite
//! lengths are reported as malformed.

mod header;
mod iter;
mod oid;
mod x509;

pub use header::{
    read_tlv, read_tlv_header, Construction, TagClass, TlvHeader, UniversalTag, LONG_FORM_TAG,
};
pub use iter::{count_elements, integer_u64, oid as read_oid, string, Limits, TlvIter};
pub use oid::{known, read_node_sequence, Oid};
pub use x509::{decode_certificate, decode_certificate_with, CertFields, CertInfo};
