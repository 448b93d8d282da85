use std::fmt;

use der::{asn1::ObjectIdentifier, Decode, Encode};
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{AuthorityInfoAccessSyntax, CrlDistributionPoints};

use super::Sha256Digest;
use crate::domain::{asn1, constants};
use crate::{SigningError, SigningResult};

/// Subject attributes that callers commonly look up by short name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubjectField {
    CommonName,
    Email,
    SerialNumber,
    Organization,
    OrganizationalUnit,
    Country,
    GivenName,
    Surname,
}

impl SubjectField {
    #[must_use]
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            Self::CommonName => ObjectIdentifier::new_unwrap("2.5.4.3"),
            Self::Email => ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.1"),
            Self::SerialNumber => ObjectIdentifier::new_unwrap("2.5.4.5"),
            Self::Organization => ObjectIdentifier::new_unwrap("2.5.4.10"),
            Self::OrganizationalUnit => ObjectIdentifier::new_unwrap("2.5.4.11"),
            Self::Country => ObjectIdentifier::new_unwrap("2.5.4.6"),
            Self::GivenName => ObjectIdentifier::new_unwrap("2.5.4.42"),
            Self::Surname => ObjectIdentifier::new_unwrap("2.5.4.4"),
        }
    }

    /// Parse the usual short names (`CN`, `E`, `SERIALNUMBER`, ...).
    #[must_use]
    pub fn from_short_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "CN" => Some(Self::CommonName),
            "E" | "EMAIL" | "EMAILADDRESS" => Some(Self::Email),
            "SERIALNUMBER" => Some(Self::SerialNumber),
            "O" => Some(Self::Organization),
            "OU" => Some(Self::OrganizationalUnit),
            "C" => Some(Self::Country),
            "G" | "GIVENNAME" => Some(Self::GivenName),
            "SN" | "SURNAME" => Some(Self::Surname),
            _ => None,
        }
    }
}

/// An X.509 certificate kept as its original DER plus the parsed form.
#[derive(Clone)]
pub struct Certificate {
    der: Box<[u8]>,
    parsed: x509_cert::Certificate,
}

impl Certificate {
    pub fn from_der(der: Vec<u8>) -> SigningResult<Self> {
        let parsed = x509_cert::Certificate::from_der(&der).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse certificate: {e}"))
        })?;
        Ok(Self {
            der: der.into_boxed_slice(),
            parsed,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn parsed(&self) -> &x509_cert::Certificate {
        &self.parsed
    }

    /// SHA-256 over the certificate DER, as referenced by `ESSCertIDv2`.
    #[must_use]
    pub fn fingerprint(&self) -> Sha256Digest {
        Sha256Digest::compute(&self.der)
    }

    /// First value of `field` in the subject, if present.
    #[must_use]
    pub fn subject_field(&self, field: SubjectField) -> Option<String> {
        let wanted = field.oid();
        self.parsed
            .tbs_certificate
            .subject
            .0
            .iter()
            .flat_map(|rdn| rdn.0.iter())
            .find(|atv| atv.oid == wanted)
            .map(|atv| String::from_utf8_lossy(atv.value.value()).into_owned())
    }

    #[must_use]
    pub fn common_name(&self) -> Option<String> {
        self.subject_field(SubjectField::CommonName)
    }

    #[must_use]
    pub fn subject(&self) -> String {
        self.parsed.tbs_certificate.subject.to_string()
    }
    #[must_use]
    pub fn issuer(&self) -> String {
        self.parsed.tbs_certificate.issuer.to_string()
    }

    /// DER `IssuerAndSerialNumber` identifying this certificate in a `SignerInfo`.
    pub fn issuer_and_serial_der(&self) -> SigningResult<Vec<u8>> {
        let tbs = &self.parsed.tbs_certificate;
        let issuer = tbs.issuer.to_der()?;
        let serial = tbs.serial_number.to_der()?;
        Ok(asn1::sequence(&[&issuer, &serial]))
    }

    /// DER of the subject `Name`.
    pub fn subject_der(&self) -> SigningResult<Vec<u8>> {
        Ok(self.parsed.tbs_certificate.subject.to_der()?)
    }

    /// DER `INTEGER` of the serial number.
    pub fn serial_der(&self) -> SigningResult<Vec<u8>> {
        Ok(self.parsed.tbs_certificate.serial_number.to_der()?)
    }

    /// Contents of the `subjectPublicKey` BIT STRING.
    #[must_use]
    pub fn public_key_bits(&self) -> &[u8] {
        self.parsed
            .tbs_certificate
            .subject_public_key_info
            .subject_public_key
            .raw_bytes()
    }

    /// OCSP responder URIs from the Authority Information Access extension.
    #[must_use]
    pub fn ocsp_responder_uris(&self) -> Vec<String> {
        let Some(extensions) = &self.parsed.tbs_certificate.extensions else {
            return Vec::new();
        };
        let mut uris = Vec::new();
        for ext in extensions
            .iter()
            .filter(|e| e.extn_id == constants::OID_AUTHORITY_INFO_ACCESS)
        {
            let access = match AuthorityInfoAccessSyntax::from_der(ext.extn_value.as_bytes()) {
                Ok(access) => access,
                Err(e) => {
                    log::warn!("Ignoring malformed authority information access extension: {e}");
                    continue;
                }
            };
            for description in access.0 {
                if description.access_method != constants::OID_AD_OCSP {
                    continue;
                }
                if let GeneralName::UniformResourceIdentifier(uri) = description.access_location {
                    uris.push(uri.to_string());
                }
            }
        }
        uris
    }

    /// URIs from the CRL distribution points extension, in extension order.
    #[must_use]
    pub fn crl_distribution_uris(&self) -> Vec<String> {
        let Some(extensions) = &self.parsed.tbs_certificate.extensions else {
            return Vec::new();
        };
        let mut uris = Vec::new();
        for ext in extensions
            .iter()
            .filter(|e| e.extn_id == constants::OID_CRL_DISTRIBUTION_POINTS)
        {
            let points = match CrlDistributionPoints::from_der(ext.extn_value.as_bytes()) {
                Ok(points) => points,
                Err(e) => {
                    log::warn!("Ignoring malformed CRL distribution points extension: {e}");
                    continue;
                }
            };
            for point in points.0 {
                if let Some(DistributionPointName::FullName(names)) = point.distribution_point {
                    for name in names {
                        if let GeneralName::UniformResourceIdentifier(uri) = name {
                            uris.push(uri.to_string());
                        }
                    }
                }
            }
        }
        uris
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}
impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Certificate(subject={}, len={})",
            self.subject(),
            self.der.len()
        )
    }
}

/// Ordered certificate chain: index 0 is the signer, each next entry issues
/// the previous one.
///
/// Invariant: never empty. Order is taken as given, not re-validated.
#[derive(Clone, PartialEq, Eq)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
}

impl CertificateChain {
    pub fn new(certs: Vec<Certificate>) -> SigningResult<Self> {
        if certs.is_empty() {
            return Err(SigningError::CertificateError(
                "certificate chain must contain at least the signing certificate".into(),
            ));
        }
        Ok(Self { certs })
    }

    pub fn from_der_list(ders: Vec<Vec<u8>>) -> SigningResult<Self> {
        let certs = ders
            .into_iter()
            .map(Certificate::from_der)
            .collect::<SigningResult<Vec<_>>>()?;
        Self::new(certs)
    }

    /// Load a PEM bundle, keeping the order of the blocks.
    pub fn from_pem(pem: &[u8]) -> SigningResult<Self> {
        let parsed = x509_cert::Certificate::load_pem_chain(pem).map_err(|e| {
            SigningError::CertificateError(format!("Failed to parse PEM certificates: {e}"))
        })?;
        let ders = parsed
            .iter()
            .map(|c| c.to_der())
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_der_list(ders)
    }

    #[must_use]
    pub fn leaf(&self) -> &Certificate {
        &self.certs[0]
    }
    #[must_use]
    pub fn certificates(&self) -> &[Certificate] {
        &self.certs
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.certs.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// `(certificate, issuer)` pairs walking from the leaf outward.
    pub fn adjacent_pairs(&self) -> impl Iterator<Item = (&Certificate, &Certificate)> {
        self.certs.windows(2).map(|w| (&w[0], &w[1]))
    }

    #[must_use]
    pub fn to_der_list(&self) -> Vec<Vec<u8>> {
        self.certs.iter().map(|c| c.as_der().to_vec()).collect()
    }
}

impl fmt::Debug for CertificateChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CertificateChain(leaf_len={}, len={})",
            self.leaf().as_der().len(),
            self.certs.len()
        )
    }
}
