//! CMS `SignedData` builder service.
//!
//! Assembles the detached `ContentInfo(SignedData)` around signed attributes
//! that were fixed at prepare time, the raw signature and, optionally, a
//! timestamp token carried as an unsigned attribute.

use crate::domain::{
    asn1, constants,
    crypto::{CertificateChain, RawSignature},
    pkcs7::{AttributesContext, FinalizedSignature, TimestampToken},
};
use crate::SigningResult;

pub struct Pkcs7BuilderService<'a> {
    chain: &'a CertificateChain,
}

impl<'a> Pkcs7BuilderService<'a> {
    #[must_use]
    pub fn new(chain: &'a CertificateChain) -> Self {
        Self { chain }
    }

    /// Build the complete structure.
    pub fn build_signed(
        &self,
        signed_attrs: &AttributesContext,
        signature: &RawSignature,
        timestamp: Option<&TimestampToken>,
    ) -> SigningResult<FinalizedSignature> {
        let signed_data = asn1::sequence(&[
            &constants::ASN1_INTEGER_ONE,
            &self.build_digest_algorithms(),
            &self.build_encap_content_info(),
            &self.build_certificates(),
            &self.build_signer_infos(signed_attrs, signature, timestamp)?,
        ]);

        let content_info = asn1::sequence(&[
            &asn1::oid(&constants::OID_SIGNED_DATA),
            &asn1::context(0, &signed_data),
        ]);
        log::debug!("Assembled SignedData: {} bytes", content_info.len());
        Ok(FinalizedSignature::from_der(content_info))
    }

    /// digestAlgorithms: SET OF one SHA-256 identifier.
    #[must_use]
    pub fn build_digest_algorithms(&self) -> Vec<u8> {
        asn1::set_of(vec![asn1::algorithm_identifier(&constants::OID_SHA256)])
    }

    /// encapContentInfo for detached data: `id-data` without eContent.
    #[must_use]
    pub fn build_encap_content_info(&self) -> Vec<u8> {
        asn1::sequence(&[&asn1::oid(&constants::OID_DATA)])
    }

    /// certificates `[0] IMPLICIT`, chain order preserved.
    #[must_use]
    pub fn build_certificates(&self) -> Vec<u8> {
        let certs: Vec<u8> = self
            .chain
            .certificates()
            .iter()
            .flat_map(|c| c.as_der().iter().copied())
            .collect();
        asn1::context(0, &certs)
    }

    /// signerInfos: SET containing the single `SignerInfo`.
    pub fn build_signer_infos(
        &self,
        signed_attrs: &AttributesContext,
        signature: &RawSignature,
        timestamp: Option<&TimestampToken>,
    ) -> SigningResult<Vec<u8>> {
        let sid = self.chain.leaf().issuer_and_serial_der()?;
        let mut fields = vec![
            constants::ASN1_INTEGER_ONE.to_vec(),
            sid,
            asn1::algorithm_identifier(&constants::OID_SHA256),
            signed_attrs.to_implicit_der()?,
            asn1::algorithm_identifier(&constants::OID_RSA_ENCRYPTION),
            asn1::octet_string(signature.as_slice()),
        ];
        if let Some(token) = timestamp {
            let attr = asn1::sequence(&[
                &asn1::oid(&constants::OID_TIMESTAMP_TOKEN),
                &asn1::set_of(vec![token.der().to_vec()]),
            ]);
            fields.push(asn1::context(1, &attr));
        }
        let signer_info = asn1::tlv(constants::ASN1_SEQUENCE_TAG, &fields.concat());
        Ok(asn1::set_of(vec![signer_info]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asn1::Tlv;
    use crate::domain::crypto::test_certs;
    use crate::domain::pkcs7::timestamp::test_tokens;
    use crate::domain::revocation::RevocationEvidence;
    use crate::services::session_builder::SigningSessionBuilder;

    fn prepared(chain: &CertificateChain) -> AttributesContext {
        SigningSessionBuilder::default()
            .prepare(&mut &b"doc"[..], chain, &RevocationEvidence::none())
            .unwrap()
            .context
    }

    #[test]
    fn test_signed_data_layout() {
        let chain = test_certs::chain(3);
        let ctx = prepared(&chain);
        let sig = RawSignature::new(vec![0x5A; 256]).unwrap();
        let out = Pkcs7BuilderService::new(&chain)
            .build_signed(&ctx, &sig, None)
            .unwrap();

        let ci = Tlv::parse(out.as_der()).unwrap().children().unwrap();
        assert_eq!(ci[0].as_oid().unwrap(), constants::OID_SIGNED_DATA);
        let sd = ci[1].children().unwrap()[0].children().unwrap();
        assert_eq!(sd.len(), 5);
        assert_eq!(sd[0].raw(), &constants::ASN1_INTEGER_ONE);
        assert_eq!(sd[2].children().unwrap().len(), 1, "detached content");

        let certs = sd[3].children().unwrap();
        assert_eq!(certs.len(), 3);
        assert_eq!(certs[0].raw(), chain.leaf().as_der());

        let si = sd[4].children().unwrap()[0].children().unwrap();
        assert_eq!(si.len(), 6);
        assert_eq!(si[1].raw(), chain.leaf().issuer_and_serial_der().unwrap().as_slice());
        assert_eq!(si[3].tag(), 0xa0);
        assert_eq!(&si[3].raw()[1..], &ctx.as_der()[1..]);
        assert_eq!(si[4].children().unwrap()[0].as_oid().unwrap(), constants::OID_RSA_ENCRYPTION);
        assert_eq!(si[5].value(), sig.as_slice());
    }

    #[test]
    fn test_timestamp_as_unsigned_attribute() {
        let chain = test_certs::chain(1);
        let ctx = prepared(&chain);
        let sig = RawSignature::new(vec![0x11; 128]).unwrap();
        let token = TimestampToken::from_der(test_tokens::token_der(&[0u8; 32])).unwrap();
        let out = Pkcs7BuilderService::new(&chain)
            .build_signed(&ctx, &sig, Some(&token))
            .unwrap();

        let ci = Tlv::parse(out.as_der()).unwrap().children().unwrap();
        let sd = ci[1].children().unwrap()[0].children().unwrap();
        let si = sd[4].children().unwrap()[0].children().unwrap();
        assert_eq!(si.len(), 7);
        assert_eq!(si[6].tag(), 0xa1);
        let attr = si[6].children().unwrap()[0].children().unwrap();
        assert_eq!(attr[0].as_oid().unwrap(), constants::OID_TIMESTAMP_TOKEN);
        assert_eq!(attr[1].children().unwrap()[0].raw(), token.der());
    }
}
