pub mod asn1;
pub(crate) mod b64;
pub mod constants;
pub mod crypto;
pub mod pkcs7;
pub mod policy;
pub mod revocation;
pub mod session;
