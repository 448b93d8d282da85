//! Service layer module root.
//! Contains the prepare/finalize signing protocol and CMS assembly services.

pub mod injector;
pub mod pkcs7_builder;
pub mod placeholder;
pub mod revocation_collector;
pub mod session;
pub mod session_builder;
pub mod signed_attributes_builder;
pub mod timestamp_parser;
pub mod timestamp_request_builder;
pub mod verification;

pub use injector::SignatureInjector;
pub use pkcs7_builder::Pkcs7BuilderService;
pub use placeholder::PlaceholderSizeEstimator;
pub use revocation_collector::RevocationEvidenceCollector;
pub use session::{AwaitingSignature, PreparedSession, SigningSession};
pub use session_builder::{PreparedAttributes, SigningSessionBuilder};
pub use signed_attributes_builder::SignedAttributesBuilder;
pub use timestamp_parser::TimestampParserService;
pub use timestamp_request_builder::TimestampRequestBuilder;
pub use verification::{SignatureSummary, SignedDataInspector};
