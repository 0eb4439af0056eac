//! # sifen
//!
//! Client library for Paraguay's SIFEN electronic invoicing service:
//! typed document model for the five SET document kinds, CDC generation and
//! validation, XML assembly and modular↔official schema mapping, XMLDSig
//! signing over PKCS#12 key material, and a SOAP client with rate-limiting,
//! retry, and contingency-mode handling.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating
//! point. Dates and timestamps use an explicit America/Asuncion offset
//! rather than relying on the host's system time zone.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use sifen::core::*;
//!
//! let issuer = PartyBuilder::new(Ruc::new("80000001", 7).unwrap(), "Acme SA").build();
//! let receiver = PartyBuilder::new(Ruc::new("80000002", 4).unwrap(), "Cliente").build();
//! let line = LineItemBuilder::new("ITEM-1", "Widget", dec!(1), "77", dec!(100000))
//!     .iva(IvaAffectation::Rate10)
//!     .build();
//!
//! let doc = DocumentBuilder::new()
//!     .issuer(issuer)
//!     .receiver(receiver)
//!     .add_line(line)
//!     .timbrado(TimbradoRef { numero: "12345678".into(), establecimiento: "001".into(), punto_expedicion: "001".into() })
//!     .numero_documento("0000001")
//!     .issuance(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(10, 0, 0).unwrap())
//!     .security_code("000123456")
//!     .build_invoice()
//!     .unwrap();
//!
//! assert!(validate(&doc).is_empty());
//! assert_eq!(doc.head.totals.total, dec!(110000));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Document types, RUC/CDC primitives, validation |
//! | `xml` (default) | XML assembly and modular↔official mapping |
//! | `signer` | PKCS#12 loading, canonicalization, XMLDSig |
//! | `transport` | SOAP client, rate limiting, retry, document sender |
//! | `mock` | In-process deterministic fake SET server for tests |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod error;

#[cfg(feature = "xml")]
pub mod xml;

#[cfg(feature = "signer")]
pub mod signer;

#[cfg(feature = "transport")]
pub mod transport;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export the document model at crate root for convenience.
#[cfg(feature = "core")]
pub use crate::core::*;

#[cfg(feature = "core")]
pub use crate::error::SifenError;
