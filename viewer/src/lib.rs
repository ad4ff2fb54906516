//! Display-ready certificate bundles.
//!
//! [`parse`] takes raw bytes (a PKCS#12 container, a DER certificate or PEM
//! text), a password and the evaluation instant, and always returns a
//! [`ParseOutcome`]. Errors from the lower crates are folded into its four
//! variants. [`PasswordRetryController`] drives the usual flow of trying the
//! empty password first and asking for one only when needed.
//!
//! ```no_run
//! use chrono::Utc;
//! use pfxview_viewer::{ParseOptions, ParseOutcome, parse};
//!
//! let bytes = std::fs::read("bundle.p12").unwrap();
//! match parse(&bytes, "", Utc::now(), &ParseOptions::default()) {
//!     ParseOutcome::Success(bundle) => {
//!         for cert in bundle.certificates {
//!             println!("{} {}", cert.thumbprint, cert.subject);
//!         }
//!     }
//!     ParseOutcome::PasswordRequired => println!("password required"),
//!     other => println!("{:?}", other),
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod expiry;
pub mod fingerprint;
pub mod format;
pub mod info;
pub mod outcome;

pub use config::ParseOptions;
pub use controller::{ControllerState, PasswordFailure, PasswordRetryController, Resolution};
pub use expiry::ExpiryBand;
pub use format::InputFormat;
pub use info::{CertificateInfo, ExtensionInfo, PublicKeySummary};
pub use outcome::{Bundle, ParseOutcome, parse};
pub use pfxview_pkcs12::{Integrity, PrivateKeyPresence};
