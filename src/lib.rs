//! # payment-lifecycle
//!
//! A shared payment record model and a client for a remote payment API.
//! The same [`PaymentRecord`] shape is meant to be used on both ends of the
//! wire, so front end and back end agree on what a valid payment is.
//!
//! A payment goes through three phases:
//!
//! 1. fetch provider credentials ([`PaymentClient::get_provider_credentials`]),
//! 2. create the payment ([`PaymentClient::create_payment`]),
//! 3. after the user authorizes the charge with the provider, settle it
//!    ([`PaymentClient::process_payment`]).
//!
//! A declined charge comes back as a record with status `FAILED`, not as an
//! error.

pub mod client;
pub mod config;
pub mod error;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::{PaymentClient, PaymentQuery};
pub use config::ClientConfig;
pub use error::{PaymentError, Result};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::*;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(DEFAULT_CURRENCY, "USD");
        assert_eq!(DEFAULT_PROVIDER, "paypal");
        assert_eq!(config::DEFAULT_BASE_PATH, "/payment");
    }

    #[test]
    fn test_payment_record_creation() {
        let record =
            PaymentRecord::construct(PaymentFields::new("p1", "10.00", "acct1", "paypal", ["sku1"]))
                .unwrap();

        assert_eq!(record.id, "p1");
        assert_eq!(record.creator, "acct1");
        assert_eq!(record.service, "paypal");
        assert_eq!(record.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let first = PaymentRecord::generate_id();
        let second = PaymentRecord::generate_id();
        assert_ne!(first, second);
        assert_eq!(first.len(), 36);
    }
}
