//! Payment lifecycle client
//!
//! Drives the three phases of a payment against the remote endpoint:
//! fetch provider credentials, create the payment, then process it once the
//! user has authorized the charge with the provider. The client keeps no
//! lifecycle state between calls; callers sequence the phases.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::*;
use crate::{PaymentError, Result};

/// Characters left unescaped in a path segment, as `encodeURIComponent` does
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Client for the remote payment API
#[derive(Clone)]
pub struct PaymentClient {
    base_path: String,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for PaymentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentClient")
            .field("base_path", &self.base_path)
            .field("transport", &"<transport>")
            .finish()
    }
}

impl PaymentClient {
    /// Create a client over the bundled reqwest transport
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Create a client from `PAYMENT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Create a client over any transport
    pub fn with_transport(config: &ClientConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base_path: config.normalized_base_path().to_string(),
            transport,
        }
    }

    /// Resource path every request is made against
    pub fn base_path(&self) -> &str {
        if self.base_path.is_empty() {
            "/"
        } else {
            &self.base_path
        }
    }

    fn credentials_path(&self) -> String {
        format!("{}/credentials", self.base_path)
    }

    fn payment_path(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, utf8_percent_encode(id, PATH_SEGMENT))
    }

    /// List payments matching the query
    ///
    /// Entries are returned as the server sent them, unknown fields
    /// included; nothing is decoded or re-checked. Use
    /// [`ListedPayment::to_record`] to normalize one.
    pub async fn list_payments(&self, query: &PaymentQuery) -> Result<Vec<ListedPayment>> {
        match self.transport.get(self.base_path(), query.params()).await? {
            Value::Array(items) => Ok(items.into_iter().map(ListedPayment::new).collect()),
            other => Err(PaymentError::validation(format!(
                "payment list must be a JSON array, got {}",
                other
            ))),
        }
    }

    /// Get the metadata the provider's client-side widget needs
    ///
    /// `service` defaults to [`DEFAULT_PROVIDER`].
    pub async fn get_provider_credentials(
        &self,
        service: Option<&str>,
    ) -> Result<ProviderCredentials> {
        let service = service.unwrap_or(DEFAULT_PROVIDER);
        let query = [("service".to_string(), service.to_string())];
        let body = self.transport.get(&self.credentials_path(), &query).await?;
        Ok(ProviderCredentials::new(body))
    }

    /// Create the payment server side before the user is charged
    pub async fn create_payment(&self, payment: &PaymentRecord) -> Result<PaymentRecord> {
        payment.validate()?;

        let mut payment_json = serde_json::to_value(payment)?;
        if let Some(fields) = payment_json.as_object_mut() {
            fields.remove("serviceId");
        }

        info!(payment_id = %payment.id, service = %payment.service, "creating payment");
        let body = self
            .transport
            .post(self.base_path(), &json!({ "payment": payment_json }))
            .await?;

        let created = PaymentRecord::from_value(body)?;
        info!(payment_id = %created.id, status = %created.status, "payment created");
        Ok(created)
    }

    /// Settle a payment after the user authorized it with the provider
    ///
    /// A declined charge is returned as a `FAILED` record, not as an error.
    pub async fn process_payment(
        &self,
        order: &ProviderOrder,
        payment: &PaymentRecord,
    ) -> Result<PaymentRecord> {
        if payment.id.trim().is_empty() {
            return Err(PaymentError::validation("payment id cannot be empty"));
        }

        info!(
            payment_id = %payment.id,
            transaction_id = order.transaction_id().unwrap_or("<none>"),
            "processing payment"
        );
        let request = json!({ "order": order, "payment": payment });
        let body = self
            .transport
            .put(&self.payment_path(&payment.id), &request)
            .await?;

        let processed = PaymentRecord::from_value(body)?;
        match &processed.error {
            Some(error) => warn!(
                payment_id = %processed.id,
                code = %error.code,
                "payment settlement failed"
            ),
            None => info!(
                payment_id = %processed.id,
                status = %processed.status,
                "payment processed"
            ),
        }
        Ok(processed)
    }
}

/// Query parameters for [`PaymentClient::list_payments`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentQuery {
    params: Vec<(String, String)>,
}

impl PaymentQuery {
    /// Create an empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    /// Filter by payee account
    pub fn with_creator(self, creator: impl Into<String>) -> Self {
        let creator: String = creator.into();
        self.with_param("creator", creator)
    }

    /// Filter by status
    pub fn with_status(self, status: &PaymentStatus) -> Self {
        self.with_param("status", status)
    }

    /// Filter by provider
    pub fn with_service(self, service: impl Into<String>) -> Self {
        let service: String = service.into();
        self.with_param("service", service)
    }

    pub fn with_limit(self, limit: u32) -> Self {
        self.with_param("limit", limit)
    }

    pub fn with_offset(self, offset: u32) -> Self {
        self.with_param("offset", offset)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_at(base_path: &str) -> PaymentClient {
        let config = ClientConfig::new("https://example.com").with_base_path(base_path);
        PaymentClient::new(config).unwrap()
    }

    #[test]
    fn test_client_paths() {
        let client = client_at("/payment");
        assert_eq!(client.base_path(), "/payment");
        assert_eq!(client.credentials_path(), "/payment/credentials");
        assert_eq!(client.payment_path("p1"), "/payment/p1");

        let client = client_at("/api/payment/");
        assert_eq!(client.base_path(), "/api/payment");
        assert_eq!(client.payment_path("p1"), "/api/payment/p1");

        assert_eq!(client_at("/").base_path(), "/");
    }

    #[test]
    fn test_payment_id_is_percent_encoded() {
        let client = client_at("/payment");
        assert_eq!(
            client.payment_path("order 1/2?x=y#z"),
            "/payment/order%201%2F2%3Fx%3Dy%23z"
        );
        assert_eq!(client.payment_path("a-b_c.d!e~f*g'h(i)"), "/payment/a-b_c.d!e~f*g'h(i)");
        assert_eq!(client.payment_path("café"), "/payment/caf%C3%A9");
    }

    #[test]
    fn test_payment_query() {
        let query = PaymentQuery::new()
            .with_creator("acct1")
            .with_status(&PaymentStatus::Processed)
            .with_limit(10)
            .with_param("sort", "created");

        assert_eq!(
            query.params(),
            &[
                ("creator".to_string(), "acct1".to_string()),
                ("status".to_string(), "PROCESSED".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("sort".to_string(), "created".to_string()),
            ]
        );
        assert!(PaymentQuery::new().is_empty());
    }
}
