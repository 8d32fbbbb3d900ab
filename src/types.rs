//! Core types for the payment lifecycle: the record, its status and defaults

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::{PaymentError, Result};

/// Currency applied when none is given
pub const DEFAULT_CURRENCY: &str = "USD";

/// Provider used when a caller does not name one
pub const DEFAULT_PROVIDER: &str = "paypal";

/// Lifecycle status of a payment
///
/// Serialized as the upper-case wire string. Statuses this crate does not
/// know are kept verbatim in [`PaymentStatus::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Validated,
    Processed,
    Failed,
    Other(String),
}

impl PaymentStatus {
    /// Get the wire string for this status
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Validated => "VALIDATED",
            PaymentStatus::Processed => "PROCESSED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Other(status) => status,
        }
    }

    /// No transition leaves a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Processed | PaymentStatus::Failed)
    }

    /// Position on the forward path, `None` for FAILED and unknown statuses
    fn rank(&self) -> Option<u8> {
        match self {
            PaymentStatus::Pending => Some(0),
            PaymentStatus::Validated => Some(1),
            PaymentStatus::Processed => Some(2),
            PaymentStatus::Failed | PaymentStatus::Other(_) => None,
        }
    }

    /// Check whether the lifecycle allows moving from `self` to `next`
    ///
    /// Forward moves along PENDING -> VALIDATED -> PROCESSED are allowed,
    /// as is any non-terminal status to FAILED.
    pub fn can_transition_to(&self, next: &PaymentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *next == PaymentStatus::Failed {
            return true;
        }
        match (self.rank(), next.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PaymentStatus {
    fn from(status: String) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "PENDING" => PaymentStatus::Pending,
            "VALIDATED" => PaymentStatus::Validated,
            "PROCESSED" => PaymentStatus::Processed,
            "FAILED" => PaymentStatus::Failed,
            _ => PaymentStatus::Other(status),
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(PaymentError::validation("status cannot be empty"));
        }
        Ok(PaymentStatus::from(s.to_string()))
    }
}

/// Description of why a payment failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentFailure {
    /// Machine-readable failure code (e.g. "declined"), never empty
    pub code: String,
    /// Human-readable explanation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Any other fields the server attached
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl PaymentFailure {
    /// Create a new failure description
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: None,
            details: Map::new(),
        }
    }

    /// Set the message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach an extra detail field
    pub fn with_detail(mut self, key: impl Into<String>, value: Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}

/// A line item being purchased: either a product id or a structured object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderItem {
    Product(String),
    Detail(Map<String, Value>),
}

impl From<&str> for OrderItem {
    fn from(product_id: &str) -> Self {
        OrderItem::Product(product_id.to_string())
    }
}

impl From<String> for OrderItem {
    fn from(product_id: String) -> Self {
        OrderItem::Product(product_id)
    }
}

impl From<Map<String, Value>> for OrderItem {
    fn from(detail: Map<String, Value>) -> Self {
        OrderItem::Detail(detail)
    }
}

/// Defaults applied to optional fields when a record is constructed
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDefaults {
    /// ISO 4217 currency, `"USD"`
    pub currency: String,
    /// Initial status, `PENDING`
    pub status: PaymentStatus,
    /// Initial validation flag, `false`
    pub validated: bool,
    /// Initial failure description, none
    pub error: Option<PaymentFailure>,
}

impl Default for PaymentDefaults {
    fn default() -> Self {
        Self {
            currency: DEFAULT_CURRENCY.to_string(),
            status: PaymentStatus::Pending,
            validated: false,
            error: None,
        }
    }
}

/// Raw, possibly incomplete, input for [`PaymentRecord::construct`]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFields {
    pub id: Option<String>,
    #[serde(default, deserialize_with = "amount_text")]
    pub amount: Option<String>,
    pub currency: Option<String>,
    pub creator: Option<String>,
    pub service: Option<String>,
    pub service_id: Option<String>,
    pub orders: Option<Vec<OrderItem>>,
    pub status: Option<PaymentStatus>,
    pub validated: Option<bool>,
    pub created: Option<DateTime<Utc>>,
    pub error: Option<PaymentFailure>,
}

/// Accept the amount as either a JSON string or a JSON number
fn amount_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(amount)) => Ok(Some(amount)),
        Some(Value::Number(amount)) => Ok(Some(amount.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "amount must be a decimal string, got {}",
            other
        ))),
    }
}

impl PaymentFields {
    /// Create fields holding every required value
    pub fn new<I, O>(
        id: impl Into<String>,
        amount: impl Into<String>,
        creator: impl Into<String>,
        service: impl Into<String>,
        orders: I,
    ) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderItem>,
    {
        Self {
            id: Some(id.into()),
            amount: Some(amount.into()),
            creator: Some(creator.into()),
            service: Some(service.into()),
            orders: Some(orders.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_amount(mut self, amount: impl Into<String>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = Some(creator.into());
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_service_id(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    pub fn with_orders<I, O>(mut self, orders: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderItem>,
    {
        self.orders = Some(orders.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_validated(mut self, validated: bool) -> Self {
        self.validated = Some(validated);
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn with_error(mut self, error: PaymentFailure) -> Self {
        self.error = Some(error);
        self
    }

    /// Names of the required fields that are absent
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.is_none() {
            missing.push("id");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if self.creator.is_none() {
            missing.push("creator");
        }
        if self.service.is_none() {
            missing.push("service");
        }
        if self.orders.is_none() {
            missing.push("orders");
        }
        missing
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Canonical shape of a payment, shared by both ends of the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Unique payment identifier
    pub id: String,
    /// Amount as an exact decimal, serialized as a string
    pub amount: Decimal,
    /// ISO 4217 currency code
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Payee account identifier
    pub creator: String,
    /// Payment provider name (e.g. "paypal")
    pub service: String,
    /// Provider transaction identifier, set on settlement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    /// Items being purchased
    pub orders: Vec<OrderItem>,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub validated: bool,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<PaymentFailure>,
}

impl PaymentRecord {
    /// Build a record from raw fields with the standard defaults
    pub fn construct(fields: PaymentFields) -> Result<Self> {
        Self::construct_with(fields, &PaymentDefaults::default())
    }

    /// Build a record from raw fields with explicit defaults
    pub fn construct_with(fields: PaymentFields, defaults: &PaymentDefaults) -> Result<Self> {
        let missing = fields.missing_required();
        if !missing.is_empty() {
            return Err(PaymentError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let PaymentFields {
            id,
            amount,
            currency,
            creator,
            service,
            service_id,
            orders,
            status,
            validated,
            created,
            error,
        } = fields;

        let amount = amount.unwrap_or_default();
        let amount = Decimal::from_str(amount.trim()).map_err(|_| {
            PaymentError::validation(format!("amount '{}' is not a decimal number", amount))
        })?;

        let record = Self {
            id: id.unwrap_or_default(),
            amount,
            currency: currency.unwrap_or_else(|| defaults.currency.clone()),
            creator: creator.unwrap_or_default(),
            service: service.unwrap_or_default(),
            service_id,
            orders: orders.unwrap_or_default(),
            status: status.unwrap_or_else(|| defaults.status.clone()),
            validated: validated.unwrap_or(defaults.validated),
            created: created.unwrap_or_else(Utc::now),
            error: error.or_else(|| defaults.error.clone()),
        };
        record.validate()?;
        Ok(record)
    }

    /// Normalize a JSON object (e.g. a server response) into a record
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(PaymentError::validation(format!(
                "payment must be a JSON object, got {}",
                value
            )));
        }
        let fields: PaymentFields = serde_json::from_value(value)
            .map_err(|e| PaymentError::validation(format!("invalid payment record: {}", e)))?;
        Self::construct(fields)
    }

    /// Generate a fresh identifier for client-assigned ids
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Check every record invariant
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("id", &self.id),
            ("creator", &self.creator),
            ("service", &self.service),
        ] {
            if value.trim().is_empty() {
                return Err(PaymentError::validation(format!("{} cannot be empty", name)));
            }
        }

        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(PaymentError::validation(format!(
                "amount cannot be negative: {}",
                self.amount
            )));
        }

        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(PaymentError::validation(format!(
                "currency '{}' is not an ISO 4217 code",
                self.currency
            )));
        }

        match (&self.status, &self.service_id) {
            (PaymentStatus::Pending, Some(service_id)) => {
                return Err(PaymentError::validation(format!(
                    "serviceId '{}' set on a PENDING payment",
                    service_id
                )));
            }
            (PaymentStatus::Processed, None) => {
                return Err(PaymentError::validation(
                    "PROCESSED payment has no serviceId",
                ));
            }
            _ => {}
        }

        if self.validated && self.status == PaymentStatus::Pending {
            return Err(PaymentError::validation(
                "validated payment cannot be PENDING",
            ));
        }

        match (&self.status, &self.error) {
            (PaymentStatus::Failed, None) => Err(PaymentError::validation(
                "FAILED payment has no error description",
            )),
            (PaymentStatus::Failed, Some(error)) if error.code.trim().is_empty() => Err(
                PaymentError::validation("FAILED payment has an empty error code"),
            ),
            (status, Some(error)) if *status != PaymentStatus::Failed => {
                Err(PaymentError::validation(format!(
                    "{} payment carries error '{}'",
                    status, error.code
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the payment settled successfully
    pub fn is_settled(&self) -> bool {
        self.status == PaymentStatus::Processed
    }

    /// Move to `next` and apply `update`, keeping the record untouched on failure
    fn apply<F>(&mut self, next: PaymentStatus, update: F) -> Result<()>
    where
        F: FnOnce(&mut Self),
    {
        if !self.status.can_transition_to(&next) {
            return Err(PaymentError::invalid_transition(&self.status, &next));
        }
        let mut candidate = self.clone();
        candidate.status = next;
        update(&mut candidate);
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Change status, rejecting moves the lifecycle forbids
    pub fn transition_to(&mut self, next: PaymentStatus) -> Result<()> {
        self.apply(next, |_| {})
    }

    /// Record successful server-side validation
    pub fn mark_validated(&mut self) -> Result<()> {
        self.apply(PaymentStatus::Validated, |record| record.validated = true)
    }

    /// Record settlement with the provider's transaction id
    pub fn mark_processed(&mut self, service_id: impl Into<String>) -> Result<()> {
        let service_id = service_id.into();
        self.apply(PaymentStatus::Processed, |record| {
            record.service_id = Some(service_id)
        })
    }

    /// Record a terminal failure
    pub fn mark_failed(&mut self, error: PaymentFailure) -> Result<()> {
        self.apply(PaymentStatus::Failed, |record| record.error = Some(error))
    }
}

/// One entry of a payment listing, kept exactly as the server sent it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListedPayment(Value);

impl ListedPayment {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn status(&self) -> Option<PaymentStatus> {
        self.0
            .get("status")
            .and_then(Value::as_str)
            .map(|status| PaymentStatus::from(status.to_string()))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Normalize into a record, applying defaults and checking invariants
    pub fn to_record(&self) -> Result<PaymentRecord> {
        PaymentRecord::from_value(self.0.clone())
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Provider bootstrap metadata for the client-side widget (tokens, merchant id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderCredentials(Value);

impl ProviderCredentials {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Look up a top-level field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// The provider's post-authorization object, produced by its widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderOrder(Value);

impl ProviderOrder {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Provider transaction id, if the order carries one
    pub fn transaction_id(&self) -> Option<&str> {
        ["transactionId", "orderID", "id"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_str))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for ProviderOrder {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
