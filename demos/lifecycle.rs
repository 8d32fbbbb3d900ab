//! Walks one payment through the three lifecycle phases
//!
//! Point it at a payment server with `PAYMENT_API_URL` (and optionally
//! `PAYMENT_BASE_PATH`), then pass the provider transaction id obtained from
//! the provider's widget:
//!
//! ```text
//! PAYMENT_API_URL=http://localhost:8080 cargo run --example lifecycle -- PAY-123
//! ```

use payment_lifecycle::{
    PaymentClient, PaymentFields, PaymentQuery, PaymentRecord, PaymentStatus, ProviderOrder,
};
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let transaction_id = std::env::args()
        .nth(1)
        .ok_or("usage: lifecycle <provider-transaction-id>")?;

    let client = PaymentClient::from_env()?;

    println!("Fetching provider credentials...");
    let credentials = client.get_provider_credentials(None).await?;
    println!("  {}", credentials.as_value());

    let payment = PaymentRecord::construct(PaymentFields::new(
        PaymentRecord::generate_id(),
        "10.00",
        "acct1",
        "paypal",
        ["sku1"],
    ))?;

    println!("Creating payment {}...", payment.id);
    let created = client.create_payment(&payment).await?;
    println!("  status: {}", created.status);

    // The provider's widget produces this object once the user approves
    let order = ProviderOrder::new(json!({ "transactionId": transaction_id }));

    println!("Processing payment {}...", created.id);
    let processed = client.process_payment(&order, &created).await?;
    match processed.status {
        PaymentStatus::Processed => println!(
            "  settled, provider transaction {}",
            processed.service_id.as_deref().unwrap_or_default()
        ),
        PaymentStatus::Failed => {
            let code = processed.error.as_ref().map(|e| e.code.as_str());
            println!("  failed: {}", code.unwrap_or("unknown"));
        }
        ref other => println!("  status: {}", other),
    }

    let recent = client
        .list_payments(&PaymentQuery::new().with_creator("acct1").with_limit(5))
        .await?;
    println!("{} recent payments for acct1", recent.len());

    Ok(())
}
