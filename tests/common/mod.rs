#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use payment_lifecycle::{
    ClientConfig, HttpTransport, PaymentClient, PaymentError, PaymentFields, PaymentRecord, Result,
};
use serde_json::{json, Value};

/// One request seen by the fake transport
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

type Responder = Box<dyn Fn(&RecordedCall) -> Result<Value> + Send + Sync>;

/// In-memory transport that records requests and answers from a closure
pub struct FakeTransport {
    calls: Mutex<Vec<RecordedCall>>,
    responder: Responder,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&RecordedCall) -> Result<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: RecordedCall) -> Result<Value> {
        let result = (self.responder)(&call);
        self.calls.lock().unwrap().push(call);
        result
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        self.answer(RecordedCall {
            method: "GET",
            path: path.to_string(),
            query: query.to_vec(),
            body: None,
        })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.answer(RecordedCall {
            method: "POST",
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        })
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.answer(RecordedCall {
            method: "PUT",
            path: path.to_string(),
            query: Vec::new(),
            body: Some(body.clone()),
        })
    }
}

/// Build a client at the default base path over the given fake
pub fn client_over(transport: &Arc<FakeTransport>) -> PaymentClient {
    PaymentClient::with_transport(&ClientConfig::default(), transport.clone())
}

/// Answers like a payment server: creates PENDING records and settles them,
/// declining any provider transaction whose id starts with "DECLINED"
pub fn settlement_server(call: &RecordedCall) -> Result<Value> {
    match (call.method, call.path.as_str()) {
        ("GET", "/payment/credentials") => Ok(json!({
            "service": call.query[0].1,
            "clientId": "sandbox-client-id",
            "merchantId": "MERCHANT-1"
        })),
        ("GET", "/payment") => Ok(json!([
            test_payment_json("p1", "PENDING"),
            test_payment_json("p2", "PROCESSED"),
        ])),
        ("POST", "/payment") => {
            let mut payment = call.body.as_ref().unwrap()["payment"].clone();
            payment["status"] = json!("PENDING");
            payment["serviceId"] = Value::Null;
            Ok(payment)
        }
        ("PUT", path) if path.starts_with("/payment/") => {
            let body = call.body.as_ref().unwrap();
            let transaction_id = body["order"]["transactionId"].as_str().unwrap_or_default();
            let mut payment = body["payment"].clone();
            if transaction_id.starts_with("DECLINED") {
                payment["status"] = json!("FAILED");
                payment["error"] = json!({
                    "code": "declined",
                    "message": "The instrument was declined by the provider"
                });
            } else {
                payment["status"] = json!("PROCESSED");
                payment["validated"] = json!(true);
                payment["serviceId"] = json!(transaction_id);
            }
            Ok(payment)
        }
        _ => Err(PaymentError::from_status(404, json!({"message": "not found"}))),
    }
}

pub fn test_payment_json(id: &str, status: &str) -> Value {
    let mut payment = json!({
        "id": id,
        "amount": "10.00",
        "currency": "USD",
        "creator": "acct1",
        "service": "paypal",
        "orders": ["sku1"],
        "status": status,
        "validated": status != "PENDING",
        "created": "2024-01-01T00:00:00Z",
        "error": null
    });
    if status == "PROCESSED" {
        payment["serviceId"] = json!("PAY-123");
    }
    payment
}

pub fn test_payment(id: &str) -> PaymentRecord {
    PaymentRecord::construct(PaymentFields::new(id, "10.00", "acct1", "paypal", ["sku1"])).unwrap()
}
