//! HTTP builtins. Both need `NetworkConnect`.

use crate::error::{Result, RuntimeError};
use crate::interpreter::Interpreter;
use crate::value::Value;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn client(op: &'static str) -> std::result::Result<Client, RuntimeError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| RuntimeError::io(op, e))
}

/// Body of a successful response. Non-2xx statuses are errors.
fn body(op: &'static str, response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().map_err(|e| RuntimeError::io(op, e))?;
    if !status.is_success() {
        return Err(RuntimeError::io(op, format!("HTTP status {status}")).into());
    }
    Ok(Value::String(text))
}

pub fn http_get(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let url = args[0].as_str()?;
    tracing::debug!(url, "HTTP GET");
    let response = client("HTTP_GET")?
        .get(url)
        .send()
        .map_err(|e| RuntimeError::io("HTTP_GET", e))?;
    body("HTTP_GET", response)
}

/// `HTTP_POST(url, body)` or `HTTP_POST(url, body, content_type)`.
///
/// Arrays and dictionaries are sent as JSON; everything else as text.
pub fn http_post(_: &mut Interpreter<'_>, args: Vec<Value>) -> Result<Value> {
    let url = args[0].as_str()?;
    let (payload, default_type) = match &args[1] {
        v @ (Value::Array(_) | Value::Dict(_)) => (v.to_json()?.to_string(), "application/json"),
        v => (v.to_string(), "text/plain; charset=utf-8"),
    };
    let content_type = match args.get(2) {
        Some(ct) => ct.as_str()?,
        None => default_type,
    };

    tracing::debug!(url, content_type, "HTTP POST");
    let response = client("HTTP_POST")?
        .post(url)
        .header(CONTENT_TYPE, content_type)
        .body(payload)
        .send()
        .map_err(|e| RuntimeError::io("HTTP_POST", e))?;
    body("HTTP_POST", response)
}
