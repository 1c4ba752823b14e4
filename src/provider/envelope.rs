// ABOUTME: Normalization of provider responses that arrive in two shapes.
// ABOUTME: Either directly shaped JSON or wrapped as {success, data, message, error}.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::{Error, Result};
use super::types::{Image, Product, Resource, ResourceState, Snapshot};

/// A response body after shape detection.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Body {
    Envelope {
        success: bool,
        data: Option<Value>,
        message: Option<String>,
        error: Option<String>,
    },
    Direct(Value),
}

impl Body {
    /// Detect the response shape. An object carrying a boolean `success`
    /// field is treated as an envelope; anything else is direct.
    pub(crate) fn classify(value: Value) -> Body {
        let is_envelope = value
            .as_object()
            .and_then(|obj| obj.get("success"))
            .is_some_and(Value::is_boolean);
        if !is_envelope {
            return Body::Direct(value);
        }

        let Value::Object(mut obj) = value else {
            return Body::Direct(Value::Null);
        };
        let success = obj
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let data = obj.remove("data").filter(|v| !v.is_null());
        let message = obj.get("message").and_then(text);
        let error = obj.get("error").and_then(text);
        Body::Envelope {
            success,
            data,
            message,
            error,
        }
    }

    /// The useful payload, or `Rejected` when an envelope reports failure.
    pub(crate) fn into_payload(self) -> Result<Value> {
        match self {
            Body::Direct(value) => Ok(value),
            Body::Envelope {
                success: true,
                data,
                ..
            } => Ok(data.unwrap_or(Value::Null)),
            Body::Envelope {
                success: false,
                message,
                error,
                ..
            } => Err(Error::Rejected(failure_text(message, error))),
        }
    }
}

fn failure_text(message: Option<String>, error: Option<String>) -> String {
    match (message, error) {
        (Some(m), Some(e)) if m != e => format!("{m}: {e}"),
        (Some(m), _) => m,
        (None, Some(e)) => e,
        (None, None) => "request was not successful".to_string(),
    }
}

/// Message text from an error response body, if the body is parseable.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let obj = value.as_object()?;
    let message = obj.get("message").and_then(text);
    let error = obj.get("error").and_then(|e| {
        text(e).or_else(|| e.get("message").and_then(text))
    });
    match (message, error) {
        (None, None) => None,
        (m, e) => Some(failure_text(m, e)),
    }
}

/// Account balance. A top-level `balance` field wins, then the envelope's
/// `data.balance` (or a bare numeric `data`), then zero.
pub(crate) fn parse_balance(value: Value) -> Result<f64> {
    if let Some(balance) = value.get("balance").and_then(number) {
        return Ok(balance);
    }
    let payload = Body::classify(value).into_payload()?;
    Ok(payload
        .get("balance")
        .and_then(number)
        .or_else(|| number(&payload))
        .unwrap_or(0.0))
}

/// Offerable products, from an array or from a map keyed by product id.
pub(crate) fn parse_products(value: Value) -> Result<Vec<Product>> {
    let payload = Body::classify(value).into_payload()?;
    Ok(collection(&payload, "products")
        .into_iter()
        .filter_map(|(key, item)| {
            let id = item.get("id").and_then(text).or(key)?;
            Some(Product {
                name: item
                    .get("name")
                    .or_else(|| item.get("title"))
                    .and_then(text)
                    .unwrap_or_else(|| id.clone()),
                price: item.get("price").and_then(number),
                description: item.get("description").and_then(text),
                id,
            })
        })
        .collect())
}

/// Bootable images. Entries may be bare id strings or objects.
pub(crate) fn parse_images(value: Value) -> Result<Vec<Image>> {
    let payload = Body::classify(value).into_payload()?;
    Ok(collection(&payload, "images")
        .into_iter()
        .filter_map(|(key, item)| match item {
            Value::String(id) => Some(Image {
                id: id.clone(),
                name: None,
            }),
            _ => Some(Image {
                id: item.get("id").and_then(text).or(key)?,
                name: item.get("name").and_then(text),
            }),
        })
        .collect())
}

/// Lifecycle state from `{status}` / `{state}`, direct or wrapped.
pub(crate) fn parse_status(value: Value) -> Result<ResourceState> {
    if let Some(state) = state_field(&value) {
        return Ok(state);
    }
    let payload = Body::classify(value).into_payload()?;
    state_field(&payload)
        .or_else(|| payload.as_str().map(state_from))
        .ok_or_else(|| Error::Decode("response carries no status".to_string()))
}

/// What the provider said in reply to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OrderAck {
    /// The reply identified the new resource.
    Detailed(Resource),
    /// The provider accepted the order but did not say what it created.
    Acknowledged,
}

pub(crate) fn parse_order(value: Value) -> Result<OrderAck> {
    let payload = match Body::classify(value).into_payload() {
        Ok(payload) => payload,
        Err(Error::Rejected(reason)) => return Err(Error::OrderFailed(reason)),
        Err(e) => return Err(e),
    };
    let candidate = payload.get("server").unwrap_or(&payload);
    if let Some(resource) = resource_from(None, candidate) {
        return Ok(OrderAck::Detailed(resource));
    }
    // A direct body naming an error but no server is a refusal.
    match direct_error(&payload) {
        Some(reason) => Err(Error::OrderFailed(reason)),
        None => Ok(OrderAck::Acknowledged),
    }
}

fn direct_error(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .and_then(|e| text(e).or_else(|| e.get("message").and_then(text)))
        .filter(|e| !e.trim().is_empty())
}

pub(crate) fn parse_resources(value: Value) -> Result<Vec<Resource>> {
    let payload = Body::classify(value).into_payload()?;
    Ok(collection(&payload, "servers")
        .into_iter()
        .filter_map(|(key, item)| resource_from(key, item))
        .collect())
}

pub(crate) fn parse_resource(value: Value) -> Result<Option<Resource>> {
    let payload = Body::classify(value).into_payload()?;
    let candidate = payload.get("server").unwrap_or(&payload);
    Ok(resource_from(None, candidate))
}

/// Snapshots of `resource_id`; entries without an owner inherit it.
pub(crate) fn parse_snapshots(value: Value, resource_id: &str) -> Result<Vec<Snapshot>> {
    let payload = Body::classify(value).into_payload()?;
    Ok(collection(&payload, "snapshots")
        .into_iter()
        .filter_map(|(key, item)| snapshot_from(key, item, resource_id))
        .collect())
}

/// The snapshot described by a create reply, when the reply describes one.
pub(crate) fn parse_created_snapshot(value: Value, resource_id: &str) -> Result<Option<Snapshot>> {
    let payload = Body::classify(value).into_payload()?;
    let candidate = payload.get("snapshot").unwrap_or(&payload);
    if !candidate.is_object() {
        return Ok(None);
    }
    Ok(snapshot_from(None, candidate, resource_id))
}

fn snapshot_from(key: Option<String>, item: &Value, resource_id: &str) -> Option<Snapshot> {
    let id = item.get("id").and_then(text).or(key)?;
    let active = match item.get("active") {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64() != Some(0),
        _ => item
            .get("status")
            .and_then(Value::as_str)
            .is_none_or(|s| !s.eq_ignore_ascii_case("disabled")),
    };
    Some(Snapshot {
        name: item.get("name").and_then(text).unwrap_or_default(),
        resource_id: item
            .get("server_id")
            .or_else(|| item.get("resource_id"))
            .and_then(text)
            .unwrap_or_else(|| resource_id.to_string()),
        created_at: item.get("created_at").and_then(timestamp),
        active,
        expires_at: item
            .get("expires_at")
            .or_else(|| item.get("expiration"))
            .and_then(timestamp),
        pending: false,
        id,
    })
}

fn resource_from(key: Option<String>, item: &Value) -> Option<Resource> {
    if !item.is_object() {
        return None;
    }
    let id = item
        .get("id")
        .or_else(|| item.get("server_id"))
        .and_then(text)
        .or(key)?;
    let address = ["ip", "ip_address", "main_ip", "address"]
        .iter()
        .find_map(|k| item.get(*k).and_then(text))
        .unwrap_or_default();
    let credential = ["password", "root_password", "credential"]
        .iter()
        .find_map(|k| item.get(*k).and_then(text))
        .unwrap_or_default();
    let state = state_field(item).unwrap_or(ResourceState::Unknown(String::new()));
    Some(Resource {
        id,
        address,
        credential,
        state,
    })
}

/// Items of a list payload: a bare array, an object wrapping the list
/// under `wrapper`, or a map keyed by id. Map keys are returned so ids can be
/// synthesized from them.
fn collection<'a>(payload: &'a Value, wrapper: &str) -> Vec<(Option<String>, &'a Value)> {
    match payload {
        Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
        Value::Object(obj) => {
            if let Some(inner) = obj.get(wrapper)
                && (inner.is_array() || inner.is_object())
            {
                return collection(inner, wrapper);
            }
            obj.iter()
                .filter(|(_, v)| v.is_object())
                .map(|(k, v)| (Some(k.clone()), v))
                .collect()
        }
        _ => Vec::new(),
    }
}

fn state_field(value: &Value) -> Option<ResourceState> {
    value
        .get("status")
        .or_else(|| value.get("state"))
        .and_then(Value::as_str)
        .map(state_from)
}

fn state_from(s: &str) -> ResourceState {
    match s.parse() {
        Ok(state) => state,
        Err(never) => match never {},
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
