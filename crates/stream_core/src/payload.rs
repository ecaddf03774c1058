//! Payloads carried in the `data` field of each event kind.
//!
//! The backend's payload shape is not fixed, so nothing here can reject a
//! frame. Every payload keeps the full `data` value in `raw`; the typed fields
//! are best-effort reads of commonly rendered keys and are `None` when a key
//! is absent or holds something unusable.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub id: Option<Value>,
    pub symbol: Option<String>,
    pub action: Option<String>,
    pub confidence: Option<f64>,
    /// ISO string or epoch number, as sent.
    pub timestamp: Option<Value>,
    pub raw: Value,
}

impl From<Value> for Signal {
    fn from(data: Value) -> Self {
        Self {
            id: field(&data, &["id"]).cloned(),
            symbol: text(&data, &["symbol"]),
            action: text(&data, &["action", "signal_type"]),
            confidence: number(&data, &["confidence"]),
            timestamp: field(&data, &["timestamp"]).cloned(),
            raw: data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: Option<Value>,
    pub symbol: Option<String>,
    pub side: Option<String>,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub timestamp: Option<Value>,
    pub raw: Value,
}

impl From<Value> for Trade {
    fn from(data: Value) -> Self {
        Self {
            id: field(&data, &["id"]).cloned(),
            symbol: text(&data, &["symbol"]),
            side: text(&data, &["side", "action"]),
            quantity: number(&data, &["quantity"]),
            price: number(&data, &["price"]),
            timestamp: field(&data, &["timestamp"]).cloned(),
            raw: data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub portfolio_id: Option<Value>,
    pub total_value: Option<f64>,
    pub cash: Option<f64>,
    /// List or symbol-keyed map, as sent.
    pub positions: Option<Value>,
    pub timestamp: Option<Value>,
    pub raw: Value,
}

impl PortfolioSnapshot {
    pub fn position_count(&self) -> usize {
        match &self.positions {
            Some(Value::Array(items)) => items.len(),
            Some(Value::Object(entries)) => entries.len(),
            _ => 0,
        }
    }
}

impl From<Value> for PortfolioSnapshot {
    fn from(data: Value) -> Self {
        Self {
            portfolio_id: field(&data, &["portfolio_id"]).cloned(),
            total_value: number(&data, &["total_value"]),
            cash: number(&data, &["cash"]),
            positions: field(&data, &["positions"]).cloned(),
            timestamp: field(&data, &["timestamp"]).cloned(),
            raw: data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentActivity {
    pub agent: Option<String>,
    pub message: Option<String>,
    /// Raw analysis stage label, when the activity belongs to an analysis run.
    pub stage: Option<String>,
    pub timestamp: Option<Value>,
    pub raw: Value,
}

impl From<Value> for AgentActivity {
    fn from(data: Value) -> Self {
        Self {
            agent: text(&data, &["agent", "agent_name"]),
            message: text(&data, &["message"]),
            stage: text(&data, &["stage"]),
            timestamp: field(&data, &["timestamp"]).cloned(),
            raw: data,
        }
    }
}

/// First non-null value among `keys`. Non-object payloads have no fields.
fn field<'a>(data: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| data.get(*key))
        .find(|value| !value.is_null())
}

fn text(data: &Value, keys: &[&str]) -> Option<String> {
    match field(data, keys)? {
        Value::String(value) => Some(value.clone()),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(value.to_string()),
        _ => None,
    }
}

// Accepts JSON numbers and numeric strings such as "0.82".
fn number(data: &Value, keys: &[&str]) -> Option<f64> {
    match field(data, keys)? {
        Value::Number(value) => value.as_f64(),
        Value::String(value) => value.trim().parse().ok(),
        _ => None,
    }
}
