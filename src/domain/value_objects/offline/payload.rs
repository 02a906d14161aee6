use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON snapshot of the domain object captured at enqueue time.
///
/// Always a JSON object so reference fields can be read and rewritten.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfflinePayload(Value);

impl OfflinePayload {
    pub fn new(value: Value) -> Result<Self, String> {
        Self::validate(&value)?;
        Ok(Self(value))
    }

    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| format!("Invalid JSON payload: {e}"))?;
        Self::new(value)
    }

    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set_str(&mut self, field: &str, value: &str) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(field.to_string(), Value::String(value.to_string()));
        }
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        match &mut self.0 {
            Value::Object(map) => map.remove(field),
            _ => None,
        }
    }

    /// True when the field is present and carries a usable value.
    pub fn has_value(&self, field: &str) -> bool {
        match self.0.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    /// String entries of an array field; non-string entries are skipped.
    pub fn string_list(&self, field: &str) -> Option<Vec<String>> {
        self.0.get(field).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect()
        })
    }

    pub fn set_string_list(&mut self, field: &str, values: &[String]) {
        if let Value::Object(map) = &mut self.0 {
            map.insert(
                field.to_string(),
                Value::Array(values.iter().cloned().map(Value::String).collect()),
            );
        }
    }

    /// Copies `fields` from `context` into this payload where the payload has
    /// no value of its own. Returns how many fields were filled.
    pub fn merge_missing(&mut self, context: &Value, fields: &[&str]) -> usize {
        let mut filled = 0;
        for field in fields {
            if self.has_value(field) {
                continue;
            }
            let Some(value) = context.get(*field).filter(|v| !v.is_null()) else {
                continue;
            };
            if let Value::Object(map) = &mut self.0 {
                map.insert((*field).to_string(), value.clone());
                filled += 1;
            }
        }
        filled
    }

    fn validate(value: &Value) -> Result<(), String> {
        if !value.is_object() {
            return Err("Offline payload must be a JSON object".to_string());
        }
        Ok(())
    }
}

impl From<OfflinePayload> for Value {
    fn from(payload: OfflinePayload) -> Self {
        payload.0
    }
}
