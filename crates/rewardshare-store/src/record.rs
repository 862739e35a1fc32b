use crate::backend::{Record, Result, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Serialize a model into a stored record.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Serialization(format!(
            "expected an object record, got {}",
            type_name(&other)
        ))),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

/// Deserialize a stored record into a model.
pub fn from_record<T: DeserializeOwned>(record: Record) -> Result<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Probe {
        name: String,
        count: u32,
    }

    #[test]
    fn round_trips_models() {
        let probe = Probe {
            name: "slots".into(),
            count: 7,
        };
        let record = to_record(&probe).unwrap();
        assert_eq!(record.get("count").unwrap(), 7);
        let back: Probe = from_record(record).unwrap();
        assert_eq!(back, probe);
    }

    #[test]
    fn rejects_non_object_roots() {
        let err = to_record(&42u32).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
