use serde::Deserialize;
use serde_json::Value;

use super::GatewayError;
use crate::store::Pagination;

/// One page of a list endpoint as reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub records: Vec<T>,
    pub pagination: Pagination,
}

impl ListPage<Value> {
    /// Decode `{ <collection_key>: [...], pagination: {...} }`.
    pub fn from_body(mut body: Value, collection_key: &str) -> Result<Self, GatewayError> {
        let Some(obj) = body.as_object_mut() else {
            return Err(GatewayError::Decode("list response is not an object".into()));
        };
        let records = match obj.remove(collection_key) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => {
                return Err(GatewayError::Decode(format!(
                    "list response is missing '{}'",
                    collection_key
                )))
            }
            Some(_) => {
                return Err(GatewayError::Decode(format!(
                    "'{}' is not an array",
                    collection_key
                )))
            }
        };
        let pagination = obj
            .remove("pagination")
            .ok_or_else(|| GatewayError::Decode("list response is missing 'pagination'".into()))?;
        let pagination: Pagination = serde_json::from_value(pagination)
            .map_err(|e| GatewayError::Decode(format!("invalid pagination: {}", e)))?;
        Ok(Self { records, pagination })
    }

    /// Decode every record into `T`.
    pub fn decode<T: serde::de::DeserializeOwned>(self) -> Result<ListPage<T>, GatewayError> {
        let records = self
            .records
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| GatewayError::Decode(format!("invalid record: {}", e)))?;
        Ok(ListPage {
            records,
            pagination: self.pagination,
        })
    }
}

/// Error body shape used by the backend.
#[derive(Deserialize, Debug)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Human readable message from an error response body, if it carries one.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}
