//! Task adaptor contract.
//!
//! Each upstream provider returns task results in its own format. The
//! ingestor only deals in bytes and hands them to a [`TaskAdaptor`] chosen by
//! the caller.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::AdaptorError;

/// Decodes a fully ingested body into a task result.
pub trait TaskAdaptor: Send + Sync {
    type Output: Send + 'static;

    fn parse_task_result(&self, body: &[u8]) -> Result<Self::Output, AdaptorError>;
}

/// Adaptor for providers whose task results are plain JSON documents.
pub struct JsonAdaptor<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonAdaptor<T> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T> Default for JsonAdaptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonAdaptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JsonAdaptor")
    }
}

impl<T> TaskAdaptor for JsonAdaptor<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn parse_task_result(&self, body: &[u8]) -> Result<T, AdaptorError> {
        serde_json::from_slice(body).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Task {
        task_id: String,
        status: String,
    }

    #[test]
    fn test_json_adaptor_decodes() {
        let adaptor = JsonAdaptor::<Task>::new();
        let task = adaptor
            .parse_task_result(br#"{"task_id":"t-1","status":"SUCCESS","extra":1}"#)
            .unwrap();
        assert_eq!(
            task,
            Task {
                task_id: "t-1".into(),
                status: "SUCCESS".into()
            }
        );
    }

    #[test]
    fn test_json_adaptor_rejects_malformed_body() {
        let adaptor = JsonAdaptor::<Task>::new();
        let err = adaptor.parse_task_result(b"{\"task_id\":").unwrap_err();
        assert!(err.is::<serde_json::Error>());
    }
}
