//! Body encodings accepted on the invoker endpoint.
//!
//! JSON is the default; MsgPack is selected by `content-type:
//! application/msgpack`. Structs are encoded with field names in both cases so
//! the two forms carry the same shape.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Content type announcing a MsgPack body.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";
/// Content type announcing a JSON body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Supported body encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MsgPack,
}

/// Encoding or decoding failure.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid MsgPack body: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
    #[error("cannot encode MsgPack body: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),
}

impl Encoding {
    /// Picks the encoding for a request's `content-type` header value.
    /// Anything other than MsgPack is treated as JSON.
    #[must_use]
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.trim().starts_with(MSGPACK_CONTENT_TYPE) => Self::MsgPack,
            _ => Self::Json,
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => JSON_CONTENT_TYPE,
            Self::MsgPack => MSGPACK_CONTENT_TYPE,
        }
    }

    /// # Errors
    ///
    /// Returns a [`CodecError`] if `value` cannot be represented.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Json => Ok(serde_json::to_vec(value)?),
            Self::MsgPack => Ok(rmp_serde::to_vec_named(value)?),
        }
    }

    /// # Errors
    ///
    /// Returns a [`CodecError`] if `bytes` is not a valid encoding of `T`.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(bytes)?),
            Self::MsgPack => Ok(rmp_serde::from_slice(bytes)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceQuery;

    #[test]
    fn content_type_selection() {
        assert_eq!(Encoding::from_content_type(None), Encoding::Json);
        assert_eq!(
            Encoding::from_content_type(Some("application/json; charset=utf-8")),
            Encoding::Json
        );
        assert_eq!(
            Encoding::from_content_type(Some("application/msgpack")),
            Encoding::MsgPack
        );
    }

    #[test]
    fn msgpack_query_decodes_to_same_value() {
        let query = ServiceQuery::new("orders", "OrderService").with_qualifier("eu");
        let bytes = Encoding::MsgPack.encode(&query).unwrap();
        let decoded: ServiceQuery = Encoding::MsgPack.decode(&bytes).unwrap();
        assert_eq!(decoded, query);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = Encoding::Json.decode::<ServiceQuery>(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
        let err = Encoding::MsgPack.decode::<ServiceQuery>(&[0xc1]).unwrap_err();
        assert!(matches!(err, CodecError::MsgPackDecode(_)));
    }
}
