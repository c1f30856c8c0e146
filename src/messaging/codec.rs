use crate::models::Customer;

use super::errors::CodecError;

/// Serialize a customer into the payload carried on the log.
pub fn encode(customer: &Customer) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(customer).map_err(CodecError::Encoding)
}

/// Rebuild a customer from a log payload.
pub fn decode(payload: &[u8]) -> Result<Customer, CodecError> {
    serde_json::from_slice(payload).map_err(CodecError::Decoding)
}
