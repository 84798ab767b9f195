//! Merchant transaction references.
//!
//! A reference has the shape `<prefix><orderId>-<attempt>`: a single prefix
//! character, the order identifier, and an attempt suffix so one order can be
//! paid more than once. The order identifier therefore cannot contain `-`.

use thiserror::Error;

pub const REFERENCE_PREFIX: char = 'O';
pub const ATTEMPT_SEPARATOR: char = '-';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("transaction reference is empty")]
    Empty,
    #[error("transaction reference has no order identifier")]
    MissingOrderId,
    #[error("order identifier must not contain '-'")]
    SeparatorInOrderId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReference {
    raw: String,
    order_id: String,
    attempt: Option<String>,
}

impl TransactionReference {
    /// Decompose a reference: drop one leading character, split on `-`, keep the first segment.
    pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
        let mut chars = raw.chars();
        if chars.next().is_none() {
            return Err(ReferenceError::Empty);
        }
        let rest = chars.as_str();
        let (order_id, attempt) = match rest.split_once(ATTEMPT_SEPARATOR) {
            Some((order_id, attempt)) => (order_id, Some(attempt.to_string())),
            None => (rest, None),
        };
        if order_id.is_empty() {
            return Err(ReferenceError::MissingOrderId);
        }
        Ok(Self {
            raw: raw.to_string(),
            order_id: order_id.to_string(),
            attempt,
        })
    }

    /// Build the reference checkout hands to the gateway for a payment attempt.
    pub fn for_attempt(order_id: &str, attempt: &str) -> Result<Self, ReferenceError> {
        if order_id.is_empty() {
            return Err(ReferenceError::MissingOrderId);
        }
        if order_id.contains(ATTEMPT_SEPARATOR) {
            return Err(ReferenceError::SeparatorInOrderId);
        }
        Ok(Self {
            raw: format!("{REFERENCE_PREFIX}{order_id}{ATTEMPT_SEPARATOR}{attempt}"),
            order_id: order_id.to_string(),
            attempt: Some(attempt.to_string()),
        })
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn attempt(&self) -> Option<&str> {
        self.attempt.as_deref()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
