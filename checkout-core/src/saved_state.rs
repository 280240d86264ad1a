//! Persisted state container.
//!
//! [`SavedState`] is a small key-value store the host serializes when the
//! process may be killed and restores on recreation. Handlers keep the
//! payment-data token here through [`PaymentDataRepository`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::Result;

#[derive(Clone, Default)]
pub struct SavedState {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl std::fmt::Debug for SavedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("SavedState")
            .field("keys", &values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SavedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Store `value` under `key`; `None` removes the entry.
    pub fn set<T: Serialize>(&self, key: &str, value: Option<T>) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        match value {
            Some(v) => {
                values.insert(key.to_owned(), serde_json::to_value(v)?);
            }
            None => {
                values.remove(key);
            }
        }
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    /// Snapshot for persistence.
    pub fn to_json(&self) -> Result<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        Ok(serde_json::to_string(&*values)?)
    }

    /// Restore from a snapshot produced by [`to_json`](Self::to_json).
    pub fn from_json(json: &str) -> Result<Self> {
        let values: HashMap<String, Value> = serde_json::from_str(json)?;
        Ok(Self {
            values: Arc::new(RwLock::new(values)),
        })
    }
}

/// Single-writer holder of the current payment-data token.
#[derive(Clone, Debug)]
pub struct PaymentDataRepository {
    state: SavedState,
}

impl PaymentDataRepository {
    const PAYMENT_DATA_KEY: &'static str = "payment_data";

    pub fn new(state: SavedState) -> Self {
        Self { state }
    }

    pub fn payment_data(&self) -> Option<String> {
        self.state.get(Self::PAYMENT_DATA_KEY)
    }

    pub fn set_payment_data(&self, payment_data: Option<&str>) {
        // Strings always serialize.
        let _ = self.state.set(Self::PAYMENT_DATA_KEY, payment_data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_data_survives_snapshot() {
        let state = SavedState::new();
        let repository = PaymentDataRepository::new(state.clone());
        repository.set_payment_data(Some("Ab02b4c0"));

        let restored = SavedState::from_json(&state.to_json().unwrap()).unwrap();
        let repository = PaymentDataRepository::new(restored);
        assert_eq!(repository.payment_data().as_deref(), Some("Ab02b4c0"));
    }

    #[test]
    fn test_clearing_payment_data() {
        let repository = PaymentDataRepository::new(SavedState::new());
        repository.set_payment_data(Some("token"));
        repository.set_payment_data(None);

        assert_eq!(repository.payment_data(), None);
    }
}
