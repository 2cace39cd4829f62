//! Cross-component key/value store.
//!
//! Holds data that does not fit the port model: values computed once and
//! read by several components (building envelope coefficients, set
//! temperatures) and per-instance values grouped by component type and
//! source weight (per-vehicle battery state).

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use hs_core::{ComponentType, SourceWeight};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::key::{RegistryKey, RegistryValue};

/// Singleton entries plus dynamic entries grouped by
/// `(component type, source weight)`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SharedRegistry {
    entries: HashMap<RegistryKey, RegistryValue>,
    dynamic: BTreeMap<ComponentType, BTreeMap<SourceWeight, RegistryValue>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry. The first caller constructs it; concurrent
    /// first calls block until that construction finishes and then share
    /// the same instance.
    pub fn global() -> SharedRegistryHandle {
        static GLOBAL: OnceLock<SharedRegistryHandle> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                debug!("constructing process-wide shared registry");
                SharedRegistryHandle::new()
            })
            .clone()
    }

    pub fn set_entry(&mut self, key: RegistryKey, value: impl Into<RegistryValue>) {
        self.entries.insert(key, value.into());
    }

    pub fn get_entry(&self, key: RegistryKey) -> RegistryResult<&RegistryValue> {
        self.entries
            .get(&key)
            .ok_or(RegistryError::KeyNotFound { key })
    }

    /// Typed read of a scalar entry.
    pub fn get_scalar(&self, key: RegistryKey) -> RegistryResult<f64> {
        let value = self.get_entry(key)?;
        value.as_scalar().ok_or(RegistryError::WrongValueKind {
            key,
            expected: "scalar",
            found: value.kind(),
        })
    }

    pub fn exist_entry(&self, key: RegistryKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn delete_entry(&mut self, key: RegistryKey) -> RegistryResult<RegistryValue> {
        self.entries
            .remove(&key)
            .ok_or(RegistryError::KeyNotFound { key })
    }

    pub fn set_dynamic_entry(
        &mut self,
        component_type: ComponentType,
        weight: SourceWeight,
        value: impl Into<RegistryValue>,
    ) {
        self.dynamic
            .entry(component_type)
            .or_default()
            .insert(weight, value.into());
    }

    /// Missing groups and missing weights both read as `None`.
    pub fn get_dynamic_entry(
        &self,
        component_type: ComponentType,
        weight: SourceWeight,
    ) -> Option<&RegistryValue> {
        self.dynamic.get(&component_type)?.get(&weight)
    }

    /// Weights registered for a component type, ascending.
    pub fn get_dynamic_component_weights(&self, component_type: ComponentType) -> Vec<SourceWeight> {
        self.dynamic
            .get(&component_type)
            .map(|group| group.keys().copied().collect())
            .unwrap_or_default()
    }

    pub fn delete_dynamic_entry(
        &mut self,
        component_type: ComponentType,
        weight: SourceWeight,
    ) -> RegistryResult<RegistryValue> {
        let group = self.dynamic.get_mut(&component_type);
        let removed = group.and_then(|g| g.remove(&weight));
        removed.ok_or(RegistryError::DynamicEntryNotFound {
            component_type,
            weight,
        })
    }

    /// Drop every entry. Called at run teardown.
    pub fn clear(&mut self) {
        self.entries = HashMap::new();
        self.dynamic = BTreeMap::new();
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.dynamic.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared, lockable handle to a registry.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistryHandle(Arc<Mutex<SharedRegistry>>);

impl SharedRegistryHandle {
    /// A private registry, independent of [`SharedRegistry::global`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the registry. A panic in another holder does not leave the
    /// maps half-written, so a poisoned lock is recovered.
    pub fn lock(&self) -> MutexGuard<'_, SharedRegistry> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_fails() {
        let reg = SharedRegistry::new();
        let err = reg
            .get_entry(RegistryKey::ThermalCapacityEnvelope)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::KeyNotFound {
                key: RegistryKey::ThermalCapacityEnvelope
            }
        );
    }

    #[test]
    fn set_get_clear_cycle() {
        let mut reg = SharedRegistry::new();
        reg.set_entry(RegistryKey::ThermalTransmissionCoefficientGlazing, 0.123_456_789);
        assert_eq!(
            reg.get_scalar(RegistryKey::ThermalTransmissionCoefficientGlazing)
                .unwrap()
                .to_bits(),
            0.123_456_789_f64.to_bits()
        );
        assert!(reg.exist_entry(RegistryKey::ThermalTransmissionCoefficientGlazing));

        reg.clear();
        assert!(reg.is_empty());
        assert!(matches!(
            reg.get_entry(RegistryKey::ThermalTransmissionCoefficientGlazing),
            Err(RegistryError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn scalar_read_rejects_other_kinds() {
        let mut reg = SharedRegistry::new();
        reg.set_entry(RegistryKey::Location, "Aachen");
        let err = reg.get_scalar(RegistryKey::Location).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::WrongValueKind {
                found: "text",
                ..
            }
        ));
    }

    #[test]
    fn delete_entry_removes_and_reports_missing() {
        let mut reg = SharedRegistry::new();
        reg.set_entry(RegistryKey::HeatingSystem, true);
        assert_eq!(
            reg.delete_entry(RegistryKey::HeatingSystem).unwrap(),
            RegistryValue::Flag(true)
        );
        assert!(!reg.exist_entry(RegistryKey::HeatingSystem));
        assert!(reg.delete_entry(RegistryKey::HeatingSystem).is_err());
    }

    #[test]
    fn dynamic_entries_grouped_by_type_and_weight() {
        let mut reg = SharedRegistry::new();
        reg.set_dynamic_entry(ComponentType::CarBattery, SourceWeight(3), 0.3);
        reg.set_dynamic_entry(ComponentType::CarBattery, SourceWeight(1), 0.1);
        reg.set_dynamic_entry(ComponentType::Battery, SourceWeight(1), 0.9);

        assert_eq!(
            reg.get_dynamic_component_weights(ComponentType::CarBattery),
            vec![SourceWeight(1), SourceWeight(3)]
        );
        assert_eq!(
            reg.get_dynamic_entry(ComponentType::Battery, SourceWeight(1))
                .and_then(RegistryValue::as_scalar),
            Some(0.9)
        );
        assert!(reg
            .get_dynamic_entry(ComponentType::Car, SourceWeight(1))
            .is_none());
        assert!(reg
            .get_dynamic_component_weights(ComponentType::Car)
            .is_empty());

        reg.delete_dynamic_entry(ComponentType::CarBattery, SourceWeight(1))
            .unwrap();
        assert_eq!(
            reg.get_dynamic_component_weights(ComponentType::CarBattery),
            vec![SourceWeight(3)]
        );
        assert!(matches!(
            reg.delete_dynamic_entry(ComponentType::CarBattery, SourceWeight(1)),
            Err(RegistryError::DynamicEntryNotFound { .. })
        ));
    }

    #[test]
    fn handles_share_state() {
        let a = SharedRegistryHandle::new();
        let b = a.clone();
        a.lock().set_entry(RegistryKey::ResultScenarioName, "base");
        assert!(b.lock().exist_entry(RegistryKey::ResultScenarioName));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&SharedRegistryHandle::new()));
    }
}
