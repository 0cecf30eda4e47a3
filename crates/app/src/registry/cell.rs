//! The atomic read/write primitive every variable access goes through.

use std::sync::RwLock;

use fieldhub_domain::error::{FieldHubError, TransientReadError};
use fieldhub_domain::time::{Timestamp, now};
use fieldhub_domain::value::Value;
use fieldhub_domain::variable::{VariableSnapshot, VariableSpec};

/// A single variable's live state.
///
/// Value, version and timestamp sit behind one lock so readers never observe
/// a value paired with another write's version.
pub(crate) struct VariableCell {
    spec: VariableSpec,
    state: RwLock<CellState>,
}

struct CellState {
    value: Value,
    version: u64,
    last_modified: Timestamp,
}

impl VariableCell {
    pub(crate) fn new(spec: VariableSpec) -> Self {
        let value = spec.initial.rounded(spec.precision);
        Self {
            spec,
            state: RwLock::new(CellState {
                value,
                version: 0,
                last_modified: now(),
            }),
        }
    }

    pub(crate) fn spec(&self) -> &VariableSpec {
        &self.spec
    }

    pub(crate) fn name(&self) -> &str {
        &self.spec.name
    }

    /// Read `(value, version, last_modified)` as one unit.
    ///
    /// A cell whose lock was poisoned by a panicking writer is unreadable
    /// until the next successful write.
    pub(crate) fn snapshot(&self) -> Result<VariableSnapshot, FieldHubError> {
        let state = self.state.read().map_err(|_| TransientReadError {
            variable: self.spec.name.clone(),
            reason: "a writer was interrupted mid-update",
        })?;
        Ok(VariableSnapshot {
            name: self.spec.name.clone(),
            value: state.value,
            version: state.version,
            last_modified: state.last_modified,
        })
    }

    /// Replace the value, bump the version and stamp the time, atomically.
    ///
    /// Floats are rounded to the declared precision before commit. A value of
    /// the wrong kind is rejected without touching the cell.
    pub(crate) fn write(&self, value: Value) -> Result<u64, FieldHubError> {
        self.spec.accepts(&value)?;
        let value = value.rounded(self.spec.precision);

        let mut state = self.state.write().unwrap_or_else(|poisoned| {
            self.state.clear_poison();
            poisoned.into_inner()
        });
        state.value = value;
        state.version += 1;
        state.last_modified = now();
        Ok(state.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temperature() -> VariableCell {
        VariableCell::new(VariableSpec::float("Temperature", 20.0).precision(2))
    }

    #[test]
    fn should_start_at_version_zero_with_initial_value() {
        let cell = temperature();
        let snap = cell.snapshot().unwrap();
        assert_eq!(snap.value, Value::Float(20.0));
        assert_eq!(snap.version, 0);
    }

    #[test]
    fn should_bump_version_and_round_on_write() {
        let cell = temperature();
        let version = cell.write(Value::Float(25.456)).unwrap();
        assert_eq!(version, 1);

        let snap = cell.snapshot().unwrap();
        assert_eq!(snap.value, Value::Float(25.46));
        assert_eq!(snap.version, 1);
    }

    #[test]
    fn should_reject_wrong_kind_without_mutation() {
        let cell = temperature();
        let before = cell.snapshot().unwrap();

        let result = cell.write(Value::Bool(true));
        assert!(matches!(result, Err(FieldHubError::TypeMismatch(_))));

        let after = cell.snapshot().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn should_advance_timestamp_on_write() {
        let cell = temperature();
        let before = cell.snapshot().unwrap().last_modified;
        cell.write(Value::Float(21.0)).unwrap();
        assert!(cell.snapshot().unwrap().last_modified >= before);
    }

    #[test]
    fn should_never_expose_torn_pairs_under_concurrent_writes() {
        // Each writer records the version its write committed at. Every
        // snapshot a reader sees must carry exactly the value committed at
        // that version.
        let cell = Arc::new(VariableCell::new(VariableSpec::float("Counter", 0.0)));
        let writers: Vec<_> = (0..4u32)
            .map(|t| {
                let cell = Arc::clone(&cell);
                std::thread::spawn(move || {
                    (0..250u32)
                        .map(|i| {
                            let value = Value::Float(f64::from(t * 1000 + i));
                            (cell.write(value).unwrap(), value)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let reader = {
            let cell = Arc::clone(&cell);
            std::thread::spawn(move || {
                (0..1000)
                    .map(|_| cell.snapshot().unwrap())
                    .collect::<Vec<_>>()
            })
        };

        let mut committed = std::collections::HashMap::new();
        for w in writers {
            for (version, value) in w.join().unwrap() {
                assert!(
                    committed.insert(version, value).is_none(),
                    "version {version} committed twice"
                );
            }
        }
        for snap in reader.join().unwrap() {
            if snap.version == 0 {
                assert_eq!(snap.value, Value::Float(0.0));
            } else {
                assert_eq!(Some(&snap.value), committed.get(&snap.version));
            }
        }
        assert_eq!(committed.len(), 1000);
        assert_eq!(cell.snapshot().unwrap().version, 1000);
    }

    #[test]
    fn should_recover_poisoned_cell_on_next_write() {
        let cell = Arc::new(temperature());
        let poisoner = Arc::clone(&cell);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.write().unwrap();
            panic!("writer interrupted");
        })
        .join();

        assert!(matches!(
            cell.snapshot(),
            Err(FieldHubError::TransientRead(_))
        ));

        cell.write(Value::Float(22.0)).unwrap();
        assert_eq!(cell.snapshot().unwrap().value, Value::Float(22.0));
    }
}
