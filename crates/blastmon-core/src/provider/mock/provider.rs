//! In-memory counter provider.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::provider::{CounterProvider, ProviderError, ProviderHandle, RawInstance};

#[derive(Debug, Default)]
struct MockObject {
    labels: Vec<String>,
    instances: Vec<RawInstance>,
    read_failure: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<String, MockObject>,
    open: HashSet<u64>,
    next_id: u64,
    close_calls: usize,
}

/// Counter provider backed by an in-memory table of objects.
///
/// All setters take `&self` so a test can keep mutating the provider after
/// handing an `Arc` of it to collectors.
#[derive(Debug, Default)]
pub struct MockProvider {
    state: Mutex<State>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Registers a counter object exposing `labels`, with no instances.
    pub fn add_object(&self, name: &str, labels: &[&str]) {
        self.with_state(|s| {
            s.objects.insert(
                name.to_string(),
                MockObject {
                    labels: labels.iter().map(|l| l.to_string()).collect(),
                    ..MockObject::default()
                },
            );
        });
    }

    /// Replaces the instances of an object. Unknown objects are ignored.
    pub fn set_instances(&self, name: &str, instances: Vec<RawInstance>) {
        self.with_state(|s| {
            if let Some(object) = s.objects.get_mut(name) {
                object.instances = instances;
            }
        });
    }

    /// Makes reads on `name` fail with `reason` until cleared with `None`.
    pub fn set_read_failure(&self, name: &str, reason: Option<&str>) {
        self.with_state(|s| {
            if let Some(object) = s.objects.get_mut(name) {
                object.read_failure = reason.map(str::to_string);
            }
        });
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.with_state(|s| s.open.len())
    }

    /// Number of times a handle has been given back.
    pub fn close_calls(&self) -> usize {
        self.with_state(|s| s.close_calls)
    }

    fn check_handle(state: &State, handle: &ProviderHandle) -> Result<(), ProviderError> {
        if state.open.contains(&handle.id()) {
            Ok(())
        } else {
            Err(ProviderError::InvalidHandle(handle.id()))
        }
    }
}

impl CounterProvider for MockProvider {
    fn open_counter_object(&self, name: &str) -> Result<ProviderHandle, ProviderError> {
        self.with_state(|s| {
            if !s.objects.contains_key(name) {
                return Err(ProviderError::NotFound(name.to_string()));
            }
            s.next_id += 1;
            let id = s.next_id;
            s.open.insert(id);
            Ok(ProviderHandle::new(id, name))
        })
    }

    fn counter_labels(&self, handle: &ProviderHandle) -> Result<Vec<String>, ProviderError> {
        self.with_state(|s| {
            Self::check_handle(s, handle)?;
            s.objects
                .get(handle.object())
                .map(|o| o.labels.clone())
                .ok_or_else(|| ProviderError::NotFound(handle.object().to_string()))
        })
    }

    fn read_instances(
        &self,
        handle: &ProviderHandle,
        labels: &[&str],
    ) -> Result<Vec<RawInstance>, ProviderError> {
        self.with_state(|s| {
            Self::check_handle(s, handle)?;
            let object = s
                .objects
                .get(handle.object())
                .ok_or_else(|| ProviderError::NotFound(handle.object().to_string()))?;

            if let Some(reason) = &object.read_failure {
                return Err(ProviderError::Io(reason.clone()));
            }

            Ok(object
                .instances
                .iter()
                .map(|instance| {
                    let mut instance = instance.clone();
                    instance
                        .values
                        .retain(|label, _| labels.contains(&label.as_str()));
                    instance
                })
                .collect())
        })
    }

    fn close_counter_object(&self, handle: ProviderHandle) {
        self.with_state(|s| {
            s.open.remove(&handle.id());
            s.close_calls += 1;
        });
    }
}
