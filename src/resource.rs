//! ResourceArc Wrappers
//!
//! Persistent value state handed to the BEAM. The mutex is the lock that
//! serializes readers and writers of one value.

use crate::error::ValueError;
use crate::mapping::XmlValue;
use rustler::ResourceArc;
use std::sync::Mutex;

/// Wrapper for XmlValue that can be stored in a ResourceArc
pub struct ValueResource {
    pub inner: Mutex<XmlValue>,
}

impl ValueResource {
    pub fn new(value: XmlValue) -> Self {
        ValueResource {
            inner: Mutex::new(value),
        }
    }

    /// Run `f` with exclusive access to the value.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::MutexPoisoned`] if a previous holder panicked.
    pub fn with_value<F, R>(&self, f: F) -> Result<R, ValueError>
    where
        F: FnOnce(&mut XmlValue) -> R,
    {
        let mut guard = self.inner.lock().map_err(|_| ValueError::MutexPoisoned)?;
        Ok(f(&mut guard))
    }
}

#[rustler::resource_impl]
impl rustler::Resource for ValueResource {}

/// Type alias for the ResourceArc
pub type ValueRef = ResourceArc<ValueResource>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::ScanOptions;
    use std::sync::Arc;

    #[test]
    fn test_with_value() {
        let resource = ValueResource::new(XmlValue::text("a&amp;b", &ScanOptions::default()));
        let decoded = resource.with_value(|v| v.decoded().to_string()).unwrap();
        assert_eq!(decoded, "a&b");
    }

    #[test]
    fn test_poisoned_mutex() {
        let resource = Arc::new(ValueResource::new(XmlValue::text("x", &ScanOptions::default())));
        let held = Arc::clone(&resource);
        let _ = std::thread::spawn(move || {
            let _guard = held.inner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(matches!(
            resource.with_value(|v| v.revision()),
            Err(ValueError::MutexPoisoned)
        ));
    }
}
