//! Preferences persisted with CFPreferences.
//!
//! Values live in the user's preferences domain for the app, the same
//! store `defaults read <domain>` shows.

use super::preferences::{PreferenceStorage, PreferencesError};
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_foundation_sys::base::CFTypeRef;
use core_foundation_sys::preferences::{
    CFPreferencesAppSynchronize, CFPreferencesCopyAppValue, CFPreferencesSetAppValue,
};
use std::ptr;

/// CFPreferences-backed storage for one application domain.
pub struct UserDefaults {
    domain: CFString,
    domain_name: String,
}

impl UserDefaults {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: CFString::new(domain),
            domain_name: domain.to_string(),
        }
    }

    fn value(&self, key: &str) -> Option<CFType> {
        let key = CFString::new(key);
        unsafe {
            let value = CFPreferencesCopyAppValue(
                key.as_concrete_TypeRef(),
                self.domain.as_concrete_TypeRef(),
            );
            if value.is_null() {
                None
            } else {
                Some(CFType::wrap_under_create_rule(value))
            }
        }
    }

    fn set_value(&self, key: &str, value: CFTypeRef) -> Result<(), PreferencesError> {
        let cf_key = CFString::new(key);
        let synchronized = unsafe {
            CFPreferencesSetAppValue(
                cf_key.as_concrete_TypeRef(),
                value,
                self.domain.as_concrete_TypeRef(),
            );
            CFPreferencesAppSynchronize(self.domain.as_concrete_TypeRef())
        };

        if synchronized == 0 {
            return Err(PreferencesError::SyncFailed {
                domain: self.domain_name.clone(),
            });
        }
        Ok(())
    }
}

impl PreferenceStorage for UserDefaults {
    fn string(&self, key: &str) -> Option<String> {
        self.value(key)?.downcast::<CFString>().map(|s| s.to_string())
    }

    fn set_string(&self, key: &str, value: Option<&str>) -> Result<(), PreferencesError> {
        match value {
            Some(value) => {
                let value = CFString::new(value);
                self.set_value(key, value.as_CFTypeRef())
            }
            None => self.set_value(key, ptr::null()),
        }
    }

    fn bool(&self, key: &str) -> bool {
        let Some(value) = self.value(key) else {
            return false;
        };
        if let Some(flag) = value.downcast::<CFBoolean>() {
            return bool::from(flag);
        }
        // `defaults write -int` stores numbers.
        value
            .downcast::<CFNumber>()
            .and_then(|n| n.to_i64())
            .map(|n| n != 0)
            .unwrap_or(false)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), PreferencesError> {
        let value = CFBoolean::from(value);
        self.set_value(key, value.as_CFTypeRef())
    }
}
