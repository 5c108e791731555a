//! Task watchdog user for the engine loop
//!
//! The loop registers as a Task Watchdog Timer (TWDT) user instead of as a
//! task, so the handle can be created in `main` and lent to the loop.

use std::ffi::CStr;

use anyhow::{Context, Result};
use esp_idf_svc::sys::{
    esp_task_wdt_add_user, esp_task_wdt_delete_user, esp_task_wdt_reset_user,
    esp_task_wdt_user_handle_t, EspError,
};
use log::{debug, error};

/// Registered watchdog user, unregistered on drop.
pub struct WatchdogHandle {
    handle: esp_task_wdt_user_handle_t,
    name: &'static CStr,
}

impl WatchdogHandle {
    pub fn register(name: &'static CStr) -> Result<Self> {
        let mut handle: esp_task_wdt_user_handle_t = std::ptr::null_mut();

        EspError::convert(unsafe { esp_task_wdt_add_user(name.as_ptr(), &mut handle) })
            .with_context(|| format!("Watchdog: failed to register user {name:?}"))?;

        debug!("Watchdog: registered user {name:?}");
        Ok(Self { handle, name })
    }

    pub fn feed(&self) {
        let result = unsafe { esp_task_wdt_reset_user(self.handle) };
        if result != 0 {
            error!("Watchdog: failed to feed {:?}: error code {result}", self.name);
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        debug!("Watchdog: unregistering user {:?}", self.name);
        let result = unsafe { esp_task_wdt_delete_user(self.handle) };
        if result != 0 {
            error!(
                "Watchdog: failed to unregister {:?}: error code {result}",
                self.name
            );
        }
    }
}
