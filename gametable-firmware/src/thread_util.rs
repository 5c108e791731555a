//! Named FreeRTOS threads and the delayed restart used after saving settings
//!
//! `std::thread::Builder::name()` only renames the pthread after the FreeRTOS
//! task already exists, so the name has to go through
//! `ThreadSpawnConfiguration` before spawning.

use std::ffi::CStr;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::task::thread::ThreadSpawnConfiguration;
use log::info;

/// Spawn a thread with a FreeRTOS task name (at most 15 characters).
pub fn spawn_named<F, T>(name: &'static CStr, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let prev_conf = ThreadSpawnConfiguration::get();

    ThreadSpawnConfiguration {
        name: Some(name.to_bytes_with_nul()),
        ..Default::default()
    }
    .set()?;

    let handle = std::thread::spawn(f);

    if let Some(prev) = prev_conf {
        prev.set()?;
    }

    Ok(handle)
}

/// Restart the chip after `delay`, from a separate task so the HTTP response
/// that triggered it can still go out.
pub fn schedule_restart(delay: Duration) -> Result<()> {
    info!("Restarting in {} ms...", delay.as_millis());
    spawn_named(c"restart", move || {
        std::thread::sleep(delay);
        unsafe {
            esp_idf_svc::sys::esp_restart();
        }
    })?;
    Ok(())
}
