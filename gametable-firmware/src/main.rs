use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::AnyIOPin;
use esp_idf_hal::prelude::*;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::mdns::EspMdns;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use gametable_zones::{ip_show_steps, Engine, RGB8};
use log::{info, warn};

mod config;
mod engine_task;
mod leds;
mod thread_util;
mod watchdog;
mod web_server;
mod wifi;

use config::Config;
use leds::LedController;
use watchdog::WatchdogHandle;

/// Shown when no stored network could be joined
const AP_FALLBACK_COLOR: RGB8 = RGB8::new(255, 160, 0);
const AP_FALLBACK_BLINKS: usize = 3;
const AP_FALLBACK_BLINK_PERIOD: Duration = Duration::from_millis(250);

/// Initialize mDNS for local discovery (`<hostname>.local`)
fn setup_mdns(hostname: &str) -> Option<EspMdns> {
    match EspMdns::take() {
        Ok(mut m) => {
            if let Err(e) = m.set_hostname(hostname) {
                warn!("Failed to set mDNS hostname: {e:?}");
            }
            let _ = m.set_instance_name("Game Table Lights");
            if let Err(e) = m.add_service(None, "_http", "_tcp", 80, &[]) {
                warn!("Failed to register mDNS HTTP service: {e:?}");
            }
            info!("mDNS started: {hostname}.local");
            Some(m)
        }
        Err(e) => {
            warn!("Failed to start mDNS: {e:?}");
            None
        }
    }
}

fn main() -> Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting gametable firmware {}...", env!("GIT_VERSION"));

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    config::init_nvs(nvs.clone())?;
    let config = Config::load_or_default();

    let level = config.log_level.as_level_filter();
    // Set for all targets (use "*" for global)
    if let Err(e) = esp_idf_svc::log::set_target_level("*", level) {
        warn!("Failed to set log level: {e}");
    } else {
        info!("Log level set to {:?}", config.log_level);
    }

    info!("Initializing LED controller on GPIO {}...", config.led_gpio);
    // SAFETY: We trust the user-configured GPIO pin number is valid for this board
    let led_pin = unsafe { AnyIOPin::new(i32::from(config.led_gpio)) };
    let mut leds = LedController::new(led_pin, peripherals.rmt.channel0, config.gamma_correction)?;

    let engine = Engine::new(config.led_count, config.engine_timings());
    leds.write(engine.pixels(), engine.brightness())?;

    info!("Initializing WiFi...");
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;

    let credentials = wifi::load_credentials();
    match wifi::connect_station(&mut wifi, &credentials) {
        Some(ip) => {
            let octet = ip.octets()[3];
            info!("Showing IP octet {octet} on the strip");
            let steps = ip_show_steps(octet);
            if let Err(e) = leds.play_show(&steps, config.led_count, engine.brightness()) {
                warn!("IP show failed: {e}");
            }
        }
        None => {
            warn!("No stored network reachable, falling back to access point");
            if let Err(e) =
                wifi::start_access_point(&mut wifi, &config.ap_ssid, config.ap_password.as_deref())
            {
                warn!("Failed to start fallback AP, continuing without network: {e}");
            }
            if let Err(e) = leds.blink(
                AP_FALLBACK_COLOR,
                AP_FALLBACK_BLINKS,
                AP_FALLBACK_BLINK_PERIOD,
                config.led_count,
                engine.brightness(),
            ) {
                warn!("AP blink failed: {e}");
            }
        }
    }

    let _mdns = setup_mdns(&config.hostname);

    let (engine_tx, engine_rx) = mpsc::channel();
    let _server = web_server::start_server(&engine_tx)?;
    drop(engine_tx);

    let watchdog = WatchdogHandle::register(c"engine")?;
    info!("All systems running!");

    // The boot show left its own pattern on the strip; the loop starts by
    // flushing the engine's buffer again.
    engine_task::run(engine, leds, &engine_rx, &watchdog)
}
