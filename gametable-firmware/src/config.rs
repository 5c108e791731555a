use anyhow::{anyhow, Result};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use esp_idf_svc::sys::{esp_mac_type_t_ESP_MAC_WIFI_STA, esp_read_mac};
use gametable_zones::{is_led_gpio, truncate_ssid, EngineTimings, MAX_LED_COUNT};
use log::{debug, info, warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

const AP_SSID_PREFIX: &str = "GameTable-";

/// Read WiFi STA MAC address from eFuse (available before WiFi driver init)
fn get_wifi_sta_mac() -> [u8; 6] {
    let mut mac = [0u8; 6];
    // SAFETY: esp_read_mac just reads from eFuse, no driver needed
    unsafe {
        esp_read_mac(mac.as_mut_ptr(), esp_mac_type_t_ESP_MAC_WIFI_STA);
    }
    mac
}

/// Fallback AP SSID, "GameTable-XXXX" from the last two MAC bytes
fn default_ap_ssid() -> String {
    let mac = get_wifi_sta_mac();
    format!("{AP_SSID_PREFIX}{}", hex::encode_upper(&mac[4..]))
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    #[must_use]
    pub const fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::Off,
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
        }
    }
}

const NVS_NAMESPACE: &str = "gametable";
const NVS_CONFIG_KEY: &str = "config";

// Global NVS handle - initialized once in main, shared with the web handlers
static NVS: Mutex<Option<EspNvs<NvsDefault>>> = Mutex::new(None);

pub fn init_nvs(nvs_partition: EspNvsPartition<NvsDefault>) -> Result<()> {
    debug!("Initializing NVS namespace: {NVS_NAMESPACE}");
    let nvs = EspNvs::new(nvs_partition, NVS_NAMESPACE, true)?;
    *NVS.lock().map_err(|_| anyhow!("NVS lock poisoned"))? = Some(nvs);
    info!("NVS initialized");
    Ok(())
}

/// Read a whole blob, `None` if the key was never written
pub fn load_blob(key: &str) -> Result<Option<Vec<u8>>> {
    let nvs_guard = NVS.lock().map_err(|_| anyhow!("NVS lock poisoned"))?;
    let nvs = nvs_guard.as_ref().ok_or_else(|| anyhow!("NVS not initialized"))?;

    let Some(len) = nvs.blob_len(key)? else {
        return Ok(None);
    };
    debug!("NVS blob '{key}': {len} bytes");
    let mut buf = vec![0u8; len];
    nvs.get_blob(key, &mut buf)?;
    Ok(Some(buf))
}

pub fn save_blob(key: &str, data: &[u8]) -> Result<()> {
    let mut nvs_guard = NVS.lock().map_err(|_| anyhow!("NVS lock poisoned"))?;
    let nvs = nvs_guard.as_mut().ok_or_else(|| anyhow!("NVS not initialized"))?;
    nvs.set_blob(key, data)?;
    debug!("NVS blob '{key}' saved ({} bytes)", data.len());
    Ok(())
}

/// Lower bound for the theater chase interval
pub const MIN_THEATER_CHASE_INTERVAL_MS: u32 = 10;

/// Allowed range for the highlight fade interval
pub const MIN_HIGHLIGHT_INTERVAL_MS: u32 = 50;
pub const MAX_HIGHLIGHT_INTERVAL_MS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_led_count")]
    pub led_count: usize,
    #[serde(default = "default_led_gpio")]
    pub led_gpio: u8,
    #[serde(default = "default_gamma_correction")]
    pub gamma_correction: bool,
    #[serde(default)]
    pub log_level: LogLevel,
    /// mDNS hostname, served as `<hostname>.local`
    #[serde(default = "default_hostname")]
    pub hostname: String,
    /// Fallback AP SSID (defaults to "GameTable-XXXX" where XXXX is derived from MAC)
    #[serde(default = "default_ap_ssid")]
    pub ap_ssid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ap_password: Option<String>,
    #[serde(default = "default_theater_chase_interval_ms")]
    pub theater_chase_interval_ms: u32,
    #[serde(default = "default_highlight_interval_ms")]
    pub highlight_interval_ms: u32,
}

const fn default_led_count() -> usize {
    60
}

const fn default_led_gpio() -> u8 {
    18
}

const fn default_gamma_correction() -> bool {
    true
}

fn default_hostname() -> String {
    "gametable".to_string()
}

const fn default_theater_chase_interval_ms() -> u32 {
    50
}

const fn default_highlight_interval_ms() -> u32 {
    50
}

impl Default for Config {
    fn default() -> Self {
        Self {
            led_count: default_led_count(),
            led_gpio: default_led_gpio(),
            gamma_correction: default_gamma_correction(),
            log_level: LogLevel::default(),
            hostname: default_hostname(),
            ap_ssid: default_ap_ssid(),
            ap_password: None,
            theater_chase_interval_ms: default_theater_chase_interval_ms(),
            highlight_interval_ms: default_highlight_interval_ms(),
        }
    }
}

impl Config {
    /// Clamp values to valid ranges and fix invalid values
    pub fn validate(&mut self) {
        if self.led_count == 0 {
            warn!("LED count is 0, resetting to {}", default_led_count());
            self.led_count = default_led_count();
        }
        if self.led_count > MAX_LED_COUNT {
            warn!("Clamping led_count from {} to {MAX_LED_COUNT}", self.led_count);
            self.led_count = MAX_LED_COUNT;
        }
        if !is_led_gpio(self.led_gpio) {
            warn!(
                "GPIO {} cannot drive the strip, resetting to {}",
                self.led_gpio,
                default_led_gpio()
            );
            self.led_gpio = default_led_gpio();
        }
        if self.theater_chase_interval_ms < MIN_THEATER_CHASE_INTERVAL_MS {
            warn!(
                "Clamping theater_chase_interval_ms from {} to {MIN_THEATER_CHASE_INTERVAL_MS}",
                self.theater_chase_interval_ms
            );
            self.theater_chase_interval_ms = MIN_THEATER_CHASE_INTERVAL_MS;
        }
        let highlight = self
            .highlight_interval_ms
            .clamp(MIN_HIGHLIGHT_INTERVAL_MS, MAX_HIGHLIGHT_INTERVAL_MS);
        if highlight != self.highlight_interval_ms {
            warn!(
                "Clamping highlight_interval_ms from {} to {highlight}",
                self.highlight_interval_ms
            );
            self.highlight_interval_ms = highlight;
        }
        if self.hostname.is_empty() {
            warn!("Hostname is empty, resetting to default");
            self.hostname = default_hostname();
        }
        if self.ap_ssid.is_empty() {
            warn!("AP SSID is empty, resetting to default");
            self.ap_ssid = default_ap_ssid();
        }
        let ssid = truncate_ssid(&self.ap_ssid);
        if ssid.len() != self.ap_ssid.len() {
            warn!("AP SSID longer than 32 bytes, truncating to '{ssid}'");
            self.ap_ssid = ssid.to_string();
        }
        if self.ap_password.as_ref().is_some_and(|pw| pw.len() < 8) {
            warn!("AP password shorter than 8 characters, running an open AP");
            self.ap_password = None;
        }
    }

    #[must_use]
    pub const fn engine_timings(&self) -> EngineTimings {
        EngineTimings {
            theater_chase_interval_ms: self.theater_chase_interval_ms,
            highlight_interval_ms: self.highlight_interval_ms,
        }
    }

    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(mut config) => {
                info!("Loaded config from NVS");
                config.validate();
                config
            }
            Err(e) => {
                warn!("Failed to load config from NVS: {e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn load() -> Result<Self> {
        debug!("Loading config from NVS");
        let buf = load_blob(NVS_CONFIG_KEY)?.ok_or_else(|| anyhow!("No config found in NVS"))?;
        let config: Self = serde_json::from_slice(&buf)?;
        debug!(
            "Config parsed: led_count={}, led_gpio={}, log_level={:?}",
            config.led_count, config.led_gpio, config.log_level
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        debug!("Saving config to NVS");
        let json = serde_json::to_vec(self)?;
        save_blob(NVS_CONFIG_KEY, &json)?;
        info!("Config saved to NVS");
        Ok(())
    }
}
