//! Station connection from stored credentials, with a fallback access point

use std::net::Ipv4Addr;

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, ClientConfiguration, Configuration,
    EspWifi,
};
use gametable_zones::credentials::{CONNECT_ATTEMPTS, CONNECT_ATTEMPT_DELAY_MS};
use gametable_zones::{CredentialImage, WifiCredentials};
use log::{debug, info, warn};

use crate::config;

const NVS_WIFI_KEY: &str = "wifi";

pub type Wifi = BlockingWifi<EspWifi<'static>>;

pub fn load_credentials() -> CredentialImage {
    match config::load_blob(NVS_WIFI_KEY) {
        Ok(Some(bytes)) => CredentialImage::from_bytes(&bytes),
        Ok(None) => {
            info!("No WiFi credentials stored");
            CredentialImage::default()
        }
        Err(e) => {
            warn!("Failed to load WiFi credentials: {e}");
            CredentialImage::default()
        }
    }
}

pub fn save_credentials(image: &CredentialImage) -> Result<()> {
    config::save_blob(NVS_WIFI_KEY, image.as_bytes())?;
    info!("WiFi credentials saved");
    Ok(())
}

fn auth_method(password: &str) -> AuthMethod {
    if password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    }
}

/// One network, a fixed number of attempts. `Ok(None)` if it never came up.
fn try_network(wifi: &mut Wifi, network: &WifiCredentials) -> Result<Option<Ipv4Addr>> {
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network.ssid.as_str().try_into().unwrap_or_default(),
        password: network.password.as_str().try_into().unwrap_or_default(),
        auth_method: auth_method(&network.password),
        ..Default::default()
    }))?;
    if !wifi.is_started()? {
        wifi.start()?;
    }

    // Non-blocking connect, association is polled below
    wifi.wifi_mut().connect()?;

    for attempt in 1..=CONNECT_ATTEMPTS {
        FreeRtos::delay_ms(CONNECT_ATTEMPT_DELAY_MS);
        if wifi.is_connected()? {
            wifi.wait_netif_up()?;
            let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
            return Ok(Some(ip_info.ip));
        }
        debug!(
            "Waiting for '{}' (attempt {attempt}/{CONNECT_ATTEMPTS})",
            network.ssid
        );
    }

    if let Err(e) = wifi.wifi_mut().disconnect() {
        debug!("Disconnect after failed attempts: {e:?}");
    }
    Ok(None)
}

/// Try every stored network in slot order; the first one to connect wins.
pub fn connect_station(wifi: &mut Wifi, credentials: &CredentialImage) -> Option<Ipv4Addr> {
    for network in credentials.networks() {
        info!("Connecting to '{}'...", network.ssid);
        match try_network(wifi, &network) {
            Ok(Some(ip)) => {
                info!("WiFi STA connected to '{}' with IP: {ip}", network.ssid);
                return Some(ip);
            }
            Ok(None) => warn!(
                "No connection to '{}' after {CONNECT_ATTEMPTS} attempts",
                network.ssid
            ),
            Err(e) => warn!("Connecting to '{}' failed: {e:?}", network.ssid),
        }
    }
    None
}

/// Start the fallback access point serving the control page.
pub fn start_access_point(wifi: &mut Wifi, ssid: &str, password: Option<&str>) -> Result<Ipv4Addr> {
    let password = password.unwrap_or_default();
    info!("Starting fallback AP '{ssid}'");

    if wifi.is_started()? {
        wifi.stop()?;
    }
    wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
        ssid: ssid.try_into().unwrap_or_default(),
        password: password.try_into().unwrap_or_default(),
        auth_method: auth_method(password),
        channel: 1,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.wait_netif_up()?;

    let ip_info = wifi.wifi().ap_netif().get_ip_info()?;
    info!("AP started - connect to '{ssid}' and navigate to http://{}", ip_info.ip);
    Ok(ip_info.ip)
}
