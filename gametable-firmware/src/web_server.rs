use std::time::Duration;

use anyhow::Result;
use embedded_svc::http::server::{Connection, Request};
use embedded_svc::http::Method;
use embedded_svc::io::Write;
use esp_idf_svc::http::server::{Configuration, EspHttpServer};
use esp_idf_svc::io::EspIOError;
use gametable_zones::form::{parse_slot, parse_wifi_form};
use gametable_zones::{Params, Route, RouteMethod};
use log::{debug, error, info, warn};

use crate::config::Config;
use crate::engine_task::{EngineMessage, EngineSender};
use crate::thread_util::schedule_restart;
use crate::wifi;

const HTML_INDEX: &str = include_str!("index.html");

/// Largest form or JSON body accepted
const MAX_BODY_LEN: usize = 2048;

/// How long `/api/state` waits for the poll loop
const SNAPSHOT_TIMEOUT: Duration = Duration::from_millis(500);

/// Delay before restarting after settings were saved
const RESTART_DELAY: Duration = Duration::from_secs(2);

/// Read the request body, up to `MAX_BODY_LEN` bytes
fn read_body<C: Connection>(req: &mut Request<C>) -> Result<Vec<u8>, C::Error> {
    let mut buf = vec![0u8; MAX_BODY_LEN];
    let mut len = 0;
    while len < buf.len() {
        let read = req.read(&mut buf[len..])?;
        if read == 0 {
            break;
        }
        len += read;
    }
    buf.truncate(len);
    Ok(buf)
}

fn redirect_home<C: Connection>(req: Request<C>) -> Result<(), C::Error> {
    req.into_response(302, Some("Found"), &[("Location", "/")])?;
    Ok(())
}

fn write_json<C: Connection>(req: Request<C>, json: &str) -> Result<(), C::Error> {
    let mut response = req.into_response(200, Some("OK"), &[("Content-Type", "application/json")])?;
    response.write_all(json.as_bytes())?;
    Ok(())
}

fn write_error<C: Connection>(req: Request<C>, status: u16, message: &str) -> Result<(), C::Error> {
    let mut response = req.into_status_response(status)?;
    response.write_all(message.as_bytes())?;
    Ok(())
}

#[allow(clippy::too_many_lines)] // Route registration function - length is proportional to endpoints
pub fn start_server(engine_tx: &EngineSender) -> Result<EspHttpServer<'static>> {
    info!("Web server starting...");

    let server_config = Configuration {
        max_uri_handlers: 16,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&server_config)?;

    server.fn_handler("/", Method::Get, |req| -> Result<(), EspIOError> {
        let mut response = req.into_ok_response()?;
        response.write_all(HTML_INDEX.as_bytes())?;
        Ok(())
    })?;

    // Control routes: parse, hand the command to the poll loop, redirect
    for route in Route::ALL {
        let tx = engine_tx.clone();
        let method = match route.method() {
            RouteMethod::Get => Method::Get,
            RouteMethod::Post => Method::Post,
        };
        server.fn_handler(route.path(), method, move |mut req| -> Result<(), EspIOError> {
            let params = match route.method() {
                RouteMethod::Get => Params::from_uri(req.uri()),
                RouteMethod::Post => {
                    let body = read_body(&mut req)?;
                    Params::parse(&String::from_utf8_lossy(&body))
                }
            };
            debug!("HTTP: {} {params:?}", route.path());

            if let Some(command) = route.command(&params) {
                if tx.send(EngineMessage::Command(command)).is_err() {
                    warn!("Engine loop not running, dropping {}", route.path());
                }
            }
            redirect_home(req)
        })?;
    }

    let tx = engine_tx.clone();
    server.fn_handler("/api/state", Method::Get, move |req| -> Result<(), EspIOError> {
        debug!("HTTP: GET /api/state");
        let (reply_tx, reply_rx) = oneshot::channel();
        if tx.send(EngineMessage::Snapshot(reply_tx)).is_err() {
            return write_error(req, 503, "engine not running");
        }
        match reply_rx.recv_timeout(SNAPSHOT_TIMEOUT) {
            Ok(snapshot) => {
                let json = serde_json::to_string(&snapshot).unwrap_or_else(|_| "{}".to_string());
                write_json(req, &json)
            }
            Err(_) => {
                warn!("Timed out waiting for engine state");
                write_error(req, 503, "engine busy")
            }
        }
    })?;

    server.fn_handler("/api/wifi", Method::Get, |req| -> Result<(), EspIOError> {
        info!("HTTP: GET /api/wifi");
        let summary = wifi::load_credentials().summary();
        let json = serde_json::to_string(&summary).unwrap_or_else(|_| "[]".to_string());
        write_json(req, &json)
    })?;

    server.fn_handler("/save_wifi", Method::Post, |mut req| -> Result<(), EspIOError> {
        info!("HTTP: POST /save_wifi");
        let body = read_body(&mut req)?;
        let params = Params::parse(&String::from_utf8_lossy(&body));

        let form = match parse_wifi_form(&params) {
            Ok(form) => form,
            Err(e) => {
                warn!("Invalid WiFi form: {e}");
                return write_error(req, 400, &e.to_string());
            }
        };

        let mut image = wifi::load_credentials();
        if let Err(e) = image.set_slot(form.slot, &form.credentials) {
            warn!("Rejected WiFi credentials: {e}");
            return write_error(req, 400, &e.to_string());
        }
        if let Err(e) = wifi::save_credentials(&image) {
            error!("Failed to save WiFi credentials: {e:?}");
            return write_error(req, 500, "failed to save credentials");
        }

        info!(
            "WiFi slot {} set to '{}'",
            form.slot + 1,
            form.credentials.ssid
        );
        redirect_home(req)?;
        if let Err(e) = schedule_restart(RESTART_DELAY) {
            error!("Failed to schedule restart: {e:?}");
        }
        Ok(())
    })?;

    server.fn_handler("/clear_wifi", Method::Get, |req| -> Result<(), EspIOError> {
        info!("HTTP: GET /clear_wifi");
        let params = Params::from_uri(req.uri());
        let slot = match parse_slot(&params) {
            Ok(slot) => slot,
            Err(e) => {
                warn!("Invalid clear request: {e}");
                return write_error(req, 400, &e.to_string());
            }
        };

        let mut image = wifi::load_credentials();
        if image.clear_slot(slot).is_ok() {
            if let Err(e) = wifi::save_credentials(&image) {
                error!("Failed to save WiFi credentials: {e:?}");
                return write_error(req, 500, "failed to save credentials");
            }
            info!("WiFi slot {} cleared", slot + 1);
        }
        redirect_home(req)
    })?;

    server.fn_handler("/api/config", Method::Get, |req| -> Result<(), EspIOError> {
        info!("HTTP: GET /api/config");
        let mut config = Config::load_or_default();
        config.ap_password = None;
        let json = serde_json::to_string(&config).unwrap_or_else(|_| "{}".to_string());
        write_json(req, &json)
    })?;

    server.fn_handler("/api/config", Method::Post, |mut req| -> Result<(), EspIOError> {
        info!("HTTP: POST /api/config");
        let body = read_body(&mut req)?;

        let Ok(mut new_config) = serde_json::from_slice::<Config>(&body) else {
            warn!("Invalid config JSON received");
            return write_error(req, 400, "invalid config");
        };
        // The password is never sent out, so a missing one means "unchanged"
        if new_config.ap_password.is_none() {
            new_config.ap_password = Config::load_or_default().ap_password;
        }
        new_config.validate();
        debug!(
            "Config update: led_count={}, led_gpio={}, log_level={:?}",
            new_config.led_count, new_config.led_gpio, new_config.log_level
        );

        if let Err(e) = new_config.save() {
            error!("Failed to save config: {e:?}");
            return write_error(req, 500, "failed to save config");
        }

        let mut response = req.into_ok_response()?;
        response.write_all(b"{\"restart\":true}")?;
        if let Err(e) = schedule_restart(RESTART_DELAY) {
            error!("Failed to schedule restart: {e:?}");
        }
        Ok(())
    })?;

    info!("Web server started on http://0.0.0.0:80");
    Ok(server)
}
