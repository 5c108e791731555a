//! Web form decoding and the mapping from control routes to commands
//!
//! Handlers hand in the raw query string (GET) or the
//! `application/x-www-form-urlencoded` body (POST); everything from there
//! to a [`Command`] happens here so it can be tested on the host.

use derive_more::{Display, Error};
use log::debug;

use crate::animation::Animation;
use crate::command::{AnimationColorUpdate, Command, PlayerDelta};
use crate::credentials::WifiCredentials;
use crate::{MAX_PLAYERS, RGB8};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum ColorParseError {
    #[display("color must start with '#'")]
    MissingHash,
    #[display("color must have 6 hex digits, got {len}")]
    WrongLength { len: usize },
    #[display("color contains non-hex digits")]
    InvalidHex,
}

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum FormError {
    #[display("missing field '{field}'")]
    MissingField { field: &'static str },
    #[display("invalid slot {value:?}, expected 1 or 2")]
    InvalidSlot { value: String },
}

/// Parse `#RRGGBB` (either case).
pub fn parse_hex_color(input: &str) -> Result<RGB8, ColorParseError> {
    let digits = input
        .strip_prefix('#')
        .ok_or(ColorParseError::MissingHash)?;
    if digits.len() != 6 {
        return Err(ColorParseError::WrongLength { len: digits.len() });
    }
    let mut rgb = [0u8; 3];
    hex::decode_to_slice(digits, &mut rgb).map_err(|_| ColorParseError::InvalidHex)?;
    Ok(RGB8::new(rgb[0], rgb[1], rgb[2]))
}

/// Format as uppercase `#RRGGBB`
#[must_use]
pub fn format_hex_color(color: RGB8) -> String {
    format!("#{}", hex::encode_upper([color.r, color.g, color.b]))
}

/// Decode one urlencoded component: `+` becomes a space and `%XX` the byte
/// it names. A `%` without two hex digits after it is kept as is.
fn decode_component(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let mut byte = [0u8; 1];
                match bytes.get(i + 1..i + 3) {
                    Some(pair) if hex::decode_to_slice(pair, &mut byte).is_ok() => {
                        out.push(byte[0]);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Decoded `key=value` pairs of a query string or form body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                    (decode_component(key), decode_component(value))
                })
                .collect(),
        )
    }

    /// Parameters from the query part of a request URI
    #[must_use]
    pub fn from_uri(uri: &str) -> Self {
        uri.split_once('?')
            .map_or_else(Self::default, |(_, query)| Self::parse(query))
    }

    /// First value for `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMethod {
    Get,
    Post,
}

/// The control routes; each one answers with a redirect back to `/`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    SetPlayers,
    SetBrightness,
    SetActivePlayer,
    SetColors,
    SetAnimationColors,
    StartAnimation,
    ResetAll,
}

impl Route {
    pub const ALL: [Self; 7] = [
        Self::SetPlayers,
        Self::SetBrightness,
        Self::SetActivePlayer,
        Self::SetColors,
        Self::SetAnimationColors,
        Self::StartAnimation,
        Self::ResetAll,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::SetPlayers => "/set_players",
            Self::SetBrightness => "/set_brightness",
            Self::SetActivePlayer => "/set_active_player",
            Self::SetColors => "/set_colors",
            Self::SetAnimationColors => "/set_animation_colors",
            Self::StartAnimation => "/start_animation",
            Self::ResetAll => "/reset_all",
        }
    }

    #[must_use]
    pub const fn method(self) -> RouteMethod {
        match self {
            Self::SetColors | Self::SetAnimationColors => RouteMethod::Post,
            _ => RouteMethod::Get,
        }
    }

    /// Build the command for a request. `None` means the request carries
    /// nothing to apply (missing or malformed parameters) and is only
    /// answered with the redirect.
    #[must_use]
    pub fn command(self, params: &Params) -> Option<Command> {
        match self {
            Self::SetPlayers => match params.get("action")? {
                "inc" => Some(Command::AdjustPlayers(PlayerDelta::Increment)),
                "dec" => Some(Command::AdjustPlayers(PlayerDelta::Decrement)),
                other => {
                    debug!("Ignoring player action {other:?}");
                    None
                }
            },
            Self::SetBrightness => {
                let value = parse_int(params.get("value")?)?;
                let brightness = u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX);
                Some(Command::SetBrightness(brightness))
            }
            Self::SetActivePlayer => {
                let player = parse_int(params.get("player")?)?;
                // Out of u8 range can never be seated, so it clears like 0 does
                Some(Command::SetActivePlayer(u8::try_from(player).ok()))
            }
            Self::SetColors => {
                let colors: Vec<(usize, RGB8)> = (1..=MAX_PLAYERS)
                    .filter_map(|player| {
                        let field = format!("player{player}_color");
                        let color = parse_color_field(params, &field)?;
                        Some((player - 1, color))
                    })
                    .collect();
                (!colors.is_empty()).then_some(Command::SetPlayerColors(colors))
            }
            Self::SetAnimationColors => {
                let update = AnimationColorUpdate {
                    theater_chase: parse_color_field(params, "theaterChase_color"),
                    breathing: parse_color_field(params, "breathing_color"),
                };
                (!update.is_empty()).then_some(Command::SetAnimationColors(update))
            }
            Self::StartAnimation => {
                let animation = params.get("animation").and_then(Animation::from_name);
                Some(Command::StartAnimation(animation))
            }
            Self::ResetAll => Some(Command::ResetAll),
        }
    }
}

fn parse_int(value: &str) -> Option<i64> {
    match value.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            debug!("Ignoring non-numeric value {value:?}");
            None
        }
    }
}

fn parse_color_field(params: &Params, field: &str) -> Option<RGB8> {
    let value = params.get(field)?;
    match parse_hex_color(value) {
        Ok(color) => Some(color),
        Err(e) => {
            debug!("Ignoring {field}={value:?}: {e}");
            None
        }
    }
}

/// Credentials submitted for one storage slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiForm {
    /// Zero-based slot index
    pub slot: usize,
    pub credentials: WifiCredentials,
}

/// Parse the 1-based `slot` field (`1` or `2`) into a zero-based index.
pub fn parse_slot(params: &Params) -> Result<usize, FormError> {
    let value = params
        .get("slot")
        .ok_or(FormError::MissingField { field: "slot" })?;
    match value.trim() {
        "1" => Ok(0),
        "2" => Ok(1),
        other => Err(FormError::InvalidSlot {
            value: other.to_string(),
        }),
    }
}

/// Parse a `/save_wifi` body. An empty password is allowed (open network);
/// lengths are checked when the credentials are stored.
pub fn parse_wifi_form(params: &Params) -> Result<WifiForm, FormError> {
    let slot = parse_slot(params)?;
    let ssid = params
        .get("ssid")
        .filter(|ssid| !ssid.is_empty())
        .ok_or(FormError::MissingField { field: "ssid" })?;
    let password = params.get("password").unwrap_or_default();
    Ok(WifiForm {
        slot,
        credentials: WifiCredentials {
            ssid: ssid.to_string(),
            password: password.to_string(),
        },
    })
}
