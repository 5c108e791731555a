//! Wi-Fi credential store image
//!
//! Two slots live in one fixed-layout byte image that is persisted as a
//! single blob. Each slot is 98 bytes: a 33-byte SSID field followed by a
//! 65-byte password field, both NUL padded. A slot whose SSID is empty holds
//! no network.

use derive_more::{Display, Error};
use log::warn;
use serde::Serialize;

/// Number of credential slots
pub const SLOT_COUNT: usize = 2;

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

const SSID_FIELD_LEN: usize = MAX_SSID_LEN + 1;
const PASSWORD_FIELD_LEN: usize = MAX_PASSWORD_LEN + 1;
const SLOT_LEN: usize = SSID_FIELD_LEN + PASSWORD_FIELD_LEN;

/// Size of the whole image in bytes
pub const IMAGE_LEN: usize = SLOT_LEN * SLOT_COUNT;

/// Connection attempts per stored network at boot
pub const CONNECT_ATTEMPTS: u32 = 20;

/// Pause between connection attempts
pub const CONNECT_ATTEMPT_DELAY_MS: u32 = 500;

#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum CredentialError {
    #[display("SSID is {len} bytes, at most 32 allowed")]
    SsidTooLong { len: usize },
    #[display("password is {len} bytes, at most 64 allowed")]
    PasswordTooLong { len: usize },
    #[display("no credential slot {slot}")]
    InvalidSlot { slot: usize },
    #[display("credential slot {slot} is not valid UTF-8")]
    InvalidUtf8 { slot: usize },
}

#[derive(Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

// Keep passwords out of the logs
impl std::fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"***")
            .finish()
    }
}

/// Public view of one slot, without the password
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotSummary {
    /// 1-based, as used by the web form
    pub slot: usize,
    pub ssid: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialImage([u8; IMAGE_LEN]);

impl Default for CredentialImage {
    fn default() -> Self {
        Self([0; IMAGE_LEN])
    }
}

impl std::fmt::Debug for CredentialImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.summary()).finish()
    }
}

/// Bytes of a NUL-padded field up to the first NUL
fn field_str(field: &[u8]) -> &[u8] {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..len]
}

fn write_field(field: &mut [u8], value: &str) {
    field.fill(0);
    field[..value.len()].copy_from_slice(value.as_bytes());
}

impl CredentialImage {
    /// Load from a stored blob. Shorter blobs are zero padded, extra bytes
    /// are ignored.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut image = Self::default();
        let len = bytes.len().min(IMAGE_LEN);
        image.0[..len].copy_from_slice(&bytes[..len]);
        image
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; IMAGE_LEN] {
        &self.0
    }

    fn slot_bytes(&self, slot: usize) -> Result<&[u8], CredentialError> {
        if slot >= SLOT_COUNT {
            return Err(CredentialError::InvalidSlot { slot });
        }
        let start = slot * SLOT_LEN;
        Ok(&self.0[start..start + SLOT_LEN])
    }

    fn slot_bytes_mut(&mut self, slot: usize) -> Result<&mut [u8], CredentialError> {
        if slot >= SLOT_COUNT {
            return Err(CredentialError::InvalidSlot { slot });
        }
        let start = slot * SLOT_LEN;
        Ok(&mut self.0[start..start + SLOT_LEN])
    }

    /// Read a zero-based slot. `Ok(None)` for an empty slot.
    pub fn slot(&self, slot: usize) -> Result<Option<WifiCredentials>, CredentialError> {
        let bytes = self.slot_bytes(slot)?;
        let (ssid, password) = bytes.split_at(SSID_FIELD_LEN);
        let ssid = field_str(ssid);
        if ssid.is_empty() {
            return Ok(None);
        }

        let to_string = |field: &[u8]| {
            std::str::from_utf8(field)
                .map(str::to_string)
                .map_err(|_| CredentialError::InvalidUtf8 { slot })
        };
        Ok(Some(WifiCredentials {
            ssid: to_string(ssid)?,
            password: to_string(field_str(password))?,
        }))
    }

    /// Store credentials in a zero-based slot, replacing what was there.
    pub fn set_slot(
        &mut self,
        slot: usize,
        credentials: &WifiCredentials,
    ) -> Result<(), CredentialError> {
        let ssid_len = credentials.ssid.len();
        if ssid_len > MAX_SSID_LEN {
            return Err(CredentialError::SsidTooLong { len: ssid_len });
        }
        let password_len = credentials.password.len();
        if password_len > MAX_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooLong { len: password_len });
        }

        let bytes = self.slot_bytes_mut(slot)?;
        let (ssid, password) = bytes.split_at_mut(SSID_FIELD_LEN);
        write_field(ssid, &credentials.ssid);
        write_field(password, &credentials.password);
        Ok(())
    }

    pub fn clear_slot(&mut self, slot: usize) -> Result<(), CredentialError> {
        self.slot_bytes_mut(slot)?.fill(0);
        Ok(())
    }

    /// Stored networks in slot order. Unreadable slots are skipped.
    #[must_use]
    pub fn networks(&self) -> Vec<WifiCredentials> {
        (0..SLOT_COUNT)
            .filter_map(|slot| match self.slot(slot) {
                Ok(credentials) => credentials,
                Err(e) => {
                    warn!("Skipping credential slot {}: {e}", slot + 1);
                    None
                }
            })
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> Vec<SlotSummary> {
        (0..SLOT_COUNT)
            .map(|slot| SlotSummary {
                slot: slot + 1,
                ssid: self.slot(slot).ok().flatten().map(|c| c.ssid),
            })
            .collect()
    }
}

/// Longest prefix of `ssid` that fits an SSID, cut on a character boundary
#[must_use]
pub fn truncate_ssid(ssid: &str) -> &str {
    if ssid.len() <= MAX_SSID_LEN {
        return ssid;
    }
    let mut end = MAX_SSID_LEN;
    while !ssid.is_char_boundary(end) {
        end -= 1;
    }
    &ssid[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(ssid: &str, password: &str) -> WifiCredentials {
        WifiCredentials {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_layout() {
        assert_eq!(SLOT_LEN, 98);
        assert_eq!(IMAGE_LEN, 196);
    }

    #[test]
    fn test_empty_image_has_no_networks() {
        let image = CredentialImage::default();
        assert_eq!(image.slot(0), Ok(None));
        assert_eq!(image.slot(1), Ok(None));
        assert!(image.networks().is_empty());
    }

    #[test]
    fn test_slots_at_fixed_offsets() {
        let mut image = CredentialImage::default();
        image.set_slot(1, &creds("Table", "hunter22")).unwrap();

        let bytes = image.as_bytes();
        assert_eq!(&bytes[98..103], b"Table");
        assert_eq!(bytes[103], 0);
        assert_eq!(&bytes[98 + 33..98 + 33 + 8], b"hunter22");
        assert!(bytes[..98].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_stored_image_reloads() {
        let mut image = CredentialImage::default();
        image.set_slot(0, &creds("Home", "")).unwrap();
        image.set_slot(1, &creds("Club", "p@ss word")).unwrap();

        let reloaded = CredentialImage::from_bytes(image.as_bytes());
        assert_eq!(reloaded.slot(0), Ok(Some(creds("Home", ""))));
        assert_eq!(reloaded.slot(1), Ok(Some(creds("Club", "p@ss word"))));
        assert_eq!(reloaded.networks().len(), 2);
    }

    #[test]
    fn test_max_lengths() {
        let mut image = CredentialImage::default();
        let ssid = "s".repeat(32);
        let password = "p".repeat(64);
        image.set_slot(0, &creds(&ssid, &password)).unwrap();
        assert_eq!(image.slot(0), Ok(Some(creds(&ssid, &password))));

        assert_eq!(
            image.set_slot(0, &creds(&"s".repeat(33), "")),
            Err(CredentialError::SsidTooLong { len: 33 })
        );
        assert_eq!(
            image.set_slot(0, &creds("ok", &"p".repeat(65))),
            Err(CredentialError::PasswordTooLong { len: 65 })
        );
        // Rejected writes leave the slot untouched
        assert_eq!(image.slot(0), Ok(Some(creds(&ssid, &password))));
    }

    #[test]
    fn test_truncate_ssid() {
        assert_eq!(truncate_ssid("GameTable-1A2B"), "GameTable-1A2B");
        let exact = "s".repeat(32);
        assert_eq!(truncate_ssid(&exact), exact);
        assert_eq!(truncate_ssid(&"s".repeat(40)), exact);

        // 31 ASCII bytes then a two-byte character: the character is dropped
        let split = format!("{}\u{e9}x", "a".repeat(31));
        assert_eq!(truncate_ssid(&split), "a".repeat(31));
    }

    #[test]
    fn test_overwrite_shorter_clears_tail() {
        let mut image = CredentialImage::default();
        image.set_slot(0, &creds("LongNetworkName", "longpassword")).unwrap();
        image.set_slot(0, &creds("Short", "pw")).unwrap();
        assert_eq!(image.slot(0), Ok(Some(creds("Short", "pw"))));
    }

    #[test]
    fn test_clear_slot() {
        let mut image = CredentialImage::default();
        image.set_slot(0, &creds("A", "1")).unwrap();
        image.set_slot(1, &creds("B", "2")).unwrap();
        image.clear_slot(0).unwrap();
        assert_eq!(image.slot(0), Ok(None));
        assert_eq!(image.networks(), vec![creds("B", "2")]);
    }

    #[test]
    fn test_invalid_slot() {
        let mut image = CredentialImage::default();
        assert_eq!(image.slot(2), Err(CredentialError::InvalidSlot { slot: 2 }));
        assert_eq!(
            image.set_slot(5, &creds("A", "")),
            Err(CredentialError::InvalidSlot { slot: 5 })
        );
        assert_eq!(image.clear_slot(2), Err(CredentialError::InvalidSlot { slot: 2 }));
    }

    #[test]
    fn test_invalid_utf8_slot_is_skipped() {
        let mut bytes = [0u8; IMAGE_LEN];
        bytes[0] = 0xFF;
        bytes[98..101].copy_from_slice(b"Net");
        let image = CredentialImage::from_bytes(&bytes);
        assert_eq!(image.slot(0), Err(CredentialError::InvalidUtf8 { slot: 0 }));
        assert_eq!(image.networks(), vec![creds("Net", "")]);
    }

    #[test]
    fn test_from_short_blob() {
        let image = CredentialImage::from_bytes(b"Cafe");
        assert_eq!(image.slot(0), Ok(Some(creds("Cafe", ""))));
        assert_eq!(image.slot(1), Ok(None));
    }

    #[test]
    fn test_summary_hides_passwords() {
        let mut image = CredentialImage::default();
        image.set_slot(1, &creds("Den", "secret")).unwrap();
        let json = serde_json::to_string(&image.summary()).unwrap();
        assert_eq!(json, r#"[{"slot":1,"ssid":null},{"slot":2,"ssid":"Den"}]"#);
        assert!(!format!("{:?}", creds("Den", "secret")).contains("secret"));
    }
}
