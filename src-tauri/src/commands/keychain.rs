use keyring::Entry;
use tracing::{info, warn};

/// Keychain service holding the optional inference endpoint token.
pub const API_TOKEN_SERVICE: &str = "leafscan-inference-api";
const KEYCHAIN_USER: &str = "leafscan";

fn token_entry() -> Result<Entry, String> {
    Entry::new(API_TOKEN_SERVICE, KEYCHAIN_USER).map_err(|e| {
        warn!("Failed to create keyring entry for {}: {}", API_TOKEN_SERVICE, e);
        e.to_string()
    })
}

/// Token for the endpoint, or `None` if unset or the keychain is unavailable.
pub(crate) fn read_api_token() -> Option<String> {
    match token_entry().ok()?.get_password() {
        Ok(token) => Some(token),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!("Failed to read API token: {}", e);
            None
        }
    }
}

#[tauri::command]
pub fn set_api_token(token: &str) -> Result<(), String> {
    info!("Storing inference API token");
    let token = token.trim();
    if token.is_empty() {
        return Err("API token cannot be empty".to_string());
    }
    token_entry()?.set_password(token).map_err(|e| {
        warn!("Failed to store API token: {}", e);
        e.to_string()
    })
}

#[tauri::command]
pub fn has_api_token() -> Result<bool, String> {
    let entry = token_entry()?;
    match entry.get_password() {
        Ok(_) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(e) => {
            warn!("Failed to check API token: {}", e);
            Err(e.to_string())
        }
    }
}

#[tauri::command]
pub fn delete_api_token() -> Result<(), String> {
    info!("Deleting inference API token");
    match token_entry()?.delete_credential() {
        Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => {
            warn!("Failed to delete API token: {}", e);
            Err(e.to_string())
        }
    }
}
