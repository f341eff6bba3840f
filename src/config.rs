use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Document id of the operations spreadsheet all dashboard views read from.
const DEFAULT_SPREADSHEET_ID: &str = "1bNhlUVWnt43Pq1hqDALXbfGDVazD7VhaeKM58hBTsN0";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const FETCH_TIMEOUT_SECS: u64 = 10;

/// Immutable application configuration, loaded once at startup and shared
/// through the application state.
///
/// The two password tables are plaintext shared secrets compared by exact
/// string equality (case sensitive, no trimming). That is the contract the
/// supervisors' workflow depends on; it is a documented limitation, not an
/// invitation to harden.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listen port (`PORT`, default 8080). The server binds `0.0.0.0`.
    pub port: u16,

    /// Spreadsheet document id (`SPREADSHEET_ID` override).
    pub spreadsheet_id: String,

    /// Service-account JSON taken from the `GOOGLE_CREDS` environment
    /// variable, when present.
    pub creds_json: Option<String>,

    /// Fallback credential file consulted when `GOOGLE_CREDS` is unset.
    pub creds_file: PathBuf,

    /// Upper bound on any single remote call.
    pub fetch_timeout: Duration,

    /// Zone name -> gate password for the main login.
    pub zone_passwords: BTreeMap<String, String>,

    /// Preparation-office name -> password for the inquiry detail gate.
    pub office_passwords: BTreeMap<String, String>,
}

impl AppConfig {
    /// Build the configuration from the process environment, falling back to
    /// the deployment defaults for anything unset.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let spreadsheet_id =
            env::var("SPREADSHEET_ID").unwrap_or_else(|_| DEFAULT_SPREADSHEET_ID.to_string());

        AppConfig {
            port,
            spreadsheet_id,
            creds_json: env::var("GOOGLE_CREDS").ok(),
            creds_file: PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            fetch_timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
            zone_passwords: default_zone_passwords(),
            office_passwords: default_office_passwords(),
        }
    }

    /// True iff the zone exists in the gate table and the password matches
    /// exactly.
    pub fn zone_password_matches(&self, zone: &str, password: &str) -> bool {
        self.zone_passwords
            .get(zone)
            .is_some_and(|secret| secret == password)
    }

    /// True iff the office exists in the office table and the password
    /// matches exactly. Unknown offices never match.
    pub fn office_password_matches(&self, office: &str, password: &str) -> bool {
        self.office_passwords
            .get(office)
            .is_some_and(|secret| secret == password)
    }

    /// All zones a supervisor can pick on the login form.
    pub fn zone_names(&self) -> Vec<String> {
        self.zone_passwords.keys().cloned().collect()
    }
}

/// Cookie-signing key for the session jar.
///
/// Derived from `SESSION_SECRET` when set (SHA-512 widens the secret to the
/// 64 bytes the key wants). When unset a random key is generated so the
/// server still boots, at the cost of invalidating sessions on restart.
pub fn session_key() -> Key {
    match env::var("SESSION_SECRET") {
        Ok(secret) if !secret.is_empty() => {
            let digest = Sha512::digest(secret.as_bytes());
            Key::from(digest.as_slice())
        }
        _ => {
            log::warn!("SESSION_SECRET is not set; using a random key, sessions will not survive a restart");
            Key::generate()
        }
    }
}

/// Gate passwords per delivery zone, fixed at deployment time.
pub fn default_zone_passwords() -> BTreeMap<String, String> {
    [
        ("Ain shams", "754"),
        ("Alexandria", "1234"),
        ("Cairo_city_centre", "909"),
        ("Giza", "1568"),
        ("Heliopolis", "2161"),
        ("Ismalia city", "1122"),
        ("Kafr el-sheikh", "3344"),
        ("Maadi", "878"),
        ("Mansoura", "5566"),
        ("Mohandiseen", "1862"),
        ("Nasr city", "2851"),
        ("New damietta", "7788"),
        ("October", "2161"),
        ("Portsaid city", "9900"),
        ("Shebin el koom", "4455"),
        ("Sheikh zayed", "854"),
        ("Suez", "6677"),
        ("Tagammoa south", "1072"),
        ("Tanta", "8899"),
        ("Zagazig", "2233"),
    ]
    .into_iter()
    .map(|(zone, secret)| (zone.to_string(), secret.to_string()))
    .collect()
}

/// Passwords per preparation office, fixed at deployment time.
pub fn default_office_passwords() -> BTreeMap<String, String> {
    [
        ("مكتب طلبات المنصوره", "1010"),
        ("مكتب طلبات الأسكندرية", "2020"),
        ("مكتب طلبات مدينه نصر", "3030"),
        ("مكتب طلبات أكتوبر", "4040"),
        ("مكتب طلبات الهرم", "5050"),
        ("مكتب طلبات المعادي", "6060"),
        ("مكتب طلبات المهندسين", "7070"),
        ("مكتب طلبات التجمع", "8080"),
    ]
    .into_iter()
    .map(|(office, secret)| (office.to_string(), secret.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(zone: &str, secret: &str) -> AppConfig {
        let mut config = AppConfig::from_env();
        config.zone_passwords = [(zone.to_string(), secret.to_string())].into_iter().collect();
        config
    }

    #[test]
    fn zone_password_requires_exact_match() {
        let config = config_with("Tanta", "8899");
        assert!(config.zone_password_matches("Tanta", "8899"));
        assert!(!config.zone_password_matches("Tanta", "8899 "));
        assert!(!config.zone_password_matches("tanta", "8899"));
        assert!(!config.zone_password_matches("Giza", "8899"));
    }

    #[test]
    fn unknown_office_never_matches() {
        let config = AppConfig::from_env();
        assert!(!config.office_password_matches("no such office", ""));
        assert!(!config.office_password_matches("no such office", "1010"));
    }

    #[test]
    fn zone_names_are_deterministically_ordered() {
        let config = AppConfig::from_env();
        let names = config.zone_names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 20);
    }
}
