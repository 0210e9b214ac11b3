use serde::{Deserialize, Serialize};

/// Equipo configurado para el kiosk (id corto + nombre visible)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub season_id: String,
    pub api_base_url: String,
    pub teams: Vec<TeamRef>,
    pub offline_categories: Vec<String>,
    pub enable_logging: bool,
    pub queue: QueueConfig,
    pub ui: UiConfig,
    pub shell: ShellConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub storage_key: String,
    pub min_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_key: "ftc_attendance_queue_v1".to_string(),
            min_retry_delay_ms: 2_000,
            max_retry_delay_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub status_refresh_ms: u32,
    pub banner_poll_ms: u32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            status_refresh_ms: 20_000,
            banner_poll_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    pub cache_name: String,
    pub precache_urls: Vec<String>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            cache_name: "ftc-attendance-cache-v1".to_string(),
            precache_urls: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.webmanifest".to_string(),
                "/styles.css".to_string(),
                "/pkg/attendance_kiosk.js".to_string(),
                "/pkg/attendance_kiosk_bg.wasm".to_string(),
            ],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            season_id: "2024-25".to_string(),
            api_base_url: "https://script.google.com/macros/s/YOUR_SCRIPT_ID/exec".to_string(),
            teams: vec![
                TeamRef { id: "GP".to_string(), name: "Giggle Pickles".to_string() },
                TeamRef { id: "BH".to_string(), name: "Blockheads".to_string() },
            ],
            offline_categories: ["CAD", "Programming", "Documentation", "Outreach", "Other"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enable_logging: true,
            queue: QueueConfig::default(),
            ui: UiConfig::default(),
            shell: ShellConfig::default(),
        }
    }
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno en tiempo de compilación
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match key {
            "SEASON_ID" => option_env!("SEASON_ID"),
            "API_BASE_URL" => option_env!("API_BASE_URL"),
            "TEAM_IDS" => option_env!("TEAM_IDS"),
            "OFFLINE_CATEGORIES" => option_env!("OFFLINE_CATEGORIES"),
            "ENABLE_LOGGING" => option_env!("ENABLE_LOGGING"),
            "QUEUE_STORAGE_KEY" => option_env!("QUEUE_STORAGE_KEY"),
            "RETRY_MIN_DELAY_MS" => option_env!("RETRY_MIN_DELAY_MS"),
            "RETRY_MAX_DELAY_MS" => option_env!("RETRY_MAX_DELAY_MS"),
            "STATUS_REFRESH_MS" => option_env!("STATUS_REFRESH_MS"),
            "BANNER_POLL_MS" => option_env!("BANNER_POLL_MS"),
            "CACHE_NAME" => option_env!("CACHE_NAME"),
            "PRECACHE_URLS" => option_env!("PRECACHE_URLS"),
            _ => None,
        })
    }

    /// Construye la configuración a partir de un lookup arbitrario.
    /// Valores ausentes o mal formados caen en los defaults.
    pub fn from_lookup<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let defaults = Self::default();

        let mut min_retry = parse_or(lookup("RETRY_MIN_DELAY_MS"), defaults.queue.min_retry_delay_ms);
        let mut max_retry = parse_or(lookup("RETRY_MAX_DELAY_MS"), defaults.queue.max_retry_delay_ms);
        if min_retry > max_retry {
            std::mem::swap(&mut min_retry, &mut max_retry);
        }

        let teams = lookup("TEAM_IDS")
            .map(parse_teams)
            .filter(|teams| !teams.is_empty())
            .unwrap_or(defaults.teams);

        let precache_urls = lookup("PRECACHE_URLS")
            .map(parse_list)
            .filter(|urls| !urls.is_empty())
            .unwrap_or(defaults.shell.precache_urls);

        Self {
            season_id: text_or(lookup("SEASON_ID"), &defaults.season_id),
            api_base_url: text_or(lookup("API_BASE_URL"), &defaults.api_base_url)
                .trim_end_matches('/')
                .to_string(),
            teams,
            offline_categories: lookup("OFFLINE_CATEGORIES")
                .map(parse_list)
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.offline_categories),
            enable_logging: parse_or(lookup("ENABLE_LOGGING"), defaults.enable_logging),
            queue: QueueConfig {
                storage_key: text_or(lookup("QUEUE_STORAGE_KEY"), &defaults.queue.storage_key),
                min_retry_delay_ms: min_retry,
                max_retry_delay_ms: max_retry,
            },
            ui: UiConfig {
                status_refresh_ms: parse_or(lookup("STATUS_REFRESH_MS"), defaults.ui.status_refresh_ms),
                banner_poll_ms: parse_or(lookup("BANNER_POLL_MS"), defaults.ui.banner_poll_ms),
            },
            shell: ShellConfig {
                cache_name: text_or(lookup("CACHE_NAME"), &defaults.shell.cache_name),
                precache_urls,
            },
        }
    }

    /// Equipo por defecto del kiosk (el primero configurado)
    pub fn default_team_id(&self) -> Option<&str> {
        self.teams.first().map(|t| t.id.as_str())
    }

    pub fn team_name(&self, team_id: &str) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.name.as_str())
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.enable_logging
    }
}

fn text_or(raw: Option<&str>, default: &str) -> String {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_or<T: std::str::FromStr>(raw: Option<&str>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// "a, b ,c" -> ["a", "b", "c"] (entradas vacías descartadas)
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// "GP:Giggle Pickles,BH" -> [GP/Giggle Pickles, BH/BH]
pub fn parse_teams(raw: &str) -> Vec<TeamRef> {
    parse_list(raw)
        .into_iter()
        .filter_map(|entry| {
            let (id, name) = match entry.split_once(':') {
                Some((id, name)) => (id.trim(), name.trim()),
                None => (entry.as_str(), entry.as_str()),
            };
            if id.is_empty() {
                return None;
            }
            let name = if name.is_empty() { id } else { name };
            Some(TeamRef { id: id.to_string(), name: name.to_string() })
        })
        .collect()
}

// Configuración global estática
lazy_static::lazy_static! {
    pub static ref CONFIG: AppConfig = AppConfig::from_env();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<&'static str> {
        let map: HashMap<&'static str, &'static str> = pairs.iter().cloned().collect();
        move |key| map.get(key).copied()
    }

    #[test]
    fn test_defaults_match_kiosk_setup() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.season_id, "2024-25");
        assert_eq!(config.default_team_id(), Some("GP"));
        assert_eq!(config.queue.storage_key, "ftc_attendance_queue_v1");
        assert_eq!(config.queue.min_retry_delay_ms, 2_000);
        assert_eq!(config.queue.max_retry_delay_ms, 60_000);
        // el worker arranca offline con el módulo wasm de la cache
        for url in ["/", "/pkg/attendance_kiosk.js", "/pkg/attendance_kiosk_bg.wasm"] {
            assert!(config.shell.precache_urls.iter().any(|u| u == url));
        }
    }

    #[test]
    fn test_teams_parse_with_and_without_names() {
        let teams = parse_teams("GP:Giggle Pickles, BH ,:ghost");
        assert_eq!(teams.len(), 2);
        assert_eq!(teams[0], TeamRef { id: "GP".into(), name: "Giggle Pickles".into() });
        assert_eq!(teams[1], TeamRef { id: "BH".into(), name: "BH".into() });
    }

    #[test]
    fn test_malformed_numbers_fall_back_and_retry_bounds_are_ordered() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("RETRY_MIN_DELAY_MS", "90000"),
            ("RETRY_MAX_DELAY_MS", "5000"),
            ("STATUS_REFRESH_MS", "soon"),
            ("API_BASE_URL", "https://kiosk.example.org/exec/"),
        ]));
        assert_eq!(config.queue.min_retry_delay_ms, 5_000);
        assert_eq!(config.queue.max_retry_delay_ms, 90_000);
        assert_eq!(config.ui.status_refresh_ms, 20_000);
        assert_eq!(config.api_base_url, "https://kiosk.example.org/exec");
    }

    #[test]
    fn test_backend_only_keys_are_not_read() {
        let requested = std::cell::RefCell::new(Vec::new());
        AppConfig::from_lookup(|key| {
            requested.borrow_mut().push(key.to_string());
            None
        });
        let requested = requested.into_inner();
        assert!(requested.iter().any(|k| k == "PRECACHE_URLS"));
        assert!(!requested.iter().any(|k| k == "ADMIN_EMAILS" || k == "ALLOWED_STUDENT_DOMAINS"));
    }

    #[test]
    fn test_empty_team_list_keeps_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[("TEAM_IDS", " , ")]));
        assert_eq!(config.teams.len(), 2);
        assert_eq!(config.team_name("BH"), Some("Blockheads"));
    }
}
