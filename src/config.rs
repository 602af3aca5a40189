use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

/// Runtime configuration, read once at startup. Every key has a default
/// except the email block, whose absence leaves the mailer unconfigured.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub db_pool_size: u32,
    pub token_secret: String,
    pub admin_username: String,
    pub admin_password: String,
    pub log_access_password: String,
    pub upload_max_bytes: usize,
    pub cors_origins: Vec<String>,
    pub python_bin: String,
    pub frame_script: PathBuf,
    pub register_script: PathBuf,
    pub frame_timeout_secs: u64,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub user: String,
    pub password: String,
}

impl Config {
    pub fn load() -> Self {
        let email = match (var("EMAIL_HOST"), var("EMAIL_USER"), var("EMAIL_PASSWORD")) {
            (Some(host), Some(user), Some(password)) => Some(EmailConfig {
                host,
                user,
                password,
            }),
            _ => {
                info!("email credentials not set, email features disabled");
                None
            }
        };

        Self {
            port: try_load("PORT", "3001"),
            data_dir: PathBuf::from(load_or("DATA_DIR", "./data")),
            db_pool_size: try_load("DB_POOL_SIZE", "10"),
            token_secret: load_or("TOKEN_SECRET", "dev-secret-change-me"),
            admin_username: load_or("ADMIN_USERNAME", "admin"),
            admin_password: load_or("ADMIN_PASSWORD", "admin123"),
            log_access_password: load_or("LOG_ACCESS_PASSWORD", "logs123"),
            upload_max_bytes: try_load("UPLOAD_MAX_BYTES", "10485760"),
            cors_origins: load_or("CORS_ORIGINS", "*")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            python_bin: load_or("PYTHON_BIN", "python3"),
            frame_script: PathBuf::from(load_or("FRAME_SCRIPT", "python/process_web_frame.py")),
            register_script: PathBuf::from(load_or(
                "REGISTER_SCRIPT",
                "python/register_student.py",
            )),
            frame_timeout_secs: try_load("FRAME_TIMEOUT_SECS", "10"),
            email,
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("attendance.sqlite3")
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.uploads_dir().join("frames")
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.uploads_dir().join("photos")
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn load_or(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|| default.to_string())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| default.to_string());
    raw.parse().unwrap_or_else(|e| {
        warn!("invalid {key} value {raw:?} ({e}), using default {default}");
        default.parse().map_err(|e| format!("{e}")).expect("default must parse")
    })
}
