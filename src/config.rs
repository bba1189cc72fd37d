// Application configuration, loaded from environment variables and CLI flags.

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database URL (SQLite connection string).
    pub database_url: String,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Identifier reported in the administrative snapshot, distinguishing
    /// this server when several run side by side.
    pub server_no: i64,
    /// Password for the auto-created admin account. When unset, no admin
    /// account is created at startup.
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `DATABASE_URL` - SQLite connection string (default: `sqlite:pokehunt.db?mode=rwc`)
    /// - `PORT` - HTTP server port (default: 3000)
    /// - `SERVER_NO` - server identifier in snapshot payloads (default: 1)
    /// - `ADMIN_PASSWORD` - password for the `admin` account created at startup
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:pokehunt.db?mode=rwc".to_string());

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| std::env::var("PORT").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(3000);

        let server_no = std::env::var("SERVER_NO")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        let admin_password = std::env::var("ADMIN_PASSWORD").ok();

        Config {
            database_url,
            port,
            server_no,
            admin_password,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }
}

/// The username reserved for the administrative account.
pub const ADMIN_USERNAME: &str = "admin";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cli_value() {
        let args: Vec<String> = vec!["prog".into(), "--port".into(), "8080".into()];
        assert_eq!(
            Config::parse_cli_value(&args, "--port"),
            Some("8080".to_string())
        );
        assert_eq!(Config::parse_cli_value(&args, "--missing"), None);
    }
}
