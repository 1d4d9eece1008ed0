//! Connection-profile resolution for the results database
//!
//! Resolution looks at the process environment and a best-effort
//! reachability probe of the shared results endpoint, then settles on
//! one of three profiles: the primary shared endpoint, the CI fallback
//! (environment-provided overrides) or the local fallback (hardcoded
//! localhost defaults). Resolution itself never fails; an unreachable
//! endpoint only downgrades the choice.

use once_cell::sync::OnceCell;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::time::Duration;

/// Default host of the team results endpoint
const DEFAULT_PRIMARY_HOST: &str = "qa-results.internal";

/// Default port of the team results endpoint
const DEFAULT_PRIMARY_PORT: u16 = 3306;

/// Reachability probe timeout. Short on purpose: an endpoint that
/// cannot accept a connection quickly is treated as absent.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Connection descriptor for the results database.
///
/// The embedded engine only consumes `database` (as the file stem under
/// `data_dir`), but the full descriptor is resolved and kept so a run
/// is attributable to the endpoint it targeted and so operators can see
/// which profile won.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
    pub autocommit: bool,
    pub data_dir: PathBuf,
}

impl ConnectionProfile {
    /// Path of the database file this profile writes to
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.database))
    }
}

/// Environment lookup used by the resolver. Injectable so resolution
/// stays testable without mutating process-global state.
pub(crate) type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn env_or(env: EnvLookup<'_>, key: &str, default: &str) -> String {
    env(key).unwrap_or_else(|| default.to_string())
}

fn env_port(env: EnvLookup<'_>, key: &str, default: u16) -> u16 {
    env(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Whether this process runs under CI. A single boolean signal decides
/// which fallback defaults apply.
fn ci_flag(env: EnvLookup<'_>) -> bool {
    matches!(
        env("CI").as_deref(),
        Some("true") | Some("1") | Some("TRUE")
    )
}

/// Best-effort TCP probe. Resolution and connection failures both mean
/// "unreachable"; this function cannot error.
fn endpoint_reachable(host: &str, port: u16, timeout: Duration) -> bool {
    match (host, port).to_socket_addrs() {
        Ok(mut addrs) => addrs
            .next()
            .map(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
            .unwrap_or(false),
        Err(_) => false,
    }
}

fn primary(env: EnvLookup<'_>, host: String, port: u16) -> ConnectionProfile {
    ConnectionProfile {
        host,
        port,
        user: env_or(env, "SHELFCHECK_DB_USER", "qa_writer"),
        password: env_or(env, "SHELFCHECK_DB_PASSWORD", ""),
        database: env_or(env, "SHELFCHECK_DB_NAME", "shelfcheck_results"),
        connect_timeout: PROBE_TIMEOUT,
        autocommit: true,
        data_dir: env("SHELFCHECK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("/mnt/qa-results")),
    }
}

fn ci_fallback(env: EnvLookup<'_>) -> ConnectionProfile {
    ConnectionProfile {
        host: env_or(env, "SHELFCHECK_DB_HOST", "127.0.0.1"),
        port: env_port(env, "SHELFCHECK_DB_PORT", DEFAULT_PRIMARY_PORT),
        user: env_or(env, "SHELFCHECK_DB_USER", "runner"),
        password: env_or(env, "SHELFCHECK_DB_PASSWORD", ""),
        database: env_or(env, "SHELFCHECK_DB_NAME", "shelfcheck_results"),
        connect_timeout: PROBE_TIMEOUT,
        autocommit: true,
        data_dir: env("SHELFCHECK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("test-results")),
    }
}

fn local_fallback() -> ConnectionProfile {
    ConnectionProfile {
        host: "127.0.0.1".to_string(),
        port: DEFAULT_PRIMARY_PORT,
        user: "root".to_string(),
        password: "root".to_string(),
        database: "shelfcheck_results".to_string(),
        connect_timeout: PROBE_TIMEOUT,
        autocommit: true,
        data_dir: crate::default_data_dir(),
    }
}

fn resolve_with(env: EnvLookup<'_>, primary_reachable: bool) -> ConnectionProfile {
    let host = env_or(env, "SHELFCHECK_DB_HOST", DEFAULT_PRIMARY_HOST);
    let port = env_port(env, "SHELFCHECK_DB_PORT", DEFAULT_PRIMARY_PORT);

    if primary_reachable {
        tracing::debug!("results endpoint {}:{} reachable, using primary profile", host, port);
        primary(env, host, port)
    } else if ci_flag(env) {
        tracing::debug!("results endpoint unreachable under CI, using CI fallback profile");
        ci_fallback(env)
    } else {
        tracing::debug!("results endpoint unreachable, using local fallback profile");
        local_fallback()
    }
}

/// Resolve a connection profile from the current environment.
///
/// Probes the configured primary endpoint once; never returns an error.
pub fn resolve_profile() -> ConnectionProfile {
    let env = |key: &str| std::env::var(key).ok();
    let host = env_or(&env, "SHELFCHECK_DB_HOST", DEFAULT_PRIMARY_HOST);
    let port = env_port(&env, "SHELFCHECK_DB_PORT", DEFAULT_PRIMARY_PORT);
    let reachable = endpoint_reachable(&host, port, PROBE_TIMEOUT);
    resolve_with(&env, reachable)
}

/// Process-wide cached profile. Resolution (including the probe) runs
/// once; later callers get the same descriptor.
pub fn profile() -> &'static ConnectionProfile {
    static PROFILE: OnceCell<ConnectionProfile> = OnceCell::new();
    PROFILE.get_or_init(resolve_profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::TcpListener;

    fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reachable_endpoint_selects_primary() {
        let vars = env_map(&[("SHELFCHECK_DB_HOST", "results.example")]);
        let env = |key: &str| vars.get(key).cloned();
        let profile = resolve_with(&env, true);
        assert_eq!(profile.host, "results.example");
        assert_eq!(profile.data_dir, PathBuf::from("/mnt/qa-results"));
    }

    #[test]
    fn test_unreachable_ci_uses_env_overrides() {
        let vars = env_map(&[
            ("CI", "true"),
            ("SHELFCHECK_DB_NAME", "nightly_results"),
            ("SHELFCHECK_DATA_DIR", "/tmp/ci-results"),
        ]);
        let env = |key: &str| vars.get(key).cloned();
        let profile = resolve_with(&env, false);
        assert_eq!(profile.database, "nightly_results");
        assert_eq!(
            profile.db_path(),
            PathBuf::from("/tmp/ci-results/nightly_results.db")
        );
    }

    #[test]
    fn test_unreachable_local_uses_hardcoded_defaults() {
        let env = |_: &str| None;
        let profile = resolve_with(&env, false);
        assert_eq!(profile.host, "127.0.0.1");
        assert_eq!(profile.port, 3306);
        assert_eq!(profile.user, "root");
        assert_eq!(profile.database, "shelfcheck_results");
        assert!(profile.autocommit);
    }

    #[test]
    fn test_probe_never_errors() {
        // Live listener is reachable
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(endpoint_reachable("127.0.0.1", port, Duration::from_secs(1)));

        // Closed port and bogus hostname both degrade to false
        drop(listener);
        assert!(!endpoint_reachable("host.invalid.", 1, Duration::from_millis(200)));
    }
}
