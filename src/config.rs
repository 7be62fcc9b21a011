use std::path::PathBuf;

pub const STORE_ENV: &str = "PRIO_STORE";
pub const LEGACY_STORE_ENV: &str = "PRIO_LEGACY_STORE";
pub const LOG_ENV: &str = "PRIO_LOG";

pub const DEFAULT_STORE_FILE: &str = "tasks_store.json";
pub const DEFAULT_LEGACY_FILE: &str = "tasks.json";

/// Where the task store and the legacy task list live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub legacy_path: PathBuf,
}

/// Read a path from the environment, ignoring empty values.
fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

impl Config {
    /// Resolve each path from the CLI flag, then the environment, then the
    /// default file name in the working directory.
    pub fn resolve(store: Option<PathBuf>, legacy: Option<PathBuf>) -> Self {
        Self {
            store_path: store
                .or_else(|| env_path(STORE_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE)),
            legacy_path: legacy
                .or_else(|| env_path(LEGACY_STORE_ENV))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LEGACY_FILE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-var tests must not run concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn resolve_precedence() {
        let _guard = ENV_LOCK.lock().unwrap();

        unsafe { std::env::remove_var(STORE_ENV) };
        unsafe { std::env::remove_var(LEGACY_STORE_ENV) };
        let defaults = Config::resolve(None, None);
        assert_eq!(defaults.store_path, PathBuf::from(DEFAULT_STORE_FILE));
        assert_eq!(defaults.legacy_path, PathBuf::from(DEFAULT_LEGACY_FILE));

        unsafe { std::env::set_var(STORE_ENV, "/srv/prio/store.json") };
        unsafe { std::env::set_var(LEGACY_STORE_ENV, "") };
        let from_env = Config::resolve(None, None);
        assert_eq!(from_env.store_path, PathBuf::from("/srv/prio/store.json"));
        assert_eq!(from_env.legacy_path, PathBuf::from(DEFAULT_LEGACY_FILE));

        let from_flag = Config::resolve(Some("flag.json".into()), Some("old.json".into()));
        assert_eq!(from_flag.store_path, PathBuf::from("flag.json"));
        assert_eq!(from_flag.legacy_path, PathBuf::from("old.json"));

        unsafe { std::env::remove_var(STORE_ENV) };
        unsafe { std::env::remove_var(LEGACY_STORE_ENV) };
    }
}
