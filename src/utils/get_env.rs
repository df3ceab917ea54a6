use anyhow::{Error, anyhow};
use dotenv::dotenv;
use std::env;
use std::str::FromStr;

pub fn lookup_env_var(key: &str) -> Option<String> {
    dotenv().ok();
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses `key` from `lookup`, falling back to `default` when it is unset.
pub fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("invalid value for {key} ({raw:?}): {e}")),
        None => Ok(default),
    }
}
