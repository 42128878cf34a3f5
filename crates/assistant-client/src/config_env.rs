use crate::config::ConfigError;

pub(crate) type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn optional_trimmed_env(lookup: EnvLookup<'_>, key: &str) -> Option<String> {
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn parse_u64_env(
    lookup: EnvLookup<'_>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    Ok(parse_optional_u64_env(lookup, key)?.unwrap_or(default))
}

pub(crate) fn parse_optional_u64_env(
    lookup: EnvLookup<'_>,
    key: &str,
) -> Result<Option<u64>, ConfigError> {
    match optional_trimmed_env(lookup, key) {
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::ParseInt {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}
