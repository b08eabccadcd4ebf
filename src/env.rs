use lazy_static::lazy_static;
use std::env;

lazy_static! {
    pub static ref ENV_CONFIG: EnvConfig = get_env_config();
}

pub struct EnvConfig {
    /// Execution node JSON-RPC endpoint.
    pub execution_url: Option<String>,
    /// Credential passed to the execution node as an apiKey query parameter.
    pub execution_api_key: Option<String>,
    pub flashbots_url: Option<String>,
    pub ultrasound_url: Option<String>,
    /// Inclusive ranges to process, e.g. "16000000-16000300,16010300-16010300".
    pub block_ranges: Option<String>,
    pub report_path: Option<String>,
    pub request_interval_millis: Option<u64>,
    pub retry_max_attempts: Option<u32>,
    pub retry_backoff_millis: Option<u64>,
    pub log_json: bool,
}

pub fn get_env_var(name: &str) -> Option<String> {
    match env::var(name) {
        Err(env::VarError::NotPresent) => None,
        Err(err) => panic!("{err}"),
        Ok(value) => Some(value),
    }
}

pub fn get_env_bool(name: &str) -> bool {
    get_env_var(name).map_or(false, |value| value.to_lowercase() == "true")
}

fn get_env_u64(name: &str) -> Option<u64> {
    get_env_var(name).map(|value| {
        value
            .parse()
            .unwrap_or_else(|err| panic!("failed to parse {name}: {err}"))
    })
}

fn get_env_u32(name: &str) -> Option<u32> {
    get_env_var(name).map(|value| {
        value
            .parse()
            .unwrap_or_else(|err| panic!("failed to parse {name}: {err}"))
    })
}

fn get_env_config() -> EnvConfig {
    EnvConfig {
        execution_url: get_env_var("EXECUTION_URL"),
        execution_api_key: get_env_var("EXECUTION_API_KEY"),
        flashbots_url: get_env_var("FLASHBOTS_RELAY_URL"),
        ultrasound_url: get_env_var("ULTRASOUND_RELAY_URL"),
        block_ranges: get_env_var("BLOCK_RANGES"),
        report_path: get_env_var("REPORT_PATH"),
        request_interval_millis: get_env_u64("REQUEST_INTERVAL_MILLIS"),
        retry_max_attempts: get_env_u32("RETRY_MAX_ATTEMPTS"),
        retry_backoff_millis: get_env_u64("RETRY_BACKOFF_MILLIS"),
        log_json: get_env_bool("LOG_JSON"),
    }
}
