// =============================================================================
// Configuration — environment-driven service settings
// =============================================================================
//
// Two knobs only: where the local prediction service lives and where the REST
// surface binds. The exchange endpoint is fixed. Values come from the
// environment (with `.env` support via dotenv in main), falling back to
// defaults suitable for local development.

const DEFAULT_PREDICTOR_URL: &str = "http://localhost:8000";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";

/// Service configuration resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the local prediction service.
    pub predictor_url: String,
    /// Address the REST API binds to.
    pub bind_addr: String,
}

impl Config {
    /// Resolve configuration from the environment.
    pub fn from_env() -> Self {
        let predictor_url = std::env::var("PULSE_PREDICTOR_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_PREDICTOR_URL.to_string());

        let bind_addr = std::env::var("PULSE_BIND_ADDR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Self {
            predictor_url,
            bind_addr,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            predictor_url: DEFAULT_PREDICTOR_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_services() {
        let cfg = Config::default();
        assert_eq!(cfg.predictor_url, "http://localhost:8000");
        assert_eq!(cfg.bind_addr, "0.0.0.0:3001");
    }
}
