//! Allow-list assembly and the origin decision.
//!
//! The effective allow-list is built once from three sources, in order:
//! 1. explicit [`SmartCorsOptions::allowed_origins`]
//! 2. the comma-separated list carried by [`Environment::allowed_origins`]
//! 3. local development origins, unless running in production
//!
//! After construction the list is read-only; every decision is a pure function
//! of the request origin.

use crate::config::AppEnv;
use crate::error::AppError;
use crate::matcher::{AllowListEntry, match_origin};

/// Origins appended outside production.
pub const LOCAL_DEV_ORIGINS: [&str; 3] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:5174",
];

#[derive(Clone, Debug, Default)]
pub struct SmartCorsOptions {
    pub allowed_origins: Vec<AllowListEntry>,
    pub allow_credentials: bool,
    pub debug: bool,
}

/// Process-level inputs to the allow-list, resolved by the caller.
#[derive(Clone, Debug)]
pub struct Environment {
    pub allowed_origins: Option<String>,
    pub app_env: AppEnv,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Resolve `ALLOWED_ORIGINS` and `APP_ENV` through `lookup`.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            allowed_origins: lookup("ALLOWED_ORIGINS"),
            app_env: lookup("APP_ENV")
                .map(|v| AppEnv::parse(&v))
                .unwrap_or(AppEnv::Development),
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            allowed_origins: None,
            app_env: AppEnv::Development,
        }
    }
}

/// Split a comma-separated origin list, trimming each item and dropping empties.
pub fn parse_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug)]
pub struct OriginPolicy {
    allow_list: Vec<AllowListEntry>,
    allow_credentials: bool,
}

impl OriginPolicy {
    pub fn new(options: &SmartCorsOptions, env: &Environment) -> Self {
        let mut allow_list = options.allowed_origins.clone();

        if let Some(raw) = env.allowed_origins.as_deref() {
            allow_list.extend(parse_origin_list(raw).into_iter().map(AllowListEntry::from));
        }

        if !env.app_env.is_production() {
            allow_list.extend(LOCAL_DEV_ORIGINS.iter().copied().map(AllowListEntry::from));
        }

        if options.debug {
            let origins: Vec<String> = allow_list.iter().map(ToString::to_string).collect();
            tracing::info!(?origins, "[smartcors] allowed origins");
        }

        Self {
            allow_list,
            allow_credentials: options.allow_credentials,
        }
    }

    pub fn allow_list(&self) -> &[AllowListEntry] {
        &self.allow_list
    }

    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    /// Requests without an origin (same-origin navigations, curl, server-to-server)
    /// are always allowed.
    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => match_origin(origin, &self.allow_list),
        }
    }

    pub fn decide(&self, origin: Option<&str>) -> Result<(), AppError> {
        if self.is_allowed(origin) {
            Ok(())
        } else {
            Err(AppError::OriginRejected)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Build a policy under a scoped subscriber and return the formatted log lines.
    fn build_capturing(options: &SmartCorsOptions, env: &Environment) -> Vec<String> {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            OriginPolicy::new(options, env);
        });

        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn production(allowed_origins: Option<&str>) -> Environment {
        Environment {
            allowed_origins: allowed_origins.map(str::to_string),
            app_env: AppEnv::Production,
        }
    }

    fn development(allowed_origins: Option<&str>) -> Environment {
        Environment {
            allowed_origins: allowed_origins.map(str::to_string),
            app_env: AppEnv::Development,
        }
    }

    fn texts(policy: &OriginPolicy) -> Vec<&str> {
        policy.allow_list().iter().map(AllowListEntry::as_str).collect()
    }

    #[test]
    fn parse_origin_list_trims_and_drops_empty_items() {
        assert_eq!(
            parse_origin_list(" https://a.example , https://b.example,, ,*.c.example "),
            vec!["https://a.example", "https://b.example", "*.c.example"]
        );
        assert!(parse_origin_list("").is_empty());
    }

    #[test]
    fn production_uses_explicit_then_env_origins() {
        let options = SmartCorsOptions {
            allowed_origins: vec!["https://app.example".into()],
            ..Default::default()
        };
        let env = production(Some("https://a.example, *.b.example"));
        let policy = OriginPolicy::new(&options, &env);

        assert_eq!(
            texts(&policy),
            vec!["https://app.example", "https://a.example", "*.b.example"]
        );
        assert!(matches!(policy.allow_list()[2], AllowListEntry::Wildcard(_)));
    }

    #[test]
    fn development_appends_local_origins() {
        let env = development(Some("https://a.example"));
        let policy = OriginPolicy::new(&SmartCorsOptions::default(), &env);

        assert_eq!(
            texts(&policy),
            vec![
                "https://a.example",
                "http://localhost:3000",
                "http://localhost:5173",
                "http://localhost:5174",
            ]
        );
    }

    #[test]
    fn production_does_not_allow_localhost() {
        let policy = OriginPolicy::new(&SmartCorsOptions::default(), &production(None));

        assert!(policy.allow_list().is_empty());
        assert!(!policy.is_allowed(Some("http://localhost:3000")));
    }

    #[test]
    fn missing_origin_is_always_allowed() {
        let policy = OriginPolicy::new(&SmartCorsOptions::default(), &production(None));

        assert!(policy.is_allowed(None));
        assert!(policy.decide(None).is_ok());
    }

    #[test]
    fn rejection_carries_fixed_message() {
        let policy = OriginPolicy::new(&SmartCorsOptions::default(), &production(None));

        let err = policy.decide(Some("https://evil.example")).unwrap_err();
        assert!(matches!(err, AppError::OriginRejected));
        assert_eq!(err.to_string(), "Not allowed by smartcors");
    }

    #[test]
    fn explicit_patterns_participate() {
        let options = SmartCorsOptions {
            allowed_origins: vec![AllowListEntry::pattern(r"\.mydomain\.com$").unwrap()],
            ..Default::default()
        };
        let policy = OriginPolicy::new(&options, &production(None));

        assert!(policy.decide(Some("https://shop.mydomain.com")).is_ok());
        assert!(policy.decide(Some("https://shop.otherdomain.com")).is_err());
    }

    #[test]
    fn debug_logs_the_allow_list_once() {
        let options = SmartCorsOptions {
            allowed_origins: vec![
                "https://app.example".into(),
                AllowListEntry::pattern(r"\.mydomain\.com$").unwrap(),
            ],
            debug: true,
            ..Default::default()
        };
        let lines = build_capturing(&options, &production(Some("*.b.example")));

        let dumps: Vec<&String> = lines
            .iter()
            .filter(|l| l.contains("[smartcors] allowed origins"))
            .collect();
        assert_eq!(dumps.len(), 1, "{lines:?}");
        assert!(dumps[0].contains("INFO"));
        assert!(dumps[0].contains("https://app.example"));
        // `?origins` renders through Debug, which escapes backslashes.
        assert!(dumps[0].contains(r"/\\.mydomain\\.com$/"));
        assert!(dumps[0].contains("*.b.example"));
    }

    #[test]
    fn no_log_without_debug() {
        let options = SmartCorsOptions {
            allowed_origins: vec!["https://app.example".into()],
            ..Default::default()
        };
        let lines = build_capturing(&options, &production(None));

        assert!(lines.is_empty(), "{lines:?}");
    }

    #[test]
    fn environment_from_vars_reads_origins_and_mode() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ALLOWED_ORIGINS", " https://a.example ,*.b.example"),
            ("APP_ENV", "Production"),
        ]);
        let env = Environment::from_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            env.allowed_origins.as_deref(),
            Some(" https://a.example ,*.b.example")
        );
        assert_eq!(env.app_env, AppEnv::Production);

        let policy = OriginPolicy::new(&SmartCorsOptions::default(), &env);
        assert_eq!(texts(&policy), vec!["https://a.example", "*.b.example"]);
    }

    #[test]
    fn environment_from_vars_defaults_to_development() {
        let env = Environment::from_vars(|_| None);

        assert!(env.allowed_origins.is_none());
        assert_eq!(env.app_env, AppEnv::Development);
    }

    #[test]
    fn credentials_flag_is_forwarded() {
        let options = SmartCorsOptions {
            allow_credentials: true,
            debug: true,
            ..Default::default()
        };
        let policy = OriginPolicy::new(&options, &Environment::default());

        assert!(policy.allow_credentials());

        let policy = OriginPolicy::new(&SmartCorsOptions::default(), &Environment::default());
        assert!(!policy.allow_credentials());
    }
}
