use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Which identity provider adapter handles authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProviderKind {
    Supabase,
    Firebase,
}

impl AuthProviderKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "firebase" => Ok(Self::Firebase),
            other => bail!("AUTH_PROVIDER must be 'supabase' or 'firebase', got '{other}'"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    /// Enables admin account creation (`/admin/users`) instead of public sign-up.
    pub service_role_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_url: String,
    pub token_url: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub auth_provider: AuthProviderKind,
    pub supabase: Option<SupabaseConfig>,
    pub firebase: Option<FirebaseConfig>,
    pub password_reset_redirect_url: Option<String>,
    pub provider_timeout: Duration,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub media_public_url: String,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

const DEFAULT_FIREBASE_AUTH_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_FIREBASE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let auth_provider = match lookup("AUTH_PROVIDER") {
            Some(raw) => AuthProviderKind::parse(&raw)?,
            None => AuthProviderKind::Supabase,
        };

        let supabase = match auth_provider {
            AuthProviderKind::Supabase => Some(SupabaseConfig {
                url: require("SUPABASE_URL")?.trim_end_matches('/').to_string(),
                anon_key: require("SUPABASE_ANON_KEY")?,
                service_role_key: lookup("SUPABASE_SERVICE_ROLE_KEY").filter(|v| !v.is_empty()),
            }),
            AuthProviderKind::Firebase => None,
        };

        let firebase = match auth_provider {
            AuthProviderKind::Firebase => Some(FirebaseConfig {
                api_key: require("FIREBASE_API_KEY")?,
                auth_url: lookup("FIREBASE_AUTH_URL")
                    .unwrap_or_else(|| DEFAULT_FIREBASE_AUTH_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                token_url: lookup("FIREBASE_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_FIREBASE_TOKEN_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
            }),
            AuthProviderKind::Supabase => None,
        };

        let password_reset_redirect_url = lookup("PASSWORD_RESET_REDIRECT_URL").or_else(|| {
            lookup("FRONTEND_URL")
                .map(|frontend| format!("{}/reset-password", frontend.trim_end_matches('/')))
        });

        let provider_timeout = Duration::from_secs(
            lookup("PROVIDER_TIMEOUT_SECS")
                .unwrap_or_else(|| "10".to_string())
                .parse::<u64>()
                .context("PROVIDER_TIMEOUT_SECS must be a whole number of seconds")?,
        );

        let s3_bucket = require("S3_BUCKET")?;
        let s3_endpoint = require("S3_ENDPOINT")?.trim_end_matches('/').to_string();
        let media_public_url = lookup("MEDIA_PUBLIC_URL")
            .unwrap_or_else(|| format!("{s3_endpoint}/{s3_bucket}"))
            .trim_end_matches('/')
            .to_string();

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            auth_provider,
            supabase,
            firebase,
            password_reset_redirect_url,
            provider_timeout,
            s3_bucket,
            s3_endpoint,
            s3_region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            media_public_url,
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|| (10 * 1024 * 1024).to_string())
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a number of bytes")?,
            port: lookup("PORT")
                .unwrap_or_else(|| "4000".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("DATABASE_URL", "postgres://localhost/questline"),
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("S3_BUCKET", "media"),
            ("S3_ENDPOINT", "http://localhost:9000"),
            ("AWS_ACCESS_KEY_ID", "minio"),
            ("AWS_SECRET_ACCESS_KEY", "minio123"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults_to_supabase() {
        let config = load(&base_vars()).unwrap();
        assert_eq!(config.auth_provider, AuthProviderKind::Supabase);
        let supabase = config.supabase.unwrap();
        assert_eq!(supabase.url, "https://project.supabase.co");
        assert!(supabase.service_role_key.is_none());
        assert!(config.firebase.is_none());
        assert_eq!(config.port, 4000);
        assert_eq!(config.provider_timeout, Duration::from_secs(10));
        assert_eq!(config.media_public_url, "http://localhost:9000/media");
    }

    #[test]
    fn test_firebase_requires_api_key() {
        let mut vars = base_vars();
        vars.insert("AUTH_PROVIDER", "firebase");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("FIREBASE_API_KEY"));

        vars.insert("FIREBASE_API_KEY", "key");
        let config = load(&vars).unwrap();
        let firebase = config.firebase.unwrap();
        assert_eq!(firebase.auth_url, DEFAULT_FIREBASE_AUTH_URL);
        assert!(config.supabase.is_none());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut vars = base_vars();
        vars.insert("AUTH_PROVIDER", "auth0");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_reset_redirect_falls_back_to_frontend_url() {
        let mut vars = base_vars();
        vars.insert("FRONTEND_URL", "https://app.example.com/");
        let config = load(&vars).unwrap();
        assert_eq!(
            config.password_reset_redirect_url.as_deref(),
            Some("https://app.example.com/reset-password")
        );
    }

    #[test]
    fn test_missing_database_url() {
        let mut vars = base_vars();
        vars.remove("DATABASE_URL");
        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
