use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}

/// Credentials and target bucket for the R2 account.
#[derive(Debug, Clone)]
pub struct R2Config {
    pub account_id: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

impl R2Config {
    /// S3-compatible endpoint for the account.
    pub fn endpoint_url(&self) -> String {
        format!("https://{}.r2.cloudflarestorage.com", self.account_id)
    }
}

/// Supabase project URL and anon key for the metadata recorder.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub r2: R2Config,
    /// Absent when the Supabase variables are not set; metadata saves are
    /// skipped in that case.
    pub supabase: Option<SupabaseConfig>,
    /// Host serving the bucket publicly, used to build public URLs.
    pub public_domain: Option<String>,
    pub user_id: String,
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// The variable names match the ones the rest of the project keeps in its
    /// `.env`, including the `NEXT_PUBLIC_` prefixes. Empty values count as
    /// unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let r2 = R2Config {
            account_id: require("R2_ACCOUNT_ID")?,
            access_key_id: require("R2_ACCESS_KEY_ID")?,
            secret_access_key: require("R2_SECRET_ACCESS_KEY")?,
            bucket: require("R2_BUCKET_NAME")?,
        };

        let supabase = match (
            optional("NEXT_PUBLIC_SUPABASE_URL"),
            optional("NEXT_PUBLIC_SUPABASE_ANON_KEY"),
        ) {
            (Some(url), Some(anon_key)) => Some(SupabaseConfig { url, anon_key }),
            _ => None,
        };

        Ok(Self {
            r2,
            supabase,
            public_domain: optional("NEXT_PUBLIC_R2_PUBLIC_DOMAIN"),
            user_id: optional("USER_ID").unwrap_or_else(|| "test-user".to_string()),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
