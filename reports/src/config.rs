use anyhow::anyhow;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf};

use crate::api::RequestContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub company_id: Option<String>,
    pub access_token: Option<String>,
    pub time_zone: Tz,
    pub export_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_base_url =
            non_empty("API_BASE_URL").unwrap_or_else(|| "http://localhost:3000/api".to_string());
        let company_id = non_empty("COMPANY_ID");
        let access_token = non_empty("API_ACCESS_TOKEN");

        let time_zone_name = non_empty("APP_TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let time_zone: Tz = time_zone_name
            .parse()
            .map_err(|_| anyhow!("Invalid APP_TIMEZONE value: {}", time_zone_name))?;

        let export_dir = non_empty("EXPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Config {
            api_base_url,
            company_id,
            access_token,
            time_zone,
            export_dir,
        })
    }

    pub fn request_context(&self) -> RequestContext {
        let mut context = RequestContext::new(self.api_base_url.as_str());
        if let Some(company_id) = &self.company_id {
            context = context.with_company(company_id.as_str());
        }
        if let Some(token) = &self.access_token {
            context = context.with_access_token(token.as_str());
        }
        context
    }
}
