use serde::{Deserialize, Serialize};

use crate::image2text::OcrError;

const NANONETS_URL_TEMPLATE: &str = "https://app.nanonets.com/api/v2/OCR/Model/{}/LabelFile/";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl RemoteConfig {
    pub fn new(url: Option<String>, api_key: Option<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            url,
            api_key,
            timeout_secs,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source, env-var names as keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let url = get("SCRIBESCAN_OCR_URL").or_else(|| {
            get("NANONETS_MODEL_ID").map(|model_id| NANONETS_URL_TEMPLATE.replace("{}", &model_id))
        });
        let api_key = get("SCRIBESCAN_OCR_API_KEY").or_else(|| get("NANONETS_API_KEY"));
        let timeout_secs = get("SCRIBESCAN_OCR_TIMEOUT_SECS").and_then(|v| match v.parse::<u64>() {
            Ok(secs) => Some(secs),
            Err(_) => {
                log::warn!("Ignoring invalid SCRIBESCAN_OCR_TIMEOUT_SECS: {}", v);
                None
            }
        });

        Self {
            url,
            api_key,
            timeout_secs,
        }
    }

    pub fn get_default_timeout_secs() -> u64 {
        30
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(Self::get_default_timeout_secs()))
    }

    pub fn is_configured(&self) -> bool {
        self.unpack().is_ok()
    }

    pub fn unpack(&self) -> Result<(&str, Option<&str>), OcrError> {
        let url = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| OcrError::Configuration("no OCR endpoint URL set".to_string()))?;

        Ok((url, self.api_key.as_deref()))
    }
}
