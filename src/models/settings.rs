use photo_store::{EnhancementSettings, ProviderSettings};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Cloud upload configuration: the selected host plus settings per host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CloudSettings {
    pub selected_provider: Option<String>,
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl CloudSettings {
    /// Settings of the selected provider, if one is selected and configured
    pub fn selected(&self) -> Option<(&str, &ProviderSettings)> {
        let id = self.selected_provider.as_deref()?;
        self.providers.get(id).map(|settings| (id, settings))
    }

    pub fn provider_mut(&mut self, id: &str) -> &mut ProviderSettings {
        self.providers.entry(id.to_string()).or_default()
    }
}

/// User settings, stored as one JSON blob in the settings collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub enhancement: EnhancementSettings,
    pub cloud: CloudSettings,
    /// Wait this long after the shutter before processing (0 = off)
    pub stabilization_delay_ms: u64,
}

impl AppSettings {
    pub fn stabilization_delay(&self) -> Option<Duration> {
        (self.stabilization_delay_ms > 0)
            .then(|| Duration::from_millis(self.stabilization_delay_ms))
    }
}
