use crate::error::AppError;
use crate::models::AppSettings;
use photo_store::{EnhancementSettings, PhotoStore, ProviderSettings, RemoteHost};
use tokio_util::sync::CancellationToken;

/// Key of the app settings blob in the settings collection
pub const SETTINGS_KEY: &str = "settings";

/// Loads the app settings, falling back to defaults when none are stored
pub async fn load_settings(store: &PhotoStore) -> Result<AppSettings, AppError> {
    Ok(store
        .get_setting::<AppSettings>(SETTINGS_KEY)
        .await?
        .unwrap_or_default())
}

pub async fn save_settings(store: &PhotoStore, settings: &AppSettings) -> Result<(), AppError> {
    store.put_setting(SETTINGS_KEY, settings).await?;
    log::debug!("App settings saved");
    Ok(())
}

/// Validates and stores new enhancement strengths
pub async fn update_enhancement(
    store: &PhotoStore,
    enhancement: EnhancementSettings,
) -> Result<AppSettings, AppError> {
    for (name, value) in [
        ("sharpness", enhancement.sharpness),
        ("denoise", enhancement.denoise),
        ("contrast", enhancement.contrast),
    ] {
        if value > 100 {
            return Err(AppError::Validation(format!(
                "{} must be between 0 and 100",
                name
            )));
        }
    }

    let mut settings = load_settings(store).await?;
    settings.enhancement = enhancement;
    save_settings(store, &settings).await?;
    Ok(settings)
}

/// Merges provider fields, re-validates with the host and selects it.
///
/// Any change resets `is_validated` until the host accepts the new fields.
pub async fn configure_provider(
    store: &PhotoStore,
    host: &dyn RemoteHost,
    fields: serde_json::Map<String, serde_json::Value>,
    auto_upload: Option<bool>,
    cancel: &CancellationToken,
) -> Result<ProviderSettings, AppError> {
    let mut settings = load_settings(store).await?;
    let provider = settings.cloud.provider_mut(host.id());
    provider.fields.extend(fields);
    if let Some(auto_upload) = auto_upload {
        provider.auto_upload = auto_upload;
    }

    let validation = host.validate(provider, cancel).await;
    provider.is_validated = validation.valid;
    let provider = provider.clone();
    settings.cloud.selected_provider = Some(host.id().to_string());
    save_settings(store, &settings).await?;

    match validation.error {
        Some(error) if !validation.valid => {
            log::warn!("Provider {} rejected settings: {}", host.id(), error);
            Err(AppError::Validation(error))
        }
        _ => {
            log::info!("Provider {} validated", host.id());
            Ok(provider)
        }
    }
}
