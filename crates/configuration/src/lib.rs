// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::StorageSettings;

/// Loads storage settings from the `trestle.toml` file and the environment.
///
/// This function is the primary entry point for this crate. A `.env` file is
/// loaded first if present, then the optional `trestle.toml`, then any
/// `TRESTLE_*` environment variables; `DATABASE_URL` serves as a fallback
/// for `database_url` so deployments that only export the standard variable
/// keep working.
pub fn load_settings() -> Result<StorageSettings, ConfigError> {
    // A missing .env file is fine; explicit environment variables still apply.
    dotenvy::dotenv().ok();

    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("trestle").required(false))
        .add_source(config::Environment::with_prefix("TRESTLE"));

    if let Ok(url) = std::env::var("DATABASE_URL") {
        builder = builder.set_override("database_url", url)?;
    }

    let settings = builder.build()?.try_deserialize::<StorageSettings>()?;

    if settings.database_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "database_url must be set".to_string(),
        ));
    }

    Ok(settings)
}
