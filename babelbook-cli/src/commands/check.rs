//! Check command implementation

use anyhow::{bail, Result};
use babelbook_core::config::{ProviderKind, TranslationConfig};
use babelbook_core::gateway::{validate_config, ProviderGateway, TextTranslator};
use babelbook_core::prompt::DEFAULT_SYSTEM_PROMPT;
use std::path::Path;

/// Check provider configuration, optionally with a live probe
pub async fn check(provider: Option<&str>, config_path: Option<&str>, live: bool) -> Result<()> {
    let config = TranslationConfig::load_or_default(config_path.map(Path::new))?;
    let kind = match provider {
        Some(name) => name.parse::<ProviderKind>()?,
        None => config.default_provider,
    };
    let provider_config = config.provider_config(kind);

    match validate_config(kind, &provider_config) {
        Ok(()) => {
            println!("Configuration for {} is complete", kind);
            println!("  base_url: {}", provider_config.base_url);
            println!("  model:    {}", provider_config.model);
            println!("  api_key:  set");
        }
        Err(e) => {
            eprintln!("Configuration for {} is incomplete: {}", kind, e);
            bail!("Configuration check failed for {}", kind);
        }
    }

    if live {
        let gateway = ProviderGateway::new(kind, provider_config, DEFAULT_SYSTEM_PROMPT)?;
        if gateway.is_available().await {
            println!("Provider {} answered the probe", kind);
        } else {
            bail!("Provider {} did not answer the probe", kind);
        }
    }

    Ok(())
}
