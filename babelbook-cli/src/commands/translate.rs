//! Translate command implementation

use anyhow::{Context, Result};
use babelbook_core::config::{ProviderKind, TranslationConfig};
use babelbook_core::gateway::{validate_config, ProviderGateway};
use babelbook_core::orchestrator::{BatchTranslator, CancelFlag};
use babelbook_core::prompt::{load_system_prompt, DEFAULT_SYSTEM_PROMPT};
use babelbook_core::registry::MemoryRegistry;
use babelbook_core::service::TranslationService;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

pub struct TranslateArgs {
    pub input: String,
    pub output_dir: String,
    pub provider: Option<String>,
    pub batch_size: Option<usize>,
    pub config: Option<String>,
    pub prompt: Option<String>,
    pub skip_probe: bool,
}

/// Translate an EPUB and write the result into the output directory
pub async fn translate(args: TranslateArgs) -> Result<()> {
    let input_path = Path::new(&args.input);
    let output_dir = Path::new(&args.output_dir);

    let config = TranslationConfig::load_or_default(args.config.as_deref().map(Path::new))?;
    let kind = match &args.provider {
        Some(name) => name.parse::<ProviderKind>()?,
        None => config.default_provider,
    };
    let provider_config = config.provider_config(kind);

    // Fail on incomplete configuration before any work is done
    validate_config(kind, &provider_config)?;

    let system_prompt = match args.prompt.as_deref() {
        Some(path) => load_system_prompt(Path::new(path)),
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    };
    let batch_size = args.batch_size.unwrap_or(config.batch_size);

    // One flag shared by the signal handler, the gateway, and the orchestrator
    let cancel = CancelFlag::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current batch");
            interrupt.cancel();
        }
    });

    let gateway = ProviderGateway::new(kind, provider_config.clone(), system_prompt)?
        .with_cancel_flag(cancel.clone());

    // Set up progress bar over completion percentage
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("##-"),
    );

    let bar = pb.clone();
    let orchestrator = BatchTranslator::new(batch_size, provider_config.batch_chars)
        .with_cancel_flag(cancel)
        .with_progress(move |progress| {
            bar.set_position(progress.percent.round() as u64);
            bar.set_message(format!(
                "{}/{} pages",
                progress.translated_pages, progress.total_pages
            ));
        });

    let service = TranslationService::new(Arc::new(MemoryRegistry::new()));
    let report = service
        .translate_epub(
            input_path,
            output_dir,
            &gateway,
            &orchestrator,
            !args.skip_probe,
        )
        .await
        .with_context(|| format!("Failed to translate {}", args.input))?;

    pb.finish_with_message(format!(
        "{}/{} pages in {}s",
        report.translated_pages,
        report.total_pages,
        report.duration().num_seconds()
    ));
    println!(
        "Translated '{}' -> {}",
        args.input,
        report.output_path.display()
    );

    Ok(())
}
