//! Configuration display.

use std::path::Path;

use crate::config::Settings;

/// Print the effective settings.
pub fn cmd_config_show(settings: &Settings, source: Option<&Path>) -> anyhow::Result<()> {
    match source {
        Some(path) => println!("Config file:        {}", path.display()),
        None => println!("Config file:        (none, using defaults)"),
    }
    println!("Data directory:     {}", settings.data_dir.display());
    println!("Database:           {}", settings.database_url());
    println!(
        "Redis:              {}",
        settings.redis_url.as_deref().unwrap_or("(in-process backends)")
    );
    println!("Workers:            {}", settings.worker_count);
    println!("Model concurrency:  {}", settings.model_concurrency);
    println!("Lock TTL:           {}s", settings.lock_ttl.as_secs());
    println!("Queue pop timeout:  {}s", settings.pop_timeout.as_secs());
    println!("Max retries:        {}", settings.max_retries);
    println!("Retry base delay:   {}s", settings.retry_base.as_secs());
    println!("Model slot wait:    {}s", settings.slot_wait.as_secs());
    println!("Audio cap:          {} MB", settings.audio_cap_bytes / (1024 * 1024));
    println!("Caption languages:  {}", settings.caption_languages.join(", "));
    println!("Model:              {}", settings.llm.model);
    println!(
        "Gemini API key:     {}",
        if settings.llm.api_key.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    Ok(())
}
