use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::providers::ProviderChain;
use crate::store;

/// Prints the state of each data file and each completion provider.
pub fn list_status(config: &Config) -> Result<()> {
    println!("{:<10} {:<10} {:>8}  PATH", "FILE", "STATUS", "RECORDS");
    print_file("qna", &config.data.qna_path);
    print_file("corpus", &config.data.corpus_path);
    print_file("log", &config.data.log_path);

    println!();
    println!("{:<10} {:<16} {:<24} ENDPOINT", "PROVIDER", "STATUS", "MODEL");
    let chain = ProviderChain::from_config(&config.providers)?;
    for (provider, cfg) in chain
        .providers()
        .iter()
        .zip([&config.providers.primary, &config.providers.secondary])
    {
        let status = if provider.endpoint().is_configured() {
            "OK".to_string()
        } else {
            format!("NO KEY ({})", cfg.api_key_env)
        };
        println!(
            "{:<10} {:<16} {:<24} {}",
            provider.name(),
            status,
            provider.endpoint().model(),
            cfg.base_url
        );
    }

    println!();
    let embedding = &config.embedding;
    println!(
        "embedding: {} ({})",
        embedding.provider,
        embedding.model.as_deref().unwrap_or("default model")
    );
    println!(
        "similarity threshold: {}",
        config.retrieval.similarity_threshold
    );

    Ok(())
}

/// Reports a file without creating it when missing.
fn print_file(label: &str, path: &Path) {
    let (status, records) = if !path.exists() {
        ("MISSING".to_string(), "-".to_string())
    } else {
        match store::load_array(path) {
            Ok(records) => ("OK".to_string(), records.len().to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "data file unreadable");
                ("UNREADABLE".to_string(), "-".to_string())
            }
        }
    };
    println!("{:<10} {:<10} {:>8}  {}", label, status, records, path.display());
}
