use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use sweep_core::config::Config;

const BANNER: &str = r"
    -----------------------------------

     ___ __      __ ___  ___  ___
    / __|\ \    / /| __|| __|| _ \
    \__ \ \ \/\/ / | _| | _| |  _/
    |___/  \_/\_/  |___||___||_|

    -----------------------------------
";

const PROVIDERS: &[&str] = &["openai", "openrouter", "ollama"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn setup_provider() -> Result<&'static str> {
    let selection = Select::new()
        .with_prompt("Select your model provider")
        .items(PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection])
}

fn setup_api_key(provider: &str) -> Result<String> {
    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {provider} API key"))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key.trim().to_string())
}

fn models_for(provider: &str) -> &'static [&'static str] {
    match provider {
        "ollama" => &["qwen3", "llama3.1", "mistral"],
        "openrouter" => &[
            "openai/gpt-4o-mini",
            "anthropic/claude-sonnet-4",
            "google/gemini-2.5-flash",
        ],
        _ => &["gpt-4o", "gpt-4o-mini", "gpt-5-mini"],
    }
}

fn setup_model(provider: &str) -> Result<String> {
    let models = models_for(provider);

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to Sweep!").white().bold());
    println!(
        "  {}",
        style("This wizard picks the model that will plan your cleanups.").dim()
    );
    println!();

    print_step(1, 3, "Provider");
    let provider = setup_provider()?;

    print_step(2, 3, "API Key Setup");
    let api_key = if provider == "ollama" {
        println!("  {} Ollama runs locally, no key needed", style("✓").green());
        String::new()
    } else {
        setup_api_key(provider)?
    };

    print_step(3, 3, "Model Selection");
    let model = setup_model(provider)?;

    let config = Config {
        provider: Some(provider.to_string()),
        api_key,
        model,
        ..Default::default()
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(sweep_core::config::get_config_path().display()).cyan()
    );
    println!(
        "  {} Protected paths: {}",
        style("→").green(),
        style(config.whitelist.join(", ")).dim()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("sweep chat").cyan().bold()
    );
    println!();

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_provider_offers_models() {
        for provider in PROVIDERS {
            assert!(!models_for(provider).is_empty());
        }
    }
}
