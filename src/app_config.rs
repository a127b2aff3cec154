use anyhow::{bail, Result};
use colored::Colorize;
use mandi_price::mandi::config;

/// Single-shot inputs for the binary, read from the environment
pub struct AppConfig {
    pub mode: String,
    pub state: Option<String>,
    pub district: String,
    pub commodity: String,
    pub area_acres: Option<f64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            mode: config::get_execution_mode(),
            state: env_value("MANDI_STATE"),
            district: env_value("MANDI_DISTRICT").unwrap_or_else(|| "pune".to_string()),
            commodity: env_value("MANDI_COMMODITY").unwrap_or_else(|| "rice".to_string()),
            area_acres: env_value("MANDI_AREA").and_then(|area| area.parse::<f64>().ok()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.mode.as_str() {
            "resolve" | "daemon" | "summary" => {}
            other => bail!("Unknown MANDI_MODE '{}' (expected resolve, daemon or summary)", other),
        }

        if let Some(area) = self.area_acres {
            if !area.is_finite() || area < 0.0 {
                bail!("MANDI_AREA must be a non-negative number, got {}", area);
            }
        }

        Ok(())
    }

    pub fn print_banner(&self) {
        println!("{}", "=".repeat(60).blue());
        println!("{}", "Mandi Price Resolver".green().bold());
        println!("{}", "=".repeat(60).blue());
        println!("{} Mode: {}", "→".cyan(), self.mode.yellow());
        println!();
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
