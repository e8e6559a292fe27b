use crate::config::{ANY_ORIGIN, Config, expand_home, parse_origin_list};
use crate::db::Database;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

pub fn run_onboarding(start_now_flag: bool) -> Result<(Config, bool)> {
    println!("──────────────────────────────────────────");
    println!("  Welcome to HeatmapTracker onboarding.");
    println!("──────────────────────────────────────────");

    let theme = ColorfulTheme::default();
    let defaults = Config::default();

    println!("\n[1/4] API port");
    let api_port: u16 = Input::with_theme(&theme)
        .with_prompt("  Port the click API listens on")
        .default(defaults.api_port)
        .interact_text()
        .context("Failed to read API port")?;
    println!("  ✓ Listening on {}:{api_port}", defaults.api_host);

    println!("\n[2/4] Click database");
    let db_path_input: String = Input::with_theme(&theme)
        .with_prompt("  SQLite file for click events")
        .default(defaults.db_path.display().to_string())
        .interact_text()
        .context("Failed to read database path")?;
    let db_path = expand_home(&db_path_input);
    println!("  ✓ {}", db_path.display());

    println!("\n[3/4] Allowed origins");
    println!("  Pages on these origins may call the API from the browser.");
    println!("  Use * during development, or a comma separated list such as");
    println!("  https://shop.example.com,http://localhost:5173");
    let origins_input: String = Input::with_theme(&theme)
        .with_prompt("  Allowed origins")
        .default(ANY_ORIGIN.to_string())
        .allow_empty(true)
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            parse_origin_list(input)
                .map(|_| ())
                .map_err(|error| error.to_string())
        })
        .interact_text()
        .context("Failed to read allowed origins")?;
    let allowed_origins = parse_origin_list(&origins_input)?;
    if allowed_origins.is_empty() {
        println!("  ✓ Cross-origin access disabled");
    } else {
        println!("  ✓ {}", allowed_origins.join(", "));
    }

    let config = Config {
        db_path,
        api_port,
        allowed_origins,
        ..defaults
    };

    config.ensure_bootstrap_files()?;
    config.save()?;
    Database::migrate(&config.db_path)?;

    println!("\n[4/4] Start the API");
    let start_now = if start_now_flag {
        true
    } else {
        Confirm::with_theme(&theme)
            .with_prompt("  Start serving now?")
            .default(false)
            .interact()
            .context("Failed to read start input")?
    };

    println!("\n──────────────────────────────────────────");
    println!("  Onboarding complete!");
    if !start_now {
        println!("  Run HeatmapTracker serve to start collecting clicks.");
    }
    println!("──────────────────────────────────────────");

    Ok((config, start_now))
}
