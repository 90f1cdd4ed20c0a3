use super::{load_credentials, try_load_config};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets, modifiers, Attribute, Cell, Color, Table};
use movie_club_config::{Config, CredentialStore, IdentityConfig, PathManager};
use owo_colors::OwoColorize;
use serde_json::json;

pub enum ConfigAction {
    Show { full: bool },
    Init {
        project_id: String,
        dataset: Option<String>,
        no_cdn: bool,
        name: Option<String>,
        force: bool,
    },
    SetToken { token: Option<String> },
    SetTmdbKey { key: Option<String> },
    Path,
}

pub async fn run_config(action: ConfigAction, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    match action {
        ConfigAction::Show { full } => show_config(&paths, full, output),
        ConfigAction::Init { project_id, dataset, no_cdn, name, force } => {
            init_config(&paths, project_id, dataset, no_cdn, name, force, output)
        }
        ConfigAction::SetToken { token } => {
            let token = secret_or_prompt(token, "Content store write token: ")?;
            update_credentials(&paths, |c| c.set_content_store_token(token))?;
            output.success("Content store token saved");
            Ok(())
        }
        ConfigAction::SetTmdbKey { key } => {
            let key = secret_or_prompt(key, "TMDB API key: ")?;
            update_credentials(&paths, |c| c.set_tmdb_api_key(key))?;
            output.success("TMDB API key saved");
            Ok(())
        }
        ConfigAction::Path => {
            if output.is_human() {
                output.info(paths.config_file().display().to_string());
            } else {
                // null while logs go to stderr
                let log = try_load_config(&paths)
                    .and_then(|c| c.logging)
                    .and_then(|l| l.file)
                    .map(|file| paths.resolve_log_file(&file));
                output.json(&json!({
                    "config": paths.config_file(),
                    "credentials": paths.credentials_file(),
                    "log_dir": paths.log_dir(),
                    "log": log,
                }));
            }
            Ok(())
        }
    }
}

fn secret_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    let value = match value {
        Some(value) => value,
        None => rpassword::prompt_password(prompt).map_err(|e| eyre!("Failed to read input: {}", e))?,
    };
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(eyre!("A value is required"));
    }
    Ok(value)
}

fn update_credentials(paths: &PathManager, update: impl FnOnce(&mut CredentialStore)) -> Result<()> {
    paths
        .ensure_config_dir()
        .map_err(|e| eyre!("Failed to create configuration directory: {}", e))?;
    let mut credentials = load_credentials(paths)?;
    update(&mut credentials);
    credentials
        .save()
        .map_err(|e| eyre!("Failed to save credentials to {}: {}", paths.credentials_file().display(), e))
}

fn init_config(
    paths: &PathManager,
    project_id: String,
    dataset: Option<String>,
    no_cdn: bool,
    name: Option<String>,
    force: bool,
    output: &Output,
) -> Result<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        return Err(eyre!(
            "Configuration already exists at {}. Use --force to overwrite it.",
            config_file.display()
        ));
    }

    let mut config = Config::new(project_id);
    if let Some(dataset) = dataset {
        config.content_store.dataset = dataset;
    }
    config.content_store.use_cdn = !no_cdn;
    config.identity = name.map(|name| IdentityConfig { name, image_url: None });
    config.validate().map_err(|e| eyre!("Invalid configuration: {}", e))?;

    paths
        .ensure_config_dir()
        .map_err(|e| eyre!("Failed to create configuration directory: {}", e))?;
    config
        .save_to_file(&config_file)
        .map_err(|e| eyre!("Failed to save config to {}: {}", config_file.display(), e))?;

    output.success(format!("Configuration written to {}", config_file.display()));
    output.println("Next: 'movieclub config set-token' for writes, 'movieclub config set-tmdb-key' for search.");
    Ok(())
}

fn show_config(paths: &PathManager, full: bool, output: &Output) -> Result<()> {
    let config_file = paths.config_file();
    let config = match try_load_config(paths) {
        Some(config) => config,
        None => {
            output.warn(format!("No readable configuration at {}", config_file.display()));
            output.info("Create one with 'movieclub config init --project-id <id>'.");
            return Ok(());
        }
    };
    let credentials = load_credentials(paths)?;
    let token = credentials.content_store_token().unwrap_or_default();
    let tmdb_key = credentials.tmdb_api_key().unwrap_or_default();
    let reveal = |secret: &str| if full { secret.to_string() } else { mask_string(secret) };

    if !output.is_human() {
        output.json(&json!({
            "configFile": config_file,
            "contentStore": {
                "projectId": config.content_store.project_id,
                "dataset": config.content_store.dataset,
                "apiVersion": config.content_store.api_version,
                "useCdn": config.content_store.use_cdn,
                "token": reveal(&token),
            },
            "tmdb": { "enabled": config.is_tmdb_enabled(), "apiKey": reveal(&tmdb_key) },
            "identity": config.identity.as_ref().map(|i| &i.name),
            "personId": credentials.get_person_id(),
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    let check = |on: bool| if on { "✓".green().to_string() } else { "✗".red().to_string() };
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::Cyan).add_attribute(Attribute::Bold),
        Cell::new("Value").fg(Color::Cyan).add_attribute(Attribute::Bold),
    ]);
    let rows = vec![
        ("Config file", config_file.display().to_string()),
        ("Project", config.content_store.project_id.clone()),
        ("Dataset", config.content_store.dataset.clone()),
        ("API version", config.content_store.api_version.clone()),
        ("CDN reads", check(config.content_store.use_cdn)),
        ("Write token", reveal(&token)),
        ("TMDB", check(config.is_tmdb_enabled())),
        ("TMDB API key", reveal(&tmdb_key)),
        (
            "Identity",
            config
                .identity
                .as_ref()
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "<not set>".to_string()),
        ),
        (
            "Signed in as",
            credentials.get_person_id().cloned().unwrap_or_else(|| "<not signed in>".to_string()),
        ),
        (
            "Cache (list/detail/comments)",
            format!(
                "{}s / {}s / {}s",
                config.cache.movie_list_stale_seconds,
                config.cache.movie_detail_stale_seconds,
                config.cache.comments_stale_seconds
            ),
        ),
        ("Read retries", format!("{} x {}ms", config.retry.read_attempts, config.retry.backoff_ms)),
    ];
    for (name, value) in rows {
        table.add_row(vec![Cell::new(name), Cell::new(value)]);
    }
    println!("{}", table);
    Ok(())
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    if s.len() <= 4 {
        return "*".repeat(s.len());
    }
    format!("{}***{}", &s[..2], &s[s.len() - 2..])
}
