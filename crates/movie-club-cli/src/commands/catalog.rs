use super::{mutation_failed, Club};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets, modifiers, Attribute, Cell, Color, Table};
use indicatif::{ProgressBar, ProgressStyle};
use movie_club_models::{ExternalMovie, SearchPage};
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of matching a search page against what the user asked to add
#[derive(Debug, PartialEq)]
enum Pick<'a> {
    One(&'a ExternalMovie),
    Ambiguous,
    Missing,
}

/// An explicit external id wins; otherwise a single result, or a single exact title match
fn pick<'a>(results: &'a [ExternalMovie], title: &str, external_id: Option<u64>) -> Pick<'a> {
    if let Some(id) = external_id {
        return results.iter().find(|m| m.id == id).map_or(Pick::Missing, Pick::One);
    }
    match results {
        [] => Pick::Missing,
        [only] => Pick::One(only),
        _ => {
            let mut exact = results.iter().filter(|m| m.title.trim().eq_ignore_ascii_case(title.trim()));
            match (exact.next(), exact.next()) {
                (Some(movie), None) => Pick::One(movie),
                _ => Pick::Ambiguous,
            }
        }
    }
}

fn release_year(movie: &ExternalMovie) -> String {
    movie
        .release_date
        .as_deref()
        .and_then(|d| d.get(..4))
        .unwrap_or("-")
        .to_string()
}

fn results_table(page: &SearchPage) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("TMDB ID").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Popularity").add_attribute(Attribute::Bold),
        Cell::new("Images").add_attribute(Attribute::Bold),
    ]);
    for movie in &page.results {
        let has_images = movie.poster_path.is_some() && movie.backdrop_path.is_some();
        table.add_row(vec![
            Cell::new(movie.id).fg(Color::DarkGrey),
            Cell::new(&movie.title).fg(Color::Cyan),
            Cell::new(release_year(movie)),
            Cell::new(movie.popularity.map(|p| format!("{:.1}", p)).unwrap_or_default()),
            Cell::new(if has_images { "✓" } else { "✗" }),
        ]);
    }
    table
}

pub async fn search(title: &str, page: u32, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let results = club
        .service
        .search_external(title, page)
        .await
        .map_err(|e| eyre!("{}", e))?;

    if !output.is_human() {
        output.json(&json!(results));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }
    if results.results.is_empty() {
        output.info(format!("No matches for '{}'", title));
        return Ok(());
    }

    println!("{}", results_table(&results));
    output.println(
        format!(
            "Page {} of {} ({} results). Add one with 'movieclub add \"{}\" --id <TMDB ID>'.",
            results.page, results.total_pages, results.total_results, title
        )
        .bright_black()
        .to_string(),
    );
    Ok(())
}

pub async fn add(title: &str, external_id: Option<u64>, page: u32, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let results = club
        .service
        .search_external(title, page)
        .await
        .map_err(|e| eyre!("{}", e))?;

    let candidate = match pick(&results.results, title, external_id) {
        Pick::One(movie) => movie,
        Pick::Missing => {
            return Err(match external_id {
                Some(id) => eyre!("TMDB id {} is not among the results for '{}' (page {})", id, title, page),
                None => eyre!("No matches for '{}'", title),
            })
        }
        Pick::Ambiguous => {
            if output.is_human() && !output.is_quiet() {
                println!("{}", results_table(&results));
            }
            return Err(eyre!("'{}' matches several movies; pick one with --id", title));
        }
    };

    let spinner = if output.is_human() && !output.is_quiet() {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.blue} {msg}")
                .map_err(|e| eyre!("Invalid progress template: {}", e))?,
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    } else {
        ProgressBar::hidden()
    };
    spinner.set_message(format!("Adding {} ({})...", candidate.title, release_year(candidate)));

    let result = club.service.add_movie(candidate).await;
    spinner.finish_and_clear();
    let movie = result.map_err(mutation_failed)?;

    if !output.is_human() {
        output.json(&json!({ "movie": movie }));
    } else if let Some(slug) = movie.slug_str() {
        output.println(format!("  movieclub show {}", slug).bright_black().to_string());
    }
    Ok(())
}
