use super::{format_average, year, Club};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets, modifiers, Attribute, Cell, Color, Table};
use movie_club_core::{average_rating, format_rating, sort_movies, SortMode};
use movie_club_models::Movie;
use movie_club_sources::MovieFilter;
use owo_colors::OwoColorize;
use serde_json::{json, Value};
use std::sync::Arc;

fn movie_json(movie: &Movie) -> Value {
    let mut value = serde_json::to_value(movie).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.insert("averageRating".to_string(), json!(average_rating(movie)));
    }
    value
}

fn movies_table(movies: &[Movie], person_id: Option<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Genres").add_attribute(Attribute::Bold),
        Cell::new("Avg").add_attribute(Attribute::Bold),
        Cell::new("Ratings").add_attribute(Attribute::Bold),
        Cell::new("Comments").add_attribute(Attribute::Bold),
        Cell::new("Yours").add_attribute(Attribute::Bold),
    ]);

    for movie in movies {
        let yours = person_id
            .and_then(|id| movie.rating_by(id))
            .map(|r| format_rating(r.rating))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&movie.title).fg(Color::Cyan),
            Cell::new(year(movie)),
            Cell::new(movie.genres.join(", ")),
            Cell::new(format_average(average_rating(movie))),
            Cell::new(movie.ratings.len()),
            Cell::new(movie.comments.len()),
            Cell::new(yours),
        ]);
    }
    table
}

pub async fn list(genre: Option<String>, sort: SortMode, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let filter = genre.map(MovieFilter::genre).unwrap_or_default();
    let movies = club.service.get_movies(&filter).await.map_err(|e| eyre!("{}", e))?;
    let movies = sort_movies(&movies, sort);

    if !output.is_human() {
        output.json(&json!({
            "sort": sort.as_str(),
            "genre": filter.genre,
            "movies": movies.iter().map(movie_json).collect::<Vec<_>>(),
        }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    if movies.is_empty() {
        match &filter.genre {
            Some(genre) => output.info(format!("No {} movies in the collection yet", genre)),
            None => output.info("The collection is empty. Add one with 'movieclub add <title>'."),
        }
        return Ok(());
    }

    let person_id = club.credentials.get_person_id().map(String::as_str);
    println!("{}", movies_table(&movies, person_id));
    output.println(format!("{} movies, sorted by {}", movies.len(), sort).bright_black().to_string());
    Ok(())
}

pub async fn show(id_or_slug: &str, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let movie = club.movie(id_or_slug).await?;

    if !output.is_human() {
        output.json(&movie_json(&movie));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }

    println!();
    println!("{} {}", movie.title.bright_cyan().bold(), format!("({})", year(&movie)).bright_black());
    if let Some(slug) = movie.slug_str() {
        println!("{}", format!("{} · {}", movie.id, slug).bright_black());
    }
    let mut facts = Vec::new();
    if !movie.genres.is_empty() {
        facts.push(movie.genres.join(", "));
    }
    if let Some(minutes) = movie.length {
        facts.push(format!("{}h {:02}m", minutes / 60, minutes % 60));
    }
    if !facts.is_empty() {
        println!("{}", facts.join("  |  "));
    }
    if let Some(synopsis) = movie.synopsis() {
        println!("\n{}", synopsis);
    }

    println!(
        "\n{} {} from {} ratings, {} comments",
        "Average:".bold(),
        format_average(average_rating(&movie)),
        movie.ratings.len(),
        movie.comments.len()
    );

    if !movie.ratings.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
        table.set_header(vec![
            Cell::new("Member").add_attribute(Attribute::Bold),
            Cell::new("Rating").add_attribute(Attribute::Bold),
        ]);
        let me = club.credentials.get_person_id();
        for rating in &movie.ratings {
            let name = rating
                .person
                .person()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| rating.person_id().to_string());
            let mut name_cell = Cell::new(name);
            if me.map(String::as_str) == Some(rating.person_id()) {
                name_cell = name_cell.fg(Color::Green);
            }
            table.add_row(vec![name_cell, Cell::new(format_rating(rating.rating))]);
        }
        println!("{}", table);
    }
    Ok(())
}
