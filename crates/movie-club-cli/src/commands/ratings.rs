use super::{mutation_failed, Club};
use crate::output::Output;
use color_eyre::Result;
use movie_club_core::format_rating;
use serde_json::json;
use std::sync::Arc;

pub async fn rate(id_or_slug: &str, value: f64, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let person_id = club.person_id()?;
    let movie = club.movie(id_or_slug).await?;

    let rating = club
        .service
        .rate_movie(&movie.id, &person_id, value)
        .await
        .map_err(mutation_failed)?;

    if !output.is_human() {
        output.json(&json!({
            "movie": movie.id,
            "key": rating.key,
            "rating": rating.rating,
        }));
    } else if let Some(previous) = movie.rating_by(&person_id) {
        if previous.rating != rating.rating {
            output.println(format!("  was {}", format_rating(previous.rating)));
        }
    }
    Ok(())
}

pub async fn unrate(id_or_slug: &str, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let person_id = club.person_id()?;
    let movie = club.movie(id_or_slug).await?;

    club.service
        .delete_rating(&movie.id, &person_id)
        .await
        .map_err(mutation_failed)?;

    if !output.is_human() {
        output.json(&json!({ "movie": movie.id, "removed": true }));
    }
    Ok(())
}
