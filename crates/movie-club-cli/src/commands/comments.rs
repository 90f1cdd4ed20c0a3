use super::{mutation_failed, Club};
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use comfy_table::{presets, modifiers, Attribute, Cell, Color, Table};
use movie_club_models::Comment;
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;

fn author(comment: &Comment) -> String {
    comment
        .author_name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} (unknown)", comment.person_id()))
}

pub async fn list(id_or_slug: &str, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let movie = club.movie(id_or_slug).await?;
    let comments = club.service.get_comments(&movie.id).await.map_err(|e| eyre!("{}", e))?;

    if !output.is_human() {
        output.json(&json!({ "movie": movie.id, "comments": comments }));
        return Ok(());
    }
    if output.is_quiet() {
        return Ok(());
    }
    if comments.is_empty() {
        output.info(format!("No comments on {} yet", movie.title));
        return Ok(());
    }

    let me = club.credentials.get_person_id().map(String::as_str);
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_header(vec![
        Cell::new("Key").add_attribute(Attribute::Bold),
        Cell::new("Author").add_attribute(Attribute::Bold),
        Cell::new("Posted").add_attribute(Attribute::Bold),
        Cell::new("Comment").add_attribute(Attribute::Bold),
    ]);
    for comment in &comments {
        let mut author_cell = Cell::new(author(comment));
        if me.map_or(false, |id| comment.is_authored_by(id)) {
            author_cell = author_cell.fg(Color::Green);
        }
        let posted = comment
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(&comment.key).fg(Color::DarkGrey),
            author_cell,
            Cell::new(posted),
            Cell::new(&comment.comment),
        ]);
    }

    println!("{}", movie.title.bright_cyan().bold());
    println!("{}", table);
    Ok(())
}

pub async fn add(id_or_slug: &str, text: &str, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let person_id = club.person_id()?;
    let movie = club.movie(id_or_slug).await?;

    let comment = club
        .service
        .add_comment(&movie.id, &person_id, text)
        .await
        .map_err(mutation_failed)?;

    if !output.is_human() {
        output.json(&json!({ "movie": movie.id, "comment": comment }));
    } else {
        output.println(format!("  key {}", comment.key).bright_black().to_string());
    }
    Ok(())
}

pub async fn delete(id_or_slug: &str, comment_key: &str, output: &Arc<Output>) -> Result<()> {
    let club = Club::open(output)?;
    let person_id = club.person_id()?;
    let movie = club.movie(id_or_slug).await?;

    // Only the author gets to delete; unknown keys fall through to the service
    if let Some(comment) = movie.comment(comment_key) {
        if !comment.is_authored_by(&person_id) {
            return Err(eyre!("Comment {} was posted by {}; you can only delete your own comments", comment_key, author(comment)));
        }
    }

    club.service
        .delete_comment(&movie.id, comment_key)
        .await
        .map_err(mutation_failed)?;

    if !output.is_human() {
        output.json(&json!({ "movie": movie.id, "deleted": comment_key }));
    }
    Ok(())
}
