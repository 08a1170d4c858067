//! The `burnwell questions` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

pub async fn execute(offline: bool, format: String, config_path: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(
        matches!(format.as_str(), "text" | "json"),
        "unknown format: {format} (expected text or json)"
    );

    let config = super::load(config_path.as_deref(), offline)?;
    let api = super::backend(&config)?;
    let questions = api
        .fetch_questions()
        .await
        .context("failed to fetch questions")?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&questions)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "ID", "Category", "Question"]);
    for (index, question) in questions.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(question.id),
            Cell::new(question.category),
            Cell::new(&question.text),
        ]);
    }

    println!("{table}");
    println!("{} questions", questions.len());
    Ok(())
}
