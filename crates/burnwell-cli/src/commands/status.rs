//! The `burnwell status` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use burnwell_core::model::Progress;

pub async fn execute(
    user: Option<String>,
    offline: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load(config_path.as_deref(), offline)?;
    let user = super::user(user, &config)?;
    let api = super::backend(&config)?;

    let found = api
        .in_progress_test(&user)
        .await
        .context("failed to look up in-progress assessment")?;
    let Some(test_id) = found else {
        println!("No assessment in progress for user {}.", user.user_id);
        return Ok(());
    };

    let questions = api
        .fetch_questions()
        .await
        .context("failed to fetch questions")?;
    let mut responses = api
        .test_progress(&test_id)
        .await
        .with_context(|| format!("failed to load progress for assessment {test_id}"))?;
    responses.retain_known(&questions);

    let progress = Progress {
        answered: responses.len(),
        total: questions.len(),
    };
    println!("Assessment {test_id} in progress: {progress} answered.");
    if let Some(index) = responses.first_unanswered(&questions) {
        println!("Next question: {}. {}", index + 1, questions[index].text);
    }
    Ok(())
}
