//! The `burnwell take` command.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};
use tracing::debug;

use burnwell_core::error::SessionError;
use burnwell_core::model::{Level, Progress, Score, ScoreReport, TestId};
use burnwell_core::session::{AssessmentSession, SubmitOutcome};
use burnwell_core::traits::{ResumeChoice, SessionPrompt, SubmitChoice};

/// How long to wait for outstanding answer saves before exiting.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn execute(
    user: Option<String>,
    offline: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = super::load(config_path.as_deref(), offline)?;
    let user = super::user(user, &config)?;
    let api = super::backend(&config)?;
    let persistent = api.name() != "offline";

    // Terminal reads block this thread; answer saves run on the runtime's
    // worker threads, so `main` must stay on the multi-thread runtime.
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut terminal = Terminal::new(stdin.lock(), stdout.lock());

    let mut session =
        AssessmentSession::initialize(api, user, config.session_config(), &mut terminal).await;

    let exit = run(&mut session, &mut terminal).await?;
    if exit == Exit::Quit && persistent && session.test_id().is_some() {
        writeln!(
            terminal.output,
            "Your progress is saved. Run `burnwell take` again to pick up where you left off."
        )?;
    }
    Ok(())
}

/// Line-oriented terminal: reads commands and answers prompts.
pub(crate) struct Terminal<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub(crate) fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Next trimmed line, or `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        write!(self.output, "{question} ").ok()?;
        self.output.flush().ok()?;
        self.read_line().ok().flatten()
    }
}

impl<R: BufRead, W: Write> SessionPrompt for Terminal<R, W> {
    fn choose_resume(&mut self, test_id: &TestId) -> ResumeChoice {
        let answer = self
            .ask(&format!(
                "You have an unfinished assessment ({test_id}). Resume it? [Y/n]"
            ))
            .map(|a| a.to_ascii_lowercase());
        match answer.as_deref() {
            Some("n") | Some("no") => ResumeChoice::Restart,
            _ => ResumeChoice::Resume,
        }
    }

    fn confirm_incomplete(&mut self, progress: Progress) -> SubmitChoice {
        let answer = self
            .ask(&format!(
                "You have answered {progress}. Submit anyway? [y/N]"
            ))
            .map(|a| a.to_ascii_lowercase());
        match answer.as_deref() {
            Some("y") | Some("yes") => SubmitChoice::SubmitAnyway,
            _ => SubmitChoice::CompleteAll,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Answer(Score),
    Previous,
    Next,
    /// One-based question number.
    GoTo(usize),
    Submit,
    Quit,
    Help,
    Invalid,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if let Ok(score) = line.parse::<Score>() {
        return Command::Answer(score);
    }
    match line.to_ascii_lowercase().as_str() {
        "p" | "prev" => Command::Previous,
        "n" | "next" => Command::Next,
        "s" | "submit" => Command::Submit,
        "q" | "quit" => Command::Quit,
        "" | "?" | "h" | "help" => Command::Help,
        other => match other.strip_prefix('g').map(str::trim).map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => Command::GoTo(n),
            _ => Command::Invalid,
        },
    }
}

/// How the interactive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    Submitted,
    Quit,
}

/// Drive the session from terminal input until it is submitted or the user
/// quits. End of input counts as quitting.
pub(crate) async fn run<R: BufRead, W: Write>(
    session: &mut AssessmentSession,
    term: &mut Terminal<R, W>,
) -> Result<Exit> {
    writeln!(term.output, "Hello, {}.", session.user().name())?;
    if session.questions().is_empty() {
        writeln!(
            term.output,
            "No questions are available right now. Please try again later."
        )?;
        return Ok(Exit::Quit);
    }

    if session.is_resumed() {
        writeln!(
            term.output,
            "Resuming your assessment ({} answered).",
            session.progress()
        )?;
    }
    write_help(&mut term.output)?;

    let exit = loop {
        write_question(session, &mut term.output)?;
        let Some(line) = term.read_line()? else {
            break Exit::Quit;
        };

        match parse_command(&line) {
            Command::Answer(score) => {
                if let Err(e) = session.answer_current(score).await {
                    write_error(&mut term.output, &e)?;
                }
            }
            Command::Previous => {
                session.navigate_previous();
            }
            Command::Next => {
                session.navigate_next();
            }
            Command::GoTo(n) => {
                session.go_to(n - 1);
            }
            Command::Submit => match session.submit(term).await {
                Ok(SubmitOutcome::Completed(report)) => {
                    let elapsed = Utc::now() - session.started_at();
                    write_report(&mut term.output, &report)?;
                    writeln!(
                        term.output,
                        "Completed in {}m {:02}s.",
                        elapsed.num_minutes(),
                        elapsed.num_seconds() % 60
                    )?;
                    break Exit::Submitted;
                }
                Ok(SubmitOutcome::Cancelled) => {
                    writeln!(
                        term.output,
                        "Answer the remaining questions, then submit again."
                    )?;
                }
                Err(e) => write_error(&mut term.output, &e)?,
            },
            Command::Quit => break Exit::Quit,
            Command::Help => write_help(&mut term.output)?,
            Command::Invalid => {
                writeln!(term.output, "Unknown command {line:?}. Type ? for help.")?;
            }
        }
    };

    // Settle what is in flight, resend what failed, then wait once more.
    session.flush_saves(FLUSH_TIMEOUT).await;
    session.retry_unsaved();
    if !session.flush_saves(FLUSH_TIMEOUT).await {
        debug!("gave up waiting for answer saves");
    }
    let unsaved = session.unsaved();
    if exit == Exit::Quit && !unsaved.is_empty() {
        writeln!(
            term.output,
            "Warning: {} answer(s) could not be saved to the server.",
            unsaved.len()
        )?;
    }
    term.output.flush()?;
    Ok(exit)
}

fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "How often do you feel this way?")?;
    for score in Score::all() {
        writeln!(out, "  {score}  {}", score.label())?;
    }
    writeln!(
        out,
        "Commands: 0-6 answer, p previous, n next, g <number> go to, s submit, q quit"
    )
}

fn write_question(session: &AssessmentSession, out: &mut impl Write) -> io::Result<()> {
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    writeln!(out)?;
    writeln!(
        out,
        "Question {} of {} | {} answered",
        session.cursor() + 1,
        session.questions().len(),
        session.progress()
    )?;
    writeln!(out, "{}", question.text)?;
    if let Some(score) = session.responses().get(question.id) {
        writeln!(out, "Current answer: {score} ({})", score.label())?;
    }
    write!(out, "> ")?;
    out.flush()
}

fn write_error(out: &mut impl Write, err: &SessionError) -> io::Result<()> {
    let message = match err {
        SessionError::Api(e) => e.user_message(),
        other => other.to_string(),
    };
    writeln!(out, "Error: {message}")
}

fn level_cell(level: Option<Level>) -> Cell {
    match level {
        Some(level) => Cell::new(level),
        None => Cell::new("-"),
    }
}

fn write_report(out: &mut impl Write, report: &ScoreReport) -> io::Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Subscale", "Score", "Level"]);
    table.add_row(vec![
        Cell::new("Emotional exhaustion"),
        Cell::new(report.emotional_exhaustion_score),
        level_cell(report.emotional_exhaustion_level),
    ]);
    table.add_row(vec![
        Cell::new("Depersonalization"),
        Cell::new(report.depersonalization_score),
        level_cell(report.depersonalization_level),
    ]);
    table.add_row(vec![
        Cell::new("Personal accomplishment"),
        Cell::new(report.personal_accomplishment_score),
        level_cell(report.personal_accomplishment_level),
    ]);

    writeln!(out, "\n{table}")?;
    writeln!(out, "Overall burnout level: {}", report.burnout_level)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;
    use std::sync::Arc;

    use burnwell_client::{mbi, Endpoint, OfflineBackend};
    use burnwell_core::model::{QuestionId, UserContext};
    use burnwell_core::session::SessionConfig;

    fn no_delay() -> SessionConfig {
        SessionConfig {
            advance_delay: Duration::ZERO,
        }
    }

    fn three_questions() -> Arc<OfflineBackend> {
        Arc::new(OfflineBackend::with_questions(
            mbi::questions().into_iter().take(3).collect(),
        ))
    }

    async fn drive(backend: Arc<OfflineBackend>, input: &str) -> (Exit, String, AssessmentSession) {
        drive_as(backend, UserContext::new("1"), input).await
    }

    async fn drive_as(
        backend: Arc<OfflineBackend>,
        user: UserContext,
        input: &str,
    ) -> (Exit, String, AssessmentSession) {
        let mut term = Terminal::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let mut session =
            AssessmentSession::initialize(backend, user, no_delay(), &mut term).await;
        let exit = run(&mut session, &mut term).await.unwrap();
        (exit, String::from_utf8(term.output).unwrap(), session)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("4"), Command::Answer(Score::new(4).unwrap()));
        assert_eq!(parse_command(" 0 "), Command::Answer(Score::new(0).unwrap()));
        assert_eq!(parse_command("P"), Command::Previous);
        assert_eq!(parse_command("next"), Command::Next);
        assert_eq!(parse_command("g 12"), Command::GoTo(12));
        assert_eq!(parse_command("g3"), Command::GoTo(3));
        assert_eq!(parse_command("s"), Command::Submit);
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(parse_command(""), Command::Help);
        assert_eq!(parse_command("7"), Command::Invalid);
        assert_eq!(parse_command("g 0"), Command::Invalid);
        assert_eq!(parse_command("maybe"), Command::Invalid);
    }

    #[tokio::test]
    async fn partial_submit_after_confirmation() {
        let (exit, output, session) = drive(three_questions(), "4\n0\ns\ny\n").await;

        assert_eq!(exit, Exit::Submitted);
        assert!(output.contains("You have answered 2/3 (67%). Submit anyway?"));
        assert!(output.contains("Emotional exhaustion"));
        assert!(output.contains("Overall burnout level: Low"));
        assert!(session.is_finished());
        assert_eq!(session.report().unwrap().emotional_exhaustion_score, 4);
    }

    #[tokio::test]
    async fn declining_incomplete_submit_keeps_going() {
        let (exit, output, session) = drive(three_questions(), "2\ns\nn\nq\n").await;

        assert_eq!(exit, Exit::Quit);
        assert!(output.contains("Answer the remaining questions"));
        assert!(!session.is_finished());
        assert_eq!(session.cursor(), 1);
        assert_eq!(session.responses().get(QuestionId(1)), Score::new(2).ok());
    }

    #[tokio::test]
    async fn navigation_and_bad_input() {
        let (exit, output, session) = drive(three_questions(), "n\nn\nn\np\nwhat\ng 1\n").await;

        assert_eq!(exit, Exit::Quit);
        assert!(output.contains("Unknown command \"what\""));
        assert!(output.contains("Question 3 of 3"));
        assert_eq!(session.cursor(), 0);
    }

    #[tokio::test]
    async fn resume_prompt_accepts_default() {
        let backend = three_questions();
        backend.seed_attempt("1", &[(QuestionId(1), Score::new(3).unwrap())]);

        let (_, output, session) = drive(backend, "\nq\n").await;

        assert!(session.is_resumed());
        assert!(output.contains("Resuming your assessment (1/3 (33%) answered)."));
        assert!(output.contains("Question 2 of 3"));
    }

    #[tokio::test]
    async fn greets_by_display_name() {
        let user = UserContext::new("1").with_display_name("Dr. Lee");
        let (_, output, _) = drive_as(three_questions(), user, "q\n").await;
        assert!(output.starts_with("Hello, Dr. Lee."));
    }

    #[tokio::test]
    async fn quitting_resends_failed_saves() {
        let backend = three_questions();
        backend.fail_next(Endpoint::SaveResponse, 1);

        let (exit, output, session) = drive(backend.clone(), "4\nq\n").await;

        assert_eq!(exit, Exit::Quit);
        assert!(session.unsaved().is_empty());
        assert_eq!(backend.save_count(), 1);
        assert!(!output.contains("could not be saved"));
    }

    #[tokio::test]
    async fn quitting_warns_when_saves_keep_failing() {
        let backend = three_questions();
        backend.fail_next(Endpoint::SaveResponse, 2);

        let (_, output, session) = drive(backend.clone(), "4\nq\n").await;

        assert_eq!(session.unsaved(), vec![QuestionId(1)]);
        assert_eq!(backend.save_count(), 0);
        assert!(output.contains("Warning: 1 answer(s) could not be saved to the server."));
    }

    #[tokio::test]
    async fn empty_question_list_exits_politely() {
        let backend = three_questions();
        backend.fail_next(Endpoint::Questions, 1);

        let (exit, output, _) = drive(backend, "").await;

        assert_eq!(exit, Exit::Quit);
        assert!(output.contains("No questions are available right now"));
    }

    #[tokio::test]
    async fn submit_failure_is_reported_and_recoverable() {
        let backend = three_questions();
        backend.fail_next(Endpoint::Submit, 1);

        let (exit, output, session) = drive(backend, "1\n1\n1\ns\ns\n").await;

        assert_eq!(exit, Exit::Submitted);
        assert!(output.contains("Error: Could not reach the server."));
        assert!(session.is_finished());
    }
}
