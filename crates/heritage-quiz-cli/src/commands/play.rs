//! The `heritage-quiz play` command.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use heritage_quiz_core::engine::{fetch_quiz, EngineSettings, QuizEngine, QuizHandle};
use heritage_quiz_core::error::{QuizError, SessionError};
use heritage_quiz_core::model::{Answer, Question, QuizConfig, Selection, TimeLimit};
use heritage_quiz_core::parser;
use heritage_quiz_core::report::{ChannelReporter, QuizResult, SessionNotification};
use heritage_quiz_providers::config::{load_config_from, QuizAppConfig};
use heritage_quiz_providers::create_provider;

pub struct PlayOptions {
    pub bank: String,
    pub source: Option<String>,
    pub seconds: Option<i64>,
    pub show_ticks: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(options: PlayOptions) -> Result<()> {
    let app_config = load_config_from(options.config.as_deref())?;

    let mut quiz = load_quiz(&options, &app_config).await?;
    if let Some(secs) = options.seconds.or(app_config.seconds_per_question) {
        quiz = quiz.with_time_override(TimeLimit::per_question_secs(secs));
    }
    if let Some(score) = app_config.passing_score {
        quiz = quiz.with_passing_score(score);
    }

    let tick_interval = (options.show_ticks && app_config.tick_interval_ms > 0)
        .then(|| Duration::from_millis(app_config.tick_interval_ms));
    let output = options.output.or(app_config.output_dir);

    print_intro(&quiz);

    let total = quiz.question_count();
    let (reporter, notifications) = ChannelReporter::new();
    let (handle, task) =
        QuizEngine::spawn(quiz, Arc::new(reporter), EngineSettings { tick_interval });

    let outcome = drive(&handle, notifications, total, output.as_deref()).await;

    handle.shutdown();
    let _ = task.await;
    outcome
}

/// A path to an existing file is parsed directly; anything else is a topic
/// fetched from the selected source.
async fn load_quiz(options: &PlayOptions, app_config: &QuizAppConfig) -> Result<QuizConfig> {
    let path = Path::new(&options.bank);
    if path.is_file() {
        return parser::parse_quiz(path);
    }

    let (name, source) = app_config.source(options.source.as_deref())?;
    let provider = create_provider(name, source)?;
    Ok(fetch_quiz(provider.as_ref(), &options.bank).await?)
}

async fn drive(
    handle: &QuizHandle,
    mut notifications: UnboundedReceiver<SessionNotification>,
    total: usize,
    output: Option<&Path>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut live: Option<(usize, Question)> = None;
    let mut ticking = false;
    let mut finished = false;

    handle.start().await?;

    loop {
        tokio::select! {
            biased;
            Some(notification) = notifications.recv() => match notification {
                SessionNotification::Question { index, question, allotted } => {
                    print_question(index, total, &question, allotted);
                    live = Some((index, question));
                }
                SessionNotification::Tick { remaining, .. } => {
                    eprint!("\r  {:>3}s left ", remaining.as_secs());
                    ticking = true;
                }
                SessionNotification::Answered { answer, .. } => {
                    if std::mem::take(&mut ticking) {
                        eprintln!();
                    }
                    print_feedback(&answer, live.take().map(|(_, q)| q).as_ref());
                }
                SessionNotification::Completed(result) => {
                    print_result(&result);
                    if let Some(dir) = output {
                        save_result(&result, dir)?;
                    }
                    println!("\nType r to play again, or press Enter to quit.");
                    finished = true;
                }
                SessionNotification::Exited { discarded } => {
                    println!("\nQuiz abandoned, {discarded} answer(s) discarded.");
                    return Ok(());
                }
                SessionNotification::PhaseChanged { .. } => {}
            },
            line = lines.next_line() => {
                let Some(input) = line? else {
                    // End of input abandons a running quiz.
                    if !finished && handle.abandon().await.is_ok() {
                        continue;
                    }
                    return Ok(());
                };
                let input = input.trim();

                if finished {
                    if !input.eq_ignore_ascii_case("r") {
                        return Ok(());
                    }
                    handle.restart(false).await?;
                    handle.start().await?;
                    finished = false;
                    continue;
                }

                if input.eq_ignore_ascii_case("q") {
                    handle.abandon().await?;
                    continue;
                }

                let Some((index, question)) = &live else {
                    continue;
                };
                let count = question.options().len();
                match input.parse::<usize>() {
                    Ok(n) if (1..=count).contains(&n) => match handle.submit(*index, n - 1).await {
                        Ok(_) => {}
                        Err(QuizError::Session(SessionError::QuestionMismatch { .. })) => {
                            println!("  Too late, time ran out.");
                        }
                        Err(e) if e.is_rejection() => println!("  {e}"),
                        Err(e) => return Err(e.into()),
                    },
                    _ => println!("  Type an option number between 1 and {count}, or q to quit."),
                }
            }
        }
    }
}

fn print_intro(quiz: &QuizConfig) {
    println!("{}", quiz.name());
    if !quiz.description().is_empty() {
        println!("{}", quiz.description());
    }
    let timing = match quiz.time_limit() {
        TimeLimit::PerQuestion(d) => format!("{}s per question", d.as_secs()),
        TimeLimit::PerSession(d) => format!("{}s split across the questions", d.as_secs()),
    };
    println!(
        "{} questions, {timing}, {}% to pass. Type q to quit.",
        quiz.question_count(),
        quiz.passing_score()
    );
}

fn print_question(index: usize, total: usize, question: &Question, allotted: Duration) {
    println!(
        "\nQuestion {}/{} ({}s)",
        index + 1,
        total,
        allotted.as_secs()
    );
    println!("{}", question.prompt());
    for (i, option) in question.options().iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
}

fn print_feedback(answer: &Answer, question: Option<&Question>) {
    match &answer.selection {
        Selection::NoAnswer => println!("  Time's up! The answer was: {}", answer.correct_option),
        _ if answer.is_correct => println!("  Correct! (+{} points)", answer.points_awarded),
        _ => println!("  Wrong. The answer was: {}", answer.correct_option),
    }
    if let Some(explanation) = question.and_then(|q| q.explanation()) {
        println!("  {explanation}");
    }
}

fn print_result(result: &QuizResult) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Time"]);

    for (i, answer) in result.answers.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&answer.prompt),
            Cell::new(format!(
                "{}{}",
                answer.selection,
                if answer.is_correct { " ✓" } else { "" }
            )),
            Cell::new(&answer.correct_option),
            Cell::new(format!("{:.1}s", answer.time_spent().as_secs_f64())),
        ]);
    }

    println!("\n{table}");
    println!("{}", result.summary_line());
    println!(
        "Points: {}/{}",
        result.score.points_earned, result.score.points_possible
    );
}

fn save_result(result: &QuizResult, dir: &Path) -> Result<()> {
    let timestamp = result.completed_at.format("%Y-%m-%dT%H%M%S");
    let path = dir.join(format!("result-{}-{timestamp}.json", result.quiz_id));
    result.save_json(&path)?;
    eprintln!("Result saved to: {}", path.display());
    Ok(())
}
