//! The `heritage-quiz validate` command.

use std::path::PathBuf;

use anyhow::Result;

use heritage_quiz_core::parser;

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let files = if bank_path.is_dir() {
        parser::find_bank_files(&bank_path)?
    } else {
        vec![bank_path]
    };

    let mut total_warnings = 0;
    let mut invalid = 0;

    for path in &files {
        let document = parser::read_document(path)?;
        let warnings = parser::validate_document(&document);

        match document.clone().into_config() {
            Ok(quiz) => println!(
                "Bank: {} ({} questions) [{}]",
                quiz.name(),
                quiz.question_count(),
                path.display()
            ),
            Err(e) => {
                println!("Bank: {} [{}]", document.quiz.name, path.display());
                println!("  ERROR: {e}");
                invalid += 1;
            }
        }

        for w in &warnings {
            let prefix = w
                .question_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if invalid > 0 {
        anyhow::bail!("{invalid} invalid question bank(s)");
    }

    if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
