//! The `heritage-quiz init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("heritage-quiz.toml").exists() {
        println!("heritage-quiz.toml already exists, skipping.");
    } else {
        std::fs::write("heritage-quiz.toml", SAMPLE_CONFIG)?;
        println!("Created heritage-quiz.toml");
    }

    std::fs::create_dir_all("banks")?;
    let example_path = std::path::Path::new("banks/example.toml");
    if example_path.exists() {
        println!("banks/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_BANK)?;
        println!("Created banks/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Add your own banks under banks/");
    println!("  2. Run: heritage-quiz validate --bank banks/example.toml");
    println!("  3. Run: heritage-quiz play --bank banks/example.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# heritage-quiz configuration

default_source = "local"
tick_interval_ms = 1000
# passing_score = 70
# seconds_per_question = 30
# output_dir = "./quiz-results"

[sources.local]
type = "directory"
path = "./banks"

# [sources.museum]
# type = "http"
# base_url = "https://quiz.example.org/api"
# api_key = "${HERITAGE_QUIZ_API_KEY}"
"#;

const EXAMPLE_BANK: &str = r#"[quiz]
id = "example"
name = "Example Heritage Quiz"
description = "A short quiz to get started"
topic = "example"
passing_score = 70
time_per_question_secs = 30

[[questions]]
id = "borobudur"
prompt = "Borobudur, the largest Buddhist temple in the world, is on which island?"
options = ["Java", "Bali", "Sumatra", "Sulawesi"]
correct = 0
explanation = "Borobudur stands in Magelang, Central Java."

[[questions]]
id = "batik"
prompt = "Which Indonesian craft was inscribed by UNESCO as Intangible Cultural Heritage in 2009?"
options = ["Wayang kulit", "Batik", "Keris"]
correct = 1
explanation = "Batik was inscribed in 2009; wayang and keris were proclaimed earlier, in 2003 and 2005."
"#;
