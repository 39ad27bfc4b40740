//! The `heritage-quiz topics` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};
use futures::future::join_all;

use heritage_quiz_providers::config::load_config_from;
use heritage_quiz_providers::create_provider;

pub async fn execute(source_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let mut names: Vec<&String> = config
        .sources
        .keys()
        .filter(|name| source_filter.as_ref().map_or(true, |f| f == *name))
        .collect();
    names.sort();

    if names.is_empty() {
        match &source_filter {
            Some(filter) => anyhow::bail!("unknown bank source: {filter}"),
            None => {
                println!("No bank sources configured. Run `heritage-quiz init` to create a config file.");
                return Ok(());
            }
        }
    }

    let mut providers = Vec::new();
    for name in names {
        providers.push(create_provider(name, &config.sources[name])?);
    }

    let listings = join_all(providers.iter().map(|p| p.topics())).await;

    let mut table = Table::new();
    table.set_header(vec!["Source", "Topic", "Name", "Questions"]);
    let mut found = 0;

    for (provider, listing) in providers.iter().zip(listings) {
        match listing {
            Ok(topics) => {
                for topic in topics {
                    found += 1;
                    table.add_row(vec![
                        Cell::new(&topic.source),
                        Cell::new(&topic.topic),
                        Cell::new(&topic.name),
                        Cell::new(topic.question_count),
                    ]);
                }
            }
            Err(e) => eprintln!("Warning: source '{}' unavailable: {e:#}", provider.name()),
        }
    }

    if found == 0 {
        println!("No topics found.");
    } else {
        println!("{table}");
    }

    Ok(())
}
