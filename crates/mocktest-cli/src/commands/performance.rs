//! The `mocktest performance` command.

use anyhow::Result;
use comfy_table::{Cell, Table};

use mocktest_core::model::Role;
use mocktest_core::statistics::{
    aggregate_by_subject, class_overview, performance_distribution, search_learners, Bucket,
};
use mocktest_core::traits::Repository;

use super::{authenticate, fmt_percent, load_state, Credentials, GlobalOpts};

pub async fn execute(
    global: &GlobalOpts,
    auth: Credentials,
    subject: Option<String>,
    search: Option<String>,
) -> Result<()> {
    let state = load_state(global).await?;
    authenticate(&state, &auth, Some(Role::Instructor))?;

    let subjects = state.store.subjects().await?;
    let rows = state.performance().await?;

    let overview = class_overview(&rows);
    println!(
        "Learners: {} ({} active)  Tests taken: {}  Class average: {}",
        overview.learners,
        overview.active_learners,
        overview.tests_taken,
        overview
            .class_average
            .map(|a| format!("{a}%"))
            .unwrap_or_else(|| "-".into())
    );

    let mut stats_table = Table::new();
    stats_table.set_header(vec![
        "Subject",
        "Average",
        "Participation",
        "Excellent",
        "Good",
        "Average",
        "Needs Improvement",
    ]);
    for subject in &subjects {
        let stats = aggregate_by_subject(subject, &rows);
        let mut row = vec![
            Cell::new(&stats.name),
            Cell::new(fmt_percent(stats.average_score)),
            Cell::new(format!("{}%", stats.participation_rate)),
        ];
        row.extend(
            Bucket::ALL
                .iter()
                .map(|b| Cell::new(stats.distribution.get(*b))),
        );
        stats_table.add_row(row);
    }
    println!("\n{stats_table}");

    let learners = match &search {
        Some(query) => search_learners(&rows, query),
        None => rows.iter().collect(),
    };
    let mut learner_table = Table::new();
    let mut header = vec!["Learner".to_string(), "Email".to_string(), "Tests".to_string()];
    header.extend(subjects.iter().map(|s| s.name.clone()));
    header.push("Average".to_string());
    learner_table.set_header(header);
    for learner in &learners {
        let mut row = vec![
            Cell::new(&learner.name),
            Cell::new(&learner.email),
            Cell::new(learner.tests_taken),
        ];
        row.extend(subjects.iter().map(|s| {
            Cell::new(
                learner
                    .subject_score(&s.id)
                    .map(|v| format!("{v}%"))
                    .unwrap_or_else(|| "-".into()),
            )
        }));
        row.push(Cell::new(fmt_percent(learner.average_score)));
        learner_table.add_row(row);
    }
    if learners.is_empty() {
        println!("\nNo learners match.");
    } else {
        println!("\n{learner_table}");
    }

    let scope = match &subject {
        Some(key) => Some(state.subject(key).await?),
        None => None,
    };
    let distribution = performance_distribution(&rows, scope.as_ref().map(|s| s.id.as_str()));
    println!(
        "\nPerformance distribution ({}):",
        scope.as_ref().map(|s| s.name.as_str()).unwrap_or("overall average")
    );
    for bucket in Bucket::ALL {
        println!("  {:<26} {}", bucket.label(), distribution.get(bucket));
    }

    Ok(())
}
