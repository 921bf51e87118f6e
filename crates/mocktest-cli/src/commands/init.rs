//! The `mocktest init` command.

use anyhow::Result;

use mocktest_store::seed::bundled_bank_toml;

pub fn execute() -> Result<()> {
    // Create mocktest.toml
    if std::path::Path::new("mocktest.toml").exists() {
        println!("mocktest.toml already exists, skipping.");
    } else {
        std::fs::write("mocktest.toml", SAMPLE_CONFIG)?;
        println!("Created mocktest.toml");
    }

    // Copy the bundled bank so it can be edited
    std::fs::create_dir_all("banks")?;
    let bank_path = std::path::Path::new("banks/question-bank.toml");
    if bank_path.exists() {
        println!("banks/question-bank.toml already exists, skipping.");
    } else {
        std::fs::write(bank_path, bundled_bank_toml())?;
        println!("Created banks/question-bank.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: mocktest validate --bank banks");
    println!("  2. Run: mocktest subjects");
    println!("  3. Run: mocktest take --email student@example.com --password password --subject python");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# mocktest configuration

# Question bank file or directory. Remove to use the bundled bank.
question_bank = "banks"

# Accounts, edited questions and attempts are saved here.
state_file = ".mocktest/state.json"
persist = true
"#;
