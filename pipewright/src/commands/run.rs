// pipewright/src/commands/run.rs
//
// USE CASE: Run one pipeline.

use std::path::Path;

use pipewright_core::RunStatus;

use super::load_manager;

pub async fn execute(project_dir: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let manager = load_manager(project_dir)?;

    let status = match manager.run_pipeline(name).await {
        Ok(status) => status,
        Err(e) => {
            eprintln!("\n💥 Could not start pipeline '{}': {}", name, e.tagged());
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print_summary(&status);
    }

    if !status.success {
        // Exit with error code for CI/CD
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(status: &RunStatus) {
    let rows = |n: Option<u64>| n.map_or("-".to_string(), |n| n.to_string());
    if status.success {
        println!(
            "\n✨ SUCCESS! '{}' moved {} rows ({} read) in {} ms",
            status.pipeline,
            rows(status.target_rows),
            rows(status.source_rows),
            status.duration_ms().unwrap_or_default()
        );
    } else {
        eprintln!("\n❌ FAILURE. '{}' did not complete:", status.pipeline);
        for error in &status.errors {
            eprintln!("   {}", error);
        }
    }
}
