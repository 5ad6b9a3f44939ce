// pipewright/src/commands/schedule.rs
//
// USE CASE: Run every pipeline of a schedule.

use std::path::Path;

use super::load_manager;

pub async fn execute(project_dir: &Path, name: &str) -> anyhow::Result<()> {
    let manager = load_manager(project_dir)?;

    let statuses = match manager.run_schedule(name).await {
        Ok(statuses) => statuses,
        Err(e) => {
            eprintln!("\n💥 Could not run schedule '{}': {}", name, e.tagged());
            std::process::exit(1);
        }
    };

    println!("📊 Schedule '{}':", name);
    for status in &statuses {
        let mark = if status.success { "✅" } else { "❌" };
        println!(
            "   {} {} ({} rows)",
            mark,
            status.pipeline,
            status.target_rows.unwrap_or_default()
        );
        for error in &status.errors {
            println!("      {}", error);
        }
    }

    let failed = statuses.iter().filter(|s| !s.success).count();
    if failed > 0 {
        eprintln!("\n❌ FAILURE. {} pipeline(s) failed.", failed);
        std::process::exit(1);
    }
    println!("\n✨ SUCCESS! {} pipeline(s) completed.", statuses.len());
    Ok(())
}
