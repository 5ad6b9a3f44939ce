// pipewright/src/commands/check.rs
//
// USE CASE: Pre-flight check. Builds every pipeline and resolves its
// connections, without opening any session.

use std::path::Path;

use super::load_manager;

pub fn execute(project_dir: &Path) -> anyhow::Result<()> {
    println!("🩺 Checking project {}...", project_dir.display());
    let manager = load_manager(project_dir)?;

    let pipelines = manager.list_pipelines();
    let mut failures = 0;
    for name in &pipelines {
        match manager.pipeline(name).and_then(|p| p.check().map(|()| p.mode())) {
            Ok(mode) => println!("   ✅ {} ({})", name, mode),
            Err(e) => {
                failures += 1;
                println!("   ❌ {}: {}", name, e.tagged());
            }
        }
    }

    if failures > 0 {
        eprintln!("\n⚠️  {} of {} pipeline(s) are misconfigured.", failures, pipelines.len());
        std::process::exit(1);
    }
    println!("\n✨ {} pipeline(s) OK.", pipelines.len());
    Ok(())
}
