// pipewright/src/commands/list.rs

use std::path::Path;

use super::load_manager;

pub fn execute(project_dir: &Path) -> anyhow::Result<()> {
    let manager = load_manager(project_dir)?;

    println!("Pipelines:");
    for name in manager.list_pipelines() {
        println!("  {}", name);
    }
    println!("Schedules:");
    for name in manager.list_schedules() {
        println!("  {}", name);
    }
    println!("Connections:");
    for name in manager.registry().names() {
        println!("  {}", name);
    }
    Ok(())
}
