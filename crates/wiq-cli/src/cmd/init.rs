use anyhow::Context;
use std::path::Path;
use wiq_core::{config::Config, io, paths};

pub fn run(root: &Path, project: Option<&str>) -> anyhow::Result<()> {
    let project_name = match project {
        Some(name) => name.to_string(),
        None => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string()),
    };

    println!("Initializing wiq in: {}", root.display());

    let dir = paths::wiq_dir(root);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let config = serde_yaml::to_string(&Config::new(&project_name))?;
    let created = io::write_if_missing(&paths::config_path(root), config.as_bytes())
        .context("failed to write config.yaml")?;
    let verb = if created { "created:" } else { "exists: " };
    println!("  {verb} {}", paths::CONFIG_FILE);

    println!("\nNext: add saved query ids under 'queries:' in {}", paths::CONFIG_FILE);
    Ok(())
}
