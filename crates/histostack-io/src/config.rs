use anyhow::{Context, Result};
use std::path::Path;
use histostack_iteration::IterationConfig;

/// Load an iteration config from a JSON file.
pub fn read_config<P: AsRef<Path>>(path: P) -> Result<IterationConfig> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open config {}", path.display()))?;
    let config: IterationConfig = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

/// Write an iteration config as pretty-printed JSON.
pub fn write_config<P: AsRef<Path>>(path: P, config: &IterationConfig) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, text).with_context(|| format!("Failed to write config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use histostack_core::ChannelConfig;
    use tempfile::tempdir;

    #[test]
    fn test_config_file_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("iteration.json");
        let config = IterationConfig::new(10, 40)
            .with_neighbourhood(2)
            .with_channels(ChannelConfig::new().with_outline(true, 0.5));

        write_config(&path, &config)?;
        assert_eq!(read_config(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_config_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("iteration.json");
        std::fs::write(&path, r#"{"start_slice": 1, "end_slice": 9, "neighbourhood": 3}"#)?;

        let config = read_config(&path)?;
        assert_eq!(config.neighbourhood, 3);
        assert_eq!(config.registration.metric.ants_name(), "CC");
        assert!(config.channels.intensity.is_active());
        Ok(())
    }
}
