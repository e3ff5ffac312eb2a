use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use stackbot_engine::BitGrid;
use stackbot_search::config::BotConfig;

/// Writes `value` as pretty JSON to `output_path`, or to stdout when `None`.
pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    match output_path {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_json(BufWriter::new(file), value)
                .with_context(|| format!("Failed to write JSON to {}", path.display()))
        }
        None => write_json(io::stdout().lock(), value).context("Failed to write JSON to stdout"),
    }
}

fn write_json<W, T>(mut writer: W, value: &T) -> anyhow::Result<()>
where
    W: Write,
    T: serde::Serialize,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;

    Ok(value)
}

pub fn read_config_file<P>(path: P) -> anyhow::Result<BotConfig>
where
    P: AsRef<Path>,
{
    read_json_file("bot config", path)
}

/// Reads a standard-size board drawn with `#` and `.`, bottom rows last.
pub fn read_board_file<P>(path: P) -> anyhow::Result<BitGrid>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let art = fs::read_to_string(path)
        .with_context(|| format!("Failed to read board file: {}", path.display()))?;
    BitGrid::board_from_ascii(&art)
        .with_context(|| format!("Failed to parse board file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::env;

    use stackbot_search::config::HeuristicTerm;

    use super::*;

    #[test]
    fn test_saved_config_reads_back() {
        let path = env::temp_dir().join(format!("stackbot-config-{}.json", std::process::id()));
        let mut config = BotConfig::default();
        config.weights.set(HeuristicTerm::HoleCount, -2.5);
        config.tetris_priority.enabled = false;

        save_json(&config, Some(path.clone())).unwrap();
        let read = read_config_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(read, config);
    }

    #[test]
    fn test_board_file_errors_name_the_file() {
        let err = read_board_file("/nonexistent/board.txt").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/board.txt"));

        let path = env::temp_dir().join(format!("stackbot-board-{}.txt", std::process::id()));
        fs::write(&path, "#########.\n").unwrap();
        let board = read_board_file(&path).unwrap();
        assert!(board.get(21, 0) && !board.get(21, 9));

        fs::write(&path, "###x\n").unwrap();
        assert!(read_board_file(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
