//! JSON documents exchanged by the command-line tools

use feature_weights::LearnedFeatureWeights;
use game_stats::SeasonData;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

pub fn load_season_data(path: &Path) -> Result<SeasonData> {
    read_json(path)
}

pub fn load_weights(path: &Path) -> Result<LearnedFeatureWeights> {
    read_json(path)
}

/// Pretty-print `value` to `path`, or to stdout when no path is given
pub fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            serde_json::to_writer_pretty(&mut lock, value)?;
            lock.write_all(b"\n")?;
        }
    }
    Ok(())
}
