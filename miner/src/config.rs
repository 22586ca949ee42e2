use std::{fs::File, io, path::Path};

use serde::{Deserialize, Serialize};
use shared::digest::Algorithm;

/// Optional defaults read from a JSON file. Command line flags win.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, rename_all = "snake_case")]
pub struct MinerConfig {
    pub workers: Option<u32>,
    pub poll_interval: Option<u64>,
    pub domain: Option<u64>,
    pub algorithm: Option<Algorithm>,
    pub pin_cores: Option<bool>,
    pub ack_timeout_ms: Option<u64>,
}

pub fn load_config_file<P>(config_file: P) -> Result<MinerConfig, io::Error>
where
    P: AsRef<Path>, {
    let path = config_file.as_ref();
    let file = File::open(path).map_err(|err| {
        io::Error::new(err.kind(), format!("{} config file: {err}", path.display()))
    })?;
    let config = serde_json::from_reader(file)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}")))?;
    Ok(config)
}
