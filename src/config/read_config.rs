use crate::{
    config::{BaudRate, Profile},
    utils::{
        error::{LoggerError, LoggerResult},
        line_printer::DecodePolicy,
    },
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigDto {
    pub port_name: Option<String>,
    pub baud_rate: Option<BaudRate>,
    pub read_timeout_ms: Option<u64>,
    pub duration_secs: Option<f64>,
    pub profile: Option<Profile>,
    pub decode: Option<DecodePolicy>,
    pub log_dir: Option<PathBuf>,
}

pub fn read_config_file(path: &Path) -> LoggerResult<ConfigDto> {
    let config_err = |e: &dyn std::fmt::Display| LoggerError::config(format!("{:?}: {}", path, e));

    if path.is_dir() {
        return Err(config_err(&"path to dir"));
    }
    match path.extension() {
        Some(ext) if ext == "json" => {}
        _ => return Err(config_err(&"expected a .json file")),
    }

    let file = File::open(path).map_err(|e| config_err(&e))?;
    let dto: ConfigDto = serde_json::from_reader(BufReader::new(file)).map_err(|e| config_err(&e))?;
    debug!("[read_config] {:?} => {:?}", path, dto);
    Ok(dto)
}
