use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runtime::LaunchSpec;

fn default_instances() -> usize {
    2
}
fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_stop_grace_secs() -> u64 {
    5
}

/// One game client template; the supervisor launches `instances` copies of it.
#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub cmd: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_instances")]
    pub instances: usize,
    /// Window title template; `{n}` expands to the 1-based slot number.
    #[serde(default)]
    pub window_title: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FilterConfig {
    /// Appended to the built-in noisy-line patterns.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub client: ClientConfig,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default = "default_stop_grace_secs")]
    pub stop_grace_secs: u64,
}

impl Config {
    /*
        @@@
        @launch_specs();
        . Expands the client template into one LaunchSpec per slot (game1..gameN).
        . Raw log paths follow the fixed naming convention under log_dir:
          game{N}_raw.log for stdout, game{N}_error_raw.log for stderr.
        . Substitutes the slot number into the window title template, if any.
    */
    pub fn launch_specs(&self) -> Vec<LaunchSpec> {
        (1..=self.client.instances)
            .map(|n| {
                let name = format!("game{}", n);
                let mut env: Vec<(String, String)> =
                    self.client.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                env.sort();
                LaunchSpec {
                    stdout_path: self.log_dir.join(format!("{}_raw.log", name)),
                    stderr_path: self.log_dir.join(format!("{}_error_raw.log", name)),
                    name,
                    cmd: self.client.cmd.clone(),
                    args: self.client.args.clone(),
                    env,
                    window_title: self
                        .client
                        .window_title
                        .as_ref()
                        .map(|t| t.replace("{n}", &n.to_string())),
                }
            })
            .collect()
    }
}

/*
    @@@
    @parser();
    . Reads the YAML config file into a String; any I/O error is returned as an Err.
    . Hands the raw text to serde_yaml to map into the Config struct; malformed
      YAML is returned as an Err.
*/
pub fn parser<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let yaml_file = fs::read_to_string(path.as_ref())?;
    let parsed_config: Config = serde_yaml::from_str(&yaml_file)?;
    Ok(parsed_config)
}
