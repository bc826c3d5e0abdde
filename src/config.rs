use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use log::{error, warn};
use std::fs::File;
use std::io::{self, prelude::*};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_buffer_size")]
    buffer_size: usize,
    #[serde(default = "default_log_config")]
    log_config: String,
}

fn default_buffer_size() -> usize {
    8192 // 8KB
}

fn default_log_config() -> String {
    "config/log4rs.yaml".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 7878,
            worker_threads: 0,
            local: true,
            buffer_size: default_buffer_size(),
            log_config: default_log_config(),
        }
    }

    /// 读取 TOML 配置。文件无法读取时返回错误；内容无法解析时记录日志并使用默认配置。
    pub fn from_toml(filename: &str) -> io::Result<Self> {
        let mut file = File::open(filename)?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)?;
        Ok(Self::from_toml_str(&str_val))
    }

    pub fn from_toml_str(str_val: &str) -> Self {
        let mut raw_config = match toml::from_str::<Config>(str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.buffer_size < 512 {
            warn!(
                "buffer_size被设置为{}，不足以容纳常见请求头，因此该值将被改为{}。",
                raw_config.buffer_size,
                default_buffer_size()
            );
            raw_config.buffer_size = default_buffer_size();
        }
        raw_config
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn log_config(&self) -> &str {
        &self.log_config
    }
}
