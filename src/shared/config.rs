use serde::{Deserialize, Serialize};

/// 現在のドラフト構造のスキーマバージョン（ペイロードではなくエンベロープのバージョン）
pub const DRAFT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftConfig {
    /// 保存時に付与し、読み込み時に照合するスキーマバージョン
    pub schema_version: u32,
    /// 容量超過時に削除する古いドラフトの割合（切り上げ）
    pub eviction_fraction: f64,
    /// 更新通知チャネルのバッファ数
    pub channel_capacity: usize,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            schema_version: DRAFT_SCHEMA_VERSION,
            eviction_fraction: 0.25,
            channel_capacity: 64,
        }
    }
}

impl DraftConfig {
    pub fn from_env() -> Self {
        // 既定値
        let mut cfg = Self::default();

        if let Some(value) = env_var("DRAFTLINE_SCHEMA_VERSION").and_then(|v| parse_u32(&v)) {
            cfg.schema_version = value.max(1);
        }
        if let Some(value) = env_var("DRAFTLINE_EVICTION_FRACTION").and_then(|v| parse_f64(&v)) {
            if value > 0.0 && value <= 1.0 {
                cfg.eviction_fraction = value;
            }
        }
        if let Some(value) = env_var("DRAFTLINE_CHANNEL_CAPACITY").and_then(|v| parse_usize(&v)) {
            cfg.channel_capacity = value.max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version == 0 {
            return Err("Draft schema_version must be greater than 0".to_string());
        }
        if !(self.eviction_fraction > 0.0 && self.eviction_fraction <= 1.0) {
            return Err("Draft eviction_fraction must be within (0, 1]".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("Draft channel_capacity must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_u32(value: &str) -> Option<u32> {
    value.trim().parse::<u32>().ok()
}

fn parse_f64(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}
