//! バッファ設定

use serde::{Deserialize, Serialize};

/// タイマースレッド名のデフォルト
pub const DEFAULT_TIMER_THREAD_NAME: &str = "ssh-buffer-deadline";

/// セグメントキュー初期容量のデフォルト
pub const DEFAULT_SEGMENT_CAPACITY: usize = 16;

/// セグメントキュー初期容量の上限
///
/// `segment_capacity` がこれを超える場合はこの値に切り詰めて確保する。
/// キュー自体はこれを超えても伸びる。
pub const MAX_SEGMENT_CAPACITY: usize = 4096;

/// `Buffer` の生成時設定
///
/// 省略したフィールドはデフォルト値になる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// デッドラインタイマースレッドの名前
    pub timer_thread_name: String,
    /// セグメントキューの初期容量（事前確保のヒントのみ、上限ではない）
    ///
    /// 実際の確保量は `MAX_SEGMENT_CAPACITY` までに制限される。
    pub segment_capacity: usize,
}

impl BufferConfig {
    /// 実際に事前確保するセグメント数
    pub fn effective_segment_capacity(&self) -> usize {
        self.segment_capacity.min(MAX_SEGMENT_CAPACITY)
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            timer_thread_name: DEFAULT_TIMER_THREAD_NAME.to_owned(),
            segment_capacity: DEFAULT_SEGMENT_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: BufferConfig = serde_json::from_str(r#"{"segment_capacity": 4}"#).unwrap();
        assert_eq!(config.segment_capacity, 4);
        assert_eq!(config.timer_thread_name, DEFAULT_TIMER_THREAD_NAME);

        let empty: BufferConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, BufferConfig::default());
    }

    #[test]
    fn test_segment_capacity_is_clamped() {
        let config: BufferConfig =
            serde_json::from_str(r#"{"segment_capacity": 18446744073709551615}"#).unwrap();
        assert_eq!(config.segment_capacity, usize::MAX, "設定値そのものは保持する");
        assert_eq!(config.effective_segment_capacity(), MAX_SEGMENT_CAPACITY);
        assert_eq!(BufferConfig::default().effective_segment_capacity(), DEFAULT_SEGMENT_CAPACITY);
    }

    #[test]
    fn test_serialize_field_names() {
        let json = serde_json::to_value(BufferConfig::default()).unwrap();
        assert_eq!(json["timer_thread_name"], DEFAULT_TIMER_THREAD_NAME);
        assert_eq!(json["segment_capacity"], DEFAULT_SEGMENT_CAPACITY);
    }
}
