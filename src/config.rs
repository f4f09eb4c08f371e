// パス: src/config.rs
// 役割: REPL configuration loaded from JSON and overridden by command-line flags
// 意図: Give prompt, history size, debounce window and banner one validated home
// 関連ファイル: src/bin/linerepl.rs, src/repl/session.rs, src/repl/cmd.rs
//! REPL の設定。
//!
//! すべての項目に既定値があり、JSON ファイルでは変えたい項目だけを書けばよい。
//! 未知のキーは誤記とみなしてエラーにする。

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ReplError;
use crate::repl::decoder::DEFAULT_DEBOUNCE;
use crate::repl::history::DEFAULT_HISTORY_LIMIT;

pub const DEFAULT_PROMPT: &str = "--> ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplConfig {
    pub prompt: String,
    /// 保持するコマンド数。履歴の容量はこれに 1 を足した値になる。
    pub history_limit: usize,
    /// CRLF デバウンス幅（ミリ秒）。
    pub debounce_ms: u64,
    /// 起動時に開始メッセージを出すか。
    pub banner: bool,
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            banner: true,
        }
    }
}

impl ReplConfig {
    pub fn from_json_str(text: &str, origin: &Path) -> Result<Self, ReplError> {
        let config: ReplConfig =
            serde_json::from_str(text).map_err(|source| ReplError::ConfigParse {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ReplError> {
        let text = fs::read_to_string(path).map_err(|source| ReplError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text, path)
    }

    pub fn validate(&self) -> Result<(), ReplError> {
        if self.history_limit == 0 {
            return Err(ReplError::ConfigValue(
                "history_limit は 1 以上である必要があります".into(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 省略した項目が既定値で埋まることを確認する。
    fn partial_json_keeps_defaults() {
        let cfg = ReplConfig::from_json_str(r#"{"prompt": ">>> "}"#, Path::new("inline")).unwrap();
        assert_eq!(cfg.prompt, ">>> ");
        assert_eq!(cfg.history_limit, 5);
        assert_eq!(cfg.debounce(), Duration::from_millis(20));
        assert!(cfg.banner);
    }

    #[test]
    /// 未知のキーと 0 件の履歴が拒否されることを確認する。
    fn rejects_unknown_keys_and_zero_history() {
        let err = ReplConfig::from_json_str(r#"{"promt": "x"}"#, Path::new("inline")).unwrap_err();
        assert!(matches!(err, ReplError::ConfigParse { .. }));
        let err =
            ReplConfig::from_json_str(r#"{"history_limit": 0}"#, Path::new("inline")).unwrap_err();
        assert!(matches!(err, ReplError::ConfigValue(_)));
    }
}
