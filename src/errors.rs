// パス: src/errors.rs
// 役割: Error types shared by the language pipeline and the REPL front end
// 意図: Keep evaluator categories and front-end failures in one place
// 関連ファイル: src/lexer.rs, src/parser/mod.rs, src/evaluator.rs, src/repl/executor.rs
//! エラー型の定義。
//!
//! - 字句・構文エラーは共通フォーマット `[CODE] メッセージ @pos` を保つ。
//! - 評価器のエラーは「種別: メッセージ」で表示され、REPL はこれをそのまま出力する。
//! - フロントエンド自身の失敗（入出力・設定）は `ReplError` にまとめる。

use std::fmt::{self, Display, Formatter};
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 構文エラーの種別名。直接評価では「文として再試行せよ」の合図を兼ねる。
pub const SYNTAX_ERROR: &str = "SyntaxError";
/// 同期割り込みで評価が中断されたことを示す種別名。
pub const KEYBOARD_INTERRUPT: &str = "KeyboardInterrupt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: &'static str,
    pub msg: String,
    pub pos: Option<usize>, // バイトオフセット（任意）
}

impl ErrorInfo {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self {
            code,
            msg: msg.into(),
            pos,
        }
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(p) => write!(f, "[{}] {} @pos={}", self.code, self.msg, p),
            None => write!(f, "[{}] {}", self.code, self.msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct LexerError(pub ErrorInfo);

impl LexerError {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self(ErrorInfo::new(code, msg, pos))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseError(pub ErrorInfo);

impl ParseError {
    pub fn new(code: &'static str, msg: impl Into<String>, pos: Option<usize>) -> Self {
        Self(ErrorInfo::new(code, msg, pos))
    }
}

/// 評価器が送出する分類付きエラー。表示は `kind: message`。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct EvalError {
    pub kind: String,
    pub message: String,
}

impl EvalError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(SYNTAX_ERROR, message)
    }

    pub fn interrupted() -> Self {
        Self::new(KEYBOARD_INTERRUPT, "")
    }

    /// 式としては受理できず、文として再評価すべきエラーか。
    pub fn is_syntax(&self) -> bool {
        self.kind == SYNTAX_ERROR
    }

    pub fn is_interrupt(&self) -> bool {
        self.kind == KEYBOARD_INTERRUPT
    }
}

impl From<LexerError> for EvalError {
    fn from(err: LexerError) -> Self {
        EvalError::syntax(err.0.msg)
    }
}

impl From<ParseError> for EvalError {
    fn from(err: ParseError) -> Self {
        EvalError::syntax(err.0.msg)
    }
}

/// REPL フロントエンドの失敗。評価器由来のエラーはここへは来ない。
#[derive(Debug, Error)]
pub enum ReplError {
    #[error("入出力エラー: {0}")]
    Io(#[from] io::Error),
    #[error("設定ファイルを読めません: {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("設定ファイルの形式が不正です: {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("設定値が不正です: {0}")]
    ConfigValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// 評価エラーが `kind: message` 形式で描画されるか確認する。
    fn eval_error_displays_kind_and_message() {
        let err = EvalError::new("ZeroDivisionError", "division by zero");
        assert_eq!(err.to_string(), "ZeroDivisionError: division by zero");
        assert!(!err.is_syntax());
        assert!(EvalError::interrupted().is_interrupt());
    }

    #[test]
    /// 構文エラーが `SyntaxError` 種別へ変換されることを検証する。
    fn parse_error_converts_to_syntax_kind() {
        let err: EvalError = ParseError::new("PAR001", "invalid syntax", Some(3)).into();
        assert!(err.is_syntax());
        assert_eq!(err.message, "invalid syntax");
        assert_eq!(
            ParseError::new("PAR001", "invalid syntax", Some(3)).to_string(),
            "[PAR001] invalid syntax @pos=3"
        );
    }
}
