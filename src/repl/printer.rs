// パス: src/repl/printer.rs
// 役割: Rendering of evaluation outcomes and fixed REPL messages
// 意図: Keep what the user sees after each submission in one place
// 関連ファイル: src/repl/cmd.rs, src/repl/executor.rs
//! 評価結果の表示。値は `repr` 相当の表現、エラーは `種別: メッセージ` で 1 行ずつ出す。

use std::fmt::Display;
use std::io::{self, Write};

use super::executor::Outcome;

pub(crate) const STARTUP_BANNER: &str = "Starting asyncio REPL...\n";

/// 結果を書き出す。値を持たない結果と取り消しは何も出さない。
pub(crate) fn write_outcome<W: Write, V: Display>(out: &mut W, outcome: &Outcome<V>) -> io::Result<()> {
    match outcome {
        Outcome::Value(value) => writeln!(out, "{}", value),
        Outcome::Error(err) => writeln!(out, "{}: {}", err.kind, err.message),
        Outcome::Silent | Outcome::Cancelled => Ok(()),
    }
}
