// パス: src/repl/mod.rs
// 役割: REPL module facade and re-exports
// 意図: Expose the interactive loop and its collaborator contracts without leaking internals
// 関連ファイル: src/repl/cmd.rs, src/repl/executor.rs, src/bin/linerepl.rs
//! 対話環境を構成するモジュール群をまとめたファサード。
//!
//! - `decoder` / `line_editor` / `history` / `session`: キー入力から行編集まで
//! - `executor` / `rewrite`: 確定した行の実行と取り消し
//! - `output` / `interrupt` / `input`: 評価器・端末と共有する資源
//! - `cmd` / `printer` / `terminal`: ループ本体と表示、端末との接続

pub mod cmd;
pub mod decoder;
pub mod executor;
pub mod history;
pub mod input;
pub mod interrupt;
pub mod line_editor;
pub mod output;
mod printer;
pub mod rewrite;
pub mod session;
pub mod terminal;

pub use cmd::ReplLoop;
pub use executor::{Evaluator, ExecutionCoordinator, Outcome};
pub use input::SharedInput;
pub use interrupt::{InterruptDelivery, InterruptFlag};
pub use output::{Console, OutputMirror, SharedWriter};
pub use session::{LineEnd, Session};
