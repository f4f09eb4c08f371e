// パス: src/lib.rs
// 役割: Crate root wiring modules and exports
// 意図: Expose the REPL front end and the reference language behind a small API surface
// 関連ファイル: src/repl/mod.rs, src/evaluator.rs, src/config.rs, src/errors.rs
//! linerepl ルートモジュール
//!
//! 目的:
//! - 生のバイト列から行を編集し、確定したコマンドを取り消し可能な形で評価する対話ループを提供する。
//! - 評価器は差し替え可能な契約（`repl::Evaluator`）で、参照実装として小さな言語を同梱する。
//!
//! 方針:
//! - コメント/ドキュメントは日本語、識別子は英語。
//! - 実行は単一スレッドの協調スケジューラ（tokio current-thread）上で行う。
//! - パブリックAPIは最小限。

pub mod ast;
pub mod config;
pub mod errors;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod repl;

// 便利な再エクスポート（利用側から AST/エラー/パーサを直接参照できるようにする）
pub use crate::ast::*;
pub use crate::config::ReplConfig;
pub use crate::errors::*;
pub use crate::parser::*;
