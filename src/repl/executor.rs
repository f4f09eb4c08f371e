// パス: src/repl/executor.rs
// 役割: Execution coordinator racing a submitted command against an interrupt watcher
// 意図: Normalize every evaluation into one outcome while always restoring mirrored output
// 関連ファイル: src/repl/rewrite.rs, src/repl/output.rs, src/repl/interrupt.rs, src/evaluator.rs
//! 実行コーディネータ。
//!
//! コマンドは次のどちらかの経路で実行される。
//! - 中断可能経路: 中断トークンを含むコマンドをユニットに包んで評価器へ投入し、入力を 1 バイトずつ
//!   読む監視タスクと競走させる。監視が Ctrl-C を読んだらユニットを取り消す。
//! - 直接経路: 割り込み配送を有効にしたまま同期的に評価する。式として拒否されたら文として再試行する。
//!
//! どちらの経路でも、評価器のエラーは `Outcome` に変換され、外へは漏れない。
//! ミラー出力の復元と割り込みの解除はガードの `Drop` で行う。

use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::input::SharedInput;
use super::interrupt::{InterruptDelivery, InterruptGuard, CTRL_C};
use super::output::{MirrorGuard, OutputMirror, SharedWriter};
use super::rewrite::{needs_suspension, wrap_suspendable, SuspendableUnit};
use crate::errors::EvalError;

/// 評価器の契約。ソースをどう実行可能にするかは評価器の内部事情で、REPL はこの入口だけを使う。
#[async_trait(?Send)]
pub trait Evaluator {
    /// 評価をまたいで保持される名前空間。
    type Globals;
    /// 評価結果。表示は `repr` 相当の表現を返すこと。
    type Value: Display;

    /// 中断可能ユニットを実行する。返した future が破棄されたら取り消されたものとみなす。
    async fn submit(
        &self,
        unit: &SuspendableUnit,
        globals: &mut Self::Globals,
    ) -> Result<Option<Self::Value>, EvalError>;

    /// 式として即時評価する。式でなければ `SyntaxError` 種別を返す。
    fn evaluate_now(
        &self,
        source: &str,
        globals: &mut Self::Globals,
    ) -> Result<Option<Self::Value>, EvalError>;

    /// 文として即時実行する。
    fn execute_now(&self, source: &str, globals: &mut Self::Globals) -> Result<(), EvalError>;
}

/// 1 回の投入の結果。
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<V> {
    Value(V),
    /// 値を持たない正常終了（代入や `None`）。
    Silent,
    Error(EvalError),
    Cancelled,
}

impl<V> Outcome<V> {
    /// 評価器の戻り値を正規化する。同期割り込みは取り消しと同じ扱いにする。
    pub fn from_result(result: Result<Option<V>, EvalError>) -> Self {
        match result {
            Ok(Some(value)) => Outcome::Value(value),
            Ok(None) => Outcome::Silent,
            Err(err) if err.is_interrupt() => Outcome::Cancelled,
            Err(err) => Outcome::Error(err),
        }
    }
}

pub struct ExecutionCoordinator<E> {
    evaluator: E,
    mirror: Arc<dyn OutputMirror>,
    interrupts: Arc<dyn InterruptDelivery>,
    mirror_target: Option<SharedWriter>,
}

impl<E: Evaluator> ExecutionCoordinator<E> {
    /// `output` が既定の出力と異なる場合だけ、評価中にミラーとしてインストールする。
    pub fn new(
        evaluator: E,
        mirror: Arc<dyn OutputMirror>,
        interrupts: Arc<dyn InterruptDelivery>,
        output: &SharedWriter,
    ) -> Self {
        let mirror_target = if mirror.is_primary(output) {
            None
        } else {
            Some(output.clone())
        };
        Self {
            evaluator,
            mirror,
            interrupts,
            mirror_target,
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// 編集中は割り込みバイトを通常の入力として扱う。
    pub fn disarm_interrupts(&self) {
        self.interrupts.disable();
    }

    /// コマンドを実行し、結果を正規化して返す。
    pub async fn run<R: AsyncRead + Unpin>(
        &self,
        source: &str,
        globals: &mut E::Globals,
        input: &SharedInput<R>,
    ) -> Outcome<E::Value> {
        if source.trim().is_empty() {
            return Outcome::Silent;
        }
        let _mirror = MirrorGuard::install(self.mirror.as_ref(), self.mirror_target.as_ref());
        let outcome = if needs_suspension(source) {
            self.run_suspendable(source, globals, input).await
        } else {
            self.run_direct(source, globals)
        };
        trace!(
            cancelled = matches!(outcome, Outcome::Cancelled),
            failed = matches!(outcome, Outcome::Error(_)),
            "submission finished"
        );
        outcome
    }

    async fn run_suspendable<R: AsyncRead + Unpin>(
        &self,
        source: &str,
        globals: &mut E::Globals,
        input: &SharedInput<R>,
    ) -> Outcome<E::Value> {
        let unit = wrap_suspendable(source);
        debug!(
            declared = ?unit.declared,
            yields_value = unit.yields_value,
            "submitting suspendable unit"
        );
        let token = CancellationToken::new();
        let watcher = watch_for_interrupt(input.clone(), token.clone());
        tokio::pin!(watcher);
        let task = async {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = self.evaluator.submit(&unit, globals) => Some(result),
            }
        };
        tokio::pin!(task);

        let mut watcher_done = false;
        let finished = loop {
            tokio::select! {
                finished = &mut task => break finished,
                _ = &mut watcher, if !watcher_done => watcher_done = true,
            }
        };
        if !watcher_done {
            token.cancel();
            (&mut watcher).await;
            trace!("interrupt watcher stopped");
        }

        match finished {
            Some(result) => Outcome::from_result(result),
            None => {
                debug!("suspendable unit cancelled");
                Outcome::Cancelled
            }
        }
    }

    fn run_direct(&self, source: &str, globals: &mut E::Globals) -> Outcome<E::Value> {
        debug!("evaluating on the direct path");
        let _armed = InterruptGuard::enable(self.interrupts.as_ref(), CTRL_C);
        let result = match self.evaluator.evaluate_now(source, globals) {
            Err(err) if err.is_syntax() => {
                trace!(%err, "not an expression, retrying as a statement");
                self.evaluator
                    .execute_now(source, globals)
                    .map(|()| None)
            }
            other => other,
        };
        Outcome::from_result(result)
    }
}

/// Ctrl-C を読むまで入力を消費し、読んだらトークンを取り消す。
/// トークンが先に取り消されたら、読み取り途中でも終了する。
/// それ以外のバイトは読み捨てる（評価中のタイプ入力は失われる）。
async fn watch_for_interrupt<R: AsyncRead + Unpin>(input: SharedInput<R>, token: CancellationToken) {
    loop {
        let read = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            read = input.read_byte() => read,
        };
        match read {
            Ok(CTRL_C) => {
                debug!("interrupt observed while evaluating");
                token.cancel();
                return;
            }
            Ok(byte) => trace!(byte, "watcher discarded input byte"),
            Err(err) => {
                warn!(%err, "interrupt watcher stopped reading input");
                return;
            }
        }
    }
}
