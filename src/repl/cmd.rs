// パス: src/repl/cmd.rs
// 役割: REPL main loop tying the session state machine to the execution coordinator
// 意図: Drive prompt, key handling and submission one line at a time
// 関連ファイル: src/repl/session.rs, src/repl/executor.rs, src/repl/printer.rs, src/bin/linerepl.rs
//! 対話ループ本体。
//!
//! プロンプトを出し、キーを 1 つずつセッションへ適用し、行が確定したらコーディネータへ渡す。
//! 投入中は次の行を読まないので、同時に評価されるコマンドは常に高々 1 つになる。

use std::io::{self, Write};

use tokio::io::AsyncRead;
use tracing::debug;

use super::executor::{Evaluator, ExecutionCoordinator};
use super::input::SharedInput;
use super::output::SharedWriter;
use super::printer::{write_outcome, STARTUP_BANNER};
use super::session::{LineEnd, Session};
use crate::config::ReplConfig;
use crate::errors::ReplError;

pub struct ReplLoop<E> {
    config: ReplConfig,
    session: Session,
    coordinator: ExecutionCoordinator<E>,
    out: SharedWriter,
}

impl<E: Evaluator> ReplLoop<E> {
    pub fn new(config: ReplConfig, coordinator: ExecutionCoordinator<E>, out: SharedWriter) -> Self {
        let session = Session::new(&config);
        Self {
            config,
            session,
            coordinator,
            out,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 入力が尽きるか Ctrl-D で終了するまでループする。
    ///
    /// # Examples
    /// ```no_run
    /// # async fn demo() -> Result<(), linerepl::ReplError> {
    /// use std::sync::Arc;
    /// use linerepl::evaluator::{Interpreter, Namespace};
    /// use linerepl::repl::{Console, ExecutionCoordinator, InterruptFlag, ReplLoop, SharedInput, SharedWriter};
    ///
    /// let console = Arc::new(Console::new(SharedWriter::stdout()));
    /// let flag = InterruptFlag::new();
    /// let out = console.primary().clone();
    /// let interpreter = Interpreter::new(console.clone(), flag.clone());
    /// let coordinator = ExecutionCoordinator::new(interpreter, console, Arc::new(flag), &out);
    /// let mut repl = ReplLoop::new(Default::default(), coordinator, out);
    /// let input = SharedInput::new(tokio::io::stdin());
    /// repl.run(&input, &mut Namespace::new()).await
    /// # }
    /// ```
    pub async fn run<R: AsyncRead + Unpin>(
        &mut self,
        input: &SharedInput<R>,
        globals: &mut E::Globals,
    ) -> Result<(), ReplError> {
        let mut out = self.out.clone();
        if self.config.banner {
            out.write_all(STARTUP_BANNER.as_bytes())?;
        }
        self.coordinator.disarm_interrupts();

        loop {
            self.session.begin_line();
            out.write_all(self.config.prompt.as_bytes())?;
            out.flush()?;

            let end = loop {
                let key = match self.session.next_key(input).await {
                    Ok(key) => key,
                    Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                        debug!("input stream closed");
                        out.write_all(b"\n")?;
                        out.flush()?;
                        return Ok(());
                    }
                    Err(err) => return Err(err.into()),
                };
                let end = self.session.apply(key, &mut out)?;
                out.flush()?;
                if let Some(end) = end {
                    break end;
                }
            };

            match end {
                LineEnd::Submit(command) => {
                    let outcome = self.coordinator.run(&command, globals, input).await;
                    write_outcome(&mut out, &outcome)?;
                    out.flush()?;
                }
                LineEnd::Discard => {}
                LineEnd::Exit => {
                    debug!("end of input requested");
                    return Ok(());
                }
            }
        }
    }
}
