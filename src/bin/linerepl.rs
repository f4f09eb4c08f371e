// パス: src/bin/linerepl.rs
// 役割: Binary entrypoint that configures logging and the terminal, then runs the REPL
// 意図: Offer a CLI executable bound to the process's standard streams
// 関連ファイル: src/repl/cmd.rs, src/repl/terminal.rs, src/config.rs, src/lib.rs
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use linerepl::evaluator::{Interpreter, Namespace};
use linerepl::repl::terminal::{spawn_stdin_pump, RawMode};
use linerepl::repl::{Console, ExecutionCoordinator, InterruptFlag, ReplLoop, SharedInput, SharedWriter};
use linerepl::{ReplConfig, ReplError};

#[derive(Parser, Debug)]
#[command(name = "linerepl")]
#[command(about = "Line-editing REPL with cancellable evaluation", long_about = None)]
struct Cli {
    /// 設定ファイル（JSON）
    #[arg(long, env = "LINEREPL_CONFIG")]
    config: Option<PathBuf>,

    /// プロンプト文字列
    #[arg(long)]
    prompt: Option<String>,

    /// 保持するコマンド履歴の件数
    #[arg(long)]
    history_limit: Option<usize>,

    /// 開始メッセージを出さない
    #[arg(long)]
    no_banner: bool,

    /// ログフィルタ（未指定なら RUST_LOG、それもなければ warn）
    #[arg(long)]
    log: Option<String>,
}

impl Cli {
    /// ファイルの設定にコマンドライン引数を上書きする。
    fn resolve_config(&self) -> Result<ReplConfig, ReplError> {
        let mut config = match &self.config {
            Some(path) => ReplConfig::load(path)?,
            None => ReplConfig::default(),
        };
        if let Some(prompt) = &self.prompt {
            config.prompt = prompt.clone();
        }
        if let Some(limit) = self.history_limit {
            config.history_limit = limit;
        }
        if self.no_banner {
            config.banner = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(directives: Option<&str>) {
    let filter = match directives {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init();
}

fn run(cli: &Cli) -> Result<(), ReplError> {
    let config = cli.resolve_config()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    let interrupts = InterruptFlag::new();
    let console = Arc::new(Console::new(SharedWriter::stdout()));
    let out = console.primary().clone();
    let interpreter = Interpreter::new(console.clone(), interrupts.clone());
    let coordinator =
        ExecutionCoordinator::new(interpreter, console, Arc::new(interrupts.clone()), &out);
    let mut repl = ReplLoop::new(config, coordinator, out);

    let _raw = RawMode::enable_if_tty()?;
    let input = SharedInput::new(spawn_stdin_pump(runtime.handle().clone(), interrupts)?);
    let mut globals = Namespace::new();
    runtime.block_on(repl.run(&input, &mut globals))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("linerepl: {}", err);
            ExitCode::FAILURE
        }
    }
}
