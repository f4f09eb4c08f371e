// パス: src/repl/session.rs
// 役割: Per-session editing state and the key-to-edit state machine
// 意図: Keep buffer, history, debounce and paste mode in one value owned by the loop
// 関連ファイル: src/repl/cmd.rs, src/repl/line_editor.rs, src/repl/history.rs, src/repl/decoder.rs
//! 対話セッションの可変状態。
//!
//! 行バッファ・履歴・デバウンス状態・ペーストモードをまとめて保持し、
//! デコード済みのキーを 1 つずつ適用して、行が終わったかどうかを返す。

use std::io::{self, Write};

use tokio::io::AsyncRead;
use tracing::trace;

use super::decoder::{InputDecoder, Key};
use super::history::{Direction, HistoryRing};
use super::input::SharedInput;
use super::line_editor::LineBuffer;
use crate::config::ReplConfig;

pub const PASTE_BANNER: &str = "paste mode; Ctrl-C to cancel, Ctrl-D to finish\n===\n";

/// 1 行の編集がどう終わったか。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEnd {
    /// 評価すべきコマンド。
    Submit(String),
    /// 行を捨ててプロンプトからやり直す。
    Discard,
    /// ループを終了する。
    Exit,
}

#[derive(Debug, Clone)]
pub struct Session {
    line: LineBuffer,
    history: HistoryRing,
    decoder: InputDecoder,
    paste_mode: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(&ReplConfig::default())
    }
}

impl Session {
    pub fn new(config: &ReplConfig) -> Self {
        Self {
            line: LineBuffer::new(),
            history: HistoryRing::new(config.history_limit),
            decoder: InputDecoder::new(config.debounce()),
            paste_mode: false,
        }
    }

    pub fn line(&self) -> &LineBuffer {
        &self.line
    }

    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    pub fn paste_mode(&self) -> bool {
        self.paste_mode
    }

    /// プロンプトを出す直前に呼ぶ。行・ペーストモード・閲覧位置を初期化する。
    pub fn begin_line(&mut self) {
        self.line = LineBuffer::new();
        self.paste_mode = false;
        self.history.reset_browse();
    }

    /// 入力から次のキーを読む。デバウンス状態はセッションが持つ。
    pub async fn next_key<R: AsyncRead + Unpin>(&mut self, input: &SharedInput<R>) -> io::Result<Key> {
        self.decoder.next_key(input, self.paste_mode).await
    }

    /// キーを 1 つ適用する。行が終わったら `Some` を返す。
    pub fn apply<W: Write>(&mut self, key: Key, out: &mut W) -> io::Result<Option<LineEnd>> {
        match key {
            Key::Printable(byte) => self.line.insert(char::from(byte), out)?,
            Key::Enter if self.paste_mode => self.line.push_literal('\n', out)?,
            Key::Enter => {
                let command = self.line.finish(out)?;
                if command.is_empty() {
                    return Ok(Some(LineEnd::Discard));
                }
                self.history.push(&command);
                return Ok(Some(LineEnd::Submit(command)));
            }
            Key::Backspace => self.line.delete_before_cursor(out)?,
            Key::InterruptRequested => {
                if !self.paste_mode {
                    out.write_all(b"\n")?;
                }
                return Ok(Some(LineEnd::Discard));
            }
            Key::EndOfInput if self.paste_mode => {
                // ペーストした内容は履歴に残さない
                return Ok(Some(LineEnd::Submit(self.line.take())));
            }
            Key::EndOfInput => {
                out.write_all(b"\n")?;
                return Ok(Some(LineEnd::Exit));
            }
            Key::EnterPasteMode => {
                out.write_all(PASTE_BANNER.as_bytes())?;
                self.paste_mode = true;
            }
            Key::HistoryPrev => self.browse(Direction::Prev, out)?,
            Key::HistoryNext => self.browse(Direction::Next, out)?,
            Key::MoveLeft => self.line.move_left(out)?,
            Key::MoveRight => self.line.move_right(out)?,
            Key::Home => self.line.home(out)?,
            Key::End => self.line.end(out)?,
            Key::Ignored => {}
        }
        Ok(None)
    }

    fn browse<W: Write>(&mut self, direction: Direction, out: &mut W) -> io::Result<()> {
        let recalled = self.history.navigate(direction, &self.line.text());
        trace!(depth = self.history.depth(), "history recalled");
        self.line.clear_and_set(&recalled, out)
    }
}
