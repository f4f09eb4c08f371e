// パス: src/repl/decoder.rs
// 役割: Terminal input decoder mapping raw bytes and escape sequences to logical keys
// 意図: Isolate byte classification and the CRLF debounce from buffer editing
// 関連ファイル: src/repl/session.rs, src/repl/input.rs, src/repl/line_editor.rs
//! 入力デコーダ。
//!
//! 生のバイトを 1 つずつ受け取り、論理キーへ変換する。`ESC` を受けたら続く 2 バイトを
//! 読んで矢印・Home/End に対応づける。改行の直後 20ms 以内に届いた改行は、CRLF が
//! LF LF に変換された結果とみなして無視する。

use std::io;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::time::Instant;
use tracing::trace;

use super::input::SharedInput;
pub use super::interrupt::CTRL_C;

pub const CTRL_A: u8 = 0x01;
pub const CTRL_B: u8 = 0x02;
pub const CTRL_D: u8 = 0x04;
pub const CTRL_E: u8 = 0x05;
pub const BACKSPACE: u8 = 0x08;
pub const LF: u8 = 0x0A;
pub const ESC: u8 = 0x1B;
pub const DEL: u8 = 0x7F;

/// 既定の CRLF デバウンス幅。
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(20);

/// デコード結果の論理キー。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Printable(u8),
    Enter,
    Backspace,
    InterruptRequested,
    EndOfInput,
    EnterPasteMode,
    MoveLeft,
    MoveRight,
    Home,
    End,
    HistoryPrev,
    HistoryNext,
    Ignored,
}

/// 1 バイト分の分類結果。`Escape` の場合は続く 2 バイトが必要になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Key(Key),
    Escape,
}

/// デバウンス状態（直前のバイトとその到着時刻）を持つデコーダ。
#[derive(Debug, Clone)]
pub struct InputDecoder {
    last_byte: u8,
    last_at: Option<Instant>,
    window: Duration,
}

impl Default for InputDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl InputDecoder {
    pub fn new(window: Duration) -> Self {
        Self {
            last_byte: 0,
            last_at: None,
            window,
        }
    }

    /// 1 バイトを分類する。デバウンス状態は抑止の有無にかかわらず毎回更新する。
    pub fn feed(&mut self, byte: u8, at: Instant, paste: bool) -> Decoded {
        let prev_byte = self.last_byte;
        let prev_at = self.last_at;
        self.last_byte = byte;
        self.last_at = Some(at);

        let key = match byte {
            0x20..=0x7E => Key::Printable(byte),
            LF if paste => Key::Enter,
            LF => {
                let duplicated = prev_byte == LF
                    && prev_at.is_some_and(|t| at.saturating_duration_since(t) < self.window);
                if duplicated {
                    trace!("duplicate line feed within debounce window");
                    Key::Ignored
                } else {
                    Key::Enter
                }
            }
            BACKSPACE | DEL => Key::Backspace,
            CTRL_A | CTRL_B => Key::Ignored,
            CTRL_C => Key::InterruptRequested,
            CTRL_D => Key::EndOfInput,
            CTRL_E => Key::EnterPasteMode,
            ESC => return Decoded::Escape,
            _ => Key::Ignored,
        };
        Decoded::Key(key)
    }

    /// 次のキーを読み取る。エスケープシーケンスの場合は続く 2 バイトもここで読む。
    pub async fn next_key<R: AsyncRead + Unpin>(
        &mut self,
        input: &SharedInput<R>,
        paste: bool,
    ) -> io::Result<Key> {
        let byte = input.read_byte().await?;
        match self.feed(byte, Instant::now(), paste) {
            Decoded::Key(key) => Ok(key),
            Decoded::Escape => {
                let seq = input.read_exact(2).await?;
                Ok(escape_key(&seq))
            }
        }
    }
}

/// `ESC` に続く 2 バイトを論理キーへ写像する。未知の並びは `Ignored`。
pub fn escape_key(seq: &[u8]) -> Key {
    match seq {
        b"[A" => Key::HistoryPrev,
        b"[B" => Key::HistoryNext,
        b"[D" => Key::MoveLeft,
        b"[C" => Key::MoveRight,
        b"[H" => Key::Home,
        b"[F" => Key::End,
        other => {
            trace!(?other, "unrecognized escape sequence");
            Key::Ignored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(decoder: &mut InputDecoder, byte: u8, at: Instant) -> Key {
        match decoder.feed(byte, at, false) {
            Decoded::Key(k) => k,
            Decoded::Escape => panic!("unexpected escape for {byte:#x}"),
        }
    }

    #[test]
    /// 表示可能文字と制御文字の分類表を検証する。
    fn classify_control_and_printable_bytes() {
        let mut d = InputDecoder::default();
        let t = Instant::now();
        assert_eq!(key(&mut d, b'a', t), Key::Printable(b'a'));
        assert_eq!(key(&mut d, b' ', t), Key::Printable(b' '));
        assert_eq!(key(&mut d, b'~', t), Key::Printable(b'~'));
        assert_eq!(key(&mut d, BACKSPACE, t), Key::Backspace);
        assert_eq!(key(&mut d, DEL, t), Key::Backspace);
        assert_eq!(key(&mut d, CTRL_A, t), Key::Ignored);
        assert_eq!(key(&mut d, CTRL_B, t), Key::Ignored);
        assert_eq!(key(&mut d, CTRL_C, t), Key::InterruptRequested);
        assert_eq!(key(&mut d, CTRL_D, t), Key::EndOfInput);
        assert_eq!(key(&mut d, CTRL_E, t), Key::EnterPasteMode);
        assert_eq!(key(&mut d, b'\r', t), Key::Ignored);
        assert_eq!(key(&mut d, 0xC3, t), Key::Ignored);
        assert_eq!(d.feed(ESC, t, false), Decoded::Escape);
    }

    #[test]
    /// エスケープシーケンス表と未知の並びの扱いを検証する。
    fn escape_table() {
        assert_eq!(escape_key(b"[A"), Key::HistoryPrev);
        assert_eq!(escape_key(b"[B"), Key::HistoryNext);
        assert_eq!(escape_key(b"[C"), Key::MoveRight);
        assert_eq!(escape_key(b"[D"), Key::MoveLeft);
        assert_eq!(escape_key(b"[H"), Key::Home);
        assert_eq!(escape_key(b"[F"), Key::End);
        assert_eq!(escape_key(b"[Z"), Key::Ignored);
        assert_eq!(escape_key(b"OA"), Key::Ignored);
    }

    #[test]
    /// 20ms 未満で連続した LF だけが抑止されることを確認する。
    fn line_feed_debounce_window() {
        let mut d = InputDecoder::default();
        let t0 = Instant::now();
        assert_eq!(key(&mut d, LF, t0), Key::Enter);
        assert_eq!(key(&mut d, LF, t0 + Duration::from_millis(5)), Key::Ignored);
        // 抑止された LF も状態を更新するので、そこから 20ms 以上空ける必要がある
        assert_eq!(key(&mut d, LF, t0 + Duration::from_millis(24)), Key::Ignored);
        assert_eq!(key(&mut d, LF, t0 + Duration::from_millis(50)), Key::Enter);
        assert_eq!(key(&mut d, b'x', t0 + Duration::from_millis(51)), Key::Printable(b'x'));
        assert_eq!(key(&mut d, LF, t0 + Duration::from_millis(52)), Key::Enter);
    }

    #[test]
    /// ペーストモードでは LF がデバウンスされないことを確認する。
    fn paste_mode_bypasses_debounce() {
        let mut d = InputDecoder::default();
        let t0 = Instant::now();
        assert_eq!(d.feed(LF, t0, true), Decoded::Key(Key::Enter));
        assert_eq!(d.feed(LF, t0, true), Decoded::Key(Key::Enter));
    }

    #[tokio::test]
    /// ストリームからエスケープシーケンスを読み取れることを確認する。
    async fn next_key_reads_escape_continuation() {
        let input = SharedInput::new(&b"\x1b[Dq\x1b[Q"[..]);
        let mut d = InputDecoder::default();
        assert_eq!(d.next_key(&input, false).await.unwrap(), Key::MoveLeft);
        assert_eq!(d.next_key(&input, false).await.unwrap(), Key::Printable(b'q'));
        assert_eq!(d.next_key(&input, false).await.unwrap(), Key::Ignored);
        assert!(d.next_key(&input, false).await.is_err());
    }
}
