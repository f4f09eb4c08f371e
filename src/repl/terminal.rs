// パス: src/repl/terminal.rs
// 役割: Terminal binding: raw-mode guard and the stdin pump feeding the REPL input stream
// 意図: Deliver single bytes to the decoder and Ctrl-C to blocking evaluations
// 関連ファイル: src/bin/linerepl.rs, src/repl/interrupt.rs, src/repl/input.rs
//! 端末との接続。
//!
//! - `RawMode` は標準入力を Raw モードへ切り替え、`Drop` で元へ戻す。出力の後処理と
//!   CR→LF 変換だけは有効に戻すので、Enter は `0x0A` として届き、`\n` は行頭へ戻る。
//! - `spawn_stdin_pump` は標準入力を専用スレッドで読み、割り込みが武装中なら
//!   そのバイトを割り込みとして配送し、それ以外を非同期ストリームへ流す。

use std::io::{self, IsTerminal, Read};
use std::thread;

use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::interrupt::InterruptFlag;

const PUMP_BUFFER: usize = 256;

/// 標準入力を読むスレッドを起動し、その出力側を非同期ストリームとして返す。
/// 標準入力が閉じるとストリームも終端になる。
pub fn spawn_stdin_pump(handle: Handle, interrupts: InterruptFlag) -> io::Result<DuplexStream> {
    let (reader, mut writer) = tokio::io::duplex(PUMP_BUFFER);
    thread::Builder::new()
        .name("stdin-pump".into())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut byte = [0u8; 1];
            loop {
                match stdin.read(&mut byte) {
                    Ok(0) => break,
                    Ok(_) => {
                        if interrupts.deliver(byte[0]) {
                            continue;
                        }
                        if handle.block_on(writer.write_all(&byte)).is_err() {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        warn!(%err, "stdin read failed");
                        break;
                    }
                }
            }
            debug!("stdin pump finished");
        })?;
    Ok(reader)
}

/// Raw モードへの切り替えと復帰を担う RAII ガード。
pub struct RawMode {
    #[cfg(any(target_os = "linux", target_os = "android"))]
    original: Termios,
}

impl RawMode {
    /// 標準入力が端末のときだけ Raw モードへ切り替える。
    pub fn enable_if_tty() -> io::Result<Option<Self>> {
        if io::stdin().is_terminal() {
            Self::new().map(Some)
        } else {
            Ok(None)
        }
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    pub fn new() -> io::Result<Self> {
        let fd = 0; // 標準入力
        let mut termios = Termios::default();
        if unsafe { tcgetattr(fd, &mut termios as *mut _) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let mut raw = termios;
        unsafe {
            cfmakeraw(&mut raw as *mut _);
        }
        raw.c_oflag |= OPOST;
        raw.c_iflag |= ICRNL;
        if unsafe { tcsetattr(fd, TCSANOW, &raw as *const _) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { original: termios })
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    pub fn new() -> io::Result<Self> {
        // この環境では端末属性を変更しない（行単位の入力になる）
        Ok(Self {})
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl Drop for RawMode {
    fn drop(&mut self) {
        let fd = 0;
        unsafe {
            let _ = tcsetattr(fd, TCSANOW, &self.original as *const _);
        }
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const TCSANOW: i32 = 0;
#[cfg(any(target_os = "linux", target_os = "android"))]
const OPOST: u32 = 0o1;
#[cfg(any(target_os = "linux", target_os = "android"))]
const ICRNL: u32 = 0o400;
#[cfg(any(target_os = "linux", target_os = "android"))]
const NCCS: usize = 32;

/// POSIX 端末属性 (`termios`) の Linux でのレイアウト。
#[cfg(any(target_os = "linux", target_os = "android"))]
#[repr(C)]
#[derive(Clone, Copy, Default)]
struct Termios {
    c_iflag: u32,
    c_oflag: u32,
    c_cflag: u32,
    c_lflag: u32,
    c_line: u8,
    c_cc: [u8; NCCS],
    c_ispeed: u32,
    c_ospeed: u32,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
extern "C" {
    fn tcgetattr(fd: i32, termios: *mut Termios) -> i32;
    fn tcsetattr(fd: i32, optional_actions: i32, termios: *const Termios) -> i32;
    fn cfmakeraw(termios: *mut Termios);
}

#[cfg(test)]
mod tests {
    use super::RawMode;

    #[test]
    /// 端末でない標準入力では何も切り替えないことを確認する。
    fn raw_mode_skips_non_terminal_stdin() {
        use std::io::IsTerminal;
        if !std::io::stdin().is_terminal() {
            assert!(RawMode::enable_if_tty().unwrap().is_none());
        }
    }
}
