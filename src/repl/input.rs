// パス: src/repl/input.rs
// 役割: Shared asynchronous byte source read by the loop and the interrupt watcher
// 意図: Let racing tasks consume bytes first-come-first-served from one stream
// 関連ファイル: src/repl/decoder.rs, src/repl/executor.rs, src/repl/cmd.rs
//! 入力ストリームの共有ラッパー。
//!
//! 読み取りのたびにロックを取り、読み終えたら手放す。評価タスクと割り込み監視が
//! 同じストリームを待つ場合、先に読み取りが満たされた側がそのバイトを消費する。

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

pub struct SharedInput<R> {
    inner: Arc<Mutex<R>>,
}

impl<R> Clone for SharedInput<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: AsyncRead + Unpin> SharedInput<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// ちょうど `n` バイトを読む。ストリーム終端では `UnexpectedEof` を返す。
    pub async fn read_exact(&self, n: usize) -> io::Result<Vec<u8>> {
        let mut reader = self.inner.lock().await;
        let mut buf = vec![0u8; n];
        reader.read_exact(&mut buf).await?;
        Ok(buf)
    }

    pub async fn read_byte(&self) -> io::Result<u8> {
        let mut reader = self.inner.lock().await;
        reader.read_u8().await
    }
}

#[cfg(test)]
mod tests {
    use super::SharedInput;
    use std::io;

    #[tokio::test]
    /// 1 バイト・2 バイトの読み取りと終端の扱いを確認する。
    async fn reads_bytes_then_reports_eof() {
        let input = SharedInput::new(&b"a[D"[..]);
        assert_eq!(input.read_byte().await.unwrap(), b'a');
        assert_eq!(input.clone().read_exact(2).await.unwrap(), b"[D".to_vec());
        let err = input.read_byte().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
