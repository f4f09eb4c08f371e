// パス: src/repl/output.rs
// 役割: Shared output writers and the mirrored-output (duplication) registry
// 意図: Let one evaluation copy its output onto a caller-chosen writer and always undo it
// 関連ファイル: src/repl/executor.rs, src/evaluator.rs, src/repl/cmd.rs
//! 出力先の共有とミラーリング。
//!
//! - `SharedWriter` は同期書き込みだけを提供する共有ライター。REPL のエコーも評価器の出力もこれを通る。
//! - `Console` は評価中のコードが書き込む「標準出力」で、インストールされたミラーへ同じ内容を複製する。
//! - `MirrorGuard` はインストールと復元を RAII で対にし、どの経路で抜けても復元を保証する。

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

/// 複数の所有者から同期的に書き込める出力ストリーム。
#[derive(Clone)]
pub struct SharedWriter(Arc<Mutex<dyn Write + Send>>);

impl SharedWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self(Arc::new(Mutex::new(writer)))
    }

    /// 既に共有されているライターを包む。テストで書き込み内容を覗く用途を想定する。
    pub fn from_shared<W: Write + Send + 'static>(inner: Arc<Mutex<W>>) -> Self {
        Self(inner)
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// 同じ実体を指しているか（内容ではなく同一性で比較する）。
    pub fn same_as(&self, other: &SharedWriter) -> bool {
        Arc::as_ptr(&self.0).cast::<()>() == Arc::as_ptr(&other.0).cast::<()>()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, dyn Write + Send + 'static>> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output writer poisoned"))
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.lock()?.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedWriter({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// 出力複製の契約。`install` は直前のミラーを返し、`restore` でそれを戻す。
pub trait OutputMirror {
    fn install(&self, writer: SharedWriter) -> Option<SharedWriter>;
    fn restore(&self, previous: Option<SharedWriter>);
    /// `writer` が既定の出力そのものか。既定なら複製は不要。
    fn is_primary(&self, writer: &SharedWriter) -> bool;
}

/// 評価中のコードが使う標準出力。ミラーが設定されていれば同じバイト列を複製する。
pub struct Console {
    primary: SharedWriter,
    mirror: Mutex<Option<SharedWriter>>,
}

impl Console {
    pub fn new(primary: SharedWriter) -> Self {
        Self {
            primary,
            mirror: Mutex::new(None),
        }
    }

    pub fn primary(&self) -> &SharedWriter {
        &self.primary
    }

    pub fn mirror_installed(&self) -> bool {
        self.mirror.lock().map(|m| m.is_some()).unwrap_or(false)
    }

    /// 既定の出力とミラーの両方へ書き込む。
    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut primary = self.primary.clone();
        primary.write_all(bytes)?;
        primary.flush()?;
        let mirror = self
            .mirror
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "mirror slot poisoned"))?
            .clone();
        if let Some(mut mirror) = mirror {
            if !mirror.same_as(&self.primary) {
                mirror.write_all(bytes)?;
                mirror.flush()?;
            }
        }
        Ok(())
    }
}

impl OutputMirror for Console {
    fn install(&self, writer: SharedWriter) -> Option<SharedWriter> {
        match self.mirror.lock() {
            Ok(mut slot) => slot.replace(writer),
            Err(poisoned) => poisoned.into_inner().replace(writer),
        }
    }

    fn restore(&self, previous: Option<SharedWriter>) {
        match self.mirror.lock() {
            Ok(mut slot) => *slot = previous,
            Err(poisoned) => *poisoned.into_inner() = previous,
        }
    }

    fn is_primary(&self, writer: &SharedWriter) -> bool {
        self.primary.same_as(writer)
    }
}

/// ミラーのインストールとスコープ終了時の復元を対にするガード。
pub struct MirrorGuard<'a> {
    mirror: &'a dyn OutputMirror,
    previous: Option<Option<SharedWriter>>,
}

impl<'a> MirrorGuard<'a> {
    /// `target` が `Some` のときだけインストールする。`None` なら何もしないガードになる。
    pub fn install(mirror: &'a dyn OutputMirror, target: Option<&SharedWriter>) -> Self {
        let previous = target.map(|writer| {
            debug!(?writer, "mirrored output installed");
            mirror.install(writer.clone())
        });
        Self { mirror, previous }
    }
}

impl Drop for MirrorGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.mirror.restore(previous);
            debug!("mirrored output restored");
        }
    }
}
