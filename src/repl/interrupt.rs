// パス: src/repl/interrupt.rs
// 役割: In-band interrupt delivery for evaluations that run without suspending
// 意図: Raise a distinguished interrupt inside a blocking evaluator call only while it is armed
// 関連ファイル: src/repl/executor.rs, src/evaluator.rs
//! 同期経路向けの割り込み配送。
//!
//! 直接評価の間だけ割り込みバイトを武装し、配送されると評価器が次の検査点で
//! `KeyboardInterrupt` を送出する。武装の解除は `InterruptGuard` の `Drop` で必ず行う。

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use tracing::trace;

/// Ctrl-C。割り込みとして扱う既定のバイト。
pub const CTRL_C: u8 = 0x03;

const DISARMED: u16 = u16::MAX;

/// 割り込み配送の契約。`enable` で指定バイトの配送を有効にし、`disable` で止める。
pub trait InterruptDelivery {
    fn enable(&self, byte: u8);
    fn disable(&self);
}

#[derive(Debug)]
struct FlagState {
    armed: AtomicU16,
    pending: AtomicBool,
}

/// 評価器がポーリングする割り込みフラグ。別スレッドから配送されてもよい。
#[derive(Debug, Clone)]
pub struct InterruptFlag {
    state: Arc<FlagState>,
}

impl Default for InterruptFlag {
    fn default() -> Self {
        Self {
            state: Arc::new(FlagState {
                armed: AtomicU16::new(DISARMED),
                pending: AtomicBool::new(false),
            }),
        }
    }
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.state.armed.load(Ordering::SeqCst) != DISARMED
    }

    /// 受信したバイトを渡す。武装中のバイトと一致したときだけ保留状態にする。
    pub fn deliver(&self, byte: u8) -> bool {
        if self.state.armed.load(Ordering::SeqCst) != u16::from(byte) {
            return false;
        }
        trace!(byte, "interrupt delivered in-band");
        self.state.pending.store(true, Ordering::SeqCst);
        true
    }

    /// 武装中のバイトで割り込みを配送する。
    pub fn raise(&self) -> bool {
        match u8::try_from(self.state.armed.load(Ordering::SeqCst)) {
            Ok(byte) => self.deliver(byte),
            Err(_) => false,
        }
    }

    /// 保留中の割り込みを取り出す（取り出すと解消される）。
    pub fn take_pending(&self) -> bool {
        self.state.pending.swap(false, Ordering::SeqCst)
    }
}

impl InterruptDelivery for InterruptFlag {
    fn enable(&self, byte: u8) {
        self.state.pending.store(false, Ordering::SeqCst);
        self.state.armed.store(u16::from(byte), Ordering::SeqCst);
    }

    fn disable(&self) {
        self.state.armed.store(DISARMED, Ordering::SeqCst);
        self.state.pending.store(false, Ordering::SeqCst);
    }
}

/// スコープの間だけ割り込み配送を有効にするガード。
pub struct InterruptGuard<'a> {
    delivery: &'a dyn InterruptDelivery,
}

impl<'a> InterruptGuard<'a> {
    pub fn enable(delivery: &'a dyn InterruptDelivery, byte: u8) -> Self {
        delivery.enable(byte);
        Self { delivery }
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.delivery.disable();
    }
}
