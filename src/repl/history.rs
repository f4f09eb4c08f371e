// パス: src/repl/history.rs
// 役割: Fixed-capacity circular command history with a reserved slot for the line being edited
// 意図: Browse past commands without ever losing the text typed before browsing started
// 関連ファイル: src/repl/session.rs, src/repl/line_editor.rs
//! 循環バッファによるコマンド履歴。
//!
//! 容量は保持件数 N に 1 を足した値で、余分な 1 枠は編集中の行の退避先として常に空けておく。
//! 移動のたびに現在の行を「今いる枠」へ退避してから深さを変えるので、最新位置へ戻ると
//! 入力途中のテキストがそのまま復元される。

use tracing::debug;

/// 既定の保持件数。
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: Vec<Option<String>>,
    write_index: usize,
    count: usize,
    depth: usize,
}

impl Default for HistoryRing {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl HistoryRing {
    /// `limit` 件を保持する履歴を作る。`limit` は 1 以上に切り上げる。
    pub fn new(limit: usize) -> Self {
        Self {
            slots: vec![None; limit.max(1) + 1],
            write_index: 0,
            count: 0,
            depth: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 保持しているコマンド数（最大 `capacity - 1`）。
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 現在どれだけ過去へ遡っているか。
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// 新しい行の開始時に閲覧位置を最新へ戻す。
    pub fn reset_browse(&mut self) {
        self.depth = 0;
    }

    /// コマンドを記録する。空文字列は記録しない。
    pub fn push(&mut self, command: &str) {
        if !command.is_empty() {
            let idx = self.write_index;
            self.slots[idx] = Some(command.to_string());
            self.count = (self.count + 1).min(self.capacity() - 1);
            self.write_index = (self.write_index + 1) % self.capacity();
            debug!(retained = self.count, "history entry recorded");
        }
        self.depth = 0;
    }

    /// 現在の行を退避してから `direction` へ 1 つ移動し、移動先の内容を返す。
    pub fn navigate(&mut self, direction: Direction, current: &str) -> String {
        let here = self.slot_index(self.depth);
        self.slots[here] = Some(current.to_string());
        self.depth = match direction {
            Direction::Prev => (self.depth + 1).min(self.count),
            Direction::Next => self.depth.saturating_sub(1),
        };
        let there = self.slot_index(self.depth);
        self.slots[there].clone().unwrap_or_default()
    }

    /// 記録済みのコマンドを新しい順に返す（退避枠は含まない）。
    pub fn entries(&self) -> Vec<&str> {
        (1..=self.count)
            .filter_map(|back| self.slots[self.slot_index(back)].as_deref())
            .collect()
    }

    fn slot_index(&self, back: usize) -> usize {
        let cap = self.capacity();
        (self.write_index + cap - back % cap) % cap
    }
}
