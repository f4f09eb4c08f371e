// パス: src/repl/line_editor.rs
// 役割: Line buffer with cursor editing and the terminal redraw sequences that mirror it
// 意図: Keep the on-screen line and the in-memory buffer reconcilable after every edit
// 関連ファイル: src/repl/session.rs, src/repl/history.rs, src/repl/decoder.rs
//! 編集中の 1 行を保持するバッファ。
//!
//! カーソルは「末尾からの距離」で持つ（0 は行末）。各操作は状態を更新すると同時に、
//! 端末の表示を同期させるための最小限のエスケープ・再描画シーケンスを書き出す。

use std::io::{self, Write};

/// 編集中の行とカーソル位置。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// 行末からのカーソル距離。
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// カーソル位置に 1 文字挿入し、挿入点から行末までを再描画する。
    pub fn insert<W: Write>(&mut self, ch: char, out: &mut W) -> io::Result<()> {
        if self.cursor == 0 {
            self.chars.push(ch);
            return write_chars(out, &[ch]);
        }
        let at = self.chars.len() - self.cursor;
        self.chars.insert(at, ch);
        write_chars(out, &self.chars[at..])?;
        write!(out, "\x1b[{}D", self.cursor)
    }

    /// カーソル直前の 1 文字を削除する。
    pub fn delete_before_cursor<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.chars.is_empty() {
            return Ok(());
        }
        if self.cursor == 0 {
            self.chars.pop();
            return out.write_all(b"\x08 \x08");
        }
        if self.cursor >= self.chars.len() {
            // 行頭にいるので消す文字がない
            return Ok(());
        }
        let at = self.chars.len() - self.cursor - 1;
        self.chars.remove(at);
        out.write_all(b"\x08\x1b[K")?;
        write_chars(out, &self.chars[at..])?;
        write!(out, "\x1b[{}D", self.cursor)
    }

    /// 左へ 1 文字。先頭の 1 文字より前へは進めない。
    pub fn move_left<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.cursor + 1 < self.chars.len() {
            self.cursor += 1;
            out.write_all(b"\x1b[D")?;
        }
        Ok(())
    }

    pub fn move_right<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        if self.cursor > 0 {
            self.cursor -= 1;
            out.write_all(b"\x1b[C")?;
        }
        Ok(())
    }

    pub fn home<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let delta = self.chars.len() - self.cursor;
        self.cursor = self.chars.len();
        if delta > 0 {
            write!(out, "\x1b[{}D", delta)?;
        }
        Ok(())
    }

    pub fn end<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let delta = self.cursor;
        self.cursor = 0;
        if delta > 0 {
            write!(out, "\x1b[{}C", delta)?;
        }
        Ok(())
    }

    /// 画面上の現在行を消して `text` に置き換える（履歴移動用）。
    /// 消去は行末から行うので、先に表示上のカーソルを行末へ送る。
    pub fn clear_and_set<W: Write>(&mut self, text: &str, out: &mut W) -> io::Result<()> {
        self.end(out)?;
        let n = self.chars.len();
        let back = vec![b'\x08'; n];
        out.write_all(&back)?;
        out.write_all(&vec![b' '; n])?;
        out.write_all(&back)?;
        self.chars = text.chars().collect();
        self.cursor = 0;
        write_chars(out, &self.chars)
    }

    /// カーソル位置に関係なく行末へそのまま追加する（ペーストモードの改行）。
    pub fn push_literal<W: Write>(&mut self, ch: char, out: &mut W) -> io::Result<()> {
        self.chars.push(ch);
        write_chars(out, &[ch])
    }

    /// 行を確定する。表示上のカーソルを行末へ送り、改行してから内容を取り出す。
    pub fn finish<W: Write>(&mut self, out: &mut W) -> io::Result<String> {
        self.end(out)?;
        out.write_all(b"\n")?;
        Ok(self.take())
    }

    /// 内容を取り出してバッファを空にする。
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.chars).into_iter().collect()
    }
}

fn write_chars<W: Write>(out: &mut W, chars: &[char]) -> io::Result<()> {
    let s: String = chars.iter().collect();
    out.write_all(s.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::LineBuffer;

    fn typed(text: &str) -> LineBuffer {
        let mut line = LineBuffer::new();
        let mut sink = Vec::new();
        for ch in text.chars() {
            line.insert(ch, &mut sink).unwrap();
        }
        line
    }

    fn run(line: &mut LineBuffer, f: impl FnOnce(&mut LineBuffer, &mut Vec<u8>)) -> String {
        let mut out = Vec::new();
        f(line, &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    /// 行末への挿入は文字をそのままエコーすることを確認する。
    fn append_echoes_characters() {
        let mut line = LineBuffer::new();
        let out = run(&mut line, |l, o| {
            for ch in "abc".chars() {
                l.insert(ch, o).unwrap();
            }
        });
        assert_eq!(out, "abc");
        assert_eq!(line.text(), "abc");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    /// 途中への挿入が後続を再描画し、カーソルを戻すことを確認する。
    fn insert_in_middle_redraws_tail() {
        let mut line = typed("ac");
        let out = run(&mut line, |l, o| {
            l.move_left(o).unwrap();
            l.insert('b', o).unwrap();
        });
        assert_eq!(line.text(), "abc");
        assert_eq!(line.cursor(), 1);
        assert_eq!(out, "\x1b[Dbc\x1b[1D");
    }

    #[test]
    /// 行末と途中での削除シーケンスを検証する。
    fn delete_at_end_and_in_middle() {
        let mut line = typed("abcd");
        let out = run(&mut line, |l, o| l.delete_before_cursor(o).unwrap());
        assert_eq!(out, "\x08 \x08");
        assert_eq!(line.text(), "abc");

        let out = run(&mut line, |l, o| {
            l.move_left(o).unwrap();
            l.delete_before_cursor(o).unwrap();
        });
        assert_eq!(line.text(), "ac");
        assert_eq!(line.cursor(), 1);
        assert_eq!(out, "\x1b[D\x08\x1b[Kc\x1b[1D");
    }

    #[test]
    /// 空行での削除と行頭での削除は何もしないことを確認する。
    fn delete_is_noop_when_nothing_precedes_cursor() {
        let mut line = LineBuffer::new();
        assert_eq!(run(&mut line, |l, o| l.delete_before_cursor(o).unwrap()), "");
        let mut line = typed("ab");
        run(&mut line, |l, o| l.home(o).unwrap());
        assert_eq!(run(&mut line, |l, o| l.delete_before_cursor(o).unwrap()), "");
        assert_eq!(line.text(), "ab");
    }

    #[test]
    /// 左移動は先頭の 1 文字手前で止まり、右移動と逆操作になることを確認する。
    fn move_left_stops_before_first_character() {
        let mut line = typed("a");
        assert_eq!(run(&mut line, |l, o| l.move_left(o).unwrap()), "");
        assert_eq!(line.cursor(), 0);

        let mut line = typed("abc");
        run(&mut line, |l, o| {
            l.move_left(o).unwrap();
            l.move_left(o).unwrap();
            l.move_left(o).unwrap();
        });
        assert_eq!(line.cursor(), 2);
        run(&mut line, |l, o| {
            l.move_left(o).unwrap();
            l.move_right(o).unwrap();
        });
        assert_eq!(line.cursor(), 1);
        assert_eq!(run(&mut line, |l, o| l.move_right(o).unwrap()), "\x1b[C");
        assert_eq!(run(&mut line, |l, o| l.move_right(o).unwrap()), "");
    }

    #[test]
    /// Home/End が移動量ぶんの単一シーケンスを出すことを確認する。
    fn home_and_end_emit_single_moves() {
        let mut line = typed("hello");
        assert_eq!(run(&mut line, |l, o| l.home(o).unwrap()), "\x1b[5D");
        assert_eq!(line.cursor(), 5);
        assert_eq!(run(&mut line, |l, o| l.insert('>', o).unwrap()), ">hello\x1b[5D");
        assert_eq!(run(&mut line, |l, o| l.end(o).unwrap()), "\x1b[5C");
        assert_eq!(line.cursor(), 0);
        assert_eq!(run(&mut line, |l, o| l.end(o).unwrap()), "");
    }

    #[test]
    /// 置き換えが旧表示を消してから新しい内容を描くことを確認する。
    fn clear_and_set_erases_then_redraws() {
        let mut line = typed("ab");
        let out = run(&mut line, |l, o| l.clear_and_set("xyz", o).unwrap());
        assert_eq!(out, "\x08\x08  \x08\x08xyz");
        assert_eq!(line.text(), "xyz");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    /// 行の途中にカーソルがあっても、行末へ移動してから消去することを確認する。
    fn clear_and_set_from_mid_line_moves_to_end_first() {
        let mut line = typed("abc");
        run(&mut line, |l, o| {
            l.move_left(o).unwrap();
            l.move_left(o).unwrap();
        });
        let out = run(&mut line, |l, o| l.clear_and_set("one", o).unwrap());
        assert_eq!(out, "\x1b[2C\x08\x08\x08   \x08\x08\x08one");
        assert_eq!(line.text(), "one");
        assert_eq!(line.cursor(), 0);
    }

    #[test]
    /// 確定時にカーソルを行末へ送ってから改行することを確認する。
    fn finish_moves_to_end_then_newline() {
        let mut line = typed("abc");
        let mut out = Vec::new();
        line.move_left(&mut out).unwrap();
        out.clear();
        let text = line.finish(&mut out).unwrap();
        assert_eq!(text, "abc");
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[1C\n");
        assert!(line.is_empty());
    }
}
