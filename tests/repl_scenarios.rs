// パス: tests/repl_scenarios.rs
// 役割: 入力バイト列から画面出力までを通しで検証する REPL シナリオテスト
// 意図: 行編集・履歴・ペーストモード・取り消し・割り込みの観測可能な振る舞いを固定する
// 関連ファイル: tests/test_support.rs, src/repl/cmd.rs, src/repl/executor.rs
#[path = "test_support.rs"]
mod support;

use std::thread;
use std::time::Duration;

use support::{quiet, screen_for, Harness};
use tokio::time::Instant;
use tokio_test::io::Builder;

const PASTE_BANNER: &str = "paste mode; Ctrl-C to cancel, Ctrl-D to finish\n===\n";

#[tokio::test(start_paused = true)]
/// `1+1` の値が表示されることを確認する。
async fn expression_value_is_printed() {
    assert_eq!(screen_for(b"1+1\n").await, "--> 1+1\n2\n--> \n");
}

#[tokio::test(start_paused = true)]
/// 代入は何も表示せず、後から値を参照できることを確認する。
async fn assignment_is_silent_and_persists() {
    assert_eq!(screen_for(b"x = 5\nx\n").await, "--> x = 5\n--> x\n5\n--> \n");
}

#[tokio::test(start_paused = true)]
/// 評価エラーは `種別: メッセージ` で表示され、ループは続くことを確認する。
async fn evaluation_error_is_reported_and_loop_continues() {
    assert_eq!(
        screen_for(b"1/0\ny\n2\n").await,
        concat!(
            "--> 1/0\nZeroDivisionError: division by zero\n",
            "--> y\nNameError: name 'y' is not defined\n",
            "--> 2\n2\n--> \n",
        )
    );
}

#[tokio::test(start_paused = true)]
/// 開始メッセージと設定したプロンプトが使われることを確認する。
async fn banner_and_custom_prompt() {
    let mut config = quiet();
    config.banner = true;
    config.prompt = ">>> ".into();
    let mut harness = Harness::new(config);
    harness.run(&b"None\n"[..]).await.unwrap();
    assert_eq!(harness.screen(), "Starting asyncio REPL...\n>>> None\n>>> \n");
}

#[tokio::test(start_paused = true)]
/// 評価中の print がミラー先（REPL の出力）にも複製されることを確認する。
async fn print_output_is_mirrored_onto_repl_output() {
    let mut harness = Harness::new(quiet());
    harness.run(&b"print('hi', 1)\n"[..]).await.unwrap();
    assert_eq!(harness.printed(), "hi 1\n");
    assert_eq!(harness.screen(), "--> print('hi', 1)\nhi 1\n--> \n");
    assert!(!harness.console.mirror_installed());
}

#[tokio::test(start_paused = true)]
/// REPL の出力先が既定の出力と同じなら複製されないことを確認する。
async fn primary_output_is_not_duplicated() {
    let mut harness = Harness::on_primary(quiet());
    harness.run(&b"print('hi')\n"[..]).await.unwrap();
    assert_eq!(harness.screen(), "--> print('hi')\nhi\n--> \n");
}

#[tokio::test(start_paused = true)]
/// 中断可能なコマンドが Ctrl-C で取り消され、何も表示されずにループへ戻ることを確認する。
async fn interrupt_cancels_suspended_command() {
    let mock = Builder::new()
        .read(b"import asyncio\n")
        .read(b"await asyncio.sleep(10)\n")
        .wait(Duration::from_millis(100))
        .read(b"\x03")
        .read(b"1+1\n")
        .build();
    let mut harness = Harness::new(quiet());
    let started = Instant::now();
    harness.run(mock).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(
        harness.screen(),
        "--> import asyncio\n--> await asyncio.sleep(10)\n--> 1+1\n2\n--> \n"
    );
    assert!(!harness.console.mirror_installed());
}

#[tokio::test(start_paused = true)]
/// 割り込みがなければ中断可能なコマンドは最後まで実行され、値が表示されることを確認する。
async fn suspended_command_completes_with_value() {
    // 評価中に届いたバイトは監視タスクが消費するので、次の行は評価が終わってから届ける
    let mock = Builder::new()
        .read(b"import asyncio\nx = await asyncio.sleep(1)\n")
        .wait(Duration::from_secs(2))
        .read(b"await asyncio.sleep(1) == x\n")
        .build();
    let mut harness = Harness::new(quiet());
    let started = Instant::now();
    harness.run(mock).await.unwrap();
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(harness.screen().ends_with("--> await asyncio.sleep(1) == x\nTrue\n--> \n"));
    assert!(harness.globals.contains_key("x"));
}

#[tokio::test(start_paused = true)]
/// 中断可能な評価の最中に先行入力されたバイトは監視タスクに読み捨てられることを確認する。
async fn typed_ahead_input_is_consumed_by_watcher() {
    assert_eq!(
        screen_for(b"import asyncio\nawait asyncio.sleep(1)\n1+1\n").await,
        "--> import asyncio\n--> await asyncio.sleep(1)\n--> \n"
    );
}

#[tokio::test]
/// 直接経路の評価中に配送された割り込みで評価が止まり、何も表示されないことを確認する。
async fn direct_interrupt_stops_blocking_call() {
    let mut harness = Harness::new(quiet());
    let flag = harness.interrupts.clone();
    let raiser = thread::spawn(move || {
        while !flag.raise() {
            thread::sleep(Duration::from_millis(1));
        }
    });
    let started = std::time::Instant::now();
    harness.run(&b"sleep_ms(5000)\n1+1\n"[..]).await.unwrap();
    raiser.join().unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(harness.screen(), "--> sleep_ms(5000)\n--> 1+1\n2\n--> \n");
    assert!(!harness.interrupts.is_enabled());
}

#[tokio::test(start_paused = true)]
/// 20ms 未満で続いた LF は 1 回の確定にまとめられることを確認する。
async fn crlf_duplicate_is_debounced() {
    assert_eq!(screen_for(b"1+1\n\n").await, "--> 1+1\n2\n--> \n");
}

#[tokio::test(start_paused = true)]
/// 20ms 以上空いた LF は空行として扱われることを確認する。
async fn separated_line_feeds_are_two_enters() {
    let mock = Builder::new()
        .read(b"1+1\n")
        .wait(Duration::from_millis(30))
        .read(b"\n")
        .build();
    let mut harness = Harness::new(quiet());
    harness.run(mock).await.unwrap();
    assert_eq!(harness.screen(), "--> 1+1\n2\n--> \n--> \n");
}

#[tokio::test(start_paused = true)]
/// 上矢印で直前のコマンドを呼び戻して再実行できることを確認する。
async fn history_recall_resubmits_command() {
    assert_eq!(
        screen_for(b"6*7\n\x1b[A\n").await,
        "--> 6*7\n42\n--> 6*7\n42\n--> \n"
    );
}

#[tokio::test(start_paused = true)]
/// カーソル移動と途中挿入・削除が最終的なコマンドに反映されることを確認する。
async fn cursor_editing_changes_submitted_command() {
    // "13" → 左へ 1 → "2" を挿入 → "123"、End → Backspace → "12"
    let screen = screen_for(b"13\x1b[D2\x1b[F\x7f\n").await;
    assert_eq!(screen, "--> 13\x1b[D23\x1b[1D\x1b[1C\x08 \x08\n12\n--> \n");
}

#[tokio::test(start_paused = true)]
/// 未知のエスケープシーケンスと予約済み制御文字は無視されることを確認する。
async fn unknown_sequences_are_ignored() {
    assert_eq!(screen_for(b"\x1b[Z\x01\x021\n").await, "--> 1\n1\n--> \n");
}

#[tokio::test(start_paused = true)]
/// Ctrl-C は入力途中の行を捨てることを確認する。
async fn interrupt_discards_partial_line() {
    assert_eq!(screen_for(b"abc\x031\n").await, "--> abc\n--> 1\n1\n--> \n");
}

#[tokio::test(start_paused = true)]
/// ペーストモードでは複数行がまとめて実行され、履歴には残らないことを確認する。
async fn paste_mode_runs_block_on_end_of_input() {
    let screen = screen_for(b"\x05x = 2\nprint(x * 3)\x04\x1b[A\n").await;
    let expected = format!("--> {PASTE_BANNER}x = 2\nprint(x * 3)6\n--> \n--> \n");
    assert_eq!(screen, expected);
}

#[tokio::test(start_paused = true)]
/// ペーストモードの Ctrl-C は何も実行せずに中止することを確認する。
async fn paste_mode_interrupt_cancels_block() {
    let screen = screen_for(b"\x05print(1)\n\x03").await;
    assert_eq!(screen, format!("--> {PASTE_BANNER}print(1)\n--> \n"));
}

#[tokio::test(start_paused = true)]
/// ペーストモード外の Ctrl-D でループが終了し、以降の入力は読まないことを確認する。
async fn end_of_input_terminates_loop() {
    assert_eq!(screen_for(b"1\n\x042\n").await, "--> 1\n1\n--> \n");
}

#[tokio::test(start_paused = true)]
/// 巨大な文字列の繰り返しはエラーとして報告され、ループは続くことを確認する。
async fn oversized_string_repeat_is_reported() {
    assert_eq!(
        screen_for(b"'ab' * 9223372036854775807\n1+1\n").await,
        concat!(
            "--> 'ab' * 9223372036854775807\nMemoryError: repeated string is too long\n",
            "--> 1+1\n2\n--> \n",
        )
    );
}
