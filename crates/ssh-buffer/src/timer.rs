//! ワンショットのキャンセル可能タイマー
//!
//! デッドラインごとに専用スレッドを 1 本立て、指定時刻まで待ってから
//! コールバックを 1 回だけ実行する。`stop()` と発火は内部セルのロックで
//! 直列化されるので、どちらか一方だけが必ず成立する。

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// タイマーの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    /// 発火待ち
    Pending,
    /// `stop()` 済み（コールバックは実行されない）
    Stopped,
    /// 発火済み（コールバック実行中または実行完了）
    Fired,
}

/// タイマースレッドと共有するキャンセル用セル
#[derive(Debug)]
struct TimerCell {
    state: Mutex<TimerState>,
    cond: Condvar,
}

/// 指定時刻にコールバックを 1 回実行するタイマー
///
/// drop すると `stop()` される。スレッドの join はしない（発火前ならすぐ終了する）。
#[derive(Debug)]
pub(crate) struct DeadlineTimer {
    cell: Arc<TimerCell>,
}

impl DeadlineTimer {
    /// `deadline` に `f` を実行するタイマーを起動する
    ///
    /// # 引数
    /// - `deadline`: 発火時刻
    /// - `thread_name`: タイマースレッドの名前
    /// - `f`: 発火時に実行するコールバック
    ///
    /// # エラー
    /// - スレッドの生成に失敗した場合
    pub(crate) fn after<F>(deadline: Instant, thread_name: &str, f: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let cell = Arc::new(TimerCell {
            state: Mutex::new(TimerState::Pending),
            cond: Condvar::new(),
        });
        let thread_cell = Arc::clone(&cell);

        thread::Builder::new()
            .name(thread_name.to_owned())
            .spawn(move || {
                let mut state = thread_cell.state.lock();
                while *state == TimerState::Pending && Instant::now() < deadline {
                    thread_cell.cond.wait_until(&mut state, deadline);
                }
                if *state != TimerState::Pending {
                    return;
                }
                *state = TimerState::Fired;
                // コールバック中は自分のセルのロックを持たない
                drop(state);
                f();
            })?;

        Ok(DeadlineTimer { cell })
    }

    /// タイマーを止める
    ///
    /// # 戻り値
    /// - `true`: 発火前に止めた（コールバックは実行されない）
    /// - `false`: すでに発火済み、または停止済み
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.cell.state.lock();
        if *state != TimerState::Pending {
            return false;
        }
        *state = TimerState::Stopped;
        self.cell.cond.notify_one();
        true
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
