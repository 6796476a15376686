//! ブロッキングバイトストリームバッファ
//!
//! 送信側スレッドが `write` でチャンクを積み、受信側スレッドが `read` で取り出す。
//! `read` はデータが届くか、クローズされるか、デッドラインに達するまでブロックする。

use std::fmt;
use std::io;
use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, trace};

use crate::config::BufferConfig;
use crate::error::BufferError;
use crate::queue::SegmentQueue;
use crate::timer::DeadlineTimer;

/// ロックで保護される状態
struct State {
    /// 未読チャンクのキュー
    queue: SegmentQueue,
    /// `eof()` 済みか（false → true の一方向のみ）
    closed: bool,
    /// デッドラインに到達したか（`set_deadline` でのみクリアされる）
    deadline_reached: bool,
    /// 発火待ちのタイマー（常に高々 1 つ）
    timer: Option<DeadlineTimer>,
    /// タイマー世代。再設定・クローズのたびに進め、古いタイマーの発火を無効にする
    timer_generation: u64,
}

impl State {
    /// 発火待ちのタイマーを止め、以降に届く古い発火を無効にする
    fn cancel_timer(&mut self) {
        self.timer_generation = self.timer_generation.wrapping_add(1);
        if let Some(timer) = self.timer.take() {
            timer.stop();
        }
    }
}

/// 全ハンドルで共有する本体
struct Shared {
    state: Mutex<State>,
    /// write / eof / デッドライン到達で待機中の read を起こす
    cond: Condvar,
    timer_thread_name: String,
}

impl Shared {
    /// タイマー発火時のコールバック
    ///
    /// 世代が一致しない（発火直前に再設定・クローズされた）場合は何もしない。
    fn on_deadline(shared: &Weak<Shared>, generation: u64) {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        let mut state = shared.state.lock();
        if state.timer_generation != generation {
            debug!(generation, "stale deadline timer suppressed");
            return;
        }
        state.timer = None;
        state.deadline_reached = true;
        shared.cond.notify_all();
        debug!(generation, "read deadline reached");
    }
}

/// 送受信スレッド間でバイト列を受け渡す上限なしのバッファ
///
/// SSH チャンネルの受信データを、パケットを復号するスレッドから
/// チャンネルを読むスレッドへ渡すために使う。
///
/// ## 使い方
/// `clone()` したハンドルは同じバッファを指す。送信側は 1 スレッドを想定しているが、
/// 複数から `write` しても 1 つのロックで直列化されるので FIFO は壊れない
/// （順序は到着順で、公平性は保証しない）。
///
/// `write` は待機中の読み手を 1 つだけ起こす。複数スレッドが同時に `read` で
/// ブロックしている場合、データが残っていても他の読み手は次のシグナルまで待つ
/// ことがある。`eof` とデッドライン到達は全員を起こす。
///
/// ```
/// use ssh_buffer::{Buffer, BufferError};
///
/// let buf = Buffer::new();
/// buf.write(b"hello".to_vec());
/// buf.eof();
///
/// let mut out = [0u8; 8];
/// assert_eq!(buf.read(&mut out), Ok(5));
/// assert_eq!(&out[..5], b"hello");
/// assert_eq!(buf.read(&mut out), Err(BufferError::EndOfStream));
/// ```
#[derive(Clone)]
pub struct Buffer {
    shared: Arc<Shared>,
}

impl Buffer {
    /// 空でオープンなバッファを生成する
    pub fn new() -> Self {
        Self::with_config(&BufferConfig::default())
    }

    /// 設定を指定してバッファを生成する
    pub fn with_config(config: &BufferConfig) -> Self {
        Buffer {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: SegmentQueue::with_capacity(config.effective_segment_capacity()),
                    closed: false,
                    deadline_reached: false,
                    timer: None,
                    timer_generation: 0,
                }),
                cond: Condvar::new(),
                timer_thread_name: config.timer_thread_name.clone(),
            }),
        }
    }

    /// チャンクを末尾に積み、待機中の読み手を 1 つ起こす
    ///
    /// チャンクの所有権はバッファに移る。`eof()` 後の書き込みは想定しない
    /// （拒否はしないが、読み手がいつ EOF を返すかは保証されない）。
    pub fn write(&self, chunk: impl Into<Vec<u8>>) {
        let chunk = chunk.into();
        let len = chunk.len();
        let mut state = self.shared.state.lock();
        state.queue.append(chunk);
        self.shared.cond.notify_one();
        trace!(len, "buffer write");
    }

    /// バッファをクローズする
    ///
    /// 積まれたデータをすべて読み切った後の `read` は `EndOfStream` を返す。
    /// 発火待ちのタイマーは止める。何度呼んでもよい。
    pub fn eof(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            debug!("buffer closed");
        }
        state.closed = true;
        state.cancel_timer();
        self.shared.cond.notify_all();
    }

    /// 読み取りのデッドラインを設定する
    ///
    /// - `None`: デッドラインなし。到達フラグをクリアし、`read` は無期限に待つ
    /// - 過去の時刻: タイマーを立てず、その場で到達状態にする
    /// - 未来の時刻: 到達フラグをクリアし、その時刻に発火するタイマーを立てる
    ///
    /// いずれの場合も以前のタイマーは先に止める。ブロック中の `read` は起こされ、
    /// 新しい状態で再評価する。
    ///
    /// タイマースレッドの生成はロックを手放してから行うので、その間も
    /// `write` やタイマー発火は止まらない。
    pub fn set_deadline(&self, deadline: Option<Instant>) {
        let (at, generation) = {
            let mut state = self.shared.state.lock();
            state.cancel_timer();
            let generation = state.timer_generation;

            let at = match deadline {
                None => {
                    state.deadline_reached = false;
                    debug!("read deadline cleared");
                    None
                }
                Some(at) if at <= Instant::now() => {
                    state.deadline_reached = true;
                    debug!("read deadline already passed");
                    None
                }
                Some(at) => {
                    state.deadline_reached = false;
                    Some(at)
                }
            };
            self.shared.cond.notify_all();
            (at, generation)
        };

        let Some(at) = at else {
            return;
        };

        let shared = Arc::downgrade(&self.shared);
        let armed = DeadlineTimer::after(at, &self.shared.timer_thread_name, move || {
            Shared::on_deadline(&shared, generation)
        });

        let mut state = self.shared.state.lock();
        match armed {
            // 生成中に再設定・クローズされていれば、このタイマーは drop で止まる
            Ok(timer) if state.timer_generation == generation && !state.deadline_reached => {
                state.timer = Some(timer);
                debug!(generation, "read deadline armed");
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "failed to spawn deadline timer");
                if state.timer_generation == generation {
                    // タイマーが立てられない場合は待ち続けないよう即時到達扱い
                    state.deadline_reached = true;
                    self.shared.cond.notify_all();
                }
            }
        }
    }

    /// バッファから `dst` に読み取り、読んだバイト数を返す
    ///
    /// 読めるデータがあれば `dst` に収まるだけ（複数チャンクにまたがって）コピーして
    /// すぐ返す。1 バイトもなければ、データが届くかクローズされるかデッドラインに
    /// 達するまでブロックする。
    ///
    /// # エラー
    /// 1 バイトも読めなかった呼び出しでのみ返る。
    /// - `DeadlineExceeded`: 呼び出し時点で到達済み、または待機中に到達した
    /// - `EndOfStream`: クローズ済みで、未読データがない
    ///
    /// 呼び出し時点でデッドライン到達済みなら、未読データがあってもエラーを返す。
    /// `dst` が空なら（デッドライン到達済みでない限り）`Ok(0)` を返す。
    pub fn read(&self, dst: &mut [u8]) -> Result<usize, BufferError> {
        let mut state = self.shared.state.lock();

        if state.deadline_reached {
            return Err(BufferError::DeadlineExceeded);
        }

        loop {
            let n = state.queue.drain_into(dst);
            if n > 0 || dst.is_empty() {
                trace!(n, "buffer read");
                return Ok(n);
            }

            // 未読データなし: 終端状態を確認してから待つ
            if state.closed {
                return Err(BufferError::EndOfStream);
            }
            if state.deadline_reached {
                return Err(BufferError::DeadlineExceeded);
            }

            trace!("buffer read blocking");
            self.shared.cond.wait(&mut state);
        }
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Buffer")
            .field("segments", &state.queue.segment_count())
            .field("drained", &state.queue.is_empty())
            .field("closed", &state.closed)
            .field("deadline_reached", &state.deadline_reached)
            .field("timer_armed", &state.timer.is_some())
            .finish()
    }
}

/// `std::io::Read` としての読み取り
///
/// `EndOfStream` は `Ok(0)`、`DeadlineExceeded` は `io::ErrorKind::TimedOut` になる。
impl io::Read for &Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match Buffer::read(*self, buf) {
            Ok(n) => Ok(n),
            Err(BufferError::EndOfStream) => Ok(0),
            Err(err) => Err(err.into()),
        }
    }
}

impl io::Read for Buffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}
