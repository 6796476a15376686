//! # ssh-buffer
//!
//! SSH チャンネル層の受信バッファ
//!
//! トランスポート層でパケットを復号・フレーム分解するスレッドと、
//! チャンネルのデータを読むスレッドの間をつなぐブロッキングバイトストリーム。
//!
//! ## データの流れ
//!
//! ```text
//! 送信側（復号スレッド）:
//!   1. チャンネルデータを受け取る → buffer.write(chunk)
//!   2. チャンネルが閉じられた → buffer.eof()
//!
//! 受信側（チャンネルを読むスレッド）:
//!   1. buffer.set_deadline(Some(deadline))   // 省略可
//!   2. buffer.read(&mut dst)
//!        データあり       → Ok(n)
//!        クローズ済み     → Err(EndOfStream)
//!        デッドライン到達 → Err(DeadlineExceeded)
//!        それ以外         → ブロック
//! ```
//!
//! ## 構成
//!
//! - `queue`: 未読チャンクの FIFO（セグメント単位で追加・除去）
//! - `timer`: デッドラインで 1 回だけ発火するキャンセル可能タイマー
//! - `buffer`: 上記を 1 つのロックでまとめた `Buffer`

pub mod buffer;
pub mod config;
pub mod error;
mod queue;
mod timer;

pub use buffer::Buffer;
pub use config::BufferConfig;
pub use error::BufferError;
