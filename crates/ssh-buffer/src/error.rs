//! ssh-buffer エラー型

use std::io;

use thiserror::Error;

/// `Buffer::read` が返すエラー
///
/// どちらもその呼び出し限りの終了シグナルで、ストリーム全体を壊すものではない。
/// 1 バイト以上コピーできた呼び出しでは決して返らない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// クローズ済みで、バッファ内のデータをすべて読み切った（以後ずっとこの状態）
    #[error("end of stream")]
    EndOfStream,
    /// デッドラインに到達し、読めるバイトがなかった
    ///
    /// `set_deadline` を再度呼べばフラグはクリアされ、読み取りを再試行できる。
    #[error("i/o deadline exceeded")]
    DeadlineExceeded,
}

impl BufferError {
    /// 対応する `io::ErrorKind`
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            BufferError::EndOfStream => io::ErrorKind::UnexpectedEof,
            BufferError::DeadlineExceeded => io::ErrorKind::TimedOut,
        }
    }
}

impl From<BufferError> for io::Error {
    fn from(err: BufferError) -> Self {
        io::Error::new(err.kind(), err)
    }
}
