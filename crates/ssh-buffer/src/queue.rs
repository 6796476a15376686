//! セグメントキュー
//!
//! 書き込まれたチャンクを 1 つずつ `Segment` として末尾に積み、
//! 読み取り側が先頭から消費する。チャンクはコピーせずにそのまま保持し、
//! 部分的に読まれたセグメントは読み取り位置だけを進める。

use std::collections::VecDeque;

/// キューの 1 要素（書き込み 1 回分のチャンク）
#[derive(Debug)]
struct Segment {
    /// 書き込まれたバイト列（enqueue 後は変更しない）
    data: Vec<u8>,
    /// 読み取り済みのバイト数
    pos: usize,
}

impl Segment {
    /// 未読部分
    fn unread(&self) -> &[u8] {
        &self.data[self.pos..]
    }
}

/// 上限なしの FIFO バイトキュー
///
/// 読み切ったセグメントは先頭から取り除かれ、その時点で解放される。
/// 追加・除去ともに償却 O(1)。
#[derive(Debug, Default)]
pub(crate) struct SegmentQueue {
    segments: VecDeque<Segment>,
}

impl SegmentQueue {
    /// 初期容量を指定して生成する
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        SegmentQueue {
            segments: VecDeque::with_capacity(capacity),
        }
    }

    /// チャンクを末尾に追加する
    pub(crate) fn append(&mut self, chunk: Vec<u8>) {
        self.segments.push_back(Segment { data: chunk, pos: 0 });
    }

    /// 先頭から `dst` に詰められるだけコピーし、コピーしたバイト数を返す
    ///
    /// `dst` が埋まるかキューが空になるまで、複数のセグメントをまたいでコピーする。
    /// 読み切ったセグメントはここで取り除く。
    pub(crate) fn drain_into(&mut self, dst: &mut [u8]) -> usize {
        let mut copied = 0;
        while copied < dst.len() {
            let Some(head) = self.segments.front_mut() else {
                break;
            };
            let unread = head.unread();
            if unread.is_empty() {
                // 読み切った（または空の）セグメントを除去して次へ
                self.segments.pop_front();
                continue;
            }
            let r = unread.len().min(dst.len() - copied);
            dst[copied..copied + r].copy_from_slice(&unread[..r]);
            head.pos += r;
            copied += r;
        }
        copied
    }

    /// 未読バイトが残っていないか
    pub(crate) fn is_empty(&self) -> bool {
        self.segments.iter().all(|s| s.unread().is_empty())
    }

    /// 保持しているセグメント数（読みかけを含む）
    pub(crate) fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_fifo_order() {
        let mut q = SegmentQueue::default();
        q.append(b"hello".to_vec());
        q.append(b" ".to_vec());
        q.append(b"world".to_vec());

        let mut out = [0u8; 32];
        let n = q.drain_into(&mut out);
        assert_eq!(&out[..n], b"hello world");
        assert!(q.is_empty());
    }

    #[test]
    fn test_partial_consumption_keeps_remainder() {
        let mut q = SegmentQueue::default();
        q.append(b"abcdef".to_vec());

        let mut out = [0u8; 4];
        assert_eq!(q.drain_into(&mut out), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(q.segment_count(), 1, "読みかけのセグメントは残る");

        assert_eq!(q.drain_into(&mut out), 2);
        assert_eq!(&out[..2], b"ef");
        assert!(q.is_empty());
    }

    #[test]
    fn test_fully_read_segments_are_retired() {
        let mut q = SegmentQueue::default();
        q.append(b"ab".to_vec());
        q.append(b"cd".to_vec());

        let mut out = [0u8; 3];
        assert_eq!(q.drain_into(&mut out), 3);
        assert_eq!(&out, b"abc");
        // "ab" は除去済み、"cd" は 1 バイト残り
        assert_eq!(q.segment_count(), 1);
    }

    #[test]
    fn test_empty_chunks_are_skipped() {
        let mut q = SegmentQueue::with_capacity(4);
        q.append(Vec::new());
        q.append(b"x".to_vec());
        q.append(Vec::new());
        assert!(!q.is_empty());

        let mut out = [0u8; 8];
        assert_eq!(q.drain_into(&mut out), 1);
        assert_eq!(out[0], b'x');
        assert!(q.is_empty());
    }

    #[test]
    fn test_zero_length_destination_copies_nothing() {
        let mut q = SegmentQueue::default();
        q.append(b"data".to_vec());
        assert_eq!(q.drain_into(&mut []), 0);
        assert!(!q.is_empty());
    }

    #[test]
    fn test_arbitrary_read_sizes_reassemble_stream() {
        let mut q = SegmentQueue::default();
        let mut expected = Vec::new();
        for i in 0..20u8 {
            let chunk: Vec<u8> = (0..i).map(|b| b.wrapping_mul(i)).collect();
            expected.extend_from_slice(&chunk);
            q.append(chunk);
        }

        // 読み取りサイズを 1〜7 で変えながら全部読む
        let mut actual = Vec::new();
        let mut size = 1;
        while !q.is_empty() {
            let mut out = vec![0u8; size];
            let n = q.drain_into(&mut out);
            actual.extend_from_slice(&out[..n]);
            size = size % 7 + 1;
        }
        assert_eq!(actual, expected, "読み取りの分割方法によらずバイト列は一致すべき");
    }
}
