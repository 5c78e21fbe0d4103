//! Output pumping
//!
//! Reads a child's stdout or stderr in chunks and hands them on as text.
//! A multi-byte character split across two reads is held back until it is
//! complete.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::warn;

const CHUNK_SIZE: usize = 4096;

/// Read `reader` to EOF, calling `on_chunk` for every decoded piece of text
pub(crate) async fn pump<R>(mut reader: R, mut on_chunk: impl FnMut(String))
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut pending = Vec::new();

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let text = take_utf8(&mut pending);
                if !text.is_empty() {
                    on_chunk(text);
                }
            }
            Err(e) => {
                warn!(?e, "output read error");
                break;
            }
        }
    }

    if !pending.is_empty() {
        on_chunk(String::from_utf8_lossy(&pending).into_owned());
    }
}

/// Take the longest decodable prefix out of `pending`.
///
/// An incomplete trailing sequence stays in `pending`; genuinely invalid
/// bytes are replaced with U+FFFD.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            return text;
        }
    };

    let tail = pending.split_off(valid);
    let head = std::mem::replace(pending, tail);
    String::from_utf8(head)
        .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}
