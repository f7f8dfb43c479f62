use std::fmt;
use std::io::{Cursor, Write};

use crate::Error;

/// Source of a streamed (chunked) request body.
pub trait ChunkedContent: Send {
    /// Produce the next piece of the body. `None` ends the body.
    ///
    /// `call_count` starts at 0 and increases by one for each call.
    fn next_chunk(&mut self, call_count: u64) -> Option<Vec<u8>>;
}

impl<F> ChunkedContent for F
where
    F: FnMut(u64) -> Option<Vec<u8>> + Send,
{
    fn next_chunk(&mut self, call_count: u64) -> Option<Vec<u8>> {
        (self)(call_count)
    }
}

/// A chunked request body in the process of being sent.
pub struct ChunkedBody {
    content: Box<dyn ChunkedContent>,
    calls: u64,
    pending: Option<Vec<u8>>,
    ended: bool,
    end_written: bool,
}

impl ChunkedBody {
    pub fn new(content: impl ChunkedContent + 'static) -> Self {
        ChunkedBody {
            content: Box::new(content),
            calls: 0,
            pending: None,
            ended: false,
            end_written: false,
        }
    }

    /// Pull the next unframed piece from the content.
    ///
    /// Empty pieces are skipped since a zero length chunk means end-of-body.
    pub fn next_chunk(&mut self) -> Option<Vec<u8>> {
        if let Some(pending) = self.pending.take() {
            return Some(pending);
        }

        while !self.ended {
            let call_count = self.calls;
            self.calls += 1;

            match self.content.next_chunk(call_count) {
                Some(v) if v.is_empty() => continue,
                Some(v) => return Some(v),
                None => self.ended = true,
            }
        }

        None
    }

    /// Write the next chunk, transfer-encoding framed, to `output`.
    ///
    /// Returns `Ok(0)` once the body has ended and the final `0\r\n\r\n` has
    /// been written by a previous call. If the chunk does not fit, the chunk
    /// is kept and retried on the next call.
    pub fn write_next(&mut self, output: &mut [u8]) -> Result<usize, Error> {
        match self.next_chunk() {
            Some(chunk) => match write_chunk(&chunk, output) {
                Ok(n) => Ok(n),
                Err(e) => {
                    self.pending = Some(chunk);
                    Err(e)
                }
            },
            None => {
                if self.end_written {
                    return Ok(0);
                }
                let n = write_end(output)?;
                self.end_written = true;
                Ok(n)
            }
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended && self.pending.is_none()
    }
}

impl fmt::Debug for ChunkedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedBody")
            .field("calls", &self.calls)
            .field("ended", &self.ended)
            .finish()
    }
}

/// Write one chunk, `{len:x}\r\n{data}\r\n`, to `output`.
///
/// An empty input writes nothing, since that would signal end of body.
pub fn write_chunk(input: &[u8], output: &mut [u8]) -> Result<usize, Error> {
    if input.is_empty() {
        return Ok(0);
    }

    let mut w = Cursor::new(output);

    // chunk length
    write!(w, "{:x}\r\n", input.len()).map_err(|_| Error::OutputOverflow)?;

    // chunk
    w.write_all(input).map_err(|_| Error::OutputOverflow)?;

    // chunk end
    w.write_all(b"\r\n").map_err(|_| Error::OutputOverflow)?;

    Ok(w.position() as usize)
}

/// Write the terminating zero length chunk.
pub fn write_end(output: &mut [u8]) -> Result<usize, Error> {
    const END: &[u8] = b"0\r\n\r\n";

    if output.len() < END.len() {
        return Err(Error::OutputOverflow);
    }

    output[..END.len()].copy_from_slice(END);

    Ok(END.len())
}
