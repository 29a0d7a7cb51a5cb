//! Bounds-checked read cursor over captured bytes.
//!
//! Every dissector reads through a [`Cursor`]. A read either consumes exactly
//! the bytes it asked for or fails with [`DecodeError::TooShort`] without
//! moving. The cursor borrows the capture and never outlives it.

use crate::error::{DecodeError, DecodeResult};

/// Forward-only view over a captured byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_int {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $from:ident) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> DecodeResult<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes = self.read_array::<N>()?;
            Ok(<$ty>::$from(bytes))
        }
    };
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Captured bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Unconsumed bytes, without advancing.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fail unless at least `n` bytes are captured.
    #[inline]
    pub fn ensure(&self, n: usize) -> DecodeResult<()> {
        if n > self.remaining() {
            Err(DecodeError::too_short(n, self.remaining()))
        } else {
            Ok(())
        }
    }

    #[inline]
    pub fn peek_u8(&self) -> DecodeResult<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::too_short(1, 0))
    }

    /// Look at the next `n` bytes without consuming them.
    pub fn peek_bytes(&self, n: usize) -> DecodeResult<&'a [u8]> {
        self.ensure(n)?;
        Ok(&self.data[self.pos..self.pos + n])
    }

    #[inline]
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        let b = self.peek_u8()?;
        self.pos += 1;
        Ok(b)
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        self.ensure(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    read_int!(
        /// Big-endian u16.
        read_u16, u16, from_be_bytes
    );
    read_int!(
        /// Big-endian u32.
        read_u32, u32, from_be_bytes
    );
    read_int!(
        /// Big-endian u64.
        read_u64, u64, from_be_bytes
    );
    read_int!(read_u16_le, u16, from_le_bytes);
    read_int!(read_u32_le, u32, from_le_bytes);
    read_int!(read_u64_le, u64, from_le_bytes);

    /// Read a `width`-byte big-endian unsigned integer.
    ///
    /// Widths above 8 are accepted as long as the surplus leading octets are
    /// zero; otherwise the value cannot fit and the read is malformed. A zero
    /// width yields 0 without consuming anything.
    pub fn read_fixed_int_n(&mut self, width: usize) -> DecodeResult<u64> {
        self.ensure(width)?;
        let bytes = &self.data[self.pos..self.pos + width];
        let mut value: u64 = 0;
        for &b in bytes {
            if value > (u64::MAX >> 8) {
                return Err(DecodeError::malformed(
                    "integer",
                    format!("{width}-byte value overflows 64 bits"),
                ));
            }
            value = (value << 8) | u64::from(b);
        }
        self.pos += width;
        Ok(value)
    }

    /// Borrow the next `n` bytes and advance past them.
    #[inline]
    pub fn read_bytes(&mut self, n: usize) -> DecodeResult<&'a [u8]> {
        let bytes = self.peek_bytes(n)?;
        self.pos += n;
        Ok(bytes)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        self.ensure(n)?;
        self.pos += n;
        Ok(())
    }

    /// Read a NUL-terminated string of at most `max` bytes (terminator excluded).
    ///
    /// The terminator is consumed. Missing terminator within the captured bytes
    /// is `TooShort` when the capture ends first, `Malformed` when `max` is hit.
    pub fn read_cstr(&mut self, max: usize) -> DecodeResult<&'a [u8]> {
        let rest = self.rest();
        let window = &rest[..rest.len().min(max.saturating_add(1))];
        match window.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                Ok(&rest[..end])
            }
            None if window.len() > max => Err(DecodeError::malformed(
                "string",
                format!("no terminator within {max} bytes"),
            )),
            None => Err(DecodeError::too_short(window.len() + 1, window.len())),
        }
    }

    /// Split off a sub-cursor over the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> DecodeResult<Cursor<'a>> {
        self.read_bytes(n).map(Cursor::new)
    }

    /// Sub-cursor over up to `n` bytes, stopping at the end of the capture.
    ///
    /// Used when a header declares more content than was captured and the
    /// caller wants to decode whatever is present.
    pub fn take_truncated(&mut self, n: usize) -> Cursor<'a> {
        let n = n.min(self.remaining());
        let sub = Cursor::new(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        sub
    }
}
