#![forbid(unsafe_code)]

//! Fixed-width element codecs.
//!
//! All element types encode little-endian, matching the byte order the hex
//! view has always shown for multi-byte values. Byte order is a property of
//! the element type and cannot be changed per provider.

/// A fixed-width element that maps to and from raw bytes.
pub trait ElementCodec: Copy {
    /// Encoded width in bytes.
    const WIDTH: usize;

    /// Append the encoded form of `self` to `out`.
    fn encode(self, out: &mut Vec<u8>);

    /// Decode one element from exactly [`WIDTH`](Self::WIDTH) bytes.
    fn decode(chunk: &[u8]) -> Self;
}

macro_rules! le_codec {
    ($($ty:ty),*) => {$(
        impl ElementCodec for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn encode(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode(chunk: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(chunk);
                <$ty>::from_le_bytes(raw)
            }
        }
    )*};
}

le_codec!(u8, i8, i16, i32, i64);

/// Encode a sequence of elements into one flat buffer.
#[must_use]
pub fn encode_all<T: ElementCodec>(values: &[T]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * T::WIDTH);
    for value in values {
        value.encode(&mut out);
    }
    out
}

/// Decode a buffer whose length is a multiple of `T::WIDTH`.
///
/// Returns `None` for a misaligned buffer; callers decide how to report it.
#[must_use]
pub fn decode_all<T: ElementCodec>(bytes: &[u8]) -> Option<Vec<T>> {
    if bytes.len() % T::WIDTH != 0 {
        return None;
    }
    Some(bytes.chunks_exact(T::WIDTH).map(T::decode).collect())
}
