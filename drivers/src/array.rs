/*++

Licensed under the Apache-2.0 license.

File Name:

    array.rs

Abstract:

    File contains common word array definitions used by the security module
    interface. Words hold big-endian byte quadruplets.

--*/

use zeroize::Zeroize;

macro_rules! array4 {
    ($dim: literal) => {
        paste::paste! {
             pub const [<ARRAY_4X $dim _BYTE_SIZE>]: usize = $dim * core::mem::size_of::<u32>();
             pub const [<ARRAY_4X $dim _WORD_SIZE>]: usize = $dim ;

             #[repr(transparent)]
             #[derive(
                 Debug, Default, Copy, Clone, Eq, PartialEq, Zeroize,
                 zerocopy::AsBytes, zerocopy::FromBytes,
             )]
             pub struct [<Array4x $dim>](pub [u32; [<ARRAY_4X $dim _WORD_SIZE>]]);

             impl [<Array4x $dim>] {
                 /// Serialize the words as big-endian bytes.
                 pub fn to_be_bytes(&self) -> [u8; [<ARRAY_4X $dim _BYTE_SIZE>]] {
                     let mut result = [0u8; [<ARRAY_4X $dim _BYTE_SIZE>]];
                     for (chunk, word) in result.chunks_exact_mut(4).zip(self.0.iter()) {
                         chunk.copy_from_slice(&word.to_be_bytes());
                     }
                     result
                 }

                 /// Build from big-endian bytes. Returns `None` if `bytes` has the
                 /// wrong length.
                 pub fn from_be_slice(bytes: &[u8]) -> Option<Self> {
                     if bytes.len() != [<ARRAY_4X $dim _BYTE_SIZE>] {
                         return None;
                     }
                     let mut result = Self::default();
                     for (word, chunk) in result.0.iter_mut().zip(bytes.chunks_exact(4)) {
                         *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                     }
                     Some(result)
                 }
             }

             impl From<[u8; [<ARRAY_4X $dim _BYTE_SIZE>]]> for [<Array4x $dim>] {
                 #[inline(never)]
                 fn from(value: [u8; [<ARRAY_4X $dim _BYTE_SIZE>]]) -> Self {
                     Self::from(&value)
                 }
             }

             impl<'a> From<&'a [u8; [<ARRAY_4X $dim _BYTE_SIZE>]]> for [<Array4x $dim>] {
                 #[inline(never)]
                 fn from(value: &'a [u8; [<ARRAY_4X $dim _BYTE_SIZE>]]) -> Self {
                     let mut result = Self::default();
                     for (word, chunk) in result.0.iter_mut().zip(value.chunks_exact(4)) {
                         *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                     }
                     result
                 }
             }

             impl From<[<Array4x $dim>]> for [u8; [<ARRAY_4X $dim _BYTE_SIZE>]] {
                 #[inline(never)]
                 fn from(value: [<Array4x $dim>]) -> Self {
                     value.to_be_bytes()
                 }
             }

             impl From<[u32; [<ARRAY_4X $dim _WORD_SIZE>]]> for [<Array4x $dim>] {
                 #[inline(never)]
                 fn from(value: [u32; [<ARRAY_4X $dim _WORD_SIZE>]]) -> Self {
                     [<Array4x $dim>](value)
                 }
             }

             impl From<[<Array4x $dim>]> for [u32; [<ARRAY_4X $dim _WORD_SIZE>]] {
                 #[inline(never)]
                 fn from(value: [<Array4x $dim>]) -> Self {
                     value.0
                 }
             }
        }
    };
}

array4!(4);
array4!(8);
array4!(16);
