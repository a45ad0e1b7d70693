use crate::decode::decode_u64_bytes;
use crate::{Decoder, DecoderError, Encoder, RlpError, RlpItem};
use oracle_types::{Address, Bytes, UintExt, H256, U256};

pub trait Encode {
    fn encode(&self, encoder: &mut Encoder);
}

pub trait Decode: Sized {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError>;
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, encoder: &mut Encoder) {
        (**self).encode(encoder);
    }
}

impl Encode for u8 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_u8(*self);
    }
}

impl Decode for RlpItem {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_item()
    }
}

impl Decode for u8 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_u8()
    }
}

impl Encode for u64 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_u64(*self);
    }
}

impl Decode for u64 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_u64()
    }
}

impl Encode for bool {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bool(*self);
    }
}

impl Decode for bool {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_bool()
    }
}

impl Encode for [u8] {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self);
    }
}

impl Encode for Vec<u8> {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self);
    }
}

impl Decode for Vec<u8> {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_bytes()
    }
}

impl Encode for str {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_bytes());
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, encoder: &mut Encoder) {
        match self {
            Some(value) => value.encode(encoder),
            None => encoder.encode_bytes(&[]),
        }
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        if decoder.is_empty_string()? {
            decoder.decode_bytes()?;
            Ok(None)
        } else {
            Ok(Some(T::decode(decoder)?))
        }
    }
}

impl Encode for Bytes {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_slice());
    }
}

impl Decode for Bytes {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        Ok(Bytes::from_vec(decoder.decode_bytes()?))
    }
}

impl Encode for Address {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_bytes());
    }
}

impl Decode for Address {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        Address::from_slice(&bytes).map_err(|_| {
            RlpError::from(DecoderError::InvalidData(format!(
                "Invalid address length: {}",
                bytes.len()
            )))
        })
    }
}

impl Encode for H256 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(self.as_bytes());
    }
}

impl Decode for H256 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        if bytes.len() != 32 {
            return Err(DecoderError::InvalidData(
                format!("Invalid H256 length: {}", bytes.len()),
            ).into());
        }
        Ok(H256::from_slice(&bytes))
    }
}

impl Encode for U256 {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_bytes(&self.to_be_bytes_trimmed());
    }
}

impl Decode for U256 {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        let bytes = decoder.decode_bytes()?;
        if bytes.len() > 32 {
            return Err(DecoderError::IntegerOverflow.into());
        }
        if bytes.len() > 1 && bytes[0] == 0 {
            return Err(DecoderError::LeadingZeros.into());
        }
        Ok(U256::from_be_bytes_vec(&bytes))
    }
}

/// Decode a scalar from a list item already split out of its parent.
pub fn u64_from_item(bytes: &[u8]) -> Result<u64, RlpError> {
    decode_u64_bytes(bytes)
}
