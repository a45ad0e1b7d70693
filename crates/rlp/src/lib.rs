pub mod decode;
pub mod encode;
pub mod error;
pub mod traits;

pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{DecoderError, RlpError};
pub use traits::{Decode, Encode};

use oracle_types::Bytes;

pub fn encode<T: Encode + ?Sized>(value: &T) -> Bytes {
    let mut encoder = Encoder::new();
    value.encode(&mut encoder);
    Bytes::from_vec(encoder.finish())
}

pub fn decode<T: Decode>(data: &[u8]) -> Result<T, RlpError> {
    let mut decoder = Decoder::new(data)?;
    let value = T::decode(&mut decoder)?;
    if !decoder.is_finished() {
        return Err(DecoderError::TrailingBytes.into());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RlpItem {
    String(Vec<u8>),
    List(Vec<RlpItem>),
}

impl RlpItem {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RlpItem::String(bytes) => Some(bytes),
            RlpItem::List(_) => None,
        }
    }
    
    pub fn as_list(&self) -> Option<&[RlpItem]> {
        match self {
            RlpItem::String(_) => None,
            RlpItem::List(items) => Some(items),
        }
    }
}
