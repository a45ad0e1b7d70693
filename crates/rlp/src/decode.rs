use crate::traits::Decode;
use crate::{DecoderError, RlpError, RlpItem};

pub struct Decoder<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, RlpError> {
        if data.is_empty() {
            return Err(DecoderError::UnexpectedEof.into());
        }
        Ok(Decoder { data, position: 0 })
    }
    
    pub fn decode_bytes(&mut self) -> Result<Vec<u8>, RlpError> {
        let (offset, len, is_data) = self.decode_header()?;
        
        if !is_data {
            return Err(DecoderError::InvalidData("Expected data, got list".to_string()).into());
        }
        
        let start = self.position + offset;
        let end = start.checked_add(len).ok_or(DecoderError::IntegerOverflow)?;
        if end > self.data.len() {
            return Err(DecoderError::UnexpectedEof.into());
        }
        
        let bytes = self.data[start..end].to_vec();
        self.position = end;
        
        Ok(bytes)
    }
    
    pub fn decode_list<T: Decode>(&mut self) -> Result<Vec<T>, RlpError> {
        let (offset, len, is_data) = self.decode_header()?;
        
        if is_data {
            return Err(DecoderError::InvalidData("Expected list, got data".to_string()).into());
        }
        
        let start = self.position + offset;
        let end = start.checked_add(len).ok_or(DecoderError::IntegerOverflow)?;
        if end > self.data.len() {
            return Err(DecoderError::UnexpectedEof.into());
        }
        
        let mut inner = Decoder {
            data: &self.data[..end],
            position: start,
        };
        let mut items = Vec::new();
        while !inner.is_finished() {
            items.push(T::decode(&mut inner)?);
        }
        self.position = end;
        
        Ok(items)
    }
    
    pub fn decode_item(&mut self) -> Result<RlpItem, RlpError> {
        if self.is_list()? {
            Ok(RlpItem::List(self.decode_list()?))
        } else {
            Ok(RlpItem::String(self.decode_bytes()?))
        }
    }
    
    pub fn decode_u64(&mut self) -> Result<u64, RlpError> {
        let bytes = self.decode_bytes()?;
        decode_u64_bytes(&bytes)
    }
    
    pub fn decode_u8(&mut self) -> Result<u8, RlpError> {
        let value = self.decode_u64()?;
        u8::try_from(value).map_err(|_| RlpError::from(DecoderError::IntegerOverflow))
    }
    
    pub fn decode_bool(&mut self) -> Result<bool, RlpError> {
        match self.decode_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecoderError::InvalidData("Invalid boolean value".to_string()).into()),
        }
    }
    
    pub fn is_empty_string(&self) -> Result<bool, RlpError> {
        Ok(self.peek_prefix()? == 0x80)
    }
    
    pub fn is_list(&self) -> Result<bool, RlpError> {
        Ok(self.peek_prefix()? >= 0xc0)
    }
    
    pub fn is_finished(&self) -> bool {
        self.position >= self.data.len()
    }
    
    fn peek_prefix(&self) -> Result<u8, RlpError> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(RlpError::Decoder(DecoderError::UnexpectedEof))
    }
    
    fn decode_header(&mut self) -> Result<(usize, usize, bool), RlpError> {
        let prefix = self.peek_prefix()?;
        
        match prefix {
            0x00..=0x7f => Ok((0, 1, true)),
            0x80..=0xb7 => Ok((1, (prefix - 0x80) as usize, true)),
            0xb8..=0xbf => {
                let len_of_len = (prefix - 0xb7) as usize;
                let len = self.decode_long_length(len_of_len)?;
                Ok((1 + len_of_len, len, true))
            }
            0xc0..=0xf7 => Ok((1, (prefix - 0xc0) as usize, false)),
            0xf8..=0xff => {
                let len_of_len = (prefix - 0xf7) as usize;
                let len = self.decode_long_length(len_of_len)?;
                Ok((1 + len_of_len, len, false))
            }
        }
    }
    
    fn decode_long_length(&self, len_of_len: usize) -> Result<usize, RlpError> {
        let start = self.position + 1;
        if start + len_of_len > self.data.len() {
            return Err(DecoderError::UnexpectedEof.into());
        }
        decode_length(&self.data[start..start + len_of_len])
    }
}

pub(crate) fn decode_u64_bytes(bytes: &[u8]) -> Result<u64, RlpError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 8 {
        return Err(DecoderError::IntegerOverflow.into());
    }
    if bytes[0] == 0 {
        return Err(DecoderError::LeadingZeros.into());
    }
    
    let mut array = [0u8; 8];
    array[8 - bytes.len()..].copy_from_slice(bytes);
    Ok(u64::from_be_bytes(array))
}

fn decode_length(bytes: &[u8]) -> Result<usize, RlpError> {
    if bytes.is_empty() {
        return Err(DecoderError::InvalidData("Empty length bytes".to_string()).into());
    }
    
    if bytes[0] == 0 {
        return Err(DecoderError::LeadingZeros.into());
    }
    
    let mut len = 0usize;
    for &byte in bytes {
        len = len.checked_shl(8)
            .and_then(|l| l.checked_add(byte as usize))
            .ok_or(DecoderError::IntegerOverflow)?;
    }
    
    Ok(len)
}
