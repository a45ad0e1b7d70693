use crate::traits::Encode;
use bytes::BytesMut;

pub struct Encoder {
    buffer: BytesMut,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    pub fn new() -> Self {
        Encoder {
            buffer: BytesMut::new(),
        }
    }
    
    pub fn with_capacity(capacity: usize) -> Self {
        Encoder {
            buffer: BytesMut::with_capacity(capacity),
        }
    }
    
    pub fn finish(self) -> Vec<u8> {
        self.buffer.to_vec()
    }
    
    pub fn encode_bytes(&mut self, bytes: &[u8]) {
        match bytes.len() {
            1 if bytes[0] < 0x80 => self.buffer.extend_from_slice(bytes),
            len => {
                self.encode_header(0x80, 0xb7, len);
                self.buffer.extend_from_slice(bytes);
            }
        }
    }
    
    pub fn encode_list<T: Encode>(&mut self, items: &[T]) {
        self.encode_list_with(|list| {
            for item in items {
                item.encode(list);
            }
        });
    }
    
    /// Encode a heterogeneous list: every item appended by `build` lands
    /// inside a single list header.
    pub fn encode_list_with<F>(&mut self, build: F)
    where
        F: FnOnce(&mut Encoder),
    {
        let mut list_encoder = Encoder::new();
        build(&mut list_encoder);
        let payload = list_encoder.finish();
        
        self.encode_header(0xc0, 0xf7, payload.len());
        self.buffer.extend_from_slice(&payload);
    }
    
    pub fn encode_u64(&mut self, value: u64) {
        let bytes = value.to_be_bytes();
        match bytes.iter().position(|&b| b != 0) {
            Some(first_non_zero) => self.encode_bytes(&bytes[first_non_zero..]),
            None => self.encode_bytes(&[]),
        }
    }
    
    pub fn encode_u8(&mut self, value: u8) {
        self.encode_u64(value as u64);
    }
    
    pub fn encode_bool(&mut self, value: bool) {
        self.encode_u8(if value { 1 } else { 0 });
    }
    
    fn encode_header(&mut self, short_base: u8, long_base: u8, len: usize) {
        if len < 56 {
            self.buffer.extend_from_slice(&[short_base + len as u8]);
        } else {
            let len_bytes = encode_length(len);
            self.buffer.extend_from_slice(&[long_base + len_bytes.len() as u8]);
            self.buffer.extend_from_slice(&len_bytes);
        }
    }
}

fn encode_length(len: usize) -> Vec<u8> {
    let bytes = (len as u64).to_be_bytes();
    let first_non_zero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[first_non_zero..].to_vec()
}
