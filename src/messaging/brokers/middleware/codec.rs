use std::marker::PhantomData;

use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::CodecError;

/// Преобразует сообщения в кадры внешнего брокера и обратно.
pub trait MessageCodec<M>: Send + Sync {
    fn encode(
        &self,
        message: &M,
    ) -> Result<Bytes, CodecError>;

    fn decode(
        &self,
        frame: &[u8],
    ) -> Result<M, CodecError>;
}

/// Кодек на `serde_json` для любого сериализуемого сообщения.
pub struct JsonCodec<M> {
    _marker: PhantomData<fn() -> M>,
}

impl<M> JsonCodec<M> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<M> Default for JsonCodec<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> MessageCodec<M> for JsonCodec<M>
where
    M: Serialize + DeserializeOwned,
{
    fn encode(
        &self,
        message: &M,
    ) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(message)?))
    }

    fn decode(
        &self,
        frame: &[u8],
    ) -> Result<M, CodecError> {
        if frame.is_empty() {
            return Err(CodecError::Malformed("empty frame".to_string()));
        }
        Ok(serde_json::from_slice(frame)?)
    }
}
