//! Wire frames and their MessagePack serialization.
//!
//! The greeter protocol is strictly unary: a request frame carries a method
//! name and one encoded message, and a response frame carries either a result
//! or a fault. Frames are MessagePack arrays tagged by their first element.
use std::io::{Cursor, Read, Write};

use rmpv::{decode::read_value, encode::write_value, Value};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::*;

const REQUEST_FRAME: u64 = 0;
const RESPONSE_FRAME: u64 = 1;

/// The two frame kinds that travel over a connection.
#[derive(PartialEq, Clone, Debug)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

/// A request frame containing an ID, method name, and the encoded request
/// message.
#[derive(PartialEq, Clone, Debug)]
pub struct Request {
    pub id: u32,
    pub method: String,
    pub params: Value,
}

/// A response frame containing an ID and either a result or a fault. Exactly
/// one of the two is produced per request.
#[derive(PartialEq, Clone, Debug)]
pub struct Response {
    pub id: u32,
    pub result: std::result::Result<Value, Fault>,
}

/// Error payload carried in a response frame: a machine-readable code plus a
/// human-readable detail string, reported verbatim to the caller.
#[derive(PartialEq, Clone, Debug)]
pub struct Fault {
    pub code: ErrorCode,
    pub detail: String,
}

impl Fault {
    /// Encodes the fault as a `{"code", "detail"}` map.
    fn to_value(&self) -> Value {
        Value::Map(vec![
            (Value::from("code"), Value::from(self.code as u32)),
            (Value::from("detail"), Value::from(self.detail.clone())),
        ])
    }

    /// Decodes a fault from a wire value. Anything that isn't a well-formed
    /// fault map becomes an `Unknown` fault wrapping the raw value.
    fn from_value(value: &Value) -> Fault {
        if let Value::Map(map) = value {
            let code = map
                .iter()
                .find(|(k, _)| k == &Value::from("code"))
                .and_then(|(_, v)| v.as_u64());
            let detail = map
                .iter()
                .find(|(k, _)| k == &Value::from("detail"))
                .and_then(|(_, v)| v.as_str());
            if let (Some(code), Some(detail)) = (code, detail) {
                return Fault {
                    code: ErrorCode::from_u32(code as u32),
                    detail: detail.to_string(),
                };
            }
        }
        Fault {
            code: ErrorCode::Unknown,
            detail: format!("{:?}", value),
        }
    }
}

impl From<Fault> for RpcError {
    fn from(fault: Fault) -> Self {
        RpcError::Remote {
            code: fault.code,
            detail: fault.detail,
        }
    }
}

impl Frame {
    /// Converts the frame to its wire Value.
    pub fn to_value(&self) -> Value {
        match self {
            Frame::Request(req) => Value::Array(vec![
                Value::Integer(REQUEST_FRAME.into()),
                Value::Integer(req.id.into()),
                Value::String(req.method.clone().into()),
                req.params.clone(),
            ]),
            Frame::Response(resp) => Value::Array(vec![
                Value::Integer(RESPONSE_FRAME.into()),
                Value::Integer(resp.id.into()),
                match &resp.result {
                    Ok(_) => Value::Nil,
                    Err(fault) => fault.to_value(),
                },
                match &resp.result {
                    Ok(value) => value.clone(),
                    Err(_) => Value::Nil,
                },
            ]),
        }
    }

    /// Creates a Frame from a wire Value.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Array(array) => {
                if array.is_empty() {
                    return Err(RpcError::Protocol("Empty frame array".into()));
                }
                match array[0] {
                    Value::Integer(frame_type) => match frame_type.as_u64() {
                        Some(REQUEST_FRAME) => {
                            if array.len() != 4 {
                                return Err(RpcError::Protocol(
                                    "Invalid request frame length".into(),
                                ));
                            }
                            let id = array[1]
                                .as_u64()
                                .and_then(|id| u32::try_from(id).ok())
                                .ok_or(RpcError::Protocol("Invalid request id".into()))?;
                            let method = array[2]
                                .as_str()
                                .ok_or(RpcError::Protocol("Invalid request method".into()))?
                                .to_string();
                            Ok(Frame::Request(Request {
                                id,
                                method,
                                params: array[3].clone(),
                            }))
                        }
                        Some(RESPONSE_FRAME) => {
                            if array.len() != 4 {
                                return Err(RpcError::Protocol(
                                    "Invalid response frame length".into(),
                                ));
                            }
                            let id = array[1]
                                .as_u64()
                                .and_then(|id| u32::try_from(id).ok())
                                .ok_or(RpcError::Protocol("Invalid response id".into()))?;
                            let result = if array[2] == Value::Nil {
                                Ok(array[3].clone())
                            } else {
                                Err(Fault::from_value(&array[2]))
                            };
                            Ok(Frame::Response(Response { id, result }))
                        }
                        _ => Err(RpcError::Protocol("Invalid frame type".into())),
                    },
                    _ => Err(RpcError::Protocol("Invalid frame type".into())),
                }
            }
            _ => Err(RpcError::Protocol("Invalid frame format".into())),
        }
    }

    /// Encodes the frame to MessagePack and writes it to the given writer.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let value = self.to_value();
        write_value(writer, &value)?;
        Ok(())
    }

    /// Reads and decodes a frame from MessagePack using the given reader.
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        match read_value(reader) {
            Ok(value) => Self::from_value(value),
            Err(rmpv::decode::Error::InvalidMarkerRead(e))
            | Err(rmpv::decode::Error::InvalidDataRead(e)) => Err(RpcError::from(e)),
            Err(rmpv::decode::Error::DepthLimitExceeded) => {
                Err(RpcError::Protocol("Depth limit exceeded".into()))
            }
        }
    }
}

/// Serializes a typed message into its wire Value. Structs encode as maps
/// keyed by field name, so the wire stays self-describing.
pub fn to_wire<T>(msg: &T) -> Result<Value>
where
    T: Serialize,
{
    let buf = rmp_serde::to_vec_named(msg)?;
    Ok(read_value(&mut Cursor::new(buf))?)
}

/// Deserializes a typed message from its wire Value.
pub fn from_wire<T>(value: &Value) -> Result<T>
where
    T: DeserializeOwned,
{
    let mut buf = Vec::new();
    write_value(&mut buf, value)?;
    Ok(rmp_serde::from_slice(&buf)?)
}
