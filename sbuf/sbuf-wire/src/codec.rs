//! Schema-driven encoding and decoding of [`Value`]s.
//!
//! All integers are little-endian and fixed-width; `text`/`bin` carry a u16
//! byte length; lists carry a u8 count. Struct bodies start with a presence
//! bitmask of `ceil(N/8)` bytes, one bit per field in declaration order,
//! followed by the present non-bool fields in that same order. Bool fields
//! live entirely in the mask.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use sbuf_core::{ApiArg, Schema, Struct, Type, TypeKind};

use crate::error::WireError;
use crate::primitive::{bits_len, get_bit, set_bit};
use crate::value::{Value, zero_value};

/// Encode one value of the given type.
pub fn encode(schema: &Schema, ty: &Type, value: &Value) -> Result<Bytes, WireError> {
    let mut out = BytesMut::new();
    Encoder { schema }.write_value(ty, value, &ty.name, &mut out)?;
    Ok(out.freeze())
}

/// Decode one value of the given type from the front of `data`.
pub fn decode(schema: &Schema, ty: &Type, data: &[u8]) -> Result<Value, WireError> {
    let mut decoder = Decoder::new(schema, data);
    decoder.read_value(ty, &ty.name)
}

/// Encode an argument list back-to-back in declaration order (the request
/// body framing of an RPC call).
pub fn encode_args(
    schema: &Schema,
    args: &[ApiArg],
    values: &[Value],
) -> Result<Bytes, WireError> {
    if args.len() != values.len() {
        return Err(WireError::FieldCountMismatch {
            path: "args".to_string(),
            want: args.len(),
            got: values.len(),
        });
    }
    let encoder = Encoder { schema };
    let mut out = BytesMut::new();
    for (arg, value) in args.iter().zip(values) {
        encoder.write_value(&arg.ty, value, &arg.name, &mut out)?;
    }
    Ok(out.freeze())
}

/// Decode an argument list encoded by [`encode_args`].
pub fn decode_args(
    schema: &Schema,
    args: &[ApiArg],
    data: &[u8],
) -> Result<Vec<Value>, WireError> {
    let mut decoder = Decoder::new(schema, data);
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(decoder.read_value(&arg.ty, &arg.name)?);
    }
    Ok(values)
}

struct Encoder<'a> {
    schema: &'a Schema,
}

impl Encoder<'_> {
    fn write_value(
        &self,
        ty: &Type,
        value: &Value,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), WireError> {
        if ty.is_list {
            let Value::List(items) = value else {
                return Err(mismatch(path, "list", value));
            };
            return self.write_list(ty, items, path, out);
        }
        self.write_scalar(ty, value, path, out)
    }

    fn write_list(
        &self,
        ty: &Type,
        items: &[Value],
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), WireError> {
        if items.len() > 255 {
            return Err(WireError::ListTooLong {
                path: path.to_string(),
                len: items.len(),
            });
        }
        out.put_u8(items.len() as u8);

        let elem = scalar_of(ty);
        if elem.is_bool() {
            let mut bits = vec![0u8; bits_len(items.len())];
            for (i, item) in items.iter().enumerate() {
                let Value::Bool(b) = item else {
                    return Err(mismatch(&format!("{path}[{i}]"), "bool", item));
                };
                set_bit(&mut bits, i, *b);
            }
            out.put_slice(&bits);
            return Ok(());
        }

        for (i, item) in items.iter().enumerate() {
            self.write_scalar(&elem, item, &format!("{path}[{i}]"), out)?;
        }
        Ok(())
    }

    fn write_scalar(
        &self,
        ty: &Type,
        value: &Value,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), WireError> {
        match ty.kind {
            TypeKind::Enum => {
                let Value::Enum(id) = value else {
                    return Err(mismatch(path, "enum", value));
                };
                out.put_u8(*id);
                Ok(())
            }
            TypeKind::Struct => {
                let Value::Struct(fields) = value else {
                    return Err(mismatch(path, "struct", value));
                };
                let def = self.struct_def(&ty.name, path)?;
                self.write_struct(def, fields, path, out)
            }
            TypeKind::Base => self.write_base(ty, value, path, out),
        }
    }

    fn write_base(
        &self,
        ty: &Type,
        value: &Value,
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), WireError> {
        match (ty.name.as_str(), value) {
            ("bool", Value::Bool(v)) => out.put_u8(u8::from(*v)),
            ("i8", Value::I8(v)) => out.put_i8(*v),
            ("i16", Value::I16(v)) => out.put_i16_le(*v),
            ("i32", Value::I32(v)) => out.put_i32_le(*v),
            ("i64", Value::I64(v)) => out.put_i64_le(*v),
            ("u8", Value::U8(v)) => out.put_u8(*v),
            ("u16", Value::U16(v)) => out.put_u16_le(*v),
            ("u32", Value::U32(v)) => out.put_u32_le(*v),
            ("u64", Value::U64(v)) => out.put_u64_le(*v),
            ("f32", Value::F32(v)) => out.put_f32_le(*v),
            ("f64", Value::F64(v)) => out.put_f64_le(*v),
            ("text", Value::Text(v)) => return write_len_prefixed(v.as_bytes(), path, out),
            ("bin", Value::Bin(v)) => return write_len_prefixed(v, path, out),
            (name, _) => return Err(mismatch(path, base_name(name), value)),
        }
        Ok(())
    }

    /// Mask first, then the present non-bool fields; the body is staged in a
    /// scratch buffer because the mask is only final once every field has
    /// been examined.
    fn write_struct(
        &self,
        def: &Struct,
        fields: &[Value],
        path: &str,
        out: &mut BytesMut,
    ) -> Result<(), WireError> {
        if fields.len() != def.fields.len() {
            return Err(WireError::FieldCountMismatch {
                path: path.to_string(),
                want: def.fields.len(),
                got: fields.len(),
            });
        }

        let mut mask = vec![0u8; def.mask_len()];
        let mut body = BytesMut::new();
        for (i, (field, value)) in def.fields.iter().zip(fields).enumerate() {
            let field_path = format!("{path}.{}", field.name);
            if field.ty.is_bool() {
                let Value::Bool(b) = value else {
                    return Err(mismatch(&field_path, "bool", value));
                };
                set_bit(&mut mask, i, *b);
                continue;
            }
            if value.is_default() {
                continue;
            }
            self.write_value(&field.ty, value, &field_path, &mut body)?;
            set_bit(&mut mask, i, true);
        }

        out.put_slice(&mask);
        out.put_slice(&body);
        Ok(())
    }

    fn struct_def(&self, name: &str, path: &str) -> Result<&Struct, WireError> {
        self.schema
            .find_struct(name)
            .ok_or_else(|| WireError::UnknownType {
                path: path.to_string(),
                name: name.to_string(),
            })
    }
}

struct Decoder<'a> {
    schema: &'a Schema,
    buf: Bytes,
}

impl<'a> Decoder<'a> {
    fn new(schema: &'a Schema, data: &[u8]) -> Self {
        Self {
            schema,
            buf: Bytes::copy_from_slice(data),
        }
    }

    fn read_value(&mut self, ty: &Type, path: &str) -> Result<Value, WireError> {
        if ty.is_list {
            return self.read_list(ty, path);
        }
        self.read_scalar(ty, path)
    }

    fn read_list(&mut self, ty: &Type, path: &str) -> Result<Value, WireError> {
        let count = self.buf.try_get_u8().map_err(|_| eof(path))? as usize;

        let elem = scalar_of(ty);
        if elem.is_bool() {
            let bits = self.take(bits_len(count), path)?;
            let items = (0..count).map(|i| Value::Bool(get_bit(&bits, i))).collect();
            return Ok(Value::List(items));
        }

        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            items.push(self.read_scalar(&elem, &format!("{path}[{i}]"))?);
        }
        Ok(Value::List(items))
    }

    fn read_scalar(&mut self, ty: &Type, path: &str) -> Result<Value, WireError> {
        match ty.kind {
            TypeKind::Enum => Ok(Value::Enum(
                self.buf.try_get_u8().map_err(|_| eof(path))?,
            )),
            TypeKind::Struct => {
                let def = self
                    .schema
                    .find_struct(&ty.name)
                    .ok_or_else(|| WireError::UnknownType {
                        path: path.to_string(),
                        name: ty.name.clone(),
                    })?;
                self.read_struct(def, path)
            }
            TypeKind::Base => self.read_base(ty, path),
        }
    }

    fn read_base(&mut self, ty: &Type, path: &str) -> Result<Value, WireError> {
        let eof_err = || eof(path);
        Ok(match ty.name.as_str() {
            "bool" => Value::Bool(self.buf.try_get_u8().map_err(|_| eof_err())? == 1),
            "i8" => Value::I8(self.buf.try_get_i8().map_err(|_| eof_err())?),
            "i16" => Value::I16(self.buf.try_get_i16_le().map_err(|_| eof_err())?),
            "i32" => Value::I32(self.buf.try_get_i32_le().map_err(|_| eof_err())?),
            "i64" => Value::I64(self.buf.try_get_i64_le().map_err(|_| eof_err())?),
            "u8" => Value::U8(self.buf.try_get_u8().map_err(|_| eof_err())?),
            "u16" => Value::U16(self.buf.try_get_u16_le().map_err(|_| eof_err())?),
            "u32" => Value::U32(self.buf.try_get_u32_le().map_err(|_| eof_err())?),
            "u64" => Value::U64(self.buf.try_get_u64_le().map_err(|_| eof_err())?),
            "f32" => Value::F32(self.buf.try_get_f32_le().map_err(|_| eof_err())?),
            "f64" => Value::F64(self.buf.try_get_f64_le().map_err(|_| eof_err())?),
            "text" => {
                let bytes = self.read_len_prefixed(path)?;
                let text = std::str::from_utf8(&bytes).map_err(|_| WireError::InvalidUtf8 {
                    path: path.to_string(),
                })?;
                Value::Text(text.to_string())
            }
            "bin" => Value::Bin(self.read_len_prefixed(path)?.to_vec()),
            name => {
                return Err(WireError::UnknownType {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
        })
    }

    fn read_struct(&mut self, def: &Struct, path: &str) -> Result<Value, WireError> {
        let mask = self.take(def.mask_len(), path)?;

        let mut fields = Vec::with_capacity(def.fields.len());
        for (i, field) in def.fields.iter().enumerate() {
            if field.ty.is_bool() {
                fields.push(Value::Bool(get_bit(&mask, i)));
                continue;
            }
            if get_bit(&mask, i) {
                let field_path = format!("{path}.{}", field.name);
                fields.push(self.read_value(&field.ty, &field_path)?);
            } else {
                fields.push(zero_value(&field.ty));
            }
        }
        Ok(Value::Struct(fields))
    }

    fn read_len_prefixed(&mut self, path: &str) -> Result<Bytes, WireError> {
        let len = self.buf.try_get_u16_le().map_err(|_| eof(path))? as usize;
        self.take(len, path)
    }

    fn take(&mut self, n: usize, path: &str) -> Result<Bytes, WireError> {
        if self.buf.remaining() < n {
            return Err(eof(path));
        }
        Ok(self.buf.copy_to_bytes(n))
    }
}

/// The element view of a list type.
fn scalar_of(ty: &Type) -> Type {
    Type {
        name: ty.name.clone(),
        is_list: false,
        kind: ty.kind,
    }
}

fn write_len_prefixed(bytes: &[u8], path: &str, out: &mut BytesMut) -> Result<(), WireError> {
    if bytes.len() > u16::MAX as usize {
        return Err(WireError::TooLong {
            path: path.to_string(),
            len: bytes.len(),
        });
    }
    out.put_u16_le(bytes.len() as u16);
    out.put_slice(bytes);
    Ok(())
}

fn eof(path: &str) -> WireError {
    WireError::UnexpectedEof {
        path: path.to_string(),
    }
}

fn mismatch(path: &str, expected: &'static str, found: &Value) -> WireError {
    WireError::TypeMismatch {
        path: path.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn base_name(name: &str) -> &'static str {
    match name {
        "bool" => "bool",
        "i8" => "i8",
        "i16" => "i16",
        "i32" => "i32",
        "i64" => "i64",
        "u8" => "u8",
        "u16" => "u16",
        "u32" => "u32",
        "u64" => "u64",
        "f32" => "f32",
        "f64" => "f64",
        "text" => "text",
        "bin" => "bin",
        _ => "base type",
    }
}
