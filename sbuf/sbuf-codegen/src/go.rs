//! Go binding generator.
//!
//! Emits a self-contained package: the `type.go` primitives runtime, one
//! file per struct, `enum.go`, the RPC client (`rpc.go`), the HTTP handler
//! surface (`api._.go`), and one overwrite-protected logic stub per API.

use sbuf_core::{Api, Enum, Schema, Struct, StructField, Type, TypeKind};

use crate::naming::{pascal_case, snake_case};
use crate::writer::{CodeWriter, w};
use crate::{CodegenError, GeneratedFile};

#[derive(Debug, Clone)]
pub struct GoOptions {
    /// Go package name of the generated files.
    pub package: String,
    /// Struct tag keys from `--tag` (e.g. `["bson", "json"]`); each field
    /// gets every key with its tag literal or snake_case name as the value.
    pub tags: Vec<String>,
}

impl Default for GoOptions {
    fn default() -> Self {
        Self {
            package: "sb".to_string(),
            tags: Vec::new(),
        }
    }
}

pub fn generate_go(schema: &Schema, opts: &GoOptions) -> Result<Vec<GeneratedFile>, CodegenError> {
    let mut files = vec![GeneratedFile::new("type.go", runtime(opts))];
    if !schema.enums.is_empty() {
        files.push(GeneratedFile::new("enum.go", enums(&schema.enums, opts)));
    }
    for s in &schema.structs {
        files.push(GeneratedFile::new(
            format!("struct_{}.go", snake_case(&s.name)),
            struct_file(s, opts)?,
        ));
    }
    if !schema.apis.is_empty() {
        files.push(GeneratedFile::new("rpc.go", rpc_client(schema, opts)?));
        files.push(GeneratedFile::new("api._.go", api_surface(schema, opts)?));
        for api in &schema.apis {
            files.push(GeneratedFile::scaffold(
                format!("api.{}.go", api.name),
                logic_stub(api, opts)?,
            ));
        }
    }
    Ok(files)
}

// ── type mapping ─────────────────────────────────────────────────────────────

fn go_base(name: &str) -> Result<&'static str, CodegenError> {
    Ok(match name {
        "i8" => "int8",
        "u8" => "uint8",
        "i16" => "int16",
        "u16" => "uint16",
        "i32" => "int32",
        "u32" => "uint32",
        "i64" => "int64",
        "u64" => "uint64",
        "f32" => "float32",
        "f64" => "float64",
        "bool" => "bool",
        "text" => "string",
        "bin" => "[]byte",
        other => {
            return Err(CodegenError::UnknownBaseType {
                name: other.to_string(),
                target: "go",
            });
        }
    })
}

/// Host-language type of a field, argument, or result.
fn go_type(ty: &Type) -> Result<String, CodegenError> {
    let prefix = if ty.is_list { "[]" } else { "" };
    Ok(match ty.kind {
        TypeKind::Base => format!("{prefix}{}", go_base(&ty.name)?),
        TypeKind::Struct => format!("{prefix}*{}", pascal_case(&ty.name)),
        TypeKind::Enum => format!("{prefix}{}", pascal_case(&ty.name)),
    })
}

/// Suffix of the `Set*`/`Get*`/`Eq*` runtime helpers for a base type.
fn wire_suffix(name: &str) -> String {
    pascal_case(name)
}

/// Wire-facing wrapper type used in `SetAll`/`GetAll` positions.
fn rpc_wire_type(ty: &Type) -> String {
    match (ty.kind, ty.is_list) {
        (TypeKind::Base, false) => wire_suffix(&ty.name),
        (TypeKind::Base, true) => format!("{}List", wire_suffix(&ty.name)),
        (TypeKind::Enum, false) => "U8".to_string(),
        (TypeKind::Enum, true) => format!("{}List", pascal_case(&ty.name)),
        (TypeKind::Struct, false) => pascal_case(&ty.name),
        (TypeKind::Struct, true) => format!("{}List", pascal_case(&ty.name)),
    }
}

/// Conversion from the wire wrapper variable back to the host type.
fn from_wire(ty: &Type, expr: &str) -> Result<String, CodegenError> {
    Ok(match (ty.kind, ty.is_list) {
        (TypeKind::Struct, false) => format!("&{expr}"),
        _ => format!("{}({expr})", go_type(ty)?),
    })
}

/// Conversion from a host-typed expression into a `Serializable` wrapper.
fn to_wire(ty: &Type, expr: &str) -> String {
    match (ty.kind, ty.is_list) {
        (TypeKind::Struct, false) => expr.to_string(),
        _ => format!("{}({expr})", rpc_wire_type(ty)),
    }
}

// ── type.go runtime ──────────────────────────────────────────────────────────

struct NumericType {
    suffix: &'static str,
    go: &'static str,
    eps: Option<&'static str>,
}

const NUMERIC_TYPES: [NumericType; 10] = [
    NumericType { suffix: "I8", go: "int8", eps: None },
    NumericType { suffix: "U8", go: "uint8", eps: None },
    NumericType { suffix: "I16", go: "int16", eps: None },
    NumericType { suffix: "U16", go: "uint16", eps: None },
    NumericType { suffix: "I32", go: "int32", eps: None },
    NumericType { suffix: "U32", go: "uint32", eps: None },
    NumericType { suffix: "I64", go: "int64", eps: None },
    NumericType { suffix: "U64", go: "uint64", eps: None },
    NumericType { suffix: "F32", go: "float32", eps: Some("1e-6") },
    NumericType { suffix: "F64", go: "float64", eps: Some("1e-9") },
];

fn runtime(opts: &GoOptions) -> String {
    let mut out = CodeWriter::new();
    w!(out, "package {}", opts.package);
    out.blank();
    out.raw(
        r#"import (
	"bytes"
	"encoding/binary"
	"fmt"
	"math"
	"slices"
)

type Serializable interface{ Set(*bytes.Buffer) error }
type Deserializable interface{ Get(*bytes.Buffer) error }

func SetAll(buf *bytes.Buffer, args ...Serializable) error {
	for _, arg := range args {
		if err := arg.Set(buf); err != nil {
			return err
		}
	}
	return nil
}

func GetAll(buf *bytes.Buffer, args ...Deserializable) error {
	for _, arg := range args {
		if err := arg.Get(buf); err != nil {
			return err
		}
	}
	return nil
}

func get[T any](buf *bytes.Buffer) (T, error) {
	var v T
	err := binary.Read(buf, binary.LittleEndian, &v)
	return v, err
}

func set[T any](buf *bytes.Buffer, v T) error {
	return binary.Write(buf, binary.LittleEndian, v)
}

func getList[T any, L ~[]T](buf *bytes.Buffer, getItem func(*bytes.Buffer) (T, error)) (L, error) {
	count, err := GetU8(buf)
	if err != nil {
		return nil, err
	}
	list := make([]T, count)
	for i := range list {
		if list[i], err = getItem(buf); err != nil {
			return nil, err
		}
	}
	return L(list), nil
}

func setList[T any](buf *bytes.Buffer, list []T, setItem func(*bytes.Buffer, T) error) error {
	if len(list) > 255 {
		return fmt.Errorf("list length exceeds uint8 max")
	}
	if err := SetU8(buf, uint8(len(list))); err != nil {
		return err
	}
	for _, item := range list {
		if err := setItem(buf, item); err != nil {
			return err
		}
	}
	return nil
}

func GetBit(bits []byte, i uint8) bool {
	if int(i/8) >= len(bits) {
		return false
	}
	return (bits[i/8] & (1 << (i % 8))) != 0
}

func SetBit(bits []byte, i uint8, v bool) {
	if int(i/8) >= len(bits) {
		return
	}
	if v {
		bits[i/8] |= 1 << (i % 8)
	} else {
		bits[i/8] &= ^(uint8(1) << (i % 8))
	}
}

// Bool scalars outside structs occupy one byte; inside structs they live in
// the presence bitmask. Bool lists pack their bits after a u8 count.
type Bool bool

func (v Bool) Set(buf *bytes.Buffer) error { return SetBool(buf, bool(v)) }
func (v *Bool) Get(buf *bytes.Buffer) error {
	val, err := GetBool(buf)
	if err == nil {
		*v = Bool(val)
	}
	return err
}
func GetBool(buf *bytes.Buffer) (bool, error) { b, err := get[uint8](buf); return b == 1, err }
func SetBool(buf *bytes.Buffer, v bool) error {
	val := uint8(0)
	if v {
		val = 1
	}
	return set(buf, val)
}
func EqBool(a, b bool) bool { return a == b }

type BoolList []bool

func (v BoolList) Set(buf *bytes.Buffer) error { return SetBoolList(buf, v) }
func (v *BoolList) Get(buf *bytes.Buffer) error {
	val, err := GetBoolList(buf)
	if err == nil {
		*v = val
	}
	return err
}
func GetBoolList(buf *bytes.Buffer) ([]bool, error) {
	count, err := GetU8(buf)
	if err != nil {
		return nil, err
	}
	bitSize := (int(count) + 7) / 8
	if buf.Len() < bitSize {
		return nil, fmt.Errorf("not enough data")
	}
	bits := buf.Next(bitSize)
	bools := make([]bool, count)
	for i := range bools {
		bools[i] = GetBit(bits, uint8(i))
	}
	return bools, nil
}
func SetBoolList(buf *bytes.Buffer, v []bool) error {
	if len(v) > 255 {
		return fmt.Errorf("list length exceeds uint8 max")
	}
	if err := SetU8(buf, uint8(len(v))); err != nil {
		return err
	}
	bits := make([]byte, (len(v)+7)/8)
	for i, val := range v {
		SetBit(bits, uint8(i), val)
	}
	_, err := buf.Write(bits)
	return err
}
func EqBoolList(a, b []bool) bool { return slices.Equal(a, b) }
"#,
    );

    for t in &NUMERIC_TYPES {
        let (suffix, go) = (t.suffix, t.go);
        out.blank();
        w!(out, "type {suffix} {go}");
        out.blank();
        w!(out, "func (v {suffix}) Set(buf *bytes.Buffer) error {{ return Set{suffix}(buf, {go}(v)) }}");
        w!(out, "func (v *{suffix}) Get(buf *bytes.Buffer) error {{");
        w!(out, "\tval, err := Get{suffix}(buf)");
        w!(out, "\tif err == nil {{");
        w!(out, "\t\t*v = {suffix}(val)");
        w!(out, "\t}}");
        w!(out, "\treturn err");
        w!(out, "}}");
        w!(out, "func Get{suffix}(buf *bytes.Buffer) ({go}, error) {{ return get[{go}](buf) }}");
        w!(out, "func Set{suffix}(buf *bytes.Buffer, v {go}) error {{ return set(buf, v) }}");
        match t.eps {
            Some(eps) => w!(out, "func Eq{suffix}(a, b {go}) bool {{ return math.Abs(float64(a-b)) < {eps} }}"),
            None => w!(out, "func Eq{suffix}(a, b {go}) bool {{ return a == b }}"),
        }
        out.blank();
        w!(out, "type {suffix}List []{go}");
        out.blank();
        w!(out, "func (v {suffix}List) Set(buf *bytes.Buffer) error {{ return Set{suffix}List(buf, v) }}");
        w!(out, "func (v *{suffix}List) Get(buf *bytes.Buffer) error {{");
        w!(out, "\tval, err := Get{suffix}List(buf)");
        w!(out, "\tif err == nil {{");
        w!(out, "\t\t*v = val");
        w!(out, "\t}}");
        w!(out, "\treturn err");
        w!(out, "}}");
        w!(out, "func Get{suffix}List(buf *bytes.Buffer) ([]{go}, error) {{ return getList[{go}, []{go}](buf, Get{suffix}) }}");
        w!(out, "func Set{suffix}List(buf *bytes.Buffer, v []{go}) error {{ return setList(buf, v, Set{suffix}) }}");
        w!(out, "func Eq{suffix}List(a, b []{go}) bool {{ return slices.Equal(a, b) }}");
    }

    out.raw(
        r#"
// Bin and Text share a u16 length prefix; Text adds the UTF-8 convention.
type Bin []byte

func (v Bin) Set(buf *bytes.Buffer) error { return SetBin(buf, []byte(v)) }
func (v *Bin) Get(buf *bytes.Buffer) error {
	val, err := GetBin(buf)
	if err == nil {
		*v = Bin(val)
	}
	return err
}
func GetBin(buf *bytes.Buffer) ([]byte, error) {
	l, err := GetU16(buf)
	if err != nil {
		return nil, err
	}
	if buf.Len() < int(l) {
		return nil, fmt.Errorf("not enough data")
	}
	return buf.Next(int(l)), nil
}
func SetBin(buf *bytes.Buffer, v []byte) error {
	if len(v) > 65535 {
		return fmt.Errorf("length exceeds uint16 max")
	}
	if err := SetU16(buf, uint16(len(v))); err != nil {
		return err
	}
	_, err := buf.Write(v)
	return err
}
func EqBin(a, b []byte) bool { return bytes.Equal(a, b) }

type BinList [][]byte

func (v BinList) Set(buf *bytes.Buffer) error { return setList(buf, v, SetBin) }
func (v *BinList) Get(buf *bytes.Buffer) error {
	val, err := getList[[]byte, [][]byte](buf, GetBin)
	if err == nil {
		*v = val
	}
	return err
}
func EqBinList(a, b [][]byte) bool { return slices.EqualFunc(a, b, bytes.Equal) }

type Text string

func (v Text) Set(buf *bytes.Buffer) error { return SetText(buf, string(v)) }
func (v *Text) Get(buf *bytes.Buffer) error {
	val, err := GetText(buf)
	if err == nil {
		*v = Text(val)
	}
	return err
}
func GetText(buf *bytes.Buffer) (string, error) { b, err := GetBin(buf); return string(b), err }
func SetText(buf *bytes.Buffer, v string) error { return SetBin(buf, []byte(v)) }
func EqText(a, b string) bool { return a == b }

type TextList []string

func (v TextList) Set(buf *bytes.Buffer) error { return setList(buf, v, SetText) }
func (v *TextList) Get(buf *bytes.Buffer) error {
	val, err := getList[string, []string](buf, GetText)
	if err == nil {
		*v = val
	}
	return err
}
func EqTextList(a, b []string) bool { return slices.Equal(a, b) }
"#,
    );

    out.finish()
}

// ── enum.go ──────────────────────────────────────────────────────────────────

fn enums(enums: &[Enum], opts: &GoOptions) -> String {
    let mut out = CodeWriter::new();
    w!(out, "package {}", opts.package);
    out.blank();
    out.raw("import (\n\t\"bytes\"\n\t\"slices\"\n)\n");

    for e in enums {
        let p = pascal_case(&e.name);
        out.blank();
        if e.note.is_empty() {
            w!(out, "// {p} has u8 wire representation.");
        } else {
            w!(out, "// {p} {}", e.note);
        }
        w!(out, "type {p} uint8");
        out.blank();
        out.line("const (");
        for child in &e.children {
            let line = format!("{p}{} {p} = {}", pascal_case(&child.name), child.id);
            if child.note.is_empty() {
                w!(out, "\t{line}");
            } else {
                w!(out, "\t{line} // {}", child.note);
            }
        }
        out.line(")");
        out.blank();
        w!(out, "type {p}List []{p}");
        out.blank();
        w!(out, "func (v {p}List) Set(buf *bytes.Buffer) error {{");
        out.line("\traw := make([]uint8, len(v))");
        out.line("\tfor i, e := range v {");
        out.line("\t\traw[i] = uint8(e)");
        out.line("\t}");
        out.line("\treturn SetU8List(buf, raw)");
        out.line("}");
        w!(out, "func (v *{p}List) Get(buf *bytes.Buffer) error {{");
        out.line("\traw, err := GetU8List(buf)");
        out.line("\tif err != nil {");
        out.line("\t\treturn err");
        out.line("\t}");
        w!(out, "\tlist := make({p}List, len(raw))");
        out.line("\tfor i, b := range raw {");
        w!(out, "\t\tlist[i] = {p}(b)");
        out.line("\t}");
        out.line("\t*v = list");
        out.line("\treturn nil");
        out.line("}");
        w!(out, "func (v {p}List) Eq(other {p}List) bool {{ return slices.Equal(v, other) }}");
    }

    out.finish()
}

// ── struct_<name>.go ─────────────────────────────────────────────────────────

fn struct_file(s: &Struct, opts: &GoOptions) -> Result<String, CodegenError> {
    let p = pascal_case(&s.name);
    let mut out = CodeWriter::new();
    w!(out, "package {}", opts.package);
    out.blank();
    out.raw("import (\n\t\"bytes\"\n\t\"fmt\"\n\t\"math\"\n\t\"slices\"\n)\n");
    out.blank();

    if !s.note.is_empty() {
        w!(out, "// {p} {}", s.note);
    }
    w!(out, "type {p} struct {{");
    for field in &s.fields {
        let mut line = format!("\t{} {}", pascal_case(&field.name), go_type(&field.ty)?);
        if let Some(tag) = struct_tag(field, opts) {
            line.push(' ');
            line.push_str(&tag);
        }
        if !field.note.is_empty() {
            line.push_str(&format!(" // {}", field.note));
        }
        out.line(&line);
    }
    out.line("}");

    emit_get(&mut out, s, &p)?;
    emit_set(&mut out, s, &p)?;
    emit_eq(&mut out, s, &p)?;

    out.blank();
    out.line("// Standalone functions for SetAll/GetAll positions.");
    w!(out, "func Get{p}(buf *bytes.Buffer) (*{p}, error) {{");
    w!(out, "\ts := new({p})");
    out.line("\treturn s, s.Get(buf)");
    out.line("}");
    w!(out, "func Set{p}(buf *bytes.Buffer, s *{p}) error {{ return s.Set(buf) }}");
    w!(out, "func Eq{p}(a, b *{p}) bool {{ return a.Eq(b) }}");
    out.blank();
    w!(out, "type {p}List []*{p}");
    out.blank();
    w!(out, "func (v {p}List) Set(buf *bytes.Buffer) error {{ return setList(buf, v, Set{p}) }}");
    w!(out, "func (v *{p}List) Get(buf *bytes.Buffer) error {{");
    w!(out, "\tval, err := getList[*{p}, {p}List](buf, Get{p})");
    out.line("\tif err == nil {");
    out.line("\t\t*v = val");
    out.line("\t}");
    out.line("\treturn err");
    out.line("}");
    w!(out, "func (v {p}List) Eq(other {p}List) bool {{ return slices.EqualFunc(v, other, Eq{p}) }}");

    Ok(out.finish())
}

fn struct_tag(field: &StructField, opts: &GoOptions) -> Option<String> {
    if opts.tags.is_empty() {
        return None;
    }
    let value = if field.tag.is_empty() {
        snake_case(&field.name)
    } else {
        field.tag.clone()
    };
    let parts: Vec<String> = opts
        .tags
        .iter()
        .map(|key| format!("{}:\"{value}\"", key.trim()))
        .collect();
    Some(format!("`{}`", parts.join(" ")))
}

fn emit_get(out: &mut CodeWriter, s: &Struct, p: &str) -> Result<(), CodegenError> {
    out.blank();
    w!(out, "func (s *{p}) Get(buf *bytes.Buffer) error {{");
    w!(out, "\tbitSize := int(math.Ceil(float64({}) / 8.0))", s.fields.len());
    out.line("\tif buf.Len() < bitSize {");
    w!(out, "\t\treturn fmt.Errorf(\"Get{p} bitmask: %d < %d\", buf.Len(), bitSize)");
    out.line("\t}");
    out.line("\tbits := buf.Next(bitSize)");

    for (i, field) in s.fields.iter().enumerate() {
        let f = pascal_case(&field.name);
        let ty = &field.ty;
        if ty.is_bool() {
            w!(out, "\ts.{f} = GetBit(bits, uint8({i}))");
            continue;
        }
        w!(out, "\tif GetBit(bits, uint8({i})) {{");
        match (ty.kind, ty.is_list) {
            (TypeKind::Base, _) => {
                let suffix = wire_suffix(&ty.name);
                let call = if ty.is_list {
                    format!("Get{suffix}List")
                } else {
                    format!("Get{suffix}")
                };
                w!(out, "\t\tval, err := {call}(buf)");
                out.line("\t\tif err != nil {");
                w!(out, "\t\t\treturn fmt.Errorf(\"Get{p} {f}: %w\", err)");
                out.line("\t\t}");
                w!(out, "\t\ts.{f} = val");
            }
            (TypeKind::Enum, false) => {
                let ep = pascal_case(&ty.name);
                out.line("\t\tval, err := GetU8(buf)");
                out.line("\t\tif err != nil {");
                w!(out, "\t\t\treturn fmt.Errorf(\"Get{p} {f}: %w\", err)");
                out.line("\t\t}");
                w!(out, "\t\ts.{f} = {ep}(val)");
            }
            (TypeKind::Enum, true) => {
                let ep = pascal_case(&ty.name);
                out.line("\t\traw, err := GetU8List(buf)");
                out.line("\t\tif err != nil {");
                w!(out, "\t\t\treturn fmt.Errorf(\"Get{p} {f}: %w\", err)");
                out.line("\t\t}");
                w!(out, "\t\tlist := make([]{ep}, len(raw))");
                out.line("\t\tfor j, b := range raw {");
                w!(out, "\t\t\tlist[j] = {ep}(b)");
                out.line("\t\t}");
                w!(out, "\t\ts.{f} = list");
            }
            (TypeKind::Struct, false) => {
                let sp = pascal_case(&ty.name);
                w!(out, "\t\tif s.{f} == nil {{");
                w!(out, "\t\t\ts.{f} = new({sp})");
                out.line("\t\t}");
                w!(out, "\t\tif err := s.{f}.Get(buf); err != nil {{");
                w!(out, "\t\t\treturn fmt.Errorf(\"Get{p} {f}: %w\", err)");
                out.line("\t\t}");
            }
            (TypeKind::Struct, true) => {
                let sp = pascal_case(&ty.name);
                w!(out, "\t\tvar val {sp}List");
                out.line("\t\tif err := val.Get(buf); err != nil {");
                w!(out, "\t\t\treturn fmt.Errorf(\"Get{p} {f}: %w\", err)");
                out.line("\t\t}");
                w!(out, "\t\ts.{f} = val");
            }
        }
        out.line("\t}");
    }
    out.line("\treturn nil");
    out.line("}");
    Ok(())
}

fn emit_set(out: &mut CodeWriter, s: &Struct, p: &str) -> Result<(), CodegenError> {
    out.blank();
    w!(out, "func (s *{p}) Set(buf *bytes.Buffer) error {{");
    out.line("\tif s == nil {");
    out.line("\t\treturn nil");
    out.line("\t}");
    w!(out, "\tbits := make([]byte, int(math.Ceil(float64({})/8.0)))", s.fields.len());
    out.line("\tbody := bytes.NewBuffer(nil)");

    for (i, field) in s.fields.iter().enumerate() {
        let f = pascal_case(&field.name);
        let ty = &field.ty;
        if ty.is_bool() {
            w!(out, "\tSetBit(bits, uint8({i}), s.{f})");
            continue;
        }

        let (present, write): (String, String) = match (ty.kind, ty.is_list) {
            (TypeKind::Base, true) => (
                format!("len(s.{f}) > 0"),
                format!("Set{}List(body, s.{f})", wire_suffix(&ty.name)),
            ),
            (TypeKind::Base, false) => {
                let zero = match ty.name.as_str() {
                    "text" => "\"\"",
                    "bin" => "nil",
                    _ => "0",
                };
                (
                    format!("s.{f} != {zero}"),
                    format!("Set{}(body, s.{f})", wire_suffix(&ty.name)),
                )
            }
            (TypeKind::Enum, false) => (
                format!("s.{f} != 0"),
                format!("SetU8(body, uint8(s.{f}))"),
            ),
            (TypeKind::Enum, true) => (format!("len(s.{f}) > 0"), String::new()),
            (TypeKind::Struct, false) => (format!("s.{f} != nil"), format!("s.{f}.Set(body)")),
            (TypeKind::Struct, true) => (
                format!("len(s.{f}) > 0"),
                format!("{}List(s.{f}).Set(body)", pascal_case(&ty.name)),
            ),
        };

        w!(out, "\tif {present} {{");
        if ty.kind == TypeKind::Enum && ty.is_list {
            w!(out, "\t\traw := make([]uint8, len(s.{f}))");
            w!(out, "\t\tfor j, v := range s.{f} {{");
            out.line("\t\t\traw[j] = uint8(v)");
            out.line("\t\t}");
            out.line("\t\tif err := SetU8List(body, raw); err != nil {");
        } else {
            w!(out, "\t\tif err := {write}; err != nil {{");
        }
        w!(out, "\t\t\treturn fmt.Errorf(\"Set{p} {f}: %w\", err)");
        out.line("\t\t}");
        w!(out, "\t\tSetBit(bits, uint8({i}), true)");
        out.line("\t}");
    }

    out.line("\tif _, err := buf.Write(bits); err != nil {");
    w!(out, "\t\treturn fmt.Errorf(\"Set{p} write bitmask: %w\", err)");
    out.line("\t}");
    out.line("\t_, err := body.WriteTo(buf)");
    out.line("\treturn err");
    out.line("}");
    Ok(())
}

fn emit_eq(out: &mut CodeWriter, s: &Struct, p: &str) -> Result<(), CodegenError> {
    out.blank();
    w!(out, "func (s *{p}) Eq(other *{p}) bool {{");
    out.line("\tif s == other {");
    out.line("\t\treturn true");
    out.line("\t}");
    out.line("\tif s == nil || other == nil {");
    out.line("\t\treturn false");
    out.line("\t}");
    for field in &s.fields {
        let f = pascal_case(&field.name);
        let ty = &field.ty;
        let check = match (ty.kind, ty.is_list) {
            (TypeKind::Base, false) => format!("!Eq{}(s.{f}, other.{f})", wire_suffix(&ty.name)),
            (TypeKind::Base, true) => {
                format!("!Eq{}List(s.{f}, other.{f})", wire_suffix(&ty.name))
            }
            (TypeKind::Enum, false) => format!("s.{f} != other.{f}"),
            (TypeKind::Enum, true) => format!("!slices.Equal(s.{f}, other.{f})"),
            (TypeKind::Struct, false) => format!("!s.{f}.Eq(other.{f})"),
            (TypeKind::Struct, true) => {
                let sp = pascal_case(&ty.name);
                format!("!{sp}List(s.{f}).Eq({sp}List(other.{f}))")
            }
        };
        w!(out, "\tif {check} {{");
        out.line("\t\treturn false");
        out.line("\t}");
    }
    out.line("\treturn true");
    out.line("}");
    Ok(())
}

// ── rpc.go ───────────────────────────────────────────────────────────────────

fn rpc_client(schema: &Schema, opts: &GoOptions) -> Result<String, CodegenError> {
    let mut out = CodeWriter::new();
    w!(out, "package {}", opts.package);
    out.blank();
    out.raw(
        r#"import (
	"bytes"
	"context"
	"io"
	"net/http"
	"time"
)

type RpcErrCode int

const (
	RpcOk       RpcErrCode = 200
	RpcNoConn   RpcErrCode = 0
	RpcTimeout  RpcErrCode = 408
	RpcReqErr   RpcErrCode = 400
	RpcRespErr  RpcErrCode = 500
	RpcNotAuth  RpcErrCode = 401
	RpcNotExist RpcErrCode = 404
)

type Client struct {
	BaseURL string
	HTTP    *http.Client
	Timeout time.Duration
	Retries int
	headers map[string]string
}

func NewClient(baseURL string) *Client {
	return &Client{
		BaseURL: baseURL,
		HTTP:    &http.Client{Timeout: 5 * time.Second},
		Timeout: 5 * time.Second,
		Retries: 3,
		headers: make(map[string]string),
	}
}

func (c *Client) SetHeader(key, value string) { c.headers[key] = value }
func (c *Client) GetHeader(key string) string { return c.headers[key] }
func (c *Client) RemoveHeader(key string)     { delete(c.headers, key) }

func (c *Client) SetAuthorization(token string) { c.SetHeader("Authorization", "Bearer "+token) }
func (c *Client) GetAuthorization() string      { return c.GetHeader("Authorization") }
func (c *Client) RemoveAuthorization()          { c.RemoveHeader("Authorization") }
func (c *Client) IsAuthorized() bool            { return c.GetAuthorization() != "" }

func isTimeout(err error) bool {
	if err == nil {
		return false
	}
	if err == context.DeadlineExceeded {
		return true
	}
	if netErr, ok := err.(interface{ Timeout() bool }); ok && netErr.Timeout() {
		return true
	}
	return false
}

// do POSTs body and retries timeouts with linear backoff, honoring ctx.
func (c *Client) do(ctx context.Context, path string, body []byte) ([]byte, RpcErrCode) {
	var resp *http.Response
	var err error

	for i := 0; i <= c.Retries; i++ {
		if i > 0 {
			timer := time.NewTimer(time.Duration(i) * time.Second)
			select {
			case <-ctx.Done():
				timer.Stop()
				return nil, RpcTimeout
			case <-timer.C:
			}
		}

		req, reqErr := http.NewRequestWithContext(ctx, "POST", c.BaseURL+path, bytes.NewReader(body))
		if reqErr != nil {
			return nil, RpcNoConn
		}
		for k, v := range c.headers {
			req.Header.Set(k, v)
		}

		resp, err = c.HTTP.Do(req)
		if err != nil {
			if i < c.Retries {
				continue
			}
			if isTimeout(err) {
				return nil, RpcTimeout
			}
			return nil, RpcNoConn
		}

		if resp.StatusCode == http.StatusRequestTimeout && i < c.Retries {
			resp.Body.Close()
			continue
		}
		break
	}
	defer resp.Body.Close()

	if resp.StatusCode != http.StatusOK {
		return nil, RpcErrCode(resp.StatusCode)
	}

	b, _ := io.ReadAll(resp.Body)
	return b, RpcOk
}
"#,
    );

    for api in &schema.apis {
        emit_client_method(&mut out, api)?;
    }
    Ok(out.finish())
}

fn emit_client_method(out: &mut CodeWriter, api: &Api) -> Result<(), CodegenError> {
    let method = pascal_case(&api.name);
    let has_result = !api.result.is_nil();

    let mut params = String::from("ctx context.Context");
    for arg in &api.args {
        params.push_str(&format!(", {} {}", arg.name, go_type(&arg.ty)?));
    }
    let returns = if has_result {
        format!("(result {}, errCode RpcErrCode)", go_type(&api.result)?)
    } else {
        "(errCode RpcErrCode)".to_string()
    };

    out.blank();
    if api.note.is_empty() {
        w!(out, "// {method} calls {}.", api.path());
    } else {
        w!(out, "// {method} {}", api.note);
    }
    w!(out, "func (c *Client) {method}({params}) {returns} {{");

    let conv = if has_result {
        from_wire(&api.result, "res")?
    } else {
        String::new()
    };
    if has_result {
        w!(out, "\tvar res {}", rpc_wire_type(&api.result));
    }
    out.line("\tvar buf bytes.Buffer");
    if !api.args.is_empty() {
        let wire_args: Vec<String> = api
            .args
            .iter()
            .map(|a| to_wire(&a.ty, &a.name))
            .collect();
        w!(out, "\tif err := SetAll(&buf, {}); err != nil {{", wire_args.join(", "));
        if has_result {
            w!(out, "\t\treturn {conv}, RpcReqErr");
        } else {
            out.line("\t\treturn RpcReqErr");
        }
        out.line("\t}");
    }
    out.blank();
    if has_result {
        w!(out, "\tbody, status := c.do(ctx, \"{}\", buf.Bytes())", api.path());
        out.line("\tif status != RpcOk {");
        w!(out, "\t\treturn {conv}, status");
        out.line("\t}");
        out.blank();
        out.line("\tif err := GetAll(bytes.NewBuffer(body), &res); err != nil {");
        w!(out, "\t\treturn {conv}, RpcRespErr");
        out.line("\t}");
        w!(out, "\treturn {conv}, status");
    } else {
        w!(out, "\t_, status := c.do(ctx, \"{}\", buf.Bytes())", api.path());
        out.line("\treturn status");
    }
    out.line("}");
    Ok(())
}

// ── api._.go ─────────────────────────────────────────────────────────────────

fn api_surface(schema: &Schema, opts: &GoOptions) -> Result<String, CodegenError> {
    let mut out = CodeWriter::new();
    w!(out, "package {}", opts.package);
    out.blank();
    out.raw("import (\n\t\"bytes\"\n\t\"io\"\n\t\"net/http\"\n)\n");
    out.blank();
    out.line("// --- API handlers ---");

    for api in &schema.apis {
        emit_handler(&mut out, api)?;
    }

    out.blank();
    out.line("// --- Route registration ---");
    out.blank();
    out.raw(
        r#"type Middleware func(http.HandlerFunc) http.HandlerFunc

func composeMiddleware(mws ...Middleware) func(http.HandlerFunc) http.HandlerFunc {
	return func(h http.HandlerFunc) http.HandlerFunc {
		for i := len(mws) - 1; i >= 0; i-- {
			h = mws[i](h)
		}
		return h
	}
}
"#,
    );

    for (module, apis) in schema.apis_by_module() {
        out.blank();
        w!(out, "func Register{}(mux *http.ServeMux, mws ...Middleware) {{", pascal_case(module));
        out.line("\tmw := composeMiddleware(mws...)");
        for api in apis {
            w!(out, "\tmux.HandleFunc(\"POST {}\", mw({}Handler))", api.path(), pascal_case(&api.name));
        }
        out.line("}");
    }

    out.blank();
    out.line("// --- Internal helpers ---");
    out.blank();
    out.raw(
        r#"func checkStatus(w http.ResponseWriter, status RpcErrCode) bool {
	if status == RpcOk {
		return true
	}
	w.WriteHeader(int(status))
	return false
}

func parseRequest(w http.ResponseWriter, r *http.Request, args ...Deserializable) bool {
	if len(args) == 0 {
		return true
	}
	body, err := io.ReadAll(r.Body)
	if err != nil {
		w.WriteHeader(http.StatusBadRequest)
		return false
	}
	if err := GetAll(bytes.NewBuffer(body), args...); err != nil {
		w.WriteHeader(http.StatusBadRequest)
		return false
	}
	return true
}

func sendResponse(w http.ResponseWriter, result Serializable) {
	var buf bytes.Buffer
	if err := SetAll(&buf, result); err != nil {
		w.WriteHeader(http.StatusInternalServerError)
		return
	}
	w.Write(buf.Bytes())
}
"#,
    );

    Ok(out.finish())
}

fn emit_handler(out: &mut CodeWriter, api: &Api) -> Result<(), CodegenError> {
    let p = pascal_case(&api.name);
    let logic = snake_case(&api.name);
    let has_result = !api.result.is_nil();

    out.blank();
    w!(out, "func {p}Handler(w http.ResponseWriter, r *http.Request) {{");
    for arg in &api.args {
        w!(out, "\tvar {} {}", arg.name, rpc_wire_type(&arg.ty));
    }
    out.blank();
    if api.args.is_empty() {
        out.line("\tif !parseRequest(w, r) {");
    } else {
        let refs: Vec<String> = api.args.iter().map(|a| format!("&{}", a.name)).collect();
        w!(out, "\tif !parseRequest(w, r, {}) {{", refs.join(", "));
    }
    out.line("\t\treturn");
    out.line("\t}");
    out.blank();

    let mut call_args = String::from("r.Context()");
    for arg in &api.args {
        call_args.push_str(&format!(", {}", from_wire(&arg.ty, &arg.name)?));
    }
    if has_result {
        w!(out, "\tresult, status := {logic}({call_args})");
    } else {
        w!(out, "\tstatus := {logic}({call_args})");
    }
    out.line("\tif !checkStatus(w, status) {");
    out.line("\t\treturn");
    out.line("\t}");
    if has_result {
        w!(out, "\tsendResponse(w, {})", to_wire(&api.result, "result"));
    } else {
        out.line("\tw.WriteHeader(http.StatusOK)");
    }
    out.line("}");
    Ok(())
}

// ── api.<name>.go logic stub ─────────────────────────────────────────────────

fn logic_stub(api: &Api, opts: &GoOptions) -> Result<String, CodegenError> {
    let logic = snake_case(&api.name);
    let has_result = !api.result.is_nil();

    let mut out = CodeWriter::new();
    w!(out, "package {}", opts.package);
    out.blank();
    out.line("import \"context\"");
    out.blank();
    if api.note.is_empty() {
        w!(out, "// {logic} implements {}.", api.name);
    } else {
        w!(out, "// {logic} {}", api.note);
    }

    let mut params = String::from("ctx context.Context");
    for arg in &api.args {
        params.push_str(&format!(", {} {}", arg.name, go_type(&arg.ty)?));
    }
    if has_result {
        w!(out, "func {logic}({params}) ({}, RpcErrCode) {{", go_type(&api.result)?);
        w!(out, "\t// TODO: implement {}", api.name);
        w!(out, "\tvar result {}", go_type(&api.result)?);
        out.line("\treturn result, RpcOk");
    } else {
        w!(out, "func {logic}({params}) RpcErrCode {{");
        w!(out, "\t// TODO: implement {}", api.name);
        out.line("\treturn RpcOk");
    }
    out.line("}");
    Ok(out.finish())
}
