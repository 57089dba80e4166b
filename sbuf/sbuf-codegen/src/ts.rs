//! TypeScript binding generator.
//!
//! Emits `type.ts` (DataView-based little-endian runtime), `enum.ts`, one
//! file per struct, the fetch-based RPC client (`rpc.ts`), and the `_.ts`
//! re-export index.

use std::collections::BTreeSet;

use sbuf_core::{Api, Enum, Schema, Struct, Type, TypeKind};

use crate::naming::{camel_case, pascal_case, snake_case};
use crate::writer::{CodeWriter, w};
use crate::{CodegenError, GeneratedFile};

pub fn generate_ts(schema: &Schema) -> Result<Vec<GeneratedFile>, CodegenError> {
    let mut files = vec![GeneratedFile::new("type.ts", RUNTIME.to_string())];
    if !schema.enums.is_empty() {
        files.push(GeneratedFile::new("enum.ts", enums(&schema.enums)));
    }
    let mut struct_files = Vec::new();
    for s in &schema.structs {
        let name = format!("struct_{}.ts", snake_case(&s.name));
        files.push(GeneratedFile::new(name.clone(), struct_file(s, schema)?));
        struct_files.push(name);
    }
    if !schema.apis.is_empty() {
        files.push(GeneratedFile::new("rpc.ts", rpc_client(schema)?));
    }
    files.push(GeneratedFile::new(
        "_.ts",
        index(schema, &struct_files),
    ));
    Ok(files)
}

// ── type mapping ─────────────────────────────────────────────────────────────

fn ts_base(name: &str) -> Result<&'static str, CodegenError> {
    Ok(match name {
        "i8" | "u8" | "i16" | "u16" | "i32" | "u32" | "f32" | "f64" => "number",
        "i64" | "u64" => "bigint",
        "bool" => "boolean",
        "text" => "string",
        "bin" => "Uint8Array",
        other => {
            return Err(CodegenError::UnknownBaseType {
                name: other.to_string(),
                target: "ts",
            });
        }
    })
}

fn ts_type(ty: &Type) -> Result<String, CodegenError> {
    let scalar = match ty.kind {
        TypeKind::Base => ts_base(&ty.name)?.to_string(),
        TypeKind::Enum => pascal_case(&ty.name),
        TypeKind::Struct => {
            if ty.is_list {
                pascal_case(&ty.name)
            } else {
                format!("{} | null", pascal_case(&ty.name))
            }
        }
    };
    Ok(if ty.is_list {
        format!("{scalar}[]")
    } else {
        scalar
    })
}

/// Zero/default expression for a field or an error-path return.
fn ts_zero(ty: &Type) -> Result<String, CodegenError> {
    if ty.is_list {
        return Ok("[]".to_string());
    }
    Ok(match ty.kind {
        TypeKind::Struct => "null".to_string(),
        TypeKind::Enum => format!("0 as {}", pascal_case(&ty.name)),
        TypeKind::Base => match ts_base(&ty.name)? {
            "number" => "0".to_string(),
            "bigint" => "0n".to_string(),
            "boolean" => "false".to_string(),
            "string" => "\"\"".to_string(),
            "Uint8Array" => "new Uint8Array(0)".to_string(),
            _ => "null".to_string(),
        },
    })
}

/// `w.<expr>` writing one scalar of this type.
fn write_scalar(ty: &Type, writer: &str, expr: &str) -> String {
    match ty.kind {
        TypeKind::Base => format!("{writer}.{}({expr})", ty.name),
        TypeKind::Enum => format!("{writer}.u8({expr})"),
        TypeKind::Struct => format!("set{}({writer}, {expr})", pascal_case(&ty.name)),
    }
}

/// Expression reading one scalar of this type from reader `r`.
fn read_scalar(ty: &Type, reader: &str) -> String {
    match ty.kind {
        TypeKind::Base => format!("{reader}.{}()", ty.name),
        TypeKind::Enum => format!("{reader}.u8() as {}", pascal_case(&ty.name)),
        TypeKind::Struct => format!("get{}({reader})", pascal_case(&ty.name)),
    }
}

fn write_value(ty: &Type, writer: &str, expr: &str) -> String {
    if !ty.is_list {
        return write_scalar(ty, writer, expr);
    }
    if ty.kind == TypeKind::Base && ty.name == "bool" {
        return format!("wire.writeBoolList({writer}, {expr})");
    }
    let elem = scalar_of(ty);
    match elem.kind {
        TypeKind::Struct => format!(
            "wire.writeList({writer}, {expr}, set{})",
            pascal_case(&ty.name)
        ),
        _ => format!(
            "wire.writeList({writer}, {expr}, (w, v) => {})",
            write_scalar(&elem, "w", "v")
        ),
    }
}

fn read_value(ty: &Type, reader: &str) -> String {
    if !ty.is_list {
        return read_scalar(ty, reader);
    }
    if ty.kind == TypeKind::Base && ty.name == "bool" {
        return format!("wire.readBoolList({reader})");
    }
    let elem = scalar_of(ty);
    match elem.kind {
        TypeKind::Struct => format!("wire.readList({reader}, get{})", pascal_case(&ty.name)),
        _ => format!(
            "wire.readList({reader}, (r) => {})",
            read_scalar(&elem, "r")
        ),
    }
}

fn scalar_of(ty: &Type) -> Type {
    Type {
        name: ty.name.clone(),
        is_list: false,
        kind: ty.kind,
    }
}

/// `true` once a value of this type is present on the wire.
fn presence(ty: &Type, expr: &str) -> Result<String, CodegenError> {
    if ty.is_list {
        return Ok(format!("{expr}.length > 0"));
    }
    Ok(match ty.kind {
        TypeKind::Struct => format!("{expr} !== null"),
        TypeKind::Enum => format!("{expr} !== 0"),
        TypeKind::Base => match ty.name.as_str() {
            "text" => format!("{expr} !== \"\""),
            "bin" => format!("{expr}.length > 0"),
            "i64" | "u64" => format!("{expr} !== 0n"),
            _ => format!("{expr} !== 0"),
        },
    })
}

// ── enum.ts ──────────────────────────────────────────────────────────────────

fn enums(enums: &[Enum]) -> String {
    let mut out = CodeWriter::new();
    for (i, e) in enums.iter().enumerate() {
        if i > 0 {
            out.blank();
        }
        let p = pascal_case(&e.name);
        if !e.note.is_empty() {
            w!(out, "// {p} {}", e.note);
        }
        w!(out, "export enum {p} {{");
        for child in &e.children {
            let mut line = format!("{} = {},", pascal_case(&child.name), child.id);
            if !child.note.is_empty() {
                line.push_str(&format!(" // {}", child.note));
            }
            w!(out, "  {line}");
        }
        out.line("}");
    }
    out.finish()
}

// ── struct_<name>.ts ─────────────────────────────────────────────────────────

fn struct_file(s: &Struct, schema: &Schema) -> Result<String, CodegenError> {
    let p = pascal_case(&s.name);
    let mut out = CodeWriter::new();
    out.line("import * as wire from \"./type\";");
    emit_type_imports(&mut out, s.fields.iter().map(|f| &f.ty), Some(&s.name), schema);
    out.blank();

    if !s.note.is_empty() {
        w!(out, "// {p} {}", s.note);
    }
    w!(out, "export interface {p} {{");
    for field in &s.fields {
        w!(out, "  {}: {};", camel_case(&field.name), ts_type(&field.ty)?);
    }
    out.line("}");
    out.blank();

    w!(out, "export function new{p}(): {p} {{");
    out.line("  return {");
    for field in &s.fields {
        w!(out, "    {}: {},", camel_case(&field.name), ts_zero(&field.ty)?);
    }
    out.line("  };");
    out.line("}");
    out.blank();

    // Encoder: mask first, body second, mirroring the wire layout.
    w!(out, "export function set{p}(w: wire.ByteWriter, s: {p}): void {{");
    w!(out, "  const bits = new Uint8Array(wire.bitsLen({}));", s.fields.len());
    out.line("  const body = new wire.ByteWriter();");
    for (i, field) in s.fields.iter().enumerate() {
        let f = format!("s.{}", camel_case(&field.name));
        if field.ty.is_bool() {
            w!(out, "  wire.setBit(bits, {i}, {f});");
            continue;
        }
        w!(out, "  if ({}) {{", presence(&field.ty, &f)?);
        w!(out, "    {};", write_value(&field.ty, "body", &f));
        w!(out, "    wire.setBit(bits, {i}, true);");
        out.line("  }");
    }
    out.line("  w.raw(bits);");
    out.line("  w.concat(body);");
    out.line("}");
    out.blank();

    w!(out, "export function get{p}(r: wire.ByteReader): {p} {{");
    w!(out, "  const s = new{p}();");
    w!(out, "  const bits = r.take(wire.bitsLen({}));", s.fields.len());
    for (i, field) in s.fields.iter().enumerate() {
        let f = camel_case(&field.name);
        if field.ty.is_bool() {
            w!(out, "  s.{f} = wire.getBit(bits, {i});");
            continue;
        }
        w!(out, "  if (wire.getBit(bits, {i})) {{");
        w!(out, "    s.{f} = {};", read_value(&field.ty, "r"));
        out.line("  }");
    }
    out.line("  return s;");
    out.line("}");
    out.blank();

    w!(out, "export function eq{p}(a: {p}, b: {p}): boolean {{");
    for field in &s.fields {
        let fa = format!("a.{}", camel_case(&field.name));
        let fb = format!("b.{}", camel_case(&field.name));
        let check = eq_check(&field.ty, &fa, &fb);
        w!(out, "  if (!({check})) {{");
        out.line("    return false;");
        out.line("  }");
    }
    out.line("  return true;");
    out.line("}");

    Ok(out.finish())
}

fn eq_check(ty: &Type, a: &str, b: &str) -> String {
    if ty.is_list {
        let elem = scalar_of(ty);
        return match elem.kind {
            TypeKind::Struct => format!("wire.eqList({a}, {b}, eq{})", pascal_case(&ty.name)),
            TypeKind::Base if elem.name == "bin" => {
                format!("wire.eqList({a}, {b}, wire.eqBytes)")
            }
            _ => format!("wire.eqList({a}, {b}, (x, y) => x === y)"),
        };
    }
    match ty.kind {
        TypeKind::Struct => {
            let eq = format!("eq{}", pascal_case(&ty.name));
            format!("{a} === {b} || ({a} !== null && {b} !== null && {eq}({a}, {b}))")
        }
        TypeKind::Base if ty.name == "bin" => format!("wire.eqBytes({a}, {b})"),
        _ => format!("{a} === {b}"),
    }
}

/// Imports for enum and struct types referenced by `types`, skipping `own`.
fn emit_type_imports<'a>(
    out: &mut CodeWriter,
    types: impl Iterator<Item = &'a Type>,
    own: Option<&str>,
    schema: &Schema,
) {
    let mut enum_names = BTreeSet::new();
    let mut struct_names = BTreeSet::new();
    for ty in types {
        match ty.kind {
            TypeKind::Enum => {
                enum_names.insert(ty.name.clone());
            }
            TypeKind::Struct if Some(ty.name.as_str()) != own => {
                struct_names.insert(ty.name.clone());
            }
            _ => {}
        }
    }
    if !enum_names.is_empty() {
        let list: Vec<String> = enum_names.iter().map(|n| pascal_case(n)).collect();
        w!(out, "import {{ {} }} from \"./enum\";", list.join(", "));
    }
    for name in struct_names {
        let p = pascal_case(&name);
        let exists = schema.find_struct(&name).is_some();
        if exists {
            w!(
                out,
                "import {{ {p}, eq{p}, get{p}, new{p}, set{p} }} from \"./struct_{}\";",
                snake_case(&name)
            );
        }
    }
}

// ── rpc.ts ───────────────────────────────────────────────────────────────────

fn rpc_client(schema: &Schema) -> Result<String, CodegenError> {
    let mut out = CodeWriter::new();
    out.line("import * as wire from \"./type\";");
    let api_types = schema
        .apis
        .iter()
        .flat_map(|api| api.args.iter().map(|a| &a.ty).chain([&api.result]));
    emit_type_imports(&mut out, api_types, None, schema);
    out.blank();
    out.raw(
        r#"export enum RpcErrCode {
  Ok = 200,
  NoConn = 0,
  Timeout = 408,
  ReqErr = 400,
  RespErr = 500,
  NotAuth = 401,
  NotExist = 404,
}

const sleep = (ms: number) => new Promise((resolve) => setTimeout(resolve, ms));

export class Client {
  headers: Record<string, string> = {};
  retries = 3;
  timeoutMs = 5000;

  constructor(public baseURL: string) {}

  setHeader(key: string, value: string): void {
    this.headers[key] = value;
  }

  getHeader(key: string): string {
    return this.headers[key] ?? "";
  }

  removeHeader(key: string): void {
    delete this.headers[key];
  }

  setAuthorization(token: string): void {
    this.setHeader("Authorization", `Bearer ${token}`);
  }

  getAuthorization(): string {
    return this.getHeader("Authorization");
  }

  removeAuthorization(): void {
    this.removeHeader("Authorization");
  }

  isAuthorized(): boolean {
    return this.getAuthorization() !== "";
  }

  // Retries timeouts (transport or HTTP 408) with linear backoff.
  private async do(path: string, body: Uint8Array): Promise<[Uint8Array, RpcErrCode]> {
    for (let i = 0; i <= this.retries; i++) {
      if (i > 0) {
        await sleep(i * 1000);
      }
      const controller = new AbortController();
      const timer = setTimeout(() => controller.abort(), this.timeoutMs);
      try {
        const resp = await fetch(this.baseURL + path, {
          method: "POST",
          headers: this.headers,
          body,
          signal: controller.signal,
        });
        clearTimeout(timer);
        if (resp.status === 408 && i < this.retries) {
          continue;
        }
        if (resp.status !== 200) {
          return [new Uint8Array(0), resp.status as RpcErrCode];
        }
        return [new Uint8Array(await resp.arrayBuffer()), RpcErrCode.Ok];
      } catch {
        clearTimeout(timer);
        if (i < this.retries) {
          continue;
        }
        const code = controller.signal.aborted ? RpcErrCode.Timeout : RpcErrCode.NoConn;
        return [new Uint8Array(0), code];
      }
    }
    return [new Uint8Array(0), RpcErrCode.NoConn];
  }
"#,
    );

    for api in &schema.apis {
        emit_client_method(&mut out, api)?;
    }
    out.line("}");
    Ok(out.finish())
}

fn emit_client_method(out: &mut CodeWriter, api: &Api) -> Result<(), CodegenError> {
    let method = camel_case(&api.name);
    let has_result = !api.result.is_nil();

    let mut params = Vec::new();
    for arg in &api.args {
        // Arguments are always written, so struct args are non-nullable.
        let ty = if arg.ty.kind == TypeKind::Struct && !arg.ty.is_list {
            pascal_case(&arg.ty.name)
        } else {
            ts_type(&arg.ty)?
        };
        params.push(format!("{}: {ty}", camel_case(&arg.name)));
    }
    let returns = if has_result {
        format!("Promise<[{}, RpcErrCode]>", ts_type(&api.result)?)
    } else {
        "Promise<RpcErrCode>".to_string()
    };

    out.blank();
    if api.note.is_empty() {
        w!(out, "  // {method} calls {}.", api.path());
    } else {
        w!(out, "  // {method} {}", api.note);
    }
    w!(out, "  async {method}({}): {returns} {{", params.join(", "));
    out.line("    const buf = new wire.ByteWriter();");
    for arg in &api.args {
        w!(out, "    {};", write_value(&arg.ty, "buf", &camel_case(&arg.name)));
    }
    w!(out, "    const [body, status] = await this.do(\"{}\", buf.bytes());", api.path());
    if has_result {
        let zero = ts_zero(&api.result)?;
        out.line("    if (status !== RpcErrCode.Ok) {");
        w!(out, "      return [{zero}, status];");
        out.line("    }");
        out.line("    const r = new wire.ByteReader(body);");
        out.line("    try {");
        w!(out, "      return [{}, status];", read_value(&api.result, "r"));
        out.line("    } catch {");
        w!(out, "      return [{zero}, RpcErrCode.RespErr];");
        out.line("    }");
    } else {
        out.line("    return status;");
    }
    out.line("  }");
    Ok(())
}

// ── _.ts index ───────────────────────────────────────────────────────────────

fn index(schema: &Schema, struct_files: &[String]) -> String {
    let mut out = CodeWriter::new();
    out.line("export * from \"./type\";");
    if !schema.enums.is_empty() {
        out.line("export * from \"./enum\";");
    }
    for file in struct_files {
        w!(out, "export * from \"./{}\";", file.trim_end_matches(".ts"));
    }
    if !schema.apis.is_empty() {
        out.line("export * from \"./rpc\";");
    }
    out.finish()
}

// ── type.ts runtime ──────────────────────────────────────────────────────────

const RUNTIME: &str = r#"// Little-endian wire runtime shared by all generated files.

export class WireError extends Error {}

export function bitsLen(n: number): number {
  return Math.ceil(n / 8);
}

export function getBit(bits: Uint8Array, i: number): boolean {
  const byte = bits[i >> 3];
  return byte !== undefined && (byte & (1 << (i & 7))) !== 0;
}

export function setBit(bits: Uint8Array, i: number, v: boolean): void {
  if (i >> 3 >= bits.length) {
    return;
  }
  if (v) {
    bits[i >> 3] |= 1 << (i & 7);
  } else {
    bits[i >> 3] &= ~(1 << (i & 7));
  }
}

export class ByteWriter {
  private chunks: number[] = [];

  u8(v: number): void {
    this.chunks.push(v & 0xff);
  }

  i8(v: number): void {
    this.u8(v < 0 ? v + 0x100 : v);
  }

  u16(v: number): void {
    this.u8(v);
    this.u8(v >>> 8);
  }

  i16(v: number): void {
    this.u16(v < 0 ? v + 0x10000 : v);
  }

  u32(v: number): void {
    this.u16(v);
    this.u16(Math.floor(v / 0x10000));
  }

  i32(v: number): void {
    this.u32(v < 0 ? v + 0x100000000 : v);
  }

  u64(v: bigint): void {
    for (let i = 0n; i < 8n; i++) {
      this.u8(Number((v >> (8n * i)) & 0xffn));
    }
  }

  i64(v: bigint): void {
    this.u64(BigInt.asUintN(64, v));
  }

  f32(v: number): void {
    const view = new DataView(new ArrayBuffer(4));
    view.setFloat32(0, v, true);
    this.raw(new Uint8Array(view.buffer));
  }

  f64(v: number): void {
    const view = new DataView(new ArrayBuffer(8));
    view.setFloat64(0, v, true);
    this.raw(new Uint8Array(view.buffer));
  }

  bool(v: boolean): void {
    this.u8(v ? 1 : 0);
  }

  bin(v: Uint8Array): void {
    if (v.length > 0xffff) {
      throw new WireError("length exceeds uint16 max");
    }
    this.u16(v.length);
    this.raw(v);
  }

  text(v: string): void {
    this.bin(new TextEncoder().encode(v));
  }

  raw(v: Uint8Array): void {
    for (const b of v) {
      this.chunks.push(b);
    }
  }

  concat(other: ByteWriter): void {
    this.chunks.push(...other.chunks);
  }

  bytes(): Uint8Array {
    return new Uint8Array(this.chunks);
  }
}

export class ByteReader {
  private pos = 0;

  constructor(private data: Uint8Array) {}

  remaining(): number {
    return this.data.length - this.pos;
  }

  take(n: number): Uint8Array {
    if (this.remaining() < n) {
      throw new WireError("unexpected end of input");
    }
    const out = this.data.subarray(this.pos, this.pos + n);
    this.pos += n;
    return out;
  }

  u8(): number {
    return this.take(1)[0];
  }

  i8(): number {
    const v = this.u8();
    return v >= 0x80 ? v - 0x100 : v;
  }

  u16(): number {
    return this.u8() | (this.u8() << 8);
  }

  i16(): number {
    const v = this.u16();
    return v >= 0x8000 ? v - 0x10000 : v;
  }

  u32(): number {
    return this.u16() + this.u16() * 0x10000;
  }

  i32(): number {
    const v = this.u32();
    return v >= 0x80000000 ? v - 0x100000000 : v;
  }

  u64(): bigint {
    let v = 0n;
    for (let i = 0n; i < 8n; i++) {
      v |= BigInt(this.u8()) << (8n * i);
    }
    return v;
  }

  i64(): bigint {
    return BigInt.asIntN(64, this.u64());
  }

  f32(): number {
    const bytes = this.take(4);
    return new DataView(bytes.slice().buffer).getFloat32(0, true);
  }

  f64(): number {
    const bytes = this.take(8);
    return new DataView(bytes.slice().buffer).getFloat64(0, true);
  }

  bool(): boolean {
    return this.u8() === 1;
  }

  bin(): Uint8Array {
    return this.take(this.u16()).slice();
  }

  text(): string {
    return new TextDecoder().decode(this.bin());
  }
}

export function writeList<T>(
  w: ByteWriter,
  items: T[],
  writeItem: (w: ByteWriter, item: T) => void,
): void {
  if (items.length > 255) {
    throw new WireError("list length exceeds uint8 max");
  }
  w.u8(items.length);
  for (const item of items) {
    writeItem(w, item);
  }
}

export function readList<T>(r: ByteReader, readItem: (r: ByteReader) => T): T[] {
  const count = r.u8();
  const out: T[] = [];
  for (let i = 0; i < count; i++) {
    out.push(readItem(r));
  }
  return out;
}

export function writeBoolList(w: ByteWriter, items: boolean[]): void {
  if (items.length > 255) {
    throw new WireError("list length exceeds uint8 max");
  }
  w.u8(items.length);
  const bits = new Uint8Array(bitsLen(items.length));
  items.forEach((v, i) => setBit(bits, i, v));
  w.raw(bits);
}

export function readBoolList(r: ByteReader): boolean[] {
  const count = r.u8();
  const bits = r.take(bitsLen(count));
  const out: boolean[] = [];
  for (let i = 0; i < count; i++) {
    out.push(getBit(bits, i));
  }
  return out;
}

export function eqBytes(a: Uint8Array, b: Uint8Array): boolean {
  return a.length === b.length && a.every((v, i) => v === b[i]);
}

export function eqList<T>(a: T[], b: T[], eq: (x: T, y: T) => boolean): boolean {
  return a.length === b.length && a.every((v, i) => eq(v, b[i]));
}
"#;
