#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use zip::ZipWriter;
use zip::write::FileOptions;

pub const PUBLIC: u16 = 0x0001;
pub const PRIVATE: u16 = 0x0002;
pub const PROTECTED: u16 = 0x0004;
pub const STATIC: u16 = 0x0008;
pub const FINAL: u16 = 0x0010;
pub const SYNTHETIC: u16 = 0x1000;

/// Assembles minimal but well-formed class files for tests.
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    name: String,
    access: u16,
    fields: Vec<(u16, String, String)>,
    methods: Vec<(u16, String, String)>,
    inner: Vec<(String, Option<String>, Option<String>, u16)>,
    strings: Vec<String>,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            access: PUBLIC,
            fields: Vec::new(),
            methods: Vec::new(),
            inner: Vec::new(),
            strings: Vec::new(),
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn field(mut self, access: u16, name: &str, descriptor: &str) -> Self {
        self.fields
            .push((access, name.to_string(), descriptor.to_string()));
        self
    }

    pub fn method(mut self, access: u16, name: &str) -> Self {
        self.methods.push((access, name.to_string(), "()V".to_string()));
        self
    }

    /// Adds a `CONSTANT_String` literal to the pool.
    pub fn string(mut self, value: &str) -> Self {
        self.strings.push(value.to_string());
        self
    }

    /// Adds an `InnerClasses` entry. `simple` is `None` for anonymous classes.
    pub fn inner(mut self, name: &str, outer: Option<&str>, simple: Option<&str>, access: u16) -> Self {
        self.inner.push((
            name.to_string(),
            outer.map(str::to_string),
            simple.map(str::to_string),
            access,
        ));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let this_class = pool.class(&self.name);
        let super_class = pool.class("java/lang/Object");
        pool.integer(7);
        pool.long(42);
        pool.dynamic(0, 0);
        for value in &self.strings {
            pool.string(value);
        }

        let mut fields = Vec::new();
        for (access, name, descriptor) in &self.fields {
            fields.push((*access, pool.utf8(name), pool.utf8(descriptor)));
        }

        let code = pool.utf8("Code");
        let mut methods = Vec::new();
        for (access, name, descriptor) in &self.methods {
            methods.push((*access, pool.utf8(name), pool.utf8(descriptor)));
        }

        let mut inner = Vec::new();
        for (name, outer, simple, access) in &self.inner {
            let inner_index = pool.class(name);
            let outer_index = match outer {
                Some(outer) => pool.class(outer),
                None => 0,
            };
            let simple_index = match simple {
                Some(simple) => pool.utf8(simple),
                None => 0,
            };
            inner.push((inner_index, outer_index, simple_index, *access));
        }
        let inner_classes = pool.utf8("InnerClasses");
        let source_file = pool.utf8("SourceFile");
        let source_name = pool.utf8("Generated.kt");

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABE_u32.to_be_bytes());
        put_u2(&mut out, 0);
        put_u2(&mut out, 52);
        pool.write(&mut out);

        put_u2(&mut out, self.access);
        put_u2(&mut out, this_class);
        put_u2(&mut out, super_class);
        put_u2(&mut out, 0); // interfaces

        put_u2(&mut out, fields.len() as u16);
        for (access, name, descriptor) in fields {
            put_u2(&mut out, access);
            put_u2(&mut out, name);
            put_u2(&mut out, descriptor);
            put_u2(&mut out, 0);
        }

        put_u2(&mut out, methods.len() as u16);
        for (access, name, descriptor) in methods {
            put_u2(&mut out, access);
            put_u2(&mut out, name);
            put_u2(&mut out, descriptor);
            // an opaque Code attribute that the parser has to skip
            put_u2(&mut out, 1);
            put_u2(&mut out, code);
            out.extend_from_slice(&6_u32.to_be_bytes());
            out.extend_from_slice(&[0, 1, 0, 1, 0xB1, 0]);
        }

        let attributes = if inner.is_empty() { 1 } else { 2 };
        put_u2(&mut out, attributes);
        put_u2(&mut out, source_file);
        out.extend_from_slice(&2_u32.to_be_bytes());
        put_u2(&mut out, source_name);
        if !inner.is_empty() {
            put_u2(&mut out, inner_classes);
            out.extend_from_slice(&((2 + inner.len() * 8) as u32).to_be_bytes());
            put_u2(&mut out, inner.len() as u16);
            for (inner_index, outer_index, simple_index, access) in inner {
                put_u2(&mut out, inner_index);
                put_u2(&mut out, outer_index);
                put_u2(&mut out, simple_index);
                put_u2(&mut out, access);
            }
        }

        out
    }
}

#[derive(Default)]
struct PoolBuilder {
    entries: Vec<Vec<u8>>,
    next: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl PoolBuilder {
    fn push(&mut self, bytes: Vec<u8>, slots: u16) -> u16 {
        if self.next == 0 {
            self.next = 1;
        }
        let index = self.next;
        self.entries.push(bytes);
        self.next += slots;
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(index) = self.utf8.get(value) {
            return *index;
        }
        let encoded = modified_utf8(value);
        let mut bytes = vec![1];
        put_u2(&mut bytes, encoded.len() as u16);
        bytes.extend_from_slice(&encoded);
        let index = self.push(bytes, 1);
        self.utf8.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(index) = self.classes.get(name) {
            return *index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7];
        put_u2(&mut bytes, name_index);
        let index = self.push(bytes, 1);
        self.classes.insert(name.to_string(), index);
        index
    }

    fn string(&mut self, value: &str) -> u16 {
        let utf8_index = self.utf8(value);
        let mut bytes = vec![8];
        put_u2(&mut bytes, utf8_index);
        self.push(bytes, 1)
    }

    fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(bytes, 1)
    }

    fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.push(bytes, 2)
    }

    fn dynamic(&mut self, bootstrap: u16, name_and_type: u16) -> u16 {
        let mut bytes = vec![17];
        put_u2(&mut bytes, bootstrap);
        put_u2(&mut bytes, name_and_type);
        self.push(bytes, 1)
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u2(out, self.next.max(1));
        for entry in &self.entries {
            out.extend_from_slice(entry);
        }
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// In-memory zip archive with the given entries.
pub fn archive_bytes(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start zip entry");
        writer.write_all(bytes).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn write_archive(path: &Path, entries: &[(&str, Vec<u8>)]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create archive directory");
    }
    let mut file = File::create(path).expect("create archive");
    file.write_all(&archive_bytes(entries))
        .expect("write archive");
}

/// Class entry named after the class's internal name.
pub fn class_entry(builder: ClassFileBuilder) -> (String, Vec<u8>) {
    (format!("{}.class", builder.name), builder.build())
}

/// Writes a jar containing the given classes.
pub fn write_jar(path: &Path, classes: Vec<ClassFileBuilder>) {
    let entries = classes.into_iter().map(class_entry).collect::<Vec<_>>();
    let borrowed = entries
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.clone()))
        .collect::<Vec<_>>();
    write_archive(path, &borrowed);
}

/// Encodes `value` the way javac writes `CONSTANT_Utf8` entries.
fn modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\0' => out.extend_from_slice(&[0xC0, 0x80]),
            ch if u32::from(ch) > 0xFFFF => {
                let mut units = [0_u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let unit = u32::from(*unit);
                    out.extend_from_slice(&[
                        0xE0 | (unit >> 12) as u8,
                        0x80 | ((unit >> 6) & 0x3F) as u8,
                        0x80 | (unit & 0x3F) as u8,
                    ]);
                }
            }
            ch => {
                let mut buf = [0; 4];
                out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out
}
