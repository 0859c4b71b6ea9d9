use std::collections::HashMap;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_ANNOTATION: u16 = 0x2000;

/// One annotation element value.
#[derive(Debug, Clone)]
pub enum ElementSpec {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Binary class name, e.g. `java.lang.String`.
    Class(String),
    Enum { type_name: String, constant: String },
    Annotation(AnnotationSpec),
    Array(Vec<ElementSpec>),
}

impl ElementSpec {
    pub fn str(value: &str) -> Self {
        ElementSpec::String(value.to_string())
    }

    pub fn enum_value(type_name: &str, constant: &str) -> Self {
        ElementSpec::Enum {
            type_name: type_name.to_string(),
            constant: constant.to_string(),
        }
    }
}

/// An annotation instance with its explicit elements.
#[derive(Debug, Clone)]
pub struct AnnotationSpec {
    pub type_name: String,
    pub elements: Vec<(String, ElementSpec)>,
}

impl AnnotationSpec {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            elements: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, value: ElementSpec) -> Self {
        self.elements.push((name.to_string(), value));
        self
    }
}

#[derive(Debug, Clone)]
pub struct MethodSpec {
    pub name: String,
    pub descriptor: String,
    pub access: u16,
    pub annotations: Vec<AnnotationSpec>,
    pub default_value: Option<ElementSpec>,
}

impl MethodSpec {
    pub fn new(name: &str, descriptor: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            access: ACC_PUBLIC,
            annotations: Vec::new(),
            default_value: None,
        }
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn annotated(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn default_value(mut self, value: ElementSpec) -> Self {
        self.default_value = Some(value);
        self
    }
}

#[derive(Debug, Clone)]
struct InnerClassSpec {
    name: String,
    outer_name: Option<String>,
    inner_name: Option<String>,
    access: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstKey {
    Utf8(String),
    Class(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
}

#[derive(Default)]
struct PoolBuilder {
    bytes: Vec<u8>,
    count: u16,
    index: HashMap<ConstKey, u16>,
}

impl PoolBuilder {
    fn intern(&mut self, key: ConstKey) -> u16 {
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let slots = match &key {
            ConstKey::Utf8(s) => {
                let encoded = encode_modified_utf8(s);
                self.bytes.push(1);
                self.bytes.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
                self.bytes.extend_from_slice(&encoded);
                1
            }
            ConstKey::Class(name) => {
                let name_idx = self.utf8(name);
                self.bytes.push(7);
                self.bytes.extend_from_slice(&name_idx.to_be_bytes());
                1
            }
            ConstKey::Integer(v) => {
                self.bytes.push(3);
                self.bytes.extend_from_slice(&v.to_be_bytes());
                1
            }
            ConstKey::Float(bits) => {
                self.bytes.push(4);
                self.bytes.extend_from_slice(&bits.to_be_bytes());
                1
            }
            ConstKey::Long(v) => {
                self.bytes.push(5);
                self.bytes.extend_from_slice(&v.to_be_bytes());
                2
            }
            ConstKey::Double(bits) => {
                self.bytes.push(6);
                self.bytes.extend_from_slice(&bits.to_be_bytes());
                2
            }
        };
        // Class entries intern their name first
        let idx = self.count + 1;
        self.count += slots;
        self.index.insert(key, idx);
        idx
    }

    fn utf8(&mut self, s: &str) -> u16 {
        self.intern(ConstKey::Utf8(s.to_string()))
    }

    fn class(&mut self, internal_name: &str) -> u16 {
        self.intern(ConstKey::Class(internal_name.to_string()))
    }
}

/// Produces minimal but valid class files.
#[derive(Debug, Clone)]
pub struct ClassFileWriter {
    name: String,
    access: u16,
    major: u16,
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<(String, String)>,
    methods: Vec<MethodSpec>,
    annotations: Vec<AnnotationSpec>,
    invisible_annotations: Vec<AnnotationSpec>,
    inner_classes: Vec<InnerClassSpec>,
    enclosing_class: Option<String>,
}

impl ClassFileWriter {
    /// A public class extending `java.lang.Object`. Names use `.` separators.
    pub fn class(name: &str) -> Self {
        Self {
            name: internal(name),
            access: ACC_PUBLIC | ACC_SUPER,
            major: 52,
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            inner_classes: Vec::new(),
            enclosing_class: None,
        }
    }

    pub fn interface(name: &str) -> Self {
        Self::class(name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    /// An annotation type declaration.
    pub fn annotation_type(name: &str) -> Self {
        Self::class(name)
            .access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION)
            .implements("java.lang.annotation.Annotation")
    }

    pub fn access(mut self, access: u16) -> Self {
        self.access = access;
        self
    }

    pub fn version(mut self, major: u16) -> Self {
        self.major = major;
        self
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(internal(super_name));
        self
    }

    pub fn no_super(mut self) -> Self {
        self.super_name = None;
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(internal(interface));
        self
    }

    pub fn field(mut self, name: &str, descriptor: &str) -> Self {
        self.fields.push((name.to_string(), descriptor.to_string()));
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn annotated(mut self, annotation: AnnotationSpec) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn annotated_invisible(mut self, annotation: AnnotationSpec) -> Self {
        self.invisible_annotations.push(annotation);
        self
    }

    /// Records an `InnerClasses` entry. Names use `.` separators.
    pub fn inner_class(mut self, name: &str, outer_name: Option<&str>, access: u16) -> Self {
        let inner_name = name.rsplit(['$', '.']).next().map(str::to_string);
        self.inner_classes.push(InnerClassSpec {
            name: internal(name),
            outer_name: outer_name.map(internal),
            inner_name,
            access,
        });
        self
    }

    /// Records an `EnclosingMethod` attribute, as local and anonymous classes carry.
    pub fn enclosing_method(mut self, owner: &str) -> Self {
        self.enclosing_class = Some(internal(owner));
        self
    }

    /// Binary name of the class being written.
    pub fn name(&self) -> String {
        self.name.replace('/', ".")
    }

    /// Internal name, `com/example/Foo`.
    pub fn internal_name(&self) -> &str {
        &self.name
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let mut body = Vec::new();

        body.extend_from_slice(&self.access.to_be_bytes());
        put_u2(&mut body, pool.class(&self.name));
        put_u2(&mut body, self.super_name.as_deref().map_or(0, |s| pool.class(s)));
        put_u2(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            put_u2(&mut body, pool.class(interface));
        }

        put_u2(&mut body, self.fields.len() as u16);
        for (name, descriptor) in &self.fields {
            put_u2(&mut body, ACC_PRIVATE);
            put_u2(&mut body, pool.utf8(name));
            put_u2(&mut body, pool.utf8(descriptor));
            // One opaque attribute to exercise skipping
            put_u2(&mut body, 1);
            put_u2(&mut body, pool.utf8("Synthetic"));
            body.extend_from_slice(&0u32.to_be_bytes());
        }

        put_u2(&mut body, self.methods.len() as u16);
        for method in &self.methods {
            put_u2(&mut body, method.access);
            put_u2(&mut body, pool.utf8(&method.name));
            put_u2(&mut body, pool.utf8(&method.descriptor));
            let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
            // A fake code attribute that must be skipped
            attributes.push((pool.utf8("Code"), vec![0, 1, 0, 1, 0, 0, 0, 1, 0xB1, 0, 0, 0, 0]));
            if !method.annotations.is_empty() {
                let payload = annotations_payload(&mut pool, &method.annotations);
                attributes.push((pool.utf8("RuntimeVisibleAnnotations"), payload));
            }
            if let Some(default) = &method.default_value {
                let mut payload = Vec::new();
                write_element(&mut pool, &mut payload, default);
                attributes.push((pool.utf8("AnnotationDefault"), payload));
            }
            write_attributes(&mut body, &attributes);
        }

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        attributes.push((pool.utf8("SourceFile"), {
            let file = format!("{}.java", self.name.rsplit('/').next().unwrap_or("Unknown"));
            pool.utf8(&file).to_be_bytes().to_vec()
        }));
        if let Some(owner) = &self.enclosing_class {
            let mut payload = Vec::new();
            put_u2(&mut payload, pool.class(owner));
            put_u2(&mut payload, 0);
            attributes.push((pool.utf8("EnclosingMethod"), payload));
        }
        if !self.inner_classes.is_empty() {
            let mut payload = Vec::new();
            put_u2(&mut payload, self.inner_classes.len() as u16);
            for inner in &self.inner_classes {
                put_u2(&mut payload, pool.class(&inner.name));
                put_u2(&mut payload, inner.outer_name.as_deref().map_or(0, |o| pool.class(o)));
                put_u2(&mut payload, inner.inner_name.as_deref().map_or(0, |n| pool.utf8(n)));
                put_u2(&mut payload, inner.access);
            }
            attributes.push((pool.utf8("InnerClasses"), payload));
        }
        if !self.annotations.is_empty() {
            let payload = annotations_payload(&mut pool, &self.annotations);
            attributes.push((pool.utf8("RuntimeVisibleAnnotations"), payload));
        }
        if !self.invisible_annotations.is_empty() {
            let payload = annotations_payload(&mut pool, &self.invisible_annotations);
            attributes.push((pool.utf8("RuntimeInvisibleAnnotations"), payload));
        }
        write_attributes(&mut body, &attributes);

        let mut out = Vec::with_capacity(body.len() + pool.bytes.len() + 10);
        out.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
        put_u2(&mut out, 0);
        put_u2(&mut out, self.major);
        put_u2(&mut out, pool.count + 1);
        out.extend_from_slice(&pool.bytes);
        out.extend_from_slice(&body);
        out
    }
}

fn internal(name: &str) -> String {
    name.replace('.', "/")
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[(u16, Vec<u8>)]) {
    put_u2(out, attributes.len() as u16);
    for (name_idx, payload) in attributes {
        put_u2(out, *name_idx);
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
    }
}

fn annotations_payload(pool: &mut PoolBuilder, annotations: &[AnnotationSpec]) -> Vec<u8> {
    let mut out = Vec::new();
    put_u2(&mut out, annotations.len() as u16);
    for annotation in annotations {
        write_annotation(pool, &mut out, annotation);
    }
    out
}

fn write_annotation(pool: &mut PoolBuilder, out: &mut Vec<u8>, annotation: &AnnotationSpec) {
    put_u2(out, pool.utf8(&object_descriptor(&annotation.type_name)));
    put_u2(out, annotation.elements.len() as u16);
    for (name, value) in &annotation.elements {
        put_u2(out, pool.utf8(name));
        write_element(pool, out, value);
    }
}

fn write_element(pool: &mut PoolBuilder, out: &mut Vec<u8>, value: &ElementSpec) {
    match value {
        ElementSpec::Boolean(v) => const_element(pool, out, b'Z', ConstKey::Integer(*v as i32)),
        ElementSpec::Byte(v) => const_element(pool, out, b'B', ConstKey::Integer(*v as i32)),
        ElementSpec::Char(v) => const_element(pool, out, b'C', ConstKey::Integer(*v as i32)),
        ElementSpec::Short(v) => const_element(pool, out, b'S', ConstKey::Integer(*v as i32)),
        ElementSpec::Int(v) => const_element(pool, out, b'I', ConstKey::Integer(*v)),
        ElementSpec::Long(v) => const_element(pool, out, b'J', ConstKey::Long(*v)),
        ElementSpec::Float(v) => const_element(pool, out, b'F', ConstKey::Float(v.to_bits())),
        ElementSpec::Double(v) => const_element(pool, out, b'D', ConstKey::Double(v.to_bits())),
        ElementSpec::String(s) => const_element(pool, out, b's', ConstKey::Utf8(s.clone())),
        ElementSpec::Class(name) => {
            out.push(b'c');
            put_u2(out, pool.utf8(&object_descriptor(name)));
        }
        ElementSpec::Enum {
            type_name,
            constant,
        } => {
            out.push(b'e');
            put_u2(out, pool.utf8(&object_descriptor(type_name)));
            put_u2(out, pool.utf8(constant));
        }
        ElementSpec::Annotation(nested) => {
            out.push(b'@');
            write_annotation(pool, out, nested);
        }
        ElementSpec::Array(values) => {
            out.push(b'[');
            put_u2(out, values.len() as u16);
            for value in values {
                write_element(pool, out, value);
            }
        }
    }
}

fn const_element(pool: &mut PoolBuilder, out: &mut Vec<u8>, tag: u8, key: ConstKey) {
    out.push(tag);
    put_u2(out, pool.intern(key));
}

fn object_descriptor(binary_name: &str) -> String {
    format!("L{};", internal(binary_name))
}

fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) as u8 & 0x1F));
                out.push(0x80 | (unit as u8 & 0x3F));
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) as u8 & 0x0F));
                out.push(0x80 | ((unit >> 6) as u8 & 0x3F));
                out.push(0x80 | (unit as u8 & 0x3F));
            }
        }
    }
    out
}
