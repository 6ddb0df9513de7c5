use std::collections::BTreeMap;

const ACC_PRIVATE: u16 = 0x0002;
const ACC_PROTECTED: u16 = 0x0004;

/// Raw JVM access flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AccessFlags(u16);

impl AccessFlags {
    pub const PUBLIC: AccessFlags = AccessFlags(0x0001);

    pub const fn new(bits: u16) -> Self {
        Self(bits)
    }

    /// Neither private nor protected.
    pub const fn is_visible(self) -> bool {
        self.0 & (ACC_PRIVATE | ACC_PROTECTED) == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRecord {
    pub name: String,
    pub descriptor: String,
    pub access: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub name: String,
    pub access: AccessFlags,
}

/// One entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedClassRef {
    pub name: String,
    pub outer: Option<String>,
    /// `None` for anonymous classes.
    pub simple_name: Option<String>,
}

/// Structural view of one class file. Names use the internal `a/b/C$D` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRecord {
    pub name: String,
    pub access: AccessFlags,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
    pub nested: Vec<NestedClassRef>,
}

impl ClassRecord {
    /// `a/b` for `a/b/C`, empty for the default package.
    pub fn package_path(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map(|(package, _)| package)
            .unwrap_or_default()
    }

    /// Binary simple name: `C$D` for `a/b/C$D`.
    pub fn binary_simple_name(&self) -> &str {
        self.name
            .rsplit_once('/')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.name)
    }

    /// Dotted name with `$` also rendered as `.`.
    pub fn dotted_name(&self) -> String {
        self.name.replace(['/', '$'], ".")
    }

    pub fn is_top_level(&self) -> bool {
        !self.name.contains('$')
    }
}

/// Name-keyed class records of every artifact of a build unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTable {
    classes: BTreeMap<String, ClassRecord>,
}

impl ClassTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `record` unless a class with the same name is already present.
    /// Returns `false` when the record was dropped.
    pub fn insert(&mut self, record: ClassRecord) -> bool {
        if self.classes.contains_key(&record.name) {
            return false;
        }
        self.classes.insert(record.name.clone(), record);
        true
    }

    pub fn get(&self, name: &str) -> Option<&ClassRecord> {
        self.classes.get(name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// All records, ordered by internal name.
    pub fn iter(&self) -> impl Iterator<Item = &ClassRecord> {
        self.classes.values()
    }

    /// Records that produce a top-level stub block.
    pub fn top_level(&self) -> impl Iterator<Item = &ClassRecord> {
        self.iter()
            .filter(|record| record.is_top_level() && record.access.is_visible())
    }
}
