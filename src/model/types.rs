//! Type references
//!
//! Declared types are parsed with `syn` and reduced to a small structural
//! form. Generators ask it questions (is this nullable, does it have a
//! length, can it key a hash map) instead of matching on type text.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("`{0}` is not a valid Rust type: {1}")]
    Syntax(String, String),

    #[error("`{0}` uses an unsupported type form ({1})")]
    Unsupported(String, &'static str),
}

/// Structural form of a type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    /// Named type, possibly with generic arguments
    Path,
    /// `&T` / `&'a mut T`; the referent is the only argument
    Reference {
        mutable: bool,
        lifetime: Option<String>,
    },
    /// `[T]`
    Slice,
    /// `[T; N]`
    Array { len: String },
    /// `(A, B, ..)` with at least one element
    Tuple,
    /// `()`
    Unit,
    /// `dyn Trait + ..`; bounds are kept rendered in the path
    TraitObject,
}

/// A declared type reference
///
/// Immutable once built and shared by reference between generators.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    shape: TypeShape,
    path: String,
    arguments: Vec<TypeInfo>,
}

const INTEGERS: [&str; 12] = [
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];
const FLOATS: [&str; 2] = ["f32", "f64"];
const BIG_INTEGERS: [&str; 2] = ["BigInt", "BigUint"];
const SEQUENCES: [&str; 6] = ["Vec", "VecDeque", "LinkedList", "BinaryHeap", "HashSet", "BTreeSet"];
const MAPS: [&str; 2] = ["HashMap", "BTreeMap"];

/// Types with a runtime `Leaf` impl, by number of generic arguments
const LEAF_SCALARS: [&str; 15] = [
    "i8", "i16", "i32", "i64", "isize", "u8", "u16", "u32", "u64", "usize", "f32", "f64", "bool",
    "char", "String",
];
const LEAF_CONTAINERS: [&str; 6] = [
    "Option",
    "Vec",
    "VecDeque",
    "LinkedList",
    "HashSet",
    "BTreeSet",
];
/// Library types without one; a consuming crate cannot add it
const FOREIGN_WITHOUT_LEAF: [&str; 11] = [
    "i128", "u128", "BigInt", "BigUint", "BinaryHeap", "Box", "Rc", "Arc", "Cow", "PathBuf", "str",
];

impl TypeInfo {
    /// Parse a type from its source text
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let ty: syn::Type = syn::parse_str(text)
            .map_err(|e| TypeError::Syntax(text.to_string(), e.to_string()))?;
        convert(&ty).map_err(|what| TypeError::Unsupported(text.to_string(), what))
    }

    pub fn unit() -> Self {
        Self {
            shape: TypeShape::Unit,
            path: String::new(),
            arguments: Vec::new(),
        }
    }

    /// A named type with generic arguments
    pub fn named(path: impl Into<String>, arguments: Vec<TypeInfo>) -> Self {
        Self {
            shape: TypeShape::Path,
            path: path.into(),
            arguments,
        }
    }

    /// Tuple of the given elements (unit when empty)
    pub fn tuple(elements: Vec<TypeInfo>) -> Self {
        if elements.is_empty() {
            return Self::unit();
        }
        Self {
            shape: TypeShape::Tuple,
            path: String::new(),
            arguments: elements,
        }
    }

    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Qualified path without generic arguments (empty for non-path shapes)
    pub fn qualified_name(&self) -> &str {
        &self.path
    }

    /// Last path segment (`HashMap` for `std::collections::HashMap<K, V>`)
    pub fn simple_name(&self) -> &str {
        self.path.rsplit("::").next().unwrap_or(&self.path)
    }

    pub fn arguments(&self) -> &[TypeInfo] {
        &self.arguments
    }

    fn is_named(&self, names: &[&str]) -> bool {
        self.shape == TypeShape::Path && names.contains(&self.simple_name())
    }

    pub fn is_unit(&self) -> bool {
        self.shape == TypeShape::Unit
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.shape, TypeShape::Reference { .. })
    }

    /// `Option<T>`
    pub fn is_nullable(&self) -> bool {
        self.is_named(&["Option"]) && self.arguments.len() == 1
    }

    /// Referent of a reference, `self` otherwise
    pub fn dereferenced(&self) -> &TypeInfo {
        match self.shape {
            TypeShape::Reference { .. } => &self.arguments[0],
            _ => self,
        }
    }

    /// The `T` of `Option<T>`, `self` otherwise
    pub fn value_type(&self) -> &TypeInfo {
        if self.is_nullable() {
            &self.arguments[0]
        } else {
            self
        }
    }

    pub fn is_map(&self) -> bool {
        self.is_named(&MAPS)
    }

    /// Sequences, sets, maps, slices and arrays
    pub fn is_collection(&self) -> bool {
        let target = self.dereferenced();
        matches!(target.shape, TypeShape::Slice | TypeShape::Array { .. })
            || target.is_named(&SEQUENCES)
            || target.is_named(&MAPS)
    }

    /// Element type of a collection; the value type for maps
    pub fn element_type(&self) -> Option<&TypeInfo> {
        let target = self.dereferenced();
        if !target.is_collection() {
            return None;
        }
        if target.is_map() {
            target.arguments.get(1)
        } else {
            target.arguments.first()
        }
    }

    pub fn is_str(&self) -> bool {
        self.shape == TypeShape::Path && self.path == "str"
    }

    /// `String`, `str` and `Cow<str>`, behind references too
    pub fn is_text(&self) -> bool {
        let target = self.dereferenced();
        target.is_named(&["String", "str"])
            || (target.is_named(&["Cow"]) && target.arguments.iter().any(TypeInfo::is_str))
    }

    pub fn is_integer(&self) -> bool {
        self.dereferenced().is_named(&INTEGERS)
    }

    pub fn is_float(&self) -> bool {
        self.dereferenced().is_named(&FLOATS)
    }

    /// Arbitrary-precision integers (`num_bigint::BigInt`, `BigUint`)
    pub fn is_big_integer(&self) -> bool {
        self.dereferenced().is_named(&BIG_INTEGERS)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float() || self.is_big_integer()
    }

    /// Whether the type has a `len()`
    pub fn is_sized(&self) -> bool {
        self.is_collection() || self.is_text()
    }

    pub fn is_copy(&self) -> bool {
        match &self.shape {
            TypeShape::Unit => true,
            TypeShape::Reference { mutable, .. } => !mutable,
            TypeShape::Tuple => self.arguments.iter().all(TypeInfo::is_copy),
            TypeShape::Array { .. } => self.arguments.iter().all(TypeInfo::is_copy),
            TypeShape::Slice | TypeShape::TraitObject => false,
            TypeShape::Path => {
                self.is_named(&INTEGERS)
                    || self.is_named(&FLOATS)
                    || self.is_named(&["bool", "char"])
                    || (self.is_nullable() && self.arguments[0].is_copy())
            }
        }
    }

    /// Whether the type can key a hash map
    pub fn is_hashable(&self) -> bool {
        match &self.shape {
            TypeShape::Unit => true,
            TypeShape::TraitObject => false,
            TypeShape::Path if self.is_named(&FLOATS) => false,
            TypeShape::Path if self.is_named(&["HashMap", "HashSet"]) => false,
            _ => self.arguments.iter().all(TypeInfo::is_hashable),
        }
    }

    /// First part of the type that has no `Leaf` encoding
    ///
    /// Types the consuming crate defines may implement `Leaf` themselves and
    /// pass, except those `is_declared` claims (generated types, which only
    /// encode through their converter).
    pub fn missing_leaf(&self, is_declared: &dyn Fn(&TypeInfo) -> bool) -> Option<&TypeInfo> {
        if self.shape != TypeShape::Path {
            return Some(self);
        }
        let name = self.simple_name();
        let arity = if LEAF_SCALARS.contains(&name) {
            0
        } else if LEAF_CONTAINERS.contains(&name) {
            1
        } else if MAPS.contains(&name) {
            2
        } else if FOREIGN_WITHOUT_LEAF.contains(&name)
            || ["std::", "core::", "alloc::"]
                .iter()
                .any(|prefix| self.path.trim_start_matches("::").starts_with(prefix))
            || is_declared(self)
        {
            return Some(self);
        } else {
            return None;
        };
        if self.arguments.len() != arity {
            return Some(self);
        }
        self.arguments.iter().find_map(|a| a.missing_leaf(is_declared))
    }

    /// Owned type usable as a cache key plus the conversion from a value of `self`
    pub fn owned_key(&self) -> (TypeInfo, KeyConversion) {
        match &self.shape {
            TypeShape::Reference { .. } => {
                let inner = &self.arguments[0];
                if inner.is_str() {
                    (TypeInfo::named("String", Vec::new()), KeyConversion::ToOwned)
                } else if inner.shape == TypeShape::Slice {
                    (
                        TypeInfo::named("Vec", inner.arguments.clone()),
                        KeyConversion::ToVec,
                    )
                } else if inner.is_copy() {
                    (inner.clone(), KeyConversion::Deref)
                } else {
                    (inner.clone(), KeyConversion::Clone)
                }
            }
            _ if self.is_copy() => (self.clone(), KeyConversion::Copy),
            _ => (self.clone(), KeyConversion::Clone),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.shape {
            TypeShape::Path => {
                write!(f, "{}", self.path)?;
                if !self.arguments.is_empty() {
                    write!(f, "<{}>", join(&self.arguments))?;
                }
                Ok(())
            }
            TypeShape::Reference { mutable, lifetime } => {
                write!(f, "&")?;
                if let Some(lifetime) = lifetime {
                    write!(f, "'{} ", lifetime)?;
                }
                if *mutable {
                    write!(f, "mut ")?;
                }
                write!(f, "{}", self.arguments[0])
            }
            TypeShape::Slice => write!(f, "[{}]", self.arguments[0]),
            TypeShape::Array { len } => write!(f, "[{}; {}]", self.arguments[0], len),
            TypeShape::Tuple if self.arguments.len() == 1 => write!(f, "({},)", self.arguments[0]),
            TypeShape::Tuple => write!(f, "({})", join(&self.arguments)),
            TypeShape::Unit => write!(f, "()"),
            TypeShape::TraitObject => write!(f, "dyn {}", self.path),
        }
    }
}

fn join(types: &[TypeInfo]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a parameter value becomes an owned cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyConversion {
    Copy,
    Deref,
    Clone,
    ToOwned,
    ToVec,
}

impl KeyConversion {
    pub fn apply(self, expr: &str) -> String {
        match self {
            KeyConversion::Copy => expr.to_string(),
            KeyConversion::Deref => format!("*{}", expr),
            KeyConversion::Clone => format!("{}.clone()", expr),
            KeyConversion::ToOwned => format!("{}.to_owned()", expr),
            KeyConversion::ToVec => format!("{}.to_vec()", expr),
        }
    }
}

fn convert(ty: &syn::Type) -> Result<TypeInfo, &'static str> {
    match ty {
        syn::Type::Path(type_path) => {
            if type_path.qself.is_some() {
                return Err("qualified self type");
            }
            let (path, arguments) = convert_path(&type_path.path)?;
            Ok(TypeInfo::named(path, arguments))
        }
        syn::Type::Reference(reference) => Ok(TypeInfo {
            shape: TypeShape::Reference {
                mutable: reference.mutability.is_some(),
                lifetime: reference.lifetime.as_ref().map(|l| l.ident.to_string()),
            },
            path: String::new(),
            arguments: vec![convert(&reference.elem)?],
        }),
        syn::Type::Slice(slice) => Ok(TypeInfo {
            shape: TypeShape::Slice,
            path: String::new(),
            arguments: vec![convert(&slice.elem)?],
        }),
        syn::Type::Array(array) => {
            let len = match &array.len {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(int),
                    ..
                }) => int.base10_digits().to_string(),
                _ => return Err("non-literal array length"),
            };
            Ok(TypeInfo {
                shape: TypeShape::Array { len },
                path: String::new(),
                arguments: vec![convert(&array.elem)?],
            })
        }
        syn::Type::Tuple(tuple) => {
            let elements = tuple
                .elems
                .iter()
                .map(convert)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeInfo::tuple(elements))
        }
        syn::Type::Paren(paren) => convert(&paren.elem),
        syn::Type::Group(group) => convert(&group.elem),
        syn::Type::TraitObject(object) => {
            let mut bounds = Vec::new();
            for bound in &object.bounds {
                match bound {
                    syn::TypeParamBound::Trait(trait_bound) => {
                        let (path, arguments) = convert_path(&trait_bound.path)?;
                        bounds.push(TypeInfo::named(path, arguments).to_string());
                    }
                    syn::TypeParamBound::Lifetime(lifetime) => {
                        bounds.push(format!("'{}", lifetime.ident));
                    }
                    _ => return Err("trait object bound"),
                }
            }
            Ok(TypeInfo {
                shape: TypeShape::TraitObject,
                path: bounds.join(" + "),
                arguments: Vec::new(),
            })
        }
        syn::Type::Never(_) => Err("never type"),
        syn::Type::ImplTrait(_) => Err("impl trait"),
        syn::Type::BareFn(_) => Err("function pointer"),
        syn::Type::Ptr(_) => Err("raw pointer"),
        _ => Err("type form"),
    }
}

fn convert_path(path: &syn::Path) -> Result<(String, Vec<TypeInfo>), &'static str> {
    let mut segments = Vec::new();
    let mut arguments = Vec::new();
    let last = path.segments.len().saturating_sub(1);
    for (i, segment) in path.segments.iter().enumerate() {
        segments.push(segment.ident.to_string());
        match &segment.arguments {
            syn::PathArguments::None => {}
            syn::PathArguments::AngleBracketed(args) if i == last => {
                for arg in &args.args {
                    match arg {
                        syn::GenericArgument::Type(ty) => arguments.push(convert(ty)?),
                        _ => return Err("non-type generic argument"),
                    }
                }
            }
            syn::PathArguments::AngleBracketed(_) => return Err("generic arguments inside a path"),
            syn::PathArguments::Parenthesized(_) => return Err("parenthesized arguments"),
        }
    }
    let prefix = if path.leading_colon.is_some() { "::" } else { "" };
    Ok((format!("{}{}", prefix, segments.join("::")), arguments))
}

// ---------------------------------------------------------------------------
// Assignability
// ---------------------------------------------------------------------------

/// Answer of the assignability oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignability {
    Assignable,
    NotAssignable,
    /// Nothing is known about the declared type
    Unknown,
}

/// Supertype knowledge about declarations of the current batch
pub trait TypeHierarchy {
    /// Direct supertypes of a declared type name, if the name is a declaration
    fn supertypes_of(&self, name: &str) -> Option<Vec<String>>;
}

/// Traits whose absence can be asserted for built-in types
const KNOWN_TRAITS: [&str; 24] = [
    "Copy", "Clone", "Debug", "Display", "Default", "Hash", "Eq", "PartialEq", "Ord",
    "PartialOrd", "Send", "Sync", "FromStr", "ToString", "AsRef", "Borrow", "Deref",
    "IntoIterator", "Iterator", "Extend", "FromIterator", "Error", "Read", "Write",
];

const SCALAR_TRAITS: [&str; 14] = [
    "Copy", "Clone", "Debug", "Display", "Default", "Hash", "Eq", "PartialEq", "Ord",
    "PartialOrd", "Send", "Sync", "FromStr", "ToString",
];
const FLOAT_TRAITS: [&str; 10] = [
    "Copy", "Clone", "Debug", "Display", "Default", "PartialEq", "PartialOrd", "Send", "Sync",
    "FromStr",
];
const STRING_TRAITS: [&str; 16] = [
    "Clone", "Debug", "Display", "Default", "Hash", "Eq", "PartialEq", "Ord", "PartialOrd",
    "Send", "Sync", "FromStr", "ToString", "AsRef", "Borrow", "Deref",
];
const COLLECTION_TRAITS: [&str; 11] = [
    "Clone", "Debug", "Default", "PartialEq", "Eq", "Send", "Sync", "IntoIterator", "Extend",
    "FromIterator", "Hash",
];

/// Traits every generated concrete type implements
pub const GENERATED_TRAITS: [&str; 3] = ["Debug", "Clone", "PartialEq"];

fn builtin_traits(ty: &TypeInfo) -> Option<&'static [&'static str]> {
    if ty.is_integer() || ty.dereferenced().is_named(&["bool", "char"]) {
        Some(&SCALAR_TRAITS)
    } else if ty.is_float() {
        Some(&FLOAT_TRAITS)
    } else if ty.is_text() {
        Some(&STRING_TRAITS)
    } else if ty.is_collection() {
        Some(&COLLECTION_TRAITS)
    } else {
        None
    }
}

/// Whether a value of `declared` can be used where `target` is expected
///
/// Generic arguments are ignored ("raw" assignability). Declarations of the
/// batch are answered from their declared supertypes; built-in types from a
/// fixed table; anything else is `Unknown`.
pub fn assignability(
    declared: &TypeInfo,
    target: &TypeInfo,
    hierarchy: &dyn TypeHierarchy,
) -> Assignability {
    let declared = declared.dereferenced();
    let target_name = target.simple_name();
    if declared.shape == target.shape && declared.simple_name() == target_name {
        return Assignability::Assignable;
    }
    if let Some(traits) = builtin_traits(declared) {
        if traits.contains(&target_name) {
            return Assignability::Assignable;
        }
        let target_is_builtin = builtin_traits(target).is_some();
        if KNOWN_TRAITS.contains(&target_name) || target_is_builtin {
            return Assignability::NotAssignable;
        }
        return Assignability::Unknown;
    }
    let start = declared.simple_name().to_string();
    if hierarchy.supertypes_of(&start).is_none() {
        return Assignability::Unknown;
    }
    if GENERATED_TRAITS.contains(&target_name) {
        return Assignability::Assignable;
    }
    let mut visited = vec![start.clone()];
    let mut pending = vec![start];
    while let Some(name) = pending.pop() {
        for supertype in hierarchy.supertypes_of(&name).unwrap_or_default() {
            let simple = supertype.rsplit("::").next().unwrap_or(&supertype).to_string();
            if simple == target_name {
                return Assignability::Assignable;
            }
            if !visited.contains(&simple) {
                visited.push(simple.clone());
                pending.push(simple);
            }
        }
    }
    Assignability::NotAssignable
}
