//! Schema fragments and the merged schema.
//!
//! Fragments are written in a small subset of GraphQL SDL:
//!
//! ```text
//! # comments run to end of line
//! type Post {
//!   id: Int!
//!   title: String!
//! }
//!
//! extend type Query {
//!   posts(query: String, skip: Int, take: Int): [Post!]!
//! }
//!
//! input CreatePostInput {
//!   title: String!
//! }
//! ```
//!
//! `type` and `extend type` are treated alike: any module may add fields to
//! any object type, as long as no two modules add the same one.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Whether a type is an output object or an input object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Object,
    Input,
}

impl TypeKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::Object => "type",
            Self::Input => "input",
        }
    }
}

/// One field on one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    /// Argument name and type pairs, in declaration order.
    pub args: Vec<(String, String)>,
    pub ty: String,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            ty: ty.into(),
        }
    }

    pub fn arg(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.args.push((name.into(), ty.into()));
        self
    }

    fn render(&self) -> String {
        if self.args.is_empty() {
            return format!("{}: {}", self.name, self.ty);
        }
        let args: Vec<String> = self
            .args
            .iter()
            .map(|(name, ty)| format!("{name}: {ty}"))
            .collect();
        format!("{}({}): {}", self.name, args.join(", "), self.ty)
    }
}

/// Error produced when fragment text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{module} schema, line {line}: {message}")]
pub struct ParseSchemaError {
    pub module: String,
    pub line: usize,
    pub message: String,
}

/// The set of field definitions one module contributes.
///
/// Fields are kept in declaration order and never deduplicated here, so a
/// field declared twice, even within one fragment, is caught at assembly.
#[derive(Debug, Clone, Default)]
pub struct SchemaFragment {
    pub(crate) types: Vec<(String, TypeKind, Vec<FieldDef>)>,
}

impl SchemaFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field to an object type.
    pub fn field(self, type_name: &str, field: FieldDef) -> Self {
        self.with_field(type_name, TypeKind::Object, field)
    }

    /// Adds a field to an input type.
    pub fn input_field(self, type_name: &str, field: FieldDef) -> Self {
        self.with_field(type_name, TypeKind::Input, field)
    }

    fn with_field(mut self, type_name: &str, kind: TypeKind, field: FieldDef) -> Self {
        match self.types.iter_mut().find(|(name, _, _)| name == type_name) {
            Some((_, _, fields)) => fields.push(field),
            None => self.types.push((type_name.to_string(), kind, vec![field])),
        }
        self
    }

    /// Number of field definitions in this fragment.
    pub fn field_count(&self) -> usize {
        self.types.iter().map(|(_, _, fields)| fields.len()).sum()
    }

    /// Parses fragment text. `module` names the source in error messages.
    pub fn parse(module: &str, sdl: &str) -> Result<Self, ParseSchemaError> {
        let err = |line: usize, message: String| ParseSchemaError {
            module: module.to_string(),
            line,
            message,
        };

        let mut fragment = Self::new();
        let mut open: Option<(String, TypeKind, usize)> = None;

        for (idx, raw) in sdl.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }

            match &open {
                None => {
                    let (name, kind) = parse_type_header(line).ok_or_else(|| {
                        err(line_no, format!("expected a type header, found `{line}`"))
                    })?;
                    open = Some((name, kind, line_no));
                }
                Some(_) if line == "}" => open = None,
                Some((type_name, kind, _)) => {
                    let field = parse_field(line).map_err(|message| err(line_no, message))?;
                    fragment = fragment.with_field(type_name, *kind, field);
                }
            }
        }

        if let Some((type_name, _, line_no)) = open {
            return Err(err(line_no, format!("type `{type_name}` is never closed")));
        }
        Ok(fragment)
    }
}

fn parse_type_header(line: &str) -> Option<(String, TypeKind)> {
    let body = line.strip_suffix('{')?.trim();
    let mut words = body.split_whitespace();
    let kind = match (words.next()?, words.next()?) {
        ("extend", "type") => TypeKind::Object,
        ("type", name) => return single_name(name, words.next()).map(|n| (n, TypeKind::Object)),
        ("input", name) => return single_name(name, words.next()).map(|n| (n, TypeKind::Input)),
        _ => return None,
    };
    single_name(words.next()?, words.next()).map(|n| (n, kind))
}

fn single_name(name: &str, trailing: Option<&str>) -> Option<String> {
    (trailing.is_none() && is_identifier(name)).then(|| name.to_string())
}

fn parse_field(line: &str) -> Result<FieldDef, String> {
    let (head, args) = match line.find('(') {
        Some(open) => {
            let close = line
                .rfind(')')
                .filter(|close| *close > open)
                .ok_or_else(|| format!("unbalanced parentheses in `{line}`"))?;
            let args = parse_args(&line[open + 1..close])?;
            (format!("{}{}", &line[..open], &line[close + 1..]), args)
        }
        None => (line.to_string(), Vec::new()),
    };

    let (name, ty) = head
        .split_once(':')
        .ok_or_else(|| format!("expected `name: Type`, found `{line}`"))?;
    let (name, ty) = (name.trim(), ty.trim());

    if !is_identifier(name) {
        return Err(format!("invalid field name `{name}`"));
    }
    if ty.is_empty() {
        return Err(format!("field `{name}` has no type"));
    }

    Ok(FieldDef {
        name: name.to_string(),
        args,
        ty: ty.to_string(),
    })
}

fn parse_args(list: &str) -> Result<Vec<(String, String)>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(|arg| {
            let (name, ty) = arg
                .split_once(':')
                .ok_or_else(|| format!("expected `name: Type` argument, found `{arg}`"))?;
            let (name, ty) = (name.trim(), ty.trim());
            if !is_identifier(name) || ty.is_empty() {
                return Err(format!("invalid argument `{arg}`"));
            }
            Ok((name.to_string(), ty.to_string()))
        })
        .collect()
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The merged schema of every assembled module.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    types: BTreeMap<String, MergedType>,
}

#[derive(Debug, Clone)]
struct MergedType {
    kind: TypeKind,
    fields: BTreeMap<String, (FieldDef, String)>,
}

impl Schema {
    /// Inserts a field. On collision returns the module that already owns it.
    pub(crate) fn insert(
        &mut self,
        type_name: &str,
        kind: TypeKind,
        field: FieldDef,
        module: &str,
    ) -> Result<(), String> {
        let merged = self
            .types
            .entry(type_name.to_string())
            .or_insert_with(|| MergedType {
                kind,
                fields: BTreeMap::new(),
            });

        if let Some((_, owner)) = merged.fields.get(&field.name) {
            return Err(owner.clone());
        }
        merged
            .fields
            .insert(field.name.clone(), (field, module.to_string()));
        Ok(())
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    pub fn field(&self, type_name: &str, field: &str) -> Option<&FieldDef> {
        self.types
            .get(type_name)?
            .fields
            .get(field)
            .map(|(def, _)| def)
    }

    /// Name of the module that defined `type_name.field`.
    pub fn owner(&self, type_name: &str, field: &str) -> Option<&str> {
        self.types
            .get(type_name)?
            .fields
            .get(field)
            .map(|(_, owner)| owner.as_str())
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn field_count(&self) -> usize {
        self.types.values().map(|t| t.fields.len()).sum()
    }

    /// Renders the schema as SDL, types and fields sorted by name.
    pub fn to_sdl(&self) -> String {
        let mut out = String::new();
        for (name, merged) in &self.types {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "{} {} {{", merged.kind.keyword(), name);
            for (def, _) in merged.fields.values() {
                let _ = writeln!(out, "  {}", def.render());
            }
            out.push_str("}\n");
        }
        out
    }
}
