//! Idiom recognition.
//!
//! [`recognize`] scans a table's columns once, left to right, and turns them
//! into [`Token`]s. Runs of columns that match a builder shorthand collapse
//! into one token in place; everything else becomes a plain column. Standalone
//! indexes follow the columns in catalog order.

use std::collections::{HashMap, HashSet};

use crate::introspect::{ColumnDescriptor, DefaultValue, ForeignKeyDescriptor, IndexDescriptor, TableDescriptor};
use crate::types::{ColumnType, DEFAULT_PRECISION};

/// Conventional name of the surrogate key column.
pub const IDENTITY_COLUMN: &str = "id";

/// Width of the conventional `remember_token` column.
pub const REMEMBER_TOKEN_LENGTH: u32 = 100;

const UUID_WIDTH: u32 = 36;
const ULID_WIDTH: u32 = 26;

/// Key type of a polymorphic relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphFlavor {
    /// Unsigned big integer key.
    Integer,
    /// UUID key.
    Uuid,
    /// ULID key.
    Ulid,
}

/// A plain column with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnToken {
    pub name: String,
    pub ty: ColumnType,
    /// Length, only when it differs from the type's implicit one.
    pub length: Option<u32>,
    /// Precision and scale, always set for decimal-family types.
    pub precision: Option<(u32, u32)>,
    /// Allowed values for enum/set columns.
    pub values: Vec<String>,
    pub unsigned: bool,
    pub nullable: bool,
    /// Carries a single-column unique index inline.
    pub unique: bool,
    /// Sole primary-key column.
    pub primary: bool,
    pub default: Option<DefaultValue>,
    pub autoincrement: bool,
    pub comment: Option<String>,
}

/// One emission unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Auto-increment surrogate key, e.g. `id()` or `increments('id')`.
    Identity { column: String, method: &'static str },
    /// `X_type` + `X_id` pair and their composite index.
    Morphs { name: String, flavor: MorphFlavor, nullable: bool },
    /// `created_at` + `updated_at`.
    Timestamps { tz: bool },
    /// Nullable `deleted_at`.
    SoftDeletes { tz: bool },
    /// Nullable `remember_token` string of width 100.
    RememberToken,
    /// Any other column.
    Column(ColumnToken),
    /// Composite (or otherwise not inlined) primary key.
    Primary { name: String, columns: Vec<String> },
    /// Standalone index.
    Index { name: String, columns: Vec<String>, unique: bool },
}

/// Everything needed to render one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlueprint {
    pub table: String,
    pub tokens: Vec<Token>,
    pub foreign_keys: Vec<ForeignKeyDescriptor>,
}

fn column_type(column: &ColumnDescriptor) -> ColumnType {
    ColumnType::from_catalog(&column.type_name)
}

fn morph_flavor(column: &ColumnDescriptor) -> Option<MorphFlavor> {
    let ty = column_type(column);
    match (ty, column.length) {
        (ColumnType::Uuid, _) => Some(MorphFlavor::Uuid),
        (ColumnType::String | ColumnType::Char, Some(UUID_WIDTH)) => Some(MorphFlavor::Uuid),
        (ColumnType::Char, Some(ULID_WIDTH)) => Some(MorphFlavor::Ulid),
        (ty, _) if ty.is_integer() => Some(MorphFlavor::Integer),
        _ => None,
    }
}

fn is_bare(column: &ColumnDescriptor) -> bool {
    column.default.is_none() && !column.autoincrement && column.comment.is_none()
}

fn is_nullable_instant(column: Option<&ColumnDescriptor>, name: &str) -> Option<bool> {
    let column = column.filter(|c| c.name == name && c.nullable && is_bare(c))?;
    let ty = column_type(column);
    ty.is_instant().then(|| ty.has_time_zone())
}

/// Match an `X_type`/`X_id` pair at `i`. The pair only collapses when its
/// non-unique `[X_type, X_id]` index exists, which is returned alongside.
fn match_morphs<'t>(table: &'t TableDescriptor, i: usize) -> Option<(Token, &'t IndexDescriptor)> {
    let columns = &table.columns;
    let ty_col = columns.get(i)?;
    let id_col = columns.get(i + 1)?;
    let name = ty_col.name.strip_suffix("_type").filter(|n| !n.is_empty())?;

    if id_col.name != format!("{}_id", name) || ty_col.nullable != id_col.nullable {
        return None;
    }
    if column_type(ty_col) != ColumnType::String
        || !matches!(ty_col.length, None | Some(crate::types::DEFAULT_STRING_LENGTH))
        || !is_bare(ty_col)
        || !is_bare(id_col)
    {
        return None;
    }

    let flavor = morph_flavor(id_col)?;
    let index = table
        .indexes
        .iter()
        .find(|idx| {
            !idx.unique
                && !idx.primary
                && matches!(idx.columns.as_slice(), [a, b] if *a == ty_col.name && *b == id_col.name)
        })?;

    Some((
        Token::Morphs {
            name: name.to_string(),
            flavor,
            nullable: ty_col.nullable,
        },
        index,
    ))
}

fn plain_column(
    column: &ColumnDescriptor,
    unique: bool,
    primary: bool,
) -> ColumnToken {
    let ty = column_type(column);

    let length = match (ty.default_length(), column.length) {
        (Some(implicit), Some(declared)) if declared != implicit => Some(declared),
        _ => None,
    };

    let precision = ty.is_decimal_family().then(|| match (column.precision, column.scale) {
        (Some(p), s) => (p, s.unwrap_or(0)),
        (None, _) => DEFAULT_PRECISION,
    });

    let default = match (&column.default, ty) {
        (Some(DefaultValue::Int(v @ (0 | 1))), ColumnType::Boolean) => Some(DefaultValue::Bool(*v == 1)),
        (other, _) => other.clone(),
    };

    ColumnToken {
        name: column.name.clone(),
        ty,
        length,
        precision,
        values: if ty.is_enumerated() { column.enum_values.clone() } else { Vec::new() },
        unsigned: column.unsigned && (ty.is_integer() || ty.is_decimal_family()),
        nullable: column.nullable,
        unique,
        primary: primary && !column.autoincrement,
        default,
        autoincrement: column.autoincrement,
        comment: column.comment.clone(),
    }
}

/// Turn a table snapshot into its token sequence.
pub fn recognize(table: &TableDescriptor) -> TableBlueprint {
    let columns = &table.columns;
    let primary = table.primary_key();
    let single_pk = primary.filter(|pk| pk.columns.len() == 1).map(|pk| pk.columns[0].as_str());

    // Single-column unique indexes, keyed by column; first one wins.
    let mut inline_unique: HashMap<&str, &IndexDescriptor> = HashMap::new();
    for index in table.indexes.iter().filter(|i| i.unique && !i.primary && i.columns.len() == 1) {
        inline_unique.entry(index.columns[0].as_str()).or_insert(index);
    }

    let mut absorbed: HashSet<&str> = HashSet::new();
    let mut pk_inlined = false;
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < columns.len() {
        let column = &columns[i];
        let ty = column_type(column);

        if column.name == IDENTITY_COLUMN
            && column.autoincrement
            && primary.is_none_or(|pk| pk.columns == [IDENTITY_COLUMN])
        {
            if let Some(method) = ty.increments_method() {
                tokens.push(Token::Identity {
                    column: column.name.clone(),
                    method,
                });
                pk_inlined = true;
                i += 1;
                continue;
            }
        }

        if let Some((token, index)) = match_morphs(table, i) {
            absorbed.insert(index.name.as_str());
            tokens.push(token);
            i += 2;
            continue;
        }

        if column.name == "created_at" {
            if let (Some(a), Some(b)) = (
                is_nullable_instant(Some(column), "created_at"),
                is_nullable_instant(columns.get(i + 1), "updated_at"),
            ) {
                tokens.push(Token::Timestamps { tz: a || b });
                i += 2;
                continue;
            }
        }

        if let Some(tz) = is_nullable_instant(Some(column), "deleted_at") {
            tokens.push(Token::SoftDeletes { tz });
            i += 1;
            continue;
        }

        if column.name == "remember_token"
            && column.nullable
            && is_bare(column)
            && ty == ColumnType::String
            && column.length == Some(REMEMBER_TOKEN_LENGTH)
        {
            tokens.push(Token::RememberToken);
            i += 1;
            continue;
        }

        let unique = match inline_unique.get(column.name.as_str()) {
            Some(index) => {
                absorbed.insert(index.name.as_str());
                true
            }
            None => false,
        };
        let is_pk = single_pk == Some(column.name.as_str());
        pk_inlined |= is_pk;
        tokens.push(Token::Column(plain_column(column, unique, is_pk)));
        i += 1;
    }

    if let Some(pk) = primary.filter(|_| !pk_inlined) {
        tokens.push(Token::Primary {
            name: pk.name.clone(),
            columns: pk.columns.clone(),
        });
    }

    for index in table
        .indexes
        .iter()
        .filter(|idx| !idx.primary && !absorbed.contains(idx.name.as_str()))
    {
        tokens.push(Token::Index {
            name: index.name.clone(),
            columns: index.columns.clone(),
            unique: index.unique,
        });
    }

    TableBlueprint {
        table: table.name.clone(),
        tokens,
        foreign_keys: table.foreign_keys.clone(),
    }
}
