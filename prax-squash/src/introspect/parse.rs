//! Parsers for the free-form text catalogs hand back: declared type specs,
//! default expressions and enum value lists.

use regex_lite::Regex;

use super::DefaultValue;
use crate::catalog::Dialect;

/// A declared type split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSpec {
    /// Normalized base name.
    pub base: String,
    /// Raw text between the parentheses, if any.
    pub args: Option<String>,
    /// `unsigned` attribute present.
    pub unsigned: bool,
}

impl TypeSpec {
    /// Numeric arguments, e.g. `[8, 2]` for `decimal(8,2)`.
    pub fn numeric_args(&self) -> Vec<u32> {
        self.args
            .as_deref()
            .map(|args| args.split(',').filter_map(|a| a.trim().parse().ok()).collect())
            .unwrap_or_default()
    }

    /// First numeric argument.
    pub fn length(&self) -> Option<u32> {
        self.numeric_args().first().copied()
    }

    /// `(precision, scale)` when both are declared.
    pub fn precision_scale(&self) -> Option<(u32, u32)> {
        match self.numeric_args().as_slice() {
            [p, s] => Some((*p, *s)),
            _ => None,
        }
    }
}

/// Split a declared type such as `int(10) unsigned`, `character varying(255)`
/// or `timestamp(0) with time zone`.
pub fn parse_type_spec(raw: &str) -> TypeSpec {
    let raw = raw.trim();
    let (outside, args) = match (raw.find('('), raw.rfind(')')) {
        (Some(open), Some(close)) if close > open => (
            format!("{} {}", &raw[..open], &raw[close + 1..]),
            Some(raw[open + 1..close].to_string()),
        ),
        _ => (raw.to_string(), None),
    };

    let mut unsigned = false;
    let words: Vec<String> = outside
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|w| match w.as_str() {
            "unsigned" => {
                unsigned = true;
                false
            }
            "zerofill" | "signed" => false,
            _ => true,
        })
        .collect();

    TypeSpec {
        base: normalize_type_name(&words.join(" ")),
        args,
        unsigned,
    }
}

/// Fold dialect spellings of the same type onto one canonical name.
pub fn normalize_type_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let folded = match lower.as_str() {
        "character varying" | "varchar2" => "varchar",
        "character" | "bpchar" => "char",
        "timestamp without time zone" => "timestamp",
        "timestamp with time zone" => "timestamptz",
        "time without time zone" => "time",
        "time with time zone" => "timetz",
        "double precision" | "float8" => "double",
        "float4" => "real",
        "int2" | "smallserial" => "smallint",
        "int4" | "int" | "serial" => "integer",
        "int8" | "bigserial" | "unsigned big int" => "bigint",
        "bool" => "boolean",
        "numeric" => "decimal",
        other => other,
    };
    folded.to_string()
}

/// Whether a raw default is a sequence call that marks a serial column.
pub fn is_sequence_default(raw: &str) -> bool {
    raw.trim().to_lowercase().starts_with("nextval(")
}

/// Whether the text is one of the current-timestamp family literals.
pub fn is_current_timestamp(text: &str) -> bool {
    const LITERALS: &[&str] = &[
        "CURRENT_TIMESTAMP",
        "CURRENT_DATE",
        "CURRENT_TIME",
        "LOCALTIMESTAMP",
        "LOCALTIME",
        "NOW(",
        "GETDATE(",
        "GETUTCDATE(",
        "SYSDATETIME(",
        "SYSUTCDATETIME(",
    ];
    let upper = text.trim().to_uppercase();
    LITERALS.iter().any(|lit| upper.starts_with(lit))
}

fn looks_like_expression(text: &str) -> bool {
    is_current_timestamp(text) || text.contains('(')
}

/// Parse a raw catalog default.
///
/// MySQL 8 reports literal defaults without quotes, so bare words are
/// literals there and expressions everywhere else.
pub fn parse_default(raw: &str, dialect: Dialect) -> Option<DefaultValue> {
    let mut text = raw.trim();
    while let Some(inner) = strip_wrapping_parens(text) {
        text = inner.trim();
    }

    let (text, cast) = split_cast(text);
    if text.is_empty() || text.eq_ignore_ascii_case("null") {
        return None;
    }

    if let Some(literal) = quoted_literal(text) {
        let numeric_cast = cast.map(is_numeric_type).unwrap_or(false);
        if numeric_cast {
            if let Some(number) = parse_number(&literal) {
                return Some(number);
            }
        }
        return Some(DefaultValue::String(literal));
    }

    match text.to_lowercase().as_str() {
        "true" => return Some(DefaultValue::Bool(true)),
        "false" => return Some(DefaultValue::Bool(false)),
        _ => {}
    }

    if let Some(number) = parse_number(text) {
        return Some(number);
    }

    if dialect == Dialect::MySql && !looks_like_expression(text) {
        return Some(DefaultValue::String(text.to_string()));
    }

    Some(DefaultValue::Expression(text.to_string()))
}

fn parse_number(text: &str) -> Option<DefaultValue> {
    let text = text.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(DefaultValue::Int(int));
    }
    let numeric = !text.is_empty()
        && text.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        && text.chars().any(|c| c.is_ascii_digit());
    if numeric && text.parse::<f64>().is_ok() {
        return Some(DefaultValue::Numeric(text.to_string()));
    }
    None
}

fn is_numeric_type(cast: &str) -> bool {
    matches!(
        normalize_type_name(parse_type_spec(cast).base.as_str()).as_str(),
        "smallint" | "integer" | "bigint" | "decimal" | "real" | "double"
    )
}

/// Remove one pair of parentheses wrapping the whole text.
fn strip_wrapping_parens(text: &str) -> Option<&str> {
    if !text.starts_with('(') || !text.ends_with(')') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_quote = false;
    for (i, c) in text.char_indices() {
        match c {
            '\'' => in_quote = !in_quote,
            '(' if !in_quote => depth += 1,
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != text.len() - 1 {
                    return None;
                }
            }
            _ => {}
        }
    }

    Some(&text[1..text.len() - 1])
}

/// Split a trailing PostgreSQL `::type` cast that sits outside quotes.
fn split_cast(text: &str) -> (&str, Option<&str>) {
    let mut in_quote = false;
    let mut depth = 0usize;
    let bytes = text.as_bytes();

    for i in 0..bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'(' if !in_quote => depth += 1,
            b')' if !in_quote => depth = depth.saturating_sub(1),
            b':' if !in_quote && depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                return (text[..i].trim(), Some(text[i + 2..].trim()));
            }
            _ => {}
        }
    }

    (text, None)
}

/// The unescaped content of a text that is exactly one quoted literal,
/// optionally with SQL Server's `N` prefix.
fn quoted_literal(text: &str) -> Option<String> {
    let body = text
        .strip_prefix('N')
        .or_else(|| text.strip_prefix('n'))
        .filter(|rest| rest.starts_with('\''))
        .unwrap_or(text);

    if body.len() < 2 || !body.starts_with('\'') || !body.ends_with('\'') {
        return None;
    }

    let literals = quoted_literals(body);
    match literals.as_slice() {
        [single] if body.len() == single.replace('\'', "''").len() + 2 => Some(single.clone()),
        _ => None,
    }
}

/// Every single-quoted literal in the text, unescaped, in order.
pub fn quoted_literals(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut value = String::new();
        loop {
            match chars.next() {
                Some('\'') if chars.peek() == Some(&'\'') => {
                    chars.next();
                    value.push('\'');
                }
                Some('\'') | None => break,
                Some(other) => value.push(other),
            }
        }
        out.push(value);
    }

    out
}

/// Values of a MySQL `enum('a','b')` / `set('a','b')` column type.
pub fn parse_enum_values(column_type: &str) -> Vec<String> {
    let spec = parse_type_spec(column_type);
    match spec.base.as_str() {
        "enum" | "set" => spec.args.as_deref().map(quoted_literals).unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Allowed values from a check constraint restricting `column` to a list.
///
/// Understands `col IN ('a', 'b')` (SQLite, Laravel-generated DDL),
/// `(col)::text = ANY (ARRAY['a'::text, ...])` (PostgreSQL) and
/// `[col]=N'a' OR [col]=N'b'` (SQL Server).
pub fn check_constraint_values(definition: &str, column: &str) -> Option<Vec<String>> {
    let col = regex_lite::escape(column);

    let in_list = format!(r#"(?i)[\["`]?\b{col}\b[\]"`]?\s+IN\s*\(([^)]*)\)"#);
    if let Some(values) = capture_literals(&in_list, definition) {
        return Some(values);
    }

    let any_array = format!(r#"(?i)\(?"?\b{col}\b"?\)?(?:::[a-z ]+)?\s*=\s*ANY\s*\(\s*\(?\s*ARRAY\[([^\]]*)\]"#);
    if let Some(values) = capture_literals(&any_array, definition) {
        return Some(values);
    }

    let or_chain = Regex::new(&format!(r#"(?i)\[{col}\]\s*=\s*N?'((?:[^']|'')*)'"#)).ok()?;
    let values: Vec<String> = or_chain
        .captures_iter(definition)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().replace("''", "'"))
        .collect();

    if values.is_empty() { None } else { Some(values) }
}

fn capture_literals(pattern: &str, text: &str) -> Option<Vec<String>> {
    let re = Regex::new(pattern).ok()?;
    let caps = re.captures(text)?;
    let values = quoted_literals(caps.get(1)?.as_str());
    if values.is_empty() { None } else { Some(values) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_spec() {
        let spec = parse_type_spec("int(10) unsigned");
        assert_eq!(spec.base, "integer");
        assert!(spec.unsigned);
        assert_eq!(spec.length(), Some(10));

        let spec = parse_type_spec("character varying(255)");
        assert_eq!(spec.base, "varchar");
        assert_eq!(spec.length(), Some(255));

        let spec = parse_type_spec("timestamp(0) with time zone");
        assert_eq!(spec.base, "timestamptz");

        let spec = parse_type_spec("numeric(8,2)");
        assert_eq!(spec.base, "decimal");
        assert_eq!(spec.precision_scale(), Some((8, 2)));

        let spec = parse_type_spec("TEXT");
        assert_eq!(spec.base, "text");
        assert_eq!(spec.args, None);
    }

    #[test]
    fn test_normalize_type_name() {
        assert_eq!(normalize_type_name("double precision"), "double");
        assert_eq!(normalize_type_name("int8"), "bigint");
        assert_eq!(normalize_type_name("bpchar"), "char");
        assert_eq!(normalize_type_name("geometry"), "geometry");
    }

    #[test]
    fn test_parse_default_literals() {
        assert_eq!(parse_default("NULL", Dialect::Postgres), None);
        assert_eq!(parse_default("NULL::character varying", Dialect::Postgres), None);
        assert_eq!(parse_default("true", Dialect::Postgres), Some(DefaultValue::Bool(true)));
        assert_eq!(parse_default("42", Dialect::Sqlite), Some(DefaultValue::Int(42)));
        assert_eq!(
            parse_default("1.50", Dialect::MySql),
            Some(DefaultValue::Numeric("1.50".into()))
        );
        assert_eq!(
            parse_default("'active'::character varying", Dialect::Postgres),
            Some(DefaultValue::String("active".into()))
        );
        assert_eq!(
            parse_default("'it''s'", Dialect::Sqlite),
            Some(DefaultValue::String("it's".into()))
        );
        assert_eq!(
            parse_default("'-1'::integer", Dialect::Postgres),
            Some(DefaultValue::Int(-1))
        );
    }

    #[test]
    fn test_parse_default_sql_server() {
        assert_eq!(parse_default("((0))", Dialect::SqlServer), Some(DefaultValue::Int(0)));
        assert_eq!(
            parse_default("(N'draft')", Dialect::SqlServer),
            Some(DefaultValue::String("draft".into()))
        );
        assert_eq!(
            parse_default("(getdate())", Dialect::SqlServer),
            Some(DefaultValue::Expression("getdate()".into()))
        );
    }

    #[test]
    fn test_parse_default_expressions() {
        assert_eq!(
            parse_default("CURRENT_TIMESTAMP", Dialect::Sqlite),
            Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()))
        );
        assert_eq!(
            parse_default("CURRENT_TIMESTAMP", Dialect::MySql),
            Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()))
        );
        assert_eq!(
            parse_default("now()", Dialect::Postgres),
            Some(DefaultValue::Expression("now()".into()))
        );
        assert_eq!(
            parse_default("pending", Dialect::MySql),
            Some(DefaultValue::String("pending".into()))
        );
    }

    #[test]
    fn test_sequence_default() {
        assert!(is_sequence_default("nextval('users_id_seq'::regclass)"));
        assert!(!is_sequence_default("now()"));
    }

    #[test]
    fn test_parse_enum_values() {
        assert_eq!(parse_enum_values("enum('draft','published')"), vec!["draft", "published"]);
        assert_eq!(parse_enum_values("set('a','b''c')"), vec!["a", "b'c"]);
        assert!(parse_enum_values("varchar(255)").is_empty());
    }

    #[test]
    fn test_check_constraint_values() {
        assert_eq!(
            check_constraint_values(
                r#"CREATE TABLE "posts" ("status" varchar check ("status" in ('draft', 'published')) not null)"#,
                "status"
            ),
            Some(vec!["draft".to_string(), "published".to_string()])
        );
        assert_eq!(
            check_constraint_values(
                "CHECK (((status)::text = ANY ((ARRAY['draft'::character varying, 'published'::character varying])::text[])))",
                "status"
            ),
            Some(vec!["draft".to_string(), "published".to_string()])
        );
        assert_eq!(
            check_constraint_values("([status]=N'draft' OR [status]=N'published')", "status"),
            Some(vec!["draft".to_string(), "published".to_string()])
        );
        assert_eq!(check_constraint_values("CHECK (price > 0)", "price"), None);
    }
}
