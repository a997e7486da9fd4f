//! Mapping from normalized catalog type names to schema-builder column types.

use std::fmt;

/// Length the builder assumes for `string` and `char` columns.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

/// Precision and scale emitted for decimal-family columns the catalog
/// reports none for.
pub const DEFAULT_PRECISION: (u32, u32) = (8, 2);

/// A schema-builder column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    // Integers
    BigInteger,
    Integer,
    MediumInteger,
    SmallInteger,
    TinyInteger,
    Boolean,
    // Strings
    String,
    Char,
    Text,
    TinyText,
    MediumText,
    LongText,
    // Temporal
    Date,
    DateTime,
    DateTimeTz,
    Timestamp,
    TimestampTz,
    Time,
    TimeTz,
    Year,
    // Numeric
    Decimal,
    Float,
    Double,
    // Structured
    Json,
    Jsonb,
    Binary,
    Uuid,
    Enum,
    Set,
    IpAddress,
    MacAddress,
    // Spatial
    Geometry,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl ColumnType {
    /// Map a normalized catalog type name. Unknown names map to
    /// [`ColumnType::String`].
    pub fn from_catalog(type_name: &str) -> Self {
        match type_name.trim().to_lowercase().as_str() {
            "bigint" => Self::BigInteger,
            "integer" | "int" => Self::Integer,
            "mediumint" => Self::MediumInteger,
            "smallint" => Self::SmallInteger,
            "tinyint" => Self::TinyInteger,
            "boolean" | "bit" => Self::Boolean,

            "varchar" | "nvarchar" | "string" | "citext" => Self::String,
            "char" | "nchar" => Self::Char,
            "text" | "ntext" | "clob" => Self::Text,
            "tinytext" => Self::TinyText,
            "mediumtext" => Self::MediumText,
            "longtext" => Self::LongText,

            "date" => Self::Date,
            "datetime" | "datetime2" | "smalldatetime" => Self::DateTime,
            "datetimeoffset" => Self::DateTimeTz,
            "timestamp" => Self::Timestamp,
            "timestamptz" => Self::TimestampTz,
            "time" => Self::Time,
            "timetz" => Self::TimeTz,
            "year" => Self::Year,

            "decimal" | "money" | "smallmoney" => Self::Decimal,
            "float" | "real" => Self::Float,
            "double" => Self::Double,

            "json" => Self::Json,
            "jsonb" => Self::Jsonb,
            "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "bytea"
            | "image" => Self::Binary,
            "uuid" | "uniqueidentifier" => Self::Uuid,
            "enum" => Self::Enum,
            "set" => Self::Set,
            "inet" => Self::IpAddress,
            "macaddr" => Self::MacAddress,

            "geometry" | "geography" => Self::Geometry,
            "point" => Self::Point,
            "linestring" => Self::LineString,
            "polygon" => Self::Polygon,
            "multipoint" => Self::MultiPoint,
            "multilinestring" => Self::MultiLineString,
            "multipolygon" => Self::MultiPolygon,
            "geometrycollection" | "geomcollection" => Self::GeometryCollection,

            _ => Self::String,
        }
    }

    /// Builder method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::BigInteger => "bigInteger",
            Self::Integer => "integer",
            Self::MediumInteger => "mediumInteger",
            Self::SmallInteger => "smallInteger",
            Self::TinyInteger => "tinyInteger",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Char => "char",
            Self::Text => "text",
            Self::TinyText => "tinyText",
            Self::MediumText => "mediumText",
            Self::LongText => "longText",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::DateTimeTz => "dateTimeTz",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestampTz",
            Self::Time => "time",
            Self::TimeTz => "timeTz",
            Self::Year => "year",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Json => "json",
            Self::Jsonb => "jsonb",
            Self::Binary => "binary",
            Self::Uuid => "uuid",
            Self::Enum => "enum",
            Self::Set => "set",
            Self::IpAddress => "ipAddress",
            Self::MacAddress => "macAddress",
            Self::Geometry => "geometry",
            Self::Point => "point",
            Self::LineString => "lineString",
            Self::Polygon => "polygon",
            Self::MultiPoint => "multiPoint",
            Self::MultiLineString => "multiLineString",
            Self::MultiPolygon => "multiPolygon",
            Self::GeometryCollection => "geometryCollection",
        }
    }

    /// Integer family, including tiny integers but not booleans.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::BigInteger | Self::Integer | Self::MediumInteger | Self::SmallInteger | Self::TinyInteger
        )
    }

    /// Types that take a length argument.
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String | Self::Char)
    }

    /// Types that always take a precision/scale pair.
    pub fn is_decimal_family(&self) -> bool {
        matches!(self, Self::Decimal | Self::Float | Self::Double)
    }

    /// Date and time types.
    pub fn is_temporal(&self) -> bool {
        matches!(
            self,
            Self::Date
                | Self::DateTime
                | Self::DateTimeTz
                | Self::Timestamp
                | Self::TimestampTz
                | Self::Time
                | Self::TimeTz
        )
    }

    /// Date-time types usable for the audit and soft-delete idioms.
    pub fn is_instant(&self) -> bool {
        matches!(self, Self::DateTime | Self::DateTimeTz | Self::Timestamp | Self::TimestampTz)
    }

    /// Temporal types that carry a time zone.
    pub fn has_time_zone(&self) -> bool {
        matches!(self, Self::DateTimeTz | Self::TimestampTz | Self::TimeTz)
    }

    /// Types whose values are enumerated.
    pub fn is_enumerated(&self) -> bool {
        matches!(self, Self::Enum | Self::Set)
    }

    /// Identity-column method for an auto-increment integer of this width.
    pub fn increments_method(&self) -> Option<&'static str> {
        match self {
            Self::BigInteger => Some("id"),
            Self::Integer => Some("increments"),
            Self::MediumInteger => Some("mediumIncrements"),
            Self::SmallInteger => Some("smallIncrements"),
            Self::TinyInteger => Some("tinyIncrements"),
            _ => None,
        }
    }

    /// Length the builder applies when none is given.
    pub fn default_length(&self) -> Option<u32> {
        self.is_string().then_some(DEFAULT_STRING_LENGTH)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_catalog() {
        assert_eq!(ColumnType::from_catalog("bigint"), ColumnType::BigInteger);
        assert_eq!(ColumnType::from_catalog("varchar"), ColumnType::String);
        assert_eq!(ColumnType::from_catalog("timestamptz"), ColumnType::TimestampTz);
        assert_eq!(ColumnType::from_catalog("bytea"), ColumnType::Binary);
        assert_eq!(ColumnType::from_catalog("uniqueidentifier"), ColumnType::Uuid);
        assert_eq!(ColumnType::from_catalog("jsonb"), ColumnType::Jsonb);
        assert_eq!(ColumnType::from_catalog("enum"), ColumnType::Enum);
        assert_eq!(ColumnType::from_catalog("point"), ColumnType::Point);
    }

    #[test]
    fn test_unknown_maps_to_string() {
        assert_eq!(ColumnType::from_catalog("tsvector"), ColumnType::String);
        assert_eq!(ColumnType::from_catalog("integer[]"), ColumnType::String);
        assert_eq!(ColumnType::from_catalog(""), ColumnType::String);
    }

    #[test]
    fn test_families() {
        assert!(ColumnType::TinyInteger.is_integer());
        assert!(!ColumnType::Boolean.is_integer());
        assert!(ColumnType::Double.is_decimal_family());
        assert!(ColumnType::TimestampTz.has_time_zone());
        assert!(!ColumnType::Timestamp.has_time_zone());
        assert!(!ColumnType::Date.is_instant());
        assert_eq!(ColumnType::Char.default_length(), Some(255));
        assert_eq!(ColumnType::Text.default_length(), None);
    }

    #[test]
    fn test_increments_method() {
        assert_eq!(ColumnType::BigInteger.increments_method(), Some("id"));
        assert_eq!(ColumnType::SmallInteger.increments_method(), Some("smallIncrements"));
        assert_eq!(ColumnType::String.increments_method(), None);
    }
}
