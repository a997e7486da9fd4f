//! PHP migration printer.
//!
//! Renders recognized table blueprints into a single Laravel migration
//! class. Output depends only on the input blueprints and their order.

use crate::blueprint::{ColumnToken, MorphFlavor, TableBlueprint, Token};
use crate::introspect::{DefaultValue, ForeignKeyDescriptor, ReferentialAction};

const INDENT: &str = "    ";

/// Escape a value for a single-quoted PHP string literal.
pub fn php_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn php_array(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| php_string(v)).collect();
    format!("[{}]", items.join(", "))
}

fn php_default(value: &DefaultValue) -> String {
    match value {
        DefaultValue::Bool(b) => b.to_string(),
        DefaultValue::Int(i) => i.to_string(),
        DefaultValue::Numeric(n) => n.clone(),
        DefaultValue::String(s) => php_string(s),
        DefaultValue::Expression(e) => format!("DB::raw({})", php_string(e)),
    }
}

/// Printer for the squashed migration class.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationPrinter;

impl MigrationPrinter {
    /// Render the complete migration file.
    ///
    /// Tables are created in the given order, foreign keys attached after
    /// every table exists, and tables dropped in reverse order.
    pub fn print(&self, tables: &[TableBlueprint]) -> String {
        let up = if tables.is_empty() {
            vec![format!("{}// No tables to create.", INDENT.repeat(2))]
        } else {
            let mut blocks: Vec<String> = tables.iter().map(|t| self.create_block(t)).collect();
            blocks.extend(
                tables
                    .iter()
                    .filter(|t| !t.foreign_keys.is_empty())
                    .map(|t| self.foreign_key_block(t)),
            );
            blocks
        };

        let down = if tables.is_empty() {
            format!("{}// No tables to drop.", INDENT.repeat(2))
        } else {
            tables
                .iter()
                .rev()
                .map(|t| format!("{}Schema::dropIfExists({});", INDENT.repeat(2), php_string(&t.table)))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            "<?php

use Illuminate\\Database\\Migrations\\Migration;
use Illuminate\\Database\\Schema\\Blueprint;
use Illuminate\\Support\\Facades\\DB;
use Illuminate\\Support\\Facades\\Schema;

return new class extends Migration
{{
    /**
     * Run the migrations.
     */
    public function up(): void
    {{
{}
    }}

    /**
     * Reverse the migrations.
     */
    public function down(): void
    {{
{}
    }}
}};
",
            up.join("\n\n"),
            down
        )
    }

    fn schema_block(&self, call: &str, table: &str, statements: Vec<String>) -> String {
        let outer = INDENT.repeat(2);
        let inner = INDENT.repeat(3);
        let body: Vec<String> = statements
            .into_iter()
            .map(|s| format!("{}$table->{};", inner, s))
            .collect();

        format!(
            "{outer}Schema::{call}({}, function (Blueprint $table) {{\n{}\n{outer}}});",
            php_string(table),
            body.join("\n"),
        )
    }

    fn create_block(&self, table: &TableBlueprint) -> String {
        let statements = table.tokens.iter().map(|t| self.token(t)).collect();
        self.schema_block("create", &table.table, statements)
    }

    fn foreign_key_block(&self, table: &TableBlueprint) -> String {
        let statements = table.foreign_keys.iter().map(|fk| self.foreign_key(fk)).collect();
        self.schema_block("table", &table.table, statements)
    }

    /// Render one token as a `$table->...` call chain, without the receiver.
    pub fn token(&self, token: &Token) -> String {
        match token {
            Token::Identity { column, method } => {
                if *method == "id" && column == "id" {
                    "id()".to_string()
                } else {
                    format!("{}({})", method, php_string(column))
                }
            }
            Token::Morphs {
                name,
                flavor,
                nullable,
            } => {
                let method = match (flavor, nullable) {
                    (MorphFlavor::Integer, false) => "morphs",
                    (MorphFlavor::Integer, true) => "nullableMorphs",
                    (MorphFlavor::Uuid, false) => "uuidMorphs",
                    (MorphFlavor::Uuid, true) => "nullableUuidMorphs",
                    (MorphFlavor::Ulid, false) => "ulidMorphs",
                    (MorphFlavor::Ulid, true) => "nullableUlidMorphs",
                };
                format!("{}({})", method, php_string(name))
            }
            Token::Timestamps { tz: false } => "timestamps()".to_string(),
            Token::Timestamps { tz: true } => "timestampsTz()".to_string(),
            Token::SoftDeletes { tz: false } => "softDeletes()".to_string(),
            Token::SoftDeletes { tz: true } => "softDeletesTz()".to_string(),
            Token::RememberToken => "rememberToken()".to_string(),
            Token::Column(column) => self.column(column),
            Token::Primary { name, columns } => {
                format!("primary({}, {})", php_array(columns), php_string(name))
            }
            Token::Index {
                name,
                columns,
                unique,
            } => {
                let method = if *unique { "unique" } else { "index" };
                format!("{}({}, {})", method, php_array(columns), php_string(name))
            }
        }
    }

    fn column(&self, column: &ColumnToken) -> String {
        let mut args = vec![php_string(&column.name)];

        if let Some(length) = column.length {
            args.push(length.to_string());
        }
        if let Some((precision, scale)) = column.precision {
            args.push(precision.to_string());
            args.push(scale.to_string());
        }
        if column.ty.is_enumerated() {
            args.push(php_array(&column.values));
        }

        let mut call = format!("{}({})", column.ty.method(), args.join(", "));

        if column.unsigned {
            call.push_str("->unsigned()");
        }
        if column.nullable {
            call.push_str("->nullable()");
        }
        if column.unique {
            call.push_str("->unique()");
        }
        if column.primary {
            call.push_str("->primary()");
        }
        if let Some(default) = &column.default {
            call.push_str(&format!("->default({})", php_default(default)));
        }
        if column.autoincrement {
            call.push_str("->autoIncrement()");
        }
        if let Some(comment) = &column.comment {
            call.push_str(&format!("->comment({})", php_string(comment)));
        }

        call
    }

    fn foreign_key(&self, fk: &ForeignKeyDescriptor) -> String {
        let mut call = match &fk.name {
            Some(name) => format!("foreign({}, {})", php_array(&fk.columns), php_string(name)),
            None => format!("foreign({})", php_array(&fk.columns)),
        };

        call.push_str(&format!(
            "->references({})->on({})",
            php_array(&fk.foreign_columns),
            php_string(&fk.foreign_table)
        ));

        for (method, action) in [("onUpdate", fk.on_update), ("onDelete", fk.on_delete)] {
            if let Some(action) = action.filter(|a| *a != ReferentialAction::NoAction) {
                call.push_str(&format!("->{}({})", method, php_string(action.as_sql())));
            }
        }

        call
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnType;
    use pretty_assertions::assert_eq;

    fn plain(name: &str, ty: ColumnType) -> ColumnToken {
        ColumnToken {
            name: name.to_string(),
            ty,
            length: None,
            precision: None,
            values: Vec::new(),
            unsigned: false,
            nullable: false,
            unique: false,
            primary: false,
            default: None,
            autoincrement: false,
            comment: None,
        }
    }

    #[test]
    fn test_php_string_escaping() {
        assert_eq!(php_string("it's"), r"'it\'s'");
        assert_eq!(php_string(r"C:\path"), r"'C:\\path'");
        assert_eq!(php_string(r"\'"), r"'\\\''");
    }

    #[test]
    fn test_empty_schema_keeps_both_methods() {
        let source = MigrationPrinter.print(&[]);
        assert!(source.starts_with("<?php\n"));
        assert!(source.contains("public function up(): void\n    {\n        // No tables to create.\n    }"));
        assert!(source.contains("public function down(): void\n    {\n        // No tables to drop.\n    }"));
        assert!(!source.contains("Schema::create"));
    }

    #[test]
    fn test_modifier_order() {
        let mut column = plain("score", ColumnType::Integer);
        column.unsigned = true;
        column.nullable = true;
        column.unique = true;
        column.default = Some(DefaultValue::Int(0));
        column.comment = Some("Points".into());

        assert_eq!(
            MigrationPrinter.token(&Token::Column(column)),
            "integer('score')->unsigned()->nullable()->unique()->default(0)->comment('Points')"
        );
    }

    #[test]
    fn test_column_arguments() {
        let mut code = plain("code", ColumnType::String);
        code.length = Some(32);
        assert_eq!(MigrationPrinter.token(&Token::Column(code)), "string('code', 32)");

        let mut price = plain("price", ColumnType::Decimal);
        price.precision = Some((10, 2));
        assert_eq!(MigrationPrinter.token(&Token::Column(price)), "decimal('price', 10, 2)");

        let mut status = plain("status", ColumnType::Enum);
        status.values = vec!["draft".into(), "live".into()];
        assert_eq!(
            MigrationPrinter.token(&Token::Column(status)),
            "enum('status', ['draft', 'live'])"
        );
    }

    #[test]
    fn test_defaults() {
        let mut created = plain("seen_at", ColumnType::Timestamp);
        created.default = Some(DefaultValue::Expression("CURRENT_TIMESTAMP".into()));
        assert_eq!(
            MigrationPrinter.token(&Token::Column(created)),
            "timestamp('seen_at')->default(DB::raw('CURRENT_TIMESTAMP'))"
        );

        let mut label = plain("label", ColumnType::String);
        label.default = Some(DefaultValue::String("O'Brien".into()));
        assert_eq!(
            MigrationPrinter.token(&Token::Column(label)),
            r"string('label')->default('O\'Brien')"
        );

        let mut active = plain("active", ColumnType::Boolean);
        active.default = Some(DefaultValue::Bool(false));
        assert_eq!(
            MigrationPrinter.token(&Token::Column(active)),
            "boolean('active')->default(false)"
        );
    }

    #[test]
    fn test_idiom_tokens() {
        let p = MigrationPrinter;
        assert_eq!(
            p.token(&Token::Identity {
                column: "id".into(),
                method: "id"
            }),
            "id()"
        );
        assert_eq!(
            p.token(&Token::Identity {
                column: "id".into(),
                method: "increments"
            }),
            "increments('id')"
        );
        assert_eq!(
            p.token(&Token::Morphs {
                name: "taggable".into(),
                flavor: MorphFlavor::Uuid,
                nullable: true
            }),
            "nullableUuidMorphs('taggable')"
        );
        assert_eq!(p.token(&Token::Timestamps { tz: true }), "timestampsTz()");
        assert_eq!(p.token(&Token::SoftDeletes { tz: false }), "softDeletes()");
        assert_eq!(p.token(&Token::RememberToken), "rememberToken()");
        assert_eq!(
            p.token(&Token::Index {
                name: "posts_a_b_unique".into(),
                columns: vec!["a".into(), "b".into()],
                unique: true
            }),
            "unique(['a', 'b'], 'posts_a_b_unique')"
        );
    }

    #[test]
    fn test_foreign_keys_follow_all_creates_and_drops_reverse() {
        let users = TableBlueprint {
            table: "users".into(),
            tokens: vec![Token::Identity {
                column: "id".into(),
                method: "id",
            }],
            foreign_keys: Vec::new(),
        };
        let posts = TableBlueprint {
            table: "posts".into(),
            tokens: vec![Token::Column(plain("user_id", ColumnType::BigInteger))],
            foreign_keys: vec![ForeignKeyDescriptor {
                name: Some("posts_user_id_foreign".into()),
                columns: vec!["user_id".into()],
                foreign_table: "users".into(),
                foreign_columns: vec!["id".into()],
                on_update: Some(ReferentialAction::NoAction),
                on_delete: Some(ReferentialAction::Cascade),
            }],
        };

        let source = MigrationPrinter.print(&[users, posts]);

        let create_users = source.find("Schema::create('users'").unwrap();
        let create_posts = source.find("Schema::create('posts'").unwrap();
        let attach = source.find("Schema::table('posts'").unwrap();
        assert!(create_users < create_posts && create_posts < attach);

        assert!(source.contains(
            "$table->foreign(['user_id'], 'posts_user_id_foreign')->references(['id'])->on('users')->onDelete('cascade');"
        ));
        assert!(!source.contains("onUpdate"));

        let drop_posts = source.find("Schema::dropIfExists('posts')").unwrap();
        let drop_users = source.find("Schema::dropIfExists('users')").unwrap();
        assert!(drop_posts < drop_users);
    }

    #[test]
    fn test_create_block_layout() {
        let table = TableBlueprint {
            table: "tags".into(),
            tokens: vec![
                Token::Identity {
                    column: "id".into(),
                    method: "id",
                },
                Token::Timestamps { tz: false },
            ],
            foreign_keys: Vec::new(),
        };
        let source = MigrationPrinter.print(&[table]);
        assert!(source.contains(
            "        Schema::create('tags', function (Blueprint $table) {\n            $table->id();\n            $table->timestamps();\n        });"
        ));
    }
}
