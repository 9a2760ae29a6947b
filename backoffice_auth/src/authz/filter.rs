use sqlx::{Database, Encode, QueryBuilder, Type};

/// Row predicate compiled from the policy for one principal, module and operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    All,
    Nothing,
    TenantEquals(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    /// `?` placeholders
    Sqlite,
    /// `$n` placeholders numbered from `next_index`
    Postgres { next_index: usize },
}

/// A WHERE-clause fragment and the values for its placeholders, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
    pub clause: String,
    pub binds: Vec<String>,
}

impl RowFilter {
    pub(crate) fn and_tenant(self, tenant: String) -> Self {
        match self {
            RowFilter::All => RowFilter::TenantEquals(tenant),
            RowFilter::TenantEquals(current) if current == tenant => RowFilter::TenantEquals(current),
            RowFilter::TenantEquals(_) | RowFilter::Nothing => RowFilter::Nothing,
        }
    }

    /// In-process check for a row owned by `row_tenant`.
    pub fn matches(&self, row_tenant: Option<&str>) -> bool {
        match self {
            RowFilter::All => true,
            RowFilter::Nothing => false,
            RowFilter::TenantEquals(tenant) => row_tenant == Some(tenant.as_str()),
        }
    }

    /// Render against `column`. The column name is inserted verbatim and must not come from
    /// user input.
    pub fn to_sql(&self, dialect: SqlDialect, column: &str) -> SqlFilter {
        match self {
            RowFilter::All => SqlFilter {
                clause: "1 = 1".to_string(),
                binds: Vec::new(),
            },
            RowFilter::Nothing => SqlFilter {
                clause: "1 = 0".to_string(),
                binds: Vec::new(),
            },
            RowFilter::TenantEquals(tenant) => {
                let placeholder = match dialect {
                    SqlDialect::Sqlite => "?".to_string(),
                    SqlDialect::Postgres { next_index } => format!("${next_index}"),
                };
                SqlFilter {
                    clause: format!("{column} = {placeholder}"),
                    binds: vec![tenant.clone()],
                }
            }
        }
    }

    /// Append the predicate to a query under construction.
    pub fn push_to<'args, DB>(&self, builder: &mut QueryBuilder<'args, DB>, column: &str)
    where
        DB: Database,
        String: 'args + Encode<'args, DB> + Type<DB>,
    {
        match self {
            RowFilter::All => {
                builder.push("1 = 1");
            }
            RowFilter::Nothing => {
                builder.push("1 = 0");
            }
            RowFilter::TenantEquals(tenant) => {
                builder.push(column);
                builder.push(" = ");
                builder.push_bind(tenant.clone());
            }
        }
    }
}
