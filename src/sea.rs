//! Sea-ORM backed [`Queryable`].
//!
//! Criteria keys and sort keys must name columns of the entity. Values arrive
//! as strings and are bound with the Rust type matching the column's SQL type,
//! so `views=45` compares an integer column against an integer.
//!
//! Narrowing never fails on the spot: an unknown field or a value that does not
//! fit its column is remembered and returned as a protocol error by the first
//! `count`, `slice` or `all`.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ColumnType, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Select,
    sea_query::{Alias, Expr, Func, LikeExpr, OrderedStatement, SimpleExpr},
};
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::DataTablesError;
use crate::filter::{Criteria, Lookup, is_truthy, parse_lookup};
use crate::queryable::Queryable;
use crate::sort::SortKey;

/// Escape LIKE wildcards so user input only matches literally.
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn like(pattern: String) -> LikeExpr {
    LikeExpr::new(pattern).escape('\\')
}

/// Substring and prefix/suffix lookups. Any other lookup is treated as `contains`.
fn pattern_expr(column: Expr, lookup: Lookup, value: &str) -> SimpleExpr {
    let escaped = escape_like_wildcards(value);
    match lookup {
        Lookup::IContains => Expr::expr(Func::lower(column)).like(like(format!(
            "%{}%",
            escape_like_wildcards(&value.to_lowercase())
        ))),
        Lookup::StartsWith => column.like(like(format!("{escaped}%"))),
        Lookup::EndsWith => column.like(like(format!("%{escaped}"))),
        _ => column.like(like(format!("%{escaped}%"))),
    }
}

fn resolve<E: EntityTrait>(field: &str) -> Result<E::Column, DataTablesError> {
    E::Column::from_str(field).map_err(|_| DataTablesError::unknown_field(field))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Convert a filter value to the type of its column.
fn typed_value(
    field: &str,
    column_type: &ColumnType,
    value: &str,
) -> Result<sea_orm::Value, DataTablesError> {
    let invalid = || DataTablesError::invalid_filter_value(field, value);
    let trimmed = value.trim();

    Ok(match column_type {
        ColumnType::TinyInteger | ColumnType::SmallInteger | ColumnType::Integer => {
            trimmed.parse::<i32>().map_err(|_| invalid())?.into()
        }
        ColumnType::BigInteger => trimmed.parse::<i64>().map_err(|_| invalid())?.into(),
        ColumnType::TinyUnsigned | ColumnType::SmallUnsigned | ColumnType::Unsigned => {
            trimmed.parse::<u32>().map_err(|_| invalid())?.into()
        }
        ColumnType::BigUnsigned => trimmed.parse::<u64>().map_err(|_| invalid())?.into(),
        ColumnType::Float => trimmed.parse::<f32>().map_err(|_| invalid())?.into(),
        ColumnType::Double | ColumnType::Decimal(_) | ColumnType::Money(_) => {
            trimmed.parse::<f64>().map_err(|_| invalid())?.into()
        }
        ColumnType::Boolean => parse_bool(trimmed).ok_or_else(invalid)?.into(),
        ColumnType::Uuid => Uuid::parse_str(trimmed).map_err(|_| invalid())?.into(),
        _ => value.into(),
    })
}

/// Translate a single criteria entry on entity `E` into a SQL expression.
///
/// # Errors
///
/// [`DataTablesError::UnknownField`] when the field is not a column of `E`,
/// [`DataTablesError::InvalidFilterValue`] when a value does not fit the column type.
pub fn lookup_expr<E: EntityTrait>(
    key: &str,
    value: Option<&str>,
) -> Result<SimpleExpr, DataTablesError> {
    let (field, lookup) = parse_lookup(key);
    let column = resolve::<E>(field)?;
    let def = column.def();
    let column_type = def.get_column_type();
    let col = Expr::col(column);

    let Some(value) = value else {
        return Ok(match lookup {
            Lookup::Ne => col.is_not_null(),
            Lookup::Exact | Lookup::IsNull => col.is_null(),
            // comparing against NULL never matches
            _ => Expr::val(1).eq(0),
        });
    };
    let bind = |value: &str| typed_value(field, column_type, value);

    Ok(match lookup {
        Lookup::Exact => col.eq(bind(value)?),
        Lookup::Ne => col.ne(bind(value)?),
        Lookup::Gt => col.gt(bind(value)?),
        Lookup::Gte => col.gte(bind(value)?),
        Lookup::Lt => col.lt(bind(value)?),
        Lookup::Lte => col.lte(bind(value)?),
        Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith => {
            pattern_expr(col, lookup, value)
        }
        Lookup::IsNull => {
            if is_truthy(Some(value)) {
                col.is_null()
            } else {
                col.is_not_null()
            }
        }
        Lookup::In => col.is_in(
            value
                .split(',')
                .map(|part| bind(part.trim()))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

/// AND of every criteria entry.
///
/// # Errors
///
/// See [`lookup_expr`].
pub fn criteria_condition<E: EntityTrait>(criteria: &Criteria) -> Result<Condition, DataTablesError> {
    criteria
        .iter()
        .try_fold(Condition::all(), |condition, (key, value)| -> Result<_, DataTablesError> {
            Ok(condition.add(lookup_expr::<E>(key, value)?))
        })
}

/// Keeps rows for which at least one criterion is not definitely true.
///
/// A plain `NOT (a AND b)` would also drop rows where a compared field is NULL,
/// so those are kept explicitly.
///
/// # Errors
///
/// See [`lookup_expr`].
pub fn exclusion_condition<E: EntityTrait>(criteria: &Criteria) -> Result<Condition, DataTablesError> {
    criteria
        .iter()
        .try_fold(Condition::any(), |condition, (key, value)| -> Result<_, DataTablesError> {
            let negated = Condition::all().add(lookup_expr::<E>(key, value)?).not();
            let (field, lookup) = parse_lookup(key);
            Ok(if value.is_some() && lookup != Lookup::IsNull {
                condition
                    .add(negated)
                    .add(Expr::col(resolve::<E>(field)?).is_null())
            } else {
                condition.add(negated)
            })
        })
}

/// OR of case-insensitive substring matches over `columns`.
///
/// Suitable as the global-search builder for a Sea-ORM backed table. Column
/// names are taken as given, so they should come from the server, not the client.
#[must_use]
pub fn contains_any(columns: &[&str], term: &str) -> Condition {
    columns.iter().fold(Condition::any(), |condition, name| {
        condition.add(pattern_expr(Expr::col(Alias::new(*name)), Lookup::IContains, term))
    })
}

/// A lazily built `SELECT` over an entity plus the connection to run it on.
#[derive(Debug, Clone)]
pub struct SeaQuery<E: EntityTrait> {
    select: Select<E>,
    db: DatabaseConnection,
    rejected: Option<DataTablesError>,
}

impl<E: EntityTrait> SeaQuery<E> {
    /// Start from `E::find()`.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self::from_select(E::find(), db)
    }

    /// Start from an existing select, e.g. one already scoped to a tenant.
    #[must_use]
    pub const fn from_select(select: Select<E>, db: DatabaseConnection) -> Self {
        Self {
            select,
            db,
            rejected: None,
        }
    }

    /// The select built so far.
    ///
    /// # Errors
    ///
    /// The first unknown field or invalid value met while narrowing.
    pub fn into_select(self) -> Result<Select<E>, DataTablesError> {
        match self.rejected {
            Some(err) => Err(err),
            None => Ok(self.select),
        }
    }

    fn reject(mut self, err: DataTablesError) -> Self {
        if self.rejected.is_none() {
            tracing::debug!(error = %err, "Rejecting table query");
            self.rejected = Some(err);
        }
        self
    }

    fn ensure_valid(&self) -> Result<(), DataTablesError> {
        self.rejected.clone().map_or(Ok(()), Err)
    }
}

#[async_trait]
impl<E> Queryable for SeaQuery<E>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    type Item = E::Model;
    type Predicate = Condition;

    fn filter(mut self, criteria: &Criteria) -> Self {
        if criteria.is_empty() {
            return self;
        }
        match criteria_condition::<E>(criteria) {
            Ok(condition) => {
                self.select = self.select.filter(condition);
                self
            }
            Err(err) => self.reject(err),
        }
    }

    fn exclude(mut self, criteria: &Criteria) -> Self {
        if criteria.is_empty() {
            return self;
        }
        match exclusion_condition::<E>(criteria) {
            Ok(condition) => {
                self.select = self.select.filter(condition);
                self
            }
            Err(err) => self.reject(err),
        }
    }

    fn order_by(mut self, keys: &[SortKey]) -> Self {
        QueryOrder::query(&mut self.select).clear_order_by();
        for key in keys {
            match resolve::<E>(&key.field) {
                Ok(column) => {
                    let expr: SimpleExpr = Expr::col(column).into();
                    self.select = self.select.order_by(expr, key.direction.into());
                }
                Err(err) => return self.reject(err),
            }
        }
        self
    }

    fn filter_predicate(mut self, predicate: Condition) -> Self {
        self.select = self.select.filter(predicate);
        self
    }

    async fn count(&self) -> Result<u64, DataTablesError> {
        self.ensure_valid()?;
        Ok(self.select.clone().count(&self.db).await?)
    }

    async fn slice(&self, start: u64, end: u64) -> Result<Vec<E::Model>, DataTablesError> {
        self.ensure_valid()?;
        let limit = end.saturating_sub(start);
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .select
            .clone()
            .offset(start)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    async fn all(&self) -> Result<Vec<E::Model>, DataTablesError> {
        self.ensure_valid()?;
        Ok(self.select.clone().all(&self.db).await?)
    }
}
