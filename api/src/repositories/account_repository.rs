use std::sync::Arc;

use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::sea_query::{Expr, LikeExpr, SimpleExpr};
use sea_orm::{ActiveValue, Condition, QueryOrder, QuerySelect, SqlErr};
use shared::entity::accounts;
use shared::validation::{AccountFilter, AccountInput, AccountPatch};

/// True when `e` comes from the `(broker, server, login)` unique index or any other
/// unique constraint.
pub fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// `%text%` with LIKE wildcards in `text` escaped, for use with `ESCAPE '\'`.
fn substring_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn contains_text(column: accounts::Column, pattern: &str) -> SimpleExpr {
    Expr::col(column).like(LikeExpr::new(pattern).escape('\\'))
}

pub struct AccountRepository {
    db: Arc<DatabaseConnection>,
}

impl AccountRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
    }

    /// Looks an account up by its (broker, server, login) identity.
    pub async fn find_by_identity(
        &self,
        broker: &str,
        server: &str,
        login: &str,
    ) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find()
            .filter(accounts::Column::Broker.eq(broker))
            .filter(accounts::Column::Server.eq(server))
            .filter(accounts::Column::Login.eq(login))
            .one(self.db.as_ref())
            .await
    }

    pub async fn insert(&self, input: &AccountInput) -> Result<accounts::Model, DbErr> {
        let now = Utc::now();
        accounts::ActiveModel {
            broker: ActiveValue::Set(input.broker.clone()),
            server: ActiveValue::Set(input.server.clone()),
            login: ActiveValue::Set(input.login.clone()),
            alias: ActiveValue::Set(input.alias.clone()),
            balance: ActiveValue::Set(input.balance.unwrap_or(0.0)),
            equity: ActiveValue::Set(input.equity.unwrap_or(0.0)),
            margin_level: ActiveValue::Set(input.margin_level.unwrap_or(0.0)),
            status: ActiveValue::Set(input.status.unwrap_or_default().to_string()),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
    }

    /// Upsert path for an existing identity: fields present in the payload replace the
    /// stored ones, absent fields keep their values.
    pub async fn overwrite(
        &self,
        existing: accounts::Model,
        input: &AccountInput,
    ) -> Result<accounts::Model, DbErr> {
        let mut account: accounts::ActiveModel = existing.into();
        if let Some(alias) = &input.alias {
            account.alias = ActiveValue::Set(Some(alias.clone()));
        }
        if let Some(balance) = input.balance {
            account.balance = ActiveValue::Set(balance);
        }
        if let Some(equity) = input.equity {
            account.equity = ActiveValue::Set(equity);
        }
        if let Some(margin_level) = input.margin_level {
            account.margin_level = ActiveValue::Set(margin_level);
        }
        if let Some(status) = input.status {
            account.status = ActiveValue::Set(status.to_string());
        }
        account.updated_at = ActiveValue::Set(Utc::now());
        account.update(self.db.as_ref()).await
    }

    pub async fn apply_patch(
        &self,
        existing: accounts::Model,
        patch: &AccountPatch,
    ) -> Result<accounts::Model, DbErr> {
        let mut account: accounts::ActiveModel = existing.into();
        if let Some(broker) = &patch.broker {
            account.broker = ActiveValue::Set(broker.clone());
        }
        if let Some(server) = &patch.server {
            account.server = ActiveValue::Set(server.clone());
        }
        if let Some(login) = &patch.login {
            account.login = ActiveValue::Set(login.clone());
        }
        if let Some(alias) = &patch.alias {
            account.alias = ActiveValue::Set(Some(alias.clone()).filter(|a| !a.is_empty()));
        }
        if let Some(balance) = patch.balance {
            account.balance = ActiveValue::Set(balance);
        }
        if let Some(equity) = patch.equity {
            account.equity = ActiveValue::Set(equity);
        }
        if let Some(margin_level) = patch.margin_level {
            account.margin_level = ActiveValue::Set(margin_level);
        }
        if let Some(status) = patch.status {
            account.status = ActiveValue::Set(status.to_string());
        }
        account.updated_at = ActiveValue::Set(Utc::now());
        account.update(self.db.as_ref()).await
    }

    pub async fn delete(&self, id: i32) -> Result<u64, DbErr> {
        let result = accounts::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }

    /// Equality filters and the free-text search are AND-ed; the search itself is an
    /// OR across broker, server, login and alias.
    pub async fn list(&self, filter: &AccountFilter) -> Result<Vec<accounts::Model>, DbErr> {
        let mut condition = Condition::all();
        if let Some(broker) = &filter.broker {
            condition = condition.add(accounts::Column::Broker.eq(broker.as_str()));
        }
        if let Some(status) = filter.status {
            condition = condition.add(accounts::Column::Status.eq(status.as_str()));
        }
        if let Some(search) = &filter.search {
            let pattern = substring_pattern(search);
            condition = condition.add(
                Condition::any()
                    .add(contains_text(accounts::Column::Broker, &pattern))
                    .add(contains_text(accounts::Column::Server, &pattern))
                    .add(contains_text(accounts::Column::Login, &pattern))
                    .add(contains_text(accounts::Column::Alias, &pattern)),
            );
        }

        accounts::Entity::find()
            .filter(condition)
            .order_by_desc(accounts::Column::CreatedAt)
            .order_by_desc(accounts::Column::Id)
            .limit(filter.page.limit)
            .offset(filter.page.offset)
            .all(self.db.as_ref())
            .await
    }

    pub async fn count(&self) -> Result<u64, DbErr> {
        accounts::Entity::find().count(self.db.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::substring_pattern;

    #[test]
    fn test_substring_pattern_escapes_wildcards() {
        assert_eq!(substring_pattern("demo"), "%demo%");
        assert_eq!(substring_pattern("50%_a"), "%50\\%\\_a%");
        assert_eq!(substring_pattern("a\\b"), "%a\\\\b%");
    }
}
