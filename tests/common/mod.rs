#![allow(dead_code)]

use datatable_query::RawParameters;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::prelude::*;

pub mod article {
    use sea_orm::entity::prelude::*;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
    #[sea_orm(table_name = "articles")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
        pub status: String,
        pub author: Option<String>,
        pub views: i32,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Route crate logs to the test output; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_test_writer()
        .compact()
        .try_init();
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    seed(&db).await?;
    Ok(db)
}

/// (title, status, author, views)
pub const ARTICLES: &[(&str, &str, Option<&str>, i32)] = &[
    ("Borrowing explained", "published", Some("ana"), 320),
    ("Async in practice", "draft", Some("bo"), 0),
    ("Lifetimes 101", "published", Some("bo"), 870),
    ("Untitled", "draft", None, 3),
    ("Macro tricks", "published", Some("ana"), 45),
    ("Trait objects", "archived", Some("cy"), 120),
];

async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    for (title, status, author, views) in ARTICLES {
        article::ActiveModel {
            title: Set((*title).to_string()),
            status: Set((*status).to_string()),
            author: Set(author.map(str::to_string)),
            views: Set(*views),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Parameters for a grid with the given `(name, search value)` columns.
pub fn grid(columns: &[(&str, &str)], extra: &[(&str, &str)]) -> RawParameters {
    let mut raw: RawParameters = [
        ("draw", "1"),
        ("start", "0"),
        ("length", "10"),
        ("search[value]", ""),
        ("search[regex]", "false"),
    ]
    .into_iter()
    .collect();
    for (i, (name, search)) in columns.iter().enumerate() {
        raw.insert(format!("columns[{i}][data]"), *name);
        raw.insert(format!("columns[{i}][name]"), *name);
        raw.insert(format!("columns[{i}][searchable]"), "true");
        raw.insert(format!("columns[{i}][orderable]"), "true");
        raw.insert(format!("columns[{i}][search][value]"), *search);
        raw.insert(format!("columns[{i}][search][regex]"), "false");
    }
    for (key, value) in extra {
        raw.insert(*key, *value);
    }
    raw
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateArticleTable)]
    }
}

pub struct CreateArticleTable;

impl MigrationName for CreateArticleTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_article_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateArticleTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(ArticleTable)
            .if_not_exists()
            .col(
                ColumnDef::new(ArticleColumn::Id)
                    .integer()
                    .not_null()
                    .auto_increment()
                    .primary_key(),
            )
            .col(ColumnDef::new(ArticleColumn::Title).string().not_null())
            .col(ColumnDef::new(ArticleColumn::Status).string().not_null())
            .col(ColumnDef::new(ArticleColumn::Author).string().null())
            .col(ColumnDef::new(ArticleColumn::Views).integer().not_null())
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ArticleTable).to_owned())
            .await
    }
}

#[derive(Debug)]
pub enum ArticleColumn {
    Id,
    Title,
    Status,
    Author,
    Views,
}

impl Iden for ArticleColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::Title => "title",
                Self::Status => "status",
                Self::Author => "author",
                Self::Views => "views",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct ArticleTable;

impl Iden for ArticleTable {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "articles").unwrap();
    }
}
