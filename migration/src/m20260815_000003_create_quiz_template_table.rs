use sea_orm_migration::prelude::*;

/// Creates the `quiz_template` table. Slides are stored as a JSON document;
/// the live path only ever reads a template to freeze a snapshot into a session.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum QuizTemplate {
    Table,
    Id,
    Name,
    AuthorId,
    Slides,
    IsPublic,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(QuizTemplate::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(QuizTemplate::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(QuizTemplate::Name).string_len(200).not_null())
                    .col(ColumnDef::new(QuizTemplate::AuthorId).uuid().not_null())
                    .col(ColumnDef::new(QuizTemplate::Slides).json().not_null())
                    .col(
                        ColumnDef::new(QuizTemplate::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(QuizTemplate::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(QuizTemplate::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_quiz_template_author_id")
                            .from(QuizTemplate::Table, QuizTemplate::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(QuizTemplate::Table).to_owned())
            .await
    }
}
