use sea_orm_migration::prelude::*;

/// Creates the `session_answer` table: the append-only log of player answers.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum SessionAnswer {
    Table,
    Id,
    SessionId,
    PrincipalId,
    SlideIndex,
    Selected,
    AnsweredAtOffsetMs,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GameSession {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionAnswer::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionAnswer::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionAnswer::SessionId).uuid().not_null())
                    .col(ColumnDef::new(SessionAnswer::PrincipalId).uuid().not_null())
                    .col(
                        ColumnDef::new(SessionAnswer::SlideIndex)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SessionAnswer::Selected).json().not_null())
                    .col(
                        ColumnDef::new(SessionAnswer::AnsweredAtOffsetMs)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionAnswer::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_session_answer_session_id")
                            .from(SessionAnswer::Table, SessionAnswer::SessionId)
                            .to(GameSession::Table, GameSession::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionAnswer::Table).to_owned())
            .await
    }
}
