pub use sea_orm_migration::prelude::*;

mod m20260815_000001_create_user_table;
mod m20260815_000002_create_auth_token_table;
mod m20260815_000003_create_quiz_template_table;
mod m20260816_000001_create_game_session_table;
mod m20260816_000002_create_session_answer_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_user_table::Migration),
            Box::new(m20260815_000002_create_auth_token_table::Migration),
            Box::new(m20260815_000003_create_quiz_template_table::Migration),
            Box::new(m20260816_000001_create_game_session_table::Migration),
            Box::new(m20260816_000002_create_session_answer_table::Migration),
        ]
    }
}
