use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::token::TokenKeys;
use crate::auth::validation::AccountRules;
use crate::config::Config;
use crate::db::experiences::{DynExperienceRepository, SqliteExperienceRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub experiences: DynExperienceRepository,
    pub tokens: TokenKeys,
    pub rules: Arc<AccountRules>,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let experiences: DynExperienceRepository =
            Arc::new(SqliteExperienceRepository::new(db.clone()));
        let tokens = TokenKeys::new(&config.auth.jwt_secret, config.auth.token_days);
        let rules = Arc::new(AccountRules::new()?);

        Ok(Self {
            db,
            config,
            experiences,
            tokens,
            rules,
        })
    }
}
