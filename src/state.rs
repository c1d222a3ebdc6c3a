use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::quotes::QuoteLookup;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub quotes: Arc<dyn QuoteLookup>,
}
