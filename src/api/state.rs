use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::TokenService,
    db::{
        repositories::{
            FavoriteRepository, MovieRepository, PgFavoriteRepository, PgMovieRepository,
            PgUserRepository, UserRepository,
        },
        Cache,
    },
    services::{providers::MovieProvider, CatalogService, RecommendationService},
};

/// Storage handles shared by handlers and services
#[derive(Clone)]
pub struct Repositories {
    pub movies: Arc<dyn MovieRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            movies: Arc::new(PgMovieRepository::new(pool.clone())),
            favorites: Arc::new(PgFavoriteRepository::new(pool.clone())),
            users: Arc::new(PgUserRepository::new(pool)),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub cache: Cache,
    pub movies: Arc<dyn MovieRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub users: Arc<dyn UserRepository>,
    pub provider: Arc<dyn MovieProvider>,
    pub tokens: Arc<TokenService>,
    pub catalog: CatalogService,
    pub recommendations: RecommendationService,
}

impl AppState {
    pub fn new(
        cache: Cache,
        repositories: Repositories,
        provider: Arc<dyn MovieProvider>,
        tokens: TokenService,
    ) -> Self {
        let Repositories {
            movies,
            favorites,
            users,
        } = repositories;

        Self {
            catalog: CatalogService::new(movies.clone(), provider.clone()),
            recommendations: RecommendationService::new(
                movies.clone(),
                favorites.clone(),
                provider.clone(),
            ),
            cache,
            movies,
            favorites,
            users,
            provider,
            tokens: Arc::new(tokens),
        }
    }
}
