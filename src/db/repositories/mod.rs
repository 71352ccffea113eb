//! Query interfaces over the relational store
//!
//! Handlers and services only see the traits; the Postgres implementations are
//! wired in `main`, tests substitute their own.

pub mod favorites;
pub mod movies;
pub mod users;

pub use favorites::{FavoriteRepository, PgFavoriteRepository};
pub use movies::{MovieRepository, PgMovieRepository};
pub use users::{PgUserRepository, UserRepository};

#[cfg(test)]
pub use favorites::MockFavoriteRepository;
#[cfg(test)]
pub use movies::MockMovieRepository;
#[cfg(test)]
pub use users::MockUserRepository;
