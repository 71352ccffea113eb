pub mod favorite;
pub mod movie;
pub mod tmdb;
pub mod user;

pub use favorite::{
    CreateFavoriteRequest, Favorite, FavoriteNoteRequest, FavoriteResponse, UpdateFavoriteRequest,
};
pub use movie::{Movie, MoviePage, MovieSummary, NewMovie};
pub use tmdb::{TimeWindow, TmdbGenre, TmdbMovie, TmdbPage};
pub use user::{
    AuthPayload, LoginRequest, RefreshRequest, RegisterRequest, TokenPair, User, UserResponse,
};
