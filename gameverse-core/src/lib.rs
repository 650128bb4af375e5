//! Core library for the game catalog: game and user models, document stores,
//! account lifecycle (registration, tokens, email verification) and catalog queries.

pub mod catalog;
mod error;
pub mod mail;
mod models;
pub mod store;
pub mod user;

pub use catalog::{Catalog, CatalogFilters, CatalogListing, CatalogPage, CatalogParams, CatalogQuery};
pub use error::{GameVerseError, Result};
pub use models::{Game, ImageResource, MultilingualList, MultilingualText};
pub use store::{GameStore, MemoryStore, MongoStore, UserStore};
pub use user::{
    AccessClaims, AccountManager, LibraryAction, LibraryToggle, LoginRequest, RegisterRequest,
    SessionTokens, TokenSecrets, User, UserProfile, VerificationOutcome,
};
