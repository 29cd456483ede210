//! JSON REST API for Tollgate.
//!
//! Exposes an axum [`Router`] backed by any store implementing
//! [`tollgate_core::store::SessionStore`] and
//! [`tollgate_core::store::LedgerStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility; the payment, identity, and payout
//! collaborators are trusted callers of the callback routes.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, tollgate_api::api_router(store.clone())).await?;
//! ```

pub mod access;
pub mod contents;
pub mod creators;
pub mod error;
pub mod purchases;
pub mod release;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tollgate_core::store::{LedgerStore, SessionStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: SessionStore + LedgerStore + Send + Sync + 'static,
{
  Router::new()
    // Purchases
    .route("/purchases", post(purchases::initiate::<S>))
    .route("/purchases/{id}", get(purchases::get_one::<S>))
    .route("/purchases/{id}/complete", post(purchases::complete::<S>))
    .route("/purchases/{id}/fail", post(purchases::fail::<S>))
    .route("/purchases/{id}/refund", post(purchases::refund::<S>))
    // Content access
    .route("/access/{token}", get(access::verify::<S>))
    // Creators
    .route("/creators", post(creators::create::<S>))
    .route(
      "/creators/{id}/verification",
      post(creators::update_verification::<S>),
    )
    .route("/creators/{id}/balance", get(creators::balance::<S>))
    .route(
      "/creators/{id}/payout-request",
      post(creators::payout_request::<S>),
    )
    .route("/creators/{id}/payouts", post(creators::record_payout::<S>))
    // Contents
    .route("/contents", post(contents::create::<S>))
    .route("/contents/{id}", get(contents::get_one::<S>))
    // Operations
    .route("/release", post(release::trigger::<S>))
    .with_state(store)
}
