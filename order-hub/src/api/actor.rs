//! Actor Extractor
//!
//! Resolves the acting console from request headers:
//!
//! | Header | Required | Meaning |
//! |--------|----------|---------|
//! | `x-actor-role` | yes | `admin` / `kitchen` / `driver` |
//! | `x-driver-id` | for drivers | driver identity used for visibility |
//! | `x-driver-name` | no | display name recorded on claim (defaults to the id) |

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::order::{Actor, ActorRole};

use crate::utils::AppError;

pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const DRIVER_ID_HEADER: &str = "x-driver-id";
pub const DRIVER_NAME_HEADER: &str = "x-driver-name";

/// Acting console for a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for RequestActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role: ActorRole = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| AppError::invalid(format!("Missing {} header", ACTOR_ROLE_HEADER)))?
            .parse()
            .map_err(AppError::Invalid)?;

        let actor = match role {
            ActorRole::Admin => Actor::Admin,
            ActorRole::Kitchen => Actor::Kitchen,
            ActorRole::Driver => {
                let id = header(parts, DRIVER_ID_HEADER).ok_or_else(|| {
                    AppError::invalid(format!("Driver requests require {}", DRIVER_ID_HEADER))
                })?;
                let name = header(parts, DRIVER_NAME_HEADER).unwrap_or(id);
                Actor::driver(id, name)
            }
        };
        Ok(RequestActor(actor))
    }
}
