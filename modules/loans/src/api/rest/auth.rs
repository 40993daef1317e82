//! HTTP Basic authentication for the REST surface.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::api::rest::error::map_domain_error;
use crate::api::rest::problem::{ProblemCode, ProblemResponse};
use crate::contract::model::Actor;
use crate::domain::service::Service;

const REALM: &str = r#"Basic realm="equiploan""#;

/// The authenticated caller, resolved from `Authorization: Basic ...`.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

/// Decode a Basic credential into `(name, password)`.
pub fn parse_basic(value: &HeaderValue) -> Option<(String, String)> {
    let raw = value.to_str().ok()?;
    let (scheme, encoded) = raw.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (name, password) = text.split_once(':')?;
    Some((name.to_owned(), password.to_owned()))
}

fn challenge(mut resp: Response) -> Response {
    if resp.status() == StatusCode::UNAUTHORIZED {
        resp.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(REALM));
    }
    resp
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let instance = parts.uri.path().to_owned();

        let Some(svc) = parts.extensions.get::<Arc<Service>>().cloned() else {
            tracing::error!("loans service missing from request extensions");
            return Err(ProblemResponse::new(
                ProblemCode::Internal,
                "An internal error occurred",
                &instance,
            )
            .into_response());
        };

        let Some((name, password)) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(parse_basic)
        else {
            return Err(challenge(
                ProblemResponse::new(
                    ProblemCode::Unauthenticated,
                    "Send HTTP Basic credentials",
                    &instance,
                )
                .into_response(),
            ));
        };

        match svc.authenticate(&name, &password).await {
            Ok(user) => Ok(CurrentActor(user.into())),
            Err(e) => Err(challenge(map_domain_error(&e, &instance).into_response())),
        }
    }
}
