//! GraphQL API surface.
//!
//! Errors cross this boundary as GraphQL errors with an Apollo-style
//! `extensions.code`, plus `extensions.reason` carrying the stable
//! business-rule code when one applies (`DEBIT_CREDIT_MISMATCH`,
//! `INVALID_TRANSITION`, `CATEGORY_IN_USE`).

pub mod mutation;
pub mod query;
pub mod subscription;
pub mod types;

use async_graphql::{Context, ErrorExtensions, Schema};
use service_core::error::AppError;
use service_core::identity::AuthenticatedIdentity;

use crate::startup::Services;
use mutation::MutationRoot;
use query::QueryRoot;
use subscription::SubscriptionRoot;

pub type BookkeepingSchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(services: Services) -> BookkeepingSchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(services)
        .finish()
}

/// Caller identity injected into the request data by the HTTP handler.
pub(crate) fn identity<'a>(ctx: &'a Context<'_>) -> async_graphql::Result<&'a AuthenticatedIdentity> {
    ctx.data::<AuthenticatedIdentity>().map_err(|_| {
        graphql_error(AppError::Unauthorized(anyhow::anyhow!(
            "No caller identity on this request"
        )))
    })
}

/// Convert an [`AppError`] into a GraphQL error with extensions.
pub fn graphql_error(err: AppError) -> async_graphql::Error {
    let code = err.extension_code();
    let reason = err.rule_code();
    (&err).extend_with(|_, ext| {
        ext.set("code", code);
        if let Some(reason) = reason {
            ext.set("reason", reason);
        }
    })
}

/// Shorthand for resolver bodies: `service_call().await.ext_err()?`.
pub trait GqlResultExt<T> {
    fn ext_err(self) -> async_graphql::Result<T>;
}

impl<T> GqlResultExt<T> for Result<T, AppError> {
    fn ext_err(self) -> async_graphql::Result<T> {
        self.map_err(graphql_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_error_carries_code_and_reason() {
        let err = AppError::BusinessRule(
            "INVALID_TRANSITION",
            anyhow::anyhow!("Event 'pay' is not valid in state 'draft'"),
        );
        let gql = graphql_error(err);
        let extensions = gql.extensions.expect("extensions set");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("BAD_USER_INPUT"))
        );
        assert_eq!(
            extensions.get("reason"),
            Some(&async_graphql::Value::from("INVALID_TRANSITION"))
        );
    }

    #[test]
    fn not_found_has_no_reason() {
        let gql = graphql_error(AppError::NotFound(anyhow::anyhow!("missing")));
        let extensions = gql.extensions.expect("extensions set");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("NOT_FOUND"))
        );
        assert!(extensions.get("reason").is_none());
    }
}
