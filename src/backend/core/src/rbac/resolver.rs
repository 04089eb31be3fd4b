//! Actor resolution: turning a raw bearer token into an [`Actor`].
//!
//! The policy layer never looks inside tokens. Whatever sits behind
//! [`ActorResolver`] (a JWT verifier, a session store, a test map) only has
//! to answer "who is this, or nobody".

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::models::Actor;
use super::roles::Role;

// ═══════════════════════════════════════════════════════════════════════════════
// Resolver Trait
// ═══════════════════════════════════════════════════════════════════════════════

/// Looks up the actor behind a raw token.
///
/// `None` means no verifiable identity: unknown, malformed, expired or
/// revoked tokens all collapse into it.
#[async_trait]
pub trait ActorResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<Actor>;
}

#[async_trait]
impl<T> ActorResolver for Arc<T>
where
    T: ActorResolver + ?Sized,
{
    async fn resolve(&self, token: &str) -> Option<Actor> {
        (**self).resolve(token).await
    }
}

fn record_resolution(result: &'static str) {
    counter!("warden_actor_resolution_total", "result" => result).increment(1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// JWT Claims
// ═══════════════════════════════════════════════════════════════════════════════

/// Claims carried by session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Role wire name, e.g. `BUSINESS_ADMIN`
    pub role: String,

    /// Organization ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl Claims {
    pub fn new(user_id: impl Into<String>, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.into(),
            role: role.wire_name().to_string(),
            org_id: None,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: None,
            aud: None,
        }
    }

    /// Claims describing `actor`, valid for `ttl`.
    pub fn for_actor(actor: &Actor, ttl: Duration) -> Self {
        let mut claims = Self::new(actor.id.as_str(), actor.role, ttl);
        claims.org_id = actor.organization_id.as_ref().map(|o| o.as_str().to_string());
        claims
    }

    pub fn org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.aud = Some(audience.into());
        self
    }

    /// Convert verified claims into an actor. Unknown role names yield `None`.
    pub fn into_actor(self) -> Option<Actor> {
        let role: Role = self.role.parse().ok()?;
        let actor = Actor::new(self.sub, role);
        Some(match self.org_id {
            Some(org) if !org.is_empty() => actor.in_organization(org),
            _ => actor,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// JWT Resolver
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves HS256-signed session tokens.
#[derive(Clone)]
pub struct JwtActorResolver {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtActorResolver {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60;
        validation.validate_aud = false;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    /// Clock skew tolerated on `exp`, in seconds.
    pub fn with_leeway(mut self, secs: u64) -> Self {
        self.validation.leeway = secs;
        self
    }

    /// Sign `claims` with the resolver's secret.
    pub fn issue(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// Verify `token` and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

impl fmt::Debug for JwtActorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtActorResolver")
            .field("leeway", &self.validation.leeway)
            .field("issuer", &self.validation.iss)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ActorResolver for JwtActorResolver {
    async fn resolve(&self, token: &str) -> Option<Actor> {
        let claims = match self.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Token rejected");
                record_resolution("rejected");
                return None;
            }
        };

        let role = claims.role.clone();
        match claims.into_actor() {
            Some(actor) => {
                record_resolution("resolved");
                Some(actor)
            }
            None => {
                debug!(role = %role, "Token carries an unknown role");
                record_resolution("invalid_role");
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Static Resolver
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed token-to-actor map, for tests and local development.
#[derive(Debug, Default)]
pub struct StaticActorResolver {
    actors: DashMap<String, Actor>,
}

impl StaticActorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actor(self, token: impl Into<String>, actor: Actor) -> Self {
        self.actors.insert(token.into(), actor);
        self
    }

    pub fn insert(&self, token: impl Into<String>, actor: Actor) {
        self.actors.insert(token.into(), actor);
    }

    /// Revoke a token.
    pub fn remove(&self, token: &str) -> Option<Actor> {
        self.actors.remove(token).map(|(_, actor)| actor)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[async_trait]
impl ActorResolver for StaticActorResolver {
    async fn resolve(&self, token: &str) -> Option<Actor> {
        let actor = self.actors.get(token).map(|entry| entry.value().clone());
        record_resolution(if actor.is_some() { "resolved" } else { "rejected" });
        actor
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::models::OrganizationId;

    const SECRET: &str = "test-secret-that-is-long-enough";

    #[tokio::test]
    async fn test_jwt_round_trip_to_actor() {
        let resolver = JwtActorResolver::new(SECRET);
        let token = resolver
            .issue(&Claims::new("a1", Role::OrgAdmin, Duration::hours(1)).org_id("acme"))
            .unwrap();

        let actor = resolver.resolve(&token).await.unwrap();
        assert_eq!(actor.id.as_str(), "a1");
        assert_eq!(actor.role, Role::OrgAdmin);
        assert_eq!(actor.organization_id, Some(OrganizationId::new("acme")));
    }

    #[tokio::test]
    async fn test_jwt_wrong_secret_is_none() {
        let token = JwtActorResolver::new("other-secret")
            .issue(&Claims::new("u1", Role::OrgUser, Duration::hours(1)))
            .unwrap();
        assert!(JwtActorResolver::new(SECRET).resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_jwt_expired_is_none() {
        let resolver = JwtActorResolver::new(SECRET).with_leeway(0);
        let token = resolver
            .issue(&Claims::new("u1", Role::OrgUser, Duration::hours(-2)))
            .unwrap();
        assert!(resolver.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_jwt_unknown_role_is_none() {
        let resolver = JwtActorResolver::new(SECRET);
        let mut claims = Claims::new("u1", Role::OrgUser, Duration::hours(1));
        claims.role = "SUPERUSER".to_string();
        let token = resolver.issue(&claims).unwrap();
        assert!(resolver.resolve(&token).await.is_none());
    }

    #[tokio::test]
    async fn test_jwt_issuer_enforced() {
        let resolver = JwtActorResolver::new(SECRET).with_issuer("warden");
        let good = resolver
            .issue(&Claims::new("u1", Role::LegacyUser, Duration::hours(1)).issuer("warden"))
            .unwrap();
        let bad = resolver
            .issue(&Claims::new("u1", Role::LegacyUser, Duration::hours(1)).issuer("mallory"))
            .unwrap();
        assert!(resolver.resolve(&good).await.is_some());
        assert!(resolver.resolve(&bad).await.is_none());
    }

    #[tokio::test]
    async fn test_garbage_token_is_none() {
        assert!(JwtActorResolver::new(SECRET).resolve("not-a-jwt").await.is_none());
    }

    #[test]
    fn test_claims_for_actor() {
        let actor = Actor::new("u1", Role::OrgUser).in_organization("acme");
        let claims = Claims::for_actor(&actor, Duration::minutes(5));
        assert_eq!(claims.role, "BUSINESS_USER");
        assert_eq!(claims.org_id.as_deref(), Some("acme"));
        assert_eq!(claims.into_actor(), Some(actor));
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticActorResolver::new()
            .with_actor("t-admin", Actor::new("root", Role::PlatformAdmin));
        assert_eq!(resolver.len(), 1);
        assert_eq!(resolver.resolve("t-admin").await.unwrap().role, Role::PlatformAdmin);
        assert!(resolver.resolve("t-unknown").await.is_none());

        resolver.remove("t-admin");
        assert!(resolver.resolve("t-admin").await.is_none());
        assert!(resolver.is_empty());
    }

    #[tokio::test]
    async fn test_resolver_behind_arc_dyn() {
        let resolver: Arc<dyn ActorResolver> = Arc::new(
            StaticActorResolver::new().with_actor("t", Actor::new("u", Role::LegacyUser)),
        );
        assert!(resolver.resolve("t").await.is_some());
    }
}
