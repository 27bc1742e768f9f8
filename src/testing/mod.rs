//! Fixtures shared by unit and router tests: an RSA key pair standing in
//! for the identity provider, a token builder, and in-memory stores.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{Authorizer, StaticKeySet};
use crate::database::models::{Drink, DrinkChanges, NewDrink};
use crate::database::{DrinkStore, StoreError};
use crate::types::DrinkId;

pub const TEST_AUDIENCE: &str = "https://localhost:5000";
pub const TEST_ISSUER: &str = "https://coffee-shop.test.auth0.com/";
pub const TRUSTED_KID: &str = "coffee-shop-test";
pub const ROGUE_KID: &str = "rogue";

const TRUSTED_PEM: &str = include_str!("keys/trusted.pem");
const ROGUE_PEM: &str = include_str!("keys/rogue.pem");

/// Public half of `keys/trusted.pem`
const TRUSTED_MODULUS: &str = "nhKssXyt4AjDtFF-hMK74VRYijqVwbJEIFHH4pkAfd43Vpxfkwe27Ou25dEsgmQGipvOr4vXPoxV1q_qF1CvCU_yYLppVWUNiTeUjySd0QF7PcTc53IYkdIbXTuR7raSn42lAkiAS_S4bno7hjyRIisZxi-irJCRcfTbDOk404y4uPozwHdMF2p416QthTdmkj9TeJj2GS6BFsa7ja4_IATwKDl5PAMU9xjEg4WhwMzO7vxVrwmqETsfgIGmjUAv7jhx-uMqf-uFv9qqTzETYoKDlaR1KL5PG-Hg5OZnJlND-A1MVDtGqX2t1SW1uMwfzOIDwyXWkkQMEUD9ICC6rw";

static TRUSTED_KEY: Lazy<EncodingKey> =
    Lazy::new(|| EncodingKey::from_rsa_pem(TRUSTED_PEM.as_bytes()).expect("trusted test key"));
static ROGUE_KEY: Lazy<EncodingKey> =
    Lazy::new(|| EncodingKey::from_rsa_pem(ROGUE_PEM.as_bytes()).expect("rogue test key"));

/// JWKS document holding only the trusted key
pub fn jwks_json() -> Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": TRUSTED_KID,
            "n": TRUSTED_MODULUS,
            "e": "AQAB"
        }]
    })
}

pub fn test_authorizer() -> Authorizer {
    let keys = StaticKeySet::new(serde_json::from_value(jwks_json()).expect("test jwks"));
    Authorizer::new(Arc::new(keys), TEST_AUDIENCE, TEST_ISSUER, 0)
}

enum Signer {
    Trusted,
    Rogue,
    Hmac(String),
}

/// Mints tokens that are valid for [`test_authorizer`] unless told otherwise
pub struct TokenBuilder {
    signer: Signer,
    kid: Option<String>,
    audience: String,
    issuer: String,
    expires_in: i64,
    permissions: Option<Vec<String>>,
}

impl TokenBuilder {
    pub fn new() -> Self {
        Self {
            signer: Signer::Trusted,
            kid: Some(TRUSTED_KID.to_string()),
            audience: TEST_AUDIENCE.to_string(),
            issuer: TEST_ISSUER.to_string(),
            expires_in: 3600,
            permissions: Some(vec![]),
        }
    }

    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn without_permissions(mut self) -> Self {
        self.permissions = None;
        self
    }

    pub fn signed_by_rogue_key(mut self) -> Self {
        self.signer = Signer::Rogue;
        self.kid = Some(ROGUE_KID.to_string());
        self
    }

    pub fn trusted_kid(mut self) -> Self {
        self.kid = Some(TRUSTED_KID.to_string());
        self
    }

    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    pub fn hs256(mut self, secret: &str) -> Self {
        self.signer = Signer::Hmac(secret.to_string());
        self
    }

    pub fn audience(mut self, audience: &str) -> Self {
        self.audience = audience.to_string();
        self
    }

    pub fn issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_string();
        self
    }

    /// Seconds from now; negative for an already expired token
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.expires_in = seconds;
        self
    }

    pub fn sign(self) -> String {
        let now = Utc::now().timestamp();
        let mut claims = json!({
            "sub": "auth0|barista",
            "aud": self.audience,
            "iss": self.issuer,
            "iat": now,
            "exp": now + self.expires_in,
        });
        if let Some(permissions) = &self.permissions {
            claims["permissions"] = json!(permissions);
        }

        self.sign_payload(&claims)
    }

    /// Sign an arbitrary payload with this builder's key and header
    pub fn sign_payload(self, payload: &Value) -> String {
        let (alg, key) = match &self.signer {
            Signer::Trusted => (Algorithm::RS256, TRUSTED_KEY.clone()),
            Signer::Rogue => (Algorithm::RS256, ROGUE_KEY.clone()),
            Signer::Hmac(secret) => (Algorithm::HS256, EncodingKey::from_secret(secret.as_bytes())),
        };
        let mut header = Header::new(alg);
        header.kid = self.kid;

        encode(&header, payload, &key).expect("sign test token")
    }
}

pub fn bearer(permissions: &[&str]) -> String {
    format!("Bearer {}", TokenBuilder::new().permissions(permissions).sign())
}

/// Drinks table held in memory
#[derive(Default)]
pub struct MemoryStore {
    drinks: Mutex<BTreeMap<DrinkId, Drink>>,
    next_id: Mutex<DrinkId>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: DrinkId) -> Option<Drink> {
        self.drinks.lock().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.drinks.lock().await.len()
    }

    /// Number of write calls that reached the store
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DrinkStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Drink>, StoreError> {
        Ok(self.drinks.lock().await.values().cloned().collect())
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut next_id = self.next_id.lock().await;
        *next_id += 1;
        let drink = Drink {
            id: *next_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        self.drinks.lock().await.insert(drink.id, drink.clone());
        Ok(drink)
    }

    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Option<Drink>, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut drinks = self.drinks.lock().await;
        Ok(drinks.get_mut(&id).map(|drink| {
            changes.apply(drink);
            drink.clone()
        }))
    }

    async fn delete(&self, id: DrinkId) -> Result<bool, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.drinks.lock().await.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Reads succeed with a fixed list; every write fails as if the database dropped
pub struct FailingStore {
    pub drinks: Vec<Drink>,
}

#[async_trait]
impl DrinkStore for FailingStore {
    async fn list(&self) -> Result<Vec<Drink>, StoreError> {
        Ok(self.drinks.clone())
    }

    async fn insert(&self, _drink: NewDrink) -> Result<Drink, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn update(&self, _id: DrinkId, _changes: DrinkChanges) -> Result<Option<Drink>, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn delete(&self, _id: DrinkId) -> Result<bool, StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut))
    }
}
